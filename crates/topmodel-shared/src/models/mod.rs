mod image;
mod style;
mod user;

pub use image::*;
pub use style::*;
pub use user::*;
