use topmodel_shared::APP_NAME;

/// Number of full-body poses in the composite.
pub const POSE_COUNT: usize = 6;
pub const ASPECT_RATIO: &str = "9:16";

/// Instruction sent to the image model alongside the user's selfie.
pub fn build_prompt(style: &str) -> String {
    let style = style.trim();
    format!(
        "Generate ONE single vertical image with a {ASPECT_RATIO} aspect ratio: a professional \
high-fashion photoshoot composite showing {POSE_COUNT} different full-body poses of the same model.
The model is the person in the user's photo. Their face must be accurately and realistically represented in every pose.
The fashion style must be: '{style}'.
Use dramatic, cinematic lighting and photorealistic, magazine-cover quality.
Arrange all {POSE_COUNT} poses inside the one image; do not return separate images.
Place the small watermark text \"{APP_NAME}\" in the bottom-right corner. No other text."
    )
}
