//! Application state machine.
//!
//! [`Machine::apply`] is the only way state changes. It never performs I/O;
//! persistence and the generation request are returned as [`Effect`]s for the
//! runtime to execute.

use chrono::{DateTime, SecondsFormat, Utc};
use topmodel_shared::{GeneratedImage, Language, User};

use crate::api::GenerateError;
use crate::cooldown::Cooldown;
use crate::registry::UsernameRegistry;
use crate::store::Loaded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Login,
    TermsAgreement,
    ProfileSetup,
    SelfieCapture,
    StyleSelection,
    Generating,
    MainView,
    PaymentScreen,
    InfoScreen,
    ProfileScreen,
}

impl Step {
    fn is_secondary(self) -> bool {
        matches!(
            self,
            Step::PaymentScreen | Step::InfoScreen | Step::ProfileScreen
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login { first_name: String, country: String },
    AgreeTerms { accepted: bool },
    CompleteProfile { name: String, city: String, country: String },
    ConfirmSelfie { image: String },
    SelectStyle { prompt: String },
    GenerationSucceeded { image_url: String },
    GenerationFailed { error: GenerateError },
    ToggleLike { id: String },
    OpenImage { id: String },
    CloseImage,
    GoToPayment,
    GoToInfo,
    GoToProfile,
    Back,
    SetLanguage(Language),
    ReportError { message: String },
    DismissError,
    Logout,
}

/// Work the runtime must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SaveUser,
    SaveImages,
    ClearStorage,
    Generate { selfie: String, prompt: String },
}

/// Collaborators a transition may read or update.
pub struct Context<'a> {
    pub registry: &'a mut UsernameRegistry,
    pub now: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Machine {
    step: Step,
    user: Option<User>,
    images: Vec<GeneratedImage>,
    cooldown: Cooldown,
    error: Option<String>,
    selected_image: Option<String>,
    pending_prompt: Option<String>,
}

impl Machine {
    /// Resume from stored state, skipping onboarding steps already done.
    pub fn boot(loaded: Loaded) -> Self {
        let step = match &loaded.user {
            None => Step::Login,
            Some(user) if user.has_completed_setup => Step::MainView,
            Some(user) if user.city.trim().is_empty() => Step::ProfileSetup,
            Some(user) if !user.has_selfie() => Step::SelfieCapture,
            Some(_) => Step::StyleSelection,
        };

        let mut machine = Self {
            step,
            user: loaded.user,
            images: loaded.images,
            cooldown: Cooldown::inactive(),
            error: None,
            selected_image: None,
            pending_prompt: None,
        };
        machine.enforce_invariants();
        tracing::info!(step = ?machine.step, "state machine booted");
        machine
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Full list, newest first.
    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    /// Images still inside the retention window at `now`, newest first.
    pub fn feed(&self, now: DateTime<Utc>) -> Vec<&GeneratedImage> {
        self.images.iter().filter(|i| i.is_visible_at(now)).collect()
    }

    pub fn cooldown(&self) -> Cooldown {
        self.cooldown
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_image(&self) -> Option<&GeneratedImage> {
        let id = self.selected_image.as_deref()?;
        self.images.iter().find(|i| i.id == id)
    }

    /// Prompt of the generation currently in flight.
    pub fn pending_prompt(&self) -> Option<&str> {
        self.pending_prompt.as_deref()
    }

    pub fn apply(&mut self, action: Action, ctx: &mut Context<'_>) -> Vec<Effect> {
        let from = self.step;
        let effects = self.transition(action, ctx);
        self.enforce_invariants();
        if self.step != from {
            tracing::debug!(?from, to = ?self.step, "transition");
        }
        effects
    }

    fn transition(&mut self, action: Action, ctx: &mut Context<'_>) -> Vec<Effect> {
        // One request at a time: while generating only its outcome, logout
        // and banner dismissal are accepted.
        if self.step == Step::Generating
            && !matches!(
                action,
                Action::GenerationSucceeded { .. }
                    | Action::GenerationFailed { .. }
                    | Action::Logout
                    | Action::DismissError
            )
        {
            return Vec::new();
        }

        match action {
            Action::Login {
                first_name,
                country,
            } => {
                if self.step != Step::Login {
                    return Vec::new();
                }
                let name = ctx.registry.suggest(&format!("{}Model", first_name.trim()));
                self.user = Some(User::provisional(name, country));
                self.step = Step::TermsAgreement;
                vec![Effect::SaveUser]
            }

            Action::AgreeTerms { accepted } => {
                if self.step != Step::TermsAgreement {
                    return Vec::new();
                }
                if !accepted {
                    self.error = Some("Please accept the terms to continue.".to_string());
                    return Vec::new();
                }
                self.step = Step::ProfileSetup;
                Vec::new()
            }

            Action::CompleteProfile {
                name,
                city,
                country,
            } => self.complete_profile(name, city, country, ctx),

            Action::ConfirmSelfie { image } => {
                if self.step != Step::SelfieCapture || image.is_empty() {
                    return Vec::new();
                }
                let Some(user) = self.user.as_mut() else {
                    return Vec::new();
                };
                user.selfie = Some(image);
                self.step = Step::StyleSelection;
                vec![Effect::SaveUser]
            }

            Action::SelectStyle { prompt } => self.select_style(prompt, ctx.now),

            Action::GenerationSucceeded { image_url } => {
                if self.step != Step::Generating {
                    return Vec::new();
                }
                self.step = Step::MainView;
                let prompt = self.pending_prompt.take().unwrap_or_default();
                let Some(user) = self.user.as_mut() else {
                    return Vec::new();
                };

                let id = unique_id(&self.images, ctx.now);
                let image = GeneratedImage::new(id, image_url, prompt, user, ctx.now);
                tracing::info!(id = %image.id, bytes = image.image_url.len(), "image added to feed");
                self.images.insert(0, image);
                self.cooldown = Cooldown::start(ctx.now);

                let mut effects = vec![Effect::SaveImages];
                if !user.has_completed_setup {
                    user.has_completed_setup = true;
                    effects.push(Effect::SaveUser);
                }
                effects
            }

            Action::GenerationFailed { error } => {
                if self.step != Step::Generating {
                    return Vec::new();
                }
                tracing::warn!("generation failed: {}", error);
                self.pending_prompt = None;
                self.error = Some(error.to_string());
                self.step = Step::MainView;
                Vec::new()
            }

            Action::ToggleLike { id } => {
                if self.step != Step::MainView {
                    return Vec::new();
                }
                match self.images.iter_mut().find(|i| i.id == id) {
                    Some(image) => {
                        image.toggle_like();
                        vec![Effect::SaveImages]
                    }
                    None => Vec::new(),
                }
            }

            Action::OpenImage { id } => {
                if self.step == Step::MainView && self.images.iter().any(|i| i.id == id) {
                    self.selected_image = Some(id);
                }
                Vec::new()
            }

            Action::CloseImage => {
                self.selected_image = None;
                Vec::new()
            }

            Action::GoToPayment => self.navigate(Step::PaymentScreen),
            Action::GoToInfo => self.navigate(Step::InfoScreen),
            Action::GoToProfile => self.navigate(Step::ProfileScreen),

            Action::Back => {
                if self.step.is_secondary() {
                    self.step = Step::MainView;
                }
                Vec::new()
            }

            Action::SetLanguage(language) => match self.user.as_mut() {
                Some(user) if user.language != language => {
                    user.language = language;
                    vec![Effect::SaveUser]
                }
                _ => Vec::new(),
            },

            Action::ReportError { message } => {
                self.error = Some(message);
                Vec::new()
            }

            Action::DismissError => {
                self.error = None;
                Vec::new()
            }

            Action::Logout => {
                tracing::info!("logout");
                self.step = Step::Login;
                self.user = None;
                self.images.clear();
                self.cooldown = Cooldown::inactive();
                self.error = None;
                self.selected_image = None;
                self.pending_prompt = None;
                vec![Effect::ClearStorage]
            }
        }
    }

    fn complete_profile(
        &mut self,
        name: String,
        city: String,
        country: String,
        ctx: &mut Context<'_>,
    ) -> Vec<Effect> {
        if self.step != Step::ProfileSetup {
            return Vec::new();
        }
        let Some(user) = self.user.as_mut() else {
            return Vec::new();
        };

        let (name, city, country) = (name.trim(), city.trim(), country.trim());
        if name.is_empty() || city.is_empty() || country.is_empty() {
            self.error = Some("Name, city and country are required.".to_string());
            return Vec::new();
        }
        if name != user.name && ctx.registry.contains(name) {
            self.error = Some(format!("The name {} is already taken.", name));
            return Vec::new();
        }

        user.name = name.to_string();
        user.city = city.to_string();
        user.country = country.to_string();
        user.selfie = None;
        ctx.registry.register(name);

        self.error = None;
        self.step = Step::SelfieCapture;
        vec![Effect::SaveUser]
    }

    fn select_style(&mut self, prompt: String, now: DateTime<Utc>) -> Vec<Effect> {
        if !matches!(self.step, Step::StyleSelection | Step::MainView) {
            return Vec::new();
        }
        if !self.cooldown.can_generate(now) {
            tracing::debug!("generation blocked by cooldown");
            return Vec::new();
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Vec::new();
        }

        let selfie = match self.user.as_ref() {
            Some(user) if user.can_generate() => user.selfie.clone().unwrap_or_default(),
            _ => {
                self.error = Some(GenerateError::IncompleteUserData.to_string());
                self.step = Step::MainView;
                return Vec::new();
            }
        };

        self.error = None;
        self.selected_image = None;
        self.pending_prompt = Some(prompt.to_string());
        self.step = Step::Generating;
        vec![Effect::Generate {
            selfie,
            prompt: prompt.to_string(),
        }]
    }

    fn navigate(&mut self, to: Step) -> Vec<Effect> {
        if self.step == Step::MainView || self.step.is_secondary() {
            self.selected_image = None;
            self.step = to;
        }
        Vec::new()
    }

    /// Screens past the login need a user; screens past the profile step
    /// need a complete profile. Anything else falls back to login.
    fn enforce_invariants(&mut self) {
        let valid = match (self.step, self.user.as_ref()) {
            (Step::Login | Step::TermsAgreement, _) => true,
            (_, None) => false,
            (Step::ProfileSetup, Some(user)) => {
                !user.name.trim().is_empty() && !user.country.trim().is_empty()
            }
            (_, Some(user)) => user.has_profile(),
        };

        if !valid {
            tracing::warn!(step = ?self.step, "incomplete user data, returning to login");
            self.step = Step::Login;
            self.user = None;
            self.selected_image = None;
            self.pending_prompt = None;
        }
    }
}

/// Creation timestamp with millisecond precision, suffixed when two images
/// land in the same millisecond.
fn unique_id(images: &[GeneratedImage], now: DateTime<Utc>) -> String {
    let base = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let taken = |id: &str| images.iter().any(|i| i.id == id);
    if !taken(&base) {
        return base;
    }
    (1u32..)
        .map(|n| format!("{}-{}", base, n))
        .find(|id| !taken(id))
        .unwrap_or(base)
}
