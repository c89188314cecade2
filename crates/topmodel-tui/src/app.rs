use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use topmodel_shared::STYLE_OPTIONS;

use crate::api::{GenerateError, ImageGenerator};
use crate::config::Identity;
use crate::machine::{Action, Context, Effect, Machine, Step};
use crate::registry::UsernameRegistry;
use crate::selfie::load_selfie;
use crate::share::export_image;
use crate::store::Store;
use crate::ticker::Ticker;

pub const COOLDOWN_TICK: Duration = Duration::from_secs(1);
pub const TIP_PERIOD: Duration = Duration::from_secs(3);

pub const GENERATING_TIPS: [&str; 3] = [
    "Adding your face in 6 poses...",
    "Applying the fashion style...",
    "Creating the perfect setting...",
];

/// Names the community already uses.
pub const SEEDED_NAMES: [&str; 2] = ["JohnModel", "JaneModel"];

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    CooldownTick,
    TipTick,
    GenerationFinished {
        seq: u64,
        result: Result<String, GenerateError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimMode {
    Normal,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    City,
    Country,
}

impl ProfileField {
    fn next(self) -> Self {
        match self {
            ProfileField::Name => ProfileField::City,
            ProfileField::City => ProfileField::Country,
            ProfileField::Country => ProfileField::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            ProfileField::Name => ProfileField::Country,
            ProfileField::City => ProfileField::Name,
            ProfileField::Country => ProfileField::City,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileForm {
    pub name: String,
    pub city: String,
    pub country: String,
    pub focus: ProfileField,
}

impl ProfileForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            ProfileField::Name => &mut self.name,
            ProfileField::City => &mut self.city,
            ProfileField::Country => &mut self.country,
        }
    }
}

pub struct App<G: ImageGenerator> {
    pub machine: Machine,
    store: Store,
    generator: G,
    registry: UsernameRegistry,
    identity: Identity,
    download_dir: PathBuf,
    tx: mpsc::Sender<AppEvent>,

    pub vim_mode: VimMode,
    pub terms_accepted: bool,
    pub profile: ProfileForm,
    pub selfie_path: String,
    /// Index into the style catalogue; one past the end is the custom prompt.
    pub style_cursor: usize,
    pub custom_prompt: String,
    pub feed_cursor: usize,
    pub tip_index: usize,
    /// Non-error status line, e.g. where a shared image was written.
    pub notice: Option<String>,

    generation_seq: u64,
    cooldown_ticker: Ticker,
    tip_ticker: Ticker,
}

impl<G: ImageGenerator> App<G> {
    pub fn new(
        store: Store,
        generator: G,
        mut registry: UsernameRegistry,
        identity: Identity,
        download_dir: PathBuf,
        tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let machine = Machine::boot(store.load(Utc::now()));
        if let Some(user) = machine.user() {
            registry.register(&user.name);
        }

        let mut app = Self {
            machine,
            store,
            generator,
            registry,
            identity,
            download_dir,
            tx,
            vim_mode: VimMode::Normal,
            terms_accepted: false,
            profile: ProfileForm {
                name: String::new(),
                city: String::new(),
                country: String::new(),
                focus: ProfileField::Name,
            },
            selfie_path: String::new(),
            style_cursor: 0,
            custom_prompt: String::new(),
            feed_cursor: 0,
            tip_index: 0,
            notice: None,
            generation_seq: 0,
            cooldown_ticker: Ticker::idle(),
            tip_ticker: Ticker::idle(),
        };
        app.after_transition(None);
        app
    }

    pub fn dispatch(&mut self, action: Action) {
        let before = self.machine.step();
        let effects = {
            let mut ctx = Context {
                registry: &mut self.registry,
                now: Utc::now(),
            };
            self.machine.apply(action, &mut ctx)
        };
        self.run_effects(effects);
        self.after_transition(Some(before));
    }

    /// Execute what the last transition asked for. Storage failures are
    /// logged and never block the session.
    pub fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SaveUser => {
                    if let Some(user) = self.machine.user() {
                        if let Err(e) = self.store.save_user(user) {
                            tracing::error!("Failed to save user: {}", e);
                        }
                    }
                }
                Effect::SaveImages => {
                    if let Err(e) = self.store.save_images(self.machine.images()) {
                        tracing::error!("Failed to save images: {}", e);
                    }
                }
                Effect::ClearStorage => {
                    if let Err(e) = self.store.clear() {
                        tracing::error!("Failed to clear storage: {}", e);
                    }
                }
                Effect::Generate { selfie, prompt } => self.spawn_generation(selfie, prompt),
            }
        }
    }

    fn spawn_generation(&mut self, selfie: String, prompt: String) {
        self.generation_seq += 1;
        let seq = self.generation_seq;
        let generator = self.generator.clone();
        let tx = self.tx.clone();

        tracing::info!(seq, prompt_len = prompt.len(), "generation started");
        tokio::spawn(async move {
            let result = generator.generate(selfie, prompt).await;
            let _ = tx.send(AppEvent::GenerationFinished { seq, result }).await;
        });
    }

    pub fn on_generation_finished(&mut self, seq: u64, result: Result<String, GenerateError>) {
        if seq != self.generation_seq || self.machine.step() != Step::Generating {
            tracing::debug!(seq, "ignoring stale generation result");
            return;
        }
        match result {
            Ok(image_url) => {
                self.dispatch(Action::GenerationSucceeded { image_url });
                self.feed_cursor = 0;
            }
            Err(error) => self.dispatch(Action::GenerationFailed { error }),
        }
    }

    /// Returns true when the app should quit.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Key(key) => return self.handle_key(key),
            AppEvent::CooldownTick => self.sync_timers(),
            AppEvent::TipTick => {
                self.tip_index = (self.tip_index + 1) % GENERATING_TIPS.len();
            }
            AppEvent::GenerationFinished { seq, result } => {
                self.on_generation_finished(seq, result)
            }
        }
        false
    }

    fn after_transition(&mut self, before: Option<Step>) {
        let step = self.machine.step();
        if before != Some(step) {
            self.vim_mode = VimMode::Normal;
            match step {
                Step::TermsAgreement => self.terms_accepted = false,
                Step::ProfileSetup => {
                    let user = self.machine.user();
                    self.profile = ProfileForm {
                        name: user.map(|u| u.name.clone()).unwrap_or_default(),
                        city: user.map(|u| u.city.clone()).unwrap_or_default(),
                        country: user.map(|u| u.country.clone()).unwrap_or_default(),
                        focus: ProfileField::Name,
                    };
                }
                Step::SelfieCapture => self.selfie_path.clear(),
                Step::StyleSelection => self.style_cursor = 0,
                Step::Generating => self.tip_index = 0,
                _ => {}
            }
        }

        let feed_len = self.machine.feed(Utc::now()).len();
        if self.feed_cursor >= feed_len {
            self.feed_cursor = feed_len.saturating_sub(1);
        }
        self.sync_timers();
    }

    /// Tickers run only while something on screen shows them. The header
    /// carries the countdown on every screen, so it follows the cooldown.
    fn sync_timers(&mut self) {
        let step = self.machine.step();

        let show_countdown = !self.machine.cooldown().can_generate(Utc::now());
        if show_countdown && !self.cooldown_ticker.is_running() {
            self.cooldown_ticker =
                Ticker::start(COOLDOWN_TICK, self.tx.clone(), || AppEvent::CooldownTick);
        } else if !show_countdown {
            self.cooldown_ticker.stop();
        }

        let show_tips = step == Step::Generating;
        if show_tips && !self.tip_ticker.is_running() {
            self.tip_ticker = Ticker::start(TIP_PERIOD, self.tx.clone(), || AppEvent::TipTick);
        } else if !show_tips {
            self.tip_ticker.stop();
        }
    }

    #[cfg(test)]
    pub fn timers_running(&self) -> (bool, bool) {
        (
            self.cooldown_ticker.is_running(),
            self.tip_ticker.is_running(),
        )
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Handle key events, returns true if app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        self.notice = None;
        // Any key dismisses the banner; Esc does nothing else.
        if self.machine.error().is_some() {
            self.dispatch(Action::DismissError);
            if key.code == KeyCode::Esc {
                return false;
            }
        }

        if self.vim_mode == VimMode::Insert {
            self.handle_insert_key(key);
            return false;
        }

        match self.machine.step() {
            Step::Login => self.handle_login_key(key),
            Step::TermsAgreement => self.handle_terms_key(key),
            Step::ProfileSetup => self.handle_profile_key(key),
            Step::SelfieCapture => self.handle_selfie_key(key),
            Step::StyleSelection => self.handle_style_key(key),
            Step::Generating => key.code == KeyCode::Char('q'),
            Step::MainView => self.handle_main_key(key),
            Step::PaymentScreen | Step::InfoScreen | Step::ProfileScreen => {
                self.handle_secondary_key(key)
            }
        }
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        let step = self.machine.step();
        match key.code {
            KeyCode::Esc => self.vim_mode = VimMode::Normal,
            KeyCode::Enter => {
                self.vim_mode = VimMode::Normal;
                self.submit_current();
            }
            KeyCode::Tab if step == Step::ProfileSetup => {
                self.profile.focus = self.profile.focus.next();
            }
            KeyCode::BackTab if step == Step::ProfileSetup => {
                self.profile.focus = self.profile.focus.prev();
            }
            KeyCode::Backspace => {
                if let Some(buf) = self.input_buffer() {
                    buf.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(buf) = self.input_buffer() {
                    buf.push(c);
                }
            }
            _ => {}
        }
    }

    fn input_buffer(&mut self) -> Option<&mut String> {
        match self.machine.step() {
            Step::ProfileSetup => Some(self.profile.focused_mut()),
            Step::SelfieCapture => Some(&mut self.selfie_path),
            Step::StyleSelection | Step::MainView => Some(&mut self.custom_prompt),
            _ => None,
        }
    }

    fn submit_current(&mut self) {
        match self.machine.step() {
            Step::ProfileSetup => self.dispatch(Action::CompleteProfile {
                name: self.profile.name.clone(),
                city: self.profile.city.clone(),
                country: self.profile.country.clone(),
            }),
            Step::SelfieCapture => self.confirm_selfie(),
            Step::StyleSelection | Step::MainView => {
                let prompt = self.custom_prompt.trim().to_string();
                if !prompt.is_empty() {
                    self.dispatch(Action::SelectStyle { prompt });
                }
            }
            _ => {}
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Enter | KeyCode::Char('l') => self.dispatch(Action::Login {
                first_name: self.identity.first_name.clone(),
                country: self.identity.country.clone(),
            }),
            _ => {}
        }
        false
    }

    fn handle_terms_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char(' ') => self.terms_accepted = !self.terms_accepted,
            KeyCode::Enter => self.dispatch(Action::AgreeTerms {
                accepted: self.terms_accepted,
            }),
            _ => {}
        }
        false
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('i') => self.vim_mode = VimMode::Insert,
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
                self.profile.focus = self.profile.focus.next();
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
                self.profile.focus = self.profile.focus.prev();
            }
            KeyCode::Enter => self.submit_current(),
            _ => {}
        }
        false
    }

    fn handle_selfie_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('i') => self.vim_mode = VimMode::Insert,
            KeyCode::Enter => self.confirm_selfie(),
            _ => {}
        }
        false
    }

    fn confirm_selfie(&mut self) {
        let path = self.selfie_path.trim();
        if path.is_empty() {
            return;
        }
        match load_selfie(Path::new(path)) {
            Ok(image) => self.dispatch(Action::ConfirmSelfie { image }),
            Err(e) => self.dispatch(Action::ReportError {
                message: format!("{:#}", e),
            }),
        }
    }

    fn handle_style_key(&mut self, key: KeyEvent) -> bool {
        let custom_row = STYLE_OPTIONS.len();
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                self.style_cursor = (self.style_cursor + 1).min(custom_row);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.style_cursor = self.style_cursor.saturating_sub(1);
            }
            KeyCode::Char('i') => {
                self.style_cursor = custom_row;
                self.vim_mode = VimMode::Insert;
            }
            KeyCode::Enter if self.style_cursor == custom_row => {
                self.vim_mode = VimMode::Insert;
            }
            KeyCode::Enter => {
                let prompt = STYLE_OPTIONS[self.style_cursor].prompt.to_string();
                self.dispatch(Action::SelectStyle { prompt });
            }
            _ => {}
        }
        false
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> bool {
        if let Some(image) = self.machine.selected_image() {
            let (id, prompt) = (image.id.clone(), image.prompt.clone());
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.dispatch(Action::CloseImage),
                KeyCode::Char('l') => self.dispatch(Action::ToggleLike { id }),
                KeyCode::Char('s') => self.share(&id),
                KeyCode::Char('g') => self.dispatch(Action::SelectStyle { prompt }),
                _ => {}
            }
            return false;
        }

        let cursor = self
            .machine
            .feed(Utc::now())
            .get(self.feed_cursor)
            .map(|i| (i.id.clone(), i.prompt.clone()));
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.machine.feed(Utc::now()).len();
                if self.feed_cursor + 1 < len {
                    self.feed_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.feed_cursor = self.feed_cursor.saturating_sub(1);
            }
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                if let Some(style) = STYLE_OPTIONS.get(idx) {
                    self.dispatch(Action::SelectStyle {
                        prompt: style.prompt.to_string(),
                    });
                }
            }
            KeyCode::Char('c') => self.vim_mode = VimMode::Insert,
            KeyCode::Char('p') => self.dispatch(Action::GoToPayment),
            KeyCode::Char('i') => self.dispatch(Action::GoToInfo),
            KeyCode::Char('u') => self.dispatch(Action::GoToProfile),
            KeyCode::Char('L') => self.dispatch(Action::Logout),
            _ => {
                if let Some((id, prompt)) = cursor {
                    match key.code {
                        KeyCode::Enter => self.dispatch(Action::OpenImage { id }),
                        KeyCode::Char('l') => self.dispatch(Action::ToggleLike { id }),
                        KeyCode::Char('s') => self.share(&id),
                        KeyCode::Char('r') => self.dispatch(Action::SelectStyle { prompt }),
                        _ => {}
                    }
                }
            }
        }
        false
    }

    fn handle_secondary_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => self.dispatch(Action::Back),
            KeyCode::Char('n') if self.machine.step() == Step::ProfileScreen => {
                if let Some(user) = self.machine.user() {
                    let next = user.language.next();
                    self.dispatch(Action::SetLanguage(next));
                }
            }
            KeyCode::Char('L') if self.machine.step() == Step::ProfileScreen => {
                self.dispatch(Action::Logout)
            }
            _ => {}
        }
        false
    }

    fn share(&mut self, id: &str) {
        let Some(image) = self.machine.images().iter().find(|i| i.id == id) else {
            return;
        };
        match export_image(image, &self.download_dir) {
            Ok(path) => self.notice = Some(format!("Saved to {}", path.display())),
            Err(e) => self.dispatch(Action::ReportError {
                message: format!("Could not share the image: {:#}", e),
            }),
        }
    }
}

pub fn default_registry() -> UsernameRegistry {
    UsernameRegistry::with_names(SEEDED_NAMES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{with_deadline, GENERATION_TIMEOUT};
    use tempfile::TempDir;
    use topmodel_shared::{Language, User};

    #[derive(Clone)]
    struct MockGenerator {
        reply: Result<String, GenerateError>,
        delay: Duration,
    }

    impl MockGenerator {
        fn ok(delay: Duration) -> Self {
            Self {
                reply: Ok("data:image/png;base64,R0VO".to_string()),
                delay,
            }
        }
    }

    impl ImageGenerator for MockGenerator {
        async fn generate(&self, _selfie: String, _prompt: String) -> Result<String, GenerateError> {
            with_deadline(GENERATION_TIMEOUT, async {
                tokio::time::sleep(self.delay).await;
                self.reply.clone()
            })
            .await?
        }
    }

    fn ready_user() -> User {
        User {
            name: "Ana".to_string(),
            city: "SP".to_string(),
            country: "Brasil".to_string(),
            language: Language::Pt,
            selfie: Some("data:image/jpeg;base64,U0VMRklF".to_string()),
            has_completed_setup: true,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(
        dir: &TempDir,
        generator: MockGenerator,
    ) -> (App<MockGenerator>, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let store = Store::open(dir.path().join("data")).unwrap();
        let app = App::new(
            store,
            generator,
            default_registry(),
            Identity::default(),
            dir.path().join("downloads"),
            tx,
        );
        (app, rx)
    }

    /// Feed events back into the app until the generation outcome arrives.
    async fn run_until_finished(
        app: &mut App<MockGenerator>,
        rx: &mut mpsc::Receiver<AppEvent>,
    ) -> usize {
        let mut tips = 0;
        while let Some(event) = rx.recv().await {
            let done = matches!(event, AppEvent::GenerationFinished { .. });
            if matches!(event, AppEvent::TipTick) {
                tips += 1;
            }
            app.handle_event(event);
            if done {
                break;
            }
        }
        tips
    }

    #[tokio::test(start_paused = true)]
    async fn successful_generation_is_persisted() {
        let dir = TempDir::new().unwrap();
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&ready_user())
            .unwrap();
        let (mut app, mut rx) = app_with(&dir, MockGenerator::ok(Duration::from_secs(7)));
        assert_eq!(app.machine.step(), Step::MainView);

        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.machine.step(), Step::Generating);
        assert_eq!(app.timers_running(), (false, true));

        let tips = run_until_finished(&mut app, &mut rx).await;
        assert_eq!(tips, 2);
        assert_eq!(app.machine.step(), Step::MainView);
        assert_eq!(app.machine.images().len(), 1);
        assert_eq!(app.machine.images()[0].prompt, STYLE_OPTIONS[0].prompt);
        assert_eq!(app.timers_running(), (true, false));

        let loaded = Store::open(dir.path().join("data")).unwrap().load(Utc::now());
        assert_eq!(loaded.images.len(), 1);
        assert_eq!(loaded.images[0].author, "Ana");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_keeps_ticking_on_secondary_screens() {
        let dir = TempDir::new().unwrap();
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&ready_user())
            .unwrap();
        let (mut app, mut rx) = app_with(&dir, MockGenerator::ok(Duration::ZERO));
        app.dispatch(Action::SelectStyle {
            prompt: "X".to_string(),
        });
        run_until_finished(&mut app, &mut rx).await;
        assert!(!app.machine.cooldown().can_generate(Utc::now()));

        for (code, step) in [
            (KeyCode::Char('i'), Step::InfoScreen),
            (KeyCode::Char('p'), Step::PaymentScreen),
            (KeyCode::Char('u'), Step::ProfileScreen),
        ] {
            app.handle_key(key(code));
            assert_eq!(app.machine.step(), step);
            assert_eq!(app.timers_running(), (true, false));

            // Ticks keep arriving while the secondary screen is open.
            let event = rx.recv().await.unwrap();
            assert!(matches!(event, AppEvent::CooldownTick));
            app.handle_event(event);
            assert_eq!(app.timers_running(), (true, false));

            app.handle_key(key(KeyCode::Esc));
            assert_eq!(app.machine.step(), Step::MainView);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_leaves_feed_unchanged() {
        let dir = TempDir::new().unwrap();
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&ready_user())
            .unwrap();
        let (mut app, mut rx) = app_with(&dir, MockGenerator::ok(Duration::from_secs(120)));

        app.dispatch(Action::SelectStyle {
            prompt: "X".to_string(),
        });
        run_until_finished(&mut app, &mut rx).await;

        assert_eq!(app.machine.step(), Step::MainView);
        assert!(app.machine.images().is_empty());
        assert_eq!(app.machine.error(), Some(GenerateError::Timeout.to_string().as_str()));
        assert_eq!(app.timers_running(), (false, false));

        // Any key clears the banner.
        app.handle_key(key(KeyCode::Esc));
        assert!(app.machine.error().is_none());
    }

    #[tokio::test]
    async fn onboarding_from_keys() {
        let dir = TempDir::new().unwrap();
        let selfie = dir.path().join("me.jpg");
        std::fs::write(&selfie, b"selfie").unwrap();
        let (mut app, _rx) = app_with(&dir, MockGenerator::ok(Duration::ZERO));

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.machine.step(), Step::TermsAgreement);
        assert_eq!(app.machine.user().unwrap().name, "GaetanoModel");

        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.machine.step(), Step::ProfileSetup);
        assert_eq!(app.profile.name, "GaetanoModel");

        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('i')));
        for c in "SP".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.machine.step(), Step::SelfieCapture);

        app.handle_key(key(KeyCode::Char('i')));
        for c in selfie.to_str().unwrap().chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.machine.step(), Step::StyleSelection);
        assert!(app.machine.user().unwrap().has_selfie());
    }

    #[tokio::test]
    async fn unreadable_selfie_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut user = ready_user();
        user.selfie = None;
        user.has_completed_setup = false;
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&user)
            .unwrap();
        let (mut app, _rx) = app_with(&dir, MockGenerator::ok(Duration::ZERO));
        assert_eq!(app.machine.step(), Step::SelfieCapture);

        app.selfie_path = dir.path().join("missing.png").display().to_string();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.machine.step(), Step::SelfieCapture);
        assert!(app.machine.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn share_writes_to_download_dir() {
        let dir = TempDir::new().unwrap();
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&ready_user())
            .unwrap();
        let (mut app, mut rx) = app_with(&dir, MockGenerator::ok(Duration::ZERO));
        app.dispatch(Action::SelectStyle {
            prompt: "X".to_string(),
        });
        run_until_finished(&mut app, &mut rx).await;

        app.handle_key(key(KeyCode::Char('s')));
        let written = app.download_dir().join("top-model-ai-Ana.png");
        assert_eq!(std::fs::read(written).unwrap(), b"GEN");
        assert!(app.notice.is_some());
    }

    #[tokio::test]
    async fn stale_result_is_ignored() {
        let dir = TempDir::new().unwrap();
        Store::open(dir.path().join("data"))
            .unwrap()
            .save_user(&ready_user())
            .unwrap();
        let (mut app, _rx) = app_with(&dir, MockGenerator::ok(Duration::ZERO));

        app.on_generation_finished(42, Ok("data:image/png;base64,AAAA".to_string()));
        assert!(app.machine.images().is_empty());
    }
}
