use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod config;
mod cooldown;
mod machine;
mod registry;
mod selfie;
mod share;
mod store;
mod ticker;
mod ui;

use api::{GenerationClient, ImageGenerator};
use app::{default_registry, App, AppEvent};
use config::ClientConfig;
use store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if let Some(arg) = args.get(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("Usage: topmodel-tui");
                println!();
                println!("Environment:");
                println!("  TOPMODEL_SERVER_URL    Generation proxy (default http://localhost:3000)");
                println!("  TOPMODEL_DATA_DIR      Where the session is stored");
                println!("  TOPMODEL_DOWNLOAD_DIR  Where shared images are saved");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
                std::process::exit(1);
            }
        }
    }

    let config = ClientConfig::from_env()?;
    let store = Store::open(&config.data_dir)?;
    init_tracing(store.dir())?;
    tracing::info!(server = %config.server_url, data_dir = %store.dir().display(), "starting");

    let client = GenerationClient::new(&config.server_url);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel::<AppEvent>(100);
    let app = App::new(
        store,
        client,
        default_registry(),
        config.identity,
        config.download_dir,
        tx.clone(),
    );
    let res = run_app(&mut terminal, app, tx, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("{:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// The terminal owns stdout, so logs go to `<data dir>/tui.log`.
fn init_tracing(dir: &Path) -> Result<()> {
    let path = dir.join("tui.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topmodel_tui=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}

async fn run_app<B, G>(
    terminal: &mut Terminal<B>,
    mut app: App<G>,
    tx: mpsc::Sender<AppEvent>,
    mut rx: mpsc::Receiver<AppEvent>,
) -> Result<()>
where
    B: ratatui::backend::Backend,
    G: ImageGenerator,
{
    // Spawn input handler
    tokio::spawn(async move {
        loop {
            let key = tokio::task::block_in_place(|| {
                if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(key),
                        _ => None,
                    }
                } else {
                    None
                }
            });
            if let Some(key) = key {
                if tx.send(AppEvent::Key(key)).await.is_err() {
                    break;
                }
            }
        }
    });

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        let Some(event) = rx.recv().await else {
            return Ok(());
        };
        if app.handle_event(event) {
            tracing::info!("quit");
            return Ok(());
        }
    }
}
