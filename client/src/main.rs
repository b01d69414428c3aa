use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ragchat::app::App;
use ragchat::config::{self, AppConfig, DEFAULT_CONFIG_FILE};
use ragchat::credentials::{FileStore, SessionContext};
use ragchat::{ui, Backend, HttpBackend, Notifier};
use ratatui::prelude::*;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FRAME: Duration = Duration::from_millis(50);

fn init_tracing(config: &AppConfig) -> Result<WorkerGuard> {
    // The terminal belongs to the UI, so logs go to a file.
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ragchat")
        .filename_suffix("log")
        .build(config.log_dir())
        .context("failed to open log directory")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragchat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = config::load_config(&config_path).await?;
    let _guard = init_tracing(&config)?;
    tracing::info!(base_url = %config.base_url, "starting ragchat");

    let store = FileStore::open(config.credentials_path())?;
    let context = Arc::new(SessionContext::init(Box::new(store)));
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
        &config.base_url,
        config.request_timeout(),
        context.clone(),
    )?);
    let notifier = Arc::new(Notifier::new(context, config.notice_delay()));
    let mut app = App::new(backend, notifier, config.base_url.clone());

    // Key events are read on a blocking thread and forwarded to the loop.
    let (tx, mut rx) = mpsc::channel::<KeyEvent>(32);
    std::thread::spawn(move || loop {
        match event::poll(FRAME) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.blocking_send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("terminal read failed: {e}");
                    break;
                }
            },
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("terminal poll failed: {e}");
                break;
            }
        }
    });

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut frames = tokio::time::interval(FRAME);
    let result = async {
        while app.is_running() {
            terminal.draw(|f| ui::draw(f, &app))?;

            tokio::select! {
                key = rx.recv() => match key {
                    Some(key) => app.on_key(key),
                    None => break,
                },
                _ = frames.tick() => app.tick(Instant::now()),
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // Restore Terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    tracing::info!("exiting");

    result
}
