use std::io;
use std::panic;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use timeboard::app::{Action, App};
use timeboard::board::BoardSyncEngine;
use timeboard::cli::{self, Command};
use timeboard::notifications::NotificationQueue;
use timeboard::timer::TimerController;
use timeboard::{config, event, providers, ui};

const LOG_ENV: &str = "TIMEBOARD_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("timeboard=info"))
}

/// The terminal UI owns stdout, so logs go to `~/.timeboard/timeboard.log`.
fn init_file_logging() -> Result<WorkerGuard> {
    let dir = config::data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "timeboard.log"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::parse_args(&args)? {
        Command::Tui => run_tui().await,
        Command::Status => {
            init_stderr_logging();
            cli::handle_status().await
        }
        Command::Toggle(cmd) => {
            init_stderr_logging();
            cli::handle_toggle(cmd).await
        }
        Command::Whoami => {
            init_stderr_logging();
            cli::handle_whoami().await
        }
        Command::Projects => {
            init_stderr_logging();
            cli::handle_projects().await
        }
        Command::Help => {
            cli::print_help();
            Ok(())
        }
    }
}

async fn run_tui() -> Result<()> {
    let _log_guard = init_file_logging()?;
    let config = Arc::new(config::load_config()?);
    tracing::info!(
        harvest = config.harvest.is_some(),
        profiles = config.jira_profiles.len(),
        links = config.links.len(),
        "starting"
    );

    let notifications = NotificationQueue::new(config.notifications.ttl());
    let timer = Arc::new(TimerController::new(
        providers::create_time_tracker(&config),
        notifications.clone(),
    ));
    let board = Arc::new(BoardSyncEngine::new(
        providers::create_issue_tracker(),
        notifications.clone(),
    ));

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let mut app = App::new(config, timer, board, notifications, action_tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Restore the terminal before printing a panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let input_cancel = CancellationToken::new();
    let event_tx = action_tx.clone();
    let events = tokio::spawn(event::run_event_loop(event_tx, input_cancel.clone()));

    app.start();

    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        match action_rx.recv().await {
            Some(action) => {
                app.update(action).await;
                if app.should_quit {
                    break;
                }
            }
            None => break,
        }
    }

    app.stop();
    input_cancel.cancel();
    let _ = events.await;

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    tracing::info!("exiting");

    Ok(())
}
