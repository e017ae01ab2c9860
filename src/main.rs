//! FocusFlow - a menubar Pomodoro timer.
//!
//! The session controller runs on its own thread and owns the timer state.
//! The tray menu and the console are views that talk to it over channels.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use clap::Parser;
use muda::MenuEvent;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

mod audio;
mod badge;
mod cli;
mod command;
mod config;
mod console;
mod controller;
mod event;
mod menu;
mod models;
mod notifications;
mod persistence;
mod stats;
mod timer;
mod todos;
mod tray;
mod view;

use badge::{Badge, BadgeSink, ChannelBadge, LoggedBadge};
use cli::{Cli, Commands};
use command::{Command, ControllerHandle, HandleError};
use config::Config;
use controller::{SessionController, Sinks};
use event::{EventContext, EventResult};
use notifications::DesktopNotifier;
use persistence::{ControllerLock, Database};
use timer::ThreadTicker;
use tray::TrayView;
use view::ViewClient;

/// Upper bound on how long the event loop sleeps between menu and badge checks.
const MAX_IDLE: Duration = Duration::from_millis(100);

/// Application handler for the winit event loop.
struct FocusFlow {
    view: ViewClient<TrayView>,
    badges: Receiver<Badge>,
}

impl FocusFlow {
    fn process_badges(&mut self) {
        while let Ok(badge) = self.badges.try_recv() {
            self.view.renderer_mut().show_badge(&badge);
        }
    }

    fn process_menu_events(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            let result = {
                let Some(state) = self.view.state() else {
                    continue;
                };
                let tray = self.view.renderer();
                let ctx = EventContext {
                    state,
                    strict_mode: tray.strict_mode(),
                    todos: tray.items().todos(),
                };
                event::handle_menu_event(event.id().as_ref(), &ctx)
            };

            match result {
                EventResult::Quit => {
                    event_loop.exit();
                    return;
                }
                EventResult::Send(command) => {
                    let picked_tag = match &command {
                        Command::SetTask { tag, .. } => Some(tag.clone()),
                        _ => None,
                    };
                    let response = match self.view.send(command) {
                        Ok(response) => response,
                        Err(e) => {
                            error!("{}", e);
                            event_loop.exit();
                            return;
                        }
                    };
                    // The reply to SetTask carries no state, so nothing redraws the tag items
                    if let Some(tag) = picked_tag {
                        let shown = if response.is_success() {
                            Some(tag)
                        } else {
                            self.view.state().map(|state| state.current_tag.clone())
                        };
                        if let Some(tag) = shown {
                            self.view.renderer().select_tag(&tag);
                        }
                    }
                }
                EventResult::StrictChanged(on) => self.view.renderer_mut().set_strict_mode(on),
                EventResult::ToggleTodo(index) => self.view.renderer_mut().toggle_todo(index),
                EventResult::Continue => {}
            }
        }
    }
}

impl ApplicationHandler for FocusFlow {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        // Nothing to do on resume for a tray-only app
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
        // No window events for a tray-only app
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.process_badges();
        self.process_menu_events(event_loop);

        if let Err(e) = self.view.pump() {
            error!("{}", e);
            event_loop.exit();
            return;
        }

        let wake = self.view.next_poll().min(Instant::now() + MAX_IDLE);
        event_loop.set_control_flow(ControlFlow::WaitUntil(wake));
    }
}

/// Starts the controller thread on the database at `path`.
fn start_controller<B>(
    path: PathBuf,
    badge: B,
) -> Result<(ControllerHandle, JoinHandle<()>), HandleError>
where
    B: BadgeSink + Send + 'static,
{
    controller::spawn(move |tick_tx| {
        let store = Database::open(&path)?;
        SessionController::load(
            Box::new(store),
            Box::new(ThreadTicker::new(tick_tx)),
            Sinks {
                notifier: Box::new(DesktopNotifier),
                // Opened here: the output stream must stay on the thread that plays
                sound: audio::open_default(),
                badge: Box::new(badge),
            },
        )
    })
}

fn run_tray(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Create event loop (required for tray on macOS)
    let event_loop = EventLoop::new()?;

    let _lock = ControllerLock::acquire(&config.database_path)?;

    let (badge_tx, badge_rx) = mpsc::channel();
    let (handle, join) = start_controller(config.database_path.clone(), ChannelBadge::new(badge_tx))?;

    let tray = TrayView::new(Database::open(&config.database_path)?)?;
    let view = ViewClient::activate(handle.clone(), tray, config.poll_interval())?;

    let mut app = FocusFlow {
        view,
        badges: badge_rx,
    };
    info!(db = %config.database_path.display(), "tray started");
    let result = event_loop.run_app(&mut app);

    handle.shutdown();
    if join.join().is_err() {
        warn!("session controller thread panicked");
    }
    result?;
    Ok(())
}

fn run_console(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let _lock = ControllerLock::acquire(&config.database_path)?;
    let (handle, join) = start_controller(config.database_path.clone(), LoggedBadge)?;

    let store = Database::open(&config.database_path)?;
    let stdin = io::BufReader::new(io::stdin());
    let result = console::run(
        handle.clone(),
        &store,
        stdin,
        io::stdout(),
        config.poll_interval(),
    );

    handle.shutdown();
    if join.join().is_err() {
        warn!("session controller thread panicked");
    }
    result?;
    Ok(())
}

fn init_logging(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_tray(&config)?,
        Commands::Console => run_console(&config)?,
        Commands::Status => {
            let db = Database::open(&config.database_path)?;
            cli::handle_status(&db, &mut io::stdout().lock())?;
        }
        Commands::Settings { action } => {
            let db = Database::open(&config.database_path)?;
            cli::handle_settings(&db, action, &mut io::stdout().lock())?;
        }
        Commands::Todo { action } => {
            let db = Database::open(&config.database_path)?;
            cli::handle_todo(&db, action, &mut io::stdout().lock())?;
        }
        Commands::History { limit, action } => {
            let db = Database::open(&config.database_path)?;
            cli::handle_history(&db, limit, action, &mut io::stdout().lock())?;
        }
        Commands::Stats => {
            let db = Database::open(&config.database_path)?;
            cli::handle_stats(&db, &mut io::stdout().lock())?;
        }
    }

    Ok(())
}
