//! scenelink - External editor synchronization bridge
//!
//! Connects to a companion external editor on a port taken from the launch
//! arguments and keeps the in-memory project synchronized with it: full
//! project pulls on window focus, instances pushes on window blur. Without
//! a server port the bridge runs local-only and projects are loaded from
//! disk or the builtin sample.
//!
//! This binary has no window system of its own, so focus/blur and view
//! commands come from a small stdin console.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use scenelink::controller::{EditorKind, LaunchOptions, Notice, SyncController};
use scenelink::transport::{TcpTransport, TransportEvent};
use scenelink::views::select_panels;
use scenelink::{Config, JsonCodec};

#[derive(Parser)]
#[command(name = "scenelink")]
#[command(version, about = "External editor synchronization bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Port the external editor listens on (absent = local-only mode)
    #[arg(long)]
    server_port: Option<u16>,

    /// Editor kind to auto-open (scene-editor, external-layout-editor)
    #[arg(long)]
    editor: Option<EditorKind>,

    /// Name of the element to auto-open
    #[arg(long)]
    edited_element_name: Option<String>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the synchronization session (default)
    Run,

    /// Show effective configuration
    Config,
}

/// Everything the main loop reacts to
enum AppEvent {
    Transport(TransportEvent),
    Console(ConsoleCommand),
}

/// Operator commands from the stdin console
enum ConsoleCommand {
    Focus,
    Blur,
    OpenScene(String),
    LoadBuiltin,
    OpenFile(PathBuf),
    Status,
    Quit,
}

fn parse_console_line(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.trim().splitn(2, ' ');
    let command = parts.next()?;
    let arg = parts.next().map(str::trim);

    match (command, arg) {
        ("focus", _) => Some(ConsoleCommand::Focus),
        ("blur", _) => Some(ConsoleCommand::Blur),
        ("open", Some(name)) if !name.is_empty() => {
            Some(ConsoleCommand::OpenScene(name.to_string()))
        }
        ("load-builtin", _) => Some(ConsoleCommand::LoadBuiltin),
        ("open-file", Some(path)) if !path.is_empty() => {
            Some(ConsoleCommand::OpenFile(PathBuf::from(path)))
        }
        ("status", _) => Some(ConsoleCommand::Status),
        ("quit", _) | ("exit", _) => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(Commands::Config) = cli.command {
        let rendered = toml::to_string_pretty(&config)?;
        println!("{}", rendered);
        return Ok(());
    }

    run_session(cli, config)
}

fn run_session(cli: Cli, config: Config) -> Result<()> {
    let launch = LaunchOptions {
        editor: cli.editor,
        edited_element_name: cli.edited_element_name.clone(),
    };
    let request_timeout = Duration::from_secs(config.transport.request_timeout_secs);

    let mut controller = SyncController::new(
        Box::new(JsonCodec::new()),
        launch,
        config.sync.clone(),
        request_timeout,
    );
    controller.on_notice(|notice| match notice {
        Notice::LoadingStarted => println!("... loading"),
        Notice::LoadingFinished => println!("... done"),
        Notice::ProjectReplaced { name } => println!("project replaced: {}", name),
        Notice::RaiseWindow => println!("(editor requested window raise)"),
        Notice::InstanceUpdateDropped => {
            println!("(instances update from editor dropped)")
        }
        Notice::StaleResponseDiscarded { token } => {
            println!("(stale response discarded, token {})", token)
        }
        Notice::InstancesPushed { layout } => println!("pushed instances of {}", layout),
        Notice::SyncFailed { error } => eprintln!("sync failed: {}", error),
    });

    let (events_tx, events_rx) = channel::<AppEvent>();

    // Transport, when a server port was handed to us
    match cli.server_port {
        Some(port) if TcpTransport::is_supported() => {
            let connect_timeout = Duration::from_secs(config.transport.connect_timeout_secs);
            match TcpTransport::connect(&config.transport.host, port, connect_timeout) {
                Ok((transport, transport_rx)) => {
                    info!(port, "connected to external editor");
                    controller.attach_transport(Box::new(transport));

                    // Forward transport events into the main loop. No
                    // reconnection: when the channel closes, that is it.
                    let tx = events_tx.clone();
                    thread::spawn(move || {
                        for event in transport_rx {
                            if tx.send(AppEvent::Transport(event)).is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => {
                    // Degrade to local-only, no retry
                    warn!(port, error = %e, "external editor unreachable, running local-only");
                }
            }
        }
        Some(_) => warn!("external editor transport not supported, running local-only"),
        None => info!("no server port given, running local-only"),
    }

    if controller.is_local_only() {
        println!("local-only mode: use `load-builtin` or `open-file <path>`");
    }
    println!("commands: focus, blur, open <scene>, load-builtin, open-file <path>, status, quit");

    // Stdin console
    {
        let tx = events_tx.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if let Some(command) = parse_console_line(&line) {
                    if tx.send(AppEvent::Console(command)).is_err() {
                        break;
                    }
                } else if !line.trim().is_empty() {
                    eprintln!("unknown command: {}", line.trim());
                }
            }
            let _ = tx.send(AppEvent::Console(ConsoleCommand::Quit));
        });
    }

    // Main loop: single-threaded and cooperative, one event at a time
    loop {
        match events_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(AppEvent::Transport(event)) => controller.handle_transport_event(event),
            Ok(AppEvent::Console(command)) => match command {
                ConsoleCommand::Focus => controller.handle_window_focus(),
                ConsoleCommand::Blur => controller.handle_window_blur(),
                ConsoleCommand::OpenScene(name) => {
                    controller.views_mut().open_scene(&name);
                    println!("scene opened: {}", name);
                }
                ConsoleCommand::LoadBuiltin => controller.load_builtin_project(),
                ConsoleCommand::OpenFile(path) => {
                    if let Err(e) = controller.open_project_file(&path) {
                        eprintln!("failed to open {}: {}", path.display(), e);
                    }
                }
                ConsoleCommand::Status => print_status(&controller),
                ConsoleCommand::Quit => break,
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        controller.check_timeout(Instant::now());
    }

    info!("session ended");
    Ok(())
}

fn print_status(controller: &SyncController) {
    let stats = controller.stats();
    println!("state: {:?}", controller.state());
    println!(
        "mode: {}",
        if controller.is_local_only() {
            "local-only"
        } else {
            "synchronized"
        }
    );
    match controller.project() {
        Some(project) => {
            println!("project: {} ({} scenes)", project.name, project.layouts.len());
            for panel in select_panels(project, controller.views()) {
                match panel.placeholder() {
                    Some(text) => println!("panel: {:?} -- {}", panel, text),
                    None => println!("panel: {:?}", panel),
                }
            }
        }
        None => println!("project: none"),
    }
    println!(
        "stats: {} applied, {} stale discarded, {} pushes, {} timeouts",
        stats.updates_applied, stats.stale_responses_discarded, stats.instance_pushes,
        stats.timeouts
    );
    if let Some(error) = stats.last_error {
        println!("last error: {}", error);
    }
}
