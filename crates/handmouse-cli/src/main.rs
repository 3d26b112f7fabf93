//! CLI for Hand Mouse OS: watch and steer the gesture tracking engine.

mod commands;
mod tui;

use std::fs::File;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "handmouse")]
#[command(about = "Hand Mouse OS: dashboard and control for the gesture tracking engine")]
#[command(version = handmouse_core::VERSION)]
struct Cli {
    /// Engine control socket (default: /tmp/handmouse.sock, or the dashboard config's socket_path)
    #[arg(long, global = true)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live interactive dashboard (TUI)
    Dash {
        /// Refresh rate in seconds (overrides the config file)
        #[arg(long)]
        refresh: Option<f64>,

        /// Feed the dashboard simulated telemetry instead of polling the engine
        #[arg(long)]
        simulate: bool,

        /// Dashboard config file (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Write diagnostics to this file (the terminal is taken by the dashboard)
        #[arg(long)]
        log_file: Option<String>,
    },

    /// Show whether the engine is running and what it is doing
    Status {
        /// Print the raw engine status as JSON (exits 1 when unreachable)
        #[arg(long)]
        json: bool,
    },

    /// Read or change engine settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Resume gesture processing
    Start,

    /// Stop gesture processing
    Stop,

    /// Switch the engine to another camera
    Camera {
        /// Camera device index
        index: u32,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting: asl | status
    Get { key: String },
    /// Change a setting: asl <true|false>
    Set { key: String, value: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.command);

    let socket = cli.socket.as_deref();
    match cli.command {
        Commands::Dash {
            refresh,
            simulate,
            config,
            log_file: _,
        } => commands::dash::run(commands::dash::DashCommandConfig {
            socket,
            refresh,
            simulate,
            config_path: config.as_deref(),
        }),
        Commands::Status { json } => commands::status::run(socket, json),
        Commands::Config { action } => match action {
            ConfigAction::Get { key } => commands::config::get(socket, &key),
            ConfigAction::Set { key, value } => commands::config::set(socket, &key, &value),
        },
        Commands::Start => commands::engine::start(socket),
        Commands::Stop => commands::engine::stop(socket),
        Commands::Camera { index } => commands::engine::camera(socket, index),
    }
}

/// `RUST_LOG` always wins. The dashboard owns the terminal, so without a log
/// file its diagnostics are off by default.
fn init_logging(command: &Commands) {
    let (default_filter, log_file) = match command {
        Commands::Dash { log_file, .. } => match log_file {
            Some(path) => ("info", Some(path.as_str())),
            None => ("off", None),
        },
        _ => ("warn", None),
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open log file {path}: {e}");
                std::process::exit(1);
            }
        }
    }
    builder.init();
}
