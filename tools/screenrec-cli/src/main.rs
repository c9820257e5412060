//! screenrec CLI: command-line host for the recording bridge.
//!
//! Usage:
//!   screenrec check              Check whether screen capture works here
//!   screenrec record [OPTIONS]   Record the screen until Ctrl+C
//!   screenrec status             Print the bridge status as JSON
//!   screenrec config show|init   Print or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use screenrec_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "screenrec",
    about = "Screen recording through a platform capture framework",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the in-process simulated capture framework
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether screen capture is available
    Check,

    /// Record the screen until Ctrl+C, the duration elapses, or capture is interrupted
    Record {
        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target FPS
        #[arg(long)]
        fps: Option<u32>,

        /// Video bitrate in kbit/s
        #[arg(long)]
        bitrate: Option<u32>,

        /// Capture the pointer (true/false; defaults to the configured value)
        #[arg(long, value_name = "BOOL")]
        show_cursor: Option<bool>,

        /// Stop automatically after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Print the bridge status as JSON
    Status,

    /// Inspect or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration (keeps an existing file unless --force)
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    screenrec_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Check => commands::check::run(cli.simulate).await,
        Commands::Record {
            output,
            fps,
            bitrate,
            show_cursor,
            duration,
        } => {
            let options = commands::record::RecordOptions {
                output,
                fps,
                bitrate_kbps: bitrate,
                show_cursor,
                duration_secs: duration,
                simulate: cli.simulate,
            };
            commands::record::run(config, options).await
        }
        Commands::Status => commands::status::run(config, cli.simulate).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config),
            ConfigAction::Init { force } => commands::config::init(force),
        },
    }
}
