//! stepwise CLI — the main entry point.
//!
//! Commands:
//! - `agent`    — Run the reasoning agent on one message or interactively
//! - `chat`     — Plain streaming chat, no tools
//! - `gateway`  — Start the HTTP API server
//! - `tools`    — List the built-in tools
//! - `config`   — Show, create or validate the config file

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "stepwise — a streaming ReAct agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.stepwise/config.toml
    #[arg(long, global = true, env = "STEPWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on a message, or interactively
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override [agent].max_steps
        #[arg(long)]
        max_steps: Option<usize>,

        /// Comma-separated tools to enable (default: config, then all)
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,

        /// Print raw events as JSON lines instead of rendered text
        #[arg(long)]
        trace: bool,
    },

    /// Chat with the model directly, without tools
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// List the built-in tools
    Tools,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration for problems
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries agent output.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Agent {
            message,
            max_steps,
            tools,
            trace,
        } => {
            let opts = commands::agent::AgentOptions {
                max_steps,
                tools,
                trace,
            };
            commands::agent::run(config_path, message, opts).await?
        }
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Gateway { port, host } => {
            commands::gateway::run(config_path, port, host).await?
        }
        Commands::Tools => commands::tools::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
        },
    }

    Ok(())
}
