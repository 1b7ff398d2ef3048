pub mod ask;
pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

/// pagepilot: a tool-calling chat agent that can drive a host page.
#[derive(Debug, Parser)]
#[command(name = "pagepilot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Run one exchange in-process and print the result.
    Run {
        /// The message to send.
        message: String,
        /// Session id (defaults to "cli:run").
        #[arg(long, default_value = "cli:run")]
        session: String,
        /// Print the full response as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Send a message to a running server and render its event stream.
    Ask {
        /// The message to send.
        message: String,
        /// Base URL of the server.
        #[arg(long, default_value = "http://127.0.0.1:3010")]
        url: String,
        /// Session id (defaults to "cli:ask").
        #[arg(long, default_value = "cli:ask")]
        session: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `PAGEPILOT_CONFIG` (or
/// `config.toml` by default). A missing file yields the defaults.
/// Returns the parsed [`Config`](pp_domain::config::Config) and the path
/// that was used.
pub fn load_config() -> anyhow::Result<(pp_domain::config::Config, String)> {
    let config_path =
        std::env::var("PAGEPILOT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        pp_domain::config::Config::default()
    };

    Ok((config, config_path))
}
