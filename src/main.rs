//! ChatKit Panel - terminal client
//!
//! Runs the chat panel in the terminal and exposes the session exchange,
//! widget options and lead webhook as one-shot commands.

use anyhow::{bail, Context, Result};
use chatkit_panel::chat::{ColorScheme, LoggingFactSink};
use chatkit_panel::lead::{LeadNotifier, LeadPayload};
use chatkit_panel::panel::PanelController;
use chatkit_panel::widget::{LocalHost, WidgetOptions};
use chatkit_panel::{ui, Config};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chatkit-panel")]
#[command(about = "Chat panel over a hosted chat-widget SDK")]
struct Cli {
    /// Path to the YAML config file (defaults to ./config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log line format
    #[arg(
        long,
        global = true,
        env = "CHATKIT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat panel in the terminal
    Chat {
        /// Echo each message back as the assistant reply
        #[arg(long)]
        echo: bool,

        /// File receiving logs while the panel owns the terminal
        #[arg(long, env = "CHATKIT_LOG_FILE", default_value = "chatkit-panel.log")]
        log_file: PathBuf,
    },

    /// Obtain one client secret from the session backend and print it
    Session {
        /// Workflow to request a session for (overrides config)
        #[arg(short, long)]
        workflow_id: Option<String>,
    },

    /// Print the widget options as JSON
    Options {
        /// Color scheme: light or dark (overrides config)
        #[arg(long)]
        color_scheme: Option<String>,
    },

    /// Forward one lead to the configured webhook
    Lead {
        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        specialty: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Chat { log_file, .. } => Some(log_file.as_path()),
        _ => None,
    };
    init_tracing(log_file, cli.log_format)?;

    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { echo, .. } => run_chat(config, echo).await,
        Commands::Session { workflow_id } => run_session(config, workflow_id).await,
        Commands::Options { color_scheme } => print_options(config, color_scheme.as_deref()),
        Commands::Lead {
            name,
            phone,
            specialty,
        } => {
            run_lead(
                config,
                LeadPayload {
                    name,
                    phone,
                    specialty,
                },
            )
            .await
        }
    }
}

/// The TUI owns stdout, so logs go to a file; everything else logs to stderr.
fn init_tracing(log_file: Option<&Path>, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,chatkit_panel=debug".into());

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(log_file.is_none())
        .with_writer(writer);

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(layer).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
    Ok(())
}

async fn run_chat(config: Config, echo: bool) -> Result<()> {
    tracing::info!(
        base_url = %config.base_url,
        workflow_id = %config.workflow_id,
        "Starting chat panel"
    );

    let host = Arc::new(LocalHost::registered().with_echo(echo));
    let controller = PanelController::new(
        config.panel_config(),
        config.session_client(),
        host,
        Arc::new(LoggingFactSink),
    );
    ui::run(controller, config.layout).await
}

async fn run_session(config: Config, workflow_id: Option<String>) -> Result<()> {
    let workflow_id = workflow_id.unwrap_or_else(|| config.workflow_id.clone());
    let secret = config
        .session_client()
        .obtain_credential(&workflow_id, None)
        .await
        .context("creating chat session")?;
    println!("{secret}");
    Ok(())
}

fn print_options(config: Config, color_scheme: Option<&str>) -> Result<()> {
    let scheme = match color_scheme {
        Some(raw) => match ColorScheme::parse(raw) {
            Some(scheme) => scheme,
            None => bail!("unknown color scheme '{raw}', expected light or dark"),
        },
        None => config.color_scheme,
    };
    let options = WidgetOptions::new(scheme, config.file_upload_enabled);
    println!("{}", serde_json::to_string_pretty(&options.to_json())?);
    Ok(())
}

async fn run_lead(config: Config, lead: LeadPayload) -> Result<()> {
    let Some(url) = config.lead_webhook_url.as_deref() else {
        bail!("no lead webhook configured; set CHATKIT_LEAD_WEBHOOK_URL or lead.webhook_url");
    };
    LeadNotifier::new(url)
        .send(lead)
        .await
        .context("lead webhook task panicked")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["chatkit-panel", "options", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);

        let cli = Cli::try_parse_from(["chatkit-panel", "session"]).unwrap();
        assert!(matches!(cli.command, Commands::Session { workflow_id: None }));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(Cli::try_parse_from(["chatkit-panel", "--log-format", "xml", "options"]).is_err());
    }
}
