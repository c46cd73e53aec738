//! Mailvoice CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use mailvoice::bootstrap::build_drafter;
use mailvoice::config::Config;
use mailvoice::credentials::load_credentials;
use mailvoice::drafting::{DraftResult, IncomingMessage};
use mailvoice::logging;
use mailvoice::server::{persona_route, run_server, AppState};

/// Drafts email replies in learned persona voices.
#[derive(Parser)]
#[command(name = "mailvoice", version, about)]
struct Cli {
    /// Config file (defaults to `$MAILVOICE_CONFIG_PATH` or `./mailvoice.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `.env` file with API keys; the process environment wins.
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,
    /// Draft one reply and print the result as JSON.
    Draft {
        /// Persona id, e.g. `personal` or `admin`.
        #[arg(long)]
        persona: String,
        /// Incoming subject.
        #[arg(long, default_value = "")]
        subject: String,
        /// Incoming body.
        #[arg(long, default_value = "")]
        body: String,
        /// Incoming sender.
        #[arg(long, default_value = "")]
        from: String,
    },
    /// Validate config and credentials, then exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    // `serve` picks its log sink from the config; everything else logs to
    // stderr from the start so config loading is visible.
    if !matches!(cli.command, Command::Serve) {
        logging::init_cli();
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve => serve(config, cli.config.as_deref(), &cli.env_file).await,
        Command::Draft {
            persona,
            subject,
            body,
            from,
        } => {
            let message = IncomingMessage {
                subject,
                body,
                sender: from,
            };
            draft(config, &cli.env_file, &persona, &message).await
        }
        Command::Check => check(&config, &cli.env_file),
    }
}

async fn serve(
    config: Config,
    config_arg: Option<&Path>,
    env_file: &Path,
) -> anyhow::Result<ExitCode> {
    let _guard = match &config.server.log_dir {
        Some(dir) => Some(logging::init_production(dir)?),
        None => {
            logging::init_cli();
            None
        }
    };
    let config_path = Config::resolve_path(config_arg, |key| std::env::var(key).ok());
    info!(
        path = %config_path.display(),
        found = config_path.is_file(),
        bind = %config.server.bind_addr(),
        "configuration loaded"
    );

    let credentials = load_credentials(env_file)?;
    let drafter = build_drafter(&config, &credentials).await?;
    let state = AppState {
        drafter: Arc::new(drafter),
    };
    run_server(
        state,
        &config.server.bind_addr(),
        config.server.max_body_bytes,
    )
    .await?;
    Ok(ExitCode::SUCCESS)
}

async fn draft(
    config: Config,
    env_file: &Path,
    persona: &str,
    message: &IncomingMessage,
) -> anyhow::Result<ExitCode> {
    let credentials = load_credentials(env_file)?;
    let drafter = build_drafter(&config, &credentials).await?;
    let result = drafter.draft_result(persona, message).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(match result {
        DraftResult::Success(_) => ExitCode::SUCCESS,
        DraftResult::Failure { .. } => ExitCode::FAILURE,
    })
}

fn check(config: &Config, env_file: &Path) -> anyhow::Result<ExitCode> {
    config.validate()?;
    let credentials = load_credentials(env_file)?;
    config.check_credentials(&credentials)?;
    let personas = config.persona_registry()?;
    info!(
        personas = ?personas.ids(),
        collections = ?personas.collections(),
        "configuration ok"
    );
    for persona in personas.iter() {
        println!(
            "{}\t{}\t{}\ttemperature={}",
            persona.id,
            persona.collection,
            persona_route(&persona.id),
            persona.temperature
        );
    }
    println!("ok: {} personas", personas.len());
    Ok(ExitCode::SUCCESS)
}
