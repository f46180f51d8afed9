use std::{net::SocketAddr, time::Duration};

use adapters::{SheetsRuleStore, YnabLedger};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use engine::Engine;

use error::{AppError, Result};
use settings::Settings;

mod error;
mod settings;

#[derive(Debug, Parser)]
#[command(name = "shared_budget", version)]
struct Cli {
    /// Config file path (TOML).
    #[arg(long, env = "SHARED_BUDGET_CONFIG")]
    config: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Split the shared transactions once and exit.
    Sync {
        /// Inclusive lower bound, `YYYY-MM-DD`.
        #[arg(long)]
        since: Option<NaiveDate>,
        /// Print the computed splits without writing them.
        #[arg(long)]
        dry_run: bool,
    },
}

type SharedEngine = Engine<SheetsRuleStore, YnabLedger>;

fn build_engine(settings: &Settings) -> Result<SharedEngine> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.app.http_timeout_secs))
        .build()?;

    let rule_store = SheetsRuleStore::new(
        client.clone(),
        &settings.sheets.base_url,
        &settings.sheets.spreadsheet_id,
        settings.sheets.auth()?,
    );
    let ledger = YnabLedger::new(client, &settings.ynab.base_url, &settings.ynab.token);

    Ok(Engine::builder()
        .rule_store(rule_store)
        .ledger(ledger)
        .lookback_days(settings.app.lookback_days)
        .build()?)
}

async fn serve(engine: SharedEngine, settings: &Settings) -> Result<()> {
    if settings.server.api_key.is_empty() {
        return Err(AppError::Settings("server.api_key is not set".to_string()));
    }
    let addr: SocketAddr = format!("{}:{}", settings.server.bind, settings.server.port)
        .parse()
        .map_err(|err| AppError::Settings(format!("invalid server address: {err}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    server::run_with_listener(engine, settings.server.api_key.clone(), listener).await?;
    Ok(())
}

async fn sync(engine: SharedEngine, since: Option<NaiveDate>, dry_run: bool) -> Result<()> {
    if dry_run {
        let preview = engine.preview_split(None, since).await?;
        let view = server::views::preview_view(preview);
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let results = engine.apply_split(None, since).await?;
    let failed = results.iter().filter(|result| result.is_failure()).count();
    let views: Vec<_> = results.into_iter().map(server::views::upsert_view).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);

    if failed > 0 {
        return Err(AppError::FailedWrites(failed));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "shared_budget={level},server={level},engine={level},adapters={level}",
            level = settings.app.level
        ))
        .init();

    let engine = build_engine(&settings)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!("Starting server...");
            serve(engine, &settings).await?;
        }
        Command::Sync { since, dry_run } => sync(engine, since, dry_run).await?,
    }

    Ok(())
}
