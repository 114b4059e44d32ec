mod config;
mod render;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{MissionConfig, CONFIG_FILE, MISSION_DIR};
use events::EventBus;
use mission_client::{ExecuteStreamEvent, MissionClient};
use mission_core::Stage;
use orchestrator::{FileStorage, MissionOrchestrator, ReceiptStorage, ReceiptStore};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mission")]
#[command(about = "Plan, simulate and execute missions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Mission service base URL (overrides config and MISSION_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides config and MISSION_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .mission/config.toml
    Init,
    /// Plan, simulate and execute a mission
    Run {
        /// Mission description
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,

        /// Execute without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Execute an intent directly and stream progress
    Direct {
        #[arg(required = true, trailing_var_arg = true)]
        intent: Vec<String>,

        #[arg(long, default_value = "auto")]
        mode: String,
    },
    /// Show stored receipts
    Receipts {
        /// Remove all stored receipts
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    if let Commands::Init = cli.command {
        return init_project(&cwd).await;
    }

    init_tracing();

    let mut config = MissionConfig::load(&cwd).await?;
    config.apply_overrides(|key| std::env::var(key).ok(), cli.api_url, cli.token);

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Run { text, yes } => run_mission(&cwd, &config, &text.join(" "), yes).await,
        Commands::Direct { intent, mode } => direct(&config, &intent.join(" "), &mode).await,
        Commands::Receipts { clear } => receipts(&cwd, &config, clear).await,
    }
}

async fn init_project(cwd: &Path) -> Result<()> {
    let mission_dir = cwd.join(MISSION_DIR);
    let config_path = MissionConfig::path_in(cwd);

    if config_path.exists() {
        println!("Already initialized at {}", config_path.display());
        return Ok(());
    }

    tokio::fs::create_dir_all(&mission_dir)
        .await
        .with_context(|| format!("Failed to create {}", mission_dir.display()))?;

    let content = toml::to_string_pretty(&MissionConfig::default())?;
    tokio::fs::write(&config_path, content).await?;

    println!("Initialized mission client in {}", cwd.display());
    println!();
    println!("Created:");
    println!("  {}/", MISSION_DIR);
    println!("  └── {}", CONFIG_FILE);
    println!();
    println!("Next steps:");
    println!("  1. Set [api] url in {} or export MISSION_API_URL", config_path.display());
    println!("  2. Run 'mission run <description>'");

    Ok(())
}

async fn load_store(cwd: &Path, config: &MissionConfig) -> ReceiptStore {
    let receipt_config = config.receipt_config();
    let storage: Arc<dyn ReceiptStorage> = Arc::new(FileStorage::new(config.receipts_dir(cwd)));
    ReceiptStore::load(storage, &receipt_config).await
}

async fn run_mission(cwd: &Path, config: &MissionConfig, text: &str, yes: bool) -> Result<()> {
    let client = MissionClient::new(config.client_config());
    let orchestrator_config = config.orchestrator_config();
    let store = load_store(cwd, config).await;

    let bus = EventBus::new();
    let printer = tokio::spawn(render::print_events(bus.subscribe()));

    let mut mission = MissionOrchestrator::new(Arc::new(client), orchestrator_config, store)
        .with_event_bus(bus);

    let outcome = drive(&mut mission, text, yes).await;

    let receipt = match mission.stage() {
        Stage::Completed => mission.receipts().latest().cloned(),
        _ => None,
    };
    let error = mission.last_error().cloned();

    // Dropping the orchestrator closes the bus so the printer drains and exits.
    drop(mission);
    printer.await.context("Event printer panicked")?;

    outcome?;

    if let Some(receipt) = receipt {
        println!();
        render::print_receipt(&receipt);
    }
    if let Some(error) = error {
        bail!("{}", error.message);
    }
    Ok(())
}

async fn drive(mission: &mut MissionOrchestrator, text: &str, yes: bool) -> Result<()> {
    if mission.submit(text).await? != Stage::Planned {
        return Ok(());
    }

    if mission.config().require_simulation && mission.simulate().await? != Stage::AwaitingExecute {
        return Ok(());
    }

    if !yes && !confirm("Execute this plan?").await? {
        mission.reject_plan()?;
        return Ok(());
    }

    let token = mission.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Cancelling run");
            token.cancel();
        }
    });

    let stage = mission.execute().await;
    ctrl_c.abort();

    if stage? == Stage::Idle {
        println!("{}", "Cancelled. The run may still finish on the service.".yellow());
    }
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || -> Result<bool> {
        print!("\n{} [y/N] ", prompt);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    })
    .await
    .context("Confirmation prompt panicked")?
}

async fn direct(config: &MissionConfig, intent: &str, mode: &str) -> Result<()> {
    let client = MissionClient::new(config.client_config());
    let mut stream = client
        .execute_intent(intent, mode)
        .await
        .map_err(|e| anyhow::anyhow!(mission_core::ErrorClassifier::classify(&e.failure())))?;

    loop {
        let event = tokio::select! {
            event = stream.next_event() => event,
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped following the run.".yellow());
                return Ok(());
            }
        };

        match event {
            Some(Ok(ExecuteStreamEvent::Log { line })) => println!("    {}", line.dimmed()),
            Some(Ok(ExecuteStreamEvent::Step { label })) => println!("  {} {}", "•".cyan(), label),
            Some(Ok(ExecuteStreamEvent::Final(payload))) => {
                println!();
                println!("{}", "Done".green().bold());
                let fields = [
                    ("run", &payload.run_id),
                    ("job", &payload.job_id),
                    ("cid", &payload.cid),
                    ("tx", &payload.tx_hash),
                ];
                for (label, value) in fields {
                    if let Some(value) = value {
                        println!("    {:<5}{}", label, value);
                    }
                }
                return Ok(());
            }
            Some(Ok(ExecuteStreamEvent::Error { message })) => bail!("{}", message),
            Some(Ok(ExecuteStreamEvent::Unknown)) => {}
            Some(Err(e)) => bail!(mission_core::ErrorClassifier::classify(&e.failure())),
            None => bail!("Stream ended without a final result"),
        }
    }
}

async fn receipts(cwd: &Path, config: &MissionConfig, clear: bool) -> Result<()> {
    let mut store = load_store(cwd, config).await;

    if clear {
        let count = store.len();
        store.clear().await.context("Failed to clear receipts")?;
        println!("Removed {} receipts.", count);
        return Ok(());
    }

    if store.is_empty() {
        println!("No receipts yet.");
        return Ok(());
    }

    println!();
    println!("Receipts ({}/{}):", store.len(), store.max_entries());
    for receipt in store.receipts() {
        render::print_receipt(receipt);
    }
    println!();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mission=info,orchestrator=info,mission_client=info".into()),
        )
        .init();
}
