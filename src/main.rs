use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use attachment_filer::pipeline::DocumentOutcome;
use attachment_filer::routing::CollisionPolicy;
use attachment_filer::{BatchReport, CancelFlag, ConfigError, FilerConfig, PipelineError};

#[derive(Parser, Debug)]
#[command(name = "attachment-filer")]
#[command(about = "Classify retrieved attachments and file them into client folders")]
#[command(version)]
struct Cli {
    /// Directory of attachments to process
    #[arg(short, long, env = "FILER_INPUT_DIR")]
    input: Option<PathBuf>,

    /// Root of the client folders
    #[arg(short, long, env = "FILER_CLIENTS_DIR")]
    clients: Option<PathBuf>,

    /// JSON address book mapping sender addresses to client folders
    #[arg(short, long, env = "FILER_ADDRESS_BOOK")]
    address_book: Option<PathBuf>,

    /// Originating address for files not listed in .senders.json
    #[arg(short, long, env = "FILER_DEFAULT_SENDER")]
    sender: Option<String>,

    /// Documents processed concurrently
    #[arg(short = 'j', long, env = "FILER_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,

    /// What to do when the destination name is taken: suffix or reject
    #[arg(long, env = "FILER_COLLISION_POLICY")]
    collision: Option<CollisionPolicy>,

    /// Write the batch report as JSON to this path
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Classify and plan destinations without moving anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to write report {path}: {reason}")]
    Report { path: String, reason: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    attachment_filer::load_dotenv();
    attachment_filer::init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = FilerConfig::from_env()?;
    apply_overrides(&mut config, &cli);

    let cancel = CancelFlag::new();
    let pipeline = config.build_pipeline(cancel.clone())?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("[Pipeline] Interrupt received; finishing in-flight documents");
            cancel.cancel();
        }
    });

    let report = pipeline.run(&config.input_dir).await?;
    print_summary(&report);

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }
    Ok(())
}

fn apply_overrides(config: &mut FilerConfig, cli: &Cli) {
    if let Some(input) = &cli.input {
        config.input_dir = input.clone();
    }
    if let Some(clients) = &cli.clients {
        config.clients_dir = clients.clone();
    }
    if let Some(book) = &cli.address_book {
        config.address_book = Some(book.clone());
    }
    if let Some(sender) = &cli.sender {
        config.default_sender = Some(sender.clone());
    }
    if let Some(n) = cli.max_concurrent {
        config.max_concurrent = n.max(1);
    }
    if let Some(policy) = cli.collision {
        config.collision_policy = policy;
    }
    config.dry_run = cli.dry_run;
}

fn print_summary(report: &BatchReport) {
    let s = report.summary;
    println!(
        "Batch {}: {} documents, {} moved, {} planned, {} failed, {} skipped",
        report.batch_id, s.total, s.moved, s.planned, s.failed, s.skipped
    );

    for doc in &report.documents {
        let name = doc.path.display();
        match &doc.outcome {
            DocumentOutcome::Moved { decision, .. } => {
                println!("  moved    {} -> {}", name, decision.destination.display())
            }
            DocumentOutcome::Planned { decision, .. } => {
                println!("  planned  {} -> {}", name, decision.destination.display())
            }
            DocumentOutcome::Failed { stage, failure } => {
                println!("  failed   {} at {}: {}", name, stage, failure)
            }
            DocumentOutcome::Skipped { reason } => println!("  skipped  {}: {}", name, reason),
        }
    }
}

fn write_report(report: &BatchReport, path: &Path) -> Result<(), CliError> {
    let to_err = |reason: String| CliError::Report {
        path: path.display().to_string(),
        reason,
    };
    let json = serde_json::to_string_pretty(report).map_err(|e| to_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| to_err(e.to_string()))?;
    tracing::info!(path = %path.display(), "[Pipeline] Wrote batch report");
    Ok(())
}
