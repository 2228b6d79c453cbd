use anyhow::Result;
use camgate_cli::{connect, init_tracing};
use camgate_core::Config;
use camgate_db::ImageIndexRepository;
use camgate_services::RetentionService;
use camgate_storage::create_storage_tiers;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "retention_sweep")]
#[command(about = "Run one retention cycle against the configured index and storage tiers")]
struct Args {
    /// Only report how many rows each tier pass would touch
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::from_env()?;
    let pool = connect(&config).await?;
    let tiers = create_storage_tiers(config.storage()).await?;
    let service = RetentionService::new(
        Arc::new(ImageIndexRepository::new(pool)),
        tiers,
        config.retention().clone(),
    );

    if args.dry_run {
        let (local, object) = service.candidates_at(Utc::now()).await?;
        let out = serde_json::json!({
            "dry_run": true,
            "local_candidates": local,
            "object_candidates": object,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let report = service.run_cycle().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
