use anyhow::{bail, Result};
use camgate_cli::{camera_table, connect, init_tracing, OutputFormat};
use camgate_core::Config;
use camgate_db::CameraDirectoryRepository;
use camgate_services::CredentialCache;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "print_cache")]
#[command(about = "Load the camera directory and print the credential snapshot it would publish")]
struct Args {
    /// Only print this camera
    #[arg(long, value_name = "ID")]
    camera: Option<String>,

    /// Output format: json or table (default: table)
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::from_env()?;
    let pool = connect(&config).await?;
    let cache = CredentialCache::new(
        Arc::new(CameraDirectoryRepository::new(pool)),
        config.credentials().clone(),
    );

    // A failed load still leaves the static fallback to inspect
    if let Err(e) = cache.refresh().await {
        tracing::warn!(error = %e, "Directory load failed, showing fallback snapshot");
    }
    let snapshot = cache.current();

    let cameras: Vec<_> = match &args.camera {
        Some(id) => match snapshot.camera(id) {
            Some(camera) => vec![camera],
            None => bail!("Camera '{}' is not in the snapshot", id),
        },
        None => snapshot.cameras().collect(),
    };

    match args.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "source": snapshot.source(),
                "camera_count": snapshot.camera_count(),
                "cameras": cameras,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            println!("Source: {}", serde_json::to_string(&snapshot.source())?);
            println!("Cameras: {}\n", snapshot.camera_count());
            print!("{}", camera_table(&cameras));
        }
    }

    Ok(())
}
