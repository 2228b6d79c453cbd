use camgate_api::setup;
use camgate_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, cache, fan-out, background loops, routes)
    let app = setup::initialize_app(config.clone()).await?;

    // Serve until a shutdown signal, then stop the background loops
    setup::server::start_server(&config, app.router).await?;
    app.background.shutdown().await;

    Ok(())
}
