use vemos_vamos::configuration::get_configuration;
use vemos_vamos::startup::Application;
use vemos_vamos::telemetry::get_subscriber;
use vemos_vamos::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the relay
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("vemos-vamos", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;
    tracing::info!(
        mode = ?cfg.application.mode,
        host = %cfg.application.host,
        port = cfg.application.port,
        "starting newsletter relay"
    );

    // fails fast on missing store credentials
    let app = Application::build(cfg).await.map_err(|e| {
        tracing::error!(error.cause_chain = ?e, error.message = %e, "relay failed to start");
        e
    })?;

    app.run_until_stopped().await?;
    tracing::info!("relay exited gracefully");
    Ok(())
}
