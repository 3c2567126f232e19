use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use tracing_actix_web::TracingLogger;

use crate::configuration::RunMode;
use crate::configuration::Settings;
use crate::record_store::RecordStoreClient;
use crate::routes::health_check;
use crate::routes::sitemap;
use crate::routes::subscribe;
use crate::turnstile::TurnstileClient;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Initialise both outbound clients, bind the listener, and build the
    /// `Server`.
    ///
    /// The store client is built first: without store credentials this fails
    /// with `StoreInitError::ConfigurationMissing`, before anything is bound,
    /// so a misconfigured relay never accepts a request.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let store = cfg.store.client()?;
        let turnstile = cfg.turnstile.client()?;

        if !cfg.application.mode.is_development() && !turnstile.secret_is_configured() {
            // not fatal; every subscription will be answered with a 500 until this is fixed
            tracing::warn!("production mode without a Turnstile secret key");
        }

        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        // port 0 means "any free port", so ask the OS which one we got
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            store,
            turnstile,
            cfg.application.mode,
            cfg.application.base_url,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// Wrapper for the public site address (because raw `String`s may conflict
/// with one another when passed around by `Data`)
pub struct SiteBaseUrl(pub String);

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    store: RecordStoreClient,
    turnstile: TurnstileClient,
    mode: RunMode,
    base_url: String,
) -> Result<Server, anyhow::Error> {
    // `Data` is an `Arc`; every worker gets a clone of the same clients, and
    // thus the same connection pools
    let store = Data::new(store);
    let turnstile = Data::new(turnstile);
    let mode = Data::new(mode);
    let base_url = Data::new(SiteBaseUrl(base_url));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/sitemap.xml", web::get().to(sitemap))
            .route("/api/newsletter", web::post().to(subscribe))
            .app_data(store.clone())
            .app_data(turnstile.clone())
            .app_data(mode.clone())
            .app_data(base_url.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
