use once_cell::sync::Lazy;
use secrecy::Secret;
use vemos_vamos::configuration::get_configuration;
use vemos_vamos::configuration::RunMode;
use vemos_vamos::configuration::Settings;
use vemos_vamos::startup::Application;
use vemos_vamos::telemetry::get_subscriber;
use vemos_vamos::telemetry::init_subscriber;
use wiremock::MockServer;

/// Init a static subscriber using the `once_cell` crate.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // two different closure types cannot share a var, hence the match arms
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber).unwrap();
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber).unwrap();
        }
    };
});

pub const TURNSTILE_VERIFY_PATH: &str = "/turnstile/v0/siteverify";
pub const TEST_SECRET: &str = "0x4AAAAAAA-test-secret";
pub const TEST_BASE_ID: &str = "appTest";
pub const TEST_API_KEY: &str = "patTest";

pub struct TestApp {
    pub addr: String,
    pub port: u16,
    /// Stands in for Airtable
    pub store_server: MockServer,
    /// Stands in for Cloudflare's `siteverify`
    pub turnstile_server: MockServer,
}

impl TestApp {
    pub fn newsletter_url(&self) -> String { format!("{}/api/newsletter", self.addr) }

    /// `POST /api/newsletter` with a raw body and an optional challenge token,
    /// as the widget would send it
    pub async fn post_newsletter(
        &self,
        body: impl Into<reqwest::Body>,
        token: Option<&str>,
    ) -> reqwest::Response {
        let mut req = reqwest::Client::new()
            .post(self.newsletter_url())
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(token) = token {
            req = req.header("cf-turnstile-response", token);
        }
        req.send().await.expect("execute request")
    }
}

/// Default test config: development mode, store credentials set, no Turnstile
/// secret. Both upstreams point at fresh mock servers.
pub async fn spawn_app() -> TestApp { spawn_app_with(|_| {}).await }

/// Production mode, with the Turnstile secret configured
pub async fn spawn_production_app() -> TestApp {
    spawn_app_with(|cfg| {
        cfg.application.mode = RunMode::Production;
        cfg.turnstile.secret_key = Some(Secret::new(TEST_SECRET.to_string()));
    })
    .await
}

/// Build the usual test config, let `customise` adjust it, then build and spawn
/// the `Application`
pub async fn spawn_app_with<F>(customise: F) -> TestApp
where
    F: FnOnce(&mut Settings),
{
    Lazy::force(&TRACING);

    let store_server = MockServer::start().await;
    let turnstile_server = MockServer::start().await;

    let mut cfg = test_configuration(&store_server, &turnstile_server);
    customise(&mut cfg);

    let app = Application::build(cfg).await.unwrap();
    let port = app.get_port();
    let addr = format!("http://127.0.0.1:{port}");
    tokio::spawn(app.run_until_stopped());

    TestApp {
        addr,
        port,
        store_server,
        turnstile_server,
    }
}

pub fn test_configuration(
    store_server: &MockServer,
    turnstile_server: &MockServer,
) -> Settings {
    let mut cfg = get_configuration().unwrap();

    // port 0 is reserved by the OS; the server will be spawned on a random
    // available port, retrieved later via `Application::get_port`
    cfg.application.host = "127.0.0.1".to_string();
    cfg.application.port = 0;
    cfg.application.mode = RunMode::Development;

    cfg.store.base_url = store_server.uri();
    cfg.store.base_id = Some(Secret::new(TEST_BASE_ID.to_string()));
    cfg.store.api_key = Some(Secret::new(TEST_API_KEY.to_string()));
    cfg.store.timeout_milliseconds = 2000;

    cfg.turnstile.verify_url = format!("{}{TURNSTILE_VERIFY_PATH}", turnstile_server.uri());
    cfg.turnstile.secret_key = None;
    cfg.turnstile.timeout_milliseconds = 2000;

    cfg
}
