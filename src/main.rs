//! warden server binary.
//!
//! Run with:
//!   APP_ENV=development PORT=3000 RUST_LOG=info cargo run
//!
//! The account directory and the game store are external services. This
//! binary wires in-memory stand-ins for both; replace them with real clients
//! when deploying.

use std::sync::Arc;

use tracing::{info, warn};

use warden::game::MemoryGameStore;
use warden::identity::MemoryDirectory;
use warden::telemetry::{LogSink, SentrySink, TelemetrySink};
use warden::{Config, Server, app, observability};

#[tokio::main]
async fn main() -> Result<(), warden::Error> {
    let config = Config::from_env()?;
    observability::init(config.environment);

    let sink: Arc<dyn TelemetrySink> = match &config.telemetry.dsn {
        Some(_) => match SentrySink::new(&config.telemetry) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!("sentry unavailable, logging errors instead: {e}");
                Arc::new(LogSink)
            }
        },
        None => Arc::new(LogSink),
    };

    info!(
        environment = %config.environment,
        release = %config.telemetry.release,
        port = config.port,
        "starting"
    );

    let chain = app::build(&config, app::Services {
        directory: Arc::new(MemoryDirectory::new()),
        games: Arc::new(MemoryGameStore::new()),
        sink,
    })?;

    Server::bind(&config.listen_addr())?.serve(chain).await
}
