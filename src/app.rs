//! Service bootstrap shared by the binaries.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::{ConnectionMode, Database};
use crate::error::Error;
use crate::router::Router;
use crate::server::Server;

/// What differs between the two services.
#[derive(Clone, Copy)]
pub struct Service {
    pub name: &'static str,
    pub default_port: u16,
    pub default_database: &'static str,
    pub default_mode: ConnectionMode,
    pub routes: fn(Arc<Database>) -> Router,
}

/// Parses configuration, runs the service until shutdown, and maps the
/// outcome to the process exit code.
pub async fn run(service: Service) -> ExitCode {
    init_tracing();
    let config = Config::parse();

    match serve(service, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(service = service.name, "{e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` filtering, `info` when unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(service: Service, config: Config) -> Result<(), Error> {
    config.validate()?;

    let mode = config.db.mode.unwrap_or(service.default_mode);
    let database = config.db.name.as_deref().unwrap_or(service.default_database);
    let db = Arc::new(Database::connect_lazy(
        config.db.connect_options(service.default_database),
        mode,
        config.db.pool_settings(),
    ));
    info!(
        service = service.name,
        db_host = %config.db.host,
        db_port = config.db.port,
        database,
        ?mode,
        "starting"
    );

    let result = Server::bind(config.addr(service.default_port))
        .cors(config.cors())
        .request_timeout(config.request_timeout())
        .max_body_bytes(config.max_body_bytes)
        .serve((service.routes)(Arc::clone(&db)))
        .await;

    db.close().await;
    result
}
