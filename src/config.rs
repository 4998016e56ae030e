//! Command-line and environment configuration.
//!
//! Every setting is a flag with an environment fallback. The port, database
//! name and connection mode default per service (see [`Service`](crate::app::Service)),
//! so they are optional here.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser};
use sqlx::mysql::MySqlConnectOptions;

use crate::db::{ConnectionMode, PoolSettings};
use crate::error::Error;
use crate::middleware::Cors;

/// Service configuration.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on [default: per service]
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds a request may take before it is answered 503.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest request body accepted, in bytes; longer ones get 413.
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Allowed CORS origin; repeat for several. None allows every origin.
    #[arg(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    #[command(flatten)]
    pub db: DbConfig,
}

/// Database connection settings.
#[derive(Debug, Args)]
pub struct DbConfig {
    #[arg(id = "db-host", long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(id = "db-port", long = "db-port", env = "DB_PORT", default_value_t = 3306)]
    pub port: u16,

    #[arg(long = "db-user", env = "DB_USER", default_value = "root")]
    pub user: String,

    #[arg(long = "db-password", env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Database (schema) name [default: per service]
    #[arg(long = "db-name", env = "DB_NAME")]
    pub name: Option<String>,

    /// Shared pool or one connection per request [default: per service]
    #[arg(long = "db-mode", env = "DB_MODE", value_enum)]
    pub mode: Option<ConnectionMode>,

    /// Pool size (pooled mode).
    #[arg(long = "db-max-connections", env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before reporting the server
    /// unreachable.
    #[arg(long = "db-acquire-timeout-secs", env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

impl Config {
    /// Rejects settings that parse but cannot work.
    pub fn validate(&self) -> Result<(), Error> {
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be at least one second".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::Config("request body limit must be at least one byte".into()));
        }
        if self.db.max_connections == 0 {
            return Err(Error::Config("database pool needs at least one connection".into()));
        }
        Ok(())
    }

    pub fn addr(&self, default_port: u16) -> SocketAddr {
        SocketAddr::new(self.host, self.port.unwrap_or(default_port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cors(&self) -> Cors {
        Cors::allow_origins(self.cors_origins.iter().filter(|o| !o.is_empty()).cloned())
    }
}

impl DbConfig {
    pub fn connect_options(&self, default_database: &str) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(self.name.as_deref().unwrap_or(default_database))
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    /// Parses `args` with every environment fallback switched off, so the
    /// result does not depend on the `PORT`/`DB_*` variables of the host.
    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        let matches = Config::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(args)?;
        Config::from_arg_matches(&matches)
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "produtos",
            "--host", "127.0.0.1",
            "--port", "9000",
            "--db-host", "db.interno",
            "--db-mode", "per-request",
            "--max-body-bytes", "2048",
            "--cors-origin", "http://a.test",
            "--cors-origin", "http://b.test",
        ])
        .unwrap();

        assert_eq!(config.addr(8000), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.db.host, "db.interno");
        assert_eq!(config.db.mode, Some(ConnectionMode::PerRequest));
        assert_eq!(config.max_body_bytes, 2048);
        assert_eq!(config.cors_origins, ["http://a.test", "http://b.test"]);
        config.validate().unwrap();
    }

    #[test]
    fn service_defaults_apply_when_unset() {
        let config = parse(&["sapatos"]).unwrap();

        assert_eq!(config.addr(3000), "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db.port, 3306);
        assert_eq!(config.db.name, None);
        assert_eq!(config.db.mode, None);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(config.cors_origins.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        assert!(parse(&["produtos", "--db-mode", "sometimes"]).is_err());
    }

    #[test]
    fn zero_limits_are_rejected() {
        for args in [
            ["produtos", "--request-timeout-secs", "0"],
            ["produtos", "--db-max-connections", "0"],
            ["produtos", "--max-body-bytes", "0"],
        ] {
            let config = parse(&args).unwrap();
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{args:?}");
        }
    }
}
