//! Data access: the database handle, scoped sessions, and error codes.
//!
//! A [`Database`] runs in one of two modes:
//!
//! | Mode | Physical connection |
//! |---|---|
//! | [`ConnectionMode::Pooled`] | borrowed from a process-wide pool, returned on release |
//! | [`ConnectionMode::PerRequest`] | opened on acquire, closed on release |
//!
//! Either way, stores follow the same shape: acquire a [`Session`], run one
//! statement, keep its result, release the session, then propagate the
//! result. A session dropped without [`Session::release`], as happens when
//! a timed-out request is cancelled, still closes its direct connection from
//! a background task.

mod error;
mod rows;

use std::future::Future;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{ConnectOptions, Connection, MySql};
use tracing::{debug, warn};

pub use error::{DbError, ErrorCode};
pub use rows::row_to_json;

/// How a [`Database`] obtains connections.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ConnectionMode {
    /// One shared pool for the whole process.
    Pooled,
    /// A fresh connection for each session.
    PerRequest,
}

/// Pool sizing, only meaningful in [`ConnectionMode::Pooled`].
#[derive(Clone, Copy, Debug)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { max_connections: 10, acquire_timeout: Duration::from_secs(5) }
    }
}

/// Handle to the MySQL database, cheap to clone and shared by all requests.
#[derive(Clone, Debug)]
pub enum Database {
    Pooled(MySqlPool),
    PerRequest(MySqlConnectOptions),
}

impl Database {
    /// Creates the handle without contacting the server; connection
    /// failures surface per request, where they are classified.
    pub fn connect_lazy(
        options: MySqlConnectOptions,
        mode: ConnectionMode,
        pool: PoolSettings,
    ) -> Self {
        match mode {
            ConnectionMode::Pooled => Self::Pooled(
                MySqlPoolOptions::new()
                    .max_connections(pool.max_connections)
                    .acquire_timeout(pool.acquire_timeout)
                    .connect_lazy_with(options),
            ),
            ConnectionMode::PerRequest => Self::PerRequest(options),
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        match self {
            Self::Pooled(_) => ConnectionMode::Pooled,
            Self::PerRequest(_) => ConnectionMode::PerRequest,
        }
    }

    /// Acquires a connection for one unit of work.
    pub async fn session(&self) -> Result<Session, DbError> {
        match self {
            Self::Pooled(pool) => match pool.acquire().await {
                Ok(conn) => Ok(Session::new(Conn::Pooled(conn))),
                Err(e) => Err(acquire_failed(e, pool.size())),
            },
            Self::PerRequest(options) => {
                let conn = options.connect().await?;
                debug!("opened per-request connection");
                Ok(Session::new(Conn::Direct(conn)))
            }
        }
    }

    /// Round-trips a `SELECT 1`-equivalent ping.
    pub async fn ping(&self) -> Result<(), DbError> {
        let mut session = self.session().await?;
        let result = session.conn().ping().await;
        session.release().await;
        Ok(result?)
    }

    /// Closes the pool, waiting for borrowed connections to come back.
    /// Per-request handles own nothing between sessions.
    pub async fn close(&self) {
        if let Self::Pooled(pool) = self {
            pool.close().await;
        }
    }
}

/// Converts a failed pool acquire. The pool reports a timeout both when it
/// cannot reach the server and when every connection is busy; only the
/// first is an unreachable server.
fn acquire_failed(err: sqlx::Error, open_connections: u32) -> DbError {
    if matches!(err, sqlx::Error::PoolTimedOut) && open_connections > 0 {
        warn!(open_connections, "every pooled connection is busy");
        return DbError::with_code(ErrorCode::Other, err);
    }
    DbError::from(err)
}

/// A connection held for one unit of work.
///
/// Call [`release`](Session::release) when done. Dropping the session
/// instead returns a pooled connection to the pool and closes a direct one
/// on a spawned task.
pub struct Session {
    conn: Option<Conn>,
}

enum Conn {
    Pooled(PoolConnection<MySql>),
    Direct(MySqlConnection),
}

impl Session {
    fn new(conn: Conn) -> Self {
        Self { conn: Some(conn) }
    }

    /// The connection to run statements on.
    pub fn conn(&mut self) -> &mut MySqlConnection {
        match &mut self.conn {
            Some(Conn::Pooled(conn)) => &mut **conn,
            Some(Conn::Direct(conn)) => conn,
            // Only `release` and `drop` take the connection, and both consume
            // the session.
            None => unreachable!("session used after release"),
        }
    }

    /// Gives the connection back: pooled ones return to the pool, direct
    /// ones are closed. A failed close is logged, not propagated, so it
    /// never masks the statement's own result.
    pub async fn release(mut self) {
        if let Some(Conn::Direct(conn)) = self.conn.take() {
            close_direct(conn).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(Conn::Direct(conn)) = self.conn.take() {
            debug!("session dropped before release");
            close_detached(close_direct(conn));
        }
    }
}

async fn close_direct(conn: MySqlConnection) {
    match conn.close().await {
        Ok(()) => debug!("closed per-request connection"),
        Err(e) => warn!("closing per-request connection failed: {e}"),
    }
}

/// Runs `close` on the current runtime. Outside a runtime the connection is
/// simply dropped, which still shuts the socket.
fn close_detached<F>(close: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(close);
        }
        Err(_) => warn!("no runtime to close the dropped connection on"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_options() -> MySqlConnectOptions {
        // Port 1 on loopback: nothing listens there, connect is refused.
        MySqlConnectOptions::new().host("127.0.0.1").port(1).username("root")
    }

    #[test]
    fn mode_follows_the_requested_connection_strategy() {
        let db = Database::connect_lazy(
            unreachable_options(),
            ConnectionMode::PerRequest,
            PoolSettings::default(),
        );
        assert_eq!(db.mode(), ConnectionMode::PerRequest);
    }

    #[tokio::test]
    async fn lazy_pool_starts_without_a_server() {
        let db = Database::connect_lazy(
            unreachable_options(),
            ConnectionMode::Pooled,
            PoolSettings { max_connections: 1, acquire_timeout: Duration::from_millis(200) },
        );
        assert_eq!(db.mode(), ConnectionMode::Pooled);

        let err = db.ping().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);
        db.close().await;
    }

    #[tokio::test]
    async fn per_request_connect_is_refused() {
        let db = Database::connect_lazy(
            unreachable_options(),
            ConnectionMode::PerRequest,
            PoolSettings::default(),
        );
        let err = db.session().await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);
    }

    #[test]
    fn timeout_with_no_open_connection_means_unreachable() {
        let err = acquire_failed(sqlx::Error::PoolTimedOut, 0);
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);
    }

    #[test]
    fn timeout_with_busy_connections_is_unclassified() {
        let err = acquire_failed(sqlx::Error::PoolTimedOut, 1);
        assert_eq!(err.code(), ErrorCode::Other);

        let err = acquire_failed(sqlx::Error::PoolClosed, 3);
        assert_eq!(err.code(), ErrorCode::Other);
    }

    #[tokio::test]
    async fn dropped_session_closes_on_the_runtime() {
        let (closed, on_close) = tokio::sync::oneshot::channel();
        close_detached(async move {
            let _ = closed.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), on_close).await.unwrap().unwrap();
    }

    #[test]
    fn close_outside_a_runtime_is_skipped() {
        let (closed, mut on_close) = tokio::sync::oneshot::channel::<()>();
        close_detached(async move {
            let _ = closed.send(());
        });
        // The future was dropped unpolled, taking the sender with it.
        assert!(on_close.try_recv().is_err());
    }
}
