//! Liveness, readiness, and the root confirmation route.
//!
//! | Path | Answers |
//! |---|---|
//! | `/` | fixed confirmation text |
//! | `/healthz` | always `ok`; the process is up |
//! | `/readyz` | `ready` if the database answers a ping, else `503` |

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::db::{Database, DbError};
use crate::{Request, Response, Status};

/// Something the service needs before it can take traffic.
#[async_trait]
pub trait Dependency: Send + Sync {
    async fn ping(&self) -> Result<(), DbError>;
}

#[async_trait]
impl Dependency for Database {
    async fn ping(&self) -> Result<(), DbError> {
        Database::ping(self).await
    }
}

/// `GET /` — confirms the service is answering.
pub async fn confirm(_req: Request) -> &'static str {
    "service running"
}

/// Liveness probe. No dependencies: if it answers, the process is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe, gated on the database.
pub async fn readiness(dependency: Arc<dyn Dependency>) -> Response {
    match dependency.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!("readiness check failed: {e}");
            Response::builder().status(Status::ServiceUnavailable).text("database unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::ErrorCode;
    use crate::method::Method;

    struct Fixed(bool);

    #[async_trait]
    impl Dependency for Fixed {
        async fn ping(&self) -> Result<(), DbError> {
            if self.0 {
                Ok(())
            } else {
                Err(DbError::new(ErrorCode::ConnectionRefused, "connection refused"))
            }
        }
    }

    #[tokio::test]
    async fn readiness_follows_the_dependency() {
        assert_eq!(readiness(Arc::new(Fixed(true))).await.status_code(), 200);

        let res = readiness(Arc::new(Fixed(false))).await;
        assert_eq!(res.status_code(), 503);
        assert_eq!(res.body(), b"database unavailable");
    }

    #[tokio::test]
    async fn liveness_and_root_always_answer() {
        assert_eq!(liveness(Request::test(Method::Get, "/healthz", "")).await.body(), b"ok");
        assert_eq!(confirm(Request::test(Method::Get, "/", "")).await, "service running");
    }
}
