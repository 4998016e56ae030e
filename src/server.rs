//! HTTP server and graceful shutdown.
//!
//! Each accepted connection runs on its own tokio task; hyper calls
//! [`dispatch`] once per request on it. On SIGTERM or Ctrl-C the accept loop
//! stops, in-flight connections are drained, and [`Server::serve`] returns so
//! `main` can close the database pool and exit cleanly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, warn};

use crate::error::Error;
use crate::method::Method;
use crate::middleware::Cors;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    cors: Cors,
    request_timeout: Duration,
    max_body_bytes: usize,
}

/// What every connection task shares.
struct Shared {
    router: Router,
    cors: Cors,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. CORS is permissive, requests time out after 30 s and bodies
    /// are capped at 1 MiB until configured otherwise.
    pub fn bind(addr: SocketAddr) -> Self {
        Self {
            addr,
            cors: Cors::permissive(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn cors(mut self, cors: Cors) -> Self {
        self.cors = cors;
        self
    }

    /// Upper bound on the time a handler may take. A request that runs over
    /// is answered `503` with `{"message": "request timed out"}`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Largest request body accepted. Anything longer is answered `413`
    /// without being buffered past the limit.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Fails immediately if the address cannot be bound. Otherwise returns
    /// only after a graceful shutdown has drained every connection.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        self.run(listener, router, shutdown_signal()).await
    }

    async fn run(
        self,
        listener: TcpListener,
        router: Router,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> Result<(), Error> {
        let shared = Arc::new(Shared {
            router,
            cors: self.cors,
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_body_bytes,
        });

        info!(addr = %listener.local_addr()?, "listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first: a signal stops accepting even with a queue.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let shared = Arc::clone(&shared);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let shared = Arc::clone(&shared);
                            async move { dispatch(shared, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure becomes an
/// HTTP status, so hyper never sees an error.
async fn dispatch(
    shared: Arc<Shared>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let span = info_span!("request", method = %req.method(), path = %req.uri().path());
    let started = Instant::now();

    let response = respond(&shared, req).instrument(span.clone()).await;

    span.in_scope(|| {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if response.status_code() >= 500 {
            warn!(status = response.status_code(), elapsed_ms, "request failed");
        } else {
            info!(status = response.status_code(), elapsed_ms, "request completed");
        }
    });

    Ok(response.into_inner())
}

async fn respond<B>(shared: &Shared, req: hyper::Request<B>) -> Response
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let Ok(method) = Method::try_from(&parts.method) else {
        return Response::status(Status::MethodNotAllowed);
    };

    let body = match Limited::new(body, shared.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit = shared.max_body_bytes, "request body too large");
            return Response::message(Status::PayloadTooLarge, "request body too large");
        }
        Err(e) => {
            warn!("reading request body failed: {e}");
            return Response::status(Status::BadRequest);
        }
    };

    let headers = parts.headers.iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_owned(), v.to_owned())))
        .collect();
    let request = Request::new(
        method,
        parts.uri.path().to_owned(),
        parts.uri.query().map(str::to_owned),
        headers,
        body,
    );

    handle(shared, request).await
}

/// Everything after the request has been read: CORS, routing, timeout.
async fn handle(shared: &Shared, request: Request) -> Response {
    if let Some(preflight) = shared.cors.preflight(&request) {
        return preflight;
    }

    let origin = request.header("origin").map(str::to_owned);
    let mut response =
        match tokio::time::timeout(shared.request_timeout, shared.router.handle(request)).await {
            Ok(response) => response,
            Err(_) => {
                error!(timeout_ms = shared.request_timeout.as_millis() as u64, "request timed out");
                Response::message(Status::ServiceUnavailable, "request timed out")
            }
        };
    shared.cors.decorate(origin.as_deref(), &mut response);
    response
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C on non-Unix targets).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("installing Ctrl-C handler failed: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("installing SIGTERM handler failed: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn shared(router: Router, timeout: Duration) -> Shared {
        Shared {
            router,
            cors: Cors::permissive(),
            request_timeout: timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[tokio::test]
    async fn slow_handler_times_out_with_503() {
        let router = Router::new().get("/lento", |_req: Request| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        });
        let shared = shared(router, Duration::from_millis(20));

        let res = handle(&shared, Request::test(Method::Get, "/lento", "")).await;
        assert_eq!(res.status_code(), 503);
        assert_eq!(res.body(), br#"{"message":"request timed out"}"#);
    }

    #[tokio::test]
    async fn cross_origin_responses_carry_cors_headers() {
        let shared = shared(Router::new().get("/", |_req: Request| async { "ok" }), DEFAULT_REQUEST_TIMEOUT);

        let req = Request::test(Method::Get, "/", "").with_header("origin", "http://a.test");
        let res = handle(&shared, req).await;
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));

        let req = Request::test(Method::Options, "/", "").with_header("origin", "http://a.test");
        assert_eq!(handle(&shared, req).await.status_code(), 204);
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let router = Router::new().get("/", |_req: Request| async { "service running" });
        let server = tokio::spawn(
            Server::bind(addr).run(listener, router, async {
                let _ = stopped.await;
            }),
        );

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.ends_with("service running"), "{raw}");

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    fn post(body: Vec<u8>) -> hyper::Request<Full<Bytes>> {
        hyper::Request::post("/produtos").body(Full::new(Bytes::from(body))).unwrap()
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_with_413() {
        let router = Router::new().post("/produtos", |req: Request| async move {
            Response::text(format!("read {} bytes", req.body().len()))
        });
        let shared = Shared { max_body_bytes: 1024, ..shared(router, DEFAULT_REQUEST_TIMEOUT) };

        let res = respond(&shared, post(vec![b'x'; 1024])).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"read 1024 bytes");

        let res = respond(&shared, post(vec![b'x'; 4096])).await;
        assert_eq!(res.status_code(), 413);
        assert_eq!(res.body(), br#"{"message":"request body too large"}"#);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let err = Server::bind(addr).serve(Router::new()).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
