//! Cross-cutting request handling applied by the server around the router.
//!
//! - [`Cors`] — preflight answers and `access-control-allow-*` headers.
//!
//! Request timeouts and the per-request tracing span live in the server
//! loop itself (see [`Server::request_timeout`](crate::Server::request_timeout)).

mod cors;

pub use cors::Cors;
