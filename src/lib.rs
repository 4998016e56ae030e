//! # vitrine
//!
//! Two small REST services over MySQL, built on a minimal hyper-based
//! framework:
//!
//! - **produtos** — `GET /lista`, `POST /produtos` over table `lista`.
//! - **sapatos** — `GET /estoque_sapatos`, `GET /sapatos?nome=&tamanho=` over
//!   table `estoque_sapatos`.
//!
//! ## How a request flows
//!
//! ```text
//! Server ─► Router ─► handler ─► Store (Session: acquire → SQL → release)
//!                        │
//!                        └─ on DbError ─► Classifier ─► {"message": …}
//! ```
//!
//! Stores sit behind traits ([`products::ProductStore`],
//! [`shoes::ShoeStore`]) implemented for [`db::Database`]. The database
//! handle is created once in `main` and moved into the route closures; no
//! global state. Every database failure carries an [`db::ErrorCode`], and
//! one table in [`classify`] turns it into a status and message, with only
//! the fallback chosen per route.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use vitrine::db::{ConnectionMode, Database, PoolSettings};
//! use vitrine::{Server, products};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vitrine::Error> {
//!     let options = sqlx::mysql::MySqlConnectOptions::new().database("listagem_produtos");
//!     let db = Arc::new(Database::connect_lazy(options, ConnectionMode::Pooled, PoolSettings::default()));
//!
//!     Server::bind("0.0.0.0:8000".parse().unwrap())
//!         .request_timeout(Duration::from_secs(10))
//!         .serve(products::routes(db))
//!         .await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod app;
pub mod classify;
pub mod config;
pub mod db;
pub mod health;
pub mod middleware;
pub mod products;
pub mod shoes;

pub use error::Error;
pub use handler::Handler;
pub use method::{Method, UnsupportedMethod};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
