//! Product list service: `GET /lista`, `POST /produtos`.
//!
//! Run with:
//!   RUST_LOG=info cargo run --bin produtos -- --db-password secret
//!
//! Try:
//!   curl http://localhost:8000/lista
//!   curl -X POST http://localhost:8000/produtos \
//!        -H 'content-type: application/json' \
//!        -d '{"id":1,"name":"caneta"}'

use std::process::ExitCode;

use vitrine::app::{self, Service};
use vitrine::db::ConnectionMode;
use vitrine::products;

#[tokio::main]
async fn main() -> ExitCode {
    app::run(Service {
        name: "produtos",
        default_port: 8000,
        default_database: "listagem_produtos",
        default_mode: ConnectionMode::Pooled,
        routes: products::routes,
    })
    .await
}
