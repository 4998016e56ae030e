//! Shoe inventory service: `GET /estoque_sapatos`, `GET /sapatos`.
//!
//! Run with:
//!   RUST_LOG=info cargo run --bin sapatos
//!
//! Try:
//!   curl http://localhost:3000/estoque_sapatos
//!   curl 'http://localhost:3000/sapatos?nome=Bota&tamanho=42'

use std::process::ExitCode;

use vitrine::app::{self, Service};
use vitrine::db::ConnectionMode;
use vitrine::shoes;

#[tokio::main]
async fn main() -> ExitCode {
    app::run(Service {
        name: "sapatos",
        default_port: 3000,
        default_database: "loja_sapatos",
        default_mode: ConnectionMode::PerRequest,
        routes: shoes::routes,
    })
    .await
}
