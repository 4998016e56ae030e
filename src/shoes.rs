//! Shoe inventory service. Read-only.
//!
//! `GET /sapatos` needs at least one of `nome` (substring of the name) and
//! `tamanho` (exact size); an empty value counts as absent. A search that
//! matches nothing is a `404`, not an empty array.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use crate::classify::{Classifier, Outcome};
use crate::db::{Database, DbError, row_to_json};
use crate::health::{self, Dependency};
use crate::{Request, Response, Router, Status};

const SELECT_ALL: &str = "SELECT * FROM estoque_sapatos";

const MISSING_FILTER: Outcome = Outcome::new(Status::BadRequest, "must supply nome or tamanho");
const NOT_FOUND: Outcome = Outcome::new(Status::NotFound, "not found");

const READ_ERRORS: Classifier =
    Classifier::new(Outcome::new(Status::InternalServerError, "unidentified error"));

/// One row of `estoque_sapatos`, column name → value.
pub type ShoeRow = Map<String, Value>;

/// Search criteria for `GET /sapatos`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShoeFilter {
    /// Matched as a substring of `nome`.
    pub name: Option<String>,
    /// Matched exactly against `tamanho`.
    pub size: Option<String>,
}

impl ShoeFilter {
    /// Reads `nome` and `tamanho` from the query string. `None` when both
    /// are absent or empty.
    pub fn from_request(req: &Request) -> Option<Self> {
        let present = |key: &str| req.query(key).filter(|v| !v.is_empty());
        let filter = Self { name: present("nome"), size: present("tamanho") };
        (filter.name.is_some() || filter.size.is_some()).then_some(filter)
    }

    /// The statement and its positional parameters, in bind order.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::with_capacity(2);
        let mut params = Vec::with_capacity(2);
        if let Some(name) = &self.name {
            clauses.push("nome LIKE ?");
            params.push(format!("%{}%", escape_like(name)));
        }
        if let Some(size) = &self.size {
            clauses.push("tamanho = ?");
            params.push(size.clone());
        }
        (format!("{SELECT_ALL} WHERE {}", clauses.join(" AND ")), params)
    }
}

/// Escapes the `LIKE` metacharacters so user input matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Read access to the shoe inventory.
#[async_trait]
pub trait ShoeStore: Send + Sync {
    async fn all(&self) -> Result<Vec<ShoeRow>, DbError>;
    async fn search(&self, filter: &ShoeFilter) -> Result<Vec<ShoeRow>, DbError>;
}

#[async_trait]
impl ShoeStore for Database {
    async fn all(&self) -> Result<Vec<ShoeRow>, DbError> {
        let mut session = self.session().await?;
        let rows = sqlx::query(SELECT_ALL).fetch_all(session.conn()).await;
        session.release().await;
        Ok(rows?.iter().map(row_to_json).collect())
    }

    async fn search(&self, filter: &ShoeFilter) -> Result<Vec<ShoeRow>, DbError> {
        let (sql, params) = filter.to_sql();
        let mut query = sqlx::query(&sql);
        for param in &params {
            query = query.bind(param.as_str());
        }

        let mut session = self.session().await?;
        let rows = query.fetch_all(session.conn()).await;
        session.release().await;
        Ok(rows?.iter().map(row_to_json).collect())
    }
}

/// `GET /estoque_sapatos`
pub async fn stock(store: Arc<dyn ShoeStore>) -> Result<Response, Outcome> {
    let rows = store.all().await.map_err(|e| READ_ERRORS.report(&e))?;
    Ok(Response::json(&rows))
}

/// `GET /sapatos?nome=&tamanho=`
pub async fn search(store: Arc<dyn ShoeStore>, req: Request) -> Result<Response, Outcome> {
    let Some(filter) = ShoeFilter::from_request(&req) else {
        warn!("shoe search without nome or tamanho");
        return Err(MISSING_FILTER);
    };

    let rows = store.search(&filter).await.map_err(|e| READ_ERRORS.report(&e))?;
    if rows.is_empty() {
        return Err(NOT_FOUND);
    }
    Ok(Response::json(&rows))
}

/// The shoe service's route table.
pub fn routes<S>(store: Arc<S>) -> Router
where
    S: ShoeStore + Dependency + 'static,
{
    let shoes: Arc<dyn ShoeStore> = store.clone();
    let dependency: Arc<dyn Dependency> = store;
    let for_search = Arc::clone(&shoes);

    Router::new()
        .get("/", health::confirm)
        .get("/healthz", health::liveness)
        .get("/readyz", move |_req: Request| health::readiness(Arc::clone(&dependency)))
        .get("/estoque_sapatos", move |_req: Request| stock(Arc::clone(&shoes)))
        .get("/sapatos", move |req: Request| search(Arc::clone(&for_search), req))
}
