//! Product list service.
//!
//! | Route | Success | Failure |
//! |---|---|---|
//! | `GET /lista` | `200` array of products | `500` fixed message |
//! | `POST /produtos` | `201` `{message, result}` | `400` classified message |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::classify::{Classifier, Outcome};
use crate::db::{Database, DbError};
use crate::health::{self, Dependency};
use crate::{Request, Response, Router, Status};

const SELECT_ALL: &str = "SELECT * FROM lista";
const INSERT: &str = "INSERT INTO lista (id, nome) VALUES (?, ?)";

const LIST_FAILED: Outcome = Outcome::new(Status::InternalServerError, "error fetching products");
const INVALID_BODY: Outcome =
    Outcome::new(Status::BadRequest, "body must contain an integer id and a name");
const PRODUCT_ADDED: &str = "product added";

const INSERT_ERRORS: Classifier =
    Classifier::new(Outcome::new(Status::BadRequest, "error inserting product"));

/// A row of `lista`. Request bodies may spell `name` as `nome`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    #[serde(alias = "nome")]
    #[sqlx(rename = "nome")]
    pub name: String,
}

/// What an insert reports back.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub affected_rows: u64,
    pub insert_id: u64,
}

#[derive(Serialize)]
struct Inserted {
    message: &'static str,
    result: InsertResult,
}

/// Persistence for products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn all(&self) -> Result<Vec<Product>, DbError>;

    /// Fails with [`ErrorCode::DuplicateKey`](crate::db::ErrorCode::DuplicateKey)
    /// if the id is taken.
    async fn insert(&self, product: &Product) -> Result<InsertResult, DbError>;
}

#[async_trait]
impl ProductStore for Database {
    async fn all(&self) -> Result<Vec<Product>, DbError> {
        let mut session = self.session().await?;
        let rows = sqlx::query_as::<_, Product>(SELECT_ALL)
            .fetch_all(session.conn())
            .await;
        session.release().await;
        Ok(rows?)
    }

    async fn insert(&self, product: &Product) -> Result<InsertResult, DbError> {
        let mut session = self.session().await?;
        let done = sqlx::query(INSERT)
            .bind(product.id)
            .bind(product.name.as_str())
            .execute(session.conn())
            .await;
        session.release().await;
        let done = done?;
        Ok(InsertResult { affected_rows: done.rows_affected(), insert_id: done.last_insert_id() })
    }
}

/// `GET /lista`
pub async fn list(store: Arc<dyn ProductStore>) -> Result<Response, Outcome> {
    match store.all().await {
        Ok(products) => Ok(Response::json(&products)),
        Err(e) => {
            error!(code = %e.code(), "fetching products failed: {e}");
            Err(LIST_FAILED)
        }
    }
}

/// `POST /produtos`
pub async fn create(store: Arc<dyn ProductStore>, req: Request) -> Result<Response, Outcome> {
    let product: Product = req.json().map_err(|e| {
        warn!("rejecting product body: {e}");
        INVALID_BODY
    })?;

    let result = store.insert(&product).await.map_err(|e| INSERT_ERRORS.report(&e))?;
    info!(id = product.id, "product added");

    Ok(Response::builder()
        .status(Status::Created)
        .json(&Inserted { message: PRODUCT_ADDED, result }))
}

/// The product service's route table.
pub fn routes<S>(store: Arc<S>) -> Router
where
    S: ProductStore + Dependency + 'static,
{
    let products: Arc<dyn ProductStore> = store.clone();
    let dependency: Arc<dyn Dependency> = store;
    let for_create = Arc::clone(&products);

    Router::new()
        .get("/", health::confirm)
        .get("/healthz", health::liveness)
        .get("/readyz", move |_req: Request| health::readiness(Arc::clone(&dependency)))
        .get("/lista", move |_req: Request| list(Arc::clone(&products)))
        .post("/produtos", move |req: Request| create(Arc::clone(&for_create), req))
}
