//! Radix-tree request router.
//!
//! One tree per HTTP method. A path that exists under a different method
//! answers `405`, an unknown path `404`. `HEAD` without its own route runs the
//! `GET` handler and drops the body.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Built once at startup and handed to [`Server::serve`](crate::Server::serve).
/// Registration methods return `self` so they chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or already registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    /// Routes one request to its handler and awaits the response.
    pub async fn handle(&self, mut req: Request) -> Response {
        if req.method() == Method::Head && self.lookup(Method::Head, req.path()).is_none() {
            if let Some((handler, params)) = self.lookup(Method::Get, req.path()) {
                req.params = params;
                let mut res = handler.call(req).await;
                res.body.clear();
                return res;
            }
        }

        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None if self.matches_other_method(req.method(), req.path()) => {
                Response::status(Status::MethodNotAllowed)
            }
            None => Response::status(Status::NotFound),
        }
    }

    fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn matches_other_method(&self, method: Method, path: &str) -> bool {
        self.routes.iter()
            .any(|(m, tree)| *m != method && tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn echo_id(req: Request) -> Response {
        Response::text(req.param("id").unwrap_or("none").to_owned())
    }

    fn app() -> Router {
        Router::new()
            .get("/", |_req: Request| async { "service running" })
            .get("/itens/{id}", echo_id)
            .post("/itens", |_req: Request| async { Status::Created })
    }

    #[tokio::test]
    async fn dispatches_by_method_and_path() {
        let res = app().handle(Request::test(Method::Get, "/", "")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"service running");

        let res = app().handle(Request::test(Method::Post, "/itens", "{}")).await;
        assert_eq!(res.status_code(), 201);
    }

    #[tokio::test]
    async fn fills_path_params() {
        let res = app().handle(Request::test(Method::Get, "/itens/42", "")).await;
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_wrong_method_is_405() {
        let res = app().handle(Request::test(Method::Get, "/nada", "")).await;
        assert_eq!(res.status_code(), 404);

        let res = app().handle(Request::test(Method::Delete, "/itens", "")).await;
        assert_eq!(res.status_code(), 405);
    }

    #[tokio::test]
    async fn head_falls_back_to_get_without_a_body() {
        let res = app().handle(Request::test(Method::Head, "/itens/7", "")).await;
        assert_eq!(res.status_code(), 200);
        assert!(res.body().is_empty());

        let res = app().handle(Request::test(Method::Head, "/itens", "")).await;
        assert_eq!(res.status_code(), 405);

        let res = app().handle(Request::test(Method::Head, "/nada", "")).await;
        assert_eq!(res.status_code(), 404);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn duplicate_route_panics() {
        let _ = Router::new()
            .get("/lista", |_req: Request| async { "a" })
            .get("/lista", |_req: Request| async { "b" });
    }
}
