//! Cross-origin resource sharing.
//!
//! Browser front-ends call the services from another origin, so every
//! response to a request that carries `Origin` gets the
//! `access-control-allow-*` headers, and `OPTIONS` preflights are answered
//! before routing.

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// CORS policy applied by the [`Server`](crate::Server).
#[derive(Clone, Debug)]
pub struct Cors {
    /// Allowed origins. Empty allows every origin (`*`).
    origins: Vec<String>,
    methods: Vec<Method>,
    headers: Vec<String>,
    max_age: u32,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origins: Vec::new(),
            methods: vec![Method::Get, Method::Head, Method::Post, Method::Options],
            headers: vec!["content-type".to_owned(), "authorization".to_owned()],
            max_age: 86_400,
        }
    }
}

impl Cors {
    /// Any origin, the default method and header sets.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Restricts to the given origins; an empty list stays permissive.
    pub fn allow_origins(origins: impl IntoIterator<Item = String>) -> Self {
        Self { origins: origins.into_iter().collect(), ..Self::default() }
    }

    fn allowed_origin<'a>(&self, origin: &'a str) -> Option<&'a str> {
        if self.origins.is_empty() {
            Some("*")
        } else if self.origins.iter().any(|o| o == origin) {
            Some(origin)
        } else {
            None
        }
    }

    /// Answers a preflight request, or `None` if `req` is not one.
    pub(crate) fn preflight(&self, req: &Request) -> Option<Response> {
        if req.method() != Method::Options {
            return None;
        }
        let origin = req.header("origin")?;
        let mut res = Response::builder().status(Status::NoContent).no_body();
        if let Some(allowed) = self.allowed_origin(origin) {
            self.push_headers(&mut res, allowed);
            let methods = self.methods.iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            res.push_header("access-control-allow-methods", methods);
            res.push_header("access-control-allow-headers", self.headers.join(", "));
            res.push_header("access-control-max-age", self.max_age.to_string());
        }
        Some(res)
    }

    /// Adds the allow headers to a routed response. Requests without
    /// `Origin`, or from an origin not on the list, are left untouched.
    pub(crate) fn decorate(&self, origin: Option<&str>, res: &mut Response) {
        if let Some(allowed) = origin.and_then(|o| self.allowed_origin(o)) {
            self.push_headers(res, allowed);
        }
    }

    fn push_headers(&self, res: &mut Response, allowed: &str) {
        res.push_header("access-control-allow-origin", allowed);
        if allowed != "*" {
            res.push_header("vary", "origin");
        }
    }
}
