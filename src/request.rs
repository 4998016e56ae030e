//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::method::Method;

/// An incoming HTTP request with its body fully read.
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: Option<String>,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        Self { method, path, query, headers, body, params: HashMap::new() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first value of a query-string parameter, percent-decoded.
    ///
    /// `?nome=Bota%20Alta&tamanho=42` → `query("nome") == Some("Bota Alta")`.
    /// A key present without `=` yields an empty string.
    pub fn query(&self, key: &str) -> Option<String> {
        let raw = self.query.as_deref()?;
        raw.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(k, _)| decode_component(k) == key)
            .map(|(_, v)| decode_component(v))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Decodes `application/x-www-form-urlencoded` text: `+` is a space and
/// `%XX` a byte. Malformed escapes are kept verbatim; invalid UTF-8 is
/// replaced.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
impl Request {
    /// Builds a request from a method, a path with optional query string,
    /// and a body.
    pub(crate) fn test(method: Method, uri: &str, body: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (uri.to_owned(), None),
        };
        Self::new(method, path, query, Vec::new(), Bytes::from(body.to_owned()))
    }

    pub(crate) fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_decoded() {
        let req = Request::test(Method::Get, "/sapatos?nome=Bota+de%20Couro&tamanho=42", "");
        assert_eq!(req.query("nome").as_deref(), Some("Bota de Couro"));
        assert_eq!(req.query("tamanho").as_deref(), Some("42"));
        assert_eq!(req.query("cor"), None);
    }

    #[test]
    fn query_decodes_multibyte_utf8() {
        let req = Request::test(Method::Get, "/sapatos?nome=T%C3%AAnis", "");
        assert_eq!(req.query("nome").as_deref(), Some("Tênis"));
    }

    #[test]
    fn query_keeps_malformed_escapes_and_bare_keys() {
        let req = Request::test(Method::Get, "/x?a=100%&b&c=%zz", "");
        assert_eq!(req.query("a").as_deref(), Some("100%"));
        assert_eq!(req.query("b").as_deref(), Some(""));
        assert_eq!(req.query("c").as_deref(), Some("%zz"));
    }

    #[test]
    fn request_without_query_string_has_no_params() {
        let req = Request::test(Method::Get, "/sapatos", "");
        assert_eq!(req.query("nome"), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::test(Method::Get, "/", "").with_header("Origin", "http://a.test");
        assert_eq!(req.header("origin"), Some("http://a.test"));
    }

    #[test]
    fn json_body_is_deserialized() {
        #[derive(serde::Deserialize)]
        struct Body {
            id: i64,
        }
        let req = Request::test(Method::Post, "/produtos", r#"{"id":7}"#);
        assert_eq!(req.json::<Body>().unwrap().id, 7);
        assert!(Request::test(Method::Post, "/produtos", "").json::<Body>().is_err());
    }
}
