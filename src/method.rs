//! HTTP method as a typed enum.
//!
//! Only the RFC 9110 methods a JSON API realistically sees are modelled.
//! Anything else is answered with `405 Method Not Allowed` by the server
//! before routing.

use std::fmt;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
        }
    }
}

/// Converts hyper's method. Extension methods have no counterpart.
impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        match *m {
            http::Method::DELETE  => Ok(Self::Delete),
            http::Method::GET     => Ok(Self::Get),
            http::Method::HEAD    => Ok(Self::Head),
            http::Method::OPTIONS => Ok(Self::Options),
            http::Method::PATCH   => Ok(Self::Patch),
            http::Method::POST    => Ok(Self::Post),
            http::Method::PUT     => Ok(Self::Put),
            _                     => Err(UnsupportedMethod(m.as_str().to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method the router cannot register handlers for.
#[derive(Debug, thiserror::Error)]
#[error("unsupported HTTP method `{0}`")]
pub struct UnsupportedMethod(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_standard_methods() {
        assert_eq!(Method::try_from(&http::Method::GET).unwrap(), Method::Get);
        assert_eq!(Method::try_from(&http::Method::OPTIONS).unwrap(), Method::Options);
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn rejects_methods_without_a_variant() {
        let err = Method::try_from(&http::Method::TRACE).unwrap_err();
        assert_eq!(err.0, "TRACE");

        let purge = http::Method::from_bytes(b"PURGE").unwrap();
        assert!(Method::try_from(&purge).is_err());
    }
}
