//! Database error → HTTP status and message.
//!
//! One table serves every route:
//!
//! | [`ErrorCode`] | Status | Message |
//! |---|---|---|
//! | `DuplicateKey` | 400 | duplicate id |
//! | `NoSuchTable` | 400 | table does not exist |
//! | `ConnectionRefused` | 400 | database server unreachable |
//! | `BadDatabase` | 400 | database does not exist |
//! | `AccessDenied` | 400 | check the credentials |
//! | `ParseError` | 400 | malformed query |
//! | `Other` | route fallback | route fallback |
//!
//! Routes differ only in the fallback they pass to [`Classifier::new`].

use tracing::error;

use crate::db::{DbError, ErrorCode};
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// The status and message a failed request is answered with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub message: &'static str,
}

impl Outcome {
    pub const fn new(status: Status, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        Response::message(self.status, self.message)
    }
}

/// The recognized part of the table. `None` for [`ErrorCode::Other`].
pub fn classify(code: ErrorCode) -> Option<Outcome> {
    let message = match code {
        ErrorCode::DuplicateKey      => "duplicate id: a product with this id already exists",
        ErrorCode::NoSuchTable       => "table does not exist in the database",
        ErrorCode::ConnectionRefused => "database server unreachable",
        ErrorCode::BadDatabase       => "database does not exist",
        ErrorCode::AccessDenied      => "access denied: check the database credentials",
        ErrorCode::ParseError        => "malformed query",
        ErrorCode::Other             => return None,
    };
    Some(Outcome::new(Status::BadRequest, message))
}

/// [`classify`] completed with a per-route fallback.
#[derive(Clone, Copy, Debug)]
pub struct Classifier {
    fallback: Outcome,
}

impl Classifier {
    pub const fn new(fallback: Outcome) -> Self {
        Self { fallback }
    }

    pub fn resolve(&self, code: ErrorCode) -> Outcome {
        classify(code).unwrap_or(self.fallback)
    }

    /// Logs `err` and returns the outcome to answer with.
    pub fn report(&self, err: &DbError) -> Outcome {
        let outcome = self.resolve(err.code());
        error!(code = %err.code(), status = outcome.status.as_u16(), "database error: {err}");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const READS: Classifier =
        Classifier::new(Outcome::new(Status::InternalServerError, "unidentified error"));
    const INSERTS: Classifier =
        Classifier::new(Outcome::new(Status::BadRequest, "error inserting product"));

    #[test]
    fn recognized_codes_are_client_errors() {
        for code in [
            ErrorCode::DuplicateKey,
            ErrorCode::NoSuchTable,
            ErrorCode::ConnectionRefused,
            ErrorCode::BadDatabase,
            ErrorCode::AccessDenied,
            ErrorCode::ParseError,
        ] {
            let outcome = classify(code).unwrap();
            assert_eq!(outcome.status, Status::BadRequest, "{code}");
            assert_eq!(READS.resolve(code), INSERTS.resolve(code), "{code}");
        }
    }

    #[test]
    fn unrecognized_codes_take_the_route_fallback() {
        assert_eq!(classify(ErrorCode::Other), None);
        assert_eq!(READS.resolve(ErrorCode::Other).status, Status::InternalServerError);
        assert_eq!(INSERTS.resolve(ErrorCode::Other).message, "error inserting product");
    }

    #[test]
    fn outcome_renders_as_message_body() {
        let err = DbError::new(ErrorCode::ConnectionRefused, "connection refused");
        let res = READS.report(&err).into_response();
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.body(), br#"{"message":"database server unreachable"}"#);
    }
}
