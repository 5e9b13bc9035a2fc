//! RFC 7807 problem-details responses for the management API surface.

use std::collections::BTreeMap;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

/// Representation of a Problem error to return to the client.
/// Follows RFC 7807 - Problem Details for HTTP APIs
#[derive(Debug, Clone)]
pub struct Problem {
    /// The status code of the problem.
    pub status_code: StatusCode,
    /// The actual body of the problem.
    pub body: BTreeMap<String, Value>,
}

/// Create a new `Problem` response to send to the client.
pub fn new<S>(status_code: S) -> Problem
where
    S: Into<StatusCode>,
{
    Problem {
        status_code: status_code.into(),
        body: BTreeMap::new(),
    }
}

impl Problem {
    /// Specify the "title" to use for the problem.
    pub fn with_title<S>(self, value: S) -> Self
    where
        S: Into<String>,
    {
        self.with_value("title", value.into())
    }

    /// Specify the "detail" to use for the problem.
    pub fn with_detail<S>(self, value: S) -> Self
    where
        S: Into<String>,
    {
        self.with_value("detail", value.into())
    }

    /// Specify an arbitrary value to include in the problem.
    pub fn with_value<V>(mut self, key: &str, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.body.insert(key.to_owned(), value.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        if self.body.is_empty() {
            self.status_code.into_response()
        } else {
            let body = Json(self.body);
            let mut response = (self.status_code, body).into_response();

            response
                .headers_mut()
                .insert(CONTENT_TYPE, "application/problem+json".parse().unwrap());
            response
        }
    }
}

/// 400 Bad Request
pub fn bad_request() -> Problem {
    new(StatusCode::BAD_REQUEST).with_title("Bad Request")
}

/// 404 Not Found
pub fn not_found() -> Problem {
    new(StatusCode::NOT_FOUND).with_title("Not Found")
}

/// 500 Internal Server Error
pub fn internal_server_error() -> Problem {
    new(StatusCode::INTERNAL_SERVER_ERROR).with_title("Internal Server Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_accumulates_fields() {
        let problem = bad_request().with_detail("missing field 'To'");

        assert_eq!(problem.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(
            problem.body.get("title").and_then(Value::as_str),
            Some("Bad Request")
        );
        assert_eq!(
            problem.body.get("detail").and_then(Value::as_str),
            Some("missing field 'To'")
        );
    }
}
