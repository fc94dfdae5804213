use crate::{RawResponse, RequestError};
use serde::{Deserialize, Serialize};

/// A GraphQL response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Response {
    /// Data returned by the operation, if any.
    #[serde(default)]
    pub data: Option<serde_json::Value>,

    /// Errors returned by the operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,

    /// Extensions returned alongside the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl Response {
    /// Returns `true` if the response carries no errors.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if the response carries errors *and* partial data.
    #[inline]
    pub fn has_partial_data(&self) -> bool {
        !self.errors.is_empty() && self.data.is_some()
    }

    /// Convert the response to a `Result`, treating any error as failure.
    pub fn into_result(self) -> Result<Response, RequestError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(RequestError::Graphql(self))
        }
    }
}

/// An error returned by the server inside a GraphQL response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error message.
    pub message: String,

    /// Locations of the error in the operation document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,

    /// Path to the response field the error applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,

    /// Additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl ServerError {
    /// Create a server error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        ServerError {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

/// A `line`/`column` pair pointing into the operation document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// One-based line number.
    pub line: u32,
    /// One-based column number.
    pub column: u32,
}

/// Parses a raw transport response into a GraphQL [`Response`].
///
/// The link treats the parser as an opaque collaborator, so alternative
/// response formats can be plugged in without touching the request pipeline.
pub trait ParseResponse: Send + Sync {
    /// Parse the buffered transport response.
    fn parse(&self, raw: &RawResponse) -> Result<Response, RequestError>;
}

/// The default [`ParseResponse`] implementation: JSON bodies only.
///
/// A body that decodes into the GraphQL response shape is accepted whatever
/// the status code, so servers answering `4xx`/`5xx` with a structured
/// GraphQL result (including partial data) still reach the caller. A
/// non-success status without such a body is a transport-level failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonResponseParser;

impl ParseResponse for JsonResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Response, RequestError> {
        match serde_json::from_slice::<Response>(&raw.body) {
            Ok(response) if response.data.is_some() || !response.errors.is_empty() => Ok(response),
            _ if !raw.status.is_success() => Err(RequestError::Status {
                status: raw.status,
                body: String::from_utf8_lossy(&raw.body).into_owned(),
            }),
            Ok(response) => Ok(response),
            Err(err) => Err(RequestError::Decode(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};

    fn raw(status: StatusCode, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            body: bytes::Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn test_parse_success() {
        let response = JsonResponseParser
            .parse(&raw(StatusCode::OK, r#"{"data":{"a":1}}"#))
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(response.data, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_parse_partial() {
        let response = JsonResponseParser
            .parse(&raw(
                StatusCode::OK,
                r#"{"data":{"a":null},"errors":[{"message":"boom"}]}"#,
            ))
            .unwrap();
        assert!(response.has_partial_data());
        assert_eq!(response.errors, vec![ServerError::new("boom")]);
    }

    #[test]
    fn test_graphql_body_wins_over_status() {
        let response = JsonResponseParser
            .parse(&raw(
                StatusCode::BAD_REQUEST,
                r#"{"errors":[{"message":"bad variables"}]}"#,
            ))
            .unwrap();
        assert!(!response.is_ok());
        assert!(!response.has_partial_data());
    }

    #[test]
    fn test_non_graphql_error_status() {
        let err = JsonResponseParser
            .parse(&raw(StatusCode::BAD_GATEWAY, "upstream unavailable"))
            .unwrap_err();
        match err {
            RequestError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_success_body() {
        let err = JsonResponseParser
            .parse(&raw(StatusCode::OK, "<html>"))
            .unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
    }
}
