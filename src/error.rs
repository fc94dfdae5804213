use crate::Response;
use http::StatusCode;

/// An error raised while executing a request through the link.
///
/// Cancellation is deliberately absent from this taxonomy: a cancelled
/// request terminates its stream silently instead of surfacing an error.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The operation payload could not be serialized to JSON.
    ///
    /// This covers file values left behind by a restrictive predicate as
    /// well as any other value the wire format cannot represent.
    #[error("failed to serialize request payload: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The variables are nested beyond the supported depth.
    #[error("variables are nested too deeply")]
    TooDeep,

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-success status and a body that is not
    /// a GraphQL response.
    #[error("unexpected response status {status}")]
    Status {
        /// Status code of the response.
        status: StatusCode,
        /// Response body, decoded lossily for diagnostics.
        body: String,
    },

    /// The response body could not be decoded as a GraphQL response.
    #[error("failed to decode GraphQL response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The decoded response carried GraphQL errors.
    ///
    /// When the response also carried partial data, the response is emitted
    /// before this error is raised.
    #[error("GraphQL response contained {} error(s)", .0.errors.len())]
    Graphql(Response),
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        RequestError::Transport(Box::new(err))
    }
}
