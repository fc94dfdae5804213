use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use url::Url;

/// The raw transport response, as received from the server.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Buffered response body.
    pub body: Bytes,
}

/// Per-execution request context.
///
/// Carries per-request overrides into the pipeline (endpoint, extra headers)
/// and the raw transport response back out of it. Clones share state, so a
/// caller can keep a handle and inspect [`RawResponse`] after the response
/// stream has yielded.
///
/// The raw-response slot is write-once; it is filled exactly once per
/// execution, before the parsed result is emitted.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    uri: Option<Url>,
    headers: HeaderMap,
    raw: Arc<OnceCell<RawResponse>>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the endpoint this request is sent to.
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Add a header merged over the link's defaults for this request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The raw transport response, once one has been received.
    pub fn raw_response(&self) -> Option<&RawResponse> {
        self.raw.get()
    }

    pub(crate) fn uri_override(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    pub(crate) fn extra_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn attach_raw_response(&self, raw: RawResponse) {
        // Contexts are not reused across executions; a second write is a
        // caller error and loses to the first.
        let _ = self.raw.set(raw);
    }
}
