use crate::{RawResponse, RequestBody, RequestError};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use url::Url;

/// Everything the transport needs to issue one request.
#[derive(Clone, Debug)]
pub struct RequestEnvelope {
    /// Endpoint to send the request to.
    pub uri: Url,
    /// HTTP method, always `POST` for this link.
    pub method: Method,
    /// Resolved request headers. For a multipart body this never contains a
    /// fixed `Content-Type`; the transport's multipart encoder owns the
    /// boundary-bearing one.
    pub headers: HeaderMap,
    /// The assembled body.
    pub body: RequestBody,
}

/// An HTTP transport.
///
/// The link is generic over its transport so tests run without a network
/// and alternative HTTP stacks can be plugged in. The default is
/// [`ReqwestFetch`].
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issue the request and buffer the response.
    ///
    /// Implementations must support being dropped mid-flight; the link
    /// drops the future to honor cancellation.
    async fn fetch(&self, envelope: RequestEnvelope) -> Result<RawResponse, RequestError>;
}

/// The default [`Fetch`] implementation, backed by a shared
/// [`reqwest::Client`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Create a transport over a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport over an existing client, keeping its pool and
    /// defaults.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestFetch { client }
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, envelope: RequestEnvelope) -> Result<RawResponse, RequestError> {
        let RequestEnvelope {
            uri,
            method,
            mut headers,
            body,
        } = envelope;

        let builder = match body {
            RequestBody::Json(payload) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                self.client.request(method, uri).headers(headers).body(payload)
            }
            RequestBody::Multipart(form) => {
                // reqwest sets the boundary-bearing content type; headers go
                // on first so it cannot be clobbered.
                self.client
                    .request(method, uri)
                    .headers(headers)
                    .multipart(form.into_reqwest()?)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
