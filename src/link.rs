use crate::extract::{extract, is_extractable_file, FilePredicate};
use crate::multipart::{append_file, assemble, FileAppender, Form, RequestBody};
use crate::response::{JsonResponseParser, ParseResponse};
use crate::transport::{Fetch, ReqwestFetch, RequestEnvelope};
use crate::{GraphQLRequest, RequestContext, RequestError, Response, UploadFile, Value};
use futures_util::Stream;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// A terminating link that sends GraphQL operations over HTTP, switching to
/// the multipart request convention whenever the variables carry files.
///
/// **Reference:** <https://github.com/jaydenseric/graphql-multipart-request-spec>
///
/// # Examples
///
/// ```no_run
/// use graphql_upload_link::{GraphQLRequest, UploadFile, UploadLink};
/// use futures_util::StreamExt;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let link = UploadLink::new("https://example.com/graphql".parse()?);
///
/// let request = GraphQLRequest::new("mutation ($file: Upload!) { upload(file: $file) }")
///     .variable("file", UploadFile::new("hello.txt", "Hello!"));
///
/// let mut responses = link.execute(&request);
/// while let Some(result) = responses.next().await {
///     println!("{:?}", result?.data);
/// }
/// # Ok(())
/// # }
/// ```
///
/// The request above goes out as the multipart equivalent of:
///
/// ```curl
/// curl 'https://example.com/graphql' \
/// --form 'operations={
///         "query": "mutation ($file: Upload!) { upload(file: $file) }",
///         "variables": { "file": null }}' \
/// --form 'map={ "1": ["variables.file"] }' \
/// --form '1=@hello.txt'
/// ```
#[derive(Clone)]
pub struct UploadLink {
    uri: Url,
    headers: HeaderMap,
    fetch: Arc<dyn Fetch>,
    parser: Arc<dyn ParseResponse>,
    is_extractable: FilePredicate,
    append_file: FileAppender,
}

impl UploadLink {
    /// Create a link with the default transport, parser, predicate and
    /// appender.
    pub fn new(uri: Url) -> Self {
        Self::build(uri).finish()
    }

    /// Start building a link against an endpoint.
    pub fn build(uri: Url) -> UploadLinkBuilder {
        UploadLinkBuilder {
            uri,
            headers: HeaderMap::new(),
            fetch: None,
            parser: None,
            is_extractable: Arc::new(is_extractable_file),
            append_file: Arc::new(append_file),
        }
    }

    /// Execute an operation.
    ///
    /// Every call re-runs the whole pipeline: extraction, serialization,
    /// assembly and the HTTP exchange. Dropping the returned stream cancels
    /// an in-flight request.
    pub fn execute(&self, request: &GraphQLRequest) -> ResponseStream {
        self.execute_with(request, RequestContext::new(), CancellationToken::new())
    }

    /// Execute an operation with an explicit context and cancellation token.
    ///
    /// The context supplies per-request endpoint/header overrides and
    /// receives the raw transport response; the token aborts the in-flight
    /// request when cancelled. Cancellation terminates the stream silently,
    /// with no value and no error; cancelling after the response has been
    /// yielded is a no-op.
    pub fn execute_with(
        &self,
        request: &GraphQLRequest,
        context: RequestContext,
        cancel: CancellationToken,
    ) -> ResponseStream {
        let link = self.clone();
        let request = request.clone();
        let stream = async_stream::stream! {
            match link.run(&request, &context, cancel).await {
                Outcome::Emit(response) => yield Ok(response),
                Outcome::EmitThenFail(response, error) => {
                    yield Ok(response);
                    yield Err(error);
                }
                Outcome::Aborted => {}
                Outcome::Fail(error) => yield Err(error),
            }
        };
        ResponseStream {
            inner: Box::pin(stream),
        }
    }

    async fn run(
        &self,
        request: &GraphQLRequest,
        context: &RequestContext,
        cancel: CancellationToken,
    ) -> Outcome {
        let envelope = match self.prepare(request, context) {
            Ok(envelope) => envelope,
            Err(err) => return Outcome::Fail(err),
        };

        let raw = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("request cancelled before a response arrived");
                return Outcome::Aborted;
            }
            result = self.fetch.fetch(envelope) => match result {
                Ok(raw) => raw,
                Err(err) => return Outcome::Fail(err),
            },
        };

        // Later pipeline stages read the raw exchange from the context, so
        // it is attached before parsing can fail.
        context.attach_raw_response(raw.clone());
        debug!(status = %raw.status, "response received");

        match self.parser.parse(&raw) {
            Ok(response) if response.has_partial_data() => {
                warn!(
                    errors = response.errors.len(),
                    "response carried partial data alongside errors"
                );
                Outcome::EmitThenFail(response.clone(), RequestError::Graphql(response))
            }
            Ok(response) => Outcome::Emit(response),
            Err(err) => Outcome::Fail(err),
        }
    }

    fn prepare(
        &self,
        request: &GraphQLRequest,
        context: &RequestContext,
    ) -> Result<RequestEnvelope, RequestError> {
        let extraction = extract(request, &self.is_extractable)?;
        let operations = serde_json::to_string(&request.payload_with(&extraction.variables))
            .map_err(RequestError::Serialize)?;
        debug!(files = extraction.files.len(), "operation payload prepared");
        let body = assemble(operations, &extraction.files, &self.append_file)?;

        let mut headers = self.headers.clone();
        for (name, value) in context.extra_headers() {
            headers.insert(name, value.clone());
        }
        if let RequestBody::Multipart(_) = body {
            // The multipart encoder owns the boundary-bearing content type.
            headers.remove(CONTENT_TYPE);
        }

        let uri = context.uri_override().unwrap_or(&self.uri).clone();
        Ok(RequestEnvelope {
            uri,
            method: Method::POST,
            headers,
            body,
        })
    }
}

enum Outcome {
    Emit(Response),
    EmitThenFail(Response, RequestError),
    Aborted,
    Fail(RequestError),
}

/// Builder for [`UploadLink`].
pub struct UploadLinkBuilder {
    uri: Url,
    headers: HeaderMap,
    fetch: Option<Arc<dyn Fetch>>,
    parser: Option<Arc<dyn ParseResponse>>,
    is_extractable: FilePredicate,
    append_file: FileAppender,
}

impl UploadLinkBuilder {
    /// Add a default header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Use an existing [`reqwest::Client`], keeping its pool and defaults.
    pub fn with_client(self, client: reqwest::Client) -> Self {
        self.with_fetch(ReqwestFetch::with_client(client))
    }

    /// Use a custom transport.
    pub fn with_fetch(mut self, fetch: impl Fetch + 'static) -> Self {
        self.fetch = Some(Arc::new(fetch));
        self
    }

    /// Use a custom response parser.
    pub fn with_parser(mut self, parser: impl ParseResponse + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Replace the file predicate deciding which values are extracted.
    pub fn file_predicate(
        mut self,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_extractable = Arc::new(predicate);
        self
    }

    /// Replace the strategy appending file parts to the multipart form.
    pub fn file_appender(
        mut self,
        appender: impl Fn(&mut Form, String, &UploadFile) + Send + Sync + 'static,
    ) -> Self {
        self.append_file = Arc::new(appender);
        self
    }

    /// Build the link, resolving transport and parser defaults once.
    pub fn finish(self) -> UploadLink {
        UploadLink {
            uri: self.uri,
            headers: self.headers,
            fetch: self
                .fetch
                .unwrap_or_else(|| Arc::new(ReqwestFetch::new())),
            parser: self
                .parser
                .unwrap_or_else(|| Arc::new(JsonResponseParser)),
            is_extractable: self.is_extractable,
            append_file: self.append_file,
        }
    }
}

/// The response stream of one execution.
///
/// Yields at most one [`Response`], optionally followed by one error, then
/// ends. A cancelled execution ends without yielding anything.
pub struct ResponseStream {
    inner: Pin<Box<dyn Stream<Item = Result<Response, RequestError>> + Send>>,
}

impl Stream for ResponseStream {
    type Item = Result<Response, RequestError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}
