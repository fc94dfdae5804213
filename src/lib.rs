//! A GraphQL multipart file upload client link implemented in Rust.
//!
//! **Reference:** <https://github.com/jaydenseric/graphql-multipart-request-spec>
//!
//! `graphql-upload-link` is the terminal, network-performing stage of a
//! GraphQL client pipeline. It sends operations over HTTP as plain JSON
//! bodies, and transparently switches to the GraphQL multipart request
//! convention whenever an operation's variables carry file payloads: the
//! files are stripped out of the JSON body, deduplicated by identity, and
//! sent as separate `multipart/form-data` parts alongside an `operations`
//! part (the file-stripped operation) and a `map` part (part index to
//! occurrence paths).
//!
//! ## Features
//!
//! * Files anywhere in the variables, however deeply nested in objects and
//!   lists; occurrence paths like `variables.input.attachments.0.file` are
//!   reproduced exactly.
//! * One part per distinct file: the same [`UploadFile`] referenced from
//!   several positions is sent once, with every path listed in the map.
//! * Cooperative cancellation via [`CancellationToken`]; a cancelled request
//!   ends its stream silently instead of erroring.
//! * Partial results: a response carrying both errors and data is yielded
//!   before the failure is raised, so callers keep the data.
//! * Injectable transport, response parser, file predicate and file-append
//!   strategy.
//!
//! ## Example
//!
//! ```no_run
//! use graphql_upload_link::{GraphQLRequest, UploadFile, UploadLink};
//! use futures_util::StreamExt;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let link = UploadLink::new("https://example.com/graphql".parse()?);
//!
//! let request = GraphQLRequest::new("mutation ($file: Upload!) { upload(file: $file) }")
//!     .variable("file", UploadFile::new("hello.txt", "Hello!"));
//!
//! let mut responses = link.execute(&request);
//! while let Some(result) = responses.next().await {
//!     let response = result?;
//!     println!("{:?}", response.data);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod link;
mod request;
mod response;
mod upload;
mod value;

pub mod extract;
pub mod multipart;
pub mod transport;

pub use context::{RawResponse, RequestContext};
pub use error::RequestError;
pub use extract::{
    is_extractable_file, Extraction, FileOccurrence, FilePredicate, Path, PathSegment,
};
pub use link::{ResponseStream, UploadLink, UploadLinkBuilder};
pub use multipart::{append_file, FileAppender, Form, Part, PartBody, RequestBody};
pub use request::GraphQLRequest;
pub use response::{ErrorLocation, JsonResponseParser, ParseResponse, Response, ServerError};
pub use transport::{Fetch, ReqwestFetch, RequestEnvelope};
pub use upload::UploadFile;
pub use value::{Value, Variables};

pub use tokio_util::sync::CancellationToken;
