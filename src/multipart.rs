//! Multipart body assembly.
//!
//! **Reference:** <https://github.com/jaydenseric/graphql-multipart-request-spec>
//!
//! An operation without files is sent as a plain JSON body. An operation
//! with files becomes a `multipart/form-data` body with exactly three kinds
//! of field, in this order:
//!
//! 1. `operations`: the JSON-serialized operation, every file replaced by
//!    `null` at its original path;
//! 2. `map`: a JSON object from part index to the list of occurrence paths
//!    of that file;
//! 3. one field per distinct file, named by its part index.
//!
//! Part indices are one-based decimal strings assigned in first-occurrence
//! order, and a file referenced from several variable positions collapses to
//! a single entry listing every path.

use crate::{FileOccurrence, RequestError, UploadFile};
use bytes::Bytes;
use indexmap::IndexMap;
use std::sync::Arc;

/// The assembled request body.
#[derive(Clone, Debug)]
pub enum RequestBody {
    /// A plain JSON body; the operation carried no files.
    Json(String),
    /// A multipart body; the boundary-bearing content type is chosen by the
    /// transport at send time.
    Multipart(Form),
}

/// An ordered multipart form.
///
/// Transport-agnostic so tests can assert on the exact parts; the reqwest
/// transport converts it with [`Form::into_reqwest`] when sending.
#[derive(Clone, Debug, Default)]
pub struct Form {
    parts: Vec<Part>,
}

/// A single multipart field.
#[derive(Clone, Debug)]
pub struct Part {
    /// Field name.
    pub name: String,
    /// Filename attached to the part, for file parts.
    pub filename: Option<String>,
    /// Content type attached to the part, for file parts.
    pub content_type: Option<String>,
    /// Part payload.
    pub body: PartBody,
}

/// Payload of a multipart field.
#[derive(Clone, Debug)]
pub enum PartBody {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
}

impl Form {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            body: PartBody::Text(value.into()),
        });
    }

    /// Append a file field carrying the file's content, logical name and
    /// content type.
    pub fn file(&mut self, name: impl Into<String>, file: &UploadFile) {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(file.filename().to_owned()),
            content_type: file.mime_type().map(str::to_owned),
            body: PartBody::Bytes(file.content().clone()),
        });
    }

    /// The fields of the form, in wire order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Convert into a reqwest form for sending.
    pub fn into_reqwest(self) -> Result<reqwest::multipart::Form, RequestError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            let mut piece = match part.body {
                PartBody::Text(text) => reqwest::multipart::Part::text(text),
                PartBody::Bytes(bytes) => reqwest::multipart::Part::stream(bytes),
            };
            if let Some(filename) = part.filename {
                piece = piece.file_name(filename);
            }
            if let Some(content_type) = part.content_type {
                piece = piece
                    .mime_str(&content_type)
                    .map_err(|err| RequestError::Transport(Box::new(err)))?;
            }
            form = form.part(part.name, piece);
        }
        Ok(form)
    }
}

/// Appends a file part to a form.
///
/// The default appender, [`append_file`], sends the raw content with the
/// file's logical name; swap it out to stream from disk, rename files on the
/// wire, and so on.
pub type FileAppender = Arc<dyn Fn(&mut Form, String, &UploadFile) + Send + Sync>;

/// The default [`FileAppender`].
pub fn append_file(form: &mut Form, name: String, file: &UploadFile) {
    form.file(name, file);
}

/// Build the request body for a serialized operation and its extracted
/// files.
pub fn assemble(
    operations: String,
    files: &[FileOccurrence],
    append: &FileAppender,
) -> Result<RequestBody, RequestError> {
    if files.is_empty() {
        return Ok(RequestBody::Json(operations));
    }

    let mut map = IndexMap::with_capacity(files.len());
    for (index, occurrence) in files.iter().enumerate() {
        map.insert(
            (index + 1).to_string(),
            occurrence
                .paths
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        );
    }
    let map = serde_json::to_string(&map).map_err(RequestError::Serialize)?;

    let append = append.as_ref();
    let mut form = Form::new();
    form.text("operations", operations);
    form.text("map", map);
    for (index, occurrence) in files.iter().enumerate() {
        append(&mut form, (index + 1).to_string(), &occurrence.file);
    }
    Ok(RequestBody::Multipart(form))
}
