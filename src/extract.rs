//! File extraction.
//!
//! Walks an operation's variables depth-first, replaces every file payload
//! with `null` in a structural clone, and records the paths at which each
//! distinct file occurs. Object entries are visited in insertion order and
//! list elements in index order, so the first-occurrence order of files (and
//! with it the multipart part numbering) is stable for identical inputs.

use crate::{GraphQLRequest, RequestError, UploadFile, Value, Variables};
use fnv::FnvHashMap;
use std::fmt;
use std::sync::Arc;

/// Decides whether a value is a file to be extracted.
///
/// The default predicate, [`is_extractable_file`], matches every
/// [`Value::Upload`]. A custom predicate can restrict extraction further; a
/// file it rejects stays in the tree and fails serialization with a
/// descriptive error rather than being silently JSON-encoded.
pub type FilePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// The default file predicate: matches any [`Value::Upload`].
pub fn is_extractable_file(value: &Value) -> bool {
    value.is_upload()
}

/// One segment of an occurrence path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// A list index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// The path from the operation root to one occurrence of a file.
///
/// Renders `.`-joined, e.g. `variables.input.attachments.0.file`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path(pub Vec<PathSegment>);

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}

/// A distinct file and every path at which it occurs.
#[derive(Clone, Debug)]
pub struct FileOccurrence {
    /// The file, shared with the original variables.
    pub file: UploadFile,
    /// Occurrence paths, in traversal order.
    pub paths: Vec<Path>,
}

/// The result of extracting files from an operation.
#[derive(Clone, Debug)]
pub struct Extraction {
    /// The file-stripped clone of the operation's variables. Every recorded
    /// path points at a `null` in this clone.
    pub variables: Variables,
    /// Distinct files in first-occurrence order.
    pub files: Vec<FileOccurrence>,
}

// serde_json refuses to recurse past this depth; extraction fails fast at
// the same point instead of overflowing the stack on pathological input.
const MAX_DEPTH: usize = 128;

/// Extract the files of an operation.
///
/// The request is only read; the returned [`Extraction`] holds a stripped
/// clone of its variables. Paths are rooted at the operation, so they all
/// start with the `variables` segment.
pub fn extract(
    request: &GraphQLRequest,
    predicate: &FilePredicate,
) -> Result<Extraction, RequestError> {
    let mut walker = Walker::new(predicate.as_ref());
    let mut stack = vec![PathSegment::Key("variables".to_owned())];
    let mut stripped = Variables::default();
    for (name, value) in request.variables.iter() {
        stack.push(PathSegment::Key(name.clone()));
        let cloned = walker.walk(value, &mut stack, 1);
        stack.pop();
        stripped.0.insert(name.clone(), cloned?);
    }
    Ok(Extraction {
        variables: stripped,
        files: walker.files,
    })
}

/// Extract the files of a bare value, with paths relative to that value.
pub fn extract_value(
    value: &Value,
    predicate: &FilePredicate,
) -> Result<(Value, Vec<FileOccurrence>), RequestError> {
    let mut walker = Walker::new(predicate.as_ref());
    let mut stack = Vec::new();
    let cloned = walker.walk(value, &mut stack, 0)?;
    Ok((cloned, walker.files))
}

struct Walker<'a> {
    predicate: &'a (dyn Fn(&Value) -> bool + Send + Sync),
    files: Vec<FileOccurrence>,
    // file identity -> index into `files`
    slots: FnvHashMap<usize, usize>,
}

impl<'a> Walker<'a> {
    fn new(predicate: &'a (dyn Fn(&Value) -> bool + Send + Sync)) -> Self {
        Walker {
            predicate,
            files: Vec::new(),
            slots: FnvHashMap::default(),
        }
    }

    fn record(&mut self, file: &UploadFile, path: &[PathSegment]) {
        let slot = match self.slots.get(&file.identity()) {
            Some(&slot) => slot,
            None => {
                self.slots.insert(file.identity(), self.files.len());
                self.files.push(FileOccurrence {
                    file: file.clone(),
                    paths: Vec::new(),
                });
                self.files.len() - 1
            }
        };
        self.files[slot].paths.push(Path(path.to_vec()));
    }

    fn walk(
        &mut self,
        value: &Value,
        path: &mut Vec<PathSegment>,
        depth: usize,
    ) -> Result<Value, RequestError> {
        if depth > MAX_DEPTH {
            return Err(RequestError::TooDeep);
        }
        match value {
            // Files are leaves; the predicate wins over any other reading of
            // the value, and matched files are never descended into.
            Value::Upload(file) if (self.predicate)(value) => {
                self.record(file, path);
                Ok(Value::Null)
            }
            Value::List(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    let item = self.walk(item, path, depth + 1);
                    path.pop();
                    cloned.push(item?);
                }
                Ok(Value::List(cloned))
            }
            Value::Object(map) => {
                let mut cloned = indexmap::IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    path.push(PathSegment::Key(key.clone()));
                    let item = self.walk(item, path, depth + 1);
                    path.pop();
                    cloned.insert(key.clone(), item?);
                }
                Ok(Value::Object(cloned))
            }
            // Scalars, nulls, and uploads the predicate rejected copy
            // through unchanged.
            other => Ok(other.clone()),
        }
    }
}
