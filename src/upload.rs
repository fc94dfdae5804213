use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// A file payload to be uploaded.
///
/// **Reference:** <https://github.com/jaydenseric/graphql-multipart-request-spec>
///
/// GraphQL supports file uploads via `multipart/form-data`. Place an
/// `UploadFile` anywhere inside an operation's variables and the link will
/// strip it out of the JSON body and send it as a separate multipart part.
///
/// `UploadFile` is cheaply cloneable and clones share **identity**: the same
/// file referenced from several variable positions is sent over the wire
/// exactly once, with every occurrence path listed in the `map` part.
///
/// # Example
///
/// ```
/// use graphql_upload_link::UploadFile;
///
/// let photo = UploadFile::new("photo.png", vec![0x89, 0x50, 0x4e, 0x47])
///     .content_type("image/png");
/// let again = photo.clone();
/// assert!(photo.same_file(&again));
/// ```
#[derive(Clone)]
pub struct UploadFile(Arc<Inner>);

#[derive(Clone)]
struct Inner {
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

impl UploadFile {
    /// Create a new file payload from a filename and its raw content.
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        UploadFile(Arc::new(Inner {
            filename: filename.into(),
            content_type: None,
            content: content.into(),
        }))
    }

    /// Set the MIME type attached to the file's multipart part.
    ///
    /// Call this before sharing the file between variable positions; writing
    /// through a shared handle would split its identity.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.0).content_type = Some(content_type.into());
        self
    }

    /// Filename of the uploaded file.
    pub fn filename(&self) -> &str {
        &self.0.filename
    }

    /// Content type of the uploaded file, if one was set.
    pub fn mime_type(&self) -> Option<&str> {
        self.0.content_type.as_deref()
    }

    /// Raw content of the uploaded file.
    pub fn content(&self) -> &Bytes {
        &self.0.content
    }

    /// Returns `true` if `other` is the same logical file.
    ///
    /// This is reference identity, not structural equality: two files built
    /// from identical bytes are still distinct uploads.
    pub fn same_file(&self, other: &UploadFile) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity key used to deduplicate occurrences during extraction.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for UploadFile {
    fn eq(&self, other: &Self) -> bool {
        self.same_file(other)
    }
}

impl Eq for UploadFile {}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.0.filename)
            .field("content_type", &self.0.content_type)
            .field("len", &self.0.content.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let file = UploadFile::new("a.txt", "alpha");
        let clone = file.clone();
        let twin = UploadFile::new("a.txt", "alpha");

        assert!(file.same_file(&clone));
        assert!(!file.same_file(&twin));
        assert_eq!(file, clone);
        assert_ne!(file, twin);
    }

    #[test]
    fn test_content_type() {
        let file = UploadFile::new("a.png", "png-bytes").content_type("image/png");
        assert_eq!(file.mime_type(), Some("image/png"));
        assert_eq!(file.filename(), "a.png");
        assert_eq!(file.content().as_ref(), b"png-bytes");
    }
}
