use crate::{Value, Variables};
use serde::{Serialize, Serializer};

/// A GraphQL operation to be sent through the link.
///
/// # Examples
///
/// ```
/// use graphql_upload_link::{GraphQLRequest, UploadFile};
///
/// let request = GraphQLRequest::new("mutation ($file: Upload!) { upload(file: $file) }")
///     .variable("file", UploadFile::new("hello.txt", "Hello!"));
/// ```
#[derive(Clone, Debug)]
pub struct GraphQLRequest {
    /// The query or mutation document source.
    pub query: String,

    /// The name of the operation to execute, for multi-operation documents.
    pub operation_name: Option<String>,

    /// The variables of the operation.
    pub variables: Variables,

    /// Protocol extensions (persisted queries and the like).
    pub extensions: Option<serde_json::Value>,
}

impl GraphQLRequest {
    /// Create a request from a query source.
    pub fn new(query: impl Into<String>) -> Self {
        GraphQLRequest {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
            extensions: None,
        }
    }

    /// Specify the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Replace the variables wholesale.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Add a single variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name, value);
        self
    }

    /// Attach protocol extensions.
    pub fn extensions(mut self, extensions: serde_json::Value) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// The request body with `variables` substituted, usually the
    /// file-stripped clone produced by extraction.
    pub(crate) fn payload_with<'a>(&'a self, variables: &'a Variables) -> OperationsPayload<'a> {
        OperationsPayload {
            query: &self.query,
            operation_name: self.operation_name.as_deref(),
            variables,
            extensions: self.extensions.as_ref(),
        }
    }
}

impl Serialize for GraphQLRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload_with(&self.variables).serialize(serializer)
    }
}

/// Serialized form of an operation, the `operations` multipart field.
#[derive(Serialize)]
pub(crate) struct OperationsPayload<'a> {
    query: &'a str,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
    variables: &'a Variables,
    #[serde(skip_serializing_if = "Option::is_none")]
    extensions: Option<&'a serde_json::Value>,
}
