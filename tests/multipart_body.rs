//! Wire-format coverage: what actually leaves the link for operations with
//! and without file payloads.

use graphql_upload_link::*;
use async_trait::async_trait;
use futures_util::StreamExt;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::sync::{Arc, Mutex};

/// Records the envelope it was asked to send and answers with a canned
/// GraphQL response.
#[derive(Clone, Default)]
struct CaptureFetch {
    seen: Arc<Mutex<Option<RequestEnvelope>>>,
}

#[async_trait]
impl Fetch for CaptureFetch {
    async fn fetch(&self, envelope: RequestEnvelope) -> Result<RawResponse, RequestError> {
        *self.seen.lock().unwrap() = Some(envelope);
        Ok(RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: bytes::Bytes::from_static(br#"{"data":{"ok":true}}"#),
        })
    }
}

fn endpoint() -> url::Url {
    "https://example.com/graphql".parse().unwrap()
}

fn text_part<'a>(form: &'a Form, name: &str) -> &'a str {
    let part = form
        .parts()
        .iter()
        .find(|part| part.name == name)
        .unwrap_or_else(|| panic!("missing part `{}`", name));
    match &part.body {
        PartBody::Text(text) => text,
        other => panic!("part `{}` is not text: {:?}", name, other),
    }
}

#[tokio::test]
async fn no_files_sends_plain_json() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_fetch(fetch.clone())
        .finish();

    let request = GraphQLRequest::new("{ me { id } }").variable("limit", 10);
    link.execute(&request).next().await.unwrap().unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    assert_eq!(
        envelope.headers.get(CONTENT_TYPE),
        Some(&HeaderValue::from_static("application/json"))
    );
    match envelope.body {
        RequestBody::Json(payload) => assert_eq!(
            serde_json::from_str::<serde_json::Value>(&payload).unwrap(),
            serde_json::json!({"query": "{ me { id } }", "variables": {"limit": 10}})
        ),
        other => panic!("unexpected body: {:?}", other),
    }
}

#[tokio::test]
async fn single_file_becomes_three_parts() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .with_fetch(fetch.clone())
        .finish();

    let file = UploadFile::new("hello.txt", "Hello!").content_type("text/plain");
    let request = GraphQLRequest::new("mutation ($file: Upload!) { upload(file: $file) }")
        .variable("file", file);
    link.execute(&request).next().await.unwrap().unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    let form = match envelope.body {
        RequestBody::Multipart(form) => form,
        other => panic!("unexpected body: {:?}", other),
    };

    assert_eq!(
        serde_json::from_str::<serde_json::Value>(text_part(&form, "operations")).unwrap(),
        serde_json::json!({
            "query": "mutation ($file: Upload!) { upload(file: $file) }",
            "variables": {"file": null},
        })
    );
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(text_part(&form, "map")).unwrap(),
        serde_json::json!({"1": ["variables.file"]})
    );

    let file_part = &form.parts()[2];
    assert_eq!(file_part.name, "1");
    assert_eq!(file_part.filename.as_deref(), Some("hello.txt"));
    assert_eq!(file_part.content_type.as_deref(), Some("text/plain"));
    match &file_part.body {
        PartBody::Bytes(bytes) => assert_eq!(bytes.as_ref(), b"Hello!"),
        other => panic!("unexpected part body: {:?}", other),
    }
}

#[tokio::test]
async fn nested_files_reproduce_their_paths() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .with_fetch(fetch.clone())
        .finish();

    let photo = UploadFile::new("photo.png", "png");
    let scan = UploadFile::new("scan.pdf", "pdf");
    let mut variables = Variables::from_json(serde_json::json!({
        "input": { "attachments": [ { "file": null }, { "file": null } ] },
    }));
    match variables.get_mut("input") {
        Some(Value::Object(input)) => match input.get_mut("attachments") {
            Some(Value::List(attachments)) => {
                for (attachment, file) in attachments.iter_mut().zip(vec![photo, scan]) {
                    match attachment {
                        Value::Object(entry) => {
                            entry.insert("file".to_owned(), Value::Upload(file));
                        }
                        _ => unreachable!(),
                    }
                }
            }
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }

    let request = GraphQLRequest::new("mutation ($input: AttachInput!) { attach(input: $input) }")
        .variables(variables);
    link.execute(&request).next().await.unwrap().unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    let form = match envelope.body {
        RequestBody::Multipart(form) => form,
        other => panic!("unexpected body: {:?}", other),
    };

    assert_eq!(
        serde_json::from_str::<serde_json::Value>(text_part(&form, "map")).unwrap(),
        serde_json::json!({
            "1": ["variables.input.attachments.0.file"],
            "2": ["variables.input.attachments.1.file"],
        })
    );
}

#[tokio::test]
async fn shared_file_is_sent_once() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .with_fetch(fetch.clone())
        .finish();

    let file = UploadFile::new("dup.txt", "same bytes");
    let request = GraphQLRequest::new("mutation { a }")
        .variable("original", file.clone())
        .variable("copy", file);
    link.execute(&request).next().await.unwrap().unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    let form = match envelope.body {
        RequestBody::Multipart(form) => form,
        other => panic!("unexpected body: {:?}", other),
    };

    assert_eq!(form.parts().len(), 3);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(text_part(&form, "map")).unwrap(),
        serde_json::json!({"1": ["variables.original", "variables.copy"]})
    );
}

#[tokio::test]
async fn multipart_drops_fixed_content_type() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(AUTHORIZATION, HeaderValue::from_static("Bearer token"))
        .with_fetch(fetch.clone())
        .finish();

    let request = GraphQLRequest::new("mutation { a }")
        .variable("file", UploadFile::new("a.txt", "alpha"));
    link.execute(&request).next().await.unwrap().unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    assert!(envelope.headers.get(CONTENT_TYPE).is_none());
    assert_eq!(
        envelope.headers.get(AUTHORIZATION),
        Some(&HeaderValue::from_static("Bearer token"))
    );
}

#[tokio::test]
async fn context_overrides_endpoint_and_headers() {
    let fetch = CaptureFetch::default();
    let link = UploadLink::build(endpoint())
        .header(AUTHORIZATION, HeaderValue::from_static("Bearer default"))
        .with_fetch(fetch.clone())
        .finish();

    let context = RequestContext::new()
        .with_uri("https://other.example.com/graphql".parse().unwrap())
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer override"));
    let request = GraphQLRequest::new("{ a }");
    link.execute_with(&request, context, CancellationToken::new())
        .next()
        .await
        .unwrap()
        .unwrap();

    let envelope = fetch.seen.lock().unwrap().take().unwrap();
    assert_eq!(envelope.uri.as_str(), "https://other.example.com/graphql");
    assert_eq!(
        envelope.headers.get(AUTHORIZATION),
        Some(&HeaderValue::from_static("Bearer override"))
    );
}
