//! Integration tests for body encoding and header selection as they appear
//! on the wire.

use std::io::Write;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fetchwire::{EncodingMode, FetchController, FetchOverrides, HttpMethod, RequestDescriptor};

fn controller(
    base: String,
    http_method: HttpMethod,
    mode: EncodingMode,
    payload: Option<Value>,
) -> FetchController<Value, Value> {
    let mut builder = FetchController::<Value, Value>::builder(move |_query| {
        let base = base.clone();
        async move { Ok(RequestDescriptor::new(http_method, format!("{base}/sink"))) }
    })
    .mode(mode)
    .map_success(|body| async move { body })
    .map_error(|err| async move { err.into_value() });
    if let Some(payload) = payload {
        builder = builder.payload(payload);
    }
    builder.build().expect("failed to build controller")
}

#[tokio::test]
async fn test_multipart_form_carries_files_and_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"attachment bytes").expect("write temp file");
    let uri = format!("file://{}", file.path().display());

    let payload = json!({
        "docs": [
            {"uri": uri, "name": "a.txt", "type": "text/plain"},
            {"meta": 1}
        ],
        "plain": "x",
        "count": 2
    });

    controller(
        server.uri(),
        HttpMethod::Post,
        EncodingMode::Multipart,
        Some(payload),
    )
    .reinvoke(FetchOverrides::new())
    .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let content_type = requests[0]
        .headers
        .get("content-type")
        .expect("content-type header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "unexpected content type: {content_type}"
    );

    let body = String::from_utf8_lossy(&requests[0].body).to_lowercase();
    // The uri-bearing element becomes a file part under the field name.
    assert!(body.contains("name=\"docs\""));
    assert!(body.contains("filename=\"a.txt\""));
    assert!(body.contains("content-type: text/plain"));
    assert!(body.contains("attachment bytes"));
    // The plain array element is serialized JSON text.
    assert!(body.contains(r#"{"meta":1}"#));
    // Scalar fields: strings verbatim, other scalars rendered as JSON.
    assert!(body.contains("name=\"plain\""));
    assert!(body.contains("name=\"count\""));
    assert!(body.contains("\r\n\r\nx\r\n"));
    assert!(body.contains("\r\n\r\n2\r\n"));
}

#[tokio::test]
async fn test_get_never_sends_a_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    controller(
        server.uri(),
        HttpMethod::Get,
        EncodingMode::Structured,
        Some(json!({"ignored": true})),
    )
    .reinvoke(FetchOverrides::new())
    .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_structured_defaults_to_empty_json_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    controller(server.uri(), HttpMethod::Post, EncodingMode::Structured, None)
        .reinvoke(FetchOverrides::new())
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"{}");
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_custom_headers_replace_mode_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let uri = server.uri();
    let c = FetchController::<Value, Value>::builder(move |_query| {
        let uri = uri.clone();
        async move {
            Ok(RequestDescriptor::new(HttpMethod::Post, format!("{uri}/sink"))
                .header("X-Custom", "1"))
        }
    })
    .map_success(|body| async move { body })
    .map_error(|err| async move { err.into_value() })
    .build()
    .expect("failed to build controller");

    c.reinvoke(FetchOverrides::new()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].headers.get("x-custom").unwrap(), "1");
    // Wholesale replacement: the default Accept header is gone.
    assert!(requests[0].headers.get("accept").is_none());
}

#[tokio::test]
async fn test_missing_multipart_file_settles_as_error() {
    let c = FetchController::<Value, Value>::builder(|_query| async move {
        Ok(RequestDescriptor::new(
            HttpMethod::Post,
            "http://127.0.0.1:1/unreachable",
        ))
    })
    .mode(EncodingMode::Multipart)
    .payload(json!({"docs": [{"uri": "file:///no/such/file", "name": "a"}]}))
    .map_success(|body| async move { body })
    .map_error(|err| async move { err.into_value() })
    .build()
    .expect("failed to build controller");

    c.reinvoke(FetchOverrides::new()).await;

    // Encoding fails before any request is made; the error cell carries the
    // rendered transport-side failure.
    assert!(c.error().get().is_some());
    assert_eq!(c.data().get(), None);
    assert!(!c.loading().get());
}
