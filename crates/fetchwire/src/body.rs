//! Request body encoding.
//!
//! The controller encodes the merged payload in one of two modes. Structured
//! mode carries the payload as a JSON body. Multipart mode walks the payload
//! object and builds a `multipart/form-data` body in which sequence fields
//! may mix file attachments (elements carrying a `uri`) with structured
//! sub-objects (serialized to JSON text parts).

use std::collections::HashMap;

use serde_json::Value;

use crate::descriptor::HttpMethod;
use crate::error::{FetchError, Result};

/// How the outgoing payload is encoded on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncodingMode {
    /// JSON body with `application/json` headers.
    #[default]
    Structured,
    /// `multipart/form-data` body built from the payload's fields.
    Multipart,
}

/// An encoded request body ready to hand to the transport.
#[derive(Debug, Default)]
pub enum EncodedBody {
    /// No body (GET and DELETE requests).
    #[default]
    None,
    /// A JSON value.
    Json(Value),
    /// A multipart form.
    Multipart(reqwest::multipart::Form),
}

/// Default headers for the given encoding mode, used when the descriptor
/// supplies no custom headers.
///
/// Multipart requests carry no default `Content-Type`: reqwest must own it
/// to include the form boundary.
pub(crate) fn default_headers(mode: EncodingMode) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    if mode == EncodingMode::Structured {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    headers
}

/// Encode the merged payload for the given method and mode.
///
/// Bodiless methods (GET, DELETE) always produce [`EncodedBody::None`]. A
/// missing payload encodes as the empty object.
pub(crate) async fn encode_body(
    mode: EncodingMode,
    method: HttpMethod,
    payload: Option<&Value>,
) -> Result<EncodedBody> {
    if !method.has_body() {
        return Ok(EncodedBody::None);
    }

    let payload = payload.cloned().unwrap_or_else(|| Value::Object(Default::default()));
    match mode {
        EncodingMode::Structured => Ok(EncodedBody::Json(payload)),
        EncodingMode::Multipart => Ok(EncodedBody::Multipart(build_form(payload).await?)),
    }
}

async fn build_form(payload: Value) -> Result<reqwest::multipart::Form> {
    let Value::Object(fields) = payload else {
        return Err(FetchError::Json(
            "multipart payload must be an object".to_string(),
        ));
    };

    let mut form = reqwest::multipart::Form::new();
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                for item in items {
                    let part = if item.get("uri").and_then(Value::as_str).is_some() {
                        file_part(&item).await?
                    } else {
                        reqwest::multipart::Part::text(serde_json::to_string(&item)?)
                    };
                    form = form.part(key.clone(), part);
                }
            }
            other => {
                form = form.text(key, scalar_text(&other)?);
            }
        }
    }
    Ok(form)
}

/// Build a file part from an element carrying a `uri` field.
///
/// Bytes are read from the uri's path (a `file://` prefix is stripped); the
/// part name falls back to `"file"` and the MIME type to
/// `application/octet-stream`.
async fn file_part(item: &Value) -> Result<reqwest::multipart::Part> {
    let uri = item
        .get("uri")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("file")
        .to_string();
    let mime = item
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("application/octet-stream");

    let bytes = tokio::fs::read(path).await?;
    let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(name.clone());
    let part = match part.mime_str(mime) {
        Ok(part) => part,
        Err(err) => {
            tracing::warn!(target: "fetchwire::body", "invalid MIME type '{}': {}", mime, err);
            // mime_str consumed the part; rebuild it with the fallback type.
            reqwest::multipart::Part::bytes(bytes)
                .file_name(name)
                .mime_str("application/octet-stream")?
        }
    };
    Ok(part)
}

/// Render a non-sequence field value as form text: strings verbatim, other
/// scalars and objects via their JSON rendering.
fn scalar_text(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bodiless_methods_skip_encoding() {
        let payload = json!({"a": 1});
        let body = encode_body(EncodingMode::Structured, HttpMethod::Get, Some(&payload))
            .await
            .unwrap();
        assert!(matches!(body, EncodedBody::None));

        let body = encode_body(EncodingMode::Multipart, HttpMethod::Delete, Some(&payload))
            .await
            .unwrap();
        assert!(matches!(body, EncodedBody::None));
    }

    #[tokio::test]
    async fn test_structured_defaults_to_empty_object() {
        let body = encode_body(EncodingMode::Structured, HttpMethod::Post, None)
            .await
            .unwrap();
        match body {
            EncodedBody::Json(v) => assert_eq!(v, json!({})),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_multipart_rejects_non_object_payload() {
        let payload = json!([1, 2, 3]);
        let err = encode_body(EncodingMode::Multipart, HttpMethod::Post, Some(&payload))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Json(_)));
    }

    #[tokio::test]
    async fn test_multipart_missing_file_is_io_error() {
        let payload = json!({"docs": [{"uri": "/nonexistent/fetchwire-test-file"}]});
        let err = encode_body(EncodingMode::Multipart, HttpMethod::Post, Some(&payload))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[test]
    fn test_default_headers_by_mode() {
        let structured = default_headers(EncodingMode::Structured);
        assert_eq!(structured.get("Accept").map(String::as_str), Some("application/json"));
        assert_eq!(
            structured.get("Content-Type").map(String::as_str),
            Some("application/json")
        );

        let multipart = default_headers(EncodingMode::Multipart);
        assert_eq!(multipart.get("Accept").map(String::as_str), Some("application/json"));
        // reqwest owns the boundary-bearing Content-Type.
        assert!(!multipart.contains_key("Content-Type"));
    }

    #[test]
    fn test_scalar_text_rendering() {
        assert_eq!(scalar_text(&json!("x")).unwrap(), "x");
        assert_eq!(scalar_text(&json!(3)).unwrap(), "3");
        assert_eq!(scalar_text(&json!(true)).unwrap(), "true");
        assert_eq!(scalar_text(&json!({"k": 1})).unwrap(), r#"{"k":1}"#);
    }
}
