//! Body interpretation: JSON first, then form data, then plain text.
//!
//! Each attempt returns `None` when the body does not fit its shape, so the
//! first attempt that yields a value decides the payload. Only the final
//! text decoding can fail.

use crate::error::ListenerError;
use crate::types::Payload;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{self, header::CONTENT_TYPE, Extensions, Method},
};
use std::collections::BTreeMap;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";

/// Run the extraction chain over a fully buffered body.
///
/// `extensions` are the incoming request's extensions; they carry the body
/// limit configured on the router so multipart parsing honours it too.
pub async fn extract(
    body: &Bytes,
    content_type: Option<&str>,
    extensions: &Extensions,
) -> Result<Payload, ListenerError> {
    if let Some(payload) = parse_json(body) {
        return Ok(payload);
    }
    if let Some(payload) = parse_form(body, content_type, extensions).await {
        return Ok(payload);
    }
    parse_text(body)
}

fn parse_json(body: &Bytes) -> Option<Payload> {
    serde_json::from_slice(body).ok().map(Payload::Json)
}

async fn parse_form(
    body: &Bytes,
    content_type: Option<&str>,
    extensions: &Extensions,
) -> Option<Payload> {
    let content_type = content_type?;
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        FORM_URLENCODED => parse_urlencoded(body),
        MULTIPART_FORM => parse_multipart(body, content_type, extensions).await,
        _ => None,
    }
}

fn parse_urlencoded(body: &Bytes) -> Option<Payload> {
    // Percent-decoding would silently paper over a binary body.
    std::str::from_utf8(body).ok()?;

    let mut fields = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        fields.insert(key.into_owned(), value.into_owned());
    }
    Some(Payload::Form(fields))
}

async fn parse_multipart(
    body: &Bytes,
    content_type: &str,
    extensions: &Extensions,
) -> Option<Payload> {
    let mut request: Request = http::Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body.clone()))
        .ok()?;
    *request.extensions_mut() = extensions.clone();

    let mut multipart = Multipart::from_request(request, &()).await.ok()?;
    let mut fields = BTreeMap::new();
    while let Some(field) = multipart.next_field().await.ok()? {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.ok()?;
        fields.insert(name, String::from_utf8_lossy(&data).into_owned());
    }
    Some(Payload::Form(fields))
}

fn parse_text(body: &Bytes) -> Result<Payload, ListenerError> {
    std::str::from_utf8(body)
        .map(|text| Payload::Text(text.to_string()))
        .map_err(ListenerError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(body: &'static [u8], content_type: Option<&str>) -> Result<Payload, ListenerError> {
        extract(&Bytes::from_static(body), content_type, &Extensions::new()).await
    }

    fn form(pairs: &[(&str, &str)]) -> Payload {
        Payload::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn json_object_is_kept_unchanged() {
        let payload = run(br#"{"a":1,"nested":{"b":[true,null]}}"#, None).await.unwrap();
        assert_eq!(payload, Payload::Json(json!({"a": 1, "nested": {"b": [true, null]}})));
    }

    #[tokio::test]
    async fn json_array_counts_as_structured() {
        let payload = run(b"[1,2]", Some("text/plain")).await.unwrap();
        assert_eq!(payload, Payload::Json(json!([1, 2])));
    }

    #[tokio::test]
    async fn json_wins_over_form_content_type() {
        let payload = run(br#"{"a":1}"#, Some(FORM_URLENCODED)).await.unwrap();
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
    }

    #[tokio::test]
    async fn urlencoded_body_becomes_flat_mapping() {
        let payload = run(b"a=1&b=2&name=hello+world%21", Some(FORM_URLENCODED))
            .await
            .unwrap();
        assert_eq!(payload, form(&[("a", "1"), ("b", "2"), ("name", "hello world!")]));
    }

    #[tokio::test]
    async fn urlencoded_content_type_parameters_are_ignored() {
        let payload = run(b"a=1", Some("application/x-www-form-urlencoded; charset=utf-8"))
            .await
            .unwrap();
        assert_eq!(payload, form(&[("a", "1")]));
    }

    #[tokio::test]
    async fn form_body_without_form_content_type_is_text() {
        let payload = run(b"a=1&b=2", None).await.unwrap();
        assert_eq!(payload, Payload::Text("a=1&b=2".into()));
    }

    #[tokio::test]
    async fn multipart_body_becomes_flat_mapping() {
        let body = b"--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"a\"\r\n\r\n\
1\r\n\
--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"upload\"; filename=\"note.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
file contents\r\n\
--XBOUNDARY--\r\n";
        let payload = run(body, Some("multipart/form-data; boundary=XBOUNDARY"))
            .await
            .unwrap();
        assert_eq!(payload, form(&[("a", "1"), ("upload", "file contents")]));
    }

    #[tokio::test]
    async fn json_key_order_and_big_integers_survive() {
        let input = r#"{"zeta":1,"alpha":123456789012345678901234567890,"mid":{"b":2,"a":1}}"#;
        let payload = run(input.as_bytes(), None).await.unwrap();
        assert_eq!(payload.raw(), input);
        assert_eq!(
            payload.pretty(),
            "{\n  \"zeta\": 1,\n  \"alpha\": 123456789012345678901234567890,\n  \"mid\": {\n    \"b\": 2,\n    \"a\": 1\n  }\n}"
        );
    }

    #[tokio::test]
    async fn repeated_urlencoded_key_keeps_last_value() {
        let payload = run(b"a=1&b=x&a=2", Some(FORM_URLENCODED)).await.unwrap();
        assert_eq!(payload, form(&[("a", "2"), ("b", "x")]));
        assert_eq!(payload.raw(), r#"{"a":"2","b":"x"}"#);
    }

    #[tokio::test]
    async fn repeated_multipart_field_keeps_last_value() {
        let body = b"--XB\r\n\
Content-Disposition: form-data; name=\"tag\"\r\n\r\n\
first\r\n\
--XB\r\n\
Content-Disposition: form-data; name=\"tag\"\r\n\r\n\
second\r\n\
--XB--\r\n";
        let payload = run(body, Some("multipart/form-data; boundary=XB"))
            .await
            .unwrap();
        assert_eq!(payload, form(&[("tag", "second")]));
    }

    #[tokio::test]
    async fn broken_multipart_falls_back_to_text() {
        let payload = run(b"not multipart at all", Some("multipart/form-data; boundary=XB"))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text("not multipart at all".into()));
    }

    #[tokio::test]
    async fn plain_text_is_decoded_exactly() {
        let payload = run("héllo, wörld".as_bytes(), Some("text/plain")).await.unwrap();
        assert_eq!(payload, Payload::Text("héllo, wörld".into()));
    }

    #[tokio::test]
    async fn empty_body_is_empty_text() {
        let payload = run(b"", None).await.unwrap();
        assert_eq!(payload, Payload::Text(String::new()));
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_error() {
        let err = run(&[0xff, 0xfe, 0x00], Some("application/octet-stream"))
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::InvalidEncoding(_)));
    }
}
