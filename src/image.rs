//! Image reference resolution for product metadata.
//!
//! `product_image` is absent, empty, a JSON-encoded envelope such as
//! `{"url":"https://..."}`, or occasionally a bare string. Resolution:
//!
//! 1. Field absent (or `null`): `""`.
//! 2. Empty string: `""`.
//! 3. Starts with `{`: decode as JSON and return its `url`. A decode failure,
//!    or a decoded value without a string `url`, is
//!    [`ContentError::MalformedImageRef`].
//! 4. Any other string: returned as-is, treated as a direct URL.
//!
//! Non-string values are tolerated: an already-decoded object with a string
//! `url` yields that URL, anything else yields `""`.

use serde_json::Value;

use crate::error::{ContentError, Result};
use crate::product::RawProductMetadata;

const ENVELOPE_START: char = '{';

/// Resolve the image URL for one product.
///
/// `Ok("")` means no image is available.
pub fn resolve(metadata: &RawProductMetadata) -> Result<String> {
    match metadata.product_image.as_ref() {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(raw)) => resolve_str(raw),
        Some(Value::Object(map)) => Ok(map
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()),
        Some(_) => Ok(String::new()),
    }
}

fn resolve_str(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    if !raw.starts_with(ENVELOPE_START) {
        // TODO: confirm with the catalog owners whether bare URLs are ever sent.
        return Ok(raw.to_string());
    }

    let decoded: Value = serde_json::from_str(raw).map_err(|e| ContentError::MalformedImageRef {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;

    decoded
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ContentError::MalformedImageRef {
            raw: raw.to_string(),
            reason: "missing string `url` field".to_string(),
        })
}

/// Whether `candidate` parses as an absolute URL.
pub(crate) fn is_absolute_url(candidate: &str) -> bool {
    url::Url::parse(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(image: Option<Value>) -> RawProductMetadata {
        RawProductMetadata {
            product_image: image,
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_field() {
        assert_eq!(resolve(&meta(None)).unwrap(), "");
        assert_eq!(resolve(&meta(Some(Value::Null))).unwrap(), "");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(resolve(&meta(Some(json!("")))).unwrap(), "");
    }

    #[test]
    fn test_json_envelope() {
        let raw = r#"{"url":"https://media.thebodyshop.com/i/1039336?$product-zoom$&fmt=auto"}"#;
        assert_eq!(
            resolve(&meta(Some(json!(raw)))).unwrap(),
            "https://media.thebodyshop.com/i/1039336?$product-zoom$&fmt=auto"
        );
    }

    #[test]
    fn test_truncated_envelope_is_malformed() {
        let err = resolve(&meta(Some(json!("{\"url\": \"http")))).unwrap_err();
        match err {
            ContentError::MalformedImageRef { raw, .. } => assert_eq!(raw, "{\"url\": \"http"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_without_url_is_malformed() {
        let err = resolve(&meta(Some(json!(r#"{"href":"x"}"#)))).unwrap_err();
        assert_eq!(err.code(), "malformed_image_ref");
    }

    #[test]
    fn test_bare_string_is_returned() {
        assert_eq!(
            resolve(&meta(Some(json!("https://cdn.example.com/a.jpg")))).unwrap(),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_non_string_values() {
        assert_eq!(
            resolve(&meta(Some(json!({ "url": "http://x/y.png" })))).unwrap(),
            "http://x/y.png"
        );
        assert_eq!(resolve(&meta(Some(json!(12)))).unwrap(), "");
        assert_eq!(resolve(&meta(Some(json!(["a"])))).unwrap(), "");
    }

    #[test]
    fn test_absolute_url_check() {
        assert!(is_absolute_url("http://x/y.png"));
        assert!(!is_absolute_url("img/a.png"));
    }
}
