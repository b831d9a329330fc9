//! Response body of the HTTP recognition endpoint.
//!
//! The service answers with a small flat object:
//!
//! ```text
//! {"status": true, "plate": "29A12345"}
//! ```
//!
//! `status` is required and must be a boolean literal. `plate` is optional.
//! Whitespace and field order are free, unknown fields are skipped. Anything
//! else is an error, which the caller turns into a deny.
//!
//! # Examples
//!
//! ```
//! use gatekeeper_protocol::parse_payload;
//!
//! let result = parse_payload(r#"{ "plate": "29A12345", "status": true }"#).unwrap();
//! assert!(result.granted);
//! assert_eq!(result.plate(), Some("29A12345"));
//!
//! assert!(parse_payload(r#"{"status": tru"#).is_err());
//! ```

use gatekeeper_core::VerificationResult;
use gatekeeper_core::constants::MAX_PAYLOAD_LENGTH;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{PayloadError, Result};

/// Wire shape. Fields stay loosely typed so a bad `status` and a missing one
/// can be told apart; serde rejects duplicates.
#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    plate: Option<Value>,
}

/// Parse a recognition response body.
///
/// # Errors
///
/// Returns [`PayloadError`] when the body exceeds [`MAX_PAYLOAD_LENGTH`], is
/// not a well-formed object, repeats a field, lacks `status`, or carries a
/// non-boolean `status`.
pub fn parse_payload(body: impl AsRef<[u8]>) -> Result<VerificationResult> {
    let body = body.as_ref();
    if body.len() > MAX_PAYLOAD_LENGTH {
        return Err(PayloadError::TooLong {
            len: body.len(),
            max: MAX_PAYLOAD_LENGTH,
        });
    }

    let Body { status, plate } = serde_json::from_slice(body)?;

    let granted = match status {
        Some(Value::Bool(granted)) => granted,
        None => return Err(PayloadError::MissingStatus),
        Some(_) => return Err(PayloadError::InvalidStatus),
    };

    let plate = match plate {
        Some(Value::String(plate)) => Some(plate),
        None => None,
        Some(other) => {
            warn!(plate = %other, "ignoring non-string plate field");
            None
        }
    };

    Ok(VerificationResult { granted, plate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"status": true, "plate": "29A12345"}"#, true, Some("29A12345"))]
    #[case(r#"{"status":false,"plate":"51F00001"}"#, false, Some("51F00001"))]
    #[case(r#"{"plate": "29A12345", "status": true}"#, true, Some("29A12345"))]
    #[case("\n\t{ \"status\" :\r\n true }  \n", true, None)]
    #[case(r#"{"status": true, "plate": ""}"#, true, None)]
    #[case(r#"{"status": false, "plate": null}"#, false, None)]
    fn test_accepts_well_formed(
        #[case] body: &str,
        #[case] granted: bool,
        #[case] plate: Option<&str>,
    ) {
        let result = parse_payload(body).unwrap();
        assert_eq!(result.granted, granted);
        assert_eq!(result.plate(), plate);
    }

    #[rstest]
    #[case::truncated_literal(r#"{"status": tru"#)]
    #[case::truncated_object(r#"{"status": true"#)]
    #[case::quoted_status(r#"{"status": "true"}"#)]
    #[case::numeric_status(r#"{"status": 1}"#)]
    #[case::null_status(r#"{"status": null}"#)]
    #[case::capitalized(r#"{"status": True}"#)]
    #[case::literal_suffix(r#"{"status": trueish}"#)]
    #[case::missing_status(r#"{"plate": "29A12345"}"#)]
    #[case::empty_object("{}")]
    #[case::empty_body("")]
    #[case::not_an_object("true")]
    #[case::trailing_garbage(r#"{"status": true} x"#)]
    #[case::missing_colon(r#"{"status" true}"#)]
    #[case::trailing_comma(r#"{"status": true,}"#)]
    #[case::duplicate_status(r#"{"status": false, "status": true}"#)]
    #[case::unterminated_plate(r#"{"status": true, "plate": "29A"#)]
    fn test_rejects_malformed(#[case] body: &str) {
        assert!(parse_payload(body).is_err(), "accepted {body:?}");
    }

    #[test]
    fn test_missing_status_error_kind() {
        assert!(matches!(
            parse_payload(r#"{"plate": "X"}"#),
            Err(PayloadError::MissingStatus)
        ));
        assert!(matches!(
            parse_payload(r#"{"status": "yes"}"#),
            Err(PayloadError::InvalidStatus)
        ));
        assert!(matches!(
            parse_payload(r#"{"status": false, "status": true}"#),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_skips_unknown_fields() {
        let body = r#"{
            "confidence": 0.97,
            "boxes": [[1, 2, 3, 4], {"x": -1.5e3}],
            "camera": {"id": "gate-1", "ok": true, "meta": null},
            "status": true,
            "plate": "29A12345"
        }"#;
        let result = parse_payload(body).unwrap();
        assert!(result.granted);
        assert_eq!(result.plate(), Some("29A12345"));
    }

    #[test]
    fn test_non_string_plate_is_ignored() {
        let result = parse_payload(r#"{"status": true, "plate": 12345}"#).unwrap();
        assert!(result.granted);
        assert_eq!(result.plate, None);
    }

    #[test]
    fn test_escaped_plate() {
        let result = parse_payload(r#"{"status": false, "plate": "A\"B\\C"}"#).unwrap();
        assert_eq!(result.plate(), Some(r#"A"B\C"#));

        let result = parse_payload(r#"{"status": true, "plate": "29A\u00b712"}"#).unwrap();
        assert_eq!(result.plate(), Some("29A\u{b7}12"));

        assert!(matches!(
            parse_payload(r#"{"status": false, "plate": "A\q"}"#),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_deep_nesting() {
        let nested = |field: &str, depth: usize| {
            format!(
                r#"{{"status": true, "{field}": {}{}}}"#,
                "[".repeat(depth),
                "]".repeat(depth)
            )
        };

        // Unknown fields are skipped without building a value.
        let body = nested("boxes", 200);
        assert!(body.len() <= MAX_PAYLOAD_LENGTH);
        assert!(parse_payload(&body).is_ok());

        // A plate is materialized, so the recursion limit applies.
        assert!(matches!(
            parse_payload(nested("plate", 200)),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_accepts_bytes() {
        let result = parse_payload(br#"{"status": true}"#.to_vec()).unwrap();
        assert!(result.granted);
    }

    #[test]
    fn test_length_limit() {
        let padding = " ".repeat(MAX_PAYLOAD_LENGTH);
        let body = format!(r#"{{"status": true}}{padding}"#);
        assert!(matches!(
            parse_payload(&body),
            Err(PayloadError::TooLong { .. })
        ));
    }

    const GRANT_BODY: &str = r#"{"status": true, "plate": "29A12345"}"#;

    proptest! {
        #[test]
        fn prop_never_panics(body in "\\PC{0,64}") {
            let _ = parse_payload(&body);
        }

        #[test]
        fn prop_truncated_grant_is_rejected(cut in 0usize..GRANT_BODY.len()) {
            prop_assert!(parse_payload(&GRANT_BODY[..cut]).is_err());
        }
    }
}
