//! Token decoding: QR payload → signed token claims → invoice metadata.
//!
//! Each QR code on an invoice carries a compact HS256 JWT. Its claim set has a
//! `data` field whose value is itself a JSON document encoded as a string:
//!
//! ```text
//! eyJhbGciOiJIUzI1NiJ9.eyJkYXRhIjoie1wiRG9jTm9cIjpcIklOVi8xXCJ9In0.<sig>
//!                      └─ {"data":"{\"DocNo\":\"INV/1\",\"DocDt\":\"02/01/2024\"}"}
//! ```
//!
//! Only `DocNo` and `DocDt` are read from that inner document; either one
//! falls back to [`MISSING_FIELD`] when absent.
//!
//! Signature checking is governed by [`TokenVerification`] and is off by
//! default.

use crate::config::TokenVerification;
use crate::error::TokenError;
use crate::output::{InvoiceMetadata, MISSING_FIELD};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::debug;

/// Claim holding the JSON-encoded invoice document.
pub const DATA_CLAIM: &str = "data";
/// Invoice number key inside the `data` document.
pub const DOC_NO_KEY: &str = "DocNo";
/// Invoice date key inside the `data` document.
pub const DOC_DATE_KEY: &str = "DocDt";

/// Parses a compact signed token into its claim set.
pub trait TokenParser {
    fn claims(&self, token: &str) -> Result<Map<String, Value>, TokenError>;
}

/// [`TokenParser`] for HS256 JWTs, backed by `jsonwebtoken`.
#[derive(Debug, Clone, Default)]
pub struct JwtParser {
    verification: TokenVerification,
}

impl JwtParser {
    pub fn new(verification: TokenVerification) -> Self {
        Self { verification }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Invoice tokens carry no registered claims; don't demand any.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        if self.verification == TokenVerification::Disabled {
            validation.insecure_disable_signature_validation();
            validation.validate_exp = false;
        }
        validation
    }
}

impl TokenParser for JwtParser {
    fn claims(&self, token: &str) -> Result<Map<String, Value>, TokenError> {
        let key = match &self.verification {
            TokenVerification::Disabled => DecodingKey::from_secret(&[]),
            TokenVerification::Hs256 { secret } => DecodingKey::from_secret(secret.as_bytes()),
        };

        jsonwebtoken::decode::<Map<String, Value>>(token, &key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureRejected(e.to_string()),
                _ => TokenError::InvalidToken(e.to_string()),
            })
    }
}

/// Decode one raw QR payload into invoice metadata.
///
/// Surrounding whitespace (a trailing newline is common on QR payloads) is
/// ignored before the token is parsed.
pub fn decode_payload(
    parser: &dyn TokenParser,
    payload: &[u8],
) -> Result<InvoiceMetadata, TokenError> {
    let text = std::str::from_utf8(payload).map_err(|e| TokenError::NotUtf8(e.to_string()))?;
    let claims = parser.claims(text.trim())?;
    let metadata = metadata_from_claims(&claims)?;
    debug!(
        "Token carries DocNo={:?} DocDt={:?}",
        metadata.document_number, metadata.document_date
    );
    Ok(metadata)
}

/// Read `DocNo`/`DocDt` out of the JSON string held in the `data` claim.
pub fn metadata_from_claims(claims: &Map<String, Value>) -> Result<InvoiceMetadata, TokenError> {
    let data = claims.get(DATA_CLAIM).ok_or(TokenError::MissingData)?;
    let Value::String(text) = data else {
        return Err(TokenError::DataNotString(json_kind(data).to_string()));
    };

    let document: Value =
        serde_json::from_str(text).map_err(|e| TokenError::InvalidJson(e.to_string()))?;
    let Value::Object(fields) = document else {
        return Err(TokenError::DataNotObject(json_kind(&document).to_string()));
    };

    Ok(InvoiceMetadata {
        document_number: string_field(&fields, DOC_NO_KEY)?,
        document_date: string_field(&fields, DOC_DATE_KEY)?,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Result<String, TokenError> {
    match fields.get(key) {
        None => Ok(MISSING_FIELD.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(TokenError::FieldNotString {
            field: key.to_string(),
            kind: json_kind(other).to_string(),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    fn mint(claims: &Value, secret: &[u8]) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn invoice_token(data: &str) -> String {
        mint(&json!({ "data": data }), b"issuer-secret")
    }

    #[test]
    fn reads_both_fields() {
        let token = invoice_token(r#"{"DocNo":"INV/2024:01","DocDt":"2024-01-02","Total":12.5}"#);
        let m = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap();
        assert_eq!(m.document_number, "INV/2024:01");
        assert_eq!(m.document_date, "2024-01-02");
    }

    #[test]
    fn missing_fields_default_independently() {
        let token = invoice_token(r#"{"DocDt":"2024-01-02"}"#);
        let m = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap();
        assert_eq!(m.document_number, "N/A");
        assert_eq!(m.document_date, "2024-01-02");

        let token = invoice_token("{}");
        let m = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap();
        assert_eq!(m, InvoiceMetadata::default());
    }

    #[test]
    fn signature_is_ignored_by_default() {
        let token = invoice_token(r#"{"DocNo":"A1"}"#);
        let (head, _sig) = token.rsplit_once('.').unwrap();
        let forged = format!("{head}.AAAA");
        let m = decode_payload(&JwtParser::default(), forged.as_bytes()).unwrap();
        assert_eq!(m.document_number, "A1");
    }

    #[test]
    fn expired_token_still_reads_when_unverified() {
        let token = mint(&json!({ "data": r#"{"DocNo":"OLD"}"#, "exp": 1 }), b"k");
        let m = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap();
        assert_eq!(m.document_number, "OLD");
    }

    #[test]
    fn verification_accepts_matching_secret() {
        let parser = JwtParser::new(TokenVerification::Hs256 {
            secret: "issuer-secret".into(),
        });
        let token = invoice_token(r#"{"DocNo":"A1","DocDt":"D1"}"#);
        assert!(decode_payload(&parser, token.as_bytes()).is_ok());
    }

    #[test]
    fn verification_rejects_wrong_secret() {
        let parser = JwtParser::new(TokenVerification::Hs256 {
            secret: "someone-else".into(),
        });
        let token = invoice_token(r#"{"DocNo":"A1"}"#);
        let err = decode_payload(&parser, token.as_bytes()).unwrap_err();
        assert!(matches!(err, TokenError::SignatureRejected(_)), "got: {err:?}");
    }

    #[test]
    fn garbage_is_invalid_token() {
        let err = decode_payload(&JwtParser::default(), b"https://example.com/not-a-token")
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidToken(_)), "got: {err:?}");
        assert!(err.is_format_error());
    }

    #[test]
    fn non_utf8_payload() {
        let err = decode_payload(&JwtParser::default(), &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, TokenError::NotUtf8(_)), "got: {err:?}");
    }

    #[test]
    fn malformed_embedded_json() {
        let token = invoice_token("{DocNo: INV1");
        let err = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap_err();
        assert!(matches!(err, TokenError::InvalidJson(_)), "got: {err:?}");
        assert!(err.is_format_error());
    }

    #[test]
    fn missing_data_claim() {
        let token = mint(&json!({ "sub": "x" }), b"k");
        let err = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap_err();
        assert_eq!(err, TokenError::MissingData);
    }

    #[test]
    fn data_claim_must_be_a_string() {
        let token = mint(&json!({ "data": { "DocNo": "A1" } }), b"k");
        let err = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap_err();
        assert_eq!(err, TokenError::DataNotString("an object".into()));
    }

    #[test]
    fn embedded_json_must_be_an_object() {
        let token = invoice_token("[1, 2, 3]");
        let err = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap_err();
        assert_eq!(err, TokenError::DataNotObject("an array".into()));
    }

    #[test]
    fn non_string_field_is_rejected() {
        let token = invoice_token(r#"{"DocNo":12345,"DocDt":"2024-01-02"}"#);
        let err = decode_payload(&JwtParser::default(), token.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            TokenError::FieldNotString {
                field: "DocNo".into(),
                kind: "a number".into()
            }
        );
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let token = format!("{}\n", invoice_token(r#"{"DocNo":"A1"}"#));
        assert!(decode_payload(&JwtParser::default(), token.as_bytes()).is_ok());
    }
}
