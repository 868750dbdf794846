use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token must have three dot-separated segments, found {0}")]
    Segments(usize),
    #[error("token segment is not valid base64url: {0}")]
    Base64(String),
    #[error("token payload is not a valid claims object: {0}")]
    Claims(String),
    #[error("token is malformed: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::Base64(_) | ErrorKind::Utf8(_) => TokenError::Base64(err.to_string()),
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::Claims(err.to_string()),
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Identity decoded from the payload segment of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub admin: bool,
}

/// Signature and registered-claim checks are off: the backend verifies on every request and
/// expiry is judged against the injected clock.
fn unverified() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.insecure_disable_signature_validation();
    v.validate_exp = false;
    v.validate_nbf = false;
    v.validate_aud = false;
    v.required_spec_claims.clear();
    v
}

/// Decode claims without verifying the signature. The client only needs the identity and the
/// expiry.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 { return Err(TokenError::Segments(parts.len())); }
    // some issuers keep base64 padding; jsonwebtoken only reads the unpadded form
    let normalized = parts.iter().map(|p| p.trim_end_matches('=')).collect::<Vec<_>>().join(".");
    let data = jsonwebtoken::decode::<Claims>(&normalized, &DecodingKey::from_secret(&[]), &unverified())?;
    if data.claims.sub.is_empty() { return Err(TokenError::Claims("empty subject".into())); }
    Ok(data.claims)
}
