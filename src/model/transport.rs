//! URL transport form of a secret ID.
//!
//! The wrapping is plain unpadded base64url. It keeps a raw ID from being read
//! at a glance in a link and nothing more; it is not a security boundary.

use data_encoding::BASE64URL_NOPAD;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Token is not valid base64url")]
    Encoding(#[from] data_encoding::DecodeError),
    #[error("Token does not decode to UTF-8")]
    Utf8,
}

/// Wrap a secret ID for embedding in a `?token=` query parameter.
pub fn obfuscate(secret_id: &str) -> String {
    BASE64URL_NOPAD.encode(secret_id.as_bytes())
}

/// Recover the secret ID from its transport form.
pub fn reveal(token: &str) -> Result<String, TransportError> {
    let bytes = BASE64URL_NOPAD.decode(token.trim().as_bytes())?;
    String::from_utf8(bytes).map_err(|_| TransportError::Utf8)
}
