//! Challenge-response check Twitter runs against a registered webhook URL.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{TwitterError, TwitterResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrcResponse {
    pub response_token: String,
}

/// `sha256=` followed by the base64 HMAC-SHA256 of `crc_token`, keyed with
/// the app's consumer secret.
pub fn create_crc_token(crc_token: &str, consumer_secret: &str) -> TwitterResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(consumer_secret.as_bytes())
        .map_err(|e| TwitterError::OAuth(e.to_string()))?;
    mac.update(crc_token.as_bytes());
    Ok(format!("sha256={}", BASE64.encode(mac.finalize().into_bytes())))
}

pub fn crc_response(crc_token: &str, consumer_secret: &str) -> TwitterResult<CrcResponse> {
    Ok(CrcResponse {
        response_token: create_crc_token(crc_token, consumer_secret)?,
    })
}
