//! Request signing for the brokerage gateway

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const SIGNATURE_HEADER: &str = "X-SIGNATURE";
pub const TIMESTAMP_HEADER: &str = "X-TIMESTAMP";

/// Generate a hex HMAC-SHA256 signature for a request
///
/// # Arguments
/// * `secret` - Secret key (base64 encoded)
/// * `timestamp` - Unix timestamp in milliseconds
/// * `method` - HTTP method (GET, POST, etc.)
/// * `request_path` - API endpoint path
/// * `body` - Request body (empty string for GET requests)
pub fn sign_request(
    secret: &str,
    timestamp: i64,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String> {
    let secret_bytes = BASE64
        .decode(secret)
        .map_err(|e| ClientError::Authentication(format!("Failed to decode secret: {}", e)))?;

    // timestamp + method + path + body
    let message = format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body);

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|e| ClientError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Authentication headers for a signed request
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: i64,
}

/// Sign a request with the current time
pub fn generate_auth_headers(
    api_key: &str,
    secret: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<AuthHeaders> {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let signature = sign_request(secret, timestamp, method, request_path, body)?;

    Ok(AuthHeaders {
        api_key: api_key.to_string(),
        signature,
        timestamp,
    })
}

impl AuthHeaders {
    /// Add authentication headers to a reqwest RequestBuilder
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(SIGNATURE_HEADER, &self.signature)
            .header(TIMESTAMP_HEADER, self.timestamp.to_string())
    }
}
