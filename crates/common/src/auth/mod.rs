//! Admin key authentication
//!
//! Admin routes carry `Authorization: Bearer <key>`. Only the sha-256 hex
//! digest of the key is configured, never the key itself.

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};

/// Authenticated admin caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    /// First 12 hex chars of the key hash, safe to log and store
    pub fingerprint: String,
}

impl AdminContext {
    /// Identity recorded as `uploaded_by` on documents
    pub fn uploader(&self) -> String {
        format!("admin:{}", self.fingerprint)
    }
}

/// Hash an API key for storage
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate an API key against a stored hash
pub fn validate_api_key(api_key: &str, stored_hash: &str) -> bool {
    let computed = hash_api_key(api_key);
    let stored = stored_hash.trim().to_ascii_lowercase();
    // length is public, so only the byte comparison needs to be constant time
    computed.len() == stored.len()
        && computed
            .bytes()
            .zip(stored.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Extract API key from Authorization header
pub fn extract_api_key(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Check the request headers against the configured admin key hash
pub fn authorize_admin(headers: &HeaderMap, config: &AuthConfig) -> Result<AdminContext> {
    let stored_hash = config.admin_key_hash.as_deref().ok_or_else(|| AppError::Unauthorized {
        message: "Admin access is not configured".to_string(),
    })?;

    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;

    let key = extract_api_key(auth_header).ok_or(AppError::InvalidApiKey)?;
    if !validate_api_key(key, stored_hash) {
        return Err(AppError::InvalidApiKey);
    }

    let hash = hash_api_key(key);
    Ok(AdminContext {
        fingerprint: hash[..12].to_string(),
    })
}
