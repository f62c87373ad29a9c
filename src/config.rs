//! Data-service configuration.
//!
//! The hosted store is addressed by a base URL plus an anon key. Both can be
//! supplied directly, read from the environment, or decoded from a base64
//! connection string (`{"url": ..., "key": ...}`) as issued by the admin
//! tooling.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming the store URL.
pub const ENV_SERVICE_URL: &str = "RESTO_SUPABASE_URL";
/// Environment variable naming the anon key.
pub const ENV_SERVICE_KEY: &str = "RESTO_SUPABASE_ANON_KEY";

/// Bounded timeout for data-service requests. Expiry counts as a fetch
/// failure; the report never waits indefinitely.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Normalised base URL, without a trailing `/rest/v1`.
    pub url: String,
    pub anon_key: String,
}

impl StoreConfig {
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = normalize_service_url(url);
        if url.is_empty() {
            return Err(Error::Config("missing service URL".into()));
        }
        let anon_key = anon_key.trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config("missing anon key".into()));
        }
        Ok(Self { url, anon_key })
    }

    /// Read `RESTO_SUPABASE_URL` / `RESTO_SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_SERVICE_URL)
            .map_err(|_| Error::Config(format!("{ENV_SERVICE_URL} is not set")))?;
        let key = std::env::var(ENV_SERVICE_KEY)
            .map_err(|_| Error::Config(format!("{ENV_SERVICE_KEY} is not set")))?;
        Self::new(&url, &key)
    }

    /// Decode a connection string: either a raw JSON object or base64 of one,
    /// carrying `url` and `key` fields.
    pub fn from_connection_string(raw: &str) -> Result<Self> {
        let payload = decode_connection_payload(raw)
            .ok_or_else(|| Error::Config("unreadable connection string".into()))?;
        let url = payload
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Config("connection string has no url".into()))?;
        let key = payload
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Config("connection string has no key".into()))?;
        Self::new(url, key)
    }
}

/// Normalise the service URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/rest/v1` segment (the client appends it per request)
pub fn normalize_service_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    if url.ends_with("/rest/v1") {
        url.truncate(url.len() - "/rest/v1".len());
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

fn decode_connection_payload(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<Value>(trimmed).ok();
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('{') {
        return serde_json::from_str::<Value>(&compact).ok();
    }
    if compact.len() < 20 {
        return None;
    }

    // Accept both standard and URL-safe alphabets, with or without padding.
    let base64 = compact.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        base64,
        "=".repeat((4usize.wrapping_sub(base64.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()
}

// ===========================================================================
// Tests
// ===========================================================================
