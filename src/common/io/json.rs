use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Deserialize a JSON document from bytes.
pub(crate) fn read_json_bytes<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(bytes)
        .with_context(|| format!("[io::json] Failed to parse {what} as JSON"))
}
