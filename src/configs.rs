//! Configuration file loading.
//!
//! The configuration is a JSON document with one object per group:
//!
//! ```json
//! {
//!   "servers": {
//!     "ssl_defaults":  { "bits": 4096, "days": 730, "user_dir": "pki/servers" },
//!     "name_defaults": { "country": "US", "organization_name": "Example" },
//!     "ca":    { "root": { "common_name": "Example Root CA", "ca_dir": "pki/ca" } },
//!     "users": { "web":  { "common_name": "web.example.com" } }
//!   }
//! }
//! ```
//!
//! Loading stops at [`serde_json::Value`]: the per-group shape is only pinned
//! down group by group (see [`RawGroup`]) so that one malformed group cannot
//! take the whole document down with it, and entity fields stay raw values so
//! the resolver's type coercion rules apply.

use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// The tolerated shape of a single configuration group.
///
/// Entity entries and the two defaults sections keep their values as raw
/// JSON so badly typed fields coerce to absent instead of failing the whole
/// group.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    pub ssl_defaults: Option<Map<String, Value>>,
    pub name_defaults: Option<Map<String, Value>>,
    pub ca: Option<Map<String, Value>>,
    pub users: Option<Map<String, Value>>,
}

/// Reads and decodes the configuration file.
///
/// # Errors
/// Fails when the file cannot be read or is not valid JSON. Both cases abort
/// the run before any group is processed.
pub fn read_config(path: &str) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {path}"))?;
    let data = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {path}"))?;
    Ok(data)
}
