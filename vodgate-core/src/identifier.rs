//! Reversible video identifiers
//!
//! A `VideoId` is the external handle and cache key for a remote video. It
//! is the URL-safe base64 (no padding) encoding of the absolute remote
//! path, so it round-trips exactly and stays stable across listings.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Derive the identifier from an absolute remote path.
    pub fn from_path(path: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(path.as_bytes()))
    }

    /// Wrap an already-encoded token received from a client.
    ///
    /// No validation happens here; a bogus token surfaces as `NotFound`
    /// when `to_path` is called.
    pub fn from_encoded(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Recover the absolute remote path this identifier encodes.
    pub fn to_path(&self) -> Result<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|_| Error::NotFound("unknown video identifier".to_string()))?;
        let path = String::from_utf8(bytes)
            .map_err(|_| Error::NotFound("unknown video identifier".to_string()))?;
        if !path.starts_with('/') {
            return Err(Error::NotFound("unknown video identifier".to_string()));
        }
        Ok(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
