// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of posted request descriptions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Outbound request a client asks the proxy to perform.
///
/// Only `url` is recognized. Unknown fields in the posted body are dropped
/// during decoding and therefore never reach the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescription {
    /// Absolute `http` or `https` URL, carried verbatim.
    pub url: String,
}

impl RequestDescription {
    /// Create a description for `url` without validation.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Decode and validate a JSON request body.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let request: Self =
            serde_json::from_slice(body).map_err(|e| Error::MalformedInput(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the recognized fields.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::MalformedInput("url is empty".into()));
        }

        let scheme = self
            .url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| Error::MalformedInput(format!("url is not absolute: {}", self.url)))?;

        if scheme != "http" && scheme != "https" {
            return Err(Error::MalformedInput(format!(
                "unsupported url scheme: {}",
                scheme
            )));
        }

        Ok(())
    }
}
