// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recorded upstream responses and their stored form.
//!
//! Entries are JSON objects:
//!
//! ```json
//! {"string":"hello","ContentType":"text/plain"}
//! ```
//!
//! Bodies that are not valid UTF-8 are written base64-encoded and flagged
//! with `"Encoding":"base64"`. Unknown fields are ignored on read.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Body and declared content type of a past upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Bytes,
    /// Upstream `Content-Type` header, empty when absent.
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BodyEncoding {
    Base64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse<'a> {
    #[serde(rename = "string", borrow)]
    body: Cow<'a, str>,
    #[serde(rename = "ContentType", default, borrow)]
    content_type: Cow<'a, str>,
    #[serde(rename = "Encoding", default, skip_serializing_if = "Option::is_none")]
    encoding: Option<BodyEncoding>,
}

impl CachedResponse {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// Encode into the textual form written to the store.
    pub fn serialize(&self) -> Result<String> {
        let stored = match std::str::from_utf8(&self.body) {
            Ok(text) => StoredResponse {
                body: text.into(),
                content_type: self.content_type.as_str().into(),
                encoding: None,
            },
            Err(_) => StoredResponse {
                body: STANDARD.encode(&self.body).into(),
                content_type: self.content_type.as_str().into(),
                encoding: Some(BodyEncoding::Base64),
            },
        };

        serde_json::to_string(&stored).map_err(|e| Error::Serialize(e.to_string()))
    }

    /// Decode a stored entry.
    pub fn deserialize(data: &str) -> Result<Self> {
        let stored: StoredResponse<'_> =
            serde_json::from_str(data).map_err(|e| Error::Corrupt(e.to_string()))?;

        let body = match stored.encoding {
            None => Bytes::from(stored.body.into_owned()),
            Some(BodyEncoding::Base64) => STANDARD
                .decode(stored.body.as_bytes())
                .map(Bytes::from)
                .map_err(|e| Error::Corrupt(format!("invalid base64 body: {}", e)))?,
        };

        Ok(Self {
            body,
            content_type: stored.content_type.into_owned(),
        })
    }
}
