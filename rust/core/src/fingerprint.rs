// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical 64-bit fingerprints of request descriptions.
//!
//! A description is first lowered to a JSON value tree and then digested
//! bottom-up with SHA-256:
//!
//! - every node is prefixed with a kind tag, so `"1"`, `1` and `[1]` differ
//! - strings, keys and collections are length-prefixed (big-endian `u64`)
//! - each object field is digested as a `(key, value digest)` pair and the
//!   pair digests are sorted before being combined, so field order never
//!   affects the result
//!
//! The fingerprint is the first eight bytes of the root digest read as a
//! big-endian `u64`. Nothing depends on process state or platform, so the
//! same description yields the same fingerprint across restarts and hosts.

use crate::error::{Error, Result};
use crate::request::RequestDescription;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Deepest container nesting accepted by the canonical walk.
pub const MAX_DEPTH: usize = 64;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_ARRAY: u8 = 4;
const TAG_OBJECT: u8 = 5;
const TAG_FIELD: u8 = 6;

type NodeDigest = [u8; 32];

/// 64-bit digest of a canonicalized request description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Store key: lowercase hex, no padding.
    pub fn to_key(self) -> String {
        format!("{:x}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<Fingerprint> for u64 {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

/// Fingerprint a decoded request description.
pub fn fingerprint(request: &RequestDescription) -> Result<Fingerprint> {
    fingerprint_of(request)
}

/// Fingerprint any serializable value with the canonical walk.
pub fn fingerprint_of<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint> {
    let tree = serde_json::to_value(value).map_err(|e| Error::Fingerprint(e.to_string()))?;
    let digest = digest_node(&tree, 0)?;

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Ok(Fingerprint(u64::from_be_bytes(head)))
}

fn digest_node(value: &Value, depth: usize) -> Result<NodeDigest> {
    let mut hasher = Sha256::new();

    match value {
        Value::Null => hasher.update([TAG_NULL]),
        Value::Bool(b) => hasher.update([TAG_BOOL, u8::from(*b)]),
        Value::Number(n) => {
            hasher.update([TAG_NUMBER]);
            update_bytes(&mut hasher, n.to_string().as_bytes());
        }
        Value::String(s) => {
            hasher.update([TAG_STRING]);
            update_bytes(&mut hasher, s.as_bytes());
        }
        Value::Array(items) => {
            check_depth(depth)?;
            hasher.update([TAG_ARRAY]);
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                hasher.update(digest_node(item, depth + 1)?);
            }
        }
        Value::Object(fields) => {
            check_depth(depth)?;
            // Map iteration order depends on serde_json features; sort explicitly.
            let mut pairs = fields
                .iter()
                .map(|(key, value)| digest_field(key, value, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            pairs.sort_unstable();

            hasher.update([TAG_OBJECT]);
            hasher.update((pairs.len() as u64).to_be_bytes());
            for pair in &pairs {
                hasher.update(pair);
            }
        }
    }

    Ok(hasher.finalize().into())
}

fn digest_field(key: &str, value: &Value, depth: usize) -> Result<NodeDigest> {
    let mut hasher = Sha256::new();
    hasher.update([TAG_FIELD]);
    update_bytes(&mut hasher, key.as_bytes());
    hasher.update(digest_node(value, depth)?);
    Ok(hasher.finalize().into())
}

fn update_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(Error::Fingerprint(format!(
            "nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}
