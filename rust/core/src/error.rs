// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core cache protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding, fingerprinting or (de)serializing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed request description: {0}")]
    MalformedInput(String),

    #[error("Cannot fingerprint request: {0}")]
    Fingerprint(String),

    #[error("Cannot serialize cached response: {0}")]
    Serialize(String),

    #[error("Corrupt cached response: {0}")]
    Corrupt(String),
}
