// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # fetchcache core
//!
//! Request-fingerprint cache protocol shared by the fetchcache proxy.
//!
//! ## Overview
//!
//! - **Request decoding**: [`RequestDescription::decode`] turns a posted JSON
//!   body into a validated request description
//! - **Fingerprinting**: [`fingerprint`] reduces a description to a stable
//!   64-bit [`Fingerprint`], independent of field order
//! - **Response codec**: [`CachedResponse`] serializes to the textual form
//!   kept in the store and reads it back byte-for-byte
//!
//! ## Quick Start
//!
//! ```rust
//! use fetchcache_core::{fingerprint, CachedResponse, RequestDescription};
//!
//! let request = RequestDescription::decode(br#"{"url":"http://example.com/"}"#).unwrap();
//! let key = fingerprint(&request).unwrap().to_key();
//!
//! let response = CachedResponse::new("hello", "text/plain");
//! let stored = response.serialize().unwrap();
//! assert_eq!(CachedResponse::deserialize(&stored).unwrap(), response);
//! # let _ = key;
//! ```

pub mod error;
pub mod fingerprint;
pub mod request;
pub mod response;

pub use error::{Error, Result};
pub use fingerprint::{fingerprint, Fingerprint};
pub use request::RequestDescription;
pub use response::CachedResponse;
