#![warn(missing_docs)]

//! Bridges JSON-transported WebAuthn (passkey) payloads to the binary form
//! the platform credential API works with.
//!
//! Relying-party servers ship credential options as JSON in which every byte
//! field (challenge, user id, credential ids) is base64url text. The platform
//! ceremony wants raw bytes in, and hands raw bytes back out. This crate owns
//! the conversion in both directions:
//!
//! ```text
//! options JSON ──prepare_*──► typed options (Bytes) ──► CredentialPlatform
//!                                                          │
//! response JSON ◄──finalize_*── AssertionResult / CreationResult ◄──┘
//! ```
//!
//! The [`ceremony`] module strings the steps together. On
//! `wasm32-unknown-unknown` the `web` module provides a platform backed by
//! `navigator.credentials` and exports `isSupported`, `getPasskey` and
//! `createPasskey` to JavaScript.
//!
//! ```
//! use passkey_bridge::{decode, encode};
//!
//! let bytes = decode("SGVsbG8").unwrap();
//! assert_eq!(bytes, b"Hello");
//! assert_eq!(encode(&bytes), "SGVsbG8");
//! ```

mod bytes;
pub use bytes::*;

pub mod codec;
pub use codec::{decode, encode};

mod error;
pub use error::*;

pub mod options;
pub use options::*;

pub mod response;
pub use response::*;

mod platform;
pub use platform::*;

pub mod ceremony;

mod sync;
pub use sync::*;

#[cfg(feature = "helpers")]
pub mod helpers;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod web;
