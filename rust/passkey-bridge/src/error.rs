//! Error types for transcoding and ceremonies.

use thiserror::Error;

/// Errors raised while converting credential payloads between their JSON and
/// binary forms.
///
/// Field paths use dotted notation with list indices, e.g.
/// `publicKey.allowCredentials[1].id`.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The options payload is not valid JSON.
    #[error("malformed options JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// A required field is absent (or `null`).
    #[error("missing required field `{path}`")]
    MissingField {
        /// Path of the absent field.
        path: String,
    },

    /// A field is present but holds the wrong kind of JSON value.
    #[error("field `{path}` must be {expected}")]
    UnexpectedType {
        /// Path of the offending field.
        path: String,
        /// Description of the expected JSON value.
        expected: &'static str,
    },

    /// A byte field does not hold valid base64 text.
    #[error("field `{path}` is not valid base64: {source}")]
    InvalidBase64 {
        /// Path of the offending field.
        path: String,
        /// The underlying decode failure.
        #[source]
        source: base64::DecodeError,
    },

    /// A credential result could not be serialized to JSON.
    #[error("failed to serialize credential result: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Errors from an end-to-end credential ceremony.
///
/// Platform failures (user cancelled, no authenticator, unsupported
/// algorithm, ...) are carried through untouched so the caller sees exactly
/// what the platform reported.
#[derive(Debug, Error)]
pub enum CeremonyError<E> {
    /// The options or the result could not be transcoded.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The platform rejected or failed the ceremony.
    #[error("platform rejected the ceremony: {0:?}")]
    Platform(E),
}
