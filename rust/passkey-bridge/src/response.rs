//! Credential results returned by the platform, and their JSON wire shape.
//!
//! The same types describe both sides: in memory every byte field is a
//! `Vec<u8>`, and the serde attributes turn each one into unpadded base64url
//! text on the way out (and back on the way in, for servers and tests that
//! read the JSON).

use serde::{Deserialize, Serialize};

use crate::{BridgeError, codec::base64url};

/// The credential type every WebAuthn credential reports.
pub const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// The outcome of an assertion (`get`) ceremony.
///
/// Serializes as:
///
/// ```text
/// { id, rawId, type,
///   response: { authenticatorData, clientDataJSON, signature, userHandle } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    /// base64url form of the credential id, as reported by the platform.
    pub id: String,
    /// Raw credential id.
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    /// Credential type, normally [`PUBLIC_KEY_CREDENTIAL_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Authenticator output.
    pub response: AuthenticatorAssertionResponse,
}

/// The `response` member of an [`AssertionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorAssertionResponse {
    /// Authenticator data covered by the signature.
    #[serde(rename = "authenticatorData", with = "base64url")]
    pub authenticator_data: Vec<u8>,
    /// UTF-8 JSON client data the platform assembled.
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    /// Signature over `authenticatorData || SHA-256(clientDataJSON)`.
    #[serde(with = "base64url")]
    pub signature: Vec<u8>,
    /// User handle of a discoverable credential. Always present on the wire;
    /// `None` is written as an empty string.
    #[serde(rename = "userHandle", with = "base64url::optional", default)]
    pub user_handle: Option<Vec<u8>>,
}

/// The outcome of a creation (`create`) ceremony.
///
/// Serializes as:
///
/// ```text
/// { id, rawId, type, response: { attestationObject, clientDataJSON } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationResult {
    /// base64url form of the credential id, as reported by the platform.
    pub id: String,
    /// Raw credential id.
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    /// Credential type, normally [`PUBLIC_KEY_CREDENTIAL_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Authenticator output.
    pub response: AuthenticatorAttestationResponse,
}

/// The `response` member of a [`CreationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorAttestationResponse {
    /// CBOR attestation object (`fmt`, `attStmt`, `authData`).
    #[serde(rename = "attestationObject", with = "base64url")]
    pub attestation_object: Vec<u8>,
    /// UTF-8 JSON client data the platform assembled.
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
}

/// Encode an assertion result as the JSON string a relying party expects.
///
/// # Errors
///
/// Returns [`BridgeError::Serialization`] if serialization fails.
pub fn finalize_assertion_result(result: &AssertionResult) -> Result<String, BridgeError> {
    serde_json::to_string(result).map_err(BridgeError::Serialization)
}

/// Encode a creation result as the JSON string a relying party expects.
///
/// # Errors
///
/// Returns [`BridgeError::Serialization`] if serialization fails.
pub fn finalize_creation_result(result: &CreationResult) -> Result<String, BridgeError> {
    serde_json::to_string(result).map_err(BridgeError::Serialization)
}
