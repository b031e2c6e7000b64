//! A deterministic software authenticator.
//!
//! [`VirtualAuthenticator`] implements [`CredentialPlatform`] without a
//! browser, which makes the full prepare → ceremony → finalize path testable
//! on native targets. It behaves like a single-origin browser with one
//! built-in platform authenticator:
//!
//! - `create` mints an ES256 (P-256) credential derived from the configured
//!   seed and returns a `"none"` attestation.
//! - `get` signs `authenticatorData || SHA-256(clientDataJSON)` with a
//!   previously created credential and bumps its signature counter.
//!
//! Keys are derived, not random, so two authenticators built from the same
//! settings produce the same credentials in the same order.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use p256::ecdsa::{DerSignature, SigningKey, VerifyingKey, signature::Signer as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    AssertionResult, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, Bytes,
    CreationResult, CredentialCreationOptions, CredentialPlatform, CredentialRequestOptions,
    PUBLIC_KEY_CREDENTIAL_TYPE, codec,
};

/// COSE algorithm identifier for ECDSA P-256 with SHA-256.
pub const ES256: i64 = -7;

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_ATTESTED_CREDENTIAL_DATA: u8 = 0x40;

/// `"none"` attestation carries an all-zero AAGUID.
const AAGUID: [u8; 16] = [0; 16];

/// Configuration for a [`VirtualAuthenticator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VirtualAuthenticatorSettings {
    /// Origin reported in `clientDataJSON`; its host is the default RP id.
    pub origin: String,
    /// Seed every credential key is derived from.
    pub seed: [u8; 32],
    /// Whether ceremonies report the user as verified (UV flag).
    pub user_verified: bool,
    /// Answer for [`CredentialPlatform::is_supported`]. When `false`, every
    /// ceremony fails with [`VirtualAuthenticatorError::NotSupported`].
    pub supported: bool,
}

impl Default for VirtualAuthenticatorSettings {
    fn default() -> Self {
        Self {
            origin: "https://localhost".to_owned(),
            seed: [0; 32],
            user_verified: true,
            supported: true,
        }
    }
}

/// Ceremony failures, named after the `DOMException`s a browser would raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VirtualAuthenticatorError {
    /// No credential satisfies the request.
    #[error("NotAllowedError: {0}")]
    NotAllowed(String),

    /// One of the excluded credentials already lives on this authenticator.
    #[error("InvalidStateError: an excluded credential is already registered")]
    InvalidState,

    /// The API is unavailable, or none of the offered algorithms is ES256.
    #[error("NotSupportedError: {0}")]
    NotSupported(String),

    /// The RP id is neither the origin's host nor a parent domain of it.
    #[error("SecurityError: {0}")]
    Security(String),

    /// Client data or attestation could not be encoded.
    #[error("EncodingError: {0}")]
    Encoding(String),
}

/// The JSON the authenticator signs over, as found in `clientDataJSON`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    /// `webauthn.create` or `webauthn.get`.
    #[serde(rename = "type")]
    pub kind: String,
    /// base64url of the challenge the relying party sent.
    pub challenge: String,
    /// Origin of the calling page.
    pub origin: String,
    /// Always `false` for this authenticator.
    pub cross_origin: bool,
}

/// The CBOR attestation object of a creation ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationObject {
    /// Attestation statement format; always `"none"` here.
    pub fmt: String,
    /// Attestation statement; empty for `"none"`.
    #[serde(rename = "attStmt")]
    pub att_stmt: BTreeMap<String, Bytes>,
    /// Authenticator data including the attested credential data.
    #[serde(rename = "authData")]
    pub auth_data: Bytes,
}

#[derive(Debug)]
struct VirtualCredential {
    id: Vec<u8>,
    rp_id: String,
    user_handle: Vec<u8>,
    key: SigningKey,
    sign_count: u32,
}

/// A software [`CredentialPlatform`] with deterministic keys.
#[derive(Debug, Default)]
pub struct VirtualAuthenticator {
    settings: VirtualAuthenticatorSettings,
    credentials: Mutex<Vec<VirtualCredential>>,
}

impl VirtualAuthenticator {
    /// Create an authenticator with no credentials.
    pub fn new(settings: VirtualAuthenticatorSettings) -> Self {
        Self {
            settings,
            credentials: Mutex::new(Vec::new()),
        }
    }

    /// Number of credentials created so far.
    pub fn credential_count(&self) -> usize {
        self.credentials().len()
    }

    /// Public key of a credential, for verifying assertions.
    pub fn verifying_key(&self, credential_id: &[u8]) -> Option<VerifyingKey> {
        self.credentials()
            .iter()
            .find(|credential| credential.id == credential_id)
            .map(|credential| *credential.key.verifying_key())
    }

    fn credentials(&self) -> MutexGuard<'_, Vec<VirtualCredential>> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_supported(&self) -> Result<(), VirtualAuthenticatorError> {
        if self.settings.supported {
            Ok(())
        } else {
            Err(VirtualAuthenticatorError::NotSupported(
                "public key credentials are disabled".to_owned(),
            ))
        }
    }

    /// Resolve the RP id, defaulting to the origin's host.
    ///
    /// Any other RP id must be a parent domain of the host with at least two
    /// labels, so `com` is refused for `https://example.com`. There is no
    /// public suffix list, so `co.uk` still passes for `https://a.co.uk`.
    fn rp_id(&self, requested: Option<&str>) -> Result<String, VirtualAuthenticatorError> {
        let host = url::Url::parse(&self.settings.origin)
            .ok()
            .and_then(|origin| origin.host_str().map(str::to_owned))
            .ok_or_else(|| {
                VirtualAuthenticatorError::Security(format!(
                    "origin `{}` has no host",
                    self.settings.origin
                ))
            })?;

        match requested {
            None => Ok(host),
            Some(rp_id)
                if host == rp_id
                    || (rp_id.contains('.') && host.ends_with(&format!(".{rp_id}"))) =>
            {
                Ok(rp_id.to_owned())
            }
            Some(rp_id) => Err(VirtualAuthenticatorError::Security(format!(
                "RP id `{rp_id}` is not valid for origin `{}`",
                self.settings.origin
            ))),
        }
    }

    fn flags(&self) -> u8 {
        if self.settings.user_verified {
            FLAG_USER_PRESENT | FLAG_USER_VERIFIED
        } else {
            FLAG_USER_PRESENT
        }
    }

    fn client_data(&self, kind: &str, challenge: &[u8]) -> Result<Vec<u8>, VirtualAuthenticatorError> {
        serde_json::to_vec(&CollectedClientData {
            kind: kind.to_owned(),
            challenge: codec::encode(challenge),
            origin: self.settings.origin.clone(),
            cross_origin: false,
        })
        .map_err(|error| VirtualAuthenticatorError::Encoding(error.to_string()))
    }
}

impl CredentialPlatform for VirtualAuthenticator {
    type Error = VirtualAuthenticatorError;

    fn is_supported(&self) -> bool {
        self.settings.supported
    }

    async fn create(
        &self,
        options: &CredentialCreationOptions,
    ) -> Result<CreationResult, VirtualAuthenticatorError> {
        self.ensure_supported()?;
        let public_key = &options.public_key;
        let rp_id = self.rp_id(public_key.rp_id())?;

        if let Some(algorithms) = public_key.algorithms() {
            if !algorithms.contains(&ES256) {
                return Err(VirtualAuthenticatorError::NotSupported(format!(
                    "none of the offered algorithms {algorithms:?} is ES256"
                )));
            }
        }

        let mut credentials = self.credentials();
        let excluded = public_key.exclude_credentials.as_deref().unwrap_or_default();
        if credentials.iter().any(|credential| {
            credential.rp_id == rp_id
                && excluded
                    .iter()
                    .any(|descriptor| credential.id == descriptor.id.as_slice())
        }) {
            return Err(VirtualAuthenticatorError::InvalidState);
        }

        let key = derive_key(&self.settings.seed, credentials.len())?;
        let verifying_key = key.verifying_key();
        let credential_id =
            Sha256::digest(verifying_key.to_encoded_point(true).as_bytes())[..16].to_vec();

        let attested = attested_credential_data(&credential_id, verifying_key)?;
        let auth_data = authenticator_data(
            &rp_id,
            self.flags() | FLAG_ATTESTED_CREDENTIAL_DATA,
            0,
            &attested,
        );
        let attestation_object = serde_ipld_dagcbor::to_vec(&AttestationObject {
            fmt: "none".to_owned(),
            att_stmt: BTreeMap::new(),
            auth_data: auth_data.into(),
        })
        .map_err(|error| VirtualAuthenticatorError::Encoding(error.to_string()))?;
        let client_data_json = self.client_data("webauthn.create", &public_key.challenge)?;

        tracing::debug!(rp_id = %rp_id, "virtual credential registered");
        credentials.push(VirtualCredential {
            id: credential_id.clone(),
            rp_id,
            user_handle: public_key.user.id.to_vec(),
            key,
            sign_count: 0,
        });

        Ok(CreationResult {
            id: codec::encode(&credential_id),
            raw_id: credential_id,
            kind: PUBLIC_KEY_CREDENTIAL_TYPE.to_owned(),
            response: AuthenticatorAttestationResponse {
                attestation_object,
                client_data_json,
            },
        })
    }

    async fn get(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<AssertionResult, VirtualAuthenticatorError> {
        self.ensure_supported()?;
        let public_key = &options.public_key;
        let rp_id = self.rp_id(public_key.rp_id())?;

        let mut credentials = self.credentials();
        let belongs = |credential: &VirtualCredential| credential.rp_id == rp_id;
        let index = match public_key.allow_credentials.as_deref() {
            Some(allowed) if !allowed.is_empty() => allowed.iter().find_map(|descriptor| {
                credentials.iter().position(|credential| {
                    belongs(credential) && credential.id == descriptor.id.as_slice()
                })
            }),
            _ => credentials.iter().position(belongs),
        }
        .ok_or_else(|| {
            VirtualAuthenticatorError::NotAllowed(format!(
                "no credential for `{rp_id}` matches the request"
            ))
        })?;

        let client_data_json = self.client_data("webauthn.get", &public_key.challenge)?;
        let flags = self.flags();
        let credential = &mut credentials[index];
        credential.sign_count = credential.sign_count.wrapping_add(1);

        let authenticator_data = authenticator_data(&rp_id, flags, credential.sign_count, &[]);
        let mut signed_data = authenticator_data.clone();
        signed_data.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: DerSignature = credential.key.sign(&signed_data);

        Ok(AssertionResult {
            id: codec::encode(&credential.id),
            raw_id: credential.id.clone(),
            kind: PUBLIC_KEY_CREDENTIAL_TYPE.to_owned(),
            response: AuthenticatorAssertionResponse {
                authenticator_data,
                client_data_json,
                signature: signature.to_bytes().to_vec(),
                user_handle: Some(credential.user_handle.clone()),
            },
        })
    }
}

/// Derive the `index`-th credential key from the seed.
fn derive_key(seed: &[u8; 32], index: usize) -> Result<SigningKey, VirtualAuthenticatorError> {
    let scalar = Sha256::new()
        .chain_update(seed)
        .chain_update((index as u64).to_be_bytes())
        .finalize();
    SigningKey::from_slice(&scalar)
        .map_err(|error| VirtualAuthenticatorError::Encoding(error.to_string()))
}

/// `rpIdHash (32) | flags (1) | signCount (4, big-endian) | attested data`
fn authenticator_data(rp_id: &str, flags: u8, sign_count: u32, attested: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(37 + attested.len());
    data.extend_from_slice(&Sha256::digest(rp_id.as_bytes()));
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    data.extend_from_slice(attested);
    data
}

/// `aaguid (16) | idLength (2) | credentialId | COSE_Key`
fn attested_credential_data(
    credential_id: &[u8],
    key: &VerifyingKey,
) -> Result<Vec<u8>, VirtualAuthenticatorError> {
    let point = key.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(VirtualAuthenticatorError::Encoding(
            "public key is the identity point".to_owned(),
        ));
    };
    let id_length = u16::try_from(credential_id.len())
        .map_err(|error| VirtualAuthenticatorError::Encoding(error.to_string()))?;

    let mut data = Vec::with_capacity(16 + 2 + credential_id.len() + 77);
    data.extend_from_slice(&AAGUID);
    data.extend_from_slice(&id_length.to_be_bytes());
    data.extend_from_slice(credential_id);
    // COSE_Key with integer labels, which DAG-CBOR cannot express:
    // {1: 2 (EC2), 3: -7 (ES256), -1: 1 (P-256), -2: x, -3: y}
    data.extend_from_slice(&[0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01, 0x21, 0x58, 0x20]);
    data.extend_from_slice(x);
    data.extend_from_slice(&[0x22, 0x58, 0x20]);
    data.extend_from_slice(y);
    Ok(data)
}
