//! End-to-end passkey ceremonies.
//!
//! Each flow decodes the relying party's JSON options, hands them to a
//! [`CredentialPlatform`], and encodes what comes back:
//!
//! ```text
//! options JSON → prepare → platform.get / platform.create → finalize → response JSON
//! ```
//!
//! Nothing is retried. A codec failure or a platform rejection ends the
//! ceremony and is returned to the caller, who decides whether to start over.

use tracing::{debug, warn};

use crate::{
    CeremonyError, CredentialPlatform, finalize_assertion_result, finalize_creation_result,
    prepare_assertion_request, prepare_creation_request,
};

/// Whether `platform` can run passkey ceremonies at all.
pub fn is_supported<P: CredentialPlatform>(platform: &P) -> bool {
    platform.is_supported()
}

/// Sign in with an existing passkey.
///
/// Returns `Ok(None)` without touching the platform when `options_json` is
/// absent or empty; otherwise the assertion response JSON.
///
/// # Errors
///
/// [`CeremonyError::Bridge`] when the options cannot be decoded or the result
/// encoded, [`CeremonyError::Platform`] when the platform rejects the
/// ceremony.
pub async fn get_passkey<P: CredentialPlatform>(
    platform: &P,
    options_json: Option<&str>,
) -> Result<Option<String>, CeremonyError<P::Error>> {
    let Some(options) = prepare_assertion_request(options_json)? else {
        return Ok(None);
    };

    debug!(
        allowed = options
            .public_key
            .allow_credentials
            .as_ref()
            .map_or(0, Vec::len),
        "starting assertion ceremony"
    );

    let assertion = platform.get(&options).await.map_err(|error| {
        warn!(?error, "assertion ceremony rejected");
        CeremonyError::Platform(error)
    })?;

    debug!(credential = %assertion.id, "assertion ceremony completed");
    Ok(Some(finalize_assertion_result(&assertion)?))
}

/// Register a new passkey.
///
/// Returns `Ok(None)` without touching the platform when `options_json` is
/// absent or empty; otherwise the creation response JSON.
///
/// # Errors
///
/// [`CeremonyError::Bridge`] when the options cannot be decoded or the result
/// encoded, [`CeremonyError::Platform`] when the platform rejects the
/// ceremony.
pub async fn create_passkey<P: CredentialPlatform>(
    platform: &P,
    options_json: Option<&str>,
) -> Result<Option<String>, CeremonyError<P::Error>> {
    let Some(options) = prepare_creation_request(options_json)? else {
        return Ok(None);
    };

    debug!(
        excluded = options
            .public_key
            .exclude_credentials
            .as_ref()
            .map_or(0, Vec::len),
        "starting creation ceremony"
    );

    let credential = platform.create(&options).await.map_err(|error| {
        warn!(?error, "creation ceremony rejected");
        CeremonyError::Platform(error)
    })?;

    debug!(credential = %credential.id, "creation ceremony completed");
    Ok(Some(finalize_creation_result(&credential)?))
}
