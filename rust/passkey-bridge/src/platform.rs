//! The platform credential capability this crate drives.

use std::future::Future;

use crate::{
    AssertionResult, ConditionalSend, CreationResult, CredentialCreationOptions,
    CredentialRequestOptions,
};

/// A platform able to run WebAuthn ceremonies.
///
/// In a browser this is `navigator.credentials`; in tests it is usually a
/// software authenticator. Ceremonies may wait an unbounded, user-paced
/// amount of time (biometric prompts, security-key taps). Implementations own
/// any timeout or cancellation policy.
pub trait CredentialPlatform {
    /// Failure reported by the platform, passed to the caller unmodified.
    type Error: std::fmt::Debug;

    /// Whether the platform exposes the credential API at all.
    ///
    /// A pure query: it never fails and has no side effects.
    fn is_supported(&self) -> bool;

    /// Run a creation ceremony with decoded options.
    fn create(
        &self,
        options: &CredentialCreationOptions,
    ) -> impl Future<Output = Result<CreationResult, Self::Error>> + ConditionalSend;

    /// Run an assertion ceremony with decoded options.
    fn get(
        &self,
        options: &CredentialRequestOptions,
    ) -> impl Future<Output = Result<AssertionResult, Self::Error>> + ConditionalSend;
}
