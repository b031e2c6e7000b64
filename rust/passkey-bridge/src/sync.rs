//! Ceremony futures returned by a [`crate::CredentialPlatform`] must be
//! `Send` on native targets, where a platform may be driven from a
//! multi-threaded runtime. Browser futures wrap JavaScript promises and can
//! never be `Send`, so on `wasm32` the bound disappears.

/// `Send` everywhere except `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> ConditionalSend for T {}

/// `Send` everywhere except `wasm32`.
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSend {}

#[cfg(target_arch = "wasm32")]
impl<T> ConditionalSend for T {}
