//! Browser bindings over `navigator.credentials`.
//!
//! [`NavigatorCredentials`] is the [`CredentialPlatform`] a page actually
//! has. The exported functions expose the ceremonies to JavaScript with the
//! JSON-string-in, JSON-string-out contract:
//!
//! ```js
//! import { isSupported, getPasskey, createPasskey } from "passkey-bridge";
//!
//! if (isSupported()) {
//!   const response = await getPasskey(JSON.stringify(optionsFromServer));
//! }
//! ```
//!
//! Platform rejections (the `DOMException` the browser throws) reach the
//! caller as-is; codec failures become a JavaScript `Error`.

use js_sys::{Function, Promise, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::{JsCast, prelude::*};
use wasm_bindgen_futures::JsFuture;

use crate::{
    AssertionResult, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    CeremonyError, CreationResult, CredentialCreationOptions, CredentialPlatform,
    CredentialRequestOptions, ceremony,
};

/// `navigator.credentials` of the current global scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigatorCredentials;

impl CredentialPlatform for NavigatorCredentials {
    type Error = JsValue;

    fn is_supported(&self) -> bool {
        Reflect::get(&js_sys::global(), &JsValue::from_str("PublicKeyCredential"))
            .map(|constructor| !constructor.is_undefined() && !constructor.is_null())
            .unwrap_or(false)
    }

    async fn create(&self, options: &CredentialCreationOptions) -> Result<CreationResult, JsValue> {
        let argument = to_js(&options.platform_options())?;
        let credential = call_credentials("create", &argument).await?;
        let response = js_get(&credential, "response")?;

        Ok(CreationResult {
            id: string_field(&credential, "id")?,
            raw_id: bytes_field(&credential, "rawId")?,
            kind: string_field(&credential, "type")?,
            response: AuthenticatorAttestationResponse {
                attestation_object: bytes_field(&response, "attestationObject")?,
                client_data_json: bytes_field(&response, "clientDataJSON")?,
            },
        })
    }

    async fn get(&self, options: &CredentialRequestOptions) -> Result<AssertionResult, JsValue> {
        let argument = to_js(&options.platform_options())?;
        let credential = call_credentials("get", &argument).await?;
        let response = js_get(&credential, "response")?;
        let user_handle = js_get(&response, "userHandle")?;

        Ok(AssertionResult {
            id: string_field(&credential, "id")?,
            raw_id: bytes_field(&credential, "rawId")?,
            kind: string_field(&credential, "type")?,
            response: AuthenticatorAssertionResponse {
                authenticator_data: bytes_field(&response, "authenticatorData")?,
                client_data_json: bytes_field(&response, "clientDataJSON")?,
                signature: bytes_field(&response, "signature")?,
                user_handle: if user_handle.is_null() || user_handle.is_undefined() {
                    None
                } else {
                    Some(buffer_to_vec(&user_handle))
                },
            },
        })
    }
}

/// Whether this browser exposes `PublicKeyCredential`.
#[wasm_bindgen(js_name = isSupported)]
pub fn is_supported() -> bool {
    console_error_panic_hook::set_once();
    ceremony::is_supported(&NavigatorCredentials)
}

/// Run an assertion ceremony from the server's options JSON.
///
/// Resolves to the response JSON string, or `null` when `options_json` is
/// missing or empty.
#[wasm_bindgen(js_name = getPasskey)]
pub async fn get_passkey(options_json: Option<String>) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    ceremony::get_passkey(&NavigatorCredentials, options_json.as_deref())
        .await
        .map(into_js_string)
        .map_err(into_js_error)
}

/// Run a creation ceremony from the server's options JSON.
///
/// Resolves to the response JSON string, or `null` when `options_json` is
/// missing or empty.
#[wasm_bindgen(js_name = createPasskey)]
pub async fn create_passkey(options_json: Option<String>) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    ceremony::create_passkey(&NavigatorCredentials, options_json.as_deref())
        .await
        .map(into_js_string)
        .map_err(into_js_error)
}

fn into_js_string(response: Option<String>) -> JsValue {
    response.map_or(JsValue::NULL, |json| JsValue::from_str(&json))
}

fn into_js_error(error: CeremonyError<JsValue>) -> JsValue {
    match error {
        CeremonyError::Platform(rejection) => rejection,
        CeremonyError::Bridge(error) => js_sys::Error::new(&error.to_string()).into(),
    }
}

/// Byte fields become `Uint8Array`s and extension maps plain objects.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new()
        .serialize_maps_as_objects(true)
        .serialize_missing_as_null(true);
    value.serialize(&serializer).map_err(JsValue::from)
}

/// `navigator.credentials[method](options)`, awaited.
async fn call_credentials(method: &str, options: &JsValue) -> Result<JsValue, JsValue> {
    let navigator = js_get(&js_sys::global(), "navigator")?;
    if navigator.is_undefined() {
        return Err(js_sys::Error::new("navigator is undefined").into());
    }
    let credentials = js_get(&navigator, "credentials")?;
    if credentials.is_undefined() {
        return Err(js_sys::Error::new("navigator.credentials is undefined").into());
    }

    let call: Function = js_get(&credentials, method)?.dyn_into()?;
    let promise: Promise = call.call1(&credentials, options)?.dyn_into()?;
    let credential = JsFuture::from(promise).await?;
    if credential.is_null() {
        return Err(js_sys::Error::new("the ceremony returned no credential").into());
    }
    Ok(credential)
}

fn js_get(object: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(object, &JsValue::from_str(key))
}

fn string_field(object: &JsValue, key: &str) -> Result<String, JsValue> {
    js_get(object, key)?
        .as_string()
        .ok_or_else(|| js_sys::Error::new(&format!("`{key}` is not a string")).into())
}

fn bytes_field(object: &JsValue, key: &str) -> Result<Vec<u8>, JsValue> {
    let value = js_get(object, key)?;
    if value.is_undefined() || value.is_null() {
        return Err(js_sys::Error::new(&format!("`{key}` is missing")).into());
    }
    Ok(buffer_to_vec(&value))
}

/// Copy an `ArrayBuffer` (or view) out of the JS heap.
fn buffer_to_vec(value: &JsValue) -> Vec<u8> {
    let array = Uint8Array::new(value);
    let mut bytes = vec![0u8; array.length() as usize];
    array.copy_to(&mut bytes);
    bytes
}
