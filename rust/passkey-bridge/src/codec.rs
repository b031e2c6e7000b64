//! Conversion between base64 text and raw bytes.
//!
//! [`encode`] always produces unpadded base64url. [`decode`] is lenient in
//! the way the browser's `atob` is: it accepts either alphabet, with or
//! without padding, and ignores ASCII whitespace. Like `atob` it still
//! refuses padding that does not complete a 4-character quantum (`"AA="`).
//! The leniency lives in a single canonicalization pass so that one strict
//! URL-safe engine does all the actual decoding.

use base64::{
    Engine,
    alphabet::URL_SAFE,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use std::borrow::Cow;

pub use base64::DecodeError;

const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64 or base64url text into bytes.
///
/// `-`/`_` and `+`/`/` are interchangeable, and trailing `=` padding is
/// optional as long as it pads to a multiple of four characters.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the text contains characters outside either
/// alphabet, has an impossible length or is padded short of a full quantum.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    BASE64URL.decode(canonicalize(text).as_bytes())
}

/// Encode bytes as unpadded base64url text.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64URL.encode(bytes)
}

/// Map the standard alphabet onto the URL-safe one, drop whitespace and
/// strip the padding of a whole quantum.
fn canonicalize(text: &str) -> Cow<'_, str> {
    let text = if text
        .bytes()
        .any(|byte| matches!(byte, b'+' | b'/') || byte.is_ascii_whitespace())
    {
        Cow::Owned(
            text.chars()
                .filter(|c| !c.is_ascii_whitespace())
                .map(|c| match c {
                    '+' => '-',
                    '/' => '_',
                    c => c,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    };

    // Padding only counts when it completes the last quantum; anything else
    // is left in place for the engine to reject.
    if text.len() % 4 != 0 {
        return text;
    }
    let unpadded = text
        .strip_suffix("==")
        .or_else(|| text.strip_suffix('='))
        .map(str::len);
    match (text, unpadded) {
        (Cow::Borrowed(text), Some(len)) => Cow::Borrowed(&text[..len]),
        (Cow::Owned(mut text), Some(len)) => {
            text.truncate(len);
            Cow::Owned(text)
        }
        (text, None) => text,
    }
}

/// Serde adapter that carries byte fields as base64url strings.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Blob {
///     #[serde(with = "passkey_bridge::codec::base64url")]
///     data: Vec<u8>,
/// }
///
/// let json = serde_json::to_string(&Blob { data: vec![0xfb, 0xff] }).unwrap();
/// assert_eq!(json, r#"{"data":"-_8"}"#);
/// ```
pub mod base64url {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialize bytes as unpadded base64url.
    pub fn serialize<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes))
    }

    /// Deserialize bytes from base64 or base64url text.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: From<Vec<u8>>,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::decode(&text).map(T::from).map_err(D::Error::custom)
    }

    /// Variant for optional byte fields that must always be present on the
    /// wire: `None` is written as `""`, and `""` or `null` read back as `None`.
    pub mod optional {
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        /// Serialize optional bytes, writing `None` as an empty string.
        pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match bytes {
                Some(bytes) => serializer.serialize_str(&super::super::encode(bytes)),
                None => serializer.serialize_str(""),
            }
        }

        /// Deserialize optional bytes, reading `""` and `null` as `None`.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(text) if text.is_empty() => Ok(None),
                Some(text) => super::super::decode(&text)
                    .map(Some)
                    .map_err(D::Error::custom),
            }
        }
    }
}
