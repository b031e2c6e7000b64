//! Credential options as handed to the platform.
//!
//! A relying party sends `CredentialRequestOptions` (assertion) or
//! `CredentialCreationOptions` (registration) as JSON, with every byte field
//! carried as base64url text. [`prepare_assertion_request`] and
//! [`prepare_creation_request`] decode exactly those fields into [`Bytes`]
//! and carry every other member through untouched, in the flattened `extra`
//! maps.
//!
//! Both functions treat an absent or empty payload as "nothing to do" and
//! return `Ok(None)`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{BridgeError, Bytes, codec};

/// Options for an assertion (`navigator.credentials.get`) ceremony.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    /// The WebAuthn-specific part of the request.
    pub public_key: PublicKeyCredentialRequestOptions,
    /// Sibling members of `publicKey` (e.g. `mediation`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `publicKey` member of [`CredentialRequestOptions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// Server-issued challenge the authenticator signs over.
    pub challenge: Bytes,
    /// Credentials the relying party will accept, in preference order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
    /// Every other member (`rpId`, `timeout`, `userVerification`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PublicKeyCredentialRequestOptions {
    /// The relying party id, when the options name one.
    pub fn rp_id(&self) -> Option<&str> {
        self.extra.get("rpId").and_then(Value::as_str)
    }
}

/// Options for a creation (`navigator.credentials.create`) ceremony.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    /// The WebAuthn-specific part of the request.
    pub public_key: PublicKeyCredentialCreationOptions,
    /// Sibling members of `publicKey`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `publicKey` member of [`CredentialCreationOptions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    /// Server-issued challenge the attestation covers.
    pub challenge: Bytes,
    /// The account the new credential belongs to.
    pub user: UserEntity,
    /// Credentials already registered for this account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<CredentialDescriptor>>,
    /// Every other member (`rp`, `pubKeyCredParams`, `attestation`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PublicKeyCredentialCreationOptions {
    /// The relying party id from `rp.id`, when present.
    pub fn rp_id(&self) -> Option<&str> {
        self.extra
            .get("rp")
            .and_then(|rp| rp.get("id"))
            .and_then(Value::as_str)
    }

    /// COSE algorithm identifiers listed in `pubKeyCredParams`, in order.
    ///
    /// Returns `None` when the relying party did not list any.
    pub fn algorithms(&self) -> Option<Vec<i64>> {
        let params = self.extra.get("pubKeyCredParams")?.as_array()?;
        Some(
            params
                .iter()
                .filter_map(|param| param.get("alg").and_then(Value::as_i64))
                .collect(),
        )
    }
}

/// The `user` member of [`PublicKeyCredentialCreationOptions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Bytes,
    /// `name`, `displayName` and anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entry of `allowCredentials` or `excludeCredentials`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialDescriptor {
    /// Raw credential id.
    pub id: Bytes,
    /// `type`, `transports` and anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The argument a platform ceremony receives: `{ publicKey }` alone.
///
/// Root-level siblings of `publicKey` (`mediation`, `password`, ...) stay in
/// the options' `extra` map for the caller but are never forwarded, so a
/// server asking for `"mediation": "conditional"` still gets a modal
/// ceremony.
#[derive(Debug, PartialEq, Serialize)]
pub struct PlatformOptions<'a, T> {
    /// The `publicKey` member, byte fields already decoded.
    #[serde(rename = "publicKey")]
    pub public_key: &'a T,
}

impl CredentialRequestOptions {
    /// What to hand to `navigator.credentials.get`.
    pub fn platform_options(&self) -> PlatformOptions<'_, PublicKeyCredentialRequestOptions> {
        PlatformOptions {
            public_key: &self.public_key,
        }
    }
}

impl CredentialCreationOptions {
    /// What to hand to `navigator.credentials.create`.
    pub fn platform_options(&self) -> PlatformOptions<'_, PublicKeyCredentialCreationOptions> {
        PlatformOptions {
            public_key: &self.public_key,
        }
    }
}

/// Decode the byte fields of assertion options.
///
/// Decodes `publicKey.challenge` and, when `publicKey.allowCredentials` is
/// present, the `id` of every entry in order. An empty list stays empty.
///
/// # Errors
///
/// Fails with [`BridgeError`] when the payload is not JSON, when
/// `publicKey` or the challenge is missing, or when a byte field is not
/// valid base64.
pub fn prepare_assertion_request(
    options_json: Option<&str>,
) -> Result<Option<CredentialRequestOptions>, BridgeError> {
    let Some(json) = options_json.filter(|json| !json.is_empty()) else {
        tracing::trace!("no assertion options supplied");
        return Ok(None);
    };

    let mut root = parse_object(json)?;
    let mut public_key = take_object(&mut root, "", "publicKey")?;
    let challenge = take_bytes(&mut public_key, "publicKey", "challenge")?;
    let allow_credentials =
        take_descriptors(&mut public_key, "publicKey", "allowCredentials")?;

    Ok(Some(CredentialRequestOptions {
        public_key: PublicKeyCredentialRequestOptions {
            challenge,
            allow_credentials,
            extra: public_key,
        },
        extra: root,
    }))
}

/// Decode the byte fields of creation options.
///
/// Decodes `publicKey.challenge`, `publicKey.user.id` and, when
/// `publicKey.excludeCredentials` is present, the `id` of every entry in
/// order.
///
/// # Errors
///
/// Fails with [`BridgeError`] when the payload is not JSON, when a required
/// field (`publicKey`, `challenge`, `user`, `user.id`) is missing, or when a
/// byte field is not valid base64.
pub fn prepare_creation_request(
    options_json: Option<&str>,
) -> Result<Option<CredentialCreationOptions>, BridgeError> {
    let Some(json) = options_json.filter(|json| !json.is_empty()) else {
        tracing::trace!("no creation options supplied");
        return Ok(None);
    };

    let mut root = parse_object(json)?;
    let mut public_key = take_object(&mut root, "", "publicKey")?;
    let challenge = take_bytes(&mut public_key, "publicKey", "challenge")?;
    let mut user = take_object(&mut public_key, "publicKey", "user")?;
    let user_id = take_bytes(&mut user, "publicKey.user", "id")?;
    let exclude_credentials =
        take_descriptors(&mut public_key, "publicKey", "excludeCredentials")?;

    Ok(Some(CredentialCreationOptions {
        public_key: PublicKeyCredentialCreationOptions {
            challenge,
            user: UserEntity {
                id: user_id,
                extra: user,
            },
            exclude_credentials,
            extra: public_key,
        },
        extra: root,
    }))
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

fn parse_object(json: &str) -> Result<Map<String, Value>, BridgeError> {
    match serde_json::from_str::<Value>(json).map_err(BridgeError::MalformedJson)? {
        Value::Object(map) => Ok(map),
        _ => Err(BridgeError::UnexpectedType {
            path: "$".to_owned(),
            expected: "an object",
        }),
    }
}

fn take_object(
    map: &mut Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<Map<String, Value>, BridgeError> {
    let path = child(parent, key);
    match map.remove(key) {
        Some(Value::Object(inner)) => Ok(inner),
        None | Some(Value::Null) => Err(BridgeError::MissingField { path }),
        Some(_) => Err(BridgeError::UnexpectedType {
            path,
            expected: "an object",
        }),
    }
}

fn take_bytes(
    map: &mut Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<Bytes, BridgeError> {
    let path = child(parent, key);
    match map.remove(key) {
        Some(Value::String(text)) => codec::decode(&text)
            .map(Bytes::from)
            .map_err(|source| BridgeError::InvalidBase64 { path, source }),
        None | Some(Value::Null) => Err(BridgeError::MissingField { path }),
        Some(_) => Err(BridgeError::UnexpectedType {
            path,
            expected: "a base64url string",
        }),
    }
}

fn take_descriptors(
    map: &mut Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<Option<Vec<CredentialDescriptor>>, BridgeError> {
    let path = child(parent, key);
    let entries = match map.remove(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(BridgeError::UnexpectedType {
                path,
                expected: "an array",
            });
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let path = format!("{path}[{index}]");
            let Value::Object(mut fields) = entry else {
                return Err(BridgeError::UnexpectedType {
                    path,
                    expected: "an object",
                });
            };
            let id = take_bytes(&mut fields, &path, "id")?;
            Ok(CredentialDescriptor { id, extra: fields })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn it_does_nothing_without_options() {
        assert!(prepare_assertion_request(None).unwrap().is_none());
        assert!(prepare_assertion_request(Some("")).unwrap().is_none());
        assert!(prepare_creation_request(None).unwrap().is_none());
        assert!(prepare_creation_request(Some("")).unwrap().is_none());
    }

    #[test]
    fn it_decodes_only_the_challenge_when_the_allow_list_is_empty() {
        let json = json!({
            "publicKey": {
                "challenge": "SGVsbG8",
                "allowCredentials": [],
                "rpId": "example.com",
                "timeout": 60000
            }
        })
        .to_string();

        let options = prepare_assertion_request(Some(&json)).unwrap().unwrap();

        assert_eq!(options.public_key.challenge.as_slice(), b"Hello");
        assert_eq!(options.public_key.allow_credentials, Some(vec![]));
        assert_eq!(options.public_key.rp_id(), Some("example.com"));
        assert_eq!(options.public_key.extra.get("timeout"), Some(&json!(60000)));
        assert!(options.extra.is_empty());
    }

    #[test]
    fn it_decodes_every_allowed_credential() {
        let json = json!({
            "mediation": "optional",
            "publicKey": {
                "challenge": "AAEC",
                "allowCredentials": [
                    { "type": "public-key", "id": "AQ" },
                    { "type": "public-key", "id": "Ag", "transports": ["usb"] }
                ]
            }
        })
        .to_string();

        let options = prepare_assertion_request(Some(&json)).unwrap().unwrap();
        let allowed = options.public_key.allow_credentials.unwrap();

        assert_eq!(options.public_key.challenge.as_slice(), &[0, 1, 2]);
        assert_eq!(allowed.len(), 2);
        assert_eq!(allowed[0].id.as_slice(), &[1]);
        assert_eq!(allowed[1].id.as_slice(), &[2]);
        assert_eq!(allowed[1].extra.get("transports"), Some(&json!(["usb"])));
        assert_eq!(options.extra.get("mediation"), Some(&json!("optional")));
    }

    #[test]
    fn it_leaves_a_missing_allow_list_absent() {
        let json = r#"{"publicKey":{"challenge":"AA","allowCredentials":null}}"#;
        let options = prepare_assertion_request(Some(json)).unwrap().unwrap();
        assert_eq!(options.public_key.allow_credentials, None);
    }

    #[test]
    fn it_decodes_every_excluded_credential_in_order() {
        let public_key = json!({
            "challenge": "Y2hhbGxlbmdl",
            "rp": { "id": "example.com", "name": "Example" },
            "user": { "id": "dXNlci0x", "name": "ada", "displayName": "Ada" },
            "pubKeyCredParams": [{ "type": "public-key", "alg": -7 }],
            "excludeCredentials": [
                { "type": "public-key", "id": "AQ" },
                { "type": "public-key", "id": "AgI" },
                { "type": "public-key", "id": "AwMD" }
            ],
            "attestation": "none"
        });
        let json = json!({ "publicKey": public_key }).to_string();

        let options = prepare_creation_request(Some(&json)).unwrap().unwrap();
        let public = &options.public_key;

        assert_eq!(public.challenge.as_slice(), b"challenge");
        assert_eq!(public.user.id.as_slice(), b"user-1");
        assert_eq!(public.user.extra.get("displayName"), Some(&json!("Ada")));

        let excluded: Vec<Vec<u8>> = public
            .exclude_credentials
            .as_ref()
            .unwrap()
            .iter()
            .map(|descriptor| descriptor.id.to_vec())
            .collect();
        assert_eq!(excluded, vec![vec![1], vec![2, 2], vec![3, 3, 3]]);

        // Untouched members come through verbatim
        let mut expected = public_key.as_object().unwrap().clone();
        for decoded in ["challenge", "user", "excludeCredentials"] {
            expected.remove(decoded);
        }
        assert_eq!(public.extra, expected);
        assert_eq!(public.rp_id(), Some("example.com"));
        assert_eq!(public.algorithms(), Some(vec![-7]));
    }

    #[test]
    fn it_requires_a_user_id_for_creation() {
        let json = r#"{"publicKey":{"challenge":"AA","user":{"name":"ada"}}}"#;
        let error = prepare_creation_request(Some(json)).unwrap_err();
        assert!(
            matches!(&error, BridgeError::MissingField { path } if path == "publicKey.user.id"),
            "{error}"
        );
    }

    #[test]
    fn it_reports_the_missing_challenge() {
        let error = prepare_assertion_request(Some(r#"{"publicKey":{}}"#)).unwrap_err();
        assert!(
            matches!(&error, BridgeError::MissingField { path } if path == "publicKey.challenge")
        );

        let error = prepare_assertion_request(Some("{}")).unwrap_err();
        assert!(matches!(&error, BridgeError::MissingField { path } if path == "publicKey"));
    }

    #[test]
    fn it_reports_where_base64_is_malformed() {
        let json = r#"{"publicKey":{"challenge":"AA","allowCredentials":[{"id":"AQ"},{"id":"!!"}]}}"#;
        let error = prepare_assertion_request(Some(json)).unwrap_err();
        assert!(
            matches!(
                &error,
                BridgeError::InvalidBase64 { path, .. } if path == "publicKey.allowCredentials[1].id"
            ),
            "{error}"
        );
    }

    #[test]
    fn it_rejects_malformed_json() {
        let error = prepare_assertion_request(Some("{not json")).unwrap_err();
        assert!(matches!(error, BridgeError::MalformedJson(_)));

        let error = prepare_creation_request(Some("[]")).unwrap_err();
        assert!(matches!(error, BridgeError::UnexpectedType { .. }));
    }

    #[test]
    fn it_rejects_non_string_byte_fields() {
        let error = prepare_assertion_request(Some(r#"{"publicKey":{"challenge":42}}"#))
            .unwrap_err();
        assert!(matches!(error, BridgeError::UnexpectedType { .. }));
    }

    #[test]
    fn it_serializes_decoded_fields_as_bytes() {
        let json = r#"{"publicKey":{"challenge":"AAE","allowCredentials":[{"id":"Ag","type":"public-key"}],"rpId":"example.com"}}"#;
        let options = prepare_assertion_request(Some(json)).unwrap().unwrap();

        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({
                "publicKey": {
                    "challenge": [0, 1],
                    "allowCredentials": [{ "id": [2], "type": "public-key" }],
                    "rpId": "example.com"
                }
            })
        );
    }

    #[test]
    fn it_forwards_only_the_public_key_to_the_platform() {
        let json = r#"{"mediation":"conditional","password":true,"publicKey":{"challenge":"AA","rpId":"example.com"}}"#;
        let options = prepare_assertion_request(Some(json)).unwrap().unwrap();

        assert_eq!(options.extra.get("mediation"), Some(&json!("conditional")));
        assert_eq!(
            serde_json::to_value(options.platform_options()).unwrap(),
            json!({ "publicKey": { "challenge": [0], "rpId": "example.com" } })
        );

        let json = r#"{"signal":{},"publicKey":{"challenge":"AA","user":{"id":"AQ"}}}"#;
        let options = prepare_creation_request(Some(json)).unwrap().unwrap();

        assert_eq!(
            serde_json::to_value(options.platform_options()).unwrap(),
            json!({ "publicKey": { "challenge": [0], "user": { "id": [1] } } })
        );
    }
}
