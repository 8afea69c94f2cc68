//! Typed `next_action` directives.
//!
//! The backend describes the customer action an intent is waiting for as a JSON object tagged
//! by a `type` string, with the payload stored under a key of the same name:
//!
//! ```text
//! "next_action": {
//!   "type": "redirect_to_url",
//!   "redirect_to_url": { "url": "...", "return_url": "..." }
//! }
//! ```
//!
//! Parsing never fails. Types this crate does not know, and known types whose payload is
//! missing required fields, become [`NextAction::Unknown`] so that a client which predates a
//! new challenge type keeps working and reports "nothing actionable" instead of erroring.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};

use crate::loose_url::LooseUrl;

pub const TYPE_REDIRECT_TO_URL: &str = "redirect_to_url";
pub const TYPE_USE_STRIPE_SDK: &str = "use_stripe_sdk";
pub const TYPE_3DS2_FINGERPRINT: &str = "stripe_3ds2_fingerprint";
pub const TYPE_3DS1_REDIRECT: &str = "three_d_secure_redirect";

const FIELD_NEXT_ACTION: &str = "next_action";
const FIELD_TYPE: &str = "type";
const FIELD_URL: &str = "url";
const FIELD_RETURN_URL: &str = "return_url";
const FIELD_STRIPE_JS: &str = "stripe_js";
const FIELD_3DS2_SOURCE: &str = "three_d_secure_2_source";
const FIELD_DIRECTORY_SERVER_NAME: &str = "directory_server_name";
const FIELD_SERVER_TRANSACTION_ID: &str = "server_transaction_id";
const FIELD_3DS_METHOD_URL: &str = "three_ds_method_url";

/// What the client must do before the intent can proceed
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    /// Open `url` in a browser surface; the flow ends when the user comes back
    RedirectToUrl {
        url: LooseUrl,
        return_url: Option<LooseUrl>,
    },
    /// Run an in-SDK challenge
    UseStripeSdk(SdkChallengeData),
    /// A directive this client does not understand, with its `type` tag
    Unknown(String),
}

/// Payload of a `use_stripe_sdk` next action
#[derive(Debug, Clone, PartialEq)]
pub enum SdkChallengeData {
    /// Legacy 3DS1 challenge; kept as the raw fields the backend sent
    ThreeDS1 { raw_fields: IndexMap<String, JsonValue> },
    /// 3DS2 fingerprint request
    ThreeDS2Fingerprint(ThreeDS2FingerprintData),
}

/// Raw 3DS2 fingerprint fields, before the directory server is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDS2FingerprintData {
    /// `three_d_secure_2_source`
    pub source_id: String,
    pub directory_server_name: String,
    pub server_transaction_id: String,
    /// Empty strings are treated as absent
    pub three_ds_method_url: Option<LooseUrl>,
}

impl NextAction {
    /// Parse a `next_action` object. Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        let type_tag = object
            .get(FIELD_TYPE)
            .and_then(JsonValue::as_str)
            .unwrap_or_default();

        let action = match type_tag {
            TYPE_REDIRECT_TO_URL => parse_redirect_to_url(object),
            TYPE_USE_STRIPE_SDK => object
                .get(TYPE_USE_STRIPE_SDK)
                .and_then(JsonValue::as_object)
                .map(parse_use_stripe_sdk),
            _ => None,
        };

        Some(action.unwrap_or_else(|| NextAction::Unknown(type_tag.to_string())))
    }

    /// The wire `type` tag of this action
    pub fn type_tag(&self) -> &str {
        match self {
            NextAction::RedirectToUrl { .. } => TYPE_REDIRECT_TO_URL,
            NextAction::UseStripeSdk(_) => TYPE_USE_STRIPE_SDK,
            NextAction::Unknown(tag) => tag,
        }
    }

    /// Returns true for directives this client cannot act on
    pub fn is_unknown(&self) -> bool {
        matches!(self, NextAction::Unknown(_))
    }
}

impl SdkChallengeData {
    /// Returns true for 3DS2 fingerprint data
    pub fn is_3ds2(&self) -> bool {
        matches!(self, SdkChallengeData::ThreeDS2Fingerprint(_))
    }

    /// Returns true for legacy 3DS1 data
    pub fn is_3ds1(&self) -> bool {
        matches!(self, SdkChallengeData::ThreeDS1 { .. })
    }

    /// The inner `use_stripe_sdk.type` tag
    pub fn type_tag(&self) -> &str {
        match self {
            SdkChallengeData::ThreeDS1 { raw_fields } => raw_fields
                .get(FIELD_TYPE)
                .and_then(JsonValue::as_str)
                .unwrap_or(TYPE_3DS1_REDIRECT),
            SdkChallengeData::ThreeDS2Fingerprint(_) => TYPE_3DS2_FINGERPRINT,
        }
    }

    /// Browser URL of a 3DS1 challenge (`stripe_js`)
    pub fn stripe_js(&self) -> Option<LooseUrl> {
        match self {
            SdkChallengeData::ThreeDS1 { raw_fields } => raw_fields
                .get(FIELD_STRIPE_JS)
                .and_then(JsonValue::as_str)
                .map(LooseUrl::parse),
            SdkChallengeData::ThreeDS2Fingerprint(_) => None,
        }
    }
}

/// Parse the `next_action` of an intent object.
///
/// Returns `None` when the key is absent, null, or not an object.
pub fn parse_next_action(intent: &JsonValue) -> Option<NextAction> {
    intent
        .get(FIELD_NEXT_ACTION)
        .and_then(NextAction::from_value)
}

/// Deserialize an optional `next_action` field without ever failing
pub(crate) fn deserialize_next_action<'de, D>(
    deserializer: D,
) -> Result<Option<NextAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(NextAction::from_value))
}

fn parse_redirect_to_url(object: &Map<String, JsonValue>) -> Option<NextAction> {
    let redirect = object.get(TYPE_REDIRECT_TO_URL)?.as_object()?;
    let url = redirect.get(FIELD_URL)?.as_str()?;
    let return_url = redirect
        .get(FIELD_RETURN_URL)
        .and_then(JsonValue::as_str)
        .map(LooseUrl::parse);

    Some(NextAction::RedirectToUrl {
        url: LooseUrl::parse(url),
        return_url,
    })
}

fn parse_use_stripe_sdk(sdk: &Map<String, JsonValue>) -> NextAction {
    let inner_type = sdk.get(FIELD_TYPE).and_then(JsonValue::as_str);

    if inner_type == Some(TYPE_3DS2_FINGERPRINT) {
        return match parse_3ds2_fingerprint(sdk) {
            Some(data) => NextAction::UseStripeSdk(SdkChallengeData::ThreeDS2Fingerprint(data)),
            None => NextAction::Unknown(TYPE_3DS2_FINGERPRINT.to_string()),
        };
    }

    if sdk.get(FIELD_STRIPE_JS).is_some_and(JsonValue::is_string) {
        let raw_fields = sdk
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        return NextAction::UseStripeSdk(SdkChallengeData::ThreeDS1 { raw_fields });
    }

    NextAction::Unknown(inner_type.unwrap_or(TYPE_USE_STRIPE_SDK).to_string())
}

fn parse_3ds2_fingerprint(sdk: &Map<String, JsonValue>) -> Option<ThreeDS2FingerprintData> {
    let field = |name: &str| sdk.get(name).and_then(JsonValue::as_str);

    Some(ThreeDS2FingerprintData {
        source_id: field(FIELD_3DS2_SOURCE)?.to_string(),
        directory_server_name: field(FIELD_DIRECTORY_SERVER_NAME)?.to_string(),
        server_transaction_id: field(FIELD_SERVER_TRANSACTION_ID)?.to_string(),
        three_ds_method_url: field(FIELD_3DS_METHOD_URL)
            .filter(|url| !url.is_empty())
            .map(LooseUrl::parse),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn intent_with(next_action: JsonValue) -> JsonValue {
        json!({
            "id": "pi_1EceMnCRMbs6FrXfCXdF8dnx",
            "object": "payment_intent",
            "status": "requires_action",
            "next_action": next_action,
        })
    }

    #[test]
    fn test_redirect_to_url_preserves_fields() {
        let intent = intent_with(json!({
            "type": "redirect_to_url",
            "redirect_to_url": {
                "return_url": "stripe://deeplink",
                "url": "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecaz6CRMbs6FrXfuYKBRSUG/src_client_secret_F6octeOshkgxT47dr0ZxSZiv"
            }
        }));

        match parse_next_action(&intent) {
            Some(NextAction::RedirectToUrl { url, return_url }) => {
                assert_eq!(
                    url.as_str(),
                    "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecaz6CRMbs6FrXfuYKBRSUG/src_client_secret_F6octeOshkgxT47dr0ZxSZiv"
                );
                assert_eq!(return_url.unwrap().as_str(), "stripe://deeplink");
            }
            other => panic!("Expected RedirectToUrl, got {:?}", other),
        }
    }

    #[test]
    fn test_redirect_to_url_with_null_return_url() {
        let intent = intent_with(json!({
            "type": "redirect_to_url",
            "redirect_to_url": { "url": "https://example.com/auth", "return_url": null }
        }));

        assert_eq!(
            parse_next_action(&intent),
            Some(NextAction::RedirectToUrl {
                url: LooseUrl::parse("https://example.com/auth"),
                return_url: None,
            })
        );
    }

    #[test]
    fn test_unparsable_redirect_url_is_kept() {
        let intent = intent_with(json!({
            "type": "redirect_to_url",
            "redirect_to_url": { "url": "not a url", "return_url": "/relative" }
        }));

        let Some(NextAction::RedirectToUrl { url, return_url }) = parse_next_action(&intent)
        else {
            panic!("Expected RedirectToUrl");
        };
        assert_eq!(url.as_str(), "not a url");
        assert!(!url.is_parsed());
        assert_eq!(return_url.unwrap().as_str(), "/relative");
    }

    #[test]
    fn test_redirect_without_url_degrades_to_unknown() {
        let intent = intent_with(json!({
            "type": "redirect_to_url",
            "redirect_to_url": { "return_url": "stripe://deeplink" }
        }));
        assert_eq!(
            parse_next_action(&intent),
            Some(NextAction::Unknown("redirect_to_url".to_string()))
        );

        let intent = intent_with(json!({ "type": "redirect_to_url" }));
        assert_eq!(
            parse_next_action(&intent),
            Some(NextAction::Unknown("redirect_to_url".to_string()))
        );
    }

    #[test]
    fn test_3ds2_fingerprint() {
        let intent = intent_with(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": {
                "type": "stripe_3ds2_fingerprint",
                "three_d_secure_2_source": "src_1EceOlCRMbs6FrXf2hqrI1g5",
                "directory_server_name": "visa",
                "server_transaction_id": "e64bb72f-60ac-4845-b8b6-47cfdb0f73aa",
                "three_ds_method_url": ""
            }
        }));

        let Some(NextAction::UseStripeSdk(SdkChallengeData::ThreeDS2Fingerprint(data))) =
            parse_next_action(&intent)
        else {
            panic!("Expected 3DS2 fingerprint");
        };
        assert_eq!(data.source_id, "src_1EceOlCRMbs6FrXf2hqrI1g5");
        assert_eq!(data.directory_server_name, "visa");
        assert_eq!(data.server_transaction_id, "e64bb72f-60ac-4845-b8b6-47cfdb0f73aa");
        assert_eq!(data.three_ds_method_url, None);
    }

    #[test]
    fn test_3ds2_fingerprint_missing_source_degrades_to_unknown() {
        let intent = intent_with(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": {
                "type": "stripe_3ds2_fingerprint",
                "directory_server_name": "visa",
                "server_transaction_id": "e64bb72f-60ac-4845-b8b6-47cfdb0f73aa"
            }
        }));
        assert_eq!(
            parse_next_action(&intent),
            Some(NextAction::Unknown("stripe_3ds2_fingerprint".to_string()))
        );
    }

    #[test]
    fn test_3ds1_keeps_raw_fields() {
        let intent = intent_with(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": {
                "type": "three_d_secure_redirect",
                "stripe_js": "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecve7CRMbs6FrXfm8AxXMIh/src_client_secret_F79yszOBAiuaZTuIhbn3LPUW"
            }
        }));

        let Some(NextAction::UseStripeSdk(data)) = parse_next_action(&intent) else {
            panic!("Expected use_stripe_sdk");
        };
        assert!(data.is_3ds1());
        assert_eq!(data.type_tag(), "three_d_secure_redirect");
        assert_eq!(
            data.stripe_js().unwrap().as_str(),
            "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecve7CRMbs6FrXfm8AxXMIh/src_client_secret_F79yszOBAiuaZTuIhbn3LPUW"
        );
        let SdkChallengeData::ThreeDS1 { raw_fields } = data else {
            unreachable!()
        };
        assert_eq!(raw_fields.len(), 2);
    }

    #[test]
    fn test_unknown_sdk_type_without_stripe_js() {
        let intent = intent_with(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": { "type": "stripe_3ds2_challenge", "acs_url": "https://acs.example" }
        }));
        assert_eq!(
            parse_next_action(&intent),
            Some(NextAction::Unknown("stripe_3ds2_challenge".to_string()))
        );
    }

    #[test]
    fn test_unknown_types_never_fail() {
        for tag in ["", "display_oxxo_details", "alipay_handle_redirect", "REDIRECT_TO_URL"] {
            let intent = intent_with(json!({ "type": tag }));
            assert_eq!(
                parse_next_action(&intent),
                Some(NextAction::Unknown(tag.to_string())),
                "type tag {:?}",
                tag
            );
        }

        let missing_type = intent_with(json!({ "redirect_to_url": { "url": "https://x" } }));
        assert_eq!(
            parse_next_action(&missing_type),
            Some(NextAction::Unknown(String::new()))
        );

        let non_string_type = intent_with(json!({ "type": 7 }));
        assert_eq!(
            parse_next_action(&non_string_type),
            Some(NextAction::Unknown(String::new()))
        );
    }

    #[test]
    fn test_absent_or_non_object_next_action() {
        assert_eq!(parse_next_action(&json!({ "id": "pi_123" })), None);
        assert_eq!(parse_next_action(&intent_with(JsonValue::Null)), None);
        assert_eq!(parse_next_action(&intent_with(json!("redirect_to_url"))), None);
        assert_eq!(parse_next_action(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let intent = intent_with(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": {
                "type": "stripe_3ds2_fingerprint",
                "three_d_secure_2_source": "src_1",
                "directory_server_name": "american_express",
                "server_transaction_id": "txn_1",
                "three_ds_method_url": "https://acs.example/method"
            }
        }));
        assert_eq!(parse_next_action(&intent), parse_next_action(&intent));
    }
}
