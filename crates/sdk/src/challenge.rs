//! Hand-off between the backend and an external 3DS2 challenge runtime.
//!
//! The runtime produces the authentication request parameters (device data, ephemeral key,
//! ...) and later renders the challenge. This module only shapes the data that flows between
//! the two: the authenticate request body, the decision taken from the backend's response,
//! and the mapping of the runtime's final report onto an [`AuthCompletionStatus`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{
    error::{AuthError, Result},
    fingerprint::ThreeDS2Fingerprint,
    types::{AuthCompletionStatus, AuthConfig, LooseUrl},
};

/// `transStatus` of an ARes that requires a challenge
const TRANS_STATUS_CHALLENGE: &str = "C";

/// `transStatus` of a successfully authenticated transaction
const TRANS_STATUS_AUTHENTICATED: &str = "Y";

/// Native UI interface (`03` = both native and HTML)
const SDK_INTERFACE: &str = "03";

/// Every UI type the runtime can render: text, single select, multi select, OOB, HTML other
const SDK_UI_TYPES: [&str; 5] = ["01", "02", "03", "04", "05"];

/// Authentication request parameters produced by the challenge runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequestParameters {
    pub sdk_app_id: String,
    pub sdk_reference_number: String,
    pub sdk_transaction_id: String,

    /// Encrypted device data (JWE)
    pub device_data: String,

    /// Ephemeral public key as a JSON object (JWK)
    pub sdk_ephemeral_public_key: String,

    pub message_version: String,
}

/// Parameters of the backend 3DS2 authenticate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDS2AuthParams {
    pub source_id: String,
    pub areq: AuthenticationRequestParameters,
    pub max_timeout_minutes: u32,
    pub fallback_return_url: Option<String>,
}

#[derive(Serialize)]
struct AppParams<'a> {
    #[serde(rename = "sdkAppID")]
    sdk_app_id: &'a str,
    #[serde(rename = "sdkTransID")]
    sdk_trans_id: &'a str,
    #[serde(rename = "sdkEncData")]
    sdk_enc_data: &'a str,
    #[serde(rename = "sdkEphemPubKey")]
    sdk_ephem_pub_key: JsonValue,
    #[serde(rename = "sdkMaxTimeout")]
    sdk_max_timeout: String,
    #[serde(rename = "sdkReferenceNumber")]
    sdk_reference_number: &'a str,
    #[serde(rename = "messageVersion")]
    message_version: &'a str,
    #[serde(rename = "deviceRenderOptions")]
    device_render_options: DeviceRenderOptions,
}

#[derive(Serialize)]
struct DeviceRenderOptions {
    #[serde(rename = "sdkInterface")]
    sdk_interface: &'static str,
    #[serde(rename = "sdkUiType")]
    sdk_ui_type: [&'static str; 5],
}

impl ThreeDS2AuthParams {
    /// Combine a resolved fingerprint with the runtime's request parameters
    pub fn new(
        fingerprint: &ThreeDS2Fingerprint,
        areq: AuthenticationRequestParameters,
        config: &AuthConfig,
    ) -> Self {
        Self {
            source_id: fingerprint.source_id.clone(),
            areq,
            max_timeout_minutes: config.three_ds2_timeout_minutes,
            fallback_return_url: config.fallback_return_url.clone(),
        }
    }

    /// Form parameters of the authenticate request.
    ///
    /// Fails if the ephemeral public key is not a JSON object.
    pub fn to_params(&self) -> Result<IndexMap<String, String>> {
        let sdk_ephem_pub_key: JsonValue = serde_json::from_str(&self.areq.sdk_ephemeral_public_key)?;
        if !sdk_ephem_pub_key.is_object() {
            return Err(AuthError::InvalidAuthParams(
                "SDK ephemeral public key must be a JSON object".to_string(),
            ));
        }

        let app = AppParams {
            sdk_app_id: &self.areq.sdk_app_id,
            sdk_trans_id: &self.areq.sdk_transaction_id,
            sdk_enc_data: &self.areq.device_data,
            sdk_ephem_pub_key,
            sdk_max_timeout: format!("{:02}", self.max_timeout_minutes),
            sdk_reference_number: &self.areq.sdk_reference_number,
            message_version: &self.areq.message_version,
            device_render_options: DeviceRenderOptions {
                sdk_interface: SDK_INTERFACE,
                sdk_ui_type: SDK_UI_TYPES,
            },
        };

        let mut params = IndexMap::new();
        params.insert("source".to_string(), self.source_id.clone());
        params.insert("app".to_string(), serde_json::to_string(&app)?);
        if let Some(ref return_url) = self.fallback_return_url {
            params.insert("fallback_return_url".to_string(), return_url.clone());
        }
        Ok(params)
    }
}

/// Authentication response (ARes) forwarded by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ares {
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_trans_id: String,

    #[serde(rename = "acsTransID")]
    pub acs_trans_id: String,

    #[serde(rename = "acsSignedContent", default)]
    pub acs_signed_content: Option<String>,

    #[serde(rename = "acsURL", default)]
    pub acs_url: Option<String>,

    #[serde(rename = "transStatus", default)]
    pub trans_status: Option<String>,

    #[serde(rename = "messageVersion", default)]
    pub message_version: Option<String>,

    #[serde(rename = "sdkTransID", default)]
    pub sdk_trans_id: Option<String>,
}

impl Ares {
    /// Returns true if the issuer requires a challenge
    pub fn should_challenge(&self) -> bool {
        self.trans_status.as_deref() == Some(TRANS_STATUS_CHALLENGE)
    }
}

/// Error object of a failed 3DS2 authentication
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreeDS2ErrorPayload {
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,

    #[serde(rename = "errorDetail", default)]
    pub error_detail: Option<String>,

    #[serde(rename = "errorDescription", default)]
    pub error_description: Option<String>,

    #[serde(rename = "errorComponent", default)]
    pub error_component: Option<String>,
}

/// Backend response to the 3DS2 authenticate call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreeDS2AuthResult {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub ares: Option<Ares>,

    #[serde(default)]
    pub error: Option<ThreeDS2ErrorPayload>,

    #[serde(default)]
    pub fallback_redirect_url: Option<String>,
}

/// Values the runtime needs to render a challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParameters {
    pub acs_signed_content: Option<String>,
    pub three_ds_server_transaction_id: String,
    pub acs_transaction_id: String,
}

/// What to do after the authenticate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeStep {
    /// Start the runtime's challenge UI
    Challenge(ChallengeParameters),

    /// Authenticated without customer interaction
    Frictionless,

    /// The issuer does not support the native flow; authenticate in a browser instead
    FallbackRedirect(LooseUrl),
}

impl ThreeDS2AuthResult {
    /// Parse a response body
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Decide the next step of the 3DS2 flow
    pub fn next_step(&self) -> Result<ChallengeStep> {
        if let Some(ref ares) = self.ares {
            if ares.should_challenge() {
                info!(
                    three_ds_server_trans_id = %ares.three_ds_server_trans_id,
                    "3DS2 challenge required"
                );
                return Ok(ChallengeStep::Challenge(ChallengeParameters {
                    acs_signed_content: ares.acs_signed_content.clone(),
                    three_ds_server_transaction_id: ares.three_ds_server_trans_id.clone(),
                    acs_transaction_id: ares.acs_trans_id.clone(),
                }));
            }
            info!(
                trans_status = ares.trans_status.as_deref().unwrap_or("none"),
                "3DS2 frictionless flow"
            );
            return Ok(ChallengeStep::Frictionless);
        }

        if let Some(url) = self.fallback_redirect_url.as_deref().filter(|u| !u.is_empty()) {
            let url = LooseUrl::parse(url);
            info!(url = %url.redacted(), "3DS2 falling back to browser redirect");
            return Ok(ChallengeStep::FallbackRedirect(url));
        }

        match self.error {
            Some(ref error) => {
                warn!(
                    error_code = error.error_code.as_deref().unwrap_or_default(),
                    error_component = error.error_component.as_deref().unwrap_or_default(),
                    "3DS2 authentication request rejected"
                );
                Err(AuthError::ThreeDS2 {
                    code: error.error_code.clone().unwrap_or_default(),
                    detail: error.error_detail.clone().unwrap_or_default(),
                    description: error.error_description.clone().unwrap_or_default(),
                    component: error.error_component.clone().unwrap_or_default(),
                })
            }
            None => Err(AuthError::InvalidAuthResponse(
                "response has neither ares nor error".to_string(),
            )),
        }
    }
}

/// Final report of the challenge runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The challenge finished with the given `transStatus`
    Completed(String),
    Canceled,
    TimedOut,
    ProtocolError(String),
    RuntimeError(String),
}

impl ChallengeOutcome {
    /// Map the runtime's report onto the attempt status and error
    pub fn into_status(self) -> (AuthCompletionStatus, Option<AuthError>) {
        match self {
            ChallengeOutcome::Completed(status) if status == TRANS_STATUS_AUTHENTICATED => {
                (AuthCompletionStatus::Succeeded, None)
            }
            ChallengeOutcome::Completed(_) => (AuthCompletionStatus::Failed, None),
            ChallengeOutcome::Canceled => (AuthCompletionStatus::Canceled, None),
            ChallengeOutcome::TimedOut => (
                AuthCompletionStatus::Failed,
                Some(AuthError::ChallengeTimedOut),
            ),
            ChallengeOutcome::ProtocolError(message) | ChallengeOutcome::RuntimeError(message) => {
                (
                    AuthCompletionStatus::Failed,
                    Some(AuthError::ChallengeFailed(message)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fingerprint::build_3ds2_fingerprint;
    use crate::types::{SdkChallengeData, ThreeDS2FingerprintData};

    fn areq() -> AuthenticationRequestParameters {
        AuthenticationRequestParameters {
            sdk_app_id: "1.0.0".to_string(),
            sdk_reference_number: "3DS_LOA_SDK_STIN_12345".to_string(),
            sdk_transaction_id: "sdk-trans-1".to_string(),
            device_data: "eyJlbmMiOiJBMTI4Q0JDLUhTMjU2In0".to_string(),
            sdk_ephemeral_public_key: r#"{"kty":"EC","crv":"P-256","x":"abc","y":"def"}"#
                .to_string(),
            message_version: "2.1.0".to_string(),
        }
    }

    fn fingerprint() -> ThreeDS2Fingerprint {
        build_3ds2_fingerprint(&SdkChallengeData::ThreeDS2Fingerprint(
            ThreeDS2FingerprintData {
                source_id: "src_1EceOlCRMbs6FrXf2hqrI1g5".to_string(),
                directory_server_name: "visa".to_string(),
                server_transaction_id: "e64bb72f".to_string(),
                three_ds_method_url: None,
            },
        ))
        .unwrap()
    }

    #[test]
    fn test_auth_params() {
        let config = AuthConfig::new()
            .with_three_ds2_timeout(7)
            .with_fallback_return_url("myapp://fallback");
        let params = ThreeDS2AuthParams::new(&fingerprint(), areq(), &config)
            .to_params()
            .unwrap();

        assert_eq!(params["source"], "src_1EceOlCRMbs6FrXf2hqrI1g5");
        assert_eq!(params["fallback_return_url"], "myapp://fallback");

        let app: JsonValue = serde_json::from_str(&params["app"]).unwrap();
        assert_eq!(
            app,
            json!({
                "sdkAppID": "1.0.0",
                "sdkTransID": "sdk-trans-1",
                "sdkEncData": "eyJlbmMiOiJBMTI4Q0JDLUhTMjU2In0",
                "sdkEphemPubKey": { "kty": "EC", "crv": "P-256", "x": "abc", "y": "def" },
                "sdkMaxTimeout": "07",
                "sdkReferenceNumber": "3DS_LOA_SDK_STIN_12345",
                "messageVersion": "2.1.0",
                "deviceRenderOptions": {
                    "sdkInterface": "03",
                    "sdkUiType": ["01", "02", "03", "04", "05"]
                }
            })
        );
    }

    #[test]
    fn test_auth_params_without_fallback() {
        let params = ThreeDS2AuthParams::new(&fingerprint(), areq(), &AuthConfig::default())
            .to_params()
            .unwrap();
        assert!(!params.contains_key("fallback_return_url"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_auth_params_reject_non_object_key() {
        let mut areq = areq();
        areq.sdk_ephemeral_public_key = "\"just a string\"".to_string();
        let result = ThreeDS2AuthParams::new(&fingerprint(), areq, &AuthConfig::default())
            .to_params();
        assert!(matches!(result, Err(AuthError::InvalidAuthParams(_))));

        let mut malformed = self::areq();
        malformed.sdk_ephemeral_public_key = "{not json".to_string();
        let result = ThreeDS2AuthParams::new(&fingerprint(), malformed, &AuthConfig::default())
            .to_params();
        assert!(matches!(result, Err(AuthError::Serialization(_))));
    }

    #[test]
    fn test_challenge_required() {
        let result = ThreeDS2AuthResult::from_json(&json!({
            "id": "threeds2_1Ecwz3CRMbs6FrXfThtfogua",
            "object": "three_d_secure_2",
            "ares": {
                "acsChallengeMandated": "Y",
                "acsSignedContent": "eyJhbGciOiJFUzI1NiJ9",
                "acsTransID": "dd23c757-211a-4c1b-add5-06a1450a642e",
                "acsURL": null,
                "authenticationType": "02",
                "messageType": "ARes",
                "messageVersion": "2.1.0",
                "sdkTransID": "20c6a2a1-b3ba-4e8d-a1fc-2b2eb1c6c1b6",
                "threeDSServerTransID": "e8ea0b64-13ab-4c5e-8b6e-e6e8a0a2a4bd",
                "transStatus": "C"
            },
            "error": null,
            "source": "src_1Ecve7CRMbs6FrXfm8AxXMIh",
            "state": "challenge_required"
        }))
        .unwrap();

        assert_eq!(
            result.next_step().unwrap(),
            ChallengeStep::Challenge(ChallengeParameters {
                acs_signed_content: Some("eyJhbGciOiJFUzI1NiJ9".to_string()),
                three_ds_server_transaction_id: "e8ea0b64-13ab-4c5e-8b6e-e6e8a0a2a4bd"
                    .to_string(),
                acs_transaction_id: "dd23c757-211a-4c1b-add5-06a1450a642e".to_string(),
            })
        );
    }

    #[test]
    fn test_frictionless() {
        let result = ThreeDS2AuthResult::from_json(&json!({
            "ares": {
                "acsTransID": "acs-1",
                "threeDSServerTransID": "server-1",
                "transStatus": "Y"
            }
        }))
        .unwrap();
        assert_eq!(result.next_step().unwrap(), ChallengeStep::Frictionless);
    }

    #[test]
    fn test_fallback_redirect() {
        let result = ThreeDS2AuthResult::from_json(&json!({
            "ares": null,
            "error": null,
            "fallback_redirect_url": "https://hooks.stripe.com/3d_secure_2_eap/begin_test/src_1Ecve7CRMbs6FrXfm8AxXMIh/src_client_secret_F79yszOBAiuaZTuIhbn3LPUW"
        }))
        .unwrap();

        match result.next_step().unwrap() {
            ChallengeStep::FallbackRedirect(url) => {
                assert_eq!(url.host(), Some("hooks.stripe.com"))
            }
            other => panic!("Expected FallbackRedirect, got {:?}", other),
        }
    }

    #[test]
    fn test_error_response() {
        let result = ThreeDS2AuthResult::from_json(&json!({
            "ares": null,
            "error": {
                "errorCode": "302",
                "errorComponent": "D",
                "errorDescription": "Data could not be decrypted by the receiving system due to technical or other reason.",
                "errorDetail": null,
                "errorMessageType": "AReq",
                "messageType": "Erro",
                "messageVersion": "2.1.0"
            }
        }))
        .unwrap();

        match result.next_step() {
            Err(AuthError::ThreeDS2 {
                code,
                detail,
                component,
                ..
            }) => {
                assert_eq!(code, "302");
                assert_eq!(detail, "");
                assert_eq!(component, "D");
            }
            other => panic!("Expected ThreeDS2 error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_response_is_invalid() {
        let result = ThreeDS2AuthResult::from_json(&json!({})).unwrap();
        assert!(matches!(
            result.next_step(),
            Err(AuthError::InvalidAuthResponse(_))
        ));
    }

    #[test]
    fn test_challenge_outcome_status() {
        assert_eq!(
            ChallengeOutcome::Completed("Y".to_string()).into_status().0,
            AuthCompletionStatus::Succeeded
        );
        assert_eq!(
            ChallengeOutcome::Completed("N".to_string()).into_status().0,
            AuthCompletionStatus::Failed
        );
        assert_eq!(
            ChallengeOutcome::Canceled.into_status().0,
            AuthCompletionStatus::Canceled
        );

        let (status, error) = ChallengeOutcome::TimedOut.into_status();
        assert_eq!(status, AuthCompletionStatus::Failed);
        assert!(matches!(error, Some(AuthError::ChallengeTimedOut)));

        let (status, error) = ChallengeOutcome::ProtocolError("bad message".to_string()).into_status();
        assert_eq!(status, AuthCompletionStatus::Failed);
        assert!(matches!(error, Some(AuthError::ChallengeFailed(m)) if m == "bad message"));
    }
}
