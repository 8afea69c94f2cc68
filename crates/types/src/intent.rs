//! Payment and setup intents as returned by the backend.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    loose_url::LooseUrl,
    next_action::{NextAction, SdkChallengeData, deserialize_next_action},
};

/// Errors raised while reading an intent object
#[derive(Error, Debug)]
pub enum IntentParseError {
    /// The payload is not valid JSON or lacks a required intent field
    #[error("Invalid intent: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Intent status
///
/// See <https://stripe.com/docs/api/payment_intents/object#payment_intent_object-status>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresAction,
    RequiresConfirmation,
    RequiresPaymentMethod,
    RequiresCapture,
    Processing,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentStatus::RequiresAction => write!(f, "requires_action"),
            IntentStatus::RequiresConfirmation => write!(f, "requires_confirmation"),
            IntentStatus::RequiresPaymentMethod => write!(f, "requires_payment_method"),
            IntentStatus::RequiresCapture => write!(f, "requires_capture"),
            IntentStatus::Processing => write!(f, "processing"),
            IntentStatus::Succeeded => write!(f, "succeeded"),
            IntentStatus::Canceled => write!(f, "canceled"),
            IntentStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which kind of intent an object is, from its `object` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    PaymentIntent,
    SetupIntent,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A payment or setup intent.
///
/// Intents are never mutated; re-polling the backend produces a new value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Intent {
    pub id: String,

    #[serde(rename = "object", default)]
    pub kind: IntentKind,

    pub client_secret: String,

    pub status: IntentStatus,

    #[serde(default, deserialize_with = "deserialize_next_action")]
    pub next_action: Option<NextAction>,

    /// Amount in the smallest currency unit (payment intents only)
    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub livemode: bool,
}

impl Intent {
    /// Build an intent from an already parsed JSON object
    pub fn from_json(value: &JsonValue) -> Result<Self, IntentParseError> {
        Ok(Self::deserialize(value)?)
    }

    /// Returns true if the customer must act before the intent can proceed
    pub fn requires_action(&self) -> bool {
        self.status == IntentStatus::RequiresAction
    }

    /// Returns true if the intent is waiting for confirmation
    pub fn requires_confirmation(&self) -> bool {
        self.status == IntentStatus::RequiresConfirmation
    }

    /// The `type` tag of the pending next action
    pub fn next_action_type(&self) -> Option<&str> {
        self.next_action.as_ref().map(NextAction::type_tag)
    }

    /// Redirect target and return URL of a `redirect_to_url` action
    pub fn redirect_data(&self) -> Option<(&LooseUrl, Option<&LooseUrl>)> {
        match &self.next_action {
            Some(NextAction::RedirectToUrl { url, return_url }) => Some((url, return_url.as_ref())),
            _ => None,
        }
    }

    /// Challenge data of a `use_stripe_sdk` action
    pub fn sdk_data(&self) -> Option<&SdkChallengeData> {
        match &self.next_action {
            Some(NextAction::UseStripeSdk(data)) => Some(data),
            _ => None,
        }
    }
}

impl FromStr for Intent {
    type Err = IntentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
