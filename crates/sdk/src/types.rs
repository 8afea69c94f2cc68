use std::time::Duration;

// Re-export shared types from payauth-types
pub use payauth_types::{
    DirectoryServer, DirectoryServerEncryption, Intent, IntentKind, IntentStatus, LooseUrl,
    NextAction, SdkChallengeData, ThreeDS2FingerprintData,
};
use serde::{Deserialize, Serialize};

/// Lower bound of the 3DS2 challenge timeout, in minutes
pub const MIN_THREE_DS2_TIMEOUT_MINUTES: u32 = 5;

/// Upper bound of the 3DS2 challenge timeout (two digits on the wire)
pub const MAX_THREE_DS2_TIMEOUT_MINUTES: u32 = 99;

/// Status of one authentication attempt.
///
/// `Succeeded` means the customer came back from the authentication surface; whether the
/// payment itself succeeded is only known after the intent is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthCompletionStatus {
    /// Waiting for the customer
    Pending,

    /// The customer returned from the authentication surface
    Succeeded,

    /// The surface or challenge reported a failure
    Failed,

    /// The customer dismissed the surface, or the flow was cancelled
    Canceled,
}

impl AuthCompletionStatus {
    /// Returns true once the attempt can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthCompletionStatus::Pending)
    }
}

impl std::fmt::Display for AuthCompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthCompletionStatus::Pending => write!(f, "pending"),
            AuthCompletionStatus::Succeeded => write!(f, "succeeded"),
            AuthCompletionStatus::Failed => write!(f, "failed"),
            AuthCompletionStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Configuration for authentication flows
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Maximum time the customer has to complete a 3DS2 challenge, in minutes
    pub three_ds2_timeout_minutes: u32,

    /// Capacity of the browser surface event channel
    pub event_buffer: usize,

    /// Cancel a redirect flow that has not finished after this long
    pub flow_timeout: Option<Duration>,

    /// URL the backend should send the customer to if the 3DS2 challenge falls back to a
    /// browser redirect
    pub fallback_return_url: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            three_ds2_timeout_minutes: MIN_THREE_DS2_TIMEOUT_MINUTES,
            event_buffer: 256,
            flow_timeout: None,
            fallback_return_url: None,
        }
    }
}

impl AuthConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 3DS2 challenge timeout, clamped to 5..=99 minutes
    pub fn with_three_ds2_timeout(mut self, minutes: u32) -> Self {
        self.three_ds2_timeout_minutes =
            minutes.clamp(MIN_THREE_DS2_TIMEOUT_MINUTES, MAX_THREE_DS2_TIMEOUT_MINUTES);
        self
    }

    /// Set the browser surface event channel capacity
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Cancel redirect flows that take longer than `timeout`
    pub fn with_flow_timeout(mut self, timeout: Duration) -> Self {
        self.flow_timeout = Some(timeout);
        self
    }

    /// Set the 3DS2 fallback return URL
    pub fn with_fallback_return_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_return_url = Some(url.into());
        self
    }
}
