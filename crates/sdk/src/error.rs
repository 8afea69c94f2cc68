use thiserror::Error;

/// Errors that can occur while authenticating an intent
#[derive(Error, Debug)]
pub enum AuthError {
    /// 3DS2 parameters were requested from data that is not a 3DS2 fingerprint
    #[error("Unsupported challenge version: expected stripe_3ds2_fingerprint data, received '{0}'")]
    UnsupportedChallengeVersion(String),

    /// The network named by the backend has no registered directory server
    #[error("Unknown directory server: '{0}'")]
    UnknownDirectoryServer(String),

    /// The challenge runtime supplied unusable authentication request parameters
    #[error("Invalid 3DS2 authentication parameters: {0}")]
    InvalidAuthParams(String),

    /// The 3DS2 authentication response carried neither a result nor an error
    #[error("Invalid 3DS2 authentication response: {0}")]
    InvalidAuthResponse(String),

    /// The backend rejected the 3DS2 authentication request
    #[error(
        "Error encountered during 3DS2 authentication request. Code: {code}, Detail: {detail}, Description: {description}, Component: {component}"
    )]
    ThreeDS2 {
        code: String,
        detail: String,
        description: String,
        component: String,
    },

    /// The challenge runtime gave up waiting for the customer
    #[error("3DS2 challenge timed out")]
    ChallengeTimedOut,

    /// The challenge runtime reported a protocol or runtime failure
    #[error("3DS2 challenge failed: {0}")]
    ChallengeFailed(String),

    /// The browser surface reported a failure
    #[error("Browser surface error: {0}")]
    Surface(String),

    /// Re-fetching the intent after authentication failed
    #[error("Intent retrieval error: {0}")]
    Retrieval(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event channel of a finished or dropped flow
    #[error("Authentication flow closed")]
    FlowClosed,
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
