//! Wire model for customer-present payment authentication.
//!
//! This crate turns backend intent objects into typed values:
//!
//! - [`Intent`] - a payment or setup intent, with its status and pending [`NextAction`]
//! - [`NextAction`] - what the client must do next (redirect, in-SDK challenge, or unknown)
//! - [`DirectoryServer`] - the compile-time table of 3DS2 directory servers
//! - [`LooseUrl`] - a redirect URL that survives being unparsable
//!
//! Everything here is pure and synchronous: parsing the same bytes twice yields equal values.

pub mod directory_server;
pub mod intent;
pub mod loose_url;
pub mod next_action;

pub use directory_server::{ALGORITHM_RSA, DirectoryServer, DirectoryServerEncryption};
pub use intent::{Intent, IntentKind, IntentParseError, IntentStatus};
pub use loose_url::LooseUrl;
pub use next_action::{NextAction, SdkChallengeData, ThreeDS2FingerprintData, parse_next_action};
