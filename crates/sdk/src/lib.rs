//! Payment authentication SDK
//!
//! This crate handles the client side of intents that need customer authentication before
//! they can complete. It decides what an intent's next action asks for and tracks the
//! authentication until the customer is back.
//!
//! # Overview
//!
//! - [`start`] - Turn an [`Intent`] into an [`AuthPlan`] (nothing to do, browser redirect,
//!   or SDK challenge)
//! - [`build_3ds2_fingerprint`] - Resolve 3DS2 fingerprint data against the directory server
//!   registry
//! - [`evaluate`] - Decide whether a browser navigation ends a redirect flow
//! - [`AuthFlow`] - Consume browser surface events until the flow is terminal
//! - [`Authenticator`] - Re-fetch the intent and report the final [`Outcome`]
//!
//! # Quick Start
//!
//! ```ignore
//! use payauth_sdk::{AuthConfig, AuthPlan, Authenticator, Intent};
//!
//! let authenticator = Authenticator::new(my_backend, AuthConfig::new());
//! let intent = Intent::from_json(&response_body)?;
//!
//! match authenticator.plan(&intent) {
//!     AuthPlan::Redirect { url, context } => {
//!         let (flow, surface, events) = authenticator.redirect_flow(context);
//!
//!         // Hand `surface` to the browser; it reports navigations and dismissal
//!         browser.open(url, surface);
//!
//!         let outcome = flow.run(events).await;
//!         let result = authenticator.finish(&outcome).await?;
//!         println!("{}: {}", result.intent.id, result.outcome);
//!     }
//!     AuthPlan::ChallengeSdk(sdk_data) => {
//!         let fingerprint = payauth_sdk::build_3ds2_fingerprint(&sdk_data)?;
//!         // Start the challenge runtime with `fingerprint`...
//!     }
//!     AuthPlan::NoActionNeeded => {}
//! }
//! ```

pub mod challenge;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod orchestrator;
pub mod outcome;
pub mod types;

// Re-export main types at crate root
pub use challenge::{
    AuthenticationRequestParameters, ChallengeOutcome, ChallengeParameters, ChallengeStep,
    ThreeDS2AuthParams, ThreeDS2AuthResult,
};
pub use error::{AuthError, Result};
pub use fingerprint::{ThreeDS2Fingerprint, build_3ds2_fingerprint};
pub use matcher::{Decision, RedirectContext, evaluate};
pub use orchestrator::{
    AuthFlow, AuthOutcome, AuthPlan, SurfaceEvent, SurfaceHandle, channel, start,
};
pub use outcome::{Authenticator, IntentResult, IntentRetriever, Outcome};
pub use types::{
    AuthCompletionStatus, AuthConfig, DirectoryServer, DirectoryServerEncryption, Intent,
    IntentKind, IntentStatus, LooseUrl, NextAction, SdkChallengeData, ThreeDS2FingerprintData,
};
pub use payauth_types::parse_next_action;
