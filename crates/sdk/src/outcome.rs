//! Post-authentication result.
//!
//! A finished flow only tells whether the customer came back. The payment's real state is
//! known after the intent is fetched again with its client secret.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    challenge::ChallengeOutcome,
    error::{AuthError, Result},
    matcher::RedirectContext,
    orchestrator::{self, AuthFlow, AuthOutcome, AuthPlan, SurfaceEvent, SurfaceHandle},
    types::{AuthCompletionStatus, AuthConfig, Intent, IntentStatus},
};

/// Fetches intents from the payments backend
pub trait IntentRetriever {
    /// Retrieve the intent a client secret belongs to
    fn retrieve(&self, client_secret: &str) -> impl Future<Output = Result<Intent>> + Send;
}

/// Outcome of an authenticated intent, as reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
    Unknown,
}

impl Outcome {
    /// Outcome decided by the flow itself, if any.
    ///
    /// A customer returning from the surface is not an outcome on its own, it has to be
    /// confirmed by the intent status.
    pub fn from_flow(status: AuthCompletionStatus, error: Option<&AuthError>) -> Option<Self> {
        match (status, error) {
            (AuthCompletionStatus::Failed, Some(AuthError::ChallengeTimedOut)) => {
                Some(Outcome::TimedOut)
            }
            (AuthCompletionStatus::Failed, _) => Some(Outcome::Failed),
            (AuthCompletionStatus::Canceled, _) => Some(Outcome::Canceled),
            (AuthCompletionStatus::Succeeded | AuthCompletionStatus::Pending, _) => None,
        }
    }

    /// Outcome implied by an intent status
    pub fn from_status(status: IntentStatus) -> Self {
        match status {
            IntentStatus::RequiresAction | IntentStatus::Canceled => Outcome::Canceled,
            IntentStatus::RequiresPaymentMethod => Outcome::Failed,
            IntentStatus::Succeeded
            | IntentStatus::RequiresCapture
            | IntentStatus::RequiresConfirmation => Outcome::Succeeded,
            IntentStatus::Processing | IntentStatus::Unknown => Outcome::Unknown,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Canceled => write!(f, "canceled"),
            Outcome::TimedOut => write!(f, "timed_out"),
            Outcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Re-fetched intent together with its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent: Intent,
    pub outcome: Outcome,
}

impl IntentResult {
    /// An explicit flow outcome wins over the intent status
    pub fn new(intent: Intent, flow_outcome: Option<Outcome>) -> Self {
        let outcome = flow_outcome.unwrap_or_else(|| Outcome::from_status(intent.status));
        Self { intent, outcome }
    }
}

/// Drives authentication of intents and resolves their final result
pub struct Authenticator<R> {
    retriever: R,
    config: AuthConfig,
}

impl<R: IntentRetriever> Authenticator<R> {
    pub fn new(retriever: R, config: AuthConfig) -> Self {
        Self { retriever, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Decide how to authenticate an intent
    pub fn plan(&self, intent: &Intent) -> AuthPlan {
        orchestrator::start(intent)
    }

    /// Create a redirect flow and the event stream a browser surface reports to
    pub fn redirect_flow(
        &self,
        context: RedirectContext,
    ) -> (
        AuthFlow,
        SurfaceHandle,
        tokio::sync::mpsc::Receiver<SurfaceEvent>,
    ) {
        let (handle, events) = orchestrator::channel(&self.config);
        (AuthFlow::new(context, self.config.clone()), handle, events)
    }

    /// Re-fetch the intent of a finished redirect flow
    pub async fn finish(&self, outcome: &AuthOutcome) -> Result<IntentResult> {
        let flow_outcome = Outcome::from_flow(outcome.status, outcome.error.as_ref());
        self.resolve(&outcome.client_secret, flow_outcome).await
    }

    /// Re-fetch the intent after a 3DS2 challenge
    pub async fn finish_challenge(
        &self,
        client_secret: &str,
        challenge: ChallengeOutcome,
    ) -> Result<IntentResult> {
        let (status, error) = challenge.into_status();
        let flow_outcome = Outcome::from_flow(status, error.as_ref());
        self.resolve(client_secret, flow_outcome).await
    }

    async fn resolve(
        &self,
        client_secret: &str,
        flow_outcome: Option<Outcome>,
    ) -> Result<IntentResult> {
        let intent = self.retriever.retrieve(client_secret).await?;
        let result = IntentResult::new(intent, flow_outcome);
        info!(
            intent_id = %result.intent.id,
            intent_status = %result.intent.status,
            outcome = %result.outcome,
            "Authentication result"
        );
        Ok(result)
    }
}
