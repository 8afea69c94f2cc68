use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, Result},
    matcher::{Decision, RedirectContext},
    types::{AuthCompletionStatus, AuthConfig, Intent, LooseUrl, NextAction, SdkChallengeData},
};

/// Backend page that hosts 3DS1 authentication inside a browser surface
pub const THREE_DS_AUTHENTICATE_URL: &str = "https://hooks.stripe.com/three_d_secure/authenticate";

/// Query parameter of the authenticate page carrying its completion URL
const PARAM_RETURN_URL: &str = "return_url";

/// Schemes a browser surface loads itself; anything else belongs to another app
const IN_SURFACE_SCHEMES: [&str; 6] = ["http", "https", "about", "data", "blob", "javascript"];

/// How an intent's next action has to be handled
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPlan {
    /// Nothing the client can act on
    NoActionNeeded,

    /// Open `url` in a browser surface and watch navigations with `context`
    Redirect {
        url: LooseUrl,
        context: RedirectContext,
    },

    /// Hand the payload to a challenge runtime
    ChallengeSdk(SdkChallengeData),
}

/// Decide how to authenticate an intent.
///
/// Unknown next actions are not an error; they produce [`AuthPlan::NoActionNeeded`].
pub fn start(intent: &Intent) -> AuthPlan {
    match intent.next_action {
        None => {
            debug!(intent_id = %intent.id, "Intent has no next action");
            AuthPlan::NoActionNeeded
        }
        Some(NextAction::Unknown(ref type_tag)) => {
            warn!(
                intent_id = %intent.id,
                type_tag = %type_tag,
                "Unsupported next action, nothing to do"
            );
            AuthPlan::NoActionNeeded
        }
        Some(NextAction::UseStripeSdk(ref sdk_data)) => {
            info!(
                intent_id = %intent.id,
                sdk_type = %sdk_data.type_tag(),
                "Planning SDK challenge"
            );
            AuthPlan::ChallengeSdk(sdk_data.clone())
        }
        Some(NextAction::RedirectToUrl {
            ref url,
            ref return_url,
        }) => {
            info!(
                intent_id = %intent.id,
                url = %url.redacted(),
                has_return_url = return_url.is_some(),
                "Planning browser redirect"
            );
            AuthPlan::Redirect {
                url: url.clone(),
                context: RedirectContext::new(intent.client_secret.clone(), return_url.clone()),
            }
        }
    }
}

/// Event reported by a browser surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface is about to load a URL
    Navigated(String),

    /// The customer closed the surface
    Dismissed,

    /// The surface failed to load a page
    Error(String),
}

/// Sending half of a flow's event stream, held by the browser surface
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    sender: mpsc::Sender<SurfaceEvent>,
}

impl SurfaceHandle {
    /// Report a navigation
    pub async fn navigated(&self, url: impl Into<String>) -> Result<()> {
        self.send(SurfaceEvent::Navigated(url.into())).await
    }

    /// Report that the customer closed the surface
    pub async fn dismissed(&self) -> Result<()> {
        self.send(SurfaceEvent::Dismissed).await
    }

    /// Report a load failure
    pub async fn error(&self, reason: impl Into<String>) -> Result<()> {
        self.send(SurfaceEvent::Error(reason.into())).await
    }

    /// Send an event; fails once the flow has finished
    pub async fn send(&self, event: SurfaceEvent) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| AuthError::FlowClosed)
    }

    /// Returns true once the flow stopped reading events
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Create the event stream between a browser surface and an [`AuthFlow`]
pub fn channel(config: &AuthConfig) -> (SurfaceHandle, mpsc::Receiver<SurfaceEvent>) {
    let (sender, receiver) = mpsc::channel(config.event_buffer.max(1));
    (SurfaceHandle { sender }, receiver)
}

/// Final state of a redirect flow
#[derive(Debug)]
pub struct AuthOutcome {
    pub attempt_id: Uuid,

    pub status: AuthCompletionStatus,

    /// Set when the flow failed
    pub error: Option<AuthError>,

    /// App URL the surface could not load; the caller should open it externally
    pub hand_off_url: Option<LooseUrl>,

    /// Client secret to re-fetch the intent with
    pub client_secret: String,
}

/// One redirect authentication attempt.
///
/// Consumes [`SurfaceEvent`]s in order until the first terminal decision. Once terminal, the
/// status never changes and later events are dropped.
#[derive(Debug)]
pub struct AuthFlow {
    attempt_id: Uuid,
    context: RedirectContext,
    config: AuthConfig,
    status: Arc<RwLock<AuthCompletionStatus>>,

    /// Completion URL announced by the authenticate page
    completion_url: Option<String>,
    error: Option<AuthError>,
    hand_off_url: Option<LooseUrl>,
}

enum Next {
    Event(Option<SurfaceEvent>),
    DeadlineElapsed,
}

impl AuthFlow {
    pub fn new(context: RedirectContext, config: AuthConfig) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context,
            config,
            status: Arc::new(RwLock::new(AuthCompletionStatus::Pending)),
            completion_url: None,
            error: None,
            hand_off_url: None,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &RedirectContext {
        &self.context
    }

    /// Get the current status
    pub fn status(&self) -> AuthCompletionStatus {
        *self.status.read()
    }

    /// Shared view of the status, readable while [`AuthFlow::run`] is in progress
    pub fn status_handle(&self) -> Arc<RwLock<AuthCompletionStatus>> {
        Arc::clone(&self.status)
    }

    /// Completion URL captured from the authenticate page, if any
    pub fn completion_url(&self) -> Option<&str> {
        self.completion_url.as_deref()
    }

    /// Apply one surface event and return the resulting status
    pub fn on_event(&mut self, event: SurfaceEvent) -> AuthCompletionStatus {
        let status = self.status();
        if status.is_terminal() {
            debug!(attempt_id = %self.attempt_id, "Ignoring event for finished flow");
            return status;
        }

        match event {
            SurfaceEvent::Navigated(raw) => self.on_navigated(LooseUrl::parse(raw)),
            SurfaceEvent::Dismissed => {
                info!(attempt_id = %self.attempt_id, "Browser surface dismissed");
                self.finish(AuthCompletionStatus::Canceled)
            }
            SurfaceEvent::Error(reason) => {
                warn!(attempt_id = %self.attempt_id, reason = %reason, "Browser surface error");
                self.error = Some(AuthError::Surface(reason));
                self.finish(AuthCompletionStatus::Failed)
            }
        }
    }

    /// Cancel the flow from the caller's side
    pub fn cancel(&mut self) -> AuthCompletionStatus {
        if self.status().is_terminal() {
            return self.status();
        }
        self.finish(AuthCompletionStatus::Canceled)
    }

    /// Consume events until the flow is terminal.
    ///
    /// A closed stream or an elapsed [`AuthConfig::flow_timeout`] cancels the flow.
    pub async fn run(mut self, mut events: mpsc::Receiver<SurfaceEvent>) -> AuthOutcome {
        let deadline = self
            .config
            .flow_timeout
            .and_then(|timeout| tokio::time::Instant::now().checked_add(timeout));

        info!(attempt_id = %self.attempt_id, "Redirect flow started");

        while !self.status().is_terminal() {
            let next = match deadline {
                Some(deadline) => tokio::select! {
                    event = events.recv() => Next::Event(event),
                    _ = tokio::time::sleep_until(deadline) => Next::DeadlineElapsed,
                },
                None => Next::Event(events.recv().await),
            };

            match next {
                Next::Event(Some(event)) => {
                    self.on_event(event);
                }
                Next::Event(None) => {
                    info!(attempt_id = %self.attempt_id, "Surface event stream closed");
                    self.cancel();
                }
                Next::DeadlineElapsed => {
                    warn!(attempt_id = %self.attempt_id, "Redirect flow timed out");
                    self.cancel();
                }
            }
        }

        events.close();
        self.into_outcome()
    }

    pub fn into_outcome(self) -> AuthOutcome {
        let status = *self.status.read();
        AuthOutcome {
            attempt_id: self.attempt_id,
            status,
            error: self.error,
            hand_off_url: self.hand_off_url,
            client_secret: self.context.client_secret,
        }
    }

    fn on_navigated(&mut self, url: LooseUrl) -> AuthCompletionStatus {
        debug!(attempt_id = %self.attempt_id, url = %url.redacted(), "Navigation");

        self.capture_completion_url(&url);

        let returned = self
            .completion_url
            .as_deref()
            .is_some_and(|completion_url| continues_from(url.as_str(), completion_url));

        if returned || self.context.evaluate(&url) == Decision::Completed {
            return self.finish(AuthCompletionStatus::Succeeded);
        }

        if url.scheme().is_some_and(|scheme| !IN_SURFACE_SCHEMES.contains(&scheme)) {
            info!(
                attempt_id = %self.attempt_id,
                scheme = url.scheme().unwrap_or_default(),
                "Navigation leaves the browser surface"
            );
            self.hand_off_url = Some(url);
            return self.finish(AuthCompletionStatus::Canceled);
        }

        AuthCompletionStatus::Pending
    }

    fn capture_completion_url(&mut self, url: &LooseUrl) {
        if !url.as_str().starts_with(THREE_DS_AUTHENTICATE_URL) {
            return;
        }
        if let Some(return_url) = url
            .query_param(PARAM_RETURN_URL)
            .filter(|return_url| !return_url.is_empty())
        {
            debug!(
                attempt_id = %self.attempt_id,
                completion_url = %LooseUrl::parse(return_url.as_str()).redacted(),
                "Captured completion URL"
            );
            self.completion_url = Some(return_url);
        }
    }

    fn finish(&mut self, status: AuthCompletionStatus) -> AuthCompletionStatus {
        *self.status.write() = status;
        info!(attempt_id = %self.attempt_id, status = %status, "Redirect flow finished");
        status
    }
}

/// Returns true if `url` is `prefix` or a path, query or fragment below it
fn continues_from(url: &str, prefix: &str) -> bool {
    url.strip_prefix(prefix).is_some_and(|rest| {
        rest.is_empty() || prefix.ends_with('/') || rest.starts_with(['/', '?', '#'])
    })
}
