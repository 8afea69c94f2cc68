//! Redirect completion matching.
//!
//! Decides, for every URL a browser surface navigates to, whether the customer has come back
//! from the authentication page. Rules are checked in order and the first match wins:
//!
//! 1. the SDK-internal return sentinel,
//! 2. the backend's completion endpoints (prefix match, a query string is appended),
//! 3. scheme and host of the app-registered return URL, when one was given,
//! 4. otherwise, the intent's client secret echoed back as a query parameter.
//!
//! Matching is a pure function of the [`RedirectContext`] and the observed URL.

use crate::types::LooseUrl;

/// Synthetic URL some challenge pages redirect to when they are done
pub const PREDEFINED_RETURN_URL: &str = "stripejs://use_stripe_sdk/return_url";

/// Backend endpoints that terminate a redirect flow
pub const COMPLETION_URL_PREFIXES: [&str; 2] = [
    "https://hooks.stripe.com/redirect/complete/",
    "https://hooks.stripe.com/3d_secure/complete/",
];

pub const PARAM_PAYMENT_CLIENT_SECRET: &str = "payment_intent_client_secret";
pub const PARAM_SETUP_CLIENT_SECRET: &str = "setup_intent_client_secret";

/// Result of matching one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the surface open
    Continue,

    /// The customer is back; close the surface
    Completed,
}

/// What the caller knew when the redirect started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectContext {
    /// Client secret the intent was confirmed with
    pub client_secret: String,

    /// Return URL registered by the app, if any
    pub return_url: Option<LooseUrl>,
}

impl RedirectContext {
    pub fn new(client_secret: impl Into<String>, return_url: Option<LooseUrl>) -> Self {
        Self {
            client_secret: client_secret.into(),
            return_url,
        }
    }

    /// Match an observed URL against this context
    pub fn evaluate(&self, observed: &LooseUrl) -> Decision {
        evaluate(self, observed)
    }
}

/// Decide whether `observed` ends the redirect flow described by `context`
pub fn evaluate(context: &RedirectContext, observed: &LooseUrl) -> Decision {
    if observed.as_str() == PREDEFINED_RETURN_URL {
        return Decision::Completed;
    }

    if COMPLETION_URL_PREFIXES
        .iter()
        .any(|prefix| observed.as_str().starts_with(prefix))
    {
        return Decision::Completed;
    }

    if let Some(ref return_url) = context.return_url {
        return decide(is_same_app(return_url, observed));
    }

    let echoed_secret = observed
        .query_param(PARAM_PAYMENT_CLIENT_SECRET)
        .or_else(|| observed.query_param(PARAM_SETUP_CLIENT_SECRET));

    match echoed_secret {
        Some(secret) => decide(secret == context.client_secret),
        None => Decision::Continue,
    }
}

fn decide(completed: bool) -> Decision {
    if completed {
        Decision::Completed
    } else {
        Decision::Continue
    }
}

// Unparsable or host-less return URLs never match.
fn is_same_app(return_url: &LooseUrl, observed: &LooseUrl) -> bool {
    let (Some(expected), Some(actual)) = (return_url.url(), observed.url()) else {
        return false;
    };
    if expected.scheme() != actual.scheme() {
        return false;
    }
    match (expected.host_str(), actual.host_str()) {
        (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
        _ => false,
    }
}
