use std::{fs, path::PathBuf};

use clap::Parser;
use console::style;
use payauth_sdk::{
    AuthCompletionStatus, AuthConfig, AuthFlow, AuthOutcome, AuthPlan, Intent, SurfaceEvent,
    channel, start,
};
use tracing::debug;

use crate::{Context, plan::load_intent};

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct ReplayCommand {
    /// Intent JSON file with a redirect_to_url next action
    pub intent: PathBuf,

    /// Navigation log: one URL per line, `dismiss`, or `error: <reason>`
    pub log: PathBuf,
}

/// Parse one line of a navigation log. Blank lines and `#` comments are skipped.
pub fn parse_line(line: &str) -> Option<SurfaceEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    if line == "dismiss" {
        return Some(SurfaceEvent::Dismissed);
    }
    if let Some(reason) = line.strip_prefix("error:") {
        return Some(SurfaceEvent::Error(reason.trim().to_string()));
    }
    Some(SurfaceEvent::Navigated(line.to_string()))
}

impl ReplayCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let intent = load_intent(&self.intent)?;
        let log = fs::read_to_string(&self.log)
            .map_err(|e| format!("Failed to read {}: {}", self.log.display(), e))?;
        let events: Vec<SurfaceEvent> = log.lines().filter_map(parse_line).collect();

        let outcome = replay(&intent, events, ctx.config.clone()).await?;
        print_outcome(&outcome);
        Ok(())
    }
}

/// Feed recorded events through a redirect flow for `intent`
pub async fn replay(
    intent: &Intent,
    events: Vec<SurfaceEvent>,
    config: AuthConfig,
) -> Result<AuthOutcome, String> {
    let AuthPlan::Redirect { context, .. } = start(intent) else {
        return Err(format!(
            "Intent {} has no redirect_to_url next action (found: {})",
            intent.id,
            intent.next_action_type().unwrap_or("none")
        ));
    };

    let (handle, receiver) = channel(&config);
    let flow = AuthFlow::new(context, config);
    let task = tokio::spawn(flow.run(receiver));

    for (index, event) in events.into_iter().enumerate() {
        if handle.send(event).await.is_err() {
            debug!(line = index + 1, "Flow finished, remaining events dropped");
            break;
        }
    }
    drop(handle);

    task.await
        .map_err(|e| format!("Redirect flow task failed: {}", e))
}

fn print_outcome(outcome: &AuthOutcome) {
    let status = match outcome.status {
        AuthCompletionStatus::Succeeded => style(outcome.status.to_string()).green(),
        AuthCompletionStatus::Failed => style(outcome.status.to_string()).red(),
        AuthCompletionStatus::Canceled | AuthCompletionStatus::Pending => {
            style(outcome.status.to_string()).yellow()
        }
    };

    println!();
    println!("  {:<12}{}", style("Attempt:").bold(), style(outcome.attempt_id).dim());
    println!("  {:<12}{}", style("Status:").bold(), status);
    if let Some(ref error) = outcome.error {
        println!("  {:<12}{}", style("Error:").bold(), style(error).red());
    }
    if let Some(ref url) = outcome.hand_off_url {
        println!("  {:<12}{}", style("Hand-off:").bold(), url);
    }
    println!();
}
