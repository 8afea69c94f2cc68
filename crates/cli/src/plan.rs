use std::{fs, path::Path, path::PathBuf};

use clap::Parser;
use console::style;
use payauth_sdk::{
    AuthPlan, Intent, SdkChallengeData, build_3ds2_fingerprint, start,
};
use serde_json::{Value as JsonValue, json};

use crate::Context;

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct PlanCommand {
    /// Intent JSON file, as returned by the backend
    pub intent: PathBuf,

    /// Output format: json or pretty (default: pretty)
    #[arg(long = "format", short = 'f', default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            _ => Err(format!(
                "Invalid format: {}. Valid options are: json, pretty",
                s
            )),
        }
    }
}

/// Read and parse an intent file
pub fn load_intent(path: &Path) -> Result<Intent, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    content
        .parse::<Intent>()
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

impl PlanCommand {
    pub fn execute(&self, _ctx: &Context) -> Result<(), String> {
        let intent = load_intent(&self.intent)?;
        let plan = start(&intent);
        let summary = describe(&intent, &plan);

        match self.format {
            OutputFormat::Json => {
                let output = serde_json::to_string_pretty(&summary)
                    .map_err(|e| format!("Failed to serialize plan: {}", e))?;
                println!("{}", output);
            }
            OutputFormat::Pretty => print_pretty(&summary),
        }
        Ok(())
    }
}

/// Summarise a plan. Client secrets and URL query strings are left out.
pub fn describe(intent: &Intent, plan: &AuthPlan) -> JsonValue {
    let mut summary = json!({
        "intent": intent.id,
        "status": intent.status.to_string(),
        "next_action": intent.next_action_type(),
    });

    let details = match plan {
        AuthPlan::NoActionNeeded => json!({ "plan": "no_action_needed" }),
        AuthPlan::Redirect { url, context } => json!({
            "plan": "redirect",
            "url": url.redacted(),
            "return_url": context.return_url.as_ref().map(|u| u.redacted()),
        }),
        AuthPlan::ChallengeSdk(sdk_data) => describe_challenge(sdk_data),
    };

    if let (Some(summary), JsonValue::Object(details)) = (summary.as_object_mut(), details) {
        summary.extend(details);
    }
    summary
}

fn describe_challenge(sdk_data: &SdkChallengeData) -> JsonValue {
    match sdk_data {
        SdkChallengeData::ThreeDS1 { .. } => json!({
            "plan": "challenge_sdk",
            "challenge": sdk_data.type_tag(),
            "stripe_js": sdk_data.stripe_js().map(|u| u.redacted()),
        }),
        SdkChallengeData::ThreeDS2Fingerprint(_) => match build_3ds2_fingerprint(sdk_data) {
            Ok(fingerprint) => json!({
                "plan": "challenge_sdk",
                "challenge": sdk_data.type_tag(),
                "source": fingerprint.source_id,
                "directory_server": fingerprint.directory_server.name(),
                "directory_server_id": fingerprint.directory_server_id,
                "algorithm": fingerprint.directory_server_encryption.algorithm,
                "key_id": fingerprint.directory_server_encryption.key_id,
            }),
            Err(e) => json!({
                "plan": "challenge_sdk",
                "challenge": sdk_data.type_tag(),
                "error": e.to_string(),
            }),
        },
    }
}

fn print_pretty(summary: &JsonValue) {
    let Some(fields) = summary.as_object() else {
        return;
    };
    println!();
    for (key, value) in fields {
        let value = match value {
            JsonValue::Null => style("-".to_string()).dim(),
            JsonValue::String(s) if key == "error" => style(s.clone()).red(),
            JsonValue::String(s) => style(s.clone()).green(),
            other => style(other.to_string()).green(),
        };
        println!("  {:<22}{}", style(format!("{}:", key)).bold(), value);
    }
    println!();
}
