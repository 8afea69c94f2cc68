use clap::Parser;
use console::style;
use payauth_sdk::{Decision, LooseUrl, RedirectContext, evaluate};

use crate::Context;

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct EvaluateCommand {
    /// Client secret the intent was confirmed with
    #[arg(long = "client-secret", short = 'c', env = "PAYAUTH_CLIENT_SECRET")]
    pub client_secret: String,

    /// Return URL registered by the app
    #[arg(long = "return-url", short = 'r', env = "PAYAUTH_RETURN_URL")]
    pub return_url: Option<String>,

    /// Navigation URLs, in the order the browser saw them
    #[arg(required = true)]
    pub urls: Vec<String>,
}

impl EvaluateCommand {
    pub fn execute(&self, _ctx: &Context) -> Result<(), String> {
        let context = self.context();
        for (url, decision) in self.decisions(&context) {
            let label = match decision {
                Decision::Completed => style("completed").green(),
                Decision::Continue => style("continue").dim(),
            };
            println!("{:<10}{}", label, url);
        }
        Ok(())
    }

    fn context(&self) -> RedirectContext {
        RedirectContext::new(
            self.client_secret.clone(),
            self.return_url.as_deref().map(LooseUrl::parse),
        )
    }

    fn decisions<'a>(&'a self, context: &RedirectContext) -> Vec<(&'a str, Decision)> {
        self.urls
            .iter()
            .map(|url| (url.as_str(), evaluate(context, &LooseUrl::parse(url.as_str()))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(return_url: Option<&str>, urls: &[&str]) -> EvaluateCommand {
        EvaluateCommand {
            client_secret: "pi_123_secret_abc".to_string(),
            return_url: return_url.map(str::to_string),
            urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn test_one_decision_per_url() {
        let cmd = command(
            Some("myapp://return"),
            &[
                "https://bank.example.com/acs",
                "myapp://return?foo=bar",
                "stripejs://use_stripe_sdk/return_url",
            ],
        );
        let decisions: Vec<Decision> = cmd
            .decisions(&cmd.context())
            .into_iter()
            .map(|(_, decision)| decision)
            .collect();
        assert_eq!(
            decisions,
            vec![Decision::Continue, Decision::Completed, Decision::Completed]
        );
    }

    #[test]
    fn test_secret_fallback_without_return_url() {
        let cmd = command(
            None,
            &[
                "https://merchant.example.com/cb?payment_intent_client_secret=pi_123_secret_abc",
                "https://merchant.example.com/cb?payment_intent_client_secret=pi_999_secret_abc",
            ],
        );
        let decisions = cmd.decisions(&cmd.context());
        assert_eq!(decisions[0].1, Decision::Completed);
        assert_eq!(decisions[1].1, Decision::Continue);
    }

    #[test]
    fn test_parse_arguments() {
        let cmd = EvaluateCommand::try_parse_from([
            "evaluate",
            "--client-secret",
            "pi_1_secret_2",
            "--return-url",
            "myapp://return",
            "myapp://return?x=1",
        ])
        .unwrap();
        assert_eq!(cmd.client_secret, "pi_1_secret_2");
        assert_eq!(cmd.return_url.as_deref(), Some("myapp://return"));
        assert_eq!(cmd.urls, vec!["myapp://return?x=1".to_string()]);

        assert!(EvaluateCommand::try_parse_from(["evaluate", "--client-secret", "s"]).is_err());
    }
}
