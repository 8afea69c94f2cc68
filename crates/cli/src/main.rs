use std::{process, time::Duration};

use clap::{Parser, Subcommand};
use payauth_sdk::AuthConfig;
use tracing_subscriber::EnvFilter;

mod evaluate;
mod plan;
mod replay;

#[derive(Clone, Debug)]
pub struct Context {
    pub config: AuthConfig,
}

impl Context {
    pub fn new(config: AuthConfig) -> Self {
        Context { config }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "payauth - Inspect and replay payment authentication flows", long_about = None)]
struct Opts {
    /// Log filter (e.g. "info", "payauth_sdk=debug")
    #[arg(
        long = "log-level",
        global = true,
        env = "PAYAUTH_LOG",
        default_value = "warn"
    )]
    log_level: String,

    /// Cancel redirect flows that take longer than this many seconds
    #[arg(long = "flow-timeout", global = true)]
    flow_timeout: Option<u64>,

    /// 3DS2 challenge timeout in minutes (5 to 99)
    #[arg(long = "three-ds2-timeout", global = true, default_value = "5")]
    three_ds2_timeout: u32,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Show how an intent's next action would be handled
    Plan(plan::PlanCommand),
    /// Match navigation URLs against a redirect context
    Evaluate(evaluate::EvaluateCommand),
    /// Replay a recorded browser navigation log through a redirect flow
    Replay(replay::ReplayCommand),
}

#[tokio::main]
async fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    init_tracing(&opts.log_level);

    let mut config = AuthConfig::new().with_three_ds2_timeout(opts.three_ds2_timeout);
    if let Some(secs) = opts.flow_timeout {
        config = config.with_flow_timeout(Duration::from_secs(secs));
    }
    let ctx = Context::new(config);

    if let Err(e) = handle_command(opts.command, &ctx).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Log to stderr so command output on stdout stays machine-readable
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Warning: invalid log filter '{}': {}", filter, e);
        EnvFilter::new("warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_command(command: Command, ctx: &Context) -> Result<(), String> {
    match command {
        Command::Plan(cmd) => cmd.execute(ctx),
        Command::Evaluate(cmd) => cmd.execute(ctx),
        Command::Replay(cmd) => cmd.execute(ctx).await,
    }
}
