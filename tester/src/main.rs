//! Platform Test Runner
//!
//! Command-line entry point for the harness:
//! - `wait` gates on service readiness
//! - `order` prints the tier sequence for a set of suite paths
//! - `list` shows the registered suites
//! - `run` gates, sequences and runs suites, then prints a summary

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use shared::HarnessConfig;
use tokio::time::timeout;

use tester::scenarios::SUITES;
use tester::{HarnessContext, ReadinessProber, RunOptions, Tier, run_all, sequence};

#[derive(Parser)]
#[command(name = "tester")]
#[command(about = "Test harness for the e-commerce platform")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Env file layered under the process environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Enable verbose tracing output
    #[arg(long, global = true)]
    verbose: bool,

    /// Overall timeout in seconds
    #[arg(long, global = true, default_value = "1800")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Wait until the readiness services report healthy
    Wait,
    /// Print suite paths in execution order
    Order {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// List registered suites
    List,
    /// Run suites
    Run {
        /// Only run suites of this tier
        #[arg(long)]
        tier: Option<Tier>,

        /// Run only the named suites (repeatable)
        #[arg(long = "suite")]
        suites: Vec<String>,

        /// Do not gate on service readiness
        #[arg(long)]
        skip_readiness: bool,

        /// Per-case timeout in seconds, overriding the tier defaults
        #[arg(long)]
        case_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match &args.command {
        Command::Order { paths } => {
            for path in sequence(paths) {
                println!("{path}");
            }
            return Ok(());
        }
        Command::List => {
            for suite in SUITES {
                println!("{:<32} {:<12} {}", suite.name, suite.tier(), suite.description);
            }
            return Ok(());
        }
        Command::Wait | Command::Run { .. } => {}
    }

    let config = match &args.env_file {
        Some(path) => HarnessConfig::from_env_file(path)?,
        None => HarnessConfig::from_env()?,
    };
    shared::logging::init_tracing(args.verbose || config.verbose, None);

    tracing::info!("🧪 Starting platform test harness");
    tracing::info!("BFF: {}, Timeout: {}s", config.bff_url, args.timeout_secs);

    let overall = Duration::from_secs(args.timeout_secs);
    let outcome = timeout(overall, execute(&args.command, config)).await;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!("🏁 Harness completed successfully");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("❌ Harness failed: {}", e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("⏰ Harness timed out after {}s", args.timeout_secs);
            Err("Harness timeout".into())
        }
    }
}

async fn execute(command: &Command, config: HarnessConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Wait => {
            let prober = ReadinessProber::from_config(&config)?;
            let report = prober.wait_for_services(&config.readiness_descriptors()).await;
            println!("{}", report.render());
            report.into_result()?;
            Ok(())
        }
        Command::Run {
            tier,
            suites,
            skip_readiness,
            case_timeout_secs,
        } => {
            let ctx = HarnessContext::new(config)?;
            let options = RunOptions {
                tier: *tier,
                suites: suites.clone(),
                skip_readiness: *skip_readiness,
                case_timeout: case_timeout_secs.map(Duration::from_secs),
            };
            let summary = run_all(&ctx, &options).await?;
            println!("{}", summary.render());

            if summary.success() {
                Ok(())
            } else {
                let (_, failed, _) = summary.totals();
                Err(format!("{} case(s) failed, {} suite(s) not run", failed, summary.not_run.len()).into())
            }
        }
        Command::Order { .. } | Command::List => Ok(()),
    }
}
