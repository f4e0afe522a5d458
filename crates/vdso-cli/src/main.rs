//! vdsotest entry point.
//!
//! Parses the command line into a run context, registers the linked-in
//! suites, dispatches the requested test, and maps the outcome to an exit
//! status. Diagnostics go to stderr; stdout carries the bench figures,
//! verbose/debug trace lines, and the final summary line.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vdso_common::HarnessConfig;
use vdso_harness::{
    summary_line, ContextOptions, Harness, ModeRegistry, SuiteRegistry, TestContext, TestOutcome,
};

/// Enumerate the registered APIs and test types for the after-help text,
/// so the usage output always matches what `register_all` actually
/// registers.
fn vocabulary_help() -> String {
    let mut suites = SuiteRegistry::new();
    vdso_suites::register_all(&mut suites);
    let modes = ModeRegistry::standard();

    let mut help = String::from("APIs:\n");
    for name in suites.names() {
        help.push_str("  ");
        help.push_str(name);
        help.push('\n');
    }
    help.push_str("\nTest types:\n");
    for name in modes.names() {
        help.push_str("  ");
        help.push_str(name);
        help.push('\n');
    }
    help
}

/// vdsotest command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "vdsotest",
    about = "Benchmark and verify Linux vDSO calls against their syscall fallbacks",
    version,
    after_help = vocabulary_help()
)]
struct Args {
    /// API to test.
    api: String,

    /// Test type to run: verify, bench, or abi.
    test_type: String,

    /// Enable debug output which may perturb bench results; implies --verbose.
    #[arg(long, short = 'g')]
    debug: bool,

    /// Duration of test run in seconds.
    #[arg(long, short = 'd', value_name = "SEC")]
    duration: Option<u64>,

    /// Maximum number of failures before terminating test run.
    #[arg(long, short = 'f', value_name = "NUM")]
    max_fails: Option<u64>,

    /// Enable verbose output.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Path to a harness configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level when neither --verbose nor --debug is given.
    #[arg(long, short = 'l', value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("vdsotest: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let config =
        HarnessConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&args, &config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %args.api,
        test_type = %args.test_type,
        "Starting vdsotest run"
    );

    let duration = args
        .duration
        .map(Duration::from_secs)
        .unwrap_or(config.duration);
    let max_fails = args.max_fails.unwrap_or(config.max_fails);

    let mut ctx = TestContext::new(
        ContextOptions::new(&args.api, &args.test_type)
            .duration(duration)
            .max_fails(max_fails)
            .verbose(args.verbose)
            .debug(args.debug),
    )
    .context("Failed to initialize run context")?;

    let mut suites = SuiteRegistry::new();
    vdso_suites::register_all(&mut suites);
    let harness = Harness::new(suites, ModeRegistry::standard());

    let outcome = harness.dispatch(&mut ctx)?;

    if let Some(line) = summary_line(&args.api, &args.test_type, outcome, ctx.fails()) {
        println!("{line}");
    }

    Ok(match outcome {
        TestOutcome::Fail => ExitCode::FAILURE,
        TestOutcome::Ok | TestOutcome::NoImpl => ExitCode::SUCCESS,
    })
}

/// Initialize the tracing subscriber, writing to stderr so stdout stays
/// reserved for results.
fn init_logging(args: &Args, config: &HarnessConfig) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        args.log_level.as_deref().unwrap_or(&config.log_level)
    };

    let filter = format!(
        "vdsotest={level},vdso_harness={level},vdso_suites={level},vdso_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_positional_parsing() {
        let args = Args::parse_from(["vdsotest", "clock-monotonic", "verify"]);
        assert_eq!(args.api, "clock-monotonic");
        assert_eq!(args.test_type, "verify");
        assert!(!args.verbose);
        assert!(!args.debug);
        assert!(args.duration.is_none());
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "vdsotest",
            "getcpu",
            "bench",
            "-d",
            "10",
            "-f",
            "25",
            "-v",
            "-g",
        ]);
        assert_eq!(args.duration, Some(10));
        assert_eq!(args.max_fails, Some(25));
        assert!(args.verbose);
        assert!(args.debug);
    }

    #[test]
    fn test_args_require_both_positionals() {
        assert!(Args::try_parse_from(["vdsotest", "clock-monotonic"]).is_err());
        assert!(Args::try_parse_from(["vdsotest"]).is_err());
    }

    #[test]
    fn test_args_reject_extra_positionals() {
        assert!(Args::try_parse_from(["vdsotest", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_vocabulary_help_tracks_registration() {
        let help = vocabulary_help();

        let mut suites = SuiteRegistry::new();
        vdso_suites::register_all(&mut suites);
        for name in suites.names() {
            assert!(help.contains(name), "missing API {name} in:\n{help}");
        }
        for name in ModeRegistry::standard().names() {
            assert!(help.contains(name), "missing test type {name} in:\n{help}");
        }
    }
}
