//! lspcheck CLI - runs the compiler LSP conformance suite.
//!
//! ```text
//! flags + config file -> HarnessConfig -> Fixtures + SuiteEnv -> Runner::run(registry)
//!                                                                   |
//!                                                                   v
//!                                                        Summary -> exit status
//! ```
//!
//! Every selected test gets its own server process. Configuration problems
//! (unreadable config, bad glob, missing fixture directory) exit with 1
//! before any test runs. Otherwise the exit status is the run summary's.

mod suite;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lspcheck_config::HarnessConfig;
use lspcheck_engine::{Fixtures, Runner, RunnerOptions, SuiteEnv};
use lspcheck_lsp::{IO_TRACE_TARGET, ServerCommand, TransportOptions};

/// Exit status for failures that happen before any test runs.
const SETUP_FAILURE: u8 = 1;

/// Solidity LSP test suite.
#[derive(Parser, Debug)]
#[command(name = "lspcheck", version, about)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "CLI flags are inherently boolean"
)]
struct Cli {
    /// Language server binary to test against. Overrides `[server].command`.
    server: Option<String>,

    /// Project root containing the fixture directory.
    project_root: Option<PathBuf>,

    /// Terminate the run on the first failing test.
    #[arg(short = 'f', long)]
    fail_fast: bool,

    /// Trace every JSON-RPC frame exchanged with the server.
    #[arg(short = 'T', long)]
    trace_io: bool,

    /// Print passing assertions too.
    #[arg(short = 'v', long)]
    print_assertions: bool,

    /// Only run tests whose name matches this glob.
    #[arg(short = 't', long, value_name = "GLOB")]
    test_pattern: Option<String>,

    /// Configuration file. Must exist when given.
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the selected test names and exit.
    #[arg(long)]
    list: bool,
}

impl Cli {
    /// Flags override the file; the file overrides defaults.
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(server) = &self.server {
            config.server.command.clone_from(server);
        }
        if let Some(root) = &self.project_root {
            config.suite.project_root.clone_from(root);
        }
        if let Some(pattern) = &self.test_pattern {
            config.suite.test_pattern.clone_from(pattern);
        }
        config.suite.fail_fast |= self.fail_fast;
        config.suite.trace_io |= self.trace_io;
        config.suite.print_assertions |= self.print_assertions;
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_path) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("lspcheck: {e:#}");
            return ExitCode::from(SETUP_FAILURE);
        }
    };
    init_tracing(config.suite.trace_io);
    match &config_path {
        Some(path) => tracing::debug!(path = %path.display(), "configuration loaded"),
        None => tracing::debug!("no configuration file, using defaults"),
    }

    match run(&cli, config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("setup failed: {e:?}");
            eprintln!("lspcheck: {e:#}");
            ExitCode::from(SETUP_FAILURE)
        }
    }
}

/// The merged configuration and the file it was read from, if any.
fn load_config(cli: &Cli) -> Result<(HarnessConfig, Option<PathBuf>)> {
    let (mut config, path) = HarnessConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    Ok((config, path))
}

fn run(cli: &Cli, config: HarnessConfig) -> Result<u8> {
    let registry = suite::registry().context("building the test registry")?;

    if cli.list {
        for (name, _) in registry.select(&config.suite.test_pattern)? {
            println!("{name}");
        }
        return Ok(0);
    }

    let fixtures_dir = config.suite.fixtures_path();
    let fixtures = Fixtures::open(&fixtures_dir, config.suite.fixture_extension.as_str())
        .with_context(|| format!("opening fixtures in {}", fixtures_dir.display()))?;

    let env = SuiteEnv::new(fixtures, config.server.language_id.as_str())
        .with_diagnostics_timeout(config.server.diagnostics_timeout());

    let mut options = RunnerOptions::new(ServerCommand::new(
        config.server.command.as_str(),
        config.server.args.iter().map(String::as_str),
    ));
    options.transport = TransportOptions {
        trace_io: config.suite.trace_io,
        shutdown_timeout: config.server.shutdown_timeout(),
    };
    options.test_pattern.clone_from(&config.suite.test_pattern);
    options.fail_fast = config.suite.fail_fast;
    options.print_assertions = config.suite.print_assertions;

    tracing::debug!(
        server = %options.server.program.display(),
        fixtures = %env.fixtures.dir().display(),
        "starting run"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the async runtime")?;
    let runner = Runner::new(options, env);
    let summary = runtime.block_on(runner.run(&registry))?;

    // Give the server stderr forwarders a moment to drain before exit.
    runtime.shutdown_timeout(Duration::from_millis(100));
    Ok(summary.exit_code())
}

/// Log to stderr. `RUST_LOG` wins; the default shows warnings only.
///
/// With `trace_io`, the frame mirror target is enabled on top of whatever
/// filter is in effect.
fn init_tracing(trace_io: bool) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if trace_io {
        match format!("{IO_TRACE_TARGET}=info").parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("lspcheck: cannot enable I/O tracing: {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(env_filter)
        .init();
}
