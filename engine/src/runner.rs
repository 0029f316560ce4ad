//! Test orchestrator.
//!
//! Runs the selected tests in name order. Every test gets a freshly spawned
//! server, which is shut down when the test ends, whether it passed, failed,
//! returned an error, or panicked.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use lspcheck_lsp::{LspClient, ServerCommand, Transport, TransportOptions};
use lspcheck_types::Counter;

use crate::context::{SuiteEnv, TestContext};
use crate::oracle::{Assertions, ExpectationFailed};
use crate::registry::{RegistryError, TestFn, TestRegistry};
use crate::report;

/// Largest process exit status the summary maps to.
pub const MAX_EXIT_CODE: u8 = 127;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub server: ServerCommand,
    pub transport: TransportOptions,
    /// Glob over bare test names.
    pub test_pattern: String,
    /// Stop at the first failing test.
    pub fail_fast: bool,
    /// Print passing assertions as well as failing ones.
    pub print_assertions: bool,
}

impl RunnerOptions {
    pub fn new(server: ServerCommand) -> Self {
        Self {
            server,
            transport: TransportOptions::default(),
            test_pattern: "*".to_string(),
            fail_fast: false,
            print_assertions: false,
        }
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub tests: Counter,
    pub assertions: Counter,
}

impl Summary {
    /// `min(max(failed tests, failed assertions), 127)`.
    pub fn exit_code(&self) -> u8 {
        let failed = self.tests.failed.max(self.assertions.failed);
        u8::try_from(failed).map_or(MAX_EXIT_CODE, |code| code.min(MAX_EXIT_CODE))
    }

    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// How a single test ended.
enum Outcome {
    Passed,
    Expectation(ExpectationFailed),
    Error(anyhow::Error),
    Panicked(String),
}

pub struct Runner {
    options: RunnerOptions,
    env: SuiteEnv,
}

impl Runner {
    pub fn new(options: RunnerOptions, env: SuiteEnv) -> Self {
        Self { options, env }
    }

    /// Run every test matching the pattern and print the summary.
    ///
    /// Only an invalid pattern fails the run itself; test failures are
    /// counted in the returned summary.
    pub async fn run(&self, registry: &TestRegistry) -> Result<Summary, RegistryError> {
        let selected = registry.select(&self.options.test_pattern)?;
        report::pattern_notice(&self.options.test_pattern);
        tracing::debug!(
            selected = selected.len(),
            registered = registry.len(),
            "starting suite"
        );

        let mut tests = Counter::default();
        let mut assertions = Assertions::new(self.options.print_assertions);

        for (name, test) in selected {
            report::test_begin(name);
            let outcome = self.run_one(test, &mut assertions).await;
            let passed = matches!(outcome, Outcome::Passed);
            record_outcome(name, outcome);
            tests.record(passed);

            if !passed && self.options.fail_fast {
                tracing::info!("fail-fast: stopping after `{name}`");
                break;
            }
        }

        let summary = Summary {
            tests,
            assertions: assertions.counter(),
        };
        report::summary(summary.tests, summary.assertions);
        Ok(summary)
    }

    async fn run_one(&self, test: TestFn, assertions: &mut Assertions) -> Outcome {
        let mut transport = match Transport::spawn(&self.options.server, self.options.transport) {
            Ok(transport) => transport,
            Err(e) => return Outcome::Error(e.into()),
        };

        let result = {
            let client = LspClient::new(transport.connection())
                .with_diagnostics_timeout(self.env.diagnostics_timeout);
            let mut ctx = TestContext::new(client, assertions, &self.env);
            AssertUnwindSafe(test(&mut ctx)).catch_unwind().await
        };

        transport.shutdown().await;

        match result {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(e)) => match e.downcast::<ExpectationFailed>() {
                Ok(failure) => Outcome::Expectation(failure),
                Err(e) => Outcome::Error(e),
            },
            Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

fn record_outcome(name: &str, outcome: Outcome) {
    match outcome {
        Outcome::Passed => tracing::debug!("`{name}` passed"),
        Outcome::Expectation(failure) => {
            tracing::debug!("`{name}` failed assertion {}", failure.index);
            report::failure(&failure.to_string());
        }
        Outcome::Error(e) => {
            tracing::error!("`{name}` aborted: {e:?}");
            report::failure(&format!("Unhandled error caught: {e:#}"));
        }
        Outcome::Panicked(message) => {
            tracing::error!("`{name}` panicked: {message}");
            report::failure(&format!("Test panicked: {message}"));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
