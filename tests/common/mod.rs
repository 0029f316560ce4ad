//! Shared test utilities and fixtures
//!
//! Every test gets its own fixture directory and talks to the mock server
//! built alongside the `lspcheck` binary.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use lspcheck_engine::{Fixtures, RunnerOptions, SuiteEnv};
use lspcheck_lsp::{ServerCommand, TransportOptions};

/// Upper bound for any diagnostics wait, so a broken test fails instead of
/// hanging.
pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

/// Lib with one unused variable and a function to jump to.
pub const LIB: &str = "\
library Lib {
    fn add(uint a, uint b) {}
//     ^^^ @add
    uint unusedLocal;
//       ^^^^^^^^^^^ @unused
}
";

/// Calls into lib.
pub const MAIN: &str = "\
contract C {
    uint x = add(1, 2);
//           ^^^ @call
}
";

pub fn mockls(args: &[&str]) -> ServerCommand {
    ServerCommand::new(env!("CARGO_BIN_EXE_lspcheck-mockls"), args.iter().copied())
}

pub fn lspcheck_bin() -> &'static str {
    env!("CARGO_BIN_EXE_lspcheck")
}

/// A temporary directory holding `files` as `<name>.sol`.
pub fn fixture_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        fs::write(dir.path().join(format!("{name}.sol")), text).unwrap();
    }
    dir
}

pub fn suite_env(dir: &Path) -> SuiteEnv {
    let fixtures = Fixtures::open(dir, "sol").unwrap();
    SuiteEnv::new(fixtures, "Solidity").with_diagnostics_timeout(Some(WAIT_LIMIT))
}

pub fn runner_options(server: ServerCommand) -> RunnerOptions {
    let mut options = RunnerOptions::new(server);
    options.transport = TransportOptions {
        trace_io: false,
        shutdown_timeout: Duration::from_secs(2),
    };
    options
}
