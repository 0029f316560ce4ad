//! Conformance test engine.
//!
//! - [`markers`]: expected ranges from fixture annotations
//! - [`oracle`]: structural assertions with pass/fail counting
//! - [`registry`]: the static name to test table
//! - [`runner`]: per-test server lifecycle and the run summary
//!
//! A test body is a [`TestFn`] receiving a [`TestContext`].

pub mod context;
pub mod fixtures;
pub mod markers;
pub mod oracle;
pub mod registry;
pub mod report;
pub mod runner;

pub use context::{SuiteEnv, TestContext};
pub use fixtures::{FixtureError, Fixtures};
pub use markers::{MarkerError, MarkerTable};
pub use oracle::{Assertions, ExpectationFailed};
pub use registry::{RegistryError, TestFn, TestFuture, TestRegistry};
pub use runner::{Runner, RunnerOptions, Summary};
