//! Whole runs against the mock server with hand-built registries.

use std::time::Duration;

use lspcheck_engine::{RegistryError, Runner, TestContext, TestFn, TestFuture, TestRegistry};
use lspcheck_types::{Counter, Location};

use crate::common::{LIB, MAIN, fixture_dir, mockls, runner_options, suite_env};

fn unused_warning<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait("lib", 1).await?;
        let unused = ctx.markers("lib")?.get("unused")?;
        ctx.expect_equal(&reports.len(), &1, "one report")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 2072, unused)?;
        Ok(())
    })
}

fn goto_add<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        ctx.open_fixture_and_wait("lib", 1).await?;
        ctx.open_fixture_and_wait("main", 2).await?;
        let main = ctx.fixture_uri("main")?;
        let call = ctx.markers("main")?.get("call")?;
        let add = Location::new(ctx.fixture_uri("lib")?, ctx.markers("lib")?.get("add")?);
        ctx.expect_goto_definition(&main, call.start, &add, "add")
            .await
    })
}

fn wrong_code<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait("lib", 1).await?;
        let unused = ctx.markers("lib")?.get("unused")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 9999, unused)?;
        Ok(())
    })
}

fn bails<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        anyhow::bail!("fixture went missing")
    })
}

/// Indexes a report that never arrives.
fn panics<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait("lib", 1).await?;
        ctx.expect_equal(&reports[1].uri, "file:///nowhere.sol", "second report")?;
        Ok(())
    })
}

fn too_many_reports<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        ctx.open_fixture_and_wait("lib", 2).await?;
        Ok(())
    })
}

fn counter(passed: usize, failed: usize) -> Counter {
    Counter {
        total: passed + failed,
        passed,
        failed,
    }
}

#[tokio::test]
async fn every_outcome_is_counted() {
    let dir = fixture_dir(&[("lib", LIB), ("main", MAIN)]);
    let registry = TestRegistry::from_entries([
        ("unused_warning", unused_warning as TestFn),
        ("goto_add", goto_add as TestFn),
        ("wrong_code", wrong_code as TestFn),
        ("bails", bails as TestFn),
        ("panics", panics as TestFn),
    ])
    .unwrap();

    let runner = Runner::new(runner_options(mockls(&[])), suite_env(dir.path()));
    let summary = runner.run(&registry).await.unwrap();

    assert_eq!(summary.tests, counter(2, 3));
    // 3 from unused_warning, 6 from goto_add, the failing one from wrong_code.
    assert_eq!(summary.assertions, counter(9, 1));
    assert_eq!(summary.exit_code(), 3);
    assert!(!summary.success());
}

#[tokio::test]
async fn passing_run_exits_zero() {
    let dir = fixture_dir(&[("lib", LIB), ("main", MAIN)]);
    let registry = TestRegistry::from_entries([
        ("unused_warning", unused_warning as TestFn),
        ("goto_add", goto_add as TestFn),
    ])
    .unwrap();

    let summary = Runner::new(runner_options(mockls(&[])), suite_env(dir.path()))
        .run(&registry)
        .await
        .unwrap();
    assert_eq!(summary.tests, counter(2, 0));
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn pattern_selects_tests() {
    let dir = fixture_dir(&[("lib", LIB), ("main", MAIN)]);
    let registry = TestRegistry::from_entries([
        ("unused_warning", unused_warning as TestFn),
        ("goto_add", goto_add as TestFn),
        ("wrong_code", wrong_code as TestFn),
    ])
    .unwrap();

    let mut options = runner_options(mockls(&[]));
    options.test_pattern = "goto_*".to_string();
    let summary = Runner::new(options, suite_env(dir.path()))
        .run(&registry)
        .await
        .unwrap();
    assert_eq!(summary.tests, counter(1, 0));
    assert_eq!(summary.assertions, counter(6, 0));
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let dir = fixture_dir(&[("lib", LIB)]);
    // Sorted: bails, unused_warning, wrong_code.
    let registry = TestRegistry::from_entries([
        ("wrong_code", wrong_code as TestFn),
        ("bails", bails as TestFn),
        ("unused_warning", unused_warning as TestFn),
    ])
    .unwrap();

    let mut options = runner_options(mockls(&[]));
    options.fail_fast = true;
    let summary = Runner::new(options, suite_env(dir.path()))
        .run(&registry)
        .await
        .unwrap();
    assert_eq!(summary.tests, counter(0, 1));
    assert_eq!(summary.assertions, Counter::default());
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn server_failures_fail_the_test_not_the_run() {
    let dir = fixture_dir(&[("lib", LIB)]);
    let registry = TestRegistry::from_entries([
        ("unused_warning", unused_warning as TestFn),
        ("wrong_code", wrong_code as TestFn),
    ])
    .unwrap();

    let summary = Runner::new(
        runner_options(mockls(&["--fail-on", "initialize"])),
        suite_env(dir.path()),
    )
    .run(&registry)
    .await
    .unwrap();
    assert_eq!(summary.tests, counter(0, 2));
    assert_eq!(summary.assertions, Counter::default());
    assert_eq!(summary.exit_code(), 2);
}

#[tokio::test]
async fn diagnostics_timeout_fails_the_test() {
    let dir = fixture_dir(&[("lib", LIB)]);
    let registry =
        TestRegistry::from_entries([("too_many_reports", too_many_reports as TestFn)]).unwrap();

    let env = suite_env(dir.path()).with_diagnostics_timeout(Some(Duration::from_millis(300)));
    let summary = Runner::new(runner_options(mockls(&[])), env)
        .run(&registry)
        .await
        .unwrap();
    assert_eq!(summary.tests, counter(0, 1));
}

#[tokio::test]
async fn unspawnable_server_fails_each_test() {
    let dir = fixture_dir(&[("lib", LIB)]);
    let registry =
        TestRegistry::from_entries([("unused_warning", unused_warning as TestFn)]).unwrap();

    let server = lspcheck_lsp::ServerCommand::new("lspcheck-no-such-server", ["--lsp"]);
    let summary = Runner::new(runner_options(server), suite_env(dir.path()))
        .run(&registry)
        .await
        .unwrap();
    assert_eq!(summary.tests, counter(0, 1));
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn invalid_pattern_fails_the_run() {
    let dir = fixture_dir(&[("lib", LIB)]);
    let registry =
        TestRegistry::from_entries([("unused_warning", unused_warning as TestFn)]).unwrap();

    let mut options = runner_options(mockls(&[]));
    options.test_pattern = "unused_[".to_string();
    let result = Runner::new(options, suite_env(dir.path()))
        .run(&registry)
        .await;
    assert!(matches!(result, Err(RegistryError::InvalidPattern { .. })));
}
