//! Diagnostics published for a freshly opened file.

use lspcheck_engine::{TestContext, TestFuture};
use lspcheck_types::{Position, Range};

use super::{UNUSED_VARIABLE, expect_fixture_uri};

pub fn warnings<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const NAME: &str = "publish_diagnostics_1";
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(NAME, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "One published_diagnostics message")?;
        let report = &reports[0];
        expect_fixture_uri(ctx, report, NAME)?;

        let markers = ctx.markers(NAME)?;
        let diagnostics = &report.diagnostics;
        ctx.expect_equal(&diagnostics.len(), &3, "3 diagnostic messages")?;
        ctx.expect_diagnostic(&diagnostics[0], 6321, markers.get("unusedReturnVariable")?)?;
        ctx.expect_diagnostic(&diagnostics[1], UNUSED_VARIABLE, markers.get("unusedVariable")?)?;
        ctx.expect_diagnostic(
            &diagnostics[2],
            UNUSED_VARIABLE,
            markers.get("unusedContractVariable")?,
        )?;
        Ok(())
    })
}

pub fn errors<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const NAME: &str = "publish_diagnostics_2";
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(NAME, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "One published_diagnostics message")?;
        let report = &reports[0];
        expect_fixture_uri(ctx, report, NAME)?;

        let markers = ctx.markers(NAME)?;
        let diagnostics = &report.diagnostics;
        ctx.expect_equal(&diagnostics.len(), &3, "3 diagnostic messages")?;
        ctx.expect_diagnostic(&diagnostics[0], 9574, markers.get("conversionError")?)?;
        ctx.expect_diagnostic(&diagnostics[1], 6777, markers.get("argumentsRequired")?)?;
        ctx.expect_diagnostic(&diagnostics[2], 6160, markers.get("wrongArgumentsCount")?)?;
        Ok(())
    })
}

/// A diagnostic spanning the whole of contract `B`.
pub fn errors_multiline<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const NAME: &str = "publish_diagnostics_3";
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(NAME, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "One published_diagnostics message")?;
        let report = &reports[0];
        expect_fixture_uri(ctx, report, NAME)?;

        let diagnostics = &report.diagnostics;
        ctx.expect_equal(&diagnostics.len(), &1, "1 diagnostic messages")?;
        ctx.expect_equal(&diagnostics[0].code, &Some(3656), "diagnostic: check code")?;
        ctx.expect_equal(
            &diagnostics[0].range,
            &Range::new(Position::new(7, 0), Position::new(10, 1)),
            "diagnostic: check range",
        )?;
        Ok(())
    })
}
