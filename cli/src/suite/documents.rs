//! Opening, editing and closing documents, including files that exist only
//! in the editor.

use lspcheck_engine::{TestContext, TestFuture};
use lspcheck_lsp::ContentChange;
use lspcheck_types::{Position, Range};

use super::{UNUSED_VARIABLE, expect_fixture_uri, expect_import_diagnostics};

const MAIN: &str = "didOpen_with_import";
const TEMPLATE: &str = "didChange_template";

/// The smallest file that compiles without a warning.
const EMPTY_UNIT: &str = "// SPDX-License-Identifier: UNLICENSED\npragma solidity >=0.8.0;\n";

/// Opening a file also reports on the file it imports.
async fn open_main_with_import(ctx: &mut TestContext<'_>) -> anyhow::Result<()> {
    ctx.setup().await?;
    let reports = ctx.open_fixture_and_wait(MAIN, 2).await?;
    expect_import_diagnostics(ctx, &reports, MAIN)
}

pub fn did_open_with_relative_import<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(open_main_with_import(ctx))
}

/// Same as above, with the server told about no workspace root at all.
pub fn did_open_with_relative_import_without_project_url<'a>(
    ctx: &'a mut TestContext<'_>,
) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup_without_root().await?;
        let reports = ctx.open_fixture_and_wait(MAIN, 2).await?;
        expect_import_diagnostics(ctx, &reports, MAIN)
    })
}

/// Deleting `Lib.add` breaks the call in the importing file.
pub fn did_change_in_a_causing_error_in_b<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        open_main_with_import(ctx).await?;
        ctx.open_fixture_and_wait("lib", 2).await?;

        let lib_uri = ctx.fixture_uri("lib")?;
        let add_function = ctx.markers("lib")?.get("addFunction")?;
        ctx.change_document(&lib_uri, &[ContentChange::delete(add_function)])
            .await?;

        let reports = ctx.wait_for_diagnostics(2).await?;
        ctx.expect_equal(&reports.len(), &2, "Diagnostic reports for 2 files")?;

        // Member `add` is gone.
        expect_fixture_uri(ctx, &reports[0], MAIN)?;
        let diagnostics = &reports[0].diagnostics;
        ctx.expect_equal(&diagnostics.len(), &1, "now, one diagnostic")?;
        let call = ctx.markers(MAIN)?.get("diagnostics")?;
        ctx.expect_diagnostic(&diagnostics[0], 9582, call)?;

        // The unused variable warning is not reported once analysis stops at the error.
        expect_fixture_uri(ctx, &reports[1], "lib")?;
        ctx.expect_equal(&reports[1].diagnostics.len(), &0, "no diagnostics in lib")?;
        Ok(())
    })
}

pub fn did_change_updates_diagnostics<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const NAME: &str = "publish_diagnostics_1";
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(NAME, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "One published_diagnostics message")?;
        expect_fixture_uri(ctx, &reports[0], NAME)?;

        let markers = ctx.markers(NAME)?;
        let unused_return = markers.get("unusedReturnVariable")?;
        let unused_variable = markers.get("unusedVariable")?;
        let unused_in_contract = markers.get("unusedContractVariable")?;

        let diagnostics = &reports[0].diagnostics;
        ctx.expect_equal(&diagnostics.len(), &3, "3 diagnostic messages")?;
        ctx.expect_diagnostic(&diagnostics[0], 6321, unused_return)?;
        ctx.expect_diagnostic(&diagnostics[1], UNUSED_VARIABLE, unused_variable)?;
        ctx.expect_diagnostic(&diagnostics[2], UNUSED_VARIABLE, unused_in_contract)?;

        // Remove the declaration along with its `;`.
        let uri = ctx.fixture_uri(NAME)?;
        ctx.change_document(&uri, &[ContentChange::delete(unused_variable.extend_end(1))])
            .await?;

        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "One published_diagnostics message")?;
        expect_fixture_uri(ctx, &reports[0], NAME)?;
        let diagnostics = &reports[0].diagnostics;
        ctx.expect_equal(&diagnostics.len(), &2, "2 diagnostic messages")?;
        ctx.expect_diagnostic(&diagnostics[0], 6321, unused_return)?;
        ctx.expect_diagnostic(&diagnostics[1], UNUSED_VARIABLE, unused_in_contract)?;
        Ok(())
    })
}

/// Fixing a warning in lib, then closing lib brings the on-disk warning back.
pub fn did_change_delete_line_and_close<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        open_main_with_import(ctx).await?;
        ctx.open_fixture_and_wait("lib", 2).await?;

        let lib_uri = ctx.fixture_uri("lib")?;
        let unused = ctx.markers("lib")?.get("diagnostics")?;
        ctx.change_document(&lib_uri, &[ContentChange::delete(unused.extend_end(1))])
            .await?;

        let reports = ctx.wait_for_diagnostics(2).await?;
        ctx.expect_equal(&reports.len(), &2, "published diagnostics count")?;
        expect_fixture_uri(ctx, &reports[0], MAIN)?;
        ctx.expect_equal(
            &reports[0].diagnostics.len(),
            &0,
            "no diagnostics in didOpen_with_import.sol",
        )?;
        expect_fixture_uri(ctx, &reports[1], "lib")?;
        ctx.expect_equal(&reports[1].diagnostics.len(), &0, "no diagnostics in lib.sol")?;

        ctx.close_document(&lib_uri).await?;
        let reports = ctx.wait_for_diagnostics(2).await?;
        expect_import_diagnostics(ctx, &reports, MAIN)
    })
}

/// Two unsaved files, one importing the other. Closing the imported one
/// leaves the import unresolved.
pub fn opening_two_new_files_edit_and_close<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const FILE_A: &str = "file:///a.sol";
        const FILE_B: &str = "file:///b.sol";
        ctx.setup().await?;

        ctx.open_document(FILE_A, EMPTY_UNIT).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_empty_diagnostics(&reports)?;

        ctx.open_document(FILE_B, EMPTY_UNIT).await?;
        let reports = ctx.wait_for_diagnostics(2).await?;
        ctx.expect_equal(&reports.len(), &2, "two publish diagnostics notifications")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "should not contain diagnostics")?;
        ctx.expect_equal(&reports[1].diagnostics.len(), &0, "should not contain diagnostics")?;

        let import = ContentChange::insert(Position::new(2, 0), "import \"./b.sol\";\n");
        ctx.change_document(FILE_A, &[import]).await?;
        let reports = ctx.wait_for_diagnostics(2).await?;
        ctx.expect_equal(&reports.len(), &2, "two publish diagnostics notifications")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "should not contain diagnostics")?;
        ctx.expect_equal(&reports[1].diagnostics.len(), &0, "should not contain diagnostics")?;

        // b.sol had nothing to retract, so only a.sol is reported.
        ctx.close_document(FILE_B).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &1, "import not found")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 6275, Range::on_line(2, 0, 17))?;
        ctx.expect_equal(reports[0].uri.as_str(), FILE_A, "Correct uri")?;
        Ok(())
    })
}

/// A real file pulled in only by an unsaved file stops being reported once
/// the unsaved file is closed.
pub fn closing_virtual_file_removes_imported_real_file<'a>(
    ctx: &'a mut TestContext<'_>,
) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        // Next to lib.sol, but not on disk.
        let file_a = ctx.fixture_uri("a")?;
        let text = format!("{EMPTY_UNIT}import \"./lib.sol\";\n");
        ctx.open_document(&file_a, &text).await?;

        let reports = ctx.wait_for_diagnostics(2).await?;
        ctx.expect_equal(&reports.len(), &2, "reports for a.sol and lib.sol")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "should not contain diagnostics")?;
        expect_fixture_uri(ctx, &reports[1], "lib")?;
        ctx.expect_equal(&reports[1].diagnostics.len(), &1, "one diagnostic")?;
        let unused = ctx.markers("lib")?.get("diagnostics")?;
        ctx.expect_diagnostic(&reports[1].diagnostics[0], UNUSED_VARIABLE, unused)?;

        ctx.close_document(&file_a).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        expect_fixture_uri(ctx, &reports[0], "lib")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "should not contain diagnostics")?;
        Ok(())
    })
}

/// Append to the empty line after the contract, then complete it into a
/// free function.
pub fn did_change_at_eol<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(TEMPLATE, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "no diagnostics")?;
        let uri = ctx.fixture_uri(TEMPLATE)?;

        ctx.change_document(&uri, &[ContentChange::insert(Position::new(6, 0), " f")])
            .await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        expect_fixture_uri(ctx, &reports[0], TEMPLATE)?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &1, "one diagnostic")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 7858, Range::on_line(6, 1, 2))?;

        let completion = ContentChange::insert(Position::new(6, 2), "unction f() public {}");
        ctx.change_document(&uri, &[completion]).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        expect_fixture_uri(ctx, &reports[0], TEMPLATE)?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &1, "one diagnostic")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 4126, Range::on_line(6, 1, 23))?;
        Ok(())
    })
}

/// Start from an empty unsaved file and paste the import fixture into it.
///
/// The file name must sort before `lib` so the report order matches
/// [`expect_import_diagnostics`].
pub fn did_change_empty_file<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        const NAME: &str = "a_new_file";
        let uri = ctx.fixture_uri(NAME)?;
        ctx.setup().await?;

        ctx.open_document(&uri, "").await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        let diagnostics = &reports[0].diagnostics;
        ctx.expect_equal(&diagnostics.len(), &2, "missing license and pragma")?;
        ctx.expect_diagnostic(&diagnostics[0], 1878, Range::on_line(0, 0, 0))?;
        ctx.expect_diagnostic(&diagnostics[1], 3420, Range::on_line(0, 0, 0))?;

        let text = ctx.fixture_text(MAIN)?;
        ctx.change_document(&uri, &[ContentChange::insert(Position::new(0, 0), text)])
            .await?;
        let reports = ctx.wait_for_diagnostics(2).await?;
        expect_import_diagnostics(ctx, &reports, NAME)
    })
}

/// Replacements whose ranges and texts both span several lines.
pub fn did_change_multi_line<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(async move {
        ctx.setup().await?;
        let reports = ctx.open_fixture_and_wait(TEMPLATE, 1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &0, "no diagnostics")?;
        let uri = ctx.fixture_uri(TEMPLATE)?;

        // `contract C\n{` becomes `contract D {`, a state variable and a stray space.
        let rewrite = ContentChange::replace(
            Range::new(Position::new(3, 3), Position::new(4, 1)),
            "tract D {\n\n  uint x\n = -1; \n ",
        );
        ctx.change_document(&uri, &[rewrite]).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        expect_fixture_uri(ctx, &reports[0], TEMPLATE)?;
        ctx.expect_equal(&reports[0].diagnostics.len(), &1, "one diagnostic")?;
        ctx.expect_diagnostic(&reports[0].diagnostics[0], 7407, Range::on_line(6, 3, 5))?;

        // Replace `x\n = ` of `uint x\n = -1;`.
        let rewrite = ContentChange::replace(
            Range::new(Position::new(5, 7), Position::new(6, 4)),
            "y\n = [\nuint(1),\n3,4]+",
        );
        ctx.change_document(&uri, &[rewrite]).await?;
        let reports = ctx.wait_for_diagnostics(1).await?;
        ctx.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        expect_fixture_uri(ctx, &reports[0], TEMPLATE)?;
        let diagnostics = &reports[0].diagnostics;
        ctx.expect_equal(&diagnostics.len(), &2, "two diagnostics")?;

        let spanning = Range::new(Position::new(6, 3), Position::new(8, 6));
        ctx.expect_equal(&diagnostics[0].code, &Some(2271), "diagnostic: 2271")?;
        ctx.expect_equal(&diagnostics[0].range, &spanning, "diagnostic: check range")?;
        ctx.expect_equal(&diagnostics[1].code, &Some(7407), "diagnostic: 7407")?;
        ctx.expect_equal(&diagnostics[1].range, &spanning, "diagnostic: check range")?;
        Ok(())
    })
}
