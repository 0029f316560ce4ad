//! The Solidity compiler's LSP conformance cases.
//!
//! Expected positions come from the `@tag` annotations in `fixtures/lsp`,
//! so editing a fixture only needs its annotations kept in line.

mod definition;
mod diagnostics;
mod documents;

use lspcheck_engine::{RegistryError, TestContext, TestFn, TestRegistry};
use lspcheck_types::PublishReport;

/// Unused local variable warning.
const UNUSED_VARIABLE: i64 = 2072;

/// Every case, under its public name.
pub fn registry() -> Result<TestRegistry, RegistryError> {
    TestRegistry::from_entries([
        (
            "publish_diagnostics_warnings",
            diagnostics::warnings as TestFn,
        ),
        ("publish_diagnostics_errors", diagnostics::errors as TestFn),
        (
            "publish_diagnostics_errors_multiline",
            diagnostics::errors_multiline as TestFn,
        ),
        (
            "textDocument_didOpen_with_relative_import",
            documents::did_open_with_relative_import as TestFn,
        ),
        (
            "textDocument_didOpen_with_relative_import_without_project_url",
            documents::did_open_with_relative_import_without_project_url as TestFn,
        ),
        (
            "didChange_in_A_causing_error_in_B",
            documents::did_change_in_a_causing_error_in_b as TestFn,
        ),
        (
            "textDocument_didChange_updates_diagnostics",
            documents::did_change_updates_diagnostics as TestFn,
        ),
        (
            "textDocument_didChange_delete_line_and_close",
            documents::did_change_delete_line_and_close as TestFn,
        ),
        (
            "textDocument_opening_two_new_files_edit_and_close",
            documents::opening_two_new_files_edit_and_close as TestFn,
        ),
        (
            "textDocument_closing_virtual_file_removes_imported_real_file",
            documents::closing_virtual_file_removes_imported_real_file as TestFn,
        ),
        (
            "textDocument_didChange_at_eol",
            documents::did_change_at_eol as TestFn,
        ),
        (
            "textDocument_didChange_empty_file",
            documents::did_change_empty_file as TestFn,
        ),
        (
            "textDocument_didChange_multi_line",
            documents::did_change_multi_line as TestFn,
        ),
        ("textDocument_definition", definition::definition as TestFn),
        (
            "textDocument_definition_imports",
            definition::definition_imports as TestFn,
        ),
    ])
}

/// Expect `report` to be about fixture `name`.
fn expect_fixture_uri(
    ctx: &mut TestContext<'_>,
    report: &PublishReport,
    name: &str,
) -> anyhow::Result<()> {
    let uri = ctx.fixture_uri(name)?;
    ctx.expect_equal(&report.uri, &uri, "Correct file URI")?;
    Ok(())
}

/// The state after opening `main` (which imports `./lib.sol`): `main` is
/// clean and lib carries its unused variable warning.
fn expect_import_diagnostics(
    ctx: &mut TestContext<'_>,
    reports: &[PublishReport],
    main: &str,
) -> anyhow::Result<()> {
    ctx.expect_equal(&reports.len(), &2, "Diagnostic reports for 2 files")?;

    expect_fixture_uri(ctx, &reports[0], main)?;
    ctx.expect_equal(&reports[0].diagnostics.len(), &0, "no diagnostics")?;

    expect_fixture_uri(ctx, &reports[1], "lib")?;
    ctx.expect_equal(&reports[1].diagnostics.len(), &1, "one diagnostic")?;
    let marker = ctx.markers("lib")?.get("diagnostics")?;
    ctx.expect_diagnostic(&reports[1].diagnostics[0], UNUSED_VARIABLE, marker)?;
    Ok(())
}
