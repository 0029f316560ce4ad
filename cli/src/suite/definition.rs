//! `textDocument/definition` across files, aliases and symbol kinds.

use lspcheck_engine::{TestContext, TestFuture};
use lspcheck_types::{Location, Range};

use super::{UNUSED_VARIABLE, expect_fixture_uri};

/// Where a definition request is expected to land.
#[derive(Clone, Copy)]
enum Target {
    /// The range tagged `tag` in `fixture`.
    Tag {
        fixture: &'static str,
        tag: &'static str,
    },
    /// Start of `fixture`, the answer for an import path.
    FileStart(&'static str),
}

struct GotoCase {
    /// Tag in the requesting file; the request is made at its start.
    from: &'static str,
    target: Target,
    description: &'static str,
}

const fn goto(from: &'static str, target: Target, description: &'static str) -> GotoCase {
    GotoCase {
        from,
        target,
        description,
    }
}

const fn tag(fixture: &'static str, tag: &'static str) -> Target {
    Target::Tag { fixture, tag }
}

const DEFINITION_CASES: &[GotoCase] = &[
    goto("importDirective", Target::FileStart("lib"), "import directive"),
    goto(
        "IAUse",
        tag("goto_definition", "IADecl"),
        "type symbol to jump to definition",
    ),
    goto(
        "fUse",
        tag("goto_definition", "fDecl"),
        "virtual function lookup",
    ),
    goto(
        "usingForAdd",
        tag("goto_definition", "IntLibAdd"),
        "using for",
    ),
    goto(
        "LibUse",
        tag("lib", "Lib"),
        "Library symbol from different file",
    ),
    goto(
        "LibAddUse",
        tag("lib", "add"),
        "Library member symbol from different file",
    ),
    goto("ColorUse", tag("lib", "Color"), "Enum type"),
    goto("RedUse", tag("lib", "Red"), "Enum value"),
    goto(
        "eUse",
        tag("goto_definition", "eDecl"),
        "local variable declaration",
    ),
    goto(
        "PriceLhs",
        tag("goto_definition", "PriceDecl"),
        "User defined type on left hand side",
    ),
    goto(
        "PriceRhs",
        tag("goto_definition", "PriceDecl"),
        "User defined type on right hand side",
    ),
    goto(
        "RGBColorUse",
        tag("lib", "RGBColor"),
        "Struct constructor",
    ),
];

const IMPORT_CASES: &[GotoCase] = &[
    goto(
        "WeatherImport",
        tag("lib", "Weather"),
        "symbol in symbol alias import directive",
    ),
    goto(
        "WetterUse",
        tag("lib", "Weather"),
        "aliased symbol in return type",
    ),
    goto(
        "ThatReturnType",
        tag("lib", "Color"),
        "`That` in return type",
    ),
    goto(
        "ThatLhs",
        tag("lib", "Color"),
        "`That` in LHS variable assignment",
    ),
    goto(
        "ThatExpression",
        tag("goto_definition_imports", "ThatAlias"),
        "`That` in expression",
    ),
];

pub fn definition<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(run_cases(ctx, "goto_definition", DEFINITION_CASES))
}

pub fn definition_imports<'a>(ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
    Box::pin(run_cases(ctx, "goto_definition_imports", IMPORT_CASES))
}

/// Open `fixture` (which imports lib), check the initial reports, then
/// request every case in order.
async fn run_cases(
    ctx: &mut TestContext<'_>,
    fixture: &str,
    cases: &[GotoCase],
) -> anyhow::Result<()> {
    ctx.setup().await?;
    let reports = ctx.open_fixture_and_wait(fixture, 2).await?;
    ctx.expect_equal(&reports.len(), &2, "publish diagnostics for 2 files")?;
    expect_fixture_uri(ctx, &reports[0], fixture)?;
    ctx.expect_equal(&reports[0].diagnostics.len(), &0, "no diagnostics")?;
    ctx.expect_equal(&reports[1].diagnostics.len(), &1, "one diagnostic in lib")?;
    let unused = ctx.markers("lib")?.get("diagnostics")?;
    ctx.expect_diagnostic(&reports[1].diagnostics[0], UNUSED_VARIABLE, unused)?;

    let uri = ctx.fixture_uri(fixture)?;
    let markers = ctx.markers(fixture)?;
    for case in cases {
        let from = markers.get(case.from)?.start;
        let expected = resolve(ctx, case.target)?;
        ctx.expect_goto_definition(&uri, from, &expected, case.description)
            .await?;
    }
    Ok(())
}

fn resolve(ctx: &TestContext<'_>, target: Target) -> anyhow::Result<Location> {
    let location = match target {
        Target::Tag { fixture, tag } => Location::new(
            ctx.fixture_uri(fixture)?,
            ctx.markers(fixture)?.get(tag)?,
        ),
        Target::FileStart(fixture) => {
            Location::new(ctx.fixture_uri(fixture)?, Range::on_line(0, 0, 0))
        }
    };
    Ok(location)
}
