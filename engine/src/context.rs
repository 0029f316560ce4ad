//! What a test body sees: one server conversation, the fixtures, and the
//! oracle.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{ChildStdin, ChildStdout};

use lspcheck_lsp::{ContentChange, LspClient, LspError, default_client_capabilities};
use lspcheck_types::{Diagnostic, Location, Position, PublishReport, Range};

use crate::fixtures::{FixtureError, Fixtures};
use crate::markers::MarkerTable;
use crate::oracle::{Assertions, ExpectationFailed};

/// Settings shared by every test of a run.
#[derive(Debug, Clone)]
pub struct SuiteEnv {
    pub fixtures: Fixtures,
    /// `languageId` for opened documents.
    pub language_id: String,
    pub diagnostics_timeout: Option<Duration>,
}

impl SuiteEnv {
    pub fn new(fixtures: Fixtures, language_id: impl Into<String>) -> Self {
        Self {
            fixtures,
            language_id: language_id.into(),
            diagnostics_timeout: None,
        }
    }

    pub fn with_diagnostics_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.diagnostics_timeout = timeout;
        self
    }
}

/// Per-test handle. Borrows the server connection and the run's assertion
/// counter for the duration of one test.
pub struct TestContext<'t, R = ChildStdout, W = ChildStdin> {
    client: LspClient<'t, R, W>,
    assertions: &'t mut Assertions,
    env: &'t SuiteEnv,
}

impl<'t, R: AsyncRead + Unpin, W: AsyncWrite + Unpin> TestContext<'t, R, W> {
    pub fn new(
        client: LspClient<'t, R, W>,
        assertions: &'t mut Assertions,
        env: &'t SuiteEnv,
    ) -> Self {
        Self {
            client,
            assertions,
            env,
        }
    }

    /// Handshake announcing the fixture directory as workspace root.
    pub async fn setup(&mut self) -> anyhow::Result<()> {
        let root = self.env.fixtures.root_uri()?;
        self.client
            .initialize(Some(&root), default_client_capabilities())
            .await?;
        Ok(())
    }

    /// Handshake with a `null` workspace root.
    pub async fn setup_without_root(&mut self) -> anyhow::Result<()> {
        self.client
            .initialize(None, default_client_capabilities())
            .await?;
        Ok(())
    }

    pub fn fixture_uri(&self, name: &str) -> Result<String, FixtureError> {
        self.env.fixtures.uri(name)
    }

    pub fn fixture_text(&self, name: &str) -> Result<String, FixtureError> {
        self.env.fixtures.read(name)
    }

    pub fn markers(&self, name: &str) -> Result<MarkerTable, FixtureError> {
        self.env.fixtures.markers(name)
    }

    pub async fn open_document(&mut self, uri: &str, text: &str) -> Result<(), LspError> {
        self.client
            .open_document(uri, &self.env.language_id, text)
            .await
    }

    /// Open a fixture and wait for `report_count` diagnostic reports.
    pub async fn open_fixture_and_wait(
        &mut self,
        name: &str,
        report_count: usize,
    ) -> anyhow::Result<Vec<PublishReport>> {
        let uri = self.fixture_uri(name)?;
        let text = self.fixture_text(name)?;
        let reports = self
            .client
            .open_and_wait(&uri, &self.env.language_id, &text, report_count)
            .await?;
        Ok(reports)
    }

    pub async fn change_document(
        &mut self,
        uri: &str,
        changes: &[ContentChange],
    ) -> Result<(), LspError> {
        self.client.change_document(uri, changes).await
    }

    pub async fn close_document(&mut self, uri: &str) -> Result<(), LspError> {
        self.client.close_document(uri).await
    }

    pub async fn wait_for_diagnostics(
        &mut self,
        count: usize,
    ) -> Result<Vec<PublishReport>, LspError> {
        self.client.wait_for_diagnostics(count).await
    }

    pub fn expect_equal<A, E>(
        &mut self,
        actual: &A,
        expected: &E,
        description: &str,
    ) -> Result<(), ExpectationFailed>
    where
        A: serde::Serialize + ?Sized,
        E: serde::Serialize + ?Sized,
    {
        self.assertions.expect_equal(actual, expected, description)
    }

    pub fn expect_diagnostic(
        &mut self,
        diagnostic: &Diagnostic,
        code: i64,
        range: Range,
    ) -> Result<(), ExpectationFailed> {
        self.assertions.expect_diagnostic(diagnostic, code, range)
    }

    pub fn expect_location(
        &mut self,
        location: &Location,
        uri: &str,
        line: u32,
        columns: (u32, u32),
    ) -> Result<(), ExpectationFailed> {
        self.assertions.expect_location(location, uri, line, columns)
    }

    pub fn expect_empty_diagnostics(
        &mut self,
        reports: &[PublishReport],
    ) -> Result<(), ExpectationFailed> {
        self.assertions.expect_empty_diagnostics(reports)
    }

    /// Ask for the definition at `position` and expect exactly `expected`.
    ///
    /// `expected` must be a single-line range.
    pub async fn expect_goto_definition(
        &mut self,
        uri: &str,
        position: Position,
        expected: &Location,
        description: &str,
    ) -> anyhow::Result<()> {
        let locations = self.client.definition(uri, position).await?;
        self.assertions.expect_equal(
            &locations.len(),
            &1,
            &format!("Goto definition ({description})"),
        )?;
        let range = expected.range;
        self.assertions.expect_location(
            &locations[0],
            &expected.uri,
            range.start.line,
            (range.start.character, range.end.character),
        )?;
        Ok(())
    }
}
