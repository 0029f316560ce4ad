//! Diagnostic synchronizer: the LSP conversation a conformance test holds.
//!
//! [`LspClient`] borrows a [`Connection`] for the duration of one test. It
//! performs the initialization handshake, sends document notifications, and
//! blocks until a known number of `textDocument/publishDiagnostics`
//! notifications has arrived.
//!
//! There is no "wait until idle": the caller must know how many reports
//! the server will publish. Waiting for too few leaves reports in the stream
//! for the next wait; waiting for too many blocks until the optional
//! diagnostics timeout (or forever without one).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};

use lspcheck_types::{Location, Position, PublishReport};

use crate::error::{LspError, ProtocolError};
use crate::protocol::{
    self, ContentChange, Incoming, DEFINITION, DID_CHANGE, DID_CLOSE, DID_OPEN, INITIALIZE,
    INITIALIZED, PUBLISH_DIAGNOSTICS,
};
use crate::transport::Connection;

/// The conversation with one language server.
pub struct LspClient<'c, R, W> {
    connection: &'c mut Connection<R, W>,
    /// Per-document version counter; present while the document is open.
    versions: HashMap<String, i32>,
    diagnostics_timeout: Option<Duration>,
}

impl<'c, R: AsyncRead + Unpin, W: AsyncWrite + Unpin> LspClient<'c, R, W> {
    pub fn new(connection: &'c mut Connection<R, W>) -> Self {
        Self {
            connection,
            versions: HashMap::new(),
            diagnostics_timeout: None,
        }
    }

    /// Bound every [`wait_for_diagnostics`](Self::wait_for_diagnostics).
    ///
    /// `None` blocks until the expected count arrives or the server exits.
    pub fn with_diagnostics_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.diagnostics_timeout = timeout;
        self
    }

    /// `initialize` followed by `initialized`.
    ///
    /// `root_uri = None` announces a server without a workspace root.
    /// Returns the server's `InitializeResult`.
    pub async fn initialize(
        &mut self,
        root_uri: Option<&str>,
        capabilities: serde_json::Value,
    ) -> Result<serde_json::Value, LspError> {
        let params = protocol::initialize_params(root_uri, capabilities);
        let response = self.connection.call(INITIALIZE, Some(params)).await?;
        let result = into_result(response)?;

        self.connection
            .send(INITIALIZED, Some(serde_json::json!({})))
            .await?;
        Ok(result)
    }

    pub async fn open_document(
        &mut self,
        uri: &str,
        language_id: &str,
        text: &str,
    ) -> Result<(), LspError> {
        let version = 1;
        self.versions.insert(uri.to_string(), version);
        let params = protocol::did_open_params(uri, language_id, version, text);
        self.connection.send(DID_OPEN, Some(params)).await?;
        Ok(())
    }

    /// Send incremental edits for an open document.
    pub async fn change_document(
        &mut self,
        uri: &str,
        changes: &[ContentChange],
    ) -> Result<(), LspError> {
        let version = self.versions.entry(uri.to_string()).or_insert(1);
        *version += 1;
        let params = protocol::did_change_params(uri, *version, changes);
        self.connection.send(DID_CHANGE, Some(params)).await?;
        Ok(())
    }

    pub async fn close_document(&mut self, uri: &str) -> Result<(), LspError> {
        self.versions.remove(uri);
        self.connection
            .send(DID_CLOSE, Some(protocol::did_close_params(uri)))
            .await?;
        Ok(())
    }

    /// Receive exactly `count` publish-diagnostics notifications.
    ///
    /// Reports are returned sorted by URI so assertions do not depend on the
    /// order in which the server publishes for different documents. Any
    /// other message fails the wait immediately.
    pub async fn wait_for_diagnostics(
        &mut self,
        count: usize,
    ) -> Result<Vec<PublishReport>, LspError> {
        let started = Instant::now();
        let mut reports = Vec::with_capacity(count);

        while reports.len() < count {
            let next = self.connection.receive();
            let frame = match self.diagnostics_timeout {
                None => next.await?,
                Some(limit) => {
                    let remaining = limit.saturating_sub(started.elapsed());
                    match tokio::time::timeout(remaining, next).await {
                        Ok(frame) => frame?,
                        Err(_) => {
                            return Err(LspError::Timeout {
                                expected: count,
                                received: reports.len(),
                                elapsed: started.elapsed(),
                            });
                        }
                    }
                }
            };
            let frame = frame.ok_or(LspError::StreamClosed)?;
            reports.push(require_publish_diagnostics(&frame)?);
        }

        reports.sort_by(|a, b| a.uri.cmp(&b.uri));
        tracing::debug!(count, "received diagnostic reports");
        Ok(reports)
    }

    /// Open a document and wait for the reports its analysis triggers.
    pub async fn open_and_wait(
        &mut self,
        uri: &str,
        language_id: &str,
        text: &str,
        report_count: usize,
    ) -> Result<Vec<PublishReport>, LspError> {
        self.open_document(uri, language_id, text).await?;
        self.wait_for_diagnostics(report_count).await
    }

    /// `textDocument/definition` at `position`.
    ///
    /// Positions without a definable symbol yield an empty list.
    pub async fn definition(
        &mut self,
        uri: &str,
        position: Position,
    ) -> Result<Vec<Location>, LspError> {
        let params = protocol::definition_params(uri, position);
        let response = self.connection.call(DEFINITION, Some(params)).await?;
        let result = into_result(response)?;
        protocol::parse_definition_result(&result).map_err(|source| {
            ProtocolError::InvalidParams {
                method: DEFINITION.to_string(),
                source,
            }
            .into()
        })
    }
}

/// Extract `result` from a response, turning an `error` member into a
/// protocol error.
fn into_result(mut response: serde_json::Value) -> Result<serde_json::Value, ProtocolError> {
    if let Some(error) = response.get("error") {
        return Err(ProtocolError::from_error_object(error));
    }
    Ok(response
        .get_mut("result")
        .map(serde_json::Value::take)
        .unwrap_or_default())
}

/// Ensure `frame` is a publish-diagnostics notification and decode its
/// params.
fn require_publish_diagnostics(frame: &serde_json::Value) -> Result<PublishReport, ProtocolError> {
    match Incoming::classify(frame) {
        Incoming::Response {
            error: Some(error), ..
        } => Err(ProtocolError::from_error_object(error)),
        Incoming::Notification { method, params } if method == PUBLISH_DIAGNOSTICS => {
            let params = params.cloned().unwrap_or_default();
            serde_json::from_value(params).map_err(|source| ProtocolError::InvalidParams {
                method: PUBLISH_DIAGNOSTICS.to_string(),
                source,
            })
        }
        Incoming::Notification { method, .. } | Incoming::Request { method } => {
            Err(ProtocolError::UnexpectedMethod {
                expected: PUBLISH_DIAGNOSTICS.to_string(),
                actual: method.to_string(),
            })
        }
        Incoming::Response { .. } | Incoming::Unknown => Err(ProtocolError::NotANotification {
            expected: PUBLISH_DIAGNOSTICS.to_string(),
            message: frame.to_string(),
        }),
    }
}
