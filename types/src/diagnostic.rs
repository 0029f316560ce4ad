//! Diagnostics as published by a language server.

use serde::{Deserialize, Serialize};

use crate::Range;

/// A single diagnostic inside a publish report.
///
/// Only `range` is mandatory on the wire. Everything else is optional and
/// kept verbatim; the oracle compares what it is asked to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_information: Option<serde_json::Value>,
}

/// Parameters of one `textDocument/publishDiagnostics` notification.
///
/// One report describes the complete current diagnostic set of one
/// document; an empty `diagnostics` list retracts everything previously
/// published for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReport {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PublishReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostic codes in publish order.
    #[must_use]
    pub fn codes(&self) -> Vec<Option<i64>> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }
}
