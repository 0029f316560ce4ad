//! LSP message serde types and parameter builders for JSON-RPC communication.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lspcheck_types::{Location, Position, Range};

pub const INITIALIZE: &str = "initialize";
pub const INITIALIZED: &str = "initialized";
pub const DID_OPEN: &str = "textDocument/didOpen";
pub const DID_CHANGE: &str = "textDocument/didChange";
pub const DID_CLOSE: &str = "textDocument/didClose";
pub const DEFINITION: &str = "textDocument/definition";
pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Notification<'a> {
    pub fn new(method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Shape of an incoming JSON-RPC frame.
#[derive(Debug, PartialEq)]
pub enum Incoming<'a> {
    /// A reply to one of our requests (`result` or `error`).
    Response {
        id: Option<&'a serde_json::Value>,
        error: Option<&'a serde_json::Value>,
    },
    /// A server-to-client request.
    Request { method: &'a str },
    /// A server-to-client notification.
    Notification {
        method: &'a str,
        params: Option<&'a serde_json::Value>,
    },
    /// Anything that fits none of the above.
    Unknown,
}

impl<'a> Incoming<'a> {
    #[must_use]
    pub fn classify(frame: &'a serde_json::Value) -> Self {
        let id = frame.get("id");
        let method = frame.get("method").and_then(serde_json::Value::as_str);
        let error = frame.get("error");
        let has_result_or_error = frame.get("result").is_some() || error.is_some();

        match (id, method, has_result_or_error) {
            (_, None, true) => Incoming::Response { id, error },
            (Some(_), Some(method), _) => Incoming::Request { method },
            (None, Some(method), _) => Incoming::Notification {
                method,
                params: frame.get("params"),
            },
            _ => Incoming::Unknown,
        }
    }
}

/// Client capabilities announced during `initialize`.
#[must_use]
pub fn default_client_capabilities() -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "publishDiagnostics": { "relatedInformation": true }
        },
        "workspace": {
            "applyEdit": true,
            "configuration": true,
            "didChangeConfiguration": { "dynamicRegistration": true },
            "workspaceEdit": { "documentChanges": true },
            "workspaceFolders": true
        }
    })
}

#[must_use]
pub fn initialize_params(
    root_uri: Option<&str>,
    capabilities: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "trace": "off",
        "initializationOptions": {},
        "capabilities": capabilities
    })
}

#[must_use]
pub fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

/// One incremental edit: replace `range` with `text`.
///
/// An empty range is a pure insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChange {
    pub range: Range,
    pub text: String,
}

impl ContentChange {
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn delete(range: Range) -> Self {
        Self::replace(range, String::new())
    }

    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::replace(Range::empty_at(at), text)
    }
}

#[must_use]
pub fn did_change_params(uri: &str, version: i32, changes: &[ContentChange]) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "version": version
        },
        "contentChanges": changes
    })
}

#[must_use]
pub fn did_close_params(uri: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri }
    })
}

#[must_use]
pub fn definition_params(uri: &str, position: Position) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri },
        "position": position
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationLink {
    target_uri: String,
    target_selection_range: Range,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionItem {
    Location(Location),
    Link(LocationLink),
}

impl From<DefinitionItem> for Location {
    fn from(item: DefinitionItem) -> Self {
        match item {
            DefinitionItem::Location(location) => location,
            DefinitionItem::Link(link) => Location::new(link.target_uri, link.target_selection_range),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionResult {
    Many(Vec<DefinitionItem>),
    One(DefinitionItem),
}

/// Normalize a `textDocument/definition` result into a list of locations.
///
/// `null` means "nothing to jump to" and yields an empty list.
pub fn parse_definition_result(
    result: &serde_json::Value,
) -> Result<Vec<Location>, serde_json::Error> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    let parsed = DefinitionResult::deserialize(result)?;
    Ok(match parsed {
        DefinitionResult::Many(items) => items.into_iter().map(Location::from).collect(),
        DefinitionResult::One(item) => vec![item.into()],
    })
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}
