//! Scripted language server for the integration tests.
//!
//! Speaks Content-Length framed JSON-RPC over stdin/stdout, synchronously,
//! one message at a time. Its "analysis" is deliberately dumb so tests can
//! predict every report:
//!
//! - every identifier starting with `unused` outside a `//` comment is a
//!   warning with code 2072;
//! - after each `didOpen`, `didChange` and `didClose`, one report is
//!   published per open document, in reverse URI order; `didClose` first
//!   retracts the closed document with an empty report;
//! - `textDocument/definition` finds `fn <word>` in any open document.
//!
//! Flags inject failures.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNUSED_CODE: i64 = 2072;

/// Mock LSP server for integration testing.
#[derive(Parser, Debug, Default)]
#[command(name = "lspcheck-mockls")]
struct Args {
    /// Answer this request method with an `InternalError` (repeatable).
    #[arg(long)]
    fail_on: Vec<String>,

    /// Exit as soon as a message with this method arrives (repeatable).
    #[arg(long)]
    exit_on: Vec<String>,

    /// Send the first diagnostics notification with an unknown header.
    #[arg(long)]
    bad_header: bool,
}

/// Any incoming JSON-RPC message.
#[derive(Debug, Deserialize)]
struct Message {
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

struct MockServer<W> {
    args: Args,
    /// Open documents by URI.
    documents: BTreeMap<String, String>,
    writer: W,
    bad_header_pending: bool,
}

impl<W: Write> MockServer<W> {
    fn new(args: Args, writer: W) -> Self {
        let bad_header_pending = args.bad_header;
        Self {
            args,
            documents: BTreeMap::new(),
            writer,
            bad_header_pending,
        }
    }

    /// Serve until EOF, a read error, or an `--exit-on` method.
    fn run(&mut self, reader: &mut dyn Read) -> io::Result<()> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            while let Some((body, consumed)) = try_parse_message(&buffer) {
                buffer.drain(..consumed);
                let Ok(message) = serde_json::from_str::<Message>(&body) else {
                    continue;
                };
                if !self.handle_message(message)? {
                    return Ok(());
                }
            }

            match reader.read(&mut chunk)? {
                0 => return Ok(()),
                n => buffer.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Returns `false` when the server should stop.
    fn handle_message(&mut self, message: Message) -> io::Result<bool> {
        let Some(method) = message.method else {
            return Ok(true);
        };
        if self.args.exit_on.iter().any(|m| *m == method) {
            return Ok(false);
        }

        match message.id {
            Some(id) => self.handle_request(&method, id, &message.params)?,
            None => self.handle_notification(&method, &message.params)?,
        }
        Ok(method != "exit")
    }

    fn handle_request(&mut self, method: &str, id: Value, params: &Value) -> io::Result<()> {
        if self.args.fail_on.iter().any(|m| m == method) {
            let message = format!("mockls: configured to fail on {method}");
            return self.send(&Response::error(id, -32603, message));
        }

        let response = match method {
            "initialize" => Response::ok(id, serde_json::json!({ "capabilities": {} })),
            "shutdown" => Response::ok(id, Value::Null),
            "textDocument/definition" => {
                Response::ok(id, self.definition(params).unwrap_or(Value::Null))
            }
            _ => Response::error(id, -32601, format!("mockls: method not found: {method}")),
        };
        self.send(&response)
    }

    fn handle_notification(&mut self, method: &str, params: &Value) -> io::Result<()> {
        let uri = params
            .pointer("/textDocument/uri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match method {
            "textDocument/didOpen" => {
                let text = params
                    .pointer("/textDocument/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                self.documents.insert(uri, text.to_string());
                self.publish_all()
            }
            "textDocument/didChange" => {
                if let Some(text) = self.documents.get_mut(&uri) {
                    let changes = params
                        .get("contentChanges")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    for change in changes {
                        apply_change(text, change);
                    }
                }
                self.publish_all()
            }
            "textDocument/didClose" => {
                self.documents.remove(&uri);
                self.publish(&uri, &[])?;
                self.publish_all()
            }
            _ => Ok(()),
        }
    }

    fn publish_all(&mut self) -> io::Result<()> {
        let reports: Vec<(String, Vec<Value>)> = self
            .documents
            .iter()
            .rev()
            .map(|(uri, text)| (uri.clone(), unused_diagnostics(text)))
            .collect();
        for (uri, diagnostics) in reports {
            self.publish(&uri, &diagnostics)?;
        }
        Ok(())
    }

    fn publish(&mut self, uri: &str, diagnostics: &[Value]) -> io::Result<()> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": { "uri": uri, "diagnostics": diagnostics }
        });
        let extra_header = if self.bad_header_pending {
            self.bad_header_pending = false;
            "X-Mock-Header: 1\r\n"
        } else {
            ""
        };
        write_framed(&mut self.writer, extra_header, &notification.to_string())
    }

    fn definition(&self, params: &Value) -> Option<Value> {
        let uri = params.pointer("/textDocument/uri")?.as_str()?;
        let line = usize::try_from(params.pointer("/position/line")?.as_u64()?).ok()?;
        let character = params.pointer("/position/character")?.as_u64()?;
        let text = self.documents.get(uri)?;
        let word = word_at(text.lines().nth(line)?, character)?;

        let declaration = format!("fn {word}");
        self.documents.iter().find_map(|(doc_uri, doc)| {
            doc.lines().enumerate().find_map(|(line_no, line_text)| {
                let at = find_word(line_text, &declaration)?;
                let start = utf16_len(&line_text[..at + 3]);
                Some(serde_json::json!({
                    "uri": doc_uri,
                    "range": {
                        "start": { "line": line_no, "character": start },
                        "end": { "line": line_no, "character": start + utf16_len(word) }
                    }
                }))
            })
        })
    }

    fn send(&mut self, response: &Response) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(io::Error::other)?;
        write_framed(&mut self.writer, "", &json)
    }
}

fn write_framed(writer: &mut impl Write, extra_header: &str, json: &str) -> io::Result<()> {
    write!(
        writer,
        "{extra_header}Content-Length: {}\r\n\r\n{json}",
        json.len()
    )?;
    writer.flush()
}

/// Parse one framed message from the front of `buffer`.
/// Returns the body and the number of bytes consumed.
fn try_parse_message(buffer: &[u8]) -> Option<(String, usize)> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&buffer[..header_end]).ok()?;

    let content_length: usize = headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse().ok())?
    })?;

    let total = header_end + 4 + content_length;
    if buffer.len() < total {
        return None;
    }
    let body = std::str::from_utf8(&buffer[header_end + 4..total]).ok()?;
    Some((body.to_string(), total))
}

/// One 2072 warning per identifier starting with `unused`.
fn unused_diagnostics(text: &str) -> Vec<Value> {
    let mut diagnostics = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let code = line.find("//").map_or(line, |at| &line[..at]);
        for (start, word) in words(code) {
            if !word.starts_with("unused") {
                continue;
            }
            let character = utf16_len(&code[..start]);
            diagnostics.push(serde_json::json!({
                "range": {
                    "start": { "line": line_no, "character": character },
                    "end": { "line": line_no, "character": character + utf16_len(word) }
                },
                "severity": 2,
                "code": UNUSED_CODE,
                "source": "mockls",
                "message": format!("Unused local variable `{word}`.")
            }));
        }
    }
    diagnostics
}

/// Identifiers with their byte offsets.
fn words(line: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut rest = line.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some(&(_, c)) = rest.peek() {
            if is_word_char(c) {
                break;
            }
            rest.next();
        }
        let (start, _) = *rest.peek()?;
        let mut end = start;
        while let Some(&(i, c)) = rest.peek() {
            if !is_word_char(c) {
                break;
            }
            end = i + c.len_utf8();
            rest.next();
        }
        Some((start, &line[start..end]))
    })
}

/// The identifier covering UTF-16 column `character`.
fn word_at(line: &str, character: u64) -> Option<&str> {
    let offset = byte_offset(line, character);
    words(line)
        .find(|(start, word)| (*start..=start + word.len()).contains(&offset))
        .map(|(_, word)| word)
}

/// Byte offset of `needle` in `haystack` where it is not followed by more
/// identifier characters.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(at, _)| at).find(|at| {
        haystack[at + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c))
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Byte offset of UTF-16 column `character` in `line`, clamped to its end.
fn byte_offset(line: &str, character: u64) -> usize {
    let mut units = 0u64;
    for (i, c) in line.char_indices() {
        if units >= character {
            return i;
        }
        units += c.len_utf16() as u64;
    }
    line.len()
}

/// Byte offset of an LSP position in `text`. Positions past the end of a
/// line clamp to the line end; lines past the end clamp to the text end.
fn position_offset(text: &str, position: &Value) -> usize {
    let line = position.get("line").and_then(Value::as_u64).unwrap_or(0);
    let character = position
        .get("character")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut line_start = 0;
    for (index, segment) in text.split_inclusive('\n').enumerate() {
        if index as u64 == line {
            let content = segment.trim_end_matches(['\n', '\r']);
            return line_start + byte_offset(content, character);
        }
        line_start += segment.len();
    }
    text.len()
}

/// Apply one `TextDocumentContentChangeEvent`. Without a range the text is
/// replaced wholesale.
fn apply_change(text: &mut String, change: &Value) {
    let new_text = change.get("text").and_then(Value::as_str).unwrap_or_default();
    match change.get("range") {
        Some(range) => {
            let start = position_offset(text, &range["start"]);
            let end = position_offset(text, &range["end"]).max(start);
            text.replace_range(start..end, new_text);
        }
        None => new_text.clone_into(text),
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let mut server = MockServer::new(args, io::stdout().lock());
    server.run(&mut io::stdin().lock())
}
