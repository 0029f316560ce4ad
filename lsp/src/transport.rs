//! Framed duplex messaging with one language server process.
//!
//! [`Connection`] speaks JSON-RPC over any async byte pipe; [`Transport`]
//! owns the child process whose stdio backs a connection and guarantees it
//! is killed and reaped.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::{FrameError, LspError, ProtocolError};
use crate::protocol::{Incoming, Notification, Request};

/// Log target used for mirrored I/O.
pub const IO_TRACE_TARGET: &str = "lspcheck::io";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// JSON-RPC messaging over a reader/writer pair.
///
/// Exactly one logical conversation is in flight at a time: `call` writes a
/// request and expects the very next frame to be its reply.
pub struct Connection<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    next_id: u64,
    trace_io: bool,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Connection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
            next_id: 1,
            trace_io: false,
        }
    }

    /// Mirror every frame to the [`IO_TRACE_TARGET`] log target.
    pub fn with_trace_io(mut self, trace_io: bool) -> Self {
        self.trace_io = trace_io;
        self
    }

    /// Send a notification. No reply is expected.
    pub async fn send(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), FrameError> {
        let frame = serde_json::to_value(Notification::new(method, params))?;
        self.trace("send", method, &frame);
        self.writer.write_frame(&frame).await
    }

    /// Send a request and read its reply.
    ///
    /// Replies are not buffered or reordered. If the next frame is not the
    /// response to this request, the call fails with
    /// [`ProtocolError::MismatchedResponse`] so interleaving is flagged
    /// instead of hidden. An error response is returned as-is; callers
    /// decide whether it is fatal.
    pub async fn call(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, LspError> {
        let id = self.next_id;
        self.next_id += 1;

        let frame = serde_json::to_value(Request::new(id, method, params)).map_err(FrameError::from)?;
        self.trace("call", method, &frame);
        self.writer.write_frame(&frame).await?;

        let reply = self.receive().await?.ok_or(LspError::StreamClosed)?;
        match Incoming::classify(&reply) {
            Incoming::Response { id: Some(reply_id), .. } if reply_id.as_u64() == Some(id) => {
                Ok(reply)
            }
            _ => Err(ProtocolError::MismatchedResponse {
                expected_id: id,
                message: reply.to_string(),
            }
            .into()),
        }
    }

    /// Read the next frame, or `None` once the peer has closed its end.
    pub async fn receive(&mut self) -> Result<Option<serde_json::Value>, FrameError> {
        let frame = self.reader.read_frame().await?;
        match &frame {
            Some(frame) => self.trace("receive", "", frame),
            None => tracing::debug!("language server closed its output stream"),
        }
        Ok(frame)
    }

    fn trace(&self, topic: &str, method: &str, frame: &serde_json::Value) {
        if !self.trace_io {
            return;
        }
        let pretty = serde_json::to_string_pretty(frame).unwrap_or_else(|_| frame.to_string());
        if method.is_empty() {
            tracing::info!(target: IO_TRACE_TARGET, "{topic}: {pretty}");
        } else {
            tracing::info!(target: IO_TRACE_TARGET, "{topic} ({method}): {pretty}");
        }
    }
}

/// How to launch the language server under test.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Knobs for one transport session.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub trace_io: bool,
    pub shutdown_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            trace_io: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// A running language server and the connection over its stdio.
///
/// Release with [`Transport::shutdown`]. If a transport is dropped without
/// that (a panic unwinding through the owner), `kill_on_drop` still
/// terminates the child.
pub struct Transport {
    child: Child,
    connection: Connection<ChildStdout, ChildStdin>,
    stderr_task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl Transport {
    /// Spawn the server with stdin, stdout and stderr captured.
    pub fn spawn(command: &ServerCommand, options: TransportOptions) -> Result<Self, LspError> {
        let display = command.program.display().to_string();
        let spawn_error = |source| LspError::Spawn {
            program: display.clone(),
            source,
        };

        let resolved = which::which(&command.program)
            .map_err(|e| spawn_error(std::io::Error::new(std::io::ErrorKind::NotFound, e)))?;

        let mut child = Command::new(&resolved)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let missing = |stream: &str| spawn_error(std::io::Error::other(format!("no {stream} from child")));
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(drain_stderr(stderr)));

        tracing::debug!(program = %resolved.display(), pid = ?child.id(), "language server started");

        Ok(Self {
            child,
            connection: Connection::new(stdout, stdin).with_trace_io(options.trace_io),
            stderr_task,
            shutdown_timeout: options.shutdown_timeout,
        })
    }

    pub fn connection(&mut self) -> &mut Connection<ChildStdout, ChildStdin> {
        &mut self.connection
    }

    /// Kill the server and wait a bounded time for it to exit.
    ///
    /// Teardown never fails: a kill error or a slow exit is logged and the
    /// session is considered released.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("language server already gone: {e}");
        }

        match tokio::time::timeout(self.shutdown_timeout, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "language server exited"),
            Ok(Err(e)) => tracing::warn!("waiting for language server failed: {e}"),
            Err(_) => tracing::warn!(
                "language server did not exit within {:?}",
                self.shutdown_timeout
            ),
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

/// Forward server stderr to the log until EOF.
///
/// Lines are read as bytes: a server writing non-UTF-8 must keep its pipe
/// drained, or its next write fails and it dies.
async fn drain_stderr(stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                tracing::debug!(target: "lspcheck::server_stderr", "{}", text.trim_end());
            }
            Err(e) => {
                tracing::debug!("server stderr closed: {e}");
                break;
            }
        }
    }
}
