//! LSP client side of the conformance harness.
//!
//! Layers, bottom up:
//! - [`codec`] frames JSON bodies with `Content-Length` headers.
//! - [`transport`] runs the server process and correlates requests.
//! - [`client`] holds the document conversation and waits for diagnostics.

pub mod client;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::LspClient;
pub use error::{FrameError, HeaderError, LspError, ProtocolError};
pub use protocol::{ContentChange, default_client_capabilities, path_to_file_uri};
pub use transport::{Connection, IO_TRACE_TARGET, ServerCommand, Transport, TransportOptions};
