//! Transport and synchronizer against a real child process.

use std::time::Duration;

use lspcheck_engine::MarkerTable;
use lspcheck_lsp::{
    ContentChange, FrameError, HeaderError, LspClient, LspError, ProtocolError, ServerCommand,
    Transport, TransportOptions, default_client_capabilities,
};
use lspcheck_types::{Location, Position, PublishReport, Range};

use crate::common::{LIB, MAIN, WAIT_LIMIT, mockls};

const LIB_URI: &str = "file:///project/lib.sol";
const MAIN_URI: &str = "file:///project/main.sol";

fn spawn(server: &ServerCommand) -> Transport {
    Transport::spawn(server, TransportOptions::default()).unwrap()
}

#[tokio::test]
async fn open_reports_and_definition() {
    let mut transport = spawn(&mockls(&[]));
    {
        let mut client =
            LspClient::new(transport.connection()).with_diagnostics_timeout(Some(WAIT_LIMIT));
        let init = client
            .initialize(Some("file:///project"), default_client_capabilities())
            .await
            .unwrap();
        assert_eq!(init["capabilities"], serde_json::json!({}));

        let reports = client
            .open_and_wait(LIB_URI, "Solidity", LIB, 1)
            .await
            .unwrap();
        let unused = MarkerTable::extract(LIB).unwrap().get("unused").unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].uri, LIB_URI);
        assert_eq!(reports[0].codes(), vec![Some(2072)]);
        assert_eq!(reports[0].diagnostics[0].range, unused);

        // Both documents are reported, sorted by URI.
        let reports = client
            .open_and_wait(MAIN_URI, "Solidity", MAIN, 2)
            .await
            .unwrap();
        let uris: Vec<_> = reports.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, [LIB_URI, MAIN_URI]);

        let call = MarkerTable::extract(MAIN).unwrap().get("call").unwrap();
        let add = MarkerTable::extract(LIB).unwrap().get("add").unwrap();
        let locations = client.definition(MAIN_URI, call.start).await.unwrap();
        assert_eq!(locations, vec![Location::new(LIB_URI, add)]);

        let nothing = client
            .definition(MAIN_URI, Position::new(0, 0))
            .await
            .unwrap();
        assert!(nothing.is_empty());
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn edits_and_close_update_reports() {
    let mut transport = spawn(&mockls(&[]));
    {
        let mut client =
            LspClient::new(transport.connection()).with_diagnostics_timeout(Some(WAIT_LIMIT));
        client
            .initialize(None, default_client_capabilities())
            .await
            .unwrap();
        client
            .open_and_wait(LIB_URI, "Solidity", LIB, 1)
            .await
            .unwrap();
        client
            .open_and_wait(MAIN_URI, "Solidity", MAIN, 2)
            .await
            .unwrap();

        // Drop `unusedLocal;` from lib.
        let unused = MarkerTable::extract(LIB).unwrap().get("unused").unwrap();
        client
            .change_document(LIB_URI, &[ContentChange::delete(unused.extend_end(1))])
            .await
            .unwrap();
        let reports = client.wait_for_diagnostics(2).await.unwrap();
        assert!(reports.iter().all(PublishReport::is_empty));

        // Insert a new one at the very start of main.
        client
            .change_document(
                MAIN_URI,
                &[ContentChange::insert(Position::new(0, 0), "uint unusedTop;\n")],
            )
            .await
            .unwrap();
        let reports = client.wait_for_diagnostics(2).await.unwrap();
        assert_eq!(reports[1].uri, MAIN_URI);
        assert_eq!(reports[1].diagnostics[0].range, Range::on_line(0, 5, 14));

        // Closing retracts main and reports what is still open.
        client.close_document(MAIN_URI).await.unwrap();
        let reports = client.wait_for_diagnostics(2).await.unwrap();
        assert_eq!(reports[0].uri, LIB_URI);
        assert_eq!(reports[1].uri, MAIN_URI);
        assert!(reports[1].is_empty());
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn initialize_error_response_is_protocol_error() {
    let mut transport = spawn(&mockls(&["--fail-on", "initialize"]));
    let err = LspClient::new(transport.connection())
        .initialize(None, default_client_capabilities())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            LspError::Protocol(ProtocolError::ErrorResponse { code: -32603, .. })
        ),
        "{err:?}"
    );
    transport.shutdown().await;
}

#[tokio::test]
async fn definition_error_response_is_protocol_error() {
    let mut transport = spawn(&mockls(&["--fail-on", "textDocument/definition"]));
    {
        let mut client = LspClient::new(transport.connection());
        client
            .initialize(None, default_client_capabilities())
            .await
            .unwrap();
        let err = client
            .definition(MAIN_URI, Position::new(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LspError::Protocol(ProtocolError::ErrorResponse { .. })
        ));
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn unknown_header_is_malformed_frame() {
    let mut transport = spawn(&mockls(&["--bad-header"]));
    {
        let mut client =
            LspClient::new(transport.connection()).with_diagnostics_timeout(Some(WAIT_LIMIT));
        client
            .initialize(None, default_client_capabilities())
            .await
            .unwrap();
        let err = client
            .open_and_wait(LIB_URI, "Solidity", LIB, 1)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                LspError::Frame(FrameError::MalformedHeader(HeaderError::UnknownHeader(ref name)))
                    if name == "X-Mock-Header"
            ),
            "{err:?}"
        );
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn server_exit_closes_the_stream() {
    let mut transport = spawn(&mockls(&["--exit-on", "textDocument/didOpen"]));
    {
        let mut client =
            LspClient::new(transport.connection()).with_diagnostics_timeout(Some(WAIT_LIMIT));
        client
            .initialize(None, default_client_capabilities())
            .await
            .unwrap();
        let err = client
            .open_and_wait(LIB_URI, "Solidity", LIB, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LspError::StreamClosed), "{err:?}");
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn waiting_for_too_many_reports_times_out() {
    let mut transport = spawn(&mockls(&[]));
    {
        let mut client = LspClient::new(transport.connection())
            .with_diagnostics_timeout(Some(Duration::from_millis(300)));
        client
            .initialize(None, default_client_capabilities())
            .await
            .unwrap();
        let err = client
            .open_and_wait(LIB_URI, "Solidity", LIB, 2)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                LspError::Timeout {
                    expected: 2,
                    received: 1,
                    ..
                }
            ),
            "{err:?}"
        );
    }
    transport.shutdown().await;
}

#[tokio::test]
async fn missing_program_is_spawn_error() {
    let server = ServerCommand::new("lspcheck-no-such-server", ["--lsp"]);
    let err = Transport::spawn(&server, TransportOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, LspError::Spawn { .. }), "{err:?}");
}
