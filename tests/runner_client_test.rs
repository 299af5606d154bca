use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use nunit_socket_runner::client::accumulator::AccumulatorPaths;
use nunit_socket_runner::client::operator::ScriptedOperator;
use nunit_socket_runner::client::protocol::{encode_payload, read_line, write_line};
use nunit_socket_runner::client::session::{RunnerSession, SessionState};
use nunit_socket_runner::client::{self, resolve_host, RunReport};
use nunit_socket_runner::config::RunnerConfig;
use nunit_socket_runner::error::ClientError;
use nunit_socket_runner::report;

const RESULT_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\r\n\
<test-run id=\"2\" name=\"Remote.Tests.dll\" total=\"3\" passed=\"1\" failed=\"1\" inconclusive=\"0\" skipped=\"1\">\r\n\
  <test-suite type=\"TestFixture\" name=\"RemoteFixture\" fullname=\"Remote.RemoteFixture\" result=\"Failed\" duration=\"0.5\" passed=\"1\" failed=\"1\" skipped=\"1\">\r\n\
    <test-case name=\"Remote.RemoteFixture.T1\" result=\"Passed\" duration=\"0.1\" />\r\n\
    <test-case name=\"Remote.RemoteFixture.T2\" result=\"Failed\" duration=\"0.2\">\r\n\
      <failure><message>boom</message></failure>\r\n\
    </test-case>\r\n\
    <test-case name=\"Remote.RemoteFixture.T3\" result=\"Skipped\" duration=\"0\" />\r\n\
  </test-suite>\r\n\
</test-run>";

fn config_for(dir: &Path, port: u16) -> RunnerConfig {
    RunnerConfig {
        host: Some("127.0.0.1".to_string()),
        port,
        work_dir: dir.to_path_buf(),
        read_timeout: Some(Duration::from_secs(5)),
        open_report: false,
        last_host: None,
    }
}

/// Accepts one connection, reads `expected_reads` lines from the client, then
/// replies with `script` and closes. Yields the lines the client sent.
async fn fake_runner(expected_reads: usize, script: Vec<String>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut received = Vec::new();
        for _ in 0..expected_reads {
            match read_line(&mut reader).await.unwrap() {
                Some(line) => received.push(line),
                None => break,
            }
        }
        for line in &script {
            write_line(&mut write_half, line).await.unwrap();
        }
        write_half.shutdown().await.unwrap();
        received
    });

    (port, handle)
}

async fn run_session(
    config: &RunnerConfig,
    operator: &mut ScriptedOperator,
) -> Result<RunReport, ClientError> {
    let stream = client::connect("127.0.0.1", config.port).await?;
    client::run_connected(stream, config, operator).await
}

fn full_run_script() -> Vec<String> {
    vec![
        "Passed Remote.RemoteFixture.T1".to_string(),
        "Failed Remote.RemoteFixture.T2".to_string(),
        "Skipped Remote.RemoteFixture.T3".to_string(),
        "Loading tests...".to_string(),
        "Run finished: 3 tests".to_string(),
        encode_payload(RESULT_XML),
    ]
}

#[tokio::test]
async fn test_full_session_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let (port, peer) = fake_runner(2, full_run_script()).await;
    let config = config_for(dir.path(), port);
    let mut operator = ScriptedOperator::new(["n", "n"]);

    let outcome = run_session(&config, &mut operator)
        .await
        .unwrap();

    assert_eq!(peer.await.unwrap(), vec!["n", "n"]);
    assert_eq!(
        operator.prompts,
        vec![
            "Specify tests to run? [y]/[n]/[f]",
            "Specify tests to exclude? [y]/[n]/[f]",
        ]
    );
    assert_eq!(operator.marks, ".X>");
    assert_eq!(
        operator.notices,
        vec!["Running tests...", "Run finished: 3 tests"]
    );

    assert_eq!(outcome.summary.passed, 1);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.summary.skipped, 1);
    assert_eq!(outcome.summary.finish_line, "Run finished: 3 tests");

    let passed = std::fs::read_to_string(dir.path().join("passed.txt")).unwrap();
    let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
    assert_eq!(passed, "Remote.RemoteFixture.T1,");
    assert_eq!(failed, "Remote.RemoteFixture.T2,");

    let xml_bytes = std::fs::read(&outcome.xml_path).unwrap();
    assert_eq!(&xml_bytes[..2], &[0xFF, 0xFE]);
    assert_eq!(report::read_document(&outcome.xml_path).unwrap(), RESULT_XML);

    let html = std::fs::read_to_string(&outcome.html_path).unwrap();
    assert!(html.contains("RemoteFixture"));
    assert!(html.contains("<pre>boom</pre>"));
    assert_eq!(outcome.html_path, dir.path().join("TestResult.html"));
}

#[tokio::test]
async fn test_connection_closed_mid_stream() {
    let dir = TempDir::new().unwrap();
    let script = vec!["Passed Remote.RemoteFixture.T1".to_string()];
    let (port, peer) = fake_runner(2, script).await;
    let config = config_for(dir.path(), port);
    let mut operator = ScriptedOperator::new(["n", "n"]);

    let err = run_session(&config, &mut operator)
        .await
        .unwrap_err();
    peer.await.unwrap();

    match err {
        ClientError::Protocol { last_line, .. } => {
            assert_eq!(last_line.as_deref(), Some("Passed Remote.RemoteFixture.T1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        std::fs::read_to_string(dir.path().join("passed.txt")).unwrap(),
        "Remote.RemoteFixture.T1,"
    );
    assert!(!dir.path().join("TestResult.xml").exists());
    assert!(!dir.path().join("TestResult.html").exists());
}

#[tokio::test]
async fn test_rerun_from_previous_results() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("failed.txt"), "Remote.RemoteFixture.T2,\n").unwrap();
    std::fs::write(dir.path().join("passed.txt"), "Remote.RemoteFixture.T1,").unwrap();

    let script = vec![
        "Passed Remote.RemoteFixture.T2".to_string(),
        "Run finished: 1 test".to_string(),
        encode_payload(RESULT_XML),
    ];
    let (port, peer) = fake_runner(4, script).await;
    let config = config_for(dir.path(), port);
    let mut operator = ScriptedOperator::new(["f", "f"]);

    run_session(&config, &mut operator)
        .await
        .unwrap();

    assert_eq!(
        peer.await.unwrap(),
        vec!["y", "Remote.RemoteFixture.T2,", "y", "Remote.RemoteFixture.T1,"]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("passed.txt")).unwrap(),
        "Remote.RemoteFixture.T1,Remote.RemoteFixture.T2,"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("failed.txt")).unwrap(),
        ""
    );
}

#[tokio::test]
async fn test_report_line_must_follow_run_finished() {
    let dir = TempDir::new().unwrap();
    let script = vec!["Run finished: 0 tests".to_string()];
    let (port, peer) = fake_runner(2, script).await;
    let config = config_for(dir.path(), port);
    let mut operator = ScriptedOperator::new(["n", "n"]);

    let err = run_session(&config, &mut operator)
        .await
        .unwrap_err();
    peer.await.unwrap();

    assert!(matches!(err, ClientError::Protocol { .. }));
    assert!(!dir.path().join("TestResult.xml").exists());
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = client::connect("127.0.0.1", port).await.unwrap_err();
    match err {
        ClientError::Connection { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{}", port)),
        other => panic!("unexpected error: {other:?}"),
    }
}

// --- Session over an in-memory pipe ---

#[tokio::test]
async fn test_session_sends_typed_selection() {
    let dir = TempDir::new().unwrap();
    let (client_end, server_end) = tokio::io::duplex(4096);
    let (read_half, write_half) = tokio::io::split(client_end);
    let mut operator = ScriptedOperator::new(["y", "A.B.T1,A.B.T2", "n"]);

    {
        let mut session = RunnerSession::new(
            BufReader::new(read_half),
            write_half,
            &mut operator,
            AccumulatorPaths::in_dir(dir.path()),
            None,
        );
        assert_eq!(session.state(), SessionState::Selecting);
        session.select_tests().await.unwrap();
        assert_eq!(session.state(), SessionState::Excluding);
        session.exclude_tests().await.unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
        assert!(!session.appends_passed());
    }

    let mut server = BufReader::new(server_end);
    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(read_line(&mut server).await.unwrap().unwrap());
    }
    assert_eq!(received, vec!["y", "A.B.T1,A.B.T2", "n"]);
    assert_eq!(
        operator.prompts[1],
        "Enter tests to run, comma separated with full name in a single line:"
    );
}

#[tokio::test]
async fn test_session_rejects_out_of_order_steps() {
    let dir = TempDir::new().unwrap();
    let (client_end, _server_end) = tokio::io::duplex(64);
    let (read_half, write_half) = tokio::io::split(client_end);
    let mut operator = ScriptedOperator::new(Vec::<String>::new());

    let mut session = RunnerSession::new(
        BufReader::new(read_half),
        write_half,
        &mut operator,
        AccumulatorPaths::in_dir(dir.path()),
        None,
    );
    assert!(matches!(
        session.stream_results().await,
        Err(ClientError::Protocol { .. })
    ));
    assert!(matches!(
        session.receive_report().await,
        Err(ClientError::Protocol { .. })
    ));
    assert_eq!(session.state(), SessionState::Selecting);
}

#[tokio::test]
async fn test_session_read_timeout() {
    let dir = TempDir::new().unwrap();
    let (client_end, _server_end) = tokio::io::duplex(4096);
    let (read_half, write_half) = tokio::io::split(client_end);
    let mut operator = ScriptedOperator::new(["n", "n"]);

    let mut session = RunnerSession::new(
        BufReader::new(read_half),
        write_half,
        &mut operator,
        AccumulatorPaths::in_dir(dir.path()),
        Some(Duration::from_millis(100)),
    );
    let err = session.run().await.err().unwrap();
    assert_eq!(session.state(), SessionState::Failed);
    match err {
        ClientError::Protocol { details, last_line } => {
            assert!(details.contains("no line from runner"));
            assert!(last_line.is_none());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_operator_input_closed() {
    let dir = TempDir::new().unwrap();
    let (client_end, _server_end) = tokio::io::duplex(64);
    let (read_half, write_half) = tokio::io::split(client_end);
    let mut operator = ScriptedOperator::new(Vec::<String>::new());

    let mut session = RunnerSession::new(
        BufReader::new(read_half),
        write_half,
        &mut operator,
        AccumulatorPaths::in_dir(dir.path()),
        None,
    );
    assert!(matches!(
        session.run().await,
        Err(ClientError::Operator(_))
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

// --- Host prompt ---

#[test]
fn test_resolve_host_uses_last_host_on_empty_answer() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(dir.path(), 4711);
    config.host = None;
    config.last_host = Some("10.0.0.9".to_string());

    let mut operator = ScriptedOperator::new([""]);
    assert_eq!(resolve_host(&config, &mut operator).unwrap(), "10.0.0.9");
    assert_eq!(operator.prompts, vec!["IP Address [10.0.0.9]: "]);

    let mut operator = ScriptedOperator::new(["10.0.0.7"]);
    assert_eq!(resolve_host(&config, &mut operator).unwrap(), "10.0.0.7");
}

#[test]
fn test_resolve_host_prefers_command_line() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), 4711);
    let mut operator = ScriptedOperator::new(Vec::<String>::new());
    assert_eq!(resolve_host(&config, &mut operator).unwrap(), "127.0.0.1");
    assert!(operator.prompts.is_empty());
}
