//! Interactive client for the NUnit socket runner.
//!
//! Connects to a runner on port 4711, answers its test selection questions,
//! records streamed results into `passed.txt` / `failed.txt` and turns the
//! final result document into `TestResult.xml` and `TestResult.html`.

pub mod accumulator;
pub mod operator;
pub mod protocol;
pub mod session;

use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::info;

use crate::config::RunnerConfig;
use crate::error::ClientError;
use crate::report;
use accumulator::AccumulatorPaths;
use operator::Operator;
use session::{RunSummary, RunnerSession};

/// Files produced by a completed session.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub xml_path: PathBuf,
    pub html_path: PathBuf,
}

/// Host from the command line, or asked for with the last used host as the
/// default answer.
pub fn resolve_host(config: &RunnerConfig, operator: &mut dyn Operator) -> Result<String, ClientError> {
    if let Some(host) = &config.host {
        return Ok(host.clone());
    }

    let prompt = match &config.last_host {
        Some(last) => format!("IP Address [{}]: ", last),
        None => "IP Address: ".to_string(),
    };
    let answer = operator.ask(&prompt).map_err(ClientError::Operator)?;
    match (answer.trim(), &config.last_host) {
        ("", Some(last)) => Ok(last.clone()),
        (host, _) => Ok(host.to_string()),
    }
}

pub async fn connect(host: &str, port: u16) -> Result<TcpStream, ClientError> {
    let addr = format!("{}:{}", host, port);
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| ClientError::Connection {
            addr: addr.clone(),
            source,
        })?;
    info!("Connected to runner at {}", addr);
    Ok(stream)
}

/// Runs a complete session over an established connection and publishes
/// the report into the work directory.
pub async fn run_connected(
    stream: TcpStream,
    config: &RunnerConfig,
    operator: &mut dyn Operator,
) -> Result<RunReport, ClientError> {
    let (read_half, write_half) = stream.into_split();
    let mut session = RunnerSession::new(
        BufReader::new(read_half),
        write_half,
        operator,
        AccumulatorPaths::in_dir(&config.work_dir),
        config.read_timeout,
    );
    let outcome = session.run().await?;

    let xml_path = config.result_xml_path();
    let html_path = config.result_html_path();
    publish_report(&outcome.report_xml, &xml_path, &html_path)?;

    Ok(RunReport {
        summary: outcome.summary,
        xml_path,
        html_path,
    })
}

/// Saves the received document and renders it next to it.
pub fn publish_report(xml: &str, xml_path: &Path, html_path: &Path) -> Result<(), ClientError> {
    std::fs::write(xml_path, encode_utf16_with_bom(xml))
        .map_err(|e| ClientError::io(xml_path, e))?;
    report::write_report(xml_path, html_path)?;
    info!("Report written to {:?}", html_path);
    Ok(())
}

/// UTF-16LE with a byte order mark, the runner's text encoding.
pub fn encode_utf16_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
