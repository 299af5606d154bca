use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, trace};

use super::accumulator::{read_selection, AccumulatorPaths, ResultAccumulator};
use super::operator::Operator;
use super::protocol::{read_line, write_line, ProtocolLine, SelectionAnswer};
use crate::config::{FAILED_MARK, PASSED_MARK, SKIPPED_MARK};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Selecting,
    Excluding,
    Streaming,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub finish_line: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct SessionOutcome {
    pub summary: RunSummary,
    pub report_xml: String,
}

/// Which of the two selection exchanges is being answered.
#[derive(Clone, Copy)]
enum Stage {
    Run,
    Exclude,
}

impl Stage {
    fn prompt(self) -> &'static str {
        match self {
            Stage::Run => "Specify tests to run? [y]/[n]/[f]",
            Stage::Exclude => "Specify tests to exclude? [y]/[n]/[f]",
        }
    }

    fn list_prompt(self) -> &'static str {
        match self {
            Stage::Run => "Enter tests to run, comma separated with full name in a single line:",
            Stage::Exclude => {
                "Enter tests to exclude, comma separated with full name in a single line:"
            }
        }
    }
}

/// One pass of the runner protocol over an established connection.
///
/// The session never has more than one request in flight: each step writes
/// its lines and then waits for the runner's answer.
pub struct RunnerSession<'a, R, W> {
    reader: R,
    writer: W,
    operator: &'a mut dyn Operator,
    accumulators: AccumulatorPaths,
    read_timeout: Option<Duration>,
    state: SessionState,
    append_passed: bool,
    last_line: Option<String>,
}

impl<'a, R, W> RunnerSession<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        operator: &'a mut dyn Operator,
        accumulators: AccumulatorPaths,
        read_timeout: Option<Duration>,
    ) -> Self {
        RunnerSession {
            reader,
            writer,
            operator,
            accumulators,
            read_timeout,
            state: SessionState::Selecting,
            append_passed: false,
            last_line: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether `passed.txt` will be appended to rather than rewritten.
    pub fn appends_passed(&self) -> bool {
        self.append_passed
    }

    /// Drives the whole exchange. Any failure leaves the session `Failed`.
    pub async fn run(&mut self) -> Result<SessionOutcome, ClientError> {
        let result = self.drive().await;
        if result.is_err() {
            self.state = SessionState::Failed;
        }
        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome, ClientError> {
        self.select_tests().await?;
        self.exclude_tests().await?;
        let summary = self.stream_results().await?;
        let report_xml = self.receive_report().await?;
        Ok(SessionOutcome {
            summary,
            report_xml,
        })
    }

    pub async fn select_tests(&mut self) -> Result<(), ClientError> {
        self.expect_state(SessionState::Selecting)?;
        self.answer_selection(Stage::Run).await?;
        self.state = SessionState::Excluding;
        Ok(())
    }

    pub async fn exclude_tests(&mut self) -> Result<(), ClientError> {
        self.expect_state(SessionState::Excluding)?;
        self.answer_selection(Stage::Exclude).await?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    async fn answer_selection(&mut self, stage: Stage) -> Result<(), ClientError> {
        let answer = self
            .operator
            .ask(stage.prompt())
            .map_err(ClientError::Operator)?;

        match SelectionAnswer::classify(&answer) {
            SelectionAnswer::Yes => {
                self.send(&answer).await?;
                let names = self
                    .operator
                    .ask(stage.list_prompt())
                    .map_err(ClientError::Operator)?;
                self.send(&names).await?;
            }
            SelectionAnswer::FromFile => {
                let source = self.selection_file(stage);
                let names = read_selection(&source)?;
                debug!("Sending selection from {:?}", source);
                self.send("y").await?;
                self.send(&names).await?;
                self.append_passed = true;
            }
            SelectionAnswer::Raw => self.send(&answer).await?,
        }
        Ok(())
    }

    /// Previous failures are re-run; previous passes are excluded.
    fn selection_file(&self, stage: Stage) -> PathBuf {
        match stage {
            Stage::Run => self.accumulators.failed.clone(),
            Stage::Exclude => self.accumulators.passed.clone(),
        }
    }

    /// Consumes progress lines up to and including `Run finished`.
    pub async fn stream_results(&mut self) -> Result<RunSummary, ClientError> {
        self.expect_state(SessionState::Streaming)?;

        let mut accumulator = ResultAccumulator::open(&self.accumulators, self.append_passed)?;
        let started_at = Utc::now();
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);

        self.operator.notice("Running tests...");
        let finish_line = loop {
            let line = self.next_line().await?;
            match ProtocolLine::parse(&line) {
                ProtocolLine::Passed(name) => {
                    self.operator.progress(PASSED_MARK);
                    accumulator.record_passed(&name)?;
                    passed += 1;
                }
                ProtocolLine::Failed(name) => {
                    self.operator.progress(FAILED_MARK);
                    accumulator.record_failed(&name)?;
                    failed += 1;
                }
                ProtocolLine::Skipped(_) => {
                    self.operator.progress(SKIPPED_MARK);
                    skipped += 1;
                }
                ProtocolLine::RunFinished(line) => break line,
                ProtocolLine::ResultPayload(_) | ProtocolLine::Other(_) => {
                    trace!("Ignoring runner line: {}", line);
                }
            }
        };
        drop(accumulator);

        self.operator.notice(&finish_line);
        self.state = SessionState::Finished;
        info!(
            "Run finished: {} passed, {} failed, {} skipped",
            passed, failed, skipped
        );

        Ok(RunSummary {
            passed,
            failed,
            skipped,
            finish_line,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Reads the single line carrying the NUnit result document.
    pub async fn receive_report(&mut self) -> Result<String, ClientError> {
        self.expect_state(SessionState::Finished)?;
        let line = self.next_line().await?;
        match ProtocolLine::payload(&line) {
            ProtocolLine::ResultPayload(xml) => {
                debug!("Received result document ({} bytes)", xml.len());
                Ok(xml)
            }
            other => Err(ClientError::protocol(
                format!("expected result document, got {:?}", other),
                self.last_line.as_deref(),
            )),
        }
    }

    async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        trace!("-> {}", text);
        write_line(&mut self.writer, text).await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<String, ClientError> {
        let read = read_line(&mut self.reader);
        let line = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                ClientError::protocol(
                    format!("no line from runner within {}s", limit.as_secs()),
                    self.last_line.as_deref(),
                )
            })??,
            None => read.await?,
        };

        match line {
            Some(line) => {
                trace!("<- {}", line);
                self.last_line = Some(line.clone());
                Ok(line)
            }
            None => {
                self.state = SessionState::Failed;
                Err(ClientError::protocol(
                    "runner closed the connection",
                    self.last_line.as_deref(),
                ))
            }
        }
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::protocol(
                format!("session is {:?}, expected {:?}", self.state, expected),
                self.last_line.as_deref(),
            ))
        }
    }
}
