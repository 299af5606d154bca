//! Read-once view of an NUnit result document.
//!
//! The document is walked with a streaming reader; only the root summary,
//! fixture suites and their test cases are kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::names::{case_display_name, namespace_of, parse_duration};
use crate::config::FIXTURE_SUITE_TYPE;
use crate::error::ReportError;

const TAG_TEST_SUITE: &[u8] = b"test-suite";
const TAG_TEST_CASE: &[u8] = b"test-case";
const TAG_FAILURE: &[u8] = b"failure";
const TAG_MESSAGE: &[u8] = b"message";
const TAG_STACK_TRACE: &[u8] = b"stack-trace";
const TAG_PROPERTIES: &[u8] = b"properties";
const TAG_PROPERTY: &[u8] = b"property";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Passed,
    Failed,
    Error,
    Ignored,
    Skipped,
    Other,
}

impl ResultKind {
    pub fn classify(result: &str) -> Self {
        match result.to_ascii_lowercase().as_str() {
            "passed" => ResultKind::Passed,
            "failed" => ResultKind::Failed,
            "error" => ResultKind::Error,
            "ignored" => ResultKind::Ignored,
            "skipped" => ResultKind::Skipped,
            _ => ResultKind::Other,
        }
    }

    /// Panel color for fixtures and the printable case list.
    pub fn panel_class(self) -> &'static str {
        match self {
            ResultKind::Passed => "panel-success",
            ResultKind::Ignored => "panel-warning",
            ResultKind::Failed | ResultKind::Error => "panel-danger",
            ResultKind::Skipped | ResultKind::Other => "panel-default",
        }
    }

    /// Panel color inside the details dialog, where skipped cases are
    /// highlighted like ignored ones.
    pub fn dialog_panel_class(self) -> &'static str {
        match self {
            ResultKind::Skipped => "panel-warning",
            other => other.panel_class(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Danger,
    Warning,
    Neutral,
}

#[derive(Debug, Clone, Default)]
pub struct TestRun {
    pub name: String,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub inconclusive: u32,
    pub skipped: u32,
    pub fixtures: Vec<Fixture>,
}

#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: String,
    pub namespace: String,
    pub duration: f32,
    pub result: String,
    pub reason: Option<String>,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub full_name: String,
    pub result: String,
    pub duration: f32,
    pub failure: Option<Failure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub stack_trace: Option<String>,
}

impl TestRun {
    /// Failure share of the executed tests in tenths of a percent, rounded
    /// half to even. Zero when nothing was executed.
    pub fn failure_rate_tenths(&self) -> u64 {
        let executed = u64::from(self.total.saturating_sub(self.skipped));
        if self.total == 0 || executed == 0 {
            return 0;
        }
        let scaled = u64::from(self.failed) * 1000;
        let (quotient, remainder) = (scaled / executed, scaled % executed);
        match (remainder * 2).cmp(&executed) {
            std::cmp::Ordering::Greater => quotient + 1,
            std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
            _ => quotient,
        }
    }

    /// Success rate as displayed, e.g. `100`, `75.0` or `66.7`. A failure
    /// share that is not a whole multiple of the executed count keeps one
    /// decimal even when it rounds to a whole number.
    pub fn success_rate(&self) -> String {
        let tenths = 1000 - self.failure_rate_tenths() as i64;
        let executed = self.total.saturating_sub(self.skipped);
        if self.total == 0 || executed == 0 || self.failed % executed == 0 {
            format!("{}", tenths / 10)
        } else {
            format!("{:.1}", tenths as f64 / 10.0)
        }
    }

    pub fn tone(&self) -> Tone {
        if self.failed > 0 || self.inconclusive > 0 {
            Tone::Danger
        } else if self.skipped > 0 {
            Tone::Warning
        } else {
            Tone::Neutral
        }
    }
}

impl Fixture {
    pub fn kind(&self) -> ResultKind {
        ResultKind::classify(&self.result)
    }

    /// A reason, when present, takes the place of the duration.
    pub fn duration_label(&self) -> Option<String> {
        match self.reason {
            Some(_) => None,
            None => Some(super::names::format_duration(self.duration)),
        }
    }
}

impl Case {
    pub fn display_name(&self) -> &str {
        case_display_name(&self.full_name)
    }

    pub fn kind(&self) -> ResultKind {
        ResultKind::classify(&self.result)
    }
}

/// Element currently open in the walk, innermost last.
enum Frame {
    Suite { fixture: Option<usize> },
    Case(CaseBuilder),
    Failure,
    Message,
    StackTrace,
    Properties { fixture: usize },
    Other,
}

struct CaseBuilder {
    fixture: usize,
    case: Case,
    failures: usize,
    message: Option<String>,
    stack_trace: Option<String>,
}

/// Parses a complete NUnit result document.
pub fn parse_test_run(xml: &str) -> Result<TestRun, ReportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut parser = ResultParser::default();
    loop {
        match reader.read_event()? {
            Event::Eof => {
                if !parser.frames.is_empty() {
                    return Err(ReportError::malformed("unexpected end of document"));
                }
                break;
            }
            Event::Start(e) => parser.open(&e)?,
            Event::Empty(e) => {
                parser.open(&e)?;
                parser.close();
            }
            Event::End(_) => parser.close(),
            Event::Text(e) => {
                if parser.capturing() {
                    let text = e.unescape()?;
                    parser.push_text(&text);
                }
            }
            Event::CData(e) => {
                if parser.capturing() {
                    let raw = e.into_inner();
                    parser.push_text(&String::from_utf8_lossy(&raw));
                }
            }
            _ => {}
        }
    }

    let mut run = parser
        .run
        .ok_or_else(|| ReportError::malformed("document has no root element"))?;
    run.fixtures = parser.fixtures;
    debug!(
        "Parsed test run '{}' with {} fixtures",
        run.name,
        run.fixtures.len()
    );
    Ok(run)
}

#[derive(Default)]
struct ResultParser {
    run: Option<TestRun>,
    fixtures: Vec<Fixture>,
    frames: Vec<Frame>,
    reason_seen: Vec<bool>,
}

impl ResultParser {
    fn open(&mut self, e: &BytesStart) -> Result<(), ReportError> {
        if self.run.is_some() && self.frames.is_empty() {
            return Err(ReportError::malformed(format!(
                "unexpected <{}> after the root element",
                String::from_utf8_lossy(e.name().as_ref())
            )));
        }
        if self.run.is_none() {
            self.run = Some(parse_summary(e)?);
            self.frames.push(Frame::Other);
            return Ok(());
        }

        let frame = match e.name().as_ref() {
            TAG_TEST_SUITE => {
                if optional_attr(e, "type")?.as_deref() == Some(FIXTURE_SUITE_TYPE) {
                    self.fixtures.push(parse_fixture(e)?);
                    self.reason_seen.push(false);
                    Frame::Suite {
                        fixture: Some(self.fixtures.len() - 1),
                    }
                } else {
                    Frame::Suite { fixture: None }
                }
            }
            TAG_TEST_CASE => match self.innermost_fixture() {
                Some(fixture) => Frame::Case(CaseBuilder {
                    fixture,
                    case: parse_case(e)?,
                    failures: 0,
                    message: None,
                    stack_trace: None,
                }),
                None => Frame::Other,
            },
            TAG_FAILURE => match self.frames.last_mut() {
                Some(Frame::Case(builder)) => {
                    builder.failures += 1;
                    Frame::Failure
                }
                _ => Frame::Other,
            },
            TAG_MESSAGE if self.parent_is_first_failure() => Frame::Message,
            TAG_STACK_TRACE if self.parent_is_first_failure() => Frame::StackTrace,
            TAG_PROPERTIES => match self.frames.last() {
                Some(Frame::Suite {
                    fixture: Some(fixture),
                }) => Frame::Properties { fixture: *fixture },
                _ => Frame::Other,
            },
            TAG_PROPERTY => {
                if let Some(Frame::Properties { fixture }) = self.frames.last() {
                    let fixture = *fixture;
                    if !self.reason_seen[fixture] {
                        self.reason_seen[fixture] = true;
                        let value = optional_attr(e, "value")?.unwrap_or_default();
                        self.fixtures[fixture].reason = Some(value).filter(|v| !v.is_empty());
                    }
                }
                Frame::Other
            }
            _ => Frame::Other,
        };
        self.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        let Some(Frame::Case(builder)) = self.frames.pop() else {
            return;
        };
        let mut case = builder.case;
        if builder.failures == 1 {
            case.failure = Some(Failure {
                message: builder.message.unwrap_or_default(),
                stack_trace: builder.stack_trace,
            });
        }
        self.fixtures[builder.fixture].cases.push(case);
    }

    fn capturing(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame::Message) | Some(Frame::StackTrace)
        )
    }

    fn push_text(&mut self, text: &str) {
        let len = self.frames.len();
        if len < 3 {
            return;
        }
        let target = match &self.frames[len - 1] {
            Frame::Message => 0,
            Frame::StackTrace => 1,
            _ => return,
        };
        if let Frame::Case(builder) = &mut self.frames[len - 3] {
            let slot = if target == 0 {
                &mut builder.message
            } else {
                &mut builder.stack_trace
            };
            slot.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn innermost_fixture(&self) -> Option<usize> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Suite { fixture } => *fixture,
            _ => None,
        })
    }

    fn parent_is_first_failure(&self) -> bool {
        let len = self.frames.len();
        if len < 2 {
            return false;
        }
        matches!(
            (&self.frames[len - 2], &self.frames[len - 1]),
            (Frame::Case(builder), Frame::Failure) if builder.failures == 1
        )
    }
}

fn parse_summary(e: &BytesStart) -> Result<TestRun, ReportError> {
    Ok(TestRun {
        name: required_attr(e, "name")?,
        total: counter_attr(e, "total")?,
        passed: counter_attr(e, "passed")?,
        failed: counter_attr(e, "failed")?,
        inconclusive: counter_attr(e, "inconclusive")?,
        skipped: counter_attr(e, "skipped")?,
        fixtures: Vec::new(),
    })
}

fn parse_fixture(e: &BytesStart) -> Result<Fixture, ReportError> {
    let name = required_attr(e, "name")?;
    let full_name = required_attr(e, "fullname")?;
    Ok(Fixture {
        namespace: namespace_of(&full_name, &name),
        duration: parse_duration(&required_attr(e, "duration")?)?,
        result: refined_result(e)?,
        reason: None,
        passed: required_count(e, "passed")?,
        failed: required_count(e, "failed")?,
        skipped: required_count(e, "skipped")?,
        cases: Vec::new(),
        name,
    })
}

fn parse_case(e: &BytesStart) -> Result<Case, ReportError> {
    Ok(Case {
        full_name: required_attr(e, "name")?,
        result: refined_result(e)?,
        duration: parse_duration(&required_attr(e, "duration")?)?,
        failure: None,
    })
}

/// A `Failed` result is replaced by its more specific label when present.
fn refined_result(e: &BytesStart) -> Result<String, ReportError> {
    let result = required_attr(e, "result")?;
    if result.eq_ignore_ascii_case("failed") {
        if let Some(label) = optional_attr(e, "label")? {
            return Ok(label);
        }
    }
    Ok(result)
}

fn optional_attr(e: &BytesStart, name: &str) -> Result<Option<String>, ReportError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| ReportError::malformed(err.to_string()))?;
    match attr {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn required_attr(e: &BytesStart, name: &str) -> Result<String, ReportError> {
    optional_attr(e, name)?.ok_or_else(|| {
        ReportError::malformed(format!(
            "<{}> is missing attribute '{}'",
            String::from_utf8_lossy(e.name().as_ref()),
            name
        ))
    })
}

fn required_count(e: &BytesStart, name: &str) -> Result<u32, ReportError> {
    let raw = required_attr(e, name)?;
    parse_count(name, &raw)
}

/// Summary counters default to zero when absent or empty.
fn counter_attr(e: &BytesStart, name: &str) -> Result<u32, ReportError> {
    match optional_attr(e, name)? {
        Some(raw) if !raw.is_empty() => parse_count(name, &raw),
        _ => Ok(0),
    }
}

fn parse_count(name: &str, raw: &str) -> Result<u32, ReportError> {
    raw.trim().parse::<u32>().map_err(|_| {
        ReportError::malformed(format!("attribute '{}' is not a number: '{}'", name, raw))
    })
}
