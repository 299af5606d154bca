//! Line framing for the socket runner protocol.
//!
//! Every frame is one `\n`-terminated line. Progress lines are tagged by
//! prefix; the final report travels as a single line with each CRLF replaced
//! by [`RETURN_TOKEN`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{
    FAILED_PREFIX, PASSED_PREFIX, RETURN_TOKEN, RUN_FINISHED_PREFIX, SKIPPED_PREFIX,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolLine {
    Passed(String),
    Failed(String),
    Skipped(String),
    RunFinished(String),
    ResultPayload(String),
    Other(String),
}

impl ProtocolLine {
    /// Classifies a line received while results are streaming.
    pub fn parse(line: &str) -> Self {
        if let Some(name) = line.strip_prefix(PASSED_PREFIX) {
            ProtocolLine::Passed(name.to_string())
        } else if let Some(name) = line.strip_prefix(FAILED_PREFIX) {
            ProtocolLine::Failed(name.to_string())
        } else if let Some(name) = line.strip_prefix(SKIPPED_PREFIX) {
            ProtocolLine::Skipped(name.to_string())
        } else if line.starts_with(RUN_FINISHED_PREFIX) {
            ProtocolLine::RunFinished(line.to_string())
        } else {
            ProtocolLine::Other(line.to_string())
        }
    }

    /// The line that follows `Run finished` carries the result document.
    pub fn payload(line: &str) -> Self {
        ProtocolLine::ResultPayload(decode_payload(line))
    }
}

/// How the operator answered a "Specify tests to ...?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAnswer {
    /// Names are typed in next.
    Yes,
    /// Names come from a local accumulator file.
    FromFile,
    /// Forwarded to the runner verbatim.
    Raw,
}

impl SelectionAnswer {
    pub fn classify(answer: &str) -> Self {
        if answer.starts_with('y') {
            SelectionAnswer::Yes
        } else if answer.starts_with('f') {
            SelectionAnswer::FromFile
        } else {
            SelectionAnswer::Raw
        }
    }
}

pub fn encode_payload(xml: &str) -> String {
    xml.replace("\r\n", RETURN_TOKEN)
}

pub fn decode_payload(line: &str) -> String {
    line.replace(RETURN_TOKEN, "\r\n")
}

/// Reads one line without its terminator. `None` means the peer closed the
/// connection.
pub async fn read_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

pub async fn write_line<W>(writer: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
