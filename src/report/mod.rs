pub mod model;
pub mod names;
pub mod templates;

use encoding_rs::{Encoding, UTF_8};
use std::path::Path;
use tracing::{debug, info};

use crate::config::REPORT_TITLE;
use crate::error::ReportError;

pub use model::{parse_test_run, TestRun};

/// Renders the NUnit result file at `path` as a standalone HTML page.
pub fn render(path: &Path) -> Result<String, ReportError> {
    let xml = read_document(path)?;
    render_document(&xml)
}

pub fn render_document(xml: &str) -> Result<String, ReportError> {
    let run = parse_test_run(xml)?;
    let page = templates::page(REPORT_TITLE, templates::report_body(&run));
    Ok(page.into_string())
}

/// Reads a result file, honoring a UTF-8 or UTF-16 byte order mark.
pub fn read_document(path: &Path) -> Result<String, ReportError> {
    let bytes = std::fs::read(path).map_err(|e| ReportError::io(path, e))?;
    Ok(decode_document(&bytes))
}

pub fn decode_document(bytes: &[u8]) -> String {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    debug!("Decoding result document as {}", encoding.name());
    let (text, _had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    text.into_owned()
}

/// Converts `input` into an HTML report at `output`, replacing any existing
/// file and creating the output directory when needed.
pub fn write_report(input: &Path, output: &Path) -> Result<(), ReportError> {
    if !input.exists() {
        return Err(ReportError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    if output.exists() {
        std::fs::remove_file(output).map_err(|e| ReportError::io(output, e))?;
    }
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    }

    let html = render(input)?;
    std::fs::write(output, html).map_err(|e| ReportError::io(output, e))?;
    info!("Wrote report {:?} from {:?}", output, input);
    Ok(())
}
