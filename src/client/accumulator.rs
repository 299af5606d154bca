use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{FAILED_FILE, PASSED_FILE};
use crate::error::ClientError;

/// Locations of the comma separated name lists kept between runs.
#[derive(Debug, Clone)]
pub struct AccumulatorPaths {
    pub passed: PathBuf,
    pub failed: PathBuf,
}

impl AccumulatorPaths {
    pub fn in_dir(dir: &Path) -> Self {
        AccumulatorPaths {
            passed: dir.join(PASSED_FILE),
            failed: dir.join(FAILED_FILE),
        }
    }
}

/// Open accumulator files for one streaming phase. Every recorded name is
/// flushed before the next line is read.
pub struct ResultAccumulator {
    paths: AccumulatorPaths,
    passed: File,
    failed: File,
}

impl ResultAccumulator {
    /// Truncates `failed.txt`; `passed.txt` is appended to when the run
    /// resumes an earlier selection.
    pub fn open(paths: &AccumulatorPaths, append_passed: bool) -> Result<Self, ClientError> {
        let failed = File::create(&paths.failed).map_err(|e| ClientError::io(&paths.failed, e))?;
        let passed = if append_passed {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&paths.passed)
        } else {
            File::create(&paths.passed)
        }
        .map_err(|e| ClientError::io(&paths.passed, e))?;

        debug!(
            "Opened accumulators {:?} and {:?} (append passed: {})",
            paths.passed, paths.failed, append_passed
        );
        Ok(ResultAccumulator {
            paths: paths.clone(),
            passed,
            failed,
        })
    }

    pub fn record_passed(&mut self, name: &str) -> Result<(), ClientError> {
        append_name(&mut self.passed, name).map_err(|e| ClientError::io(&self.paths.passed, e))
    }

    pub fn record_failed(&mut self, name: &str) -> Result<(), ClientError> {
        append_name(&mut self.failed, name).map_err(|e| ClientError::io(&self.paths.failed, e))
    }
}

fn append_name(file: &mut File, name: &str) -> std::io::Result<()> {
    write!(file, "{},", name)?;
    file.flush()
}

/// Reads a previous run's list to send as a selection line.
pub fn read_selection(path: &Path) -> Result<String, ClientError> {
    let content = std::fs::read_to_string(path).map_err(|e| ClientError::io(path, e))?;
    Ok(content.trim_end_matches(['\r', '\n']).to_string())
}
