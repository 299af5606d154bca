use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{}", crate::config::REPORT_USAGE)]
    Usage,

    #[error("File does not exist: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Malformed input: {details}")]
    MalformedInput { details: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub fn malformed(details: impl Into<String>) -> Self {
        ReportError::MalformedInput {
            details: details.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<quick_xml::Error> for ReportError {
    fn from(value: quick_xml::Error) -> Self {
        ReportError::malformed(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {details} (last line: {})", .last_line.as_deref().unwrap_or("<none>"))]
    Protocol {
        details: String,
        last_line: Option<String>,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Console input failed: {0}")]
    Operator(#[source] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ClientError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn protocol(details: impl Into<String>, last_line: Option<&str>) -> Self {
        ClientError::Protocol {
            details: details.into(),
            last_line: last_line.map(str::to_string),
        }
    }
}
