use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ReportError;
use crate::settings::PersistentSettings;

/// NUnit socket runner client. Selects tests on a remote runner, streams
/// results and renders the final report.
#[derive(Parser, Debug, Clone)]
#[command(name = "nunit-socket-runner")]
pub struct RunnerArgs {
    /// Runner host; prompted for when omitted
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Runner TCP port
    #[arg(long = "port", default_value_t = RUNNER_PORT)]
    pub port: u16,

    /// Directory for passed.txt, failed.txt and the result artifacts
    #[arg(short = 'w', long = "work-dir", default_value = ".")]
    pub work_dir: PathBuf,

    /// Fail a read that waits longer than this (blocks forever when unset)
    #[arg(long = "read-timeout-secs")]
    pub read_timeout_secs: Option<u64>,

    /// Do not open TestResult.html when the run completes
    #[arg(long = "no-open")]
    pub no_open: bool,
}

/// Converts an NUnit results file to a standalone HTML page.
#[derive(Parser, Debug, Clone)]
#[command(name = "nunit-report")]
pub struct ReportArgs {
    /// [input-path] [output-path]
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub struct RunnerConfig {
    pub host: Option<String>,
    pub port: u16,
    pub work_dir: PathBuf,
    pub read_timeout: Option<Duration>,
    pub open_report: bool,
    pub last_host: Option<String>,
}

// Protocol constants
pub const RUNNER_PORT: u16 = 4711;
pub const RETURN_TOKEN: &str = "**RETURN**";
pub const PASSED_PREFIX: &str = "Passed ";
pub const FAILED_PREFIX: &str = "Failed ";
pub const SKIPPED_PREFIX: &str = "Skipped ";
pub const RUN_FINISHED_PREFIX: &str = "Run finished";

// Console progress marks
pub const PASSED_MARK: char = '.';
pub const FAILED_MARK: char = 'X';
pub const SKIPPED_MARK: char = '>';

// Artifact file names
pub const PASSED_FILE: &str = "passed.txt";
pub const FAILED_FILE: &str = "failed.txt";
pub const RESULT_XML_FILE: &str = "TestResult.xml";
pub const RESULT_HTML_FILE: &str = "TestResult.html";
pub const SETTINGS_FILE: &str = "runner-settings.json";

// Report constants
pub const FIXTURE_SUITE_TYPE: &str = "TestFixture";
pub const REPORT_TITLE: &str = "Results";
pub const REPORT_USAGE: &str = "Usage: nunit-report [input-path] [output-path]";
pub const HELP_TOKENS: &[&str] = &["?", "/?", "help"];

impl RunnerConfig {
    pub fn from_args(args: RunnerArgs, settings: &PersistentSettings) -> Self {
        RunnerConfig {
            host: args.host.filter(|h| !h.trim().is_empty()),
            port: args.port,
            work_dir: args.work_dir,
            read_timeout: args.read_timeout_secs.map(Duration::from_secs),
            open_report: !args.no_open,
            last_host: settings.last_host.clone(),
        }
    }

    pub fn result_xml_path(&self) -> PathBuf {
        self.work_dir.join(RESULT_XML_FILE)
    }

    pub fn result_html_path(&self) -> PathBuf {
        self.work_dir.join(RESULT_HTML_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.work_dir.join(SETTINGS_FILE)
    }
}

/// What the report binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportInvocation {
    Help,
    Convert { input: PathBuf, output: PathBuf },
}

impl ReportInvocation {
    /// One argument converts next to the input, two name both paths, a help
    /// token asks for usage. Anything else is a usage error.
    pub fn from_args(args: &[String]) -> Result<Self, ReportError> {
        if args.iter().any(|a| HELP_TOKENS.contains(&a.as_str())) {
            return Ok(ReportInvocation::Help);
        }
        match args {
            [input] => {
                let input = PathBuf::from(input);
                let output = input.with_extension("html");
                Ok(ReportInvocation::Convert { input, output })
            }
            [input, output] => Ok(ReportInvocation::Convert {
                input: PathBuf::from(input),
                output: PathBuf::from(output),
            }),
            _ => Err(ReportError::Usage),
        }
    }
}
