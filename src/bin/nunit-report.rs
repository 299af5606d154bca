use clap::Parser;
use tracing::error;

use nunit_socket_runner::config::{ReportArgs, ReportInvocation, REPORT_USAGE};
use nunit_socket_runner::error::ReportError;
use nunit_socket_runner::report;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nunit_socket_runner=warn".into()),
        )
        .init();

    let args = ReportArgs::parse();
    let (input, output) = match ReportInvocation::from_args(&args.args) {
        Ok(ReportInvocation::Convert { input, output }) => (input, output),
        Ok(ReportInvocation::Help) | Err(_) => {
            println!("{}", REPORT_USAGE);
            return Ok(());
        }
    };

    match report::write_report(&input, &output) {
        Ok(()) => Ok(()),
        Err(ReportError::InputNotFound { .. }) => {
            println!("File does not exist");
            Ok(())
        }
        Err(e) => {
            error!("Failed to convert {:?}: {}", input, e);
            Err(e.into())
        }
    }
}
