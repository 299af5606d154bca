use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};

use nunit_socket_runner::client::{self, operator::ConsoleOperator, operator::Operator};
use nunit_socket_runner::config::{RunnerArgs, RunnerConfig, SETTINGS_FILE};
use nunit_socket_runner::error::ClientError;
use nunit_socket_runner::settings::{load_settings, save_settings, PersistentSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nunit_socket_runner=warn".into()),
        )
        .init();

    let args = RunnerArgs::parse();
    let mut settings = load_settings(&args.work_dir.join(SETTINGS_FILE));
    let config = RunnerConfig::from_args(args, &settings);
    let mut operator = ConsoleOperator::new();

    if let Err(e) = run(&config, &mut settings, &mut operator).await {
        error!("Runner session failed: {:?}", e);
        operator.notice(&format!("Error: {}", describe(&e)));
        operator.wait_for_acknowledgment();
    }

    Ok(())
}

async fn run(
    config: &RunnerConfig,
    settings: &mut PersistentSettings,
    operator: &mut ConsoleOperator,
) -> Result<(), ClientError> {
    let host = client::resolve_host(config, operator)?;
    let stream = client::connect(&host, config.port).await?;
    if settings.remember_host(&host) {
        save_settings(&config.settings_path(), settings);
    }
    operator.notice("Connected");

    let report = client::run_connected(stream, config, operator).await?;
    info!(
        "Session complete: {} passed, {} failed, {} skipped",
        report.summary.passed, report.summary.failed, report.summary.skipped
    );
    if let Ok(json) = serde_json::to_string(&report.summary) {
        debug!("Run summary: {}", json);
    }

    if config.open_report {
        if let Err(e) = open::that(&report.html_path) {
            warn!("Failed to open {:?}: {}", report.html_path, e);
        }
    }
    Ok(())
}

/// Error text followed by each underlying cause.
fn describe(e: &ClientError) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(&format!("\n  caused by: {}", cause_text));
        }
        source = cause.source();
    }
    text
}
