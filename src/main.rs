use anyhow::{Context, Result};
use clap::Parser;
use common::HarnessConfig;
use common::cli::{CommonArgs, CommonCommands, utils};
use common::probe;
use poller::CancellationToken;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "otg-harness")]
#[command(about = "Open Traffic Generator test harness utilities")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    let command = cli.command.unwrap_or_default();
    let version = utils::version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if utils::handle_common_command(&command, &config, &version)? {
        return Ok(());
    }

    match command {
        CommonCommands::Wait { interval, timeout } => {
            wait_for_server(&config, interval, timeout).await
        }
        _ => Ok(()),
    }
}

async fn wait_for_server(
    config: &HarnessConfig,
    interval: Option<Duration>,
    timeout: Option<Duration>,
) -> Result<()> {
    let settings = utils::poll_settings(config, interval, timeout);
    let request = settings.request().context("Invalid poll settings")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, giving up on OTG server");
            on_signal.cancel();
        }
    });

    log::info!(
        "Waiting for OTG server at {} (interval {}, timeout {})",
        config.server.location,
        humantime::format_duration(settings.interval),
        humantime::format_duration(settings.timeout)
    );

    let outcome = probe::wait_for_endpoint(
        &config.server.location,
        config.server.dial_timeout,
        &request,
        &cancel,
    )
    .await
        .with_context(|| format!("OTG server at {} is not reachable", config.server.location))?;

    log::info!(
        "OTG server at {} is reachable after {} attempt(s) in {}",
        config.server.location,
        outcome.attempts,
        humantime::format_duration(outcome.elapsed)
    );
    Ok(())
}
