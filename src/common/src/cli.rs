use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Common CLI arguments
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CommonCommands {
    /// Wait until the OTG server accepts connections (default behavior)
    Wait {
        #[arg(long, value_parser = humantime::parse_duration, help = "Time between attempts, e.g. 2s")]
        interval: Option<Duration>,

        #[arg(long, value_parser = humantime::parse_duration, help = "Give up after, e.g. 1m")]
        timeout: Option<Duration>,
    },
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

impl Default for CommonCommands {
    fn default() -> Self {
        Self::Wait {
            interval: None,
            timeout: None,
        }
    }
}

pub mod utils {
    use super::*;
    use crate::config::{HarnessConfig, PollConfig};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments. `RUST_LOG` wins when set.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<HarnessConfig> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                HarnessConfig::load_from_path(path).context("Failed to load configuration")
            }
            None => HarnessConfig::load().context("Failed to load configuration"),
        }
    }

    pub fn display_config(config: &HarnessConfig, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("OTG Harness Configuration:");
            println!("==========================");
            println!("OTG server: {}", config.server.location);
            println!(
                "Dial timeout: {}",
                humantime::format_duration(config.server.dial_timeout)
            );
            println!("Port 1: {}", config.ports.port1);
            println!("Port 2: {}", config.ports.port2);
            println!(
                "Poll interval: {}",
                humantime::format_duration(config.poll.interval)
            );
            println!(
                "Poll timeout: {}",
                humantime::format_duration(config.poll.timeout)
            );
        }
        Ok(())
    }

    pub fn validate_config(config: &HarnessConfig) -> Result<()> {
        log::info!("Validating configuration...");
        config.validate().context("Configuration is invalid")?;
        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Poll settings with CLI overrides applied on top of the configuration.
    pub fn poll_settings(
        config: &HarnessConfig,
        interval: Option<Duration>,
        timeout: Option<Duration>,
    ) -> PollConfig {
        PollConfig {
            interval: interval.unwrap_or(config.poll.interval),
            timeout: timeout.unwrap_or(config.poll.timeout),
        }
    }

    /// Handle commands that only inspect configuration. Returns `false` when
    /// the command still has to be run by the caller. `version` is what the
    /// calling binary reports for `version`.
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &HarnessConfig,
        version: &str,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{version}");
                Ok(true)
            }
            CommonCommands::Wait { .. } => Ok(false),
        }
    }

    /// Binaries pass their own `CARGO_PKG_NAME` and `CARGO_PKG_VERSION`.
    pub fn version_info(name: &str, version: &str) -> String {
        format!("{name} {version}")
    }
}
