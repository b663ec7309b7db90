// # ddnsup - one-shot DDNS updater
//
// Run from cron or a systemd timer. Each invocation is a single run:
//
// 1. Read process settings from the environment and initialize tracing
// 2. Bootstrap: write a config template on first run, then exit
// 3. Load and validate the config file (plus env overrides)
// 4. Detect public IPv4/IPv6, reconcile every record, finalize the run log
//
// This binary is a thin integration layer; DDNS logic lives in ddns-core.
//
// ## Environment
//
// - `DDNS_CONFIG`: Config file path (default `ddnsup.conf`)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
// - `DDNS_MODE`: `dry-run` to skip create/edit calls
// - `DDNS_API_KEY`, `DDNS_SECRET_API_KEY`, `DDNS_PACING_SECS`,
//   `DDNS_LOG_RETENTION`, `DDNS_LOG_FILE`: override the config file
//
// ## Example
//
// ```bash
// DDNS_CONFIG=/etc/ddnsup/ddnsup.conf ddnsup
// ```

use anyhow::{Context, Result, bail};
use ddns_core::config::write_template;
use ddns_core::{DdnsEngine, Error, ErrorBlock, RunConfig, RunLogger};
use ddns_ip_http::HttpIpSource;
use ddns_provider_porkbun::PorkbunProvider;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG_PATH: &str = "ddnsup.conf";

/// Exit codes, as seen by cron and systemd
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Run completed (record-level errors included) or first-run bootstrap
    Clean = 0,
    /// Invalid/missing config or no public address detected
    Failure = 1,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Settings read from the process environment before the config file
#[derive(Debug)]
struct ProcessSettings {
    config_path: PathBuf,
    log_level: Level,
    dry_run: bool,
}

impl ProcessSettings {
    fn from_env() -> Result<Self> {
        let log_level = match env::var("DDNS_LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            other => bail!(
                "Invalid DDNS_LOG_LEVEL '{}'. Valid: trace, debug, info, warn, error",
                other
            ),
        };

        let dry_run = match env::var("DDNS_MODE").ok().as_deref() {
            None | Some("") | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => bail!("Invalid DDNS_MODE '{}'. Valid: live, dry-run", other),
        };

        Ok(Self {
            config_path: env::var_os("DDNS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_level,
            dry_run,
        })
    }
}

fn main() -> ExitCode {
    let settings = match ProcessSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::Failure.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::Failure.into();
    }

    if !settings.config_path.exists() {
        return match write_template(&settings.config_path) {
            Ok(()) => {
                info!(
                    "Wrote config template to {}; fill in credentials and records, then run again",
                    settings.config_path.display()
                );
                DdnsExitCode::Clean.into()
            }
            Err(e) => {
                error!("{}", e);
                DdnsExitCode::Failure.into()
            }
        };
    }

    let config = match RunConfig::load(&settings.config_path, |key| env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return DdnsExitCode::Failure.into();
        }
    };

    info!(
        "Starting ddnsup: {} record(s), config {}{}",
        config.records.len(),
        settings.config_path.display(),
        if settings.dry_run { " [DRY-RUN]" } else { "" }
    );

    // Strictly sequential, so a single-threaded runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::Failure.into();
        }
    };

    rt.block_on(run_once(config, settings.dry_run)).into()
}

/// One full run; the run log is finalized on every path
async fn run_once(config: RunConfig, dry_run: bool) -> DdnsExitCode {
    let mut logger = RunLogger::start(config.log_file.clone(), config.retention);

    let outcome = reconcile_all(&config, dry_run, &mut logger).await;
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }

    let finalized = logger.finalize().await;
    if let Err(e) = &finalized {
        error!("Failed to write run log {}: {}", config.log_file.display(), e);
    }

    exit_code(outcome.is_ok(), finalized.is_ok())
}

/// A run that could not persist its log is a failure, since the log is the
/// only report an unattended run leaves behind
fn exit_code(run_ok: bool, log_written: bool) -> DdnsExitCode {
    if run_ok && log_written {
        DdnsExitCode::Clean
    } else {
        DdnsExitCode::Failure
    }
}

async fn reconcile_all(config: &RunConfig, dry_run: bool, logger: &mut RunLogger) -> Result<()> {
    let ip_source = HttpIpSource::new().context("Failed to set up IP discovery")?;
    let provider = PorkbunProvider::new(config.credentials.clone(), dry_run)
        .context("Failed to set up Porkbun provider")?;

    let addresses = match DdnsEngine::detect_addresses(&ip_source).await {
        Ok(addresses) => addresses,
        Err(e @ Error::Connectivity(_)) => {
            logger.record_error(&ErrorBlock::global("detect-ip", e.to_string()));
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let engine = DdnsEngine::new(Box::new(provider), config.pacing);
    let summary = engine.run(&config.records, &addresses, logger).await;

    if summary.errors() > 0 {
        warn!(
            "{} of {} reconciliation(s) need attention; see {}",
            summary.errors(),
            summary.attempts(),
            logger.path().display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_requires_run_and_log() {
        assert_eq!(exit_code(true, true), DdnsExitCode::Clean);
        assert_eq!(exit_code(true, false), DdnsExitCode::Failure);
        assert_eq!(exit_code(false, true), DdnsExitCode::Failure);
        assert_eq!(DdnsExitCode::Failure as u8, 1);
    }

    #[tokio::test]
    async fn unwritable_log_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the log directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let logger = RunLogger::start(blocker.join("ddnsup.log"), 3);
        let finalized = logger.finalize().await;

        assert!(finalized.is_err());
        assert_eq!(exit_code(true, finalized.is_ok()), DdnsExitCode::Failure);
    }
}
