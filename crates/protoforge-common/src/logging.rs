//! ---
//! pf_section: "01-core-functionality"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Shared configuration and process primitives."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::Path;

use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "PROTOFORGE_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDERR_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `PROTOFORGE_LOG` overrides the filter (e.g. `info`, `debug,protoforge_schema=trace`).
///   When unset `RUST_LOG` is honoured, finally defaulting to `info`.
/// * Console output goes to stderr so stdout stays free for command results.
/// * A daily rolling JSON file is written to `log_dir` when given. Callers pass
///   [`ProjectLayout::log_dir`](crate::ProjectLayout::log_dir) so a relative
///   `logging.directory` lands under the project directory.
pub fn init_tracing(
    service_name: &str,
    config: &LoggingConfig,
    log_dir: Option<&Path>,
) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = STDERR_GUARD.set(stderr_guard);

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stderr_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(stderr_writer)
            .boxed(),
    };

    let file_layer = match log_dir {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let prefix = config
                .file_prefix
                .clone()
                .unwrap_or_else(|| service_name.to_owned());
            let file_appender = daily(directory, format!("{prefix}.log"));
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            let _ = FILE_GUARD.set(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    debug!(service = %service_name, format = ?config.format, log_dir = ?log_dir, "tracing initialised");
    Ok(())
}
