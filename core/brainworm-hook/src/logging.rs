//! Structured logging for the hook dispatcher using tracing.
//!
//! Logs to `.brainworm/logs/hook.{date}.log` with daily rotation, keeping
//! 7 days. `BRAINWORM_DEBUG=1` forces DEBUG regardless of config; otherwise
//! the `[debug]` config section and `RUST_LOG` control the filter. Falls
//! back to `~/.brainworm/logs/` when the project directory is unwritable,
//! and to stderr when no file appender can be created at all.

use std::path::Path;

use brainworm_core::config::Config;
use brainworm_core::paths::ENV_DEBUG;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(logs_dir: &Path, config: &Config) {
    let _ = fs_err::create_dir_all(logs_dir);

    let forced_debug = std::env::var(ENV_DEBUG).map(|v| v == "1").unwrap_or(false);

    let filter = if forced_debug {
        EnvFilter::new("brainworm_hook=debug,brainworm_core=debug")
    } else {
        let level = if config.debug.enabled {
            config.debug.level.as_str()
        } else {
            "warn"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "brainworm_hook={level},brainworm_core={level}"
            ))
        })
    };

    let to_file = config.debug.outputs.file || forced_debug;

    if to_file {
        let appender = create_file_appender(logs_dir).or_else(|_| {
            let fallback = dirs::home_dir()
                .map(|home| home.join(".brainworm/logs"))
                .unwrap_or_else(|| logs_dir.to_path_buf());
            let _ = fs_err::create_dir_all(&fallback);
            create_file_appender(&fallback)
        });

        if let Ok(file_appender) = appender {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Leak the guard: the hook is a short-lived process and the
            // flush-on-exit behavior is exactly what we want.
            std::mem::forget(guard);

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(false),
                )
                .try_init();
            return;
        }
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_ansi(false),
        )
        .try_init();
}

fn create_file_appender(
    logs_dir: &Path,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("hook")
        .filename_suffix("log")
        .max_log_files(7)
        .build(logs_dir)
}
