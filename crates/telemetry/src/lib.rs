//! Tracing/logging pipeline for the bookstore service.

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bookstore_kernel::settings::{LogFormat, TelemetrySettings};

/// Install the global subscriber writing to stderr. `RUST_LOG` takes
/// precedence over the configured `log_level`. Fails if a global subscriber
/// is already set.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => env_filter(&settings.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    match settings.log_format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .try_init(),
    }
    .context("failed to install tracing subscriber")?;

    tracing::info!(
        target: "bookstore-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );

    Ok(())
}

/// Parse `EnvFilter` directives, reporting which ones were rejected.
pub fn env_filter(directives: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter directives '{}'", directives))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_module_level_directives() {
        assert!(env_filter("info,sqlx=warn,bookstore_app=debug").is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        let err = env_filter("info,sqlx=loud").unwrap_err();
        assert!(err.to_string().contains("sqlx=loud"));
    }

    #[test]
    fn second_init_reports_error() {
        let settings = TelemetrySettings::default();
        // Another test binary may not have installed anything yet, so the
        // first call can go either way; the second must fail.
        let _ = init(&settings);
        assert!(init(&settings).is_err());
    }
}
