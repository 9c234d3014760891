//! Logging bootstrap.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// one JSON object per event
    Json,
    /// human readable lines
    #[default]
    Text,
}

/// Install the global `tracing` subscriber.
///
/// Levels come from `RUST_LOG` (for example `apiregistry=debug`) and default
/// to `info`. Only the first call has an effect, and an embedding
/// application that already installed a subscriber keeps its own.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Text => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("a global subscriber is already installed");
        }
    });
}

/// span wrapping one registry operation
#[must_use]
pub fn operation_span(operation: &'static str, name: &str) -> Span {
    tracing::debug_span!("registry", op = operation, name = name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LogFormat::Text);
        init_logging(LogFormat::Json);
        let _guard = operation_span("get_project", "projects/p1").entered();
        tracing::info!("still logging");
    }
}
