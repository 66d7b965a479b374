//! Logging bootstrap.
//!
//! Every Penumbra crate logs through the `log` facade. Applications that do
//! not bring their own logger call [`init_logging`] early in `main`.

use std::sync::Once;

/// Filter applied when neither the config nor `RUST_LOG` sets one. wgpu is
/// chatty at `info`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter syntax, e.g. `"penumbra_render=debug,wgpu=warn"`.
    /// Takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Routes output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Config for `#[test]` functions.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            filter: Some("debug".to_owned()),
            is_test: true,
            ..Self::default()
        }
    }

    /// The filter string that will be installed.
    #[must_use]
    pub fn effective_filter(&self) -> String {
        self.filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger. Only the first call has an
/// effect; a logger installed by someone else is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&config.effective_filter())
            .write_style(config.write_style)
            .is_test(config.is_test);

        if builder.try_init().is_ok() {
            log::debug!("Logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = LoggingConfig {
            filter: Some("warn".to_owned()),
            ..LoggingConfig::default()
        };
        assert_eq!(config.effective_filter(), "warn");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LoggingConfig::for_tests());
        init_logging(LoggingConfig::for_tests());
        log::info!("still logging");
    }
}
