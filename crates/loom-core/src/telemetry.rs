//! Telemetry - tracing subscriber の初期化
//!
//! ログは常に stderr に出す。stdout はタスクの output binding 用に空けておく。

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::{LogFormat, LoomConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// initialise が成功した証
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// TelemetryError は subscriber 設定時のエラー
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(String),
}

/// グローバルな tracing subscriber を設定する
///
/// 2 回目以降の呼び出しは何もせずに `TelemetryHandle` を返す。
///
/// # 使用例
/// ```ignore
/// let (config, warnings) = LoomConfig::from_env();
/// telemetry::initialise(&config)?;
/// for warning in warnings {
///     tracing::warn!("{warning}");
/// }
/// ```
pub fn initialise(config: &LoomConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &LoomConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let stderr = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    let installed = match config.log_format() {
        LogFormat::Json => stderr.json().flatten_event(true).try_init(),
        LogFormat::Compact => stderr.compact().try_init(),
    };
    installed.map_err(|error| TelemetryError::Subscriber(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        let config = LoomConfig::default().with_log_filter("loom=[");
        assert!(matches!(
            install_subscriber(&config),
            Err(TelemetryError::Filter(_))
        ));
    }

    #[test]
    fn initialise_installs_once() {
        let config = LoomConfig::default()
            .with_log_filter("off")
            .with_log_format(LogFormat::Json);
        assert!(initialise(&config).is_ok());
        assert!(initialise(&config).is_ok());
    }
}
