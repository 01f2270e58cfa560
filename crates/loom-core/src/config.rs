//! LoomConfig - 環境変数からの実行時設定
//!
//! | 変数              | 意味                                  | デフォルト |
//! |-------------------|---------------------------------------|------------|
//! | `LOOM_LOG`        | tracing の EnvFilter 式               | `warn`     |
//! | `LOOM_LOG_FORMAT` | `compact` / `json`                    | `compact`  |
//! | `LOOM_VALIDATE`   | `0` / `false` で input の検証を止める | 有効       |
//!
//! 不正な値はデフォルトに戻し、`ConfigWarning` として返す。
//! telemetry の初期化前に読むので、ここではログを出さない。

use std::fmt;
use std::str::FromStr;

pub const LOG_ENV: &str = "LOOM_LOG";
pub const LOG_FORMAT_ENV: &str = "LOOM_LOG_FORMAT";
pub const VALIDATE_ENV: &str = "LOOM_VALIDATE";

const DEFAULT_LOG_FILTER: &str = "warn";

/// LogFormat はログの出力形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 人間向けの 1 行形式
    #[default]
    Compact,
    /// 構造化 JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => f.write_str("compact"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// ConfigWarning は無視された設定値
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ignoring {variable}={value:?}: {reason}")]
pub struct ConfigWarning {
    pub variable: &'static str,
    pub value: String,
    pub reason: String,
}

/// LoomConfig は実行時設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoomConfig {
    log_filter: String,
    log_format: LogFormat,
    validate_input: bool,
}

impl Default for LoomConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
            validate_input: true,
        }
    }
}

impl LoomConfig {
    /// プロセスの環境変数から読む
    pub fn from_env() -> (Self, Vec<ConfigWarning>) {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の変数解決関数から読む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<ConfigWarning>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Some(filter) = lookup(LOG_ENV) {
            if filter.trim().is_empty() {
                warnings.push(ConfigWarning {
                    variable: LOG_ENV,
                    value: filter,
                    reason: "empty filter".to_string(),
                });
            } else {
                config.log_filter = filter;
            }
        }

        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            match raw.parse() {
                Ok(format) => config.log_format = format,
                Err(reason) => warnings.push(ConfigWarning {
                    variable: LOG_FORMAT_ENV,
                    value: raw,
                    reason,
                }),
            }
        }

        if let Some(raw) = lookup(VALIDATE_ENV) {
            match parse_flag(&raw) {
                Some(flag) => config.validate_input = flag,
                None => warnings.push(ConfigWarning {
                    variable: VALIDATE_ENV,
                    value: raw,
                    reason: "expected true/false or 1/0".to_string(),
                }),
            }
        }

        (config, warnings)
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_validate_input(mut self, validate: bool) -> Self {
        self.validate_input = validate;
        self
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn validate_input(&self) -> bool {
        self.validate_input
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
