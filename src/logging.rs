use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_FILE_PREFIX: &str = "pal-tutor.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where and how often the optional log file rolls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: String,
    pub prefix: String,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "never" | "none" => Some(Self::Never),
            _ => None,
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

impl FileLogSettings {
    /// `None` unless `ENABLE_FILE_LOGS` is set. Reads `LOG_DIR`,
    /// `LOG_FILE_PREFIX` and `LOG_ROTATION` (hourly, daily, never).
    pub fn from_env() -> Option<Self> {
        if !file_logging_enabled() {
            return None;
        }
        Some(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let rotation = match non_empty("LOG_ROTATION") {
            Some(raw) => LogRotation::parse(&raw).unwrap_or_else(|| {
                eprintln!("unknown LOG_ROTATION {raw:?}, using daily");
                LogRotation::Daily
            }),
            None => LogRotation::Daily,
        };

        Self {
            dir: non_empty("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
            prefix: non_empty("LOG_FILE_PREFIX").unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
            rotation,
        }
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(settings) = FileLogSettings::from_env() {
        if let Err(err) = std::fs::create_dir_all(&settings.dir) {
            eprintln!("failed to create log directory {}: {err}", settings.dir);
        } else {
            let file_appender =
                RollingFileAppender::new(settings.rotation.rotation(), &settings.dir, &settings.prefix);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();

            return Some(FileLogGuard { _guard: guard });
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> FileLogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FileLogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_roll_daily_into_logs_dir() {
        let s = settings(&[]);
        assert_eq!(s.dir, "./logs");
        assert_eq!(s.prefix, "pal-tutor.log");
        assert_eq!(s.rotation, LogRotation::Daily);
    }

    #[test]
    fn reads_prefix_dir_and_rotation() {
        let s = settings(&[
            ("LOG_DIR", "/var/log/tutor"),
            ("LOG_FILE_PREFIX", "tutor-eu.log"),
            ("LOG_ROTATION", "Hourly"),
        ]);
        assert_eq!(s.dir, "/var/log/tutor");
        assert_eq!(s.prefix, "tutor-eu.log");
        assert_eq!(s.rotation, LogRotation::Hourly);
    }

    #[test]
    fn blank_or_unknown_values_fall_back() {
        let s = settings(&[("LOG_FILE_PREFIX", "  "), ("LOG_ROTATION", "weekly")]);
        assert_eq!(s.prefix, "pal-tutor.log");
        assert_eq!(s.rotation, LogRotation::Daily);
        assert_eq!(LogRotation::parse("none"), Some(LogRotation::Never));
    }
}
