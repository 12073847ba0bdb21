use crate::logger::LogConfig;
use crate::model::AlarmThresholds;
use crate::sensor::SensorConfig;
use std::env;
use std::time::Duration;

/// Runtime settings, all overridable through the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_addr: String,
    pub command_capacity: usize,
    pub logging_interval_ms: u64,
    pub logging_initial_delay_ms: u64,
    pub max_logging_count: u32,
    pub warmup_ms: u64,
    pub min_read_interval_ms: u64,
    pub offline_threshold: u32,
    pub probe_dropout: f64,
    pub temp_alarm_high: f64,
    pub temp_alarm_low: f64,
    pub humidity_alarm_high: f64,
    pub humidity_alarm_low: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://measurements.db?mode=rwc".to_string()),
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            command_capacity: parse_env("COMMAND_CAPACITY", 64),
            logging_interval_ms: parse_env("LOGGING_INTERVAL_MS", 15_000),
            logging_initial_delay_ms: parse_env("LOGGING_INITIAL_DELAY_MS", 2_000),
            max_logging_count: parse_env("MAX_LOGGING_COUNT", 30),
            warmup_ms: parse_env("WARMUP_MS", 2_000),
            min_read_interval_ms: parse_env("MIN_READ_INTERVAL_MS", 2_000),
            offline_threshold: parse_env("OFFLINE_THRESHOLD", 3),
            probe_dropout: parse_env("PROBE_DROPOUT", 0.05),
            temp_alarm_high: parse_env("TEMP_ALARM_HIGH", 28.0),
            temp_alarm_low: parse_env("TEMP_ALARM_LOW", 0.0),
            humidity_alarm_high: parse_env("HUMIDITY_ALARM_HIGH", 80.0),
            humidity_alarm_low: parse_env("HUMIDITY_ALARM_LOW", 15.0),
        }
    }

    pub fn sensor(&self) -> SensorConfig {
        SensorConfig {
            warmup: Duration::from_millis(self.warmup_ms),
            min_read_interval: Duration::from_millis(self.min_read_interval_ms),
            offline_threshold: self.offline_threshold,
        }
    }

    pub fn logging(&self) -> LogConfig {
        LogConfig {
            initial_delay: Duration::from_millis(self.logging_initial_delay_ms),
            interval: Duration::from_millis(self.logging_interval_ms),
            max_count: self.max_logging_count,
        }
    }

    pub fn thresholds(&self) -> AlarmThresholds {
        AlarmThresholds {
            temp_high: self.temp_alarm_high,
            temp_low: self.temp_alarm_low,
            humidity_high: self.humidity_alarm_high,
            humidity_low: self.humidity_alarm_low,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
