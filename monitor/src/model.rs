use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status tag attached to every read result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingStatus {
    New,
    Unavailable,
    Offline,
    Busy,
    WarmingUp,
}

/// One instantaneous sensor sample. Values are present only when the status
/// is `New`; temperature is always degrees Celsius.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub status: ReadingStatus,
    #[serde(rename = "temperature", skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    #[serde(rename = "humidity", skip_serializing_if = "Option::is_none")]
    pub humidity_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Reading {
    pub fn new(temperature_celsius: f64, humidity_percent: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: ReadingStatus::New,
            temperature_celsius: Some(temperature_celsius),
            humidity_percent: Some(humidity_percent),
            timestamp: Some(timestamp),
        }
    }

    pub fn status_only(status: ReadingStatus) -> Self {
        Self {
            status,
            temperature_celsius: None,
            humidity_percent: None,
            timestamp: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.status == ReadingStatus::New
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorStatus {
    WarmingUp,
    Ready,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemStatus {
    Good,
    TempError,
    HumidityError,
    BothError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    pub fn toggled(self) -> Self {
        match self {
            TempUnit::Celsius => TempUnit::Fahrenheit,
            TempUnit::Fahrenheit => TempUnit::Celsius,
        }
    }
}

/// Alarm bounds. Held in canonical Celsius everywhere except at the display
/// edge, where `ReadingSession` converts on the way in and out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmThresholds {
    pub temp_high: f64,
    pub temp_low: f64,
    pub humidity_high: f64,
    pub humidity_low: f64,
}

/// Persisted measurement row, id assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredMeasurement {
    pub id: i64,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub timestamp: DateTime<Utc>,
}

/// Plot series for a batch of measurements; times are seconds elapsed from
/// the first reading in the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlotData {
    pub temperatures: Vec<f64>,
    pub humidities: Vec<f64>,
    pub times: Vec<f64>,
}

impl PlotData {
    pub fn from_measurements(rows: &[StoredMeasurement]) -> Self {
        let mut plot = PlotData::default();
        let Some(first) = rows.first() else {
            return plot;
        };

        for row in rows {
            plot.temperatures.push(row.temperature_celsius);
            plot.humidities.push(row.humidity_percent);
            plot.times
                .push((row.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0);
        }

        plot
    }
}

/// Point-in-time view of the monitor, assembled for status queries.
/// Temperature fields are in the current display unit.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub sensor_status: SensorStatus,
    pub system_status: SystemStatus,
    pub unit: TempUnit,
    pub logging_active: bool,
    pub logging_count: u32,
    pub thresholds: AlarmThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Events pushed to transport subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ReadNowAvailable { available: bool },
    LoggingChanged { active: bool },
    NewReading { reading: Reading },
}
