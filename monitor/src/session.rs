use crate::alarm;
use crate::model::{AlarmThresholds, Reading, SystemStatus, TempUnit};
use crate::units::{to_celsius, to_fahrenheit};
use chrono::{DateTime, Utc};

/// Display-unit bookkeeping around the reading stream. Thresholds and the
/// latest reading are held in canonical Celsius; Fahrenheit values exist
/// only at the edges, derived on read and converted back on write, so unit
/// toggles never touch the canonical values.
pub struct ReadingSession {
    unit: TempUnit,
    thresholds: AlarmThresholds,
    latest: Option<(f64, f64, DateTime<Utc>)>,
}

impl ReadingSession {
    pub fn new(thresholds: AlarmThresholds) -> Self {
        Self {
            unit: TempUnit::Celsius,
            thresholds,
            latest: None,
        }
    }

    pub fn unit(&self) -> TempUnit {
        self.unit
    }

    pub fn toggle_unit(&mut self) -> TempUnit {
        self.unit = self.unit.toggled();
        self.unit
    }

    /// Keeps the latest good reading; non-New results are ignored
    pub fn record(&mut self, reading: &Reading) {
        if let (Some(temperature), Some(humidity), Some(timestamp)) = (
            reading.temperature_celsius,
            reading.humidity_percent,
            reading.timestamp,
        ) {
            self.latest = Some((temperature, humidity, timestamp));
        }
    }

    /// Good until a first reading exists
    pub fn system_status(&self) -> SystemStatus {
        match self.latest {
            None => SystemStatus::Good,
            Some((temperature, humidity, _)) => {
                alarm::evaluate(temperature, humidity, &self.thresholds)
            }
        }
    }

    pub fn thresholds(&self) -> AlarmThresholds {
        self.thresholds
    }

    /// Thresholds converted to the current display unit
    pub fn display_thresholds(&self) -> AlarmThresholds {
        match self.unit {
            TempUnit::Celsius => self.thresholds,
            TempUnit::Fahrenheit => AlarmThresholds {
                temp_high: to_fahrenheit(self.thresholds.temp_high),
                temp_low: to_fahrenheit(self.thresholds.temp_low),
                ..self.thresholds
            },
        }
    }

    /// Accepts new bounds expressed in the current display unit
    pub fn set_thresholds(&mut self, display: AlarmThresholds) {
        self.thresholds = match self.unit {
            TempUnit::Celsius => display,
            TempUnit::Fahrenheit => AlarmThresholds {
                temp_high: to_celsius(display.temp_high),
                temp_low: to_celsius(display.temp_low),
                ..display
            },
        };
    }

    /// Latest reading with the temperature in the display unit
    pub fn display_latest(&self) -> Option<(f64, f64, DateTime<Utc>)> {
        self.latest.map(|(temperature, humidity, timestamp)| {
            let temperature = match self.unit {
                TempUnit::Celsius => temperature,
                TempUnit::Fahrenheit => to_fahrenheit(temperature),
            };
            (temperature, humidity, timestamp)
        })
    }
}
