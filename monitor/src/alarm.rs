use crate::model::{AlarmThresholds, SystemStatus};

/// Evaluates one reading against the alarm bounds. Values sitting exactly
/// on a bound do not alarm; only strictly outside triggers.
pub fn evaluate(
    temperature_celsius: f64,
    humidity_percent: f64,
    thresholds: &AlarmThresholds,
) -> SystemStatus {
    let temp_alarm = temperature_celsius > thresholds.temp_high
        || temperature_celsius < thresholds.temp_low;
    let humidity_alarm = humidity_percent > thresholds.humidity_high
        || humidity_percent < thresholds.humidity_low;

    match (temp_alarm, humidity_alarm) {
        (true, true) => SystemStatus::BothError,
        (true, false) => SystemStatus::TempError,
        (false, true) => SystemStatus::HumidityError,
        (false, false) => SystemStatus::Good,
    }
}
