//! Display Formatting Helpers
//!
//! Convert normalized integer readings to text in the style of lm-sensors.
//! These are frontend-agnostic and used by both the CLI table and the TUI.

use crate::data::{SensorKind, FLOW_CHANNEL};

/// Placeholder for a stale reading
pub const NOT_AVAILABLE: &str = "N/A";

/// Format millidegrees Celsius, e.g. `+24.5°C`
pub fn format_millicelsius(millicelsius: i64) -> String {
    format!("{:+.1}°C", millicelsius as f64 / 1000.0)
}

/// Format millivolts, e.g. `12.10 V`
pub fn format_millivolts(millivolts: i64) -> String {
    format!("{:.2} V", millivolts as f64 / 1000.0)
}

/// Format microwatts, switching from mW to W at one watt
pub fn format_microwatts(microwatts: i64) -> String {
    if microwatts.abs() < 1_000_000 {
        format!("{:.2} mW", microwatts as f64 / 1000.0)
    } else {
        format!("{:.2} W", microwatts as f64 / 1_000_000.0)
    }
}

/// Format milliamps, switching to A at one amp
pub fn format_milliamps(milliamps: i64) -> String {
    if milliamps.abs() < 1000 {
        format!("{} mA", milliamps)
    } else {
        format!("{:.2} A", milliamps as f64 / 1000.0)
    }
}

/// Format a rotation speed
pub fn format_rpm(rpm: i64) -> String {
    format!("{} RPM", rpm)
}

/// Format a reading of any kind; `None` means stale
pub fn format_reading(kind: SensorKind, value: Option<i64>) -> String {
    let Some(value) = value else {
        return NOT_AVAILABLE.to_string();
    };
    match kind {
        SensorKind::Temperature => format_millicelsius(value),
        SensorKind::Speed => format_rpm(value),
        SensorKind::Power => format_microwatts(value),
        SensorKind::Voltage => format_millivolts(value),
        SensorKind::Current => format_milliamps(value),
    }
}

/// Format the reading of one channel. The flow channel is printed as a bare
/// count since its unit is not calibrated.
pub fn format_channel(kind: SensorKind, channel: usize, value: Option<i64>) -> String {
    match (kind, channel, value) {
        (SensorKind::Speed, FLOW_CHANNEL, Some(count)) => count.to_string(),
        _ => format_reading(kind, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millicelsius() {
        assert_eq!(format_millicelsius(24_000), "+24.0°C");
        assert_eq!(format_millicelsius(2400), "+2.4°C");
        assert_eq!(format_millicelsius(-5_500), "-5.5°C");
    }

    #[test]
    fn test_format_power_units() {
        assert_eq!(format_microwatts(90_000), "90.00 mW");
        assert_eq!(format_microwatts(2_500_000), "2.50 W");
    }

    #[test]
    fn test_format_voltage_and_current() {
        assert_eq!(format_millivolts(12_100), "12.10 V");
        assert_eq!(format_milliamps(45), "45 mA");
        assert_eq!(format_milliamps(1_250), "1.25 A");
    }

    #[test]
    fn test_format_reading_stale() {
        assert_eq!(format_reading(SensorKind::Speed, Some(1200)), "1200 RPM");
        assert_eq!(format_reading(SensorKind::Temperature, None), "N/A");
    }

    #[test]
    fn test_format_flow_channel_without_unit() {
        assert_eq!(format_channel(SensorKind::Speed, FLOW_CHANNEL, Some(123)), "123");
        assert_eq!(format_channel(SensorKind::Speed, FLOW_CHANNEL, None), "N/A");
        assert_eq!(format_channel(SensorKind::Speed, 1, Some(1200)), "1200 RPM");
        assert_eq!(format_channel(SensorKind::Voltage, 0, Some(12_100)), "12.10 V");
    }
}
