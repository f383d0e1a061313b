//! Static channel topology: labels, visibility and canonical ordering

use serde::Serialize;

use super::types::SensorKind;
use crate::constants::device::SENSOR_MODE;

const TEMP_LABELS: [&str; 4] = ["Temp1", "Temp2", "Temp3", "Temp4"];

// The flow channel keeps the device's historical label although its unit is a
// normalized pulse count rather than l/h.
const SPEED_LABELS: [&str; 5] = [
    "Flow speed [l/h]",
    "Fan1 speed",
    "Fan2 speed",
    "Fan3 speed",
    "Fan4 speed",
];

const POWER_LABELS: [&str; 4] = ["Fan1 power", "Fan2 power", "Fan3 power", "Fan4 power"];

const VOLTAGE_LABELS: [&str; 5] = [
    "VCC",
    "Fan1 voltage",
    "Fan2 voltage",
    "Fan3 voltage",
    "Fan4 voltage",
];

const CURRENT_LABELS: [&str; 4] = [
    "Fan1 current",
    "Fan2 current",
    "Fan3 current",
    "Fan4 current",
];

/// Fixed human-readable name of a channel.
///
/// # Panics
/// Panics if `channel` is out of range for `kind`.
pub fn label(kind: SensorKind, channel: usize) -> &'static str {
    match kind {
        SensorKind::Temperature => TEMP_LABELS[channel],
        SensorKind::Speed => SPEED_LABELS[channel],
        SensorKind::Power => POWER_LABELS[channel],
        SensorKind::Voltage => VOLTAGE_LABELS[channel],
        SensorKind::Current => CURRENT_LABELS[channel],
    }
}

/// Speed channel carrying the flow sensor
pub const FLOW_CHANNEL: usize = 0;

/// Unit suffix of one channel's normalized value. The flow channel has none:
/// its value is a device-native count, not a calibrated rate.
pub fn unit(kind: SensorKind, channel: usize) -> &'static str {
    match (kind, channel) {
        (SensorKind::Speed, FLOW_CHANNEL) => "",
        _ => kind.unit(),
    }
}

/// File-mode style visibility of a channel. Always read-only.
pub fn mode(_kind: SensorKind, _channel: usize) -> u32 {
    SENSOR_MODE
}

/// One row of the static channel table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub kind: SensorKind,
    pub channel: usize,
    pub label: &'static str,
    pub mode: u32,
}

/// Every channel in canonical order: 4 temperatures, 5 speeds, 4 powers,
/// 5 voltages, 4 currents.
pub fn channel_table() -> impl Iterator<Item = ChannelInfo> {
    SensorKind::ALL.into_iter().flat_map(|kind| {
        (0..kind.channel_count()).map(move |channel| ChannelInfo {
            kind,
            channel,
            label: label(kind, channel),
            mode: mode(kind, channel),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_table_order_and_size() {
        let table: Vec<ChannelInfo> = channel_table().collect();
        assert_eq!(table.len(), 22);
        assert_eq!(table[0].label, "Temp1");
        assert_eq!(table[4].label, "Flow speed [l/h]");
        assert_eq!(table[9].label, "Fan1 power");
        assert_eq!(table[13].label, "VCC");
        assert_eq!(table[21].label, "Fan4 current");
    }

    #[test]
    fn test_every_channel_read_only() {
        assert!(channel_table().all(|c| c.mode == 0o444));
    }

    #[test]
    fn test_labels() {
        assert_eq!(label(SensorKind::Speed, 2), "Fan2 speed");
        assert_eq!(label(SensorKind::Voltage, 0), "VCC");
        assert_eq!(label(SensorKind::Current, 3), "Fan4 current");
    }

    #[test]
    fn test_flow_channel_has_no_unit() {
        assert_eq!(unit(SensorKind::Speed, FLOW_CHANNEL), "");
        assert_eq!(unit(SensorKind::Speed, 1), "RPM");
        assert_eq!(unit(SensorKind::Power, 0), "µW");
        assert!(channel_table()
            .filter(|c| c.kind == SensorKind::Speed && c.channel == FLOW_CHANNEL)
            .all(|c| c.label == "Flow speed [l/h]"));
    }

    #[test]
    #[should_panic]
    fn test_label_out_of_range_panics() {
        label(SensorKind::Temperature, 4);
    }
}
