//! Core data types for Quadromon
//!
//! Sensor kinds, the decoded snapshot and the device identity block.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::channels;
use crate::error::QuadroError;

/// The five sensor groups reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Millidegrees Celsius
    Temperature,
    /// RPM (channel 0: flow, device-native normalized count)
    Speed,
    /// Microwatts
    Power,
    /// Millivolts
    Voltage,
    /// Milliamps
    Current,
}

impl SensorKind {
    /// All kinds in canonical rendering order
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Temperature,
        SensorKind::Speed,
        SensorKind::Power,
        SensorKind::Voltage,
        SensorKind::Current,
    ];

    /// Number of channels the device exposes for this kind
    pub const fn channel_count(self) -> usize {
        match self {
            SensorKind::Temperature => channels::TEMPERATURES,
            SensorKind::Speed => channels::SPEEDS,
            SensorKind::Power => channels::POWERS,
            SensorKind::Voltage => channels::VOLTAGES,
            SensorKind::Current => channels::CURRENTS,
        }
    }

    /// hwmon-style type name, used on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temp",
            SensorKind::Speed => "fan",
            SensorKind::Power => "power",
            SensorKind::Voltage => "in",
            SensorKind::Current => "curr",
        }
    }

    /// Unit suffix of normalized values
    pub const fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "m°C",
            SensorKind::Speed => "RPM",
            SensorKind::Power => "µW",
            SensorKind::Voltage => "mV",
            SensorKind::Current => "mA",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = QuadroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temp" | "temperature" => Ok(SensorKind::Temperature),
            "fan" | "speed" => Ok(SensorKind::Speed),
            "power" => Ok(SensorKind::Power),
            "in" | "voltage" => Ok(SensorKind::Voltage),
            "curr" | "current" => Ok(SensorKind::Current),
            other => Err(QuadroError::generic(format!("Unknown sensor kind: {}", other))),
        }
    }
}

/// A (kind, channel) pair that is known to exist on the device.
///
/// Construct one from untrusted input with [`SensorChannel::new`]; the
/// in-process read API accepts plain indices and panics on out-of-range
/// channels instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorChannel {
    kind: SensorKind,
    index: usize,
}

impl SensorChannel {
    pub fn new(kind: SensorKind, index: usize) -> Result<Self, QuadroError> {
        if index >= kind.channel_count() {
            return Err(QuadroError::InvalidChannel {
                kind: kind.as_str().to_string(),
                channel: index,
                count: kind.channel_count(),
            });
        }
        Ok(Self { kind, index })
    }

    /// Parse a wire-format kind name and index
    pub fn parse(kind: &str, index: usize) -> Result<Self, QuadroError> {
        Self::new(kind.parse()?, index)
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Identity and lifetime counters carried in every status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub serial_number: [u16; 2],
    pub firmware_version: u16,
    /// How many times the device was powered on
    pub power_cycles: u32,
}

impl DeviceIdentity {
    /// Serial number as printed on the device, e.g. `00003-00005`
    pub fn serial_number_string(&self) -> String {
        format!("{:05}-{:05}", self.serial_number[0], self.serial_number[1])
    }
}

/// Decoded, unit-normalized sensor values from one status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Millidegrees Celsius
    pub temperatures: [i32; channels::TEMPERATURES],
    /// Index 0 is flow, 1..=4 fan RPM
    pub speeds: [u32; channels::SPEEDS],
    /// Microwatts
    pub powers: [u32; channels::POWERS],
    /// Millivolts, index 0 is VCC
    pub voltages: [u32; channels::VOLTAGES],
    /// Milliamps
    pub currents: [u32; channels::CURRENTS],
    pub identity: DeviceIdentity,
}

impl SensorSnapshot {
    /// Value of one channel.
    ///
    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn value(&self, kind: SensorKind, channel: usize) -> i64 {
        match kind {
            SensorKind::Temperature => i64::from(self.temperatures[channel]),
            SensorKind::Speed => i64::from(self.speeds[channel]),
            SensorKind::Power => i64::from(self.powers[channel]),
            SensorKind::Voltage => i64::from(self.voltages[channel]),
            SensorKind::Current => i64::from(self.currents[channel]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts() {
        let counts: Vec<usize> = SensorKind::ALL.iter().map(|k| k.channel_count()).collect();
        assert_eq!(counts, vec![4, 5, 4, 5, 4]);
    }

    #[test]
    fn test_kind_round_trips_through_wire_name() {
        for kind in SensorKind::ALL {
            assert_eq!(kind.as_str().parse::<SensorKind>().unwrap(), kind);
        }
        assert!("pwm".parse::<SensorKind>().is_err());
    }

    #[test]
    fn test_sensor_channel_bounds() {
        assert!(SensorChannel::new(SensorKind::Speed, 4).is_ok());
        assert!(SensorChannel::new(SensorKind::Speed, 5).is_err());
        assert!(SensorChannel::new(SensorKind::Temperature, 4).is_err());
        assert!(SensorChannel::parse("in", 0).is_ok());
        assert!(SensorChannel::parse("bogus", 0).is_err());
    }

    #[test]
    fn test_serial_number_format() {
        let identity = DeviceIdentity {
            serial_number: [3, 5],
            ..Default::default()
        };
        assert_eq!(identity.serial_number_string(), "00003-00005");

        let identity = DeviceIdentity {
            serial_number: [65535, 12345],
            ..Default::default()
        };
        assert_eq!(identity.serial_number_string(), "65535-12345");
    }

    #[test]
    #[should_panic]
    fn test_value_out_of_range_panics() {
        SensorSnapshot::default().value(SensorKind::Power, 4);
    }

    #[test]
    fn test_wire_kinds_match_protocol_table() {
        for kind in SensorKind::ALL {
            assert_eq!(
                qm_protocol::channel_count(kind.as_str()),
                Some(kind.channel_count())
            );
        }
        assert_eq!(qm_protocol::SENSOR_KINDS.len(), SensorKind::ALL.len());
    }
}
