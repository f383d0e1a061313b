//! Status report field table
//!
//! Every value the decoder extracts is described by one [`FieldSpec`]. The
//! table is the protocol schema: offsets, widths and scaling must match the
//! device exactly.

use crate::constants::{offsets, units};
use crate::data::SensorKind;

/// Width of a big-endian unsigned field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U16,
    U32,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }
}

/// Conversion from raw report units to normalized units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    AsIs,
    Mul(u32),
    Div(u32),
}

impl Scale {
    pub const fn apply(self, raw: u32) -> u32 {
        match self {
            Scale::AsIs => raw,
            Scale::Mul(k) => raw.saturating_mul(k),
            Scale::Div(k) => raw / k,
        }
    }
}

/// Where a decoded value lands in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Sensor(SensorKind, usize),
    SerialPart(usize),
    FirmwareVersion,
    PowerCycles,
}

/// One fixed-offset field of the status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: Width,
    pub scale: Scale,
    pub target: Target,
}

impl FieldSpec {
    const fn new(
        name: &'static str,
        offset: usize,
        width: Width,
        scale: Scale,
        target: Target,
    ) -> Self {
        Self { name, offset, width, scale, target }
    }

    /// First byte past this field
    pub const fn end(&self) -> usize {
        self.offset + self.width.bytes()
    }

    /// Read the raw big-endian value, or `None` if the buffer is too short
    pub fn read_raw(&self, raw: &[u8]) -> Option<u32> {
        let bytes = raw.get(self.offset..self.end())?;
        Some(match *bytes {
            [a, b] => u32::from(u16::from_be_bytes([a, b])),
            [a, b, c, d] => u32::from_be_bytes([a, b, c, d]),
            _ => return None,
        })
    }

    /// Read and normalize
    pub fn read(&self, raw: &[u8]) -> Option<u32> {
        self.read_raw(raw).map(|v| self.scale.apply(v))
    }
}

use Scale::{AsIs, Div, Mul};
use SensorKind::{Current, Power, Speed, Temperature, Voltage};
use Width::{U16, U32};

const TEMP: Scale = Mul(units::TEMP_MULTIPLIER);
const VOLT: Scale = Mul(units::VOLTAGE_MULTIPLIER);
const WATT: Scale = Mul(units::POWER_MULTIPLIER);

/// The complete status report schema
#[rustfmt::skip]
pub const FIELDS: [FieldSpec; 26] = [
    FieldSpec::new("serial_first_part", offsets::SERIAL_FIRST_PART, U16, AsIs, Target::SerialPart(0)),
    FieldSpec::new("serial_second_part", offsets::SERIAL_SECOND_PART, U16, AsIs, Target::SerialPart(1)),
    FieldSpec::new("firmware_version", offsets::FIRMWARE_VERSION, U16, AsIs, Target::FirmwareVersion),
    FieldSpec::new("power_cycles", offsets::POWER_CYCLES, U32, AsIs, Target::PowerCycles),
    FieldSpec::new("temp1", offsets::TEMP1, U16, TEMP, Target::Sensor(Temperature, 0)),
    FieldSpec::new("temp2", offsets::TEMP2, U16, TEMP, Target::Sensor(Temperature, 1)),
    FieldSpec::new("temp3", offsets::TEMP3, U16, TEMP, Target::Sensor(Temperature, 2)),
    FieldSpec::new("temp4", offsets::TEMP4, U16, TEMP, Target::Sensor(Temperature, 3)),
    FieldSpec::new("flow_speed", offsets::FLOW_SPEED, U16, Div(units::FLOW_DIVISOR), Target::Sensor(Speed, 0)),
    FieldSpec::new("fan1_speed", offsets::FAN1_SPEED, U16, AsIs, Target::Sensor(Speed, 1)),
    FieldSpec::new("fan2_speed", offsets::FAN2_SPEED, U16, AsIs, Target::Sensor(Speed, 2)),
    FieldSpec::new("fan3_speed", offsets::FAN3_SPEED, U16, AsIs, Target::Sensor(Speed, 3)),
    FieldSpec::new("fan4_speed", offsets::FAN4_SPEED, U16, AsIs, Target::Sensor(Speed, 4)),
    FieldSpec::new("fan1_power", offsets::FAN1_POWER, U16, WATT, Target::Sensor(Power, 0)),
    FieldSpec::new("fan2_power", offsets::FAN2_POWER, U16, WATT, Target::Sensor(Power, 1)),
    FieldSpec::new("fan3_power", offsets::FAN3_POWER, U16, WATT, Target::Sensor(Power, 2)),
    FieldSpec::new("fan4_power", offsets::FAN4_POWER, U16, WATT, Target::Sensor(Power, 3)),
    FieldSpec::new("vcc", offsets::VOLTAGE, U16, VOLT, Target::Sensor(Voltage, 0)),
    FieldSpec::new("fan1_voltage", offsets::FAN1_VOLTAGE, U16, VOLT, Target::Sensor(Voltage, 1)),
    FieldSpec::new("fan2_voltage", offsets::FAN2_VOLTAGE, U16, VOLT, Target::Sensor(Voltage, 2)),
    FieldSpec::new("fan3_voltage", offsets::FAN3_VOLTAGE, U16, VOLT, Target::Sensor(Voltage, 3)),
    FieldSpec::new("fan4_voltage", offsets::FAN4_VOLTAGE, U16, VOLT, Target::Sensor(Voltage, 4)),
    FieldSpec::new("fan1_current", offsets::FAN1_CURRENT, U16, AsIs, Target::Sensor(Current, 0)),
    FieldSpec::new("fan2_current", offsets::FAN2_CURRENT, U16, AsIs, Target::Sensor(Current, 1)),
    FieldSpec::new("fan3_current", offsets::FAN3_CURRENT, U16, AsIs, Target::Sensor(Current, 2)),
    FieldSpec::new("fan4_current", offsets::FAN4_CURRENT, U16, AsIs, Target::Sensor(Current, 3)),
];

const fn min_report_len() -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < FIELDS.len() {
        let end = FIELDS[i].end();
        if end > max {
            max = end;
        }
        i += 1;
    }
    max
}

/// Shortest buffer that contains every field
pub const REPORT_MIN_LEN: usize = min_report_len();
