//! Status report decoder
//!
//! Pure conversion from raw report bytes to a [`SensorSnapshot`]. Reports with
//! a foreign ID or a truncated buffer are not errors; they are classified and
//! dropped by the caller.

use std::fmt;

use super::fields::{Target, FIELDS, REPORT_MIN_LEN};
use crate::constants::report::STATUS_REPORT_ID;
use crate::data::{SensorKind, SensorSnapshot};

/// What the decoder made of one raw buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A status report; the snapshot was (or can be) published
    Accepted,
    /// Some other report type emitted by the device
    ForeignReport(u8),
    /// Buffer too short to contain every field
    Truncated(usize),
}

impl DecodeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DecodeOutcome::Accepted)
    }
}

impl fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeOutcome::Accepted => write!(f, "accepted"),
            DecodeOutcome::ForeignReport(id) => write!(f, "foreign report id 0x{:02x}", id),
            DecodeOutcome::Truncated(len) => {
                write!(f, "truncated report ({} bytes, need {})", len, REPORT_MIN_LEN)
            }
        }
    }
}

/// Classify a buffer without decoding it
pub fn inspect(raw: &[u8]) -> DecodeOutcome {
    match raw.first() {
        None => DecodeOutcome::Truncated(0),
        Some(&id) if id != STATUS_REPORT_ID => DecodeOutcome::ForeignReport(id),
        Some(_) if raw.len() < REPORT_MIN_LEN => DecodeOutcome::Truncated(raw.len()),
        Some(_) => DecodeOutcome::Accepted,
    }
}

/// Decode a status report. Returns `None` for anything [`inspect`] does not accept.
pub fn decode(raw: &[u8]) -> Option<SensorSnapshot> {
    if !inspect(raw).is_accepted() {
        return None;
    }

    let mut snapshot = SensorSnapshot::default();
    for field in FIELDS.iter() {
        let value = field.read(raw)?;
        match field.target {
            Target::Sensor(kind, channel) => store_sensor(&mut snapshot, kind, channel, value),
            Target::SerialPart(part) => {
                snapshot.identity.serial_number[part] = value as u16;
            }
            Target::FirmwareVersion => snapshot.identity.firmware_version = value as u16,
            Target::PowerCycles => snapshot.identity.power_cycles = value,
        }
    }
    Some(snapshot)
}

fn store_sensor(snapshot: &mut SensorSnapshot, kind: SensorKind, channel: usize, value: u32) {
    match kind {
        // u16 * 10 always fits
        SensorKind::Temperature => snapshot.temperatures[channel] = value as i32,
        SensorKind::Speed => snapshot.speeds[channel] = value,
        SensorKind::Power => snapshot.powers[channel] = value,
        SensorKind::Voltage => snapshot.voltages[channel] = value,
        SensorKind::Current => snapshot.currents[channel] = value,
    }
}
