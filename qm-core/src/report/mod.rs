//! Status report schema and decoder

mod decoder;
mod fields;

pub use decoder::{decode, inspect, DecodeOutcome};
pub use fields::{FieldSpec, Scale, Target, Width, FIELDS, REPORT_MIN_LEN};

use std::time::Instant;

/// One raw buffer as delivered by the transport
#[derive(Debug, Clone)]
pub struct RawReport {
    pub data: Vec<u8>,
    pub received: Instant,
}

impl RawReport {
    pub fn new(data: Vec<u8>, received: Instant) -> Self {
        Self { data, received }
    }

    /// Report ID byte, if any
    pub fn id(&self) -> Option<u8> {
        self.data.first().copied()
    }
}

#[cfg(test)]
pub(crate) use decoder::tests::fixture_report;
