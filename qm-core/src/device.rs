//! Per-device context
//!
//! One [`QuadroDevice`] exists for every attached controller. It owns the
//! sensor store, receives raw reports from the transport and answers sensor,
//! label and diagnostics queries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

use crate::constants::device::{CHIP_NAME, DRIVER_NAME};
use crate::data::{DeviceIdentity, SensorKind};
use crate::error::Result;
use crate::hw::HidrawDevice;
use crate::report::{self, DecodeOutcome};
use crate::store::{Reading, Sample, SensorStore};

/// Counters of raw reports seen by one device
#[derive(Debug, Default)]
pub struct ReportStats {
    accepted: AtomicU64,
    foreign: AtomicU64,
    truncated: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`ReportStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub accepted: u64,
    pub foreign: u64,
    pub truncated: u64,
    /// Reports lost before decoding because the queue was full
    pub dropped: u64,
}

impl ReportCounts {
    /// Foreign plus truncated reports
    pub fn ignored(&self) -> u64 {
        self.foreign + self.truncated
    }
}

impl ReportStats {
    fn record(&self, outcome: DecodeOutcome) {
        let counter = match outcome {
            DecodeOutcome::Accepted => &self.accepted,
            DecodeOutcome::ForeignReport(_) => &self.foreign,
            DecodeOutcome::Truncated(_) => &self.truncated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self) -> ReportCounts {
        ReportCounts {
            accepted: self.accepted.load(Ordering::Relaxed),
            foreign: self.foreign.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Attached fan controller
#[derive(Debug)]
pub struct QuadroDevice {
    name: String,
    hid: Option<HidrawDevice>,
    store: SensorStore,
    stats: ReportStats,
}

impl QuadroDevice {
    /// Context for a device known only by name (captures, tests)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hid: None,
            store: SensorStore::new(),
            stats: ReportStats::default(),
        }
    }

    /// Context for a discovered hidraw device
    pub fn attach(hid: HidrawDevice) -> Self {
        debug!(device = %hid.name, path = %hid.dev_path.display(), "Creating device context");
        Self {
            name: hid.name.clone(),
            hid: Some(hid),
            store: SensorStore::new(),
            stats: ReportStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hid(&self) -> Option<&HidrawDevice> {
        self.hid.as_ref()
    }

    /// Chip name shown with the sensor table
    pub fn chip_name(&self) -> &'static str {
        CHIP_NAME
    }

    /// Scope of the diagnostics values, unique per device
    pub fn diagnostics_scope(&self) -> String {
        format!("{}-{}", DRIVER_NAME, self.name)
    }

    pub fn store(&self) -> &SensorStore {
        &self.store
    }

    pub fn stats(&self) -> ReportCounts {
        self.stats.counts()
    }

    /// Count a report the transport had to discard before decoding
    pub fn record_dropped(&self) {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Entry point for every raw buffer the transport delivers.
    ///
    /// Never fails: foreign and truncated reports are counted and dropped.
    pub fn handle_raw_event(&self, raw: &[u8], now: Instant) -> DecodeOutcome {
        let outcome = report::inspect(raw);
        match report::decode(raw) {
            Some(snapshot) => {
                self.store.publish(snapshot, now);
                trace!(device = %self.name, "Status report decoded");
            }
            None => {
                debug!(device = %self.name, "Ignoring report: {}", outcome);
            }
        }
        self.stats.record(outcome);
        outcome
    }

    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn read(&self, kind: SensorKind, channel: usize) -> Result<i64> {
        self.store.read(kind, channel)
    }

    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn read_at(&self, kind: SensorKind, channel: usize, now: Instant) -> Result<i64> {
        self.store.read_at(kind, channel, now)
    }

    pub fn label(&self, kind: SensorKind, channel: usize) -> &'static str {
        self.store.label(kind, channel)
    }

    pub fn mode(&self, kind: SensorKind, channel: usize) -> u32 {
        self.store.mode(kind, channel)
    }

    pub fn read_all_at(&self, now: Instant) -> Vec<Reading> {
        self.store.read_all_at(now)
    }

    pub fn sample(&self) -> std::sync::Arc<Sample> {
        self.store.sample()
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.store.identity()
    }

    /// `%05u-%05u`
    pub fn serial_number(&self) -> String {
        self.identity().serial_number_string()
    }

    pub fn firmware_version(&self) -> String {
        self.identity().firmware_version.to_string()
    }

    pub fn power_cycles(&self) -> String {
        self.identity().power_cycles.to_string()
    }

    /// Named read-only diagnostics values
    pub fn diagnostics(&self) -> Vec<(&'static str, String)> {
        let identity = self.identity();
        vec![
            ("serial_number", identity.serial_number_string()),
            ("firmware_version", identity.firmware_version.to_string()),
            ("power_cycles", identity.power_cycles.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuadroError;
    use crate::report::fixture_report;
    use std::time::Duration;

    #[test]
    fn test_handle_status_report() {
        let device = QuadroDevice::new("hidraw3");
        let now = Instant::now();

        assert_eq!(device.handle_raw_event(&fixture_report(), now), DecodeOutcome::Accepted);
        assert_eq!(device.read_at(SensorKind::Temperature, 0, now).unwrap(), 2400);
        assert_eq!(device.read_at(SensorKind::Power, 0, now).unwrap(), 90_000);
        assert_eq!(device.stats().accepted, 1);
    }

    #[test]
    fn test_foreign_report_leaves_state_untouched() {
        let device = QuadroDevice::new("hidraw3");
        let t = Instant::now();
        device.handle_raw_event(&fixture_report(), t);
        let before = device.sample();

        let mut other = fixture_report();
        other[0] = 0x03;
        other[offsets_temp1()] = 0xFF;
        let later = t + Duration::from_millis(900);
        assert_eq!(
            device.handle_raw_event(&other, later),
            DecodeOutcome::ForeignReport(0x03)
        );

        let after = device.sample();
        assert_eq!(after.snapshot, before.snapshot);
        assert_eq!(after.updated, Some(t));
        assert_eq!(device.stats().foreign, 1);
    }

    #[test]
    fn test_truncated_report_is_noop() {
        let device = QuadroDevice::new("hidraw3");
        let raw = fixture_report();
        assert_eq!(
            device.handle_raw_event(&raw[..100], Instant::now()),
            DecodeOutcome::Truncated(100)
        );
        assert!(matches!(
            device.read(SensorKind::Speed, 0),
            Err(QuadroError::NoData)
        ));
        assert_eq!(device.stats().truncated, 1);
        assert_eq!(device.stats().ignored(), 1);
    }

    #[test]
    fn test_dropped_reports_counted_separately() {
        let device = QuadroDevice::new("hidraw3");
        device.record_dropped();
        device.record_dropped();
        let counts = device.stats();
        assert_eq!(counts.dropped, 2);
        assert_eq!(counts.ignored(), 0);
        assert_eq!(counts.accepted, 0);
    }

    #[test]
    fn test_diagnostics_not_freshness_checked() {
        let device = QuadroDevice::new("hidraw7");
        let t = Instant::now();
        device.handle_raw_event(&fixture_report(), t);

        let late = t + Duration::from_secs(3600);
        assert!(device.read_at(SensorKind::Voltage, 0, late).is_err());
        assert_eq!(device.serial_number(), "00003-00005");
        assert_eq!(device.firmware_version(), "1017");
        assert_eq!(device.power_cycles(), "70000");
        assert_eq!(
            device.diagnostics(),
            vec![
                ("serial_number", "00003-00005".to_string()),
                ("firmware_version", "1017".to_string()),
                ("power_cycles", "70000".to_string()),
            ]
        );
    }

    #[test]
    fn test_diagnostics_scope_per_device() {
        let a = QuadroDevice::new("hidraw1");
        let b = QuadroDevice::new("hidraw2");
        assert_eq!(a.diagnostics_scope(), "aquacomputer-quadro-hidraw1");
        assert_ne!(a.diagnostics_scope(), b.diagnostics_scope());
        assert_eq!(a.chip_name(), "quadro");
    }

    fn offsets_temp1() -> usize {
        crate::constants::offsets::TEMP1
    }
}
