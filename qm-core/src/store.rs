//! Sensor state store
//!
//! Holds the latest decoded snapshot and the instant it was published. The
//! pair lives in one immutable [`Sample`] behind an `Arc`; publishing swaps
//! the pointer, so a reader always sees one complete report.
//!
//! Reads are refused once the sample is older than the freshness window.
//! Identity fields are served regardless of age.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::constants::report::UPDATE_INTERVAL;
use crate::data::{self, DeviceIdentity, SensorKind, SensorSnapshot};
use crate::error::{QuadroError, Result};

/// A snapshot together with its publication time
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub snapshot: SensorSnapshot,
    /// `None` until the first report is accepted, which counts as expired
    pub updated: Option<Instant>,
}

impl Sample {
    /// Age at `now`, or `None` before the first report
    pub fn age_at(&self, now: Instant) -> Option<Duration> {
        self.updated.map(|t| now.saturating_duration_since(t))
    }

    /// Fresh while the age does not exceed `interval`
    pub fn is_fresh_at(&self, now: Instant, interval: Duration) -> bool {
        self.age_at(now).map_or(false, |age| age <= interval)
    }

    /// Value of one channel subject to freshness.
    ///
    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn read_at(
        &self,
        kind: SensorKind,
        channel: usize,
        now: Instant,
        interval: Duration,
    ) -> Result<i64> {
        let value = self.snapshot.value(kind, channel);
        if !self.is_fresh_at(now, interval) {
            return Err(QuadroError::NoData);
        }
        Ok(value)
    }
}

/// One row of a full table read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub kind: SensorKind,
    pub channel: usize,
    pub label: &'static str,
    pub mode: u32,
    /// `None` when stale
    pub value: Option<i64>,
}

/// Latest snapshot of one device
#[derive(Debug)]
pub struct SensorStore {
    current: RwLock<Arc<Sample>>,
    interval: Duration,
}

impl Default for SensorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorStore {
    /// Empty store whose freshness is already expired
    pub fn new() -> Self {
        Self::with_interval(UPDATE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(Sample::default())),
            interval,
        }
    }

    /// Replace snapshot and timestamp in one step
    pub fn publish(&self, snapshot: SensorSnapshot, now: Instant) {
        let sample = Arc::new(Sample {
            snapshot,
            updated: Some(now),
        });
        // Only the pointer swap happens under the lock; the old sample is
        // dropped after the guard is released.
        let previous = std::mem::replace(&mut *self.current.write(), sample);
        drop(previous);
        trace!("Published sensor snapshot");
    }

    /// Consistent view of snapshot and timestamp
    pub fn sample(&self) -> Arc<Sample> {
        Arc::clone(&self.current.read())
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.sample().updated
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        self.sample().is_fresh_at(now, self.interval)
    }

    /// Read one channel now.
    ///
    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn read(&self, kind: SensorKind, channel: usize) -> Result<i64> {
        self.read_at(kind, channel, Instant::now())
    }

    /// Read one channel as of `now`.
    ///
    /// # Panics
    /// Panics if `channel` is out of range for `kind`.
    pub fn read_at(&self, kind: SensorKind, channel: usize, now: Instant) -> Result<i64> {
        self.sample().read_at(kind, channel, now, self.interval)
    }

    /// Fixed channel name, independent of freshness
    pub fn label(&self, kind: SensorKind, channel: usize) -> &'static str {
        data::label(kind, channel)
    }

    pub fn mode(&self, kind: SensorKind, channel: usize) -> u32 {
        data::mode(kind, channel)
    }

    /// Every channel from a single sample, in canonical order
    pub fn read_all_at(&self, now: Instant) -> Vec<Reading> {
        let sample = self.sample();
        let fresh = sample.is_fresh_at(now, self.interval);
        data::channel_table()
            .map(|info| Reading {
                kind: info.kind,
                channel: info.channel,
                label: info.label,
                mode: info.mode,
                value: fresh.then(|| sample.snapshot.value(info.kind, info.channel)),
            })
            .collect()
    }

    /// Identity block of the latest snapshot, never freshness-checked
    pub fn identity(&self) -> DeviceIdentity {
        self.sample().snapshot.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{decode, fixture_report};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_interval_spans_two_report_periods() {
        use crate::constants::report::NOMINAL_PERIOD;
        assert_eq!(UPDATE_INTERVAL, NOMINAL_PERIOD * 2);

        let store = SensorStore::new();
        let t = Instant::now();
        store.publish(SensorSnapshot::default(), t);
        assert!(store.is_fresh_at(t + NOMINAL_PERIOD * 2));
        assert!(!store.is_fresh_at(t + NOMINAL_PERIOD * 2 + Duration::from_nanos(1)));
    }

    fn uniform_snapshot(v: u32) -> SensorSnapshot {
        SensorSnapshot {
            temperatures: [v as i32; 4],
            speeds: [v; 5],
            powers: [v; 4],
            voltages: [v; 5],
            currents: [v; 4],
            identity: DeviceIdentity {
                serial_number: [v as u16; 2],
                firmware_version: v as u16,
                power_cycles: v,
            },
        }
    }

    fn assert_uniform(snapshot: &SensorSnapshot) -> u32 {
        let v = snapshot.speeds[0];
        assert!(snapshot.temperatures.iter().all(|&t| t == v as i32));
        assert!(snapshot.speeds.iter().all(|&s| s == v));
        assert!(snapshot.powers.iter().all(|&p| p == v));
        assert!(snapshot.voltages.iter().all(|&x| x == v));
        assert!(snapshot.currents.iter().all(|&c| c == v));
        assert_eq!(snapshot.identity.power_cycles, v);
        v
    }

    #[test]
    fn test_read_before_first_report_is_stale() {
        let store = SensorStore::new();
        for info in data::channel_table() {
            let result = store.read(info.kind, info.channel);
            assert!(matches!(result, Err(QuadroError::NoData)));
        }
        assert!(store.last_update().is_none());
    }

    #[test]
    fn test_fixture_round_trip_every_channel() {
        let store = SensorStore::new();
        let now = Instant::now();
        store.publish(decode(&fixture_report()).unwrap(), now);

        let expected: [(SensorKind, [i64; 5]); 5] = [
            (SensorKind::Temperature, [2400, 25120, 30010, 0, 0]),
            (SensorKind::Speed, [123, 1200, 1301, 1402, 1503]),
            (SensorKind::Power, [90_000, 550_000, 560_000, 570_000, 0]),
            (SensorKind::Voltage, [12_100, 11_980, 11_970, 11_960, 11_950]),
            (SensorKind::Current, [45, 46, 47, 48, 0]),
        ];
        for (kind, values) in expected {
            for channel in 0..kind.channel_count() {
                assert_eq!(store.read_at(kind, channel, now).unwrap(), values[channel]);
            }
        }
    }

    #[test]
    fn test_freshness_boundary() {
        let store = SensorStore::new();
        let t = Instant::now();
        store.publish(uniform_snapshot(7), t);

        assert_eq!(store.read_at(SensorKind::Current, 0, t).unwrap(), 7);
        assert_eq!(
            store.read_at(SensorKind::Current, 0, t + UPDATE_INTERVAL).unwrap(),
            7
        );
        let late = t + UPDATE_INTERVAL + Duration::from_nanos(1);
        assert!(matches!(
            store.read_at(SensorKind::Current, 0, late),
            Err(QuadroError::NoData)
        ));
    }

    #[test]
    fn test_labels_and_identity_ignore_freshness() {
        let store = SensorStore::new();
        let t = Instant::now();
        store.publish(decode(&fixture_report()).unwrap(), t);

        let late = t + Duration::from_secs(60);
        assert!(store.read_at(SensorKind::Speed, 1, late).is_err());
        assert_eq!(store.label(SensorKind::Speed, 1), "Fan1 speed");
        assert_eq!(store.identity().serial_number_string(), "00003-00005");
        assert_eq!(store.mode(SensorKind::Speed, 1), 0o444);
    }

    #[test]
    fn test_read_all_marks_stale_rows() {
        let store = SensorStore::new();
        let t = Instant::now();
        store.publish(uniform_snapshot(3), t);

        let fresh = store.read_all_at(t);
        assert_eq!(fresh.len(), 22);
        assert!(fresh.iter().all(|r| r.value == Some(3)));

        let stale = store.read_all_at(t + Duration::from_secs(10));
        assert!(stale.iter().all(|r| r.value.is_none()));
        assert_eq!(stale[13].label, "VCC");
    }

    #[test]
    fn test_sample_held_across_publish_stays_whole() {
        let store = SensorStore::new();
        let t = Instant::now();
        store.publish(uniform_snapshot(1), t);

        let held = store.sample();
        store.publish(uniform_snapshot(2), t + Duration::from_millis(500));

        assert_eq!(assert_uniform(&held.snapshot), 1);
        assert_eq!(held.updated, Some(t));
        assert_eq!(assert_uniform(&store.sample().snapshot), 2);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_snapshot() {
        let store = Arc::new(SensorStore::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut last = 0;
                    while !done.load(Ordering::Relaxed) {
                        let v = assert_uniform(&store.sample().snapshot);
                        // Publications are monotonic
                        assert!(v >= last);
                        last = v;
                    }
                })
            })
            .collect();

        for v in 1..=2000u32 {
            store.publish(uniform_snapshot(v), Instant::now());
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(assert_uniform(&store.sample().snapshot), 2000);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_channel_panics() {
        let store = SensorStore::new();
        let _ = store.read(SensorKind::Temperature, 4);
    }
}
