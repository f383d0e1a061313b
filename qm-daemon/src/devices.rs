//! Device Lifecycle
//!
//! Keeps one `QuadroDevice` per attached controller and wires it to its
//! hidraw node:
//!
//! - a blocking reader thread pulls reports off `/dev/hidrawN` and hands
//!   them to a bounded queue without ever waiting on it
//! - a decode task drains the queue into the device context
//! - when the reader fails (unplug, I/O error) the queue closes, the decode
//!   task ends and the device is removed from the registry
//!
//! A periodic rescan attaches devices that appear later.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use qm_core::{discover_devices, pump_reports, HidrawDevice, HidrawSource, QuadroDevice, RawReport};
use qm_error::{QuadroError, Result};

/// Attached devices keyed by hidraw node name
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<QuadroDevice>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device context. Returns false if the name is taken.
    pub fn insert(&self, device: Arc<QuadroDevice>) -> bool {
        let mut devices = self.devices.write();
        if devices.contains_key(device.name()) {
            return false;
        }
        devices.insert(device.name().to_string(), device);
        true
    }

    pub fn remove(&self, name: &str) -> Option<Arc<QuadroDevice>> {
        self.devices.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<QuadroDevice>> {
        self.devices.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// All devices sorted by name
    pub fn list(&self) -> Vec<Arc<QuadroDevice>> {
        let mut devices: Vec<_> = self.devices.read().values().cloned().collect();
        devices.sort_by(|a, b| a.name().cmp(b.name()));
        devices
    }

    /// Look up a device by name, or the only device when no name is given
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<QuadroDevice>> {
        let devices = self.devices.read();
        match name {
            Some(name) => devices
                .get(name)
                .cloned()
                .ok_or_else(|| QuadroError::DeviceNotFound(name.to_string())),
            None => match devices.len() {
                0 | 1 => devices
                    .values()
                    .next()
                    .cloned()
                    .ok_or_else(|| QuadroError::DeviceNotFound("no device attached".to_string())),
                n => Err(QuadroError::AmbiguousDevice(n)),
            },
        }
    }
}

/// Hotplug and transport parameters
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub sysfs_root: PathBuf,
    pub dev_root: PathBuf,
    pub rescan_interval: Duration,
    pub queue_depth: usize,
}

impl From<&qm_core::Settings> for TransportConfig {
    fn from(settings: &qm_core::Settings) -> Self {
        Self {
            sysfs_root: settings.sysfs_root.clone(),
            dev_root: settings.dev_root.clone(),
            rescan_interval: Duration::from_millis(settings.rescan_interval_ms),
            queue_depth: settings.report_queue_depth,
        }
    }
}

/// Attach every supported device not yet in the registry.
/// Returns the number of newly attached devices.
pub fn scan_and_attach(registry: &Arc<DeviceRegistry>, config: &TransportConfig) -> usize {
    let found = match discover_devices(&config.sysfs_root, &config.dev_root) {
        Ok(found) => found,
        Err(e) => {
            warn!("Device scan failed: {}", e);
            return 0;
        }
    };

    let mut attached = 0;
    for hid in found {
        if registry.contains(&hid.name) {
            continue;
        }
        let source = match HidrawSource::open(&hid.dev_path) {
            Ok(source) => source,
            Err(e) => {
                warn!(device = %hid.name, "Cannot open device: {}", e);
                continue;
            }
        };
        if attach_device(registry, hid, source, config.queue_depth) {
            attached += 1;
        }
    }
    attached
}

/// Create the device context and start its reader and decode task
fn attach_device(
    registry: &Arc<DeviceRegistry>,
    hid: HidrawDevice,
    source: HidrawSource,
    queue_depth: usize,
) -> bool {
    let name = hid.name.clone();
    let device = Arc::new(QuadroDevice::attach(hid));
    if !registry.insert(Arc::clone(&device)) {
        return false;
    }

    let (tx, rx) = mpsc::channel(queue_depth);
    let reader_device = Arc::clone(&device);
    let spawned = std::thread::Builder::new()
        .name(format!("reader-{}", name))
        .spawn(move || run_reader(source, tx, reader_device));
    if let Err(e) = spawned {
        error!(device = %name, "Failed to spawn reader thread: {}", e);
        registry.remove(&name);
        return false;
    }

    tokio::spawn(run_decoder(Arc::clone(registry), device, rx));
    info!(device = %name, "Device attached");
    true
}

/// Reader thread body: never blocks on the queue
fn run_reader(mut source: HidrawSource, tx: mpsc::Sender<RawReport>, device: Arc<QuadroDevice>) {
    let result = pump_reports(&mut source, |raw| match tx.try_send(raw) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            device.record_dropped();
            warn!(device = %device.name(), "Report queue full, dropping report");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });

    match result {
        Ok(_) => debug!(device = %device.name(), "Reader stopped"),
        Err(QuadroError::DeviceDisconnected(_)) => {
            info!(device = %device.name(), "Device disconnected")
        }
        Err(e) => warn!(device = %device.name(), "Read failed: {}", e),
    }
}

/// Decode task body: ends when the reader drops its sender
async fn run_decoder(
    registry: Arc<DeviceRegistry>,
    device: Arc<QuadroDevice>,
    mut rx: mpsc::Receiver<RawReport>,
) {
    while let Some(raw) = rx.recv().await {
        device.handle_raw_event(&raw.data, raw.received);
    }
    registry.remove(device.name());
    let counts = device.stats();
    info!(
        device = %device.name(),
        accepted = counts.accepted,
        ignored = counts.ignored(),
        dropped = counts.dropped,
        "Device detached"
    );
}

/// Periodic hotplug scan
pub async fn run_hotplug_loop(
    registry: Arc<DeviceRegistry>,
    config: TransportConfig,
    shutdown: Arc<AtomicBool>,
) {
    info!(
        "Hotplug scan every {:?} under {:?}",
        config.rescan_interval, config.sysfs_root
    );
    let mut ticker = tokio::time::interval(config.rescan_interval);
    loop {
        ticker.tick().await;
        if shutdown.load(Ordering::SeqCst) {
            info!("Hotplug loop shutting down");
            break;
        }
        let attached = scan_and_attach(&registry, &config);
        if attached > 0 {
            debug!("Attached {} new device(s), {} total", attached, registry.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_single_device() {
        let registry = DeviceRegistry::new();
        assert!(matches!(
            registry.resolve(None),
            Err(QuadroError::DeviceNotFound(_))
        ));

        registry.insert(Arc::new(QuadroDevice::new("hidraw3")));
        assert_eq!(registry.resolve(None).unwrap().name(), "hidraw3");
        assert_eq!(registry.resolve(Some("hidraw3")).unwrap().name(), "hidraw3");
        assert!(matches!(
            registry.resolve(Some("hidraw9")),
            Err(QuadroError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_requires_name_with_several_devices() {
        let registry = DeviceRegistry::new();
        registry.insert(Arc::new(QuadroDevice::new("hidraw3")));
        registry.insert(Arc::new(QuadroDevice::new("hidraw1")));

        assert!(matches!(
            registry.resolve(None),
            Err(QuadroError::AmbiguousDevice(2))
        ));
        let names: Vec<_> = registry.list().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["hidraw1", "hidraw3"]);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let registry = DeviceRegistry::new();
        assert!(registry.insert(Arc::new(QuadroDevice::new("hidraw3"))));
        assert!(!registry.insert(Arc::new(QuadroDevice::new("hidraw3"))));
        assert_eq!(registry.len(), 1);
    }

    /// Fake sysfs entry whose device node is a regular file holding one report
    fn fake_device(sys: &TempDir, dev: &TempDir, name: &str, report: &[u8]) {
        let dir = sys.path().join("class/hidraw").join(name).join("device");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("uevent"),
            "HID_ID=0003:00000C70:0000F00D\nHID_NAME=aquacomputer QUADRO\n",
        )
        .unwrap();
        fs::write(dev.path().join(name), report).unwrap();
    }

    #[tokio::test]
    async fn test_attach_decode_and_detach() {
        let sys = TempDir::new().unwrap();
        let dev = TempDir::new().unwrap();
        let mut report = vec![0u8; 161];
        report[0] = qm_core::constants::report::STATUS_REPORT_ID;
        report[qm_core::constants::offsets::FAN1_SPEED + 1] = 200;
        fake_device(&sys, &dev, "hidraw4", &report);

        let registry = Arc::new(DeviceRegistry::new());
        let config = TransportConfig {
            sysfs_root: sys.path().to_path_buf(),
            dev_root: dev.path().to_path_buf(),
            rescan_interval: Duration::from_millis(50),
            queue_depth: 4,
        };

        // Hold a handle so the context outlives detach
        assert_eq!(scan_and_attach(&registry, &config), 1);
        let device = registry.get("hidraw4").unwrap();

        // A regular file yields the report once, then EOF detaches the device
        let deadline = Instant::now() + Duration::from_secs(5);
        while registry.contains("hidraw4") && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!registry.contains("hidraw4"));
        assert_eq!(device.stats().accepted, 1);
        assert_eq!(device.sample().snapshot.speeds[1], 200);
    }
}
