//! hidraw device discovery
//!
//! Linux exposes every raw HID node under `/sys/class/hidraw/hidrawN`. The
//! parent HID device's `uevent` carries the bus and USB IDs:
//!
//! ```text
//! DRIVER=hid-generic
//! HID_ID=0003:00000C70:0000F00D
//! HID_NAME=aquacomputer QUADRO
//! HID_PHYS=usb-0000:00:14.0-9/input0
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::constants::{device, paths};
use crate::error::{QuadroError, Result};

/// A hidraw node belonging to a supported controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidrawDevice {
    /// Node name, e.g. `hidraw3`
    pub name: String,
    /// Character device, e.g. `/dev/hidraw3`
    pub dev_path: PathBuf,
    /// sysfs class entry
    pub sys_path: PathBuf,
    pub bus: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub hid_name: Option<String>,
    pub phys: Option<String>,
}

impl HidrawDevice {
    /// Human-readable model name from the supported device table
    pub fn model(&self) -> &'static str {
        device::SUPPORTED
            .iter()
            .find(|(v, p, _)| *v == self.vendor_id && *p == self.product_id)
            .map(|(_, _, name)| *name)
            .unwrap_or("unknown")
    }
}

/// Fields of interest from a HID uevent file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HidUevent {
    pub bus: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: Option<String>,
    pub phys: Option<String>,
    pub uniq: Option<String>,
}

/// Parse `HID_ID=bbbb:vvvvvvvv:pppppppp` (hex)
pub fn parse_hid_id(value: &str) -> Option<(u16, u16, u16)> {
    let mut parts = value.trim().split(':');
    let bus = u32::from_str_radix(parts.next()?, 16).ok()?;
    let vendor = u32::from_str_radix(parts.next()?, 16).ok()?;
    let product = u32::from_str_radix(parts.next()?, 16).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((
        u16::try_from(bus).ok()?,
        u16::try_from(vendor).ok()?,
        u16::try_from(product).ok()?,
    ))
}

/// Parse the contents of a HID uevent file. Returns `None` without a valid `HID_ID`.
pub fn parse_uevent(content: &str) -> Option<HidUevent> {
    let mut ids = None;
    let mut event = HidUevent::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "HID_ID" => ids = parse_hid_id(value),
            "HID_NAME" if !value.is_empty() => event.name = Some(value.to_string()),
            "HID_PHYS" if !value.is_empty() => event.phys = Some(value.to_string()),
            "HID_UNIQ" if !value.is_empty() => event.uniq = Some(value.to_string()),
            _ => {}
        }
    }

    let (bus, vendor_id, product_id) = ids?;
    event.bus = bus;
    event.vendor_id = vendor_id;
    event.product_id = product_id;
    Some(event)
}

/// True if the IDs belong to a device the decoder understands
pub fn is_supported(bus: u16, vendor_id: u16, product_id: u16) -> bool {
    bus == device::BUS_USB
        && device::SUPPORTED
            .iter()
            .any(|(v, p, _)| *v == vendor_id && *p == product_id)
}

/// Enumerate supported hidraw devices.
///
/// `sysfs_root` and `dev_root` are normally `/sys` and `/dev`. A missing
/// hidraw class yields an empty list; unreadable entries are skipped.
pub fn discover_devices(sysfs_root: &Path, dev_root: &Path) -> Result<Vec<HidrawDevice>> {
    let class_dir = sysfs_root.join(paths::HIDRAW_CLASS);
    if !class_dir.is_dir() {
        debug!("No hidraw class at {:?}", class_dir);
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&class_dir).map_err(|e| QuadroError::FileRead {
        path: class_dir.clone(),
        source: e,
    })?;

    let mut devices = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("hidraw") {
            continue;
        }
        let sys_path = entry.path();
        let uevent_path = sys_path.join("device").join("uevent");

        let content = match fs::read_to_string(&uevent_path) {
            Ok(content) => content,
            Err(e) => {
                trace!("Skipping {}: cannot read {:?}: {}", name, uevent_path, e);
                continue;
            }
        };
        let Some(event) = parse_uevent(&content) else {
            trace!("Skipping {}: no HID_ID", name);
            continue;
        };
        if !is_supported(event.bus, event.vendor_id, event.product_id) {
            trace!(
                "Skipping {}: {:04x}:{:04x} not supported",
                name,
                event.vendor_id,
                event.product_id
            );
            continue;
        }

        let device = HidrawDevice {
            dev_path: dev_root.join(&name),
            name,
            sys_path,
            bus: event.bus,
            vendor_id: event.vendor_id,
            product_id: event.product_id,
            hid_name: event.name,
            phys: event.phys,
        };
        info!(
            device = %device.name,
            model = device.model(),
            "Found supported hidraw device"
        );
        devices.push(device);
    }

    devices.sort_by(|a, b| natural_key(&a.name).cmp(&natural_key(&b.name)));
    Ok(devices)
}

/// Sort key so that hidraw10 follows hidraw9
fn natural_key(name: &str) -> (usize, u32) {
    let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
    (name.len() - digits.len(), digits.parse().unwrap_or(u32::MAX))
}
