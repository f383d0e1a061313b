//! Constants and configuration values for Quadromon
//!
//! Centralizes report offsets, device identifiers, paths and defaults.
//! Never use magic numbers in other files - add them here first.

use std::time::Duration;

/// Status report framing and cadence
pub mod report {
    use super::Duration;

    /// Report ID of the periodic status report (first byte of every hidraw read)
    pub const STATUS_REPORT_ID: u8 = 0x01;

    /// The device emits one status report roughly every second
    pub const NOMINAL_PERIOD: Duration = Duration::from_secs(1);

    /// Maximum snapshot age before reads report no data (two report periods)
    pub const UPDATE_INTERVAL: Duration = Duration::from_secs(2 * NOMINAL_PERIOD.as_secs());

    /// Read buffer for one hidraw report (HID_MAX_BUFFER_SIZE)
    pub const READ_BUFFER_SIZE: usize = 4096;
}

/// Byte offsets of the status report fields, counted from the report ID byte.
/// All fields are big-endian.
pub mod offsets {
    pub const SERIAL_FIRST_PART: usize = 3;
    pub const SERIAL_SECOND_PART: usize = 5;
    pub const FIRMWARE_VERSION: usize = 13;
    pub const POWER_CYCLES: usize = 24;

    pub const TEMP1: usize = 52;
    pub const TEMP2: usize = 54;
    pub const TEMP3: usize = 56;
    pub const TEMP4: usize = 58;

    pub const VOLTAGE: usize = 108;
    pub const FLOW_SPEED: usize = 110;

    pub const FAN1_VOLTAGE: usize = 114;
    pub const FAN1_CURRENT: usize = 116;
    pub const FAN1_POWER: usize = 118;
    pub const FAN1_SPEED: usize = 120;

    pub const FAN2_VOLTAGE: usize = 127;
    pub const FAN2_CURRENT: usize = 129;
    pub const FAN2_POWER: usize = 131;
    pub const FAN2_SPEED: usize = 133;

    pub const FAN3_VOLTAGE: usize = 140;
    pub const FAN3_CURRENT: usize = 142;
    pub const FAN3_POWER: usize = 144;
    pub const FAN3_SPEED: usize = 146;

    pub const FAN4_VOLTAGE: usize = 153;
    pub const FAN4_CURRENT: usize = 155;
    pub const FAN4_POWER: usize = 157;
    pub const FAN4_SPEED: usize = 159;
}

/// Unit conversion factors from raw report units to normalized units
pub mod units {
    /// 0.01 °C -> millidegrees
    pub const TEMP_MULTIPLIER: u32 = 10;
    /// Flow pulses are reported scaled by 10
    pub const FLOW_DIVISOR: u32 = 10;
    /// 10 mW -> microwatts
    pub const POWER_MULTIPLIER: u32 = 10_000;
    /// 0.01 V -> millivolts
    pub const VOLTAGE_MULTIPLIER: u32 = 10;
}

/// Number of channels exposed per sensor kind
pub mod channels {
    pub const TEMPERATURES: usize = 4;
    pub const SPEEDS: usize = 5;
    pub const POWERS: usize = 4;
    pub const VOLTAGES: usize = 5;
    pub const CURRENTS: usize = 4;
}

/// USB identity and naming of supported devices
pub mod device {
    /// Bus type reported in HID_ID for USB devices
    pub const BUS_USB: u16 = 0x0003;

    pub const AQUACOMPUTER_VENDOR_ID: u16 = 0x0c70;
    pub const QUADRO_PRODUCT_ID: u16 = 0xf00d;

    /// (vendor, product, name) of every device this decoder understands
    pub const SUPPORTED: &[(u16, u16, &str)] =
        &[(AQUACOMPUTER_VENDOR_ID, QUADRO_PRODUCT_ID, "Aquacomputer Quadro")];

    /// Prefix of the per-device diagnostics scope
    pub const DRIVER_NAME: &str = "aquacomputer-quadro";

    /// Chip name reported alongside the sensor table
    pub const CHIP_NAME: &str = "quadro";

    /// Every sensor channel is read-only
    pub const SENSOR_MODE: u32 = 0o444;
}

/// System paths
pub mod paths {
    use std::path::{Path, PathBuf};

    /// sysfs mount point
    pub const SYSFS_ROOT: &str = "/sys";

    /// Device node directory
    pub const DEV_ROOT: &str = "/dev";

    /// hidraw class directory relative to the sysfs root
    pub const HIDRAW_CLASS: &str = "class/hidraw";

    /// System configuration directory
    pub const CONFIG_DIR: &str = "/etc/quadromon";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";

    /// Environment variable overriding the daemon socket path
    pub const SOCKET_ENV: &str = "QUADROMON_SOCKET";

    /// Default socket path, preferring /run when it exists
    pub fn default_socket_path() -> PathBuf {
        if Path::new("/run").exists() {
            PathBuf::from("/run/quadromon.sock")
        } else {
            PathBuf::from("/var/run/quadromon.sock")
        }
    }

    /// Default PID file path
    pub fn default_pid_file() -> PathBuf {
        if Path::new("/run").exists() {
            PathBuf::from("/run/quadromond.pid")
        } else {
            PathBuf::from("/var/run/quadromond.pid")
        }
    }

    /// Full path of the system configuration file
    pub fn config_file() -> PathBuf {
        Path::new(CONFIG_DIR).join(CONFIG_FILE)
    }
}

/// Daemon tuning defaults
pub mod daemon {
    /// How often the hidraw class is rescanned for new devices
    pub const DEFAULT_RESCAN_INTERVAL_MS: u64 = 5000;

    /// Raw reports buffered between reader and decoder per device
    pub const DEFAULT_REPORT_QUEUE_DEPTH: usize = 8;

    /// Default log filter
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

/// Resource limits
pub mod limits {
    /// Maximum configuration file size in bytes
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;

    /// Maximum size of a raw report accepted by the offline decoder
    pub const MAX_CAPTURE_SIZE: u64 = 64 * 1024;
}

/// Client-side IPC tuning
pub mod client {
    use super::Duration;

    /// Timeout for a single request/response round trip
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Initial buffer size for responses
    pub const INITIAL_BUFFER_SIZE: usize = 4096;
}
