//! Quadromon Core Library
//!
//! Decodes the periodic status reports of the Aquacomputer Quadro fan
//! controller and serves the latest values as a typed sensor table.
//!
//! # Module Structure
//!
//! - `report/` - Status report schema and decoder
//! - `data/` - Sensor kinds, snapshot and static channel topology
//! - `hw/` - hidraw discovery and raw report sources
//! - `store` - Latest snapshot with freshness tracking
//! - `device` - Per-device context and diagnostics
//!
//! # Example
//!
//! ```
//! use qm_core::{QuadroDevice, SensorKind};
//!
//! let device = QuadroDevice::new("hidraw0");
//! // Nothing decoded yet, so every read is stale
//! assert!(device.read(SensorKind::Temperature, 0).is_err());
//! assert_eq!(device.label(SensorKind::Temperature, 0), "Temp1");
//! ```

// Grouped modules
pub mod data;
pub mod hw;
pub mod report;

// Standalone modules
pub mod constants;
pub mod daemon_client;
pub mod device;
pub mod display;
pub mod error;
pub mod settings;
pub mod store;

// Re-export primary types from data/
pub use data::{
    channel_table, label, mode, unit, ChannelInfo, DeviceIdentity, SensorChannel, SensorKind,
    SensorSnapshot, FLOW_CHANNEL,
};

// Re-export decoder
pub use report::{decode, inspect, DecodeOutcome, RawReport, REPORT_MIN_LEN};

// Re-export error types
pub use error::{QuadroError, Result};

// Re-export state and device context
pub use device::{QuadroDevice, ReportCounts};
pub use store::{Reading, Sample, SensorStore};

// Re-export hardware access
pub use hw::{discover_devices, pump_reports, HidrawDevice, HidrawSource, ReportSource};

// Re-export settings
pub use settings::{load_settings, load_settings_from, resolve_socket_path, Settings};

// Re-export daemon client
pub use daemon_client::{is_daemon_available, DaemonClient};

// Re-export display formatting functions
pub use display::{
    format_channel, format_microwatts, format_milliamps, format_millicelsius, format_millivolts,
    format_reading, format_rpm,
};
