//! Hardware access
//!
//! hidraw discovery and raw report sources.

mod discovery;
mod source;

pub use discovery::{
    discover_devices, is_supported, parse_hid_id, parse_uevent, HidUevent, HidrawDevice,
};
pub use source::{pump_reports, HidrawSource, ReportSource};

#[cfg(test)]
pub use source::MockReportSource;
