//! Data types and static channel topology
//!
//! Contains all core data structures shared by the decoder, the store and
//! the daemon.

mod channels;
mod types;

pub use channels::{channel_table, label, mode, unit, ChannelInfo, FLOW_CHANNEL};
pub use types::{DeviceIdentity, SensorChannel, SensorKind, SensorSnapshot};
