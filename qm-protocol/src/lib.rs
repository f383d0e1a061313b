use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for correlation
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum message size for IPC (16KB, a full table read fits easily)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;

/// Maximum device name length
const MAX_DEVICE_NAME_LENGTH: usize = 32;

/// Sensor kinds on the wire and their channel counts
pub const SENSOR_KINDS: &[(&str, usize)] = &[
    ("temp", 4),
    ("fan", 5),
    ("power", 4),
    ("in", 5),
    ("curr", 4),
];

/// Generate a unique request ID for correlation
pub fn generate_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation and debugging
    pub id: u64,
    /// The actual request
    #[serde(flatten)]
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(request: Request) -> Self {
        Self {
            id: generate_request_id(),
            request,
        }
    }

    pub fn with_id(request: Request, id: u64) -> Self {
        Self { id, request }
    }
}

/// Daemon requests. `device` may be omitted when exactly one device is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data")]
pub enum Request {
    Ping,
    Version,
    ListDevices,
    ReadSensor {
        device: Option<String>,
        kind: String,
        channel: usize,
    },
    ReadLabel {
        device: Option<String>,
        kind: String,
        channel: usize,
    },
    ReadAll { device: Option<String> },
    GetDiagnostics { device: Option<String> },
}

impl Request {
    /// Validate request parameters before dispatch
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Request::Ping | Request::Version | Request::ListDevices => Ok(()),

            Request::ReadSensor { device, kind, channel }
            | Request::ReadLabel { device, kind, channel } => {
                validate_optional_device(device)?;
                validate_channel(kind, *channel)
            }

            Request::ReadAll { device } | Request::GetDiagnostics { device } => {
                validate_optional_device(device)
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::Version => "Version",
            Request::ListDevices => "ListDevices",
            Request::ReadSensor { .. } => "ReadSensor",
            Request::ReadLabel { .. } => "ReadLabel",
            Request::ReadAll { .. } => "ReadAll",
            Request::GetDiagnostics { .. } => "GetDiagnostics",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to
    pub id: u64,
    /// The actual response
    #[serde(flatten)]
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(id: u64, response: Response) -> Self {
        Self { id, response }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    #[serde(rename = "ok")]
    Ok(ResponseData),
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response payload; exactly one field is set per request type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<SensorReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<SensorTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<DeviceSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsInfo>,
}

impl ResponseData {
    pub fn string(v: String) -> Self {
        Self { value: Some(v), ..Self::default() }
    }

    pub fn sensor(r: SensorReading) -> Self {
        Self { reading: Some(r), ..Self::default() }
    }

    pub fn sensor_table(t: SensorTable) -> Self {
        Self { table: Some(t), ..Self::default() }
    }

    pub fn device_list(d: Vec<DeviceSummary>) -> Self {
        Self { devices: Some(d), ..Self::default() }
    }

    pub fn diag(d: DiagnosticsInfo) -> Self {
        Self { diagnostics: Some(d), ..Self::default() }
    }
}

/// One channel of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// `temp`, `fan`, `power`, `in` or `curr`
    pub kind: String,
    /// Zero-based channel index
    pub channel: usize,
    pub label: String,
    /// Normalized value; `None` when stale
    pub value: Option<i64>,
    pub stale: bool,
    pub mode: u32,
}

/// Every channel of one device, taken from a single snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorTable {
    pub device: String,
    pub chip: String,
    pub readings: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub dev_path: String,
    pub model: String,
    pub chip: String,
    /// True while the latest snapshot is inside the freshness window
    pub fresh: bool,
    pub reports_accepted: u64,
    pub reports_ignored: u64,
    pub reports_dropped: u64,
}

/// Read-only identity values of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsInfo {
    pub device: String,
    /// Per-device namespace, e.g. `aquacomputer-quadro-hidraw3`
    pub scope: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub power_cycles: String,
}

impl Response {
    pub fn ok_string(s: impl Into<String>) -> Self {
        Response::Ok(ResponseData::string(s.into()))
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { message: msg.into() }
    }
}

/// Number of channels of a wire kind, or `None` if the kind is unknown
pub fn channel_count(kind: &str) -> Option<usize> {
    SENSOR_KINDS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, count)| *count)
}

pub fn validate_channel(kind: &str, channel: usize) -> Result<(), String> {
    let count = channel_count(kind).ok_or_else(|| format!("Unknown sensor kind: {:?}", kind))?;
    if channel >= count {
        return Err(format!(
            "Channel {} out of range for {} (0-{})",
            channel,
            kind,
            count - 1
        ));
    }
    Ok(())
}

pub fn validate_device_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Device name cannot be empty".into());
    }
    if name.len() > MAX_DEVICE_NAME_LENGTH {
        return Err(format!(
            "Device name too long: {} > {} chars",
            name.len(),
            MAX_DEVICE_NAME_LENGTH
        ));
    }
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(format!("Device name contains invalid character: {:?}", c));
        }
    }
    Ok(())
}

fn validate_optional_device(device: &Option<String>) -> Result<(), String> {
    match device {
        Some(name) => validate_device_name(name),
        None => Ok(()),
    }
}
