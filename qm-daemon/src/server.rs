//! Unix Socket Server
//!
//! Serves sensor queries to unprivileged clients, one JSON request per line.
//!
//! # Limits
//! - **Connection limits**: Maximum concurrent connections enforced
//! - **Timeouts**: Read/write timeouts prevent resource exhaustion
//! - **Message limits**: Maximum message size prevents memory exhaustion
//! - **Input validation**: Requests are validated before dispatch

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use qm_core::{QuadroDevice, SensorChannel};
use qm_error::QuadroError;
use qm_protocol::{
    DeviceSummary, DiagnosticsInfo, Request, RequestEnvelope, Response, ResponseData,
    ResponseEnvelope, SensorReading, SensorTable,
};

use crate::devices::DeviceRegistry;

/// Maximum concurrent connections
const MAX_CONNECTIONS: usize = 64;

/// Maximum message size
const MAX_MESSAGE_SIZE: usize = qm_protocol::MAX_MESSAGE_SIZE;

/// Idle timeout between requests on one connection
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for writing one response
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sensor data is not sensitive; any local user may query it
const SOCKET_MODE: u32 = 0o666;

/// Active connection counter
static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

async fn read_line_bounded<R: tokio::io::AsyncBufRead + Unpin>(
    reader: &mut R,
    out: &mut Vec<u8>,
    max_len: usize,
) -> std::io::Result<usize> {
    out.clear();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(0);
        }

        let (take_len, found_newline) = match available.iter().position(|b| *b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        let remaining = max_len.saturating_sub(out.len());
        if take_len > remaining {
            let consume_len = remaining.min(available.len());
            reader.consume(consume_len);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Message too large",
            ));
        }

        out.extend_from_slice(&available[..take_len]);
        reader.consume(take_len);

        if found_newline {
            return Ok(out.len());
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// Bind the socket and serve until SIGINT
pub async fn run_server(
    socket_path: &Path,
    registry: Arc<DeviceRegistry>,
) -> Result<(), Box<dyn std::error::Error>> {
    if socket_path.exists() {
        let metadata = socket_path.symlink_metadata()?;
        if metadata.file_type().is_symlink() {
            return Err("Socket path is a symlink - refusing for security".into());
        }
        std::fs::remove_file(socket_path)?;
        debug!("Removed existing socket file");
    }

    let listener = UnixListener::bind(socket_path)?;
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;

    info!("Listening on {:?} (mode {:o})", socket_path, SOCKET_MODE);
    info!("Limits: max_conn={}, max_msg={}", MAX_CONNECTIONS, MAX_MESSAGE_SIZE);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let current = ACTIVE_CONNECTIONS.load(Ordering::SeqCst);
                        if current >= MAX_CONNECTIONS {
                            warn!(
                                "Connection limit reached ({}), rejecting new connection",
                                current
                            );
                            drop(stream);
                            continue;
                        }

                        ACTIVE_CONNECTIONS.fetch_add(1, Ordering::SeqCst);
                        let registry = Arc::clone(&registry);
                        tokio::spawn(async move {
                            handle_client(stream, registry).await;
                            ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let _ = std::fs::remove_file(socket_path);
    info!("Server stopped");
    Ok(())
}

/// Serve one client until it disconnects, times out or misbehaves
async fn handle_client(stream: UnixStream, registry: Arc<DeviceRegistry>) {
    let peer = stream
        .peer_cred()
        .map(|c| format!("uid={}, pid={:?}", c.uid(), c.pid()))
        .unwrap_or_else(|_| "unknown peer".to_string());
    debug!("Connection from {}", peer);

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line: Vec<u8> = Vec::with_capacity(1024);
    let mut request_count: u64 = 0;
    let connection_start = Instant::now();

    loop {
        let read_result = timeout(
            READ_TIMEOUT,
            read_line_bounded(&mut reader, &mut line, MAX_MESSAGE_SIZE),
        )
        .await;

        match read_result {
            Ok(Ok(0)) => {
                debug!(
                    "Client disconnected: {}, requests={}, duration={:?}",
                    peer,
                    request_count,
                    connection_start.elapsed()
                );
                break;
            }
            Ok(Ok(n)) => {
                request_count += 1;
                trace!("Request #{} from {}: {} bytes", request_count, peer, n);

                let response_envelope = match std::str::from_utf8(&line) {
                    Ok(text) => process_request(text, &registry),
                    Err(e) => {
                        debug!("Non-UTF8 request from {}: {}", peer, e);
                        let envelope =
                            ResponseEnvelope::new(0, Response::error("Invalid request encoding"));
                        let _ = send_response(&mut writer, &envelope).await;
                        break;
                    }
                };

                if send_response(&mut writer, &response_envelope).await.is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    warn!("Message too large (>{} bytes) from {}", MAX_MESSAGE_SIZE, peer);
                    let envelope = ResponseEnvelope::new(0, Response::error("Message too large"));
                    let _ = send_response(&mut writer, &envelope).await;
                } else {
                    error!("Read error from {}: {}", peer, e);
                }
                break;
            }
            Err(_) => {
                debug!("Read timeout for {}", peer);
                break;
            }
        }
    }
}

/// Send response with timeout
async fn send_response<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut W,
    response_envelope: &ResponseEnvelope,
) -> Result<(), ()> {
    let response_json = serde_json::to_string(response_envelope).unwrap_or_else(|_| {
        r#"{"id":0,"status":"error","message":"Serialization error"}"#.to_string()
    });

    let write_result = timeout(WRITE_TIMEOUT, async {
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        Ok::<_, std::io::Error>(())
    })
    .await;

    match write_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Write error: {}", e);
            Err(())
        }
        Err(_) => {
            error!("Write timeout");
            Err(())
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Parse, validate and answer one request line
fn process_request(line: &str, registry: &DeviceRegistry) -> ResponseEnvelope {
    let envelope: RequestEnvelope = match serde_json::from_str(line.trim()) {
        Ok(e) => e,
        Err(e) => {
            debug!("Invalid JSON: {}", e);
            return ResponseEnvelope::new(0, Response::error("Invalid request format"));
        }
    };

    let request_id = envelope.id;
    let request = envelope.request;

    if let Err(e) = request.validate() {
        warn!("Request validation failed: {}", e);
        return ResponseEnvelope::new(request_id, Response::error(e));
    }

    debug!("Processing {} (id={})", request.type_name(), request_id);
    let response = dispatch(request, registry, Instant::now());
    ResponseEnvelope::new(request_id, response)
}

/// Answer a validated request as of `now`
fn dispatch(request: Request, registry: &DeviceRegistry, now: Instant) -> Response {
    let result = match request {
        Request::Ping => Ok(ResponseData::string("pong".to_string())),
        Request::Version => Ok(ResponseData::string(env!("CARGO_PKG_VERSION").to_string())),
        Request::ListDevices => Ok(ResponseData::device_list(list_devices(registry, now))),
        Request::ReadSensor { device, kind, channel } => {
            read_sensor(registry, device.as_deref(), &kind, channel, now)
        }
        Request::ReadLabel { device, kind, channel } => {
            read_label(registry, device.as_deref(), &kind, channel)
        }
        Request::ReadAll { device } => read_all(registry, device.as_deref(), now),
        Request::GetDiagnostics { device } => get_diagnostics(registry, device.as_deref()),
    };

    match result {
        Ok(data) => Response::Ok(data),
        Err(e) => Response::error(e.to_string()),
    }
}

fn list_devices(registry: &DeviceRegistry, now: Instant) -> Vec<DeviceSummary> {
    registry
        .list()
        .iter()
        .map(|device| {
            let counts = device.stats();
            DeviceSummary {
                name: device.name().to_string(),
                dev_path: device
                    .hid()
                    .map(|h| h.dev_path.display().to_string())
                    .unwrap_or_default(),
                model: device.hid().map(|h| h.model()).unwrap_or("unknown").to_string(),
                chip: device.chip_name().to_string(),
                fresh: device.store().is_fresh_at(now),
                reports_accepted: counts.accepted,
                reports_ignored: counts.ignored(),
                reports_dropped: counts.dropped,
            }
        })
        .collect()
}

fn read_sensor(
    registry: &DeviceRegistry,
    device: Option<&str>,
    kind: &str,
    channel: usize,
    now: Instant,
) -> Result<ResponseData, QuadroError> {
    let device = registry.resolve(device)?;
    let channel = SensorChannel::parse(kind, channel)?;
    let value = device.read_at(channel.kind(), channel.index(), now)?;
    Ok(ResponseData::sensor(reading(&device, channel, Some(value))))
}

fn read_label(
    registry: &DeviceRegistry,
    device: Option<&str>,
    kind: &str,
    channel: usize,
) -> Result<ResponseData, QuadroError> {
    let device = registry.resolve(device)?;
    let channel = SensorChannel::parse(kind, channel)?;
    Ok(ResponseData::string(
        device.label(channel.kind(), channel.index()).to_string(),
    ))
}

fn read_all(
    registry: &DeviceRegistry,
    device: Option<&str>,
    now: Instant,
) -> Result<ResponseData, QuadroError> {
    let device = registry.resolve(device)?;
    let readings = device
        .read_all_at(now)
        .into_iter()
        .map(|r| SensorReading {
            kind: r.kind.as_str().to_string(),
            channel: r.channel,
            label: r.label.to_string(),
            stale: r.value.is_none(),
            value: r.value,
            mode: r.mode,
        })
        .collect();
    Ok(ResponseData::sensor_table(SensorTable {
        device: device.name().to_string(),
        chip: device.chip_name().to_string(),
        readings,
    }))
}

fn get_diagnostics(
    registry: &DeviceRegistry,
    device: Option<&str>,
) -> Result<ResponseData, QuadroError> {
    let device = registry.resolve(device)?;
    Ok(ResponseData::diag(DiagnosticsInfo {
        device: device.name().to_string(),
        scope: device.diagnostics_scope(),
        serial_number: device.serial_number(),
        firmware_version: device.firmware_version(),
        power_cycles: device.power_cycles(),
    }))
}

fn reading(device: &QuadroDevice, channel: SensorChannel, value: Option<i64>) -> SensorReading {
    SensorReading {
        kind: channel.kind().as_str().to_string(),
        channel: channel.index(),
        label: device.label(channel.kind(), channel.index()).to_string(),
        value,
        stale: value.is_none(),
        mode: device.mode(channel.kind(), channel.index()),
    }
}
