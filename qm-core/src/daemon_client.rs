//! Daemon Client
//!
//! Talks to quadromond over its Unix socket. One JSON line per request,
//! one JSON line per response, correlated by request ID.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use qm_protocol::{
    DeviceSummary, DiagnosticsInfo, Request, RequestEnvelope, Response, ResponseData,
    ResponseEnvelope, SensorReading, SensorTable, MAX_MESSAGE_SIZE,
};

use crate::constants::client;
use crate::data::SensorChannel;
use crate::error::{QuadroError, Result};

/// Connection to the daemon
pub struct DaemonClient {
    socket_path: PathBuf,
    writer: UnixStream,
    reader: BufReader<UnixStream>,
    /// Set when the stream may be out of step with the daemon; the next
    /// request opens a new connection.
    poisoned: bool,
}

impl DaemonClient {
    pub fn connect(socket_path: &Path) -> Result<Self> {
        let (writer, reader) = open_stream(socket_path)?;
        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            writer,
            reader,
            poisoned: false,
        })
    }

    fn reconnect(&mut self) -> Result<()> {
        debug!("Reconnecting to {:?}", self.socket_path);
        let (writer, reader) = open_stream(&self.socket_path)?;
        self.writer = writer;
        self.reader = reader;
        self.poisoned = false;
        Ok(())
    }

    /// Send a request and return the raw response
    pub fn request(&mut self, req: Request) -> Result<Response> {
        req.validate()
            .map_err(|e| QuadroError::IpcProtocol(format!("Request validation failed: {}", e)))?;

        if self.poisoned {
            self.reconnect()?;
        }

        let result = self.exchange(RequestEnvelope::new(req));
        if matches!(
            result,
            Err(QuadroError::Timeout(_)
                | QuadroError::IpcProtocol(_)
                | QuadroError::MessageTooLarge { .. }
                | QuadroError::DaemonConnection(_))
        ) {
            self.poisoned = true;
        }
        result
    }

    /// Write one request line and read its reply
    fn exchange(&mut self, envelope: RequestEnvelope) -> Result<Response> {
        let request_id = envelope.id;
        let mut json = serde_json::to_vec(&envelope)?;
        json.push(b'\n');
        if json.len() > MAX_MESSAGE_SIZE {
            return Err(QuadroError::MessageTooLarge {
                size: json.len(),
                max_size: MAX_MESSAGE_SIZE,
            });
        }

        self.writer.write_all(&json).map_err(map_io_timeout)?;
        trace!(id = request_id, cmd = envelope.request.type_name(), "Sent request");

        let mut buf = Vec::with_capacity(client::INITIAL_BUFFER_SIZE);
        (&mut self.reader)
            .take(MAX_MESSAGE_SIZE as u64 + 1)
            .read_until(b'\n', &mut buf)
            .map_err(map_io_timeout)?;

        if buf.is_empty() {
            return Err(QuadroError::DaemonConnection(
                "Daemon closed connection".to_string(),
            ));
        }
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(QuadroError::MessageTooLarge {
                size: buf.len(),
                max_size: MAX_MESSAGE_SIZE,
            });
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }

        let response: ResponseEnvelope = serde_json::from_slice(&buf)
            .map_err(|e| QuadroError::IpcProtocol(format!("Failed to parse response: {}", e)))?;
        if response.id != request_id {
            return Err(QuadroError::IpcProtocol(format!(
                "Response ID mismatch: expected {}, got {}",
                request_id, response.id
            )));
        }
        Ok(response.response)
    }

    /// Send a request and unwrap the `ok` payload
    fn request_data(&mut self, req: Request) -> Result<ResponseData> {
        match self.request(req)? {
            Response::Ok(data) => Ok(data),
            Response::Error { message } => Err(response_error(message)),
        }
    }

    pub fn ping(&mut self) -> Result<String> {
        let data = self.request_data(Request::Ping)?;
        expect_field(data.value, "value")
    }

    pub fn version(&mut self) -> Result<String> {
        let data = self.request_data(Request::Version)?;
        expect_field(data.value, "value")
    }

    pub fn list_devices(&mut self) -> Result<Vec<DeviceSummary>> {
        let data = self.request_data(Request::ListDevices)?;
        expect_field(data.devices, "devices")
    }

    /// Read one channel. A stale channel is returned as `NoData`.
    pub fn read_sensor(
        &mut self,
        device: Option<&str>,
        channel: SensorChannel,
    ) -> Result<SensorReading> {
        let data = self.request_data(Request::ReadSensor {
            device: device.map(str::to_string),
            kind: channel.kind().as_str().to_string(),
            channel: channel.index(),
        })?;
        expect_field(data.reading, "reading")
    }

    pub fn read_label(&mut self, device: Option<&str>, channel: SensorChannel) -> Result<String> {
        let data = self.request_data(Request::ReadLabel {
            device: device.map(str::to_string),
            kind: channel.kind().as_str().to_string(),
            channel: channel.index(),
        })?;
        expect_field(data.value, "value")
    }

    pub fn read_all(&mut self, device: Option<&str>) -> Result<SensorTable> {
        let data = self.request_data(Request::ReadAll {
            device: device.map(str::to_string),
        })?;
        expect_field(data.table, "table")
    }

    pub fn diagnostics(&mut self, device: Option<&str>) -> Result<DiagnosticsInfo> {
        let data = self.request_data(Request::GetDiagnostics {
            device: device.map(str::to_string),
        })?;
        expect_field(data.diagnostics, "diagnostics")
    }
}

/// True if a daemon answers on `socket_path`
pub fn is_daemon_available(socket_path: &Path) -> bool {
    DaemonClient::connect(socket_path)
        .and_then(|mut client| client.ping())
        .is_ok()
}

fn expect_field<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| {
        QuadroError::IpcProtocol(format!("Response is missing field '{}'", name))
    })
}

fn open_stream(socket_path: &Path) -> Result<(UnixStream, BufReader<UnixStream>)> {
    let stream = UnixStream::connect(socket_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
            QuadroError::DaemonNotAvailable
        }
        _ => QuadroError::DaemonConnection(format!(
            "Failed to connect to daemon at {}: {}",
            socket_path.display(),
            e
        )),
    })?;

    stream.set_read_timeout(Some(client::TIMEOUT))?;
    stream.set_write_timeout(Some(client::TIMEOUT))?;
    let reader_stream = stream.try_clone()?;
    Ok((stream, BufReader::new(reader_stream)))
}

/// Map a daemon error message back to a typed error where one exists
fn response_error(message: String) -> QuadroError {
    if message == QuadroError::NoData.to_string() {
        QuadroError::NoData
    } else {
        QuadroError::DaemonResponse(message)
    }
}

fn map_io_timeout(e: std::io::Error) -> QuadroError {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
            QuadroError::Timeout("daemon did not respond".to_string())
        }
        _ => QuadroError::DaemonConnection(e.to_string()),
    }
}
