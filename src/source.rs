/*
 * This file is part of Quadromon.
 *
 * Copyright (C) 2025 Quadromon contributors
 *
 * Quadromon is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Quadromon is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Quadromon. If not, see <https://www.gnu.org/licenses/>.
 */

//! Where the CLI gets its readings from

use std::path::Path;

use qm_core::{DaemonClient, Result};
use qm_protocol::{DeviceSummary, DiagnosticsInfo, SensorTable};

/// Sensor data for one device, as seen by the CLI and the watch TUI
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource {
    /// Every channel of the selected device
    fn table(&mut self) -> Result<SensorTable>;

    /// Identity values of the selected device
    fn diagnostics(&mut self) -> Result<DiagnosticsInfo>;

    /// All attached devices
    fn devices(&mut self) -> Result<Vec<DeviceSummary>>;
}

/// Reads through a running quadromond
pub struct DaemonSource {
    client: DaemonClient,
    device: Option<String>,
}

impl DaemonSource {
    /// Connect to the daemon; `device` may be omitted when only one is attached
    pub fn connect(socket_path: &Path, device: Option<String>) -> Result<Self> {
        Ok(Self {
            client: DaemonClient::connect(socket_path)?,
            device,
        })
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

impl SensorSource for DaemonSource {
    fn table(&mut self) -> Result<SensorTable> {
        self.client.read_all(self.device.as_deref())
    }

    fn diagnostics(&mut self) -> Result<DiagnosticsInfo> {
        self.client.diagnostics(self.device.as_deref())
    }

    fn devices(&mut self) -> Result<Vec<DeviceSummary>> {
        self.client.list_devices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qm_core::QuadroError;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;
    use tempfile::TempDir;

    #[test]
    fn test_connect_without_daemon() {
        let dir = TempDir::new().unwrap();
        let result = DaemonSource::connect(&dir.path().join("missing.sock"), None);
        assert!(matches!(result, Err(QuadroError::DaemonNotAvailable)));
    }

    #[test]
    fn test_daemon_source_forwards_device_name() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("quadromon.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let request: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["cmd"], "ReadAll");
            assert_eq!(request["data"]["device"], "hidraw2");

            let response = serde_json::json!({
                "id": request["id"],
                "status": "ok",
                "table": { "device": "hidraw2", "chip": "quadro", "readings": [] },
            });
            let mut stream = stream;
            writeln!(stream, "{}", response).unwrap();
        });

        let mut source = DaemonSource::connect(&socket, Some("hidraw2".into())).unwrap();
        assert_eq!(source.device(), Some("hidraw2"));
        let table = source.table().unwrap();
        assert_eq!(table.device, "hidraw2");
        assert!(table.readings.is_empty());
        server.join().unwrap();
    }
}
