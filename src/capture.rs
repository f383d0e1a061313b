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

//! Offline decoding of captured status reports
//!
//! A capture is either the raw report bytes (e.g. `cat /dev/hidraw3 | head -c 161`)
//! or the same bytes as hex text (`xxd -p`, `od`-style spaced pairs, `0x` prefixed
//! lists). The first byte is always the report ID.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use thiserror::Error;

use qm_core::constants::{device::CHIP_NAME, device::DRIVER_NAME, limits::MAX_CAPTURE_SIZE};
use qm_core::{channel_table, decode, inspect, DecodeOutcome, SensorSnapshot};
use qm_protocol::{DiagnosticsInfo, SensorReading, SensorTable};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Capture too large: more than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Not a status report: {0}")]
    Rejected(DecodeOutcome),
}

/// Read a capture from a file, or from stdin when `path` is `-`
pub fn load_capture(path: &Path) -> Result<Vec<u8>, CaptureError> {
    if path == Path::new("-") {
        read_capture(io::stdin().lock())
    } else {
        read_capture(File::open(path)?)
    }
}

/// Read at most `MAX_CAPTURE_SIZE` bytes and convert hex text to bytes
pub fn read_capture<R: Read>(reader: R) -> Result<Vec<u8>, CaptureError> {
    let mut data = Vec::new();
    reader.take(MAX_CAPTURE_SIZE + 1).read_to_end(&mut data)?;
    if data.len() as u64 > MAX_CAPTURE_SIZE {
        return Err(CaptureError::TooLarge { limit: MAX_CAPTURE_SIZE });
    }

    if is_hex_text(&data) {
        parse_hex(&String::from_utf8_lossy(&data))
    } else {
        Ok(data)
    }
}

// A binary status report starts with 0x01, which never appears in hex text
fn is_hex_text(data: &[u8]) -> bool {
    !data.is_empty()
        && data.iter().any(u8::is_ascii_hexdigit)
        && data.iter().all(|b| {
            b.is_ascii_hexdigit()
                || b.is_ascii_whitespace()
                || matches!(*b, b',' | b':' | b'x' | b'X')
        })
}

/// Parse whitespace, comma or colon separated hex. Each token holds one or
/// more whole bytes and may carry a `0x` prefix.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    for token in text.split(|c: char| c.is_ascii_whitespace() || c == ',' || c == ':') {
        if token.is_empty() {
            continue;
        }
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(CaptureError::InvalidHex(format!(
                "token {:?} is not a whole number of bytes",
                token
            )));
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair)
                .map_err(|_| CaptureError::InvalidHex(format!("token {:?}", token)))?;
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| CaptureError::InvalidHex(format!("token {:?}", token)))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

/// Decode a capture, reporting why it was rejected
pub fn decode_capture(raw: &[u8]) -> Result<SensorSnapshot, CaptureError> {
    let outcome = inspect(raw);
    decode(raw).ok_or(CaptureError::Rejected(outcome))
}

/// Full sensor table of a decoded capture; nothing is stale
pub fn snapshot_table(name: &str, snapshot: &SensorSnapshot) -> SensorTable {
    let readings = channel_table()
        .map(|info| SensorReading {
            kind: info.kind.as_str().to_string(),
            channel: info.channel,
            label: info.label.to_string(),
            value: Some(snapshot.value(info.kind, info.channel)),
            stale: false,
            mode: info.mode,
        })
        .collect();

    SensorTable {
        device: name.to_string(),
        chip: CHIP_NAME.to_string(),
        readings,
    }
}

pub fn snapshot_info(name: &str, snapshot: &SensorSnapshot) -> DiagnosticsInfo {
    let identity = snapshot.identity;
    DiagnosticsInfo {
        device: name.to_string(),
        scope: format!("{}-{}", DRIVER_NAME, name),
        serial_number: identity.serial_number_string(),
        firmware_version: identity.firmware_version.to_string(),
        power_cycles: identity.power_cycles.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qm_core::constants::{offsets, report::STATUS_REPORT_ID};
    use qm_core::REPORT_MIN_LEN;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn report() -> Vec<u8> {
        let mut buf = vec![0u8; REPORT_MIN_LEN];
        buf[0] = STATUS_REPORT_ID;
        buf[offsets::TEMP2..offsets::TEMP2 + 2].copy_from_slice(&2512u16.to_be_bytes());
        buf[offsets::FLOW_SPEED..offsets::FLOW_SPEED + 2].copy_from_slice(&1234u16.to_be_bytes());
        buf[offsets::FIRMWARE_VERSION..offsets::FIRMWARE_VERSION + 2]
            .copy_from_slice(&1017u16.to_be_bytes());
        buf
    }

    fn to_hex(bytes: &[u8], sep: &str) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(sep)
    }

    #[test]
    fn test_binary_capture_passes_through() {
        let raw = report();
        assert_eq!(read_capture(&raw[..]).unwrap(), raw);
    }

    #[test]
    fn test_hex_capture_formats() {
        let raw = report();

        let spaced = to_hex(&raw, " ");
        assert_eq!(read_capture(spaced.as_bytes()).unwrap(), raw);

        // xxd -p wraps at 30 bytes per line
        let mut wrapped = String::new();
        for chunk in raw.chunks(30) {
            wrapped.push_str(&to_hex(chunk, ""));
            wrapped.push('\n');
        }
        assert_eq!(read_capture(wrapped.as_bytes()).unwrap(), raw);

        let prefixed: Vec<String> = raw.iter().map(|b| format!("0x{:02X}", b)).collect();
        assert_eq!(read_capture(prefixed.join(", ").as_bytes()).unwrap(), raw);
    }

    #[test]
    fn test_odd_hex_token_rejected() {
        assert!(matches!(parse_hex("01 0"), Err(CaptureError::InvalidHex(_))));
        assert!(matches!(parse_hex("0x"), Err(CaptureError::InvalidHex(_))));
    }

    #[test]
    fn test_oversized_capture_rejected() {
        let big = vec![STATUS_REPORT_ID; MAX_CAPTURE_SIZE as usize + 1];
        assert!(matches!(read_capture(&big[..]), Err(CaptureError::TooLarge { .. })));
    }

    #[test]
    fn test_decode_capture() {
        let snapshot = decode_capture(&report()).unwrap();
        assert_eq!(snapshot.temperatures[1], 25_120);
        assert_eq!(snapshot.speeds[0], 123);
        assert_eq!(snapshot.identity.firmware_version, 1017);

        assert!(matches!(
            decode_capture(&report()[..100]),
            Err(CaptureError::Rejected(DecodeOutcome::Truncated(100)))
        ));

        let mut foreign = report();
        foreign[0] = 0x03;
        assert!(matches!(
            decode_capture(&foreign),
            Err(CaptureError::Rejected(DecodeOutcome::ForeignReport(0x03)))
        ));
    }

    #[test]
    fn test_snapshot_table_is_complete() {
        let snapshot = decode_capture(&report()).unwrap();
        let table = snapshot_table("capture", &snapshot);
        assert_eq!(table.readings.len(), 22);
        assert!(table.readings.iter().all(|r| !r.stale && r.value.is_some()));
        assert_eq!(table.readings[1].label, "Temp2");
        assert_eq!(table.readings[1].value, Some(25_120));
        assert_eq!(table.readings[4].label, "Flow speed [l/h]");

        let info = snapshot_info("capture", &snapshot);
        assert_eq!(info.serial_number, "00000-00000");
        assert_eq!(info.firmware_version, "1017");
    }

    #[test]
    fn test_load_capture_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", to_hex(&report(), " ")).unwrap();
        let raw = load_capture(file.path()).unwrap();
        assert!(decode_capture(&raw).is_ok());
    }
}
