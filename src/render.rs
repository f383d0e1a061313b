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

//! Text and JSON rendering of daemon responses

use serde::Serialize;

use qm_core::display::NOT_AVAILABLE;
use qm_core::{format_channel, unit, SensorKind};
use qm_protocol::{DeviceSummary, DiagnosticsInfo, SensorReading, SensorTable};

/// Width of the label column, lm-sensors style
const LABEL_WIDTH: usize = 18;

/// Human-readable value of one reading, `N/A` when stale
pub fn display_value(reading: &SensorReading) -> String {
    let value = if reading.stale { None } else { reading.value };
    match reading.kind.parse::<SensorKind>() {
        Ok(kind) => format_channel(kind, reading.channel, value),
        // Kinds this client does not know are shown unformatted
        Err(_) => value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
    }
}

/// Unit suffix of one reading; empty for the flow channel and unknown kinds
fn channel_unit(reading: &SensorReading) -> &'static str {
    reading
        .kind
        .parse::<SensorKind>()
        .map_or("", |kind| unit(kind, reading.channel))
}

/// `sensors`-like block for one device
pub fn render_table(table: &SensorTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}-{}\n", table.chip, table.device));
    out.push_str("Adapter: HID adapter\n");
    for reading in &table.readings {
        let label = format!("{}:", reading.label);
        out.push_str(&format!(
            "{:<width$}{}\n",
            label,
            display_value(reading),
            width = LABEL_WIDTH
        ));
    }
    out
}

#[derive(Serialize)]
struct JsonTable<'a> {
    device: &'a str,
    chip: &'a str,
    readings: Vec<JsonReading<'a>>,
}

#[derive(Serialize)]
struct JsonReading<'a> {
    kind: &'a str,
    channel: usize,
    label: &'a str,
    /// Normalized integer value, `null` when stale
    value: Option<i64>,
    unit: &'a str,
    text: String,
}

/// Machine-readable table for `--json`
pub fn render_json(table: &SensorTable) -> serde_json::Result<String> {
    let readings = table
        .readings
        .iter()
        .map(|r| JsonReading {
            kind: &r.kind,
            channel: r.channel,
            label: &r.label,
            value: if r.stale { None } else { r.value },
            unit: channel_unit(r),
            text: display_value(r),
        })
        .collect();

    serde_json::to_string_pretty(&JsonTable {
        device: &table.device,
        chip: &table.chip,
        readings,
    })
}

pub fn render_info(info: &DiagnosticsInfo) -> String {
    let rows = [
        ("Device", info.device.as_str()),
        ("Scope", info.scope.as_str()),
        ("Serial number", info.serial_number.as_str()),
        ("Firmware version", info.firmware_version.as_str()),
        ("Power cycles", info.power_cycles.as_str()),
    ];
    rows.iter()
        .map(|(name, value)| format!("{:<18}{}\n", format!("{}:", name), value))
        .collect()
}

pub fn render_devices(devices: &[DeviceSummary]) -> String {
    if devices.is_empty() {
        return "No Quadro attached\n".to_string();
    }

    let mut out = format!(
        "{:<10} {:<16} {:<24} {:<6} {:>9} {:>8} {:>8}\n",
        "DEVICE", "NODE", "MODEL", "STATE", "ACCEPTED", "IGNORED", "DROPPED"
    );
    for d in devices {
        out.push_str(&format!(
            "{:<10} {:<16} {:<24} {:<6} {:>9} {:>8} {:>8}\n",
            d.name,
            d.dev_path,
            d.model,
            if d.fresh { "fresh" } else { "stale" },
            d.reports_accepted,
            d.reports_ignored,
            d.reports_dropped
        ));
    }
    out
}
