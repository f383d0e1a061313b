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

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use qm_protocol::validate_device_name;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const COMMANDS: &[&str] = &["sensors", "devices", "info", "decode", "watch", "help", "version"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sensors { device: Option<String>, json: bool },
    Devices,
    Info { device: Option<String> },
    Decode { input: PathBuf, json: bool },
    Watch { device: Option<String> },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    /// `--socket`, if given
    pub socket: Option<PathBuf>,
    pub command: Command,
}

pub fn usage() -> String {
    format!(
        "quadromon {VERSION} - Aquacomputer Quadro sensor monitor

USAGE:
    quadromon [--socket PATH] <COMMAND>

COMMANDS:
    sensors [--device NAME] [--json]   Print all sensors (default)
    devices                            List attached devices
    info [--device NAME]               Serial number, firmware, power cycles
    decode FILE|- [--json]             Decode a captured raw report (binary or hex)
    watch [--device NAME]              Live view, q or Esc to quit
    help                               Print this help
    version                            Print version

OPTIONS:
    -s, --socket PATH   Daemon socket (default: $QUADROMON_SOCKET, then config)
    -d, --device NAME   hidraw node, e.g. hidraw3; needed with several devices
"
    )
}

/// Parse the full argv (program name first)
pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut socket = None;
    let mut device = None;
    let mut json = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-s" | "--socket" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} requires a path", arg))?;
                socket = Some(PathBuf::from(value));
            }
            "-d" | "--device" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} requires a name", arg))?;
                validate_device_name(value).map_err(|e| anyhow!(e))?;
                device = Some(value.clone());
            }
            "--json" => json = true,
            "-h" | "--help" => positional.insert(0, "help"),
            "-V" | "--version" => positional.insert(0, "version"),
            // `-` alone is stdin for `decode`
            other if other.starts_with('-') && other != "-" => bail!("Unknown option: {}", other),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] | ["sensors"] => Command::Sensors { device, json },
        ["help", ..] => Command::Help,
        ["version", ..] => Command::Version,
        ["devices"] => Command::Devices,
        ["info"] => Command::Info { device },
        ["watch"] => Command::Watch { device },
        ["decode", input] => Command::Decode {
            input: PathBuf::from(input),
            json,
        },
        ["decode"] => bail!("decode requires a FILE argument (or - for stdin)"),
        [cmd, extra, ..] if COMMANDS.contains(cmd) => {
            bail!("Unexpected argument for {}: {}", cmd, extra)
        }
        [cmd, ..] => bail!("Unknown command: {}", cmd),
    };

    Ok(Cli { socket, command })
}
