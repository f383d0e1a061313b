//! Raw report sources
//!
//! A [`ReportSource`] yields one raw HID report per call. Each read on a
//! hidraw node returns exactly one report, report ID first.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};

use crate::constants::report::READ_BUFFER_SIZE;
use crate::error::{QuadroError, Result};
use crate::report::RawReport;

/// Blocking producer of raw reports
#[cfg_attr(test, mockall::automock)]
pub trait ReportSource: Send {
    /// Read one report into `buf`, returning its length
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// `/dev/hidrawN` opened read-only
#[derive(Debug)]
pub struct HidrawSource {
    path: PathBuf,
    file: File,
}

impl HidrawSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| QuadroError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!("Opened {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl ReportSource for HidrawSource {
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.file.read(buf) {
                // hidraw returns 0 only after the device went away
                Ok(0) => {
                    return Err(QuadroError::DeviceDisconnected(
                        self.path.display().to_string(),
                    ))
                }
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Read reports until the source fails or `sink` returns `false`.
///
/// Returns the number of reports delivered when stopped by the sink.
pub fn pump_reports<S, F>(source: &mut S, mut sink: F) -> Result<u64>
where
    S: ReportSource + ?Sized,
    F: FnMut(RawReport) -> bool,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut delivered = 0u64;
    loop {
        let n = source.read_report(&mut buf)?;
        trace!(len = n, "Raw report read");
        delivered += 1;
        if !sink(RawReport::new(buf[..n].to_vec(), Instant::now())) {
            return Ok(delivered);
        }
    }
}
