//! Crate for reading and writing the configuration, firmware and boot logo of eVic devices over USB HID.
//!
//! This crate is structured around two traits: [`Transport`] finds and opens a device, and
//! [`Connection`] moves bytes over an open device in HID reports. Device operations are
//! expressed as [`Command`](commands::Command)s which are executed on a connection, usually
//! through [`commands::run`], which opens a fresh connection for every command.

pub use evic_protocol as protocol;

use log::trace;
use thiserror::Error;

use evic_protocol::{DataflashSizeError, Encode, LogoBlockSizeError};

pub mod commands;
pub mod report_descriptor;

#[cfg(feature = "hid")]
pub mod hid;
#[cfg(feature = "monitor")]
pub mod monitor;

#[cfg(test)]
pub(crate) mod mock;

use crate::commands::Command;

/// Report ID prefixed to every outgoing report.
pub const REPORT_ID: u8 = 0;

/// Receives transfer progress as a percentage from 0 to 100.
pub type ProgressCallback<'a> = Box<dyn FnMut(u8) + 'a>;

/// Represents an open connection to a device.
///
/// Implementors only move single reports. Payloads of any length are split
/// into reports by [`Connection::write_chunked`] and reassembled by
/// [`Connection::read_chunked`].
///
/// The protocol is half-duplex: a connection must only carry one command at a time.
pub trait Connection {
    /// Size of an outgoing report, including its leading report ID byte.
    ///
    /// This is the maximum input report length furnished by the device when the connection was opened.
    fn max_input_report_len(&self) -> usize;

    /// Size of an incoming report, including its leading report ID byte.
    ///
    /// This is the maximum output report length furnished by the device when the connection was opened.
    fn max_output_report_len(&self) -> usize;

    /// Writes a single report. The first byte of `report` is the report ID.
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError>;

    /// Reads a single report into `report`, returning the number of bytes read.
    ///
    /// The first byte of a report is its report ID.
    fn read_report(&mut self, report: &mut [u8]) -> Result<usize, TransportError>;

    /// Sends a packet.
    fn send(&mut self, packet: impl Encode) -> Result<(), ConnectionError> {
        let encoded = packet.to_bytes();
        trace!("sent packet: {:x?}", encoded);

        self.write_chunked(&encoded, None)
    }

    /// Writes `data` in as many reports as needed.
    ///
    /// Each report carries [`REPORT_ID`] followed by up to
    /// `max_input_report_len() - 1` bytes of `data`. The final report is not padded.
    fn write_chunked(
        &mut self,
        data: &[u8],
        mut progress_callback: Option<&mut (dyn FnMut(u8) + '_)>,
    ) -> Result<(), ConnectionError> {
        let chunk_size = payload_len(self.max_input_report_len())?;

        let mut report = Vec::with_capacity(chunk_size + 1);
        let mut sent = 0;

        for chunk in data.chunks(chunk_size) {
            report.clear();
            report.push(REPORT_ID);
            report.extend_from_slice(chunk);

            self.write_report(&report)?;
            sent += chunk.len();

            if let Some(callback) = &mut progress_callback {
                callback(percent(sent, data.len()));
            }
        }

        if data.is_empty() {
            if let Some(callback) = &mut progress_callback {
                callback(100);
            }
        }

        Ok(())
    }

    /// Reads exactly `len` bytes spread over as many reports as needed.
    ///
    /// Every report is `max_output_report_len()` bytes long and its first
    /// byte, the report ID, is discarded. Bytes of the last report past `len`
    /// are dropped.
    fn read_chunked(
        &mut self,
        len: usize,
        mut progress_callback: Option<&mut (dyn FnMut(u8) + '_)>,
    ) -> Result<Vec<u8>, ConnectionError> {
        let report_len = self.max_output_report_len();
        let chunk_size = payload_len(report_len)?;

        let mut data = vec![0; len];
        let mut report = vec![0; report_len];
        let mut received = 0;

        while received < len {
            let read = self.read_report(&mut report)?;
            if read != report_len {
                return Err(TransportError::ShortRead {
                    expected: report_len,
                    found: read,
                }
                .into());
            }

            let take = chunk_size.min(len - received);
            data[received..received + take].copy_from_slice(&report[1..1 + take]);
            received += take;

            if let Some(callback) = &mut progress_callback {
                callback(percent(received, len));
            }
        }

        if len == 0 {
            if let Some(callback) = &mut progress_callback {
                callback(100);
            }
        }

        Ok(data)
    }

    /// Executes a [`Command`].
    fn execute_command<C: Command>(&mut self, command: C) -> Result<C::Output, ConnectionError> {
        command.execute(self)
    }
}

/// Finds and opens devices.
pub trait Transport {
    type Connection: Connection;

    /// Returns whether a matching device is currently present.
    ///
    /// This never blocks on device I/O and never fails; errors are reported as absence.
    fn is_device_connected(&self) -> bool;

    /// Opens a connection to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::DeviceAbsent`] if no matching device is present.
    fn open(&self) -> Result<Self::Connection, ConnectionError>;
}

fn payload_len(report_len: usize) -> Result<usize, TransportError> {
    match report_len.checked_sub(1) {
        Some(len) if len > 0 => Ok(len),
        _ => Err(TransportError::InvalidReportLength(report_len)),
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done as u64 * 100 / total as u64) as u8
}

/// Errors surfaced by device operations.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("No matching device is connected")]
    DeviceAbsent,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    BufferSizeMismatch(#[from] DataflashSizeError),
}

/// A caller-supplied buffer violates a protocol constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    LogoBlock(#[from] LogoBlockSizeError),

    #[error("Firmware image is empty")]
    EmptyFirmware,

    #[error("Firmware image is {0} bytes, which does not fit in a 32-bit length")]
    FirmwareTooLarge(usize),
}

/// Reading from or writing to the device failed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[cfg(feature = "hid")]
    #[error("HID Error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("Expected a {expected}-byte report, received {found} bytes")]
    ShortRead { expected: usize, found: usize },

    #[error("Only {written} of {expected} report bytes were written")]
    ShortWrite { expected: usize, written: usize },

    #[error("Report timeout")]
    Timeout,

    #[error("Device reported an unusable report length of {0} bytes")]
    InvalidReportLength(usize),

    #[error(transparent)]
    ReportDescriptor(#[from] report_descriptor::ReportDescriptorError),
}
