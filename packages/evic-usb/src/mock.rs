//! In-memory stand-ins for a device.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Connection, ConnectionError, REPORT_ID, Transport, TransportError};

/// Everything that happened to a mock device, shared by all of its connections.
#[derive(Debug, Default)]
pub(crate) struct DeviceLog {
    pub reports: Vec<Vec<u8>>,
    pub reads: usize,
    pub opened: usize,
    pub closed: usize,
}

impl DeviceLog {
    /// Concatenates the payload of every written report, without report IDs.
    pub fn written(&self) -> Vec<u8> {
        self.reports
            .iter()
            .flat_map(|report| report[1..].iter().copied())
            .collect()
    }
}

/// A connection that records written reports and serves queued bytes as reports.
pub(crate) struct LoopbackConnection {
    input_len: usize,
    output_len: usize,
    pending: VecDeque<u8>,
    pub short_reads: bool,
    pub fail_after_writes: Option<usize>,
    log: Arc<Mutex<DeviceLog>>,
}

impl LoopbackConnection {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Self::with_log(input_len, output_len, Default::default())
    }

    fn with_log(input_len: usize, output_len: usize, log: Arc<Mutex<DeviceLog>>) -> Self {
        Self {
            input_len,
            output_len,
            pending: VecDeque::new(),
            short_reads: false,
            fail_after_writes: None,
            log,
        }
    }

    /// Queues bytes to be served by subsequent reads.
    pub fn respond(&mut self, data: &[u8]) {
        self.pending.extend(data);
    }

    /// Queues everything written so far to be read back.
    pub fn loop_back(&mut self) {
        let written = self.log().written();
        self.pending.extend(written);
    }

    pub fn reports(&self) -> Vec<Vec<u8>> {
        self.log().reports.clone()
    }

    pub fn reads(&self) -> usize {
        self.log().reads
    }

    fn log(&self) -> MutexGuard<'_, DeviceLog> {
        self.log.lock().unwrap()
    }
}

impl Connection for LoopbackConnection {
    fn max_input_report_len(&self) -> usize {
        self.input_len
    }

    fn max_output_report_len(&self) -> usize {
        self.output_len
    }

    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        assert!(report.len() <= self.input_len, "report exceeds input length");
        assert_eq!(report[0], REPORT_ID);

        let mut log = self.log();
        if self.fail_after_writes == Some(log.reports.len()) {
            return Err(TransportError::ShortWrite {
                expected: report.len(),
                written: 0,
            });
        }
        log.reports.push(report.to_vec());
        Ok(())
    }

    fn read_report(&mut self, report: &mut [u8]) -> Result<usize, TransportError> {
        if self.pending.is_empty() {
            return Err(TransportError::Timeout);
        }
        self.log().reads += 1;

        report.fill(0);
        report[0] = REPORT_ID;
        for byte in &mut report[1..] {
            match self.pending.pop_front() {
                Some(value) => *byte = value,
                None => break,
            }
        }

        if self.short_reads {
            Ok(report.len() / 2)
        } else {
            Ok(report.len())
        }
    }
}

impl Drop for LoopbackConnection {
    fn drop(&mut self) {
        self.log().closed += 1;
    }
}

/// A transport whose connections share one [`DeviceLog`].
pub(crate) struct MockTransport {
    pub present: bool,
    pub input_len: usize,
    pub output_len: usize,
    pub response: Vec<u8>,
    pub fail_after_writes: Option<usize>,
    pub log: Arc<Mutex<DeviceLog>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            present: true,
            input_len: 65,
            output_len: 65,
            response: Vec::new(),
            fail_after_writes: None,
            log: Default::default(),
        }
    }

    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn log(&self) -> MutexGuard<'_, DeviceLog> {
        self.log.lock().unwrap()
    }
}

impl Transport for MockTransport {
    type Connection = LoopbackConnection;

    fn is_device_connected(&self) -> bool {
        self.present
    }

    fn open(&self) -> Result<LoopbackConnection, ConnectionError> {
        if !self.present {
            return Err(ConnectionError::DeviceAbsent);
        }
        self.log().opened += 1;

        let mut connection =
            LoopbackConnection::with_log(self.input_len, self.output_len, self.log.clone());
        connection.respond(&self.response);
        connection.fail_after_writes = self.fail_after_writes;
        Ok(connection)
    }
}
