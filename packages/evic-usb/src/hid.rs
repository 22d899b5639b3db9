//! Implements discovering, opening, and interacting with eVic devices connected over USB HID.

use log::{debug, trace, warn};
use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hidapi::{DeviceInfo, HidApi};

use crate::{
    Connection, ConnectionError, REPORT_ID, Transport, TransportError,
    report_descriptor::ReportLengths,
};

/// The USB vendor ID of eVic devices
pub const EVIC_USB_VID: u16 = 0x0416;

/// The USB product ID of eVic devices
pub const EVIC_USB_PID: u16 = 0x5020;

/// Largest report descriptor a HID device may return.
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// The information of a matching HID device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HidDeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<&DeviceInfo> for HidDeviceInfo {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            path: info.path().to_string_lossy().into_owned(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            serial_number: info.serial_number().map(str::to_owned),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
        }
    }
}

/// Finds and opens eVic devices through hidapi.
pub struct HidTransport {
    api: Mutex<HidApi>,
    vendor_id: u16,
    product_id: u16,
    timeout: Option<Duration>,
}

impl HidTransport {
    /// Creates a transport matching [`EVIC_USB_VID`] and [`EVIC_USB_PID`].
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            api: Mutex::new(HidApi::new()?),
            vendor_id: EVIC_USB_VID,
            product_id: EVIC_USB_PID,
            timeout: None,
        })
    }

    /// Matches devices with other USB identifiers.
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    /// Fails reads that take longer than `timeout` with [`TransportError::Timeout`].
    ///
    /// Reads block indefinitely by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Finds all connected devices with matching identifiers.
    pub fn find_devices(&self) -> Result<Vec<HidDeviceInfo>, TransportError> {
        let mut api = self.api();
        api.refresh_devices()?;

        Ok(api
            .device_list()
            .filter(|info| self.matches(info))
            .map(HidDeviceInfo::from)
            .collect())
    }

    fn matches(&self, info: &DeviceInfo) -> bool {
        info.vendor_id() == self.vendor_id && info.product_id() == self.product_id
    }

    fn api(&self) -> MutexGuard<'_, HidApi> {
        // The API holds no invariants a panicking probe could break.
        self.api.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for HidTransport {
    type Connection = HidConnection;

    fn is_device_connected(&self) -> bool {
        let mut api = self.api();
        if let Err(e) = api.refresh_devices() {
            warn!("Failed to enumerate HID devices: {}", e);
            return false;
        }

        api.device_list().any(|info| self.matches(info))
    }

    fn open(&self) -> Result<HidConnection, ConnectionError> {
        let mut api = self.api();
        api.refresh_devices().map_err(TransportError::from)?;

        let Some(info) = api.device_list().find(|info| self.matches(info)) else {
            debug!(
                "No device with VID {:#06x} and PID {:#06x} found",
                self.vendor_id, self.product_id
            );
            return Err(ConnectionError::DeviceAbsent);
        };

        let device = info.open_device(&api).map_err(TransportError::from)?;

        HidConnection::open(device, HidDeviceInfo::from(info), self.timeout)
            .map_err(ConnectionError::from)
    }
}

/// An open HID connection to an eVic device.
///
/// The device is closed when the connection is dropped.
pub struct HidConnection {
    device: hidapi::HidDevice,
    info: HidDeviceInfo,
    lengths: ReportLengths,
    timeout: Option<Duration>,
}

impl HidConnection {
    /// Wraps an opened device, reading its report lengths from its report descriptor.
    pub fn open(
        device: hidapi::HidDevice,
        info: HidDeviceInfo,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut descriptor = vec![0; MAX_REPORT_DESCRIPTOR_SIZE];
        let size = device.get_report_descriptor(&mut descriptor)?;
        let lengths = ReportLengths::parse(&descriptor[..size])?;

        debug!(
            "Opened {} with {}-byte input and {}-byte output reports",
            info.path, lengths.input, lengths.output
        );

        for len in [lengths.input, lengths.output] {
            if len < 2 {
                return Err(TransportError::InvalidReportLength(len));
            }
        }

        Ok(Self {
            device,
            info,
            lengths,
            timeout,
        })
    }

    pub fn info(&self) -> &HidDeviceInfo {
        &self.info
    }

    pub fn report_lengths(&self) -> ReportLengths {
        self.lengths
    }

    fn timeout_ms(&self) -> i32 {
        self.timeout
            .map_or(-1, |timeout| timeout.as_millis().min(i32::MAX as u128) as i32)
    }
}

impl Connection for HidConnection {
    fn max_input_report_len(&self) -> usize {
        self.lengths.input
    }

    fn max_output_report_len(&self) -> usize {
        self.lengths.output
    }

    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        trace!("sent report: {:x?}", report);

        let written = self.device.write(report)?;
        if written < report.len() {
            return Err(TransportError::ShortWrite {
                expected: report.len(),
                written,
            });
        }

        Ok(())
    }

    fn read_report(&mut self, report: &mut [u8]) -> Result<usize, TransportError> {
        // hidapi only includes the report ID when the device numbers its reports.
        let read = if self.lengths.numbered {
            self.device.read_timeout(report, self.timeout_ms())?
        } else {
            let Some((id, payload)) = report.split_first_mut() else {
                return Ok(0);
            };
            *id = REPORT_ID;

            match self.device.read_timeout(payload, self.timeout_ms())? {
                0 => 0,
                read => read + 1,
            }
        };

        if read == 0 {
            return Err(TransportError::Timeout);
        }

        trace!("received report: {:x?}", &report[..read]);
        Ok(read)
    }
}

impl Drop for HidConnection {
    fn drop(&mut self) {
        debug!("Closing {}", self.info.path);
    }
}
