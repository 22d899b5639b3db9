use log::debug;

use evic_protocol::command::{RestartPacket, WriteDataPacket};

use crate::{Connection, ConnectionError, ProgressCallback, ValidationError};

use super::Command;

/// Writes a firmware image.
///
/// The image is written as given. Firmware containers must be unpacked
/// beforehand.
pub struct WriteFirmware<'a> {
    data: &'a [u8],
    length: u32,
    pub progress_callback: Option<ProgressCallback<'a>>,
}

impl<'a> WriteFirmware<'a> {
    /// # Errors
    ///
    /// Fails if `data` is empty or its length does not fit in the command packet.
    pub fn new(data: &'a [u8]) -> Result<Self, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::EmptyFirmware);
        }
        let length =
            u32::try_from(data.len()).map_err(|_| ValidationError::FirmwareTooLarge(data.len()))?;

        Ok(Self {
            data,
            length,
            progress_callback: None,
        })
    }

    pub fn with_progress(mut self, callback: impl FnMut(u8) + 'a) -> Self {
        self.progress_callback = Some(Box::new(callback));
        self
    }
}

impl Command for WriteFirmware<'_> {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        mut self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        debug!("Writing {} bytes of firmware", self.length);

        connection.send(WriteDataPacket::firmware(self.length))?;
        connection.write_chunked(self.data, self.progress_callback.as_deref_mut())
    }
}

/// Restarts the device.
#[derive(Debug, Clone, Copy)]
pub struct Restart;

impl Command for Restart {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        connection.send(RestartPacket::restart())
    }
}
