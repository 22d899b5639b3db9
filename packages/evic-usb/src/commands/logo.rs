use evic_protocol::{LOGO_LENGTH, command::WriteDataPacket, compose_logo};

use crate::{Connection, ConnectionError, ProgressCallback, ValidationError};

use super::Command;

/// Writes a boot logo.
///
/// Only devices whose product supports it accept a logo, see
/// [`ProductId::supports_logo_upload`](evic_protocol::ProductId::supports_logo_upload).
pub struct WriteLogo<'a> {
    image: [u8; LOGO_LENGTH],
    pub progress_callback: Option<ProgressCallback<'a>>,
}

impl WriteLogo<'_> {
    /// Composes the logo image from its two blocks.
    ///
    /// # Errors
    ///
    /// Fails if either block is longer than
    /// [`LOGO_BLOCK_MAX_SIZE`](evic_protocol::LOGO_BLOCK_MAX_SIZE) bytes.
    pub fn new(block1: &[u8], block2: &[u8]) -> Result<Self, ValidationError> {
        Ok(Self {
            image: compose_logo(block1, block2)?,
            progress_callback: None,
        })
    }

    /// The composed image as it is written to the device.
    pub fn image(&self) -> &[u8; LOGO_LENGTH] {
        &self.image
    }
}

impl Command for WriteLogo<'_> {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        mut self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        connection.send(WriteDataPacket::logo())?;
        connection.write_chunked(&self.image, self.progress_callback.as_deref_mut())
    }
}
