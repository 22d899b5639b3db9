use log::{debug, warn};

use evic_protocol::{
    DATAFLASH_LENGTH, Dataflash, Encode,
    command::{ReadDataflashPacket, ResetDataflashPacket, RestartPacket, WriteDataflashPacket},
};

use crate::{Connection, ConnectionError, ProgressCallback};

use super::Command;

/// Reads the dataflash block.
#[derive(Default)]
pub struct ReadDataflash<'a> {
    pub progress_callback: Option<ProgressCallback<'a>>,
}

impl Command for ReadDataflash<'_> {
    type Output = Dataflash;

    fn execute<C: Connection + ?Sized>(
        mut self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        connection.send(ReadDataflashPacket::whole())?;
        let raw = connection.read_chunked(DATAFLASH_LENGTH, self.progress_callback.as_deref_mut())?;

        let dataflash = Dataflash::parse(&raw)?;
        if !dataflash.is_checksum_valid() {
            warn!(
                "Dataflash checksum mismatch: received {:#010x}, computed {:#010x}",
                dataflash.checksum(),
                dataflash.compute_checksum()
            );
        }

        Ok(dataflash)
    }
}

/// Writes a dataflash block, preceded by a freshly computed checksum.
pub struct WriteDataflash<'a> {
    pub dataflash: Dataflash,
    pub progress_callback: Option<ProgressCallback<'a>>,
}

impl WriteDataflash<'_> {
    pub fn new(dataflash: Dataflash) -> Self {
        Self {
            dataflash,
            progress_callback: None,
        }
    }
}

impl Command for WriteDataflash<'_> {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        mut self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        connection.send(WriteDataflashPacket::whole())?;
        connection.write_chunked(
            &self.dataflash.to_bytes(),
            self.progress_callback.as_deref_mut(),
        )
    }
}

/// Resets the dataflash block to its factory defaults.
#[derive(Debug, Clone, Copy)]
pub struct ResetDataflash;

impl Command for ResetDataflash {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        connection.send(ResetDataflashPacket::whole())
    }
}

/// Selects the ROM the device boots from, then restarts it.
///
/// Devices are switched to their alternate ROM before firmware uploads.
#[derive(Debug, Clone, Copy)]
pub struct SwitchBootRom {
    pub alternate: bool,
}

impl Command for SwitchBootRom {
    type Output = ();

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError> {
        let mut dataflash = connection.execute_command(ReadDataflash::default())?;
        debug!(
            "Switching boot ROM from {} to {}",
            rom_name(dataflash.load_from_alternate_rom()),
            rom_name(self.alternate)
        );

        dataflash.set_load_from_alternate_rom(self.alternate);
        connection.execute_command(WriteDataflash::new(dataflash))?;
        connection.send(RestartPacket::restart())
    }
}

fn rom_name(alternate: bool) -> &'static str {
    if alternate { "alternate" } else { "primary" }
}
