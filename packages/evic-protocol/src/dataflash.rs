//! The device's persistent configuration block.

use alloc::vec::Vec;

use thiserror::Error;

use crate::{
    DATAFLASH_LENGTH, DATAFLASH_PAYLOAD_LENGTH,
    checksum::checksum,
    decode::Decode,
    encode::Encode,
    product::ProductId,
    version::Version,
};

const HARDWARE_VERSION_OFFSET: usize = 4;
const BOOT_FLAG_OFFSET: usize = 9;
const FIRMWARE_VERSION_OFFSET: usize = 256;
const PRODUCT_ID_OFFSET: usize = 312;

/// A buffer of the wrong size was given to [`Dataflash`].
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("Dataflash buffer is {input_size} bytes, expected exactly {expected_size}")]
pub struct DataflashSizeError {
    pub input_size: usize,
    pub expected_size: usize,
}

/// The device's persistent configuration block.
///
/// # Encoding
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `checksum` | 4    | Little-endian sum of all `payload` bytes, wrapping at 32 bits. |
/// | `payload`  | 2044 | Configuration data. |
///
/// # Payload fields
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 4      | 4    | Hardware version, in hundredths. |
/// | 9      | 1    | Boot flag. Non-zero boots from the alternate ROM. |
/// | 256    | 4    | Firmware version, in hundredths. |
/// | 312    | 4    | ASCII product code. |
///
/// The checksum is stored as received but never trusted for writing:
/// [`Encode`] always derives a fresh one from the payload. Two blocks are
/// equal when their payloads are.
#[derive(Debug, Clone)]
pub struct Dataflash {
    checksum: u32,
    data: Vec<u8>,
}

impl Dataflash {
    /// Wraps a payload, deriving its checksum.
    ///
    /// # Errors
    ///
    /// Fails unless `data` is exactly [`DATAFLASH_PAYLOAD_LENGTH`] bytes long.
    pub fn new(data: Vec<u8>) -> Result<Self, DataflashSizeError> {
        Self::with_checksum(checksum(&data), data)
    }

    /// Wraps a payload together with a checksum received from the device.
    ///
    /// # Errors
    ///
    /// Fails unless `data` is exactly [`DATAFLASH_PAYLOAD_LENGTH`] bytes long.
    pub fn with_checksum(checksum: u32, data: Vec<u8>) -> Result<Self, DataflashSizeError> {
        if data.len() != DATAFLASH_PAYLOAD_LENGTH {
            return Err(DataflashSizeError {
                input_size: data.len(),
                expected_size: DATAFLASH_PAYLOAD_LENGTH,
            });
        }

        Ok(Self { checksum, data })
    }

    /// Splits a raw block read from the device into its checksum and payload.
    ///
    /// # Errors
    ///
    /// Fails unless `raw` is exactly [`DATAFLASH_LENGTH`] bytes long.
    pub fn parse(raw: &[u8]) -> Result<Self, DataflashSizeError> {
        let size_error = DataflashSizeError {
            input_size: raw.len(),
            expected_size: DATAFLASH_LENGTH,
        };
        if raw.len() != DATAFLASH_LENGTH {
            return Err(size_error);
        }

        let mut data = raw;
        let checksum = u32::decode(&mut data).map_err(|_| size_error)?;

        Self::with_checksum(checksum, data.to_vec())
    }

    /// The checksum this block was received with.
    pub const fn checksum(&self) -> u32 {
        self.checksum
    }

    /// The checksum of the current payload.
    pub fn compute_checksum(&self) -> u32 {
        checksum(&self.data)
    }

    /// Returns whether the stored checksum matches the payload.
    pub fn is_checksum_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Whether the device boots from its alternate ROM on the next restart.
    pub fn load_from_alternate_rom(&self) -> bool {
        self.data[BOOT_FLAG_OFFSET] != 0
    }

    pub fn set_load_from_alternate_rom(&mut self, alternate: bool) {
        self.data[BOOT_FLAG_OFFSET] = alternate as u8;
    }

    pub fn hardware_version(&self) -> Version {
        self.read(HARDWARE_VERSION_OFFSET)
    }

    pub fn set_hardware_version(&mut self, version: Version) {
        self.write(HARDWARE_VERSION_OFFSET, &version);
    }

    pub fn firmware_version(&self) -> Version {
        self.read(FIRMWARE_VERSION_OFFSET)
    }

    pub fn set_firmware_version(&mut self, version: Version) {
        self.write(FIRMWARE_VERSION_OFFSET, &version);
    }

    pub fn product_id(&self) -> ProductId {
        self.read(PRODUCT_ID_OFFSET)
    }

    pub fn set_product_id(&mut self, product_id: ProductId) {
        self.write(PRODUCT_ID_OFFSET, &product_id);
    }

    // Offsets are constants well inside the payload, whose length is fixed at construction.
    fn read<T: Decode + Default>(&self, offset: usize) -> T {
        T::decode(&mut &self.data[offset..]).unwrap_or_default()
    }

    fn write(&mut self, offset: usize, value: &impl Encode) {
        value.encode(&mut self.data[offset..offset + value.size()]);
    }
}

impl PartialEq for Dataflash {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Dataflash {}

impl Encode for Dataflash {
    fn size(&self) -> usize {
        DATAFLASH_LENGTH
    }

    fn encode(&self, data: &mut [u8]) {
        self.compute_checksum().encode(data);
        self.data.as_slice().encode(&mut data[4..]);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn sample() -> Dataflash {
        let mut data = vec![0; DATAFLASH_PAYLOAD_LENGTH];
        data[4..8].copy_from_slice(&106u32.to_le_bytes());
        data[9] = 1;
        data[256..260].copy_from_slice(&306u32.to_le_bytes());
        data[312..316].copy_from_slice(b"E052");
        data[1000] = 0xFF;
        Dataflash::new(data).unwrap()
    }

    #[test]
    fn fields() {
        let dataflash = sample();

        assert_eq!(dataflash.hardware_version(), Version::new(1, 6));
        assert_eq!(dataflash.firmware_version(), Version::new(3, 6));
        assert!(dataflash.load_from_alternate_rom());
        assert_eq!(dataflash.product_id().as_str(), Some("E052"));
        assert_eq!(dataflash.product_id().name(), "Joyetech eVic-VTC Mini");
    }

    #[test]
    fn setters_write_through() {
        let mut dataflash = sample();
        dataflash.set_load_from_alternate_rom(false);
        dataflash.set_hardware_version(Version::new(2, 0));
        dataflash.set_firmware_version(Version::from_raw(400));
        dataflash.set_product_id("M011".parse().unwrap());

        assert_eq!(dataflash.data()[9], 0);
        assert_eq!(&dataflash.data()[4..8], &200u32.to_le_bytes());
        assert_eq!(&dataflash.data()[256..260], &400u32.to_le_bytes());
        assert_eq!(&dataflash.data()[312..316], b"M011");
    }

    #[test]
    fn parse_splits_checksum() {
        let mut raw = vec![0; DATAFLASH_LENGTH];
        raw[..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        raw[4] = 7;

        let dataflash = Dataflash::parse(&raw).unwrap();

        assert_eq!(dataflash.checksum(), 0xDEADBEEF);
        assert_eq!(dataflash.data().len(), DATAFLASH_PAYLOAD_LENGTH);
        assert_eq!(dataflash.data()[0], 7);
        assert!(!dataflash.is_checksum_valid());
    }

    #[test]
    fn encode_derives_fresh_checksum() {
        let mut raw = vec![1; DATAFLASH_LENGTH];
        raw[..4].copy_from_slice(&0u32.to_le_bytes());
        let dataflash = Dataflash::parse(&raw).unwrap();

        let encoded = dataflash.to_bytes();

        assert_eq!(encoded.len(), DATAFLASH_LENGTH);
        assert_eq!(&encoded[..4], &(DATAFLASH_PAYLOAD_LENGTH as u32).to_le_bytes());
        assert_eq!(&encoded[4..], dataflash.data());
    }

    #[test]
    fn round_trip() {
        let dataflash = sample();
        let parsed = Dataflash::parse(&dataflash.to_bytes()).unwrap();

        assert_eq!(parsed, dataflash);
        assert!(parsed.is_checksum_valid());
        assert_eq!(parsed.firmware_version(), dataflash.firmware_version());
        assert_eq!(parsed.product_id(), dataflash.product_id());
    }

    #[test]
    fn round_trip_after_edits() {
        let mut dataflash = Dataflash::new(vec![0; DATAFLASH_PAYLOAD_LENGTH]).unwrap();
        dataflash.set_firmware_version(Version::new(3, 3));
        dataflash.set_product_id("E060".parse().unwrap());
        dataflash.data_mut()[2000] = 0x80;

        let parsed = Dataflash::parse(&dataflash.to_bytes()).unwrap();

        assert_eq!(parsed, dataflash);
        assert!(parsed.is_checksum_valid());
        assert_eq!(parsed.checksum(), dataflash.compute_checksum());
        // The block still carries the checksum of its original payload.
        assert_eq!(dataflash.checksum(), 0);
    }

    #[test]
    fn equality_ignores_stored_checksum() {
        let data = sample().into_data();
        let mut edited = sample();
        edited.data_mut()[1000] = 0;

        assert_eq!(Dataflash::with_checksum(1, data).unwrap(), sample());
        assert_ne!(edited, sample());
    }

    #[test]
    fn rejects_wrong_sizes() {
        assert_eq!(
            Dataflash::new(vec![0; DATAFLASH_LENGTH]),
            Err(DataflashSizeError {
                input_size: DATAFLASH_LENGTH,
                expected_size: DATAFLASH_PAYLOAD_LENGTH,
            })
        );
        assert_eq!(
            Dataflash::parse(&[0; 3]),
            Err(DataflashSizeError {
                input_size: 3,
                expected_size: DATAFLASH_LENGTH,
            })
        );
        assert!(Dataflash::parse(&vec![0; DATAFLASH_LENGTH + 1]).is_err());
    }
}
