//! Command packets.

use crate::{
    COMMAND_PACKET_LENGTH, COMMAND_SIGNATURE, DATAFLASH_LENGTH, LOGO_LENGTH, LOGO_OFFSET,
    checksum::checksum,
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::Encode,
};

/// Command opcodes.
///
/// These are the byte values identifying the different device operations.
pub mod cmds {
    pub const READ_DATAFLASH: u8 = 0x35;
    pub const WRITE_DATAFLASH: u8 = 0x53;
    pub const RESET_DATAFLASH: u8 = 0x7C;
    pub const WRITE_DATA: u8 = 0xC3;
    pub const RESTART: u8 = 0xB4;
}

use cmds::{READ_DATAFLASH, RESET_DATAFLASH, RESTART, WRITE_DATA, WRITE_DATAFLASH};

/// Value of the second header byte. It is the offset of the checksum field.
const HEADER_LENGTH: u8 = 14;

/// Device-bound command packet.
///
/// Every device operation starts with exactly one of these. Operations that
/// carry data follow it with a raw payload of `length` bytes in either
/// direction.
///
/// # Encoding
///
/// All multi-byte fields are little-endian.
///
/// | Field       | Size | Description |
/// |-------------|------|-------------|
/// | `cmd`       | 1    | A [command opcode](cmds). |
/// | `header`    | 1    | Always `14`. |
/// | `offset`    | 4    | First argument, usually a device memory offset. |
/// | `length`    | 4    | Second argument, usually the payload length. |
/// | `signature` | 4    | Must be [`COMMAND_SIGNATURE`]. |
/// | `checksum`  | 4    | Sum of the 14 preceding bytes, wrapping at 32 bits. |
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandPacket<const CMD: u8> {
    pub offset: u32,
    pub length: u32,
}

impl<const CMD: u8> CommandPacket<CMD> {
    pub const CMD: u8 = CMD;

    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }
}

impl<const CMD: u8> Encode for CommandPacket<CMD> {
    fn size(&self) -> usize {
        COMMAND_PACKET_LENGTH
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = CMD;
        data[1] = HEADER_LENGTH;
        self.offset.encode(&mut data[2..]);
        self.length.encode(&mut data[6..]);
        COMMAND_SIGNATURE.encode(&mut data[10..]);

        let sum = checksum(&data[..HEADER_LENGTH as usize]);
        sum.encode(&mut data[14..]);
    }
}

impl<const CMD: u8> Decode for CommandPacket<CMD> {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let Some(header) = data.get(..HEADER_LENGTH as usize) else {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd));
        };
        let expected_checksum = checksum(header);

        let cmd = u8::decode(data)?;
        if cmd != CMD {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedByte {
                name: "cmd",
                value: cmd,
                expected: &[CMD],
            }));
        }

        let header_length = u8::decode(data)?;
        if header_length != HEADER_LENGTH {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedByte {
                name: "header",
                value: header_length,
                expected: &[HEADER_LENGTH],
            }));
        }

        let offset = u32::decode(data)?;
        let length = u32::decode(data)?;

        if <[u8; 4]>::decode(data)? != COMMAND_SIGNATURE {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::InvalidSignature));
        }

        let value = u32::decode(data)?;
        if value != expected_checksum {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::Checksum {
                value,
                expected: expected_checksum,
            }));
        }

        Ok(Self { offset, length })
    }
}

pub type ReadDataflashPacket = CommandPacket<READ_DATAFLASH>;
pub type WriteDataflashPacket = CommandPacket<WRITE_DATAFLASH>;
pub type ResetDataflashPacket = CommandPacket<RESET_DATAFLASH>;
pub type WriteDataPacket = CommandPacket<WRITE_DATA>;
pub type RestartPacket = CommandPacket<RESTART>;

impl ReadDataflashPacket {
    /// Requests the whole dataflash block.
    pub const fn whole() -> Self {
        Self::new(0, DATAFLASH_LENGTH as u32)
    }
}

impl WriteDataflashPacket {
    /// Announces a write of the whole dataflash block.
    pub const fn whole() -> Self {
        Self::new(0, DATAFLASH_LENGTH as u32)
    }
}

impl ResetDataflashPacket {
    /// Resets the whole dataflash block to factory defaults.
    pub const fn whole() -> Self {
        Self::new(0, DATAFLASH_LENGTH as u32)
    }
}

impl WriteDataPacket {
    /// Announces a firmware image of `length` bytes.
    pub const fn firmware(length: u32) -> Self {
        Self::new(0, length)
    }

    /// Announces a composed boot logo.
    pub const fn logo() -> Self {
        Self::new(LOGO_OFFSET, LOGO_LENGTH as u32)
    }
}

impl RestartPacket {
    pub const fn restart() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dataflash_layout() {
        let encoded = ReadDataflashPacket::whole().to_bytes();

        assert_eq!(
            encoded,
            [
                0x35, 0x0E, // cmd, header
                0x00, 0x00, 0x00, 0x00, // offset
                0x00, 0x08, 0x00, 0x00, // length = 2048
                b'H', b'I', b'D', b'C', // signature
                0x63, 0x01, 0x00, 0x00, // checksum
            ]
        );
    }

    #[test]
    fn checksum_covers_header_only() {
        let encoded = WriteDataPacket::logo().to_bytes();
        let sum = encoded[..14].iter().map(|&b| b as u32).sum::<u32>();

        assert_eq!(encoded.len(), COMMAND_PACKET_LENGTH);
        assert_eq!(&encoded[14..], &sum.to_le_bytes());
    }

    #[test]
    fn decode_encoded() {
        let encoded = WriteDataPacket::firmware(0x1234).to_bytes();
        let decoded = WriteDataPacket::decode(&mut encoded.as_slice()).unwrap();

        assert_eq!(decoded, WriteDataPacket::firmware(0x1234));
    }

    #[test]
    fn decode_rejects_corrupted_checksum() {
        let mut encoded = RestartPacket::restart().to_bytes();
        encoded[17] ^= 0xFF;

        let err = RestartPacket::decode(&mut encoded.as_slice()).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::Checksum { .. }));
    }

    #[test]
    fn decode_rejects_other_command() {
        let encoded = RestartPacket::restart().to_bytes();

        let err = ResetDataflashPacket::decode(&mut encoded.as_slice()).unwrap_err();
        assert!(matches!(
            err.kind(),
            DecodeErrorKind::UnexpectedByte { name: "cmd", value: 0xB4, .. }
        ));
    }
}
