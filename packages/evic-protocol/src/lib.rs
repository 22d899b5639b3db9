//! Implementation of the eVic HID command protocol in Rust.
//!
//! Every device operation starts with an 18-byte [`CommandPacket`] carrying a
//! command code, two little-endian arguments, the `"HIDC"` signature and an
//! additive checksum. Data-bearing operations follow the packet with a raw
//! payload, such as a [`Dataflash`] block or a composed logo image.

#![no_std]

extern crate alloc;

pub mod command;
pub mod dataflash;
pub mod logo;
pub mod product;

mod checksum;
mod decode;
mod encode;
mod version;

pub use checksum::checksum;
pub use command::CommandPacket;
pub use dataflash::{Dataflash, DataflashSizeError};
pub use decode::{Decode, DecodeError, DecodeErrorKind};
pub use encode::Encode;
pub use logo::{LogoBlockSizeError, compose_logo};
pub use product::{ProductFlags, ProductId, ProductIdError};
pub use version::Version;

/// Signature carried by every command packet.
pub const COMMAND_SIGNATURE: [u8; 4] = *b"HIDC";

/// Total size of an encoded [`CommandPacket`].
pub const COMMAND_PACKET_LENGTH: usize = 18;

/// Size of the dataflash block on the wire, including its 4-byte checksum prefix.
pub const DATAFLASH_LENGTH: usize = 2048;

/// Size of the dataflash payload that follows the checksum prefix.
pub const DATAFLASH_PAYLOAD_LENGTH: usize = DATAFLASH_LENGTH - 4;

/// Device memory offset the boot logo is written to.
pub const LOGO_OFFSET: u32 = 102400;

/// Size of a composed logo image on the wire.
pub const LOGO_LENGTH: usize = 1024;

/// Largest accepted size of a single logo block.
pub const LOGO_BLOCK_MAX_SIZE: usize = 512;
