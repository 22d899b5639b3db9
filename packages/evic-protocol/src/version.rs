use core::fmt;

use crate::decode::{Decode, DecodeError};
use crate::encode::Encode;

/// A hardware or firmware version as stored in the dataflash.
///
/// Devices store versions as an integer number of hundredths, so `306`
/// is version `3.06`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Version(u32);

impl Version {
    /// Creates a version from its raw hundredths value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Creates a version from its major and minor components.
    ///
    /// `minor` is expected to be below 100.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self(major * 100 + minor)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    pub const fn major(&self) -> u32 {
        self.0 / 100
    }

    pub const fn minor(&self) -> u32 {
        self.0 % 100
    }

    /// The version as a decimal number, i.e. the raw value divided by 100.
    pub fn as_f32(&self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major(), self.minor())
    }
}

impl Encode for Version {
    fn size(&self) -> usize {
        4
    }

    fn encode(&self, data: &mut [u8]) {
        self.0.encode(data)
    }
}

impl Decode for Version {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(u32::decode(data)?))
    }
}
