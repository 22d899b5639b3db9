use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Invalid {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Input ended before a complete value was read.")]
    UnexpectedEnd,

    #[error("Unexpected {name} byte {value:#04x}, expected one of {expected:02x?}.")]
    UnexpectedByte {
        name: &'static str,
        value: u8,
        expected: &'static [u8],
    },

    #[error("Checksum is {value:#010x}, but the header sums to {expected:#010x}.")]
    Checksum { value: u32, expected: u32 },

    #[error("Missing HIDC signature.")]
    InvalidSignature,
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice will be advanced by the number of bytes successfully
/// consumed during decoding.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or insufficient
    /// to decode a complete value of this type.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    let bytes = <[u8; size_of::<$t>()]>::decode(data)
                        .map_err(|_| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
                    Ok(Self::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u32);

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let Some((bytes, rest)) = data.split_first_chunk::<N>() else {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd));
        };
        *data = rest;
        Ok(*bytes)
    }
}
