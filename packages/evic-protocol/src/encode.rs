/// A type that can be encoded into a sequence of bytes.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    ///
    /// `data` must be at least [`Encode::size`] bytes long.
    fn encode(&self, data: &mut [u8]);

    /// Encodes this instance into a newly allocated buffer of exactly [`Encode::size`] bytes.
    fn to_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut encoded = alloc::vec![0; self.size()];
        self.encode(&mut encoded);
        encoded
    }
}

impl Encode for u32 {
    fn size(&self) -> usize {
        4
    }

    fn encode(&self, data: &mut [u8]) {
        data[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl Encode for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}
