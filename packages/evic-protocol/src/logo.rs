//! Boot logo composition.
//!
//! A boot logo is made of two independent image blocks of at most
//! [`LOGO_BLOCK_MAX_SIZE`] bytes each. On the wire they share a single
//! [`LOGO_LENGTH`]-byte buffer: block 2 fills the low half and block 1 the
//! high half. Unused bytes are zero.

use thiserror::Error;

use crate::{LOGO_BLOCK_MAX_SIZE, LOGO_LENGTH};

/// A logo block does not fit into its half of the logo buffer.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("logo block {block} is {input_size} bytes, at most {max_size} are allowed")]
pub struct LogoBlockSizeError {
    /// Which block was rejected, `1` or `2`.
    pub block: u8,
    pub input_size: usize,
    pub max_size: usize,
}

/// Composes the wire image of a boot logo from its two blocks.
///
/// # Errors
///
/// Returns a [`LogoBlockSizeError`] if either block is longer than
/// [`LOGO_BLOCK_MAX_SIZE`] bytes.
pub fn compose_logo(block1: &[u8], block2: &[u8]) -> Result<[u8; LOGO_LENGTH], LogoBlockSizeError> {
    for (block, data) in [(1, block1), (2, block2)] {
        if data.len() > LOGO_BLOCK_MAX_SIZE {
            return Err(LogoBlockSizeError {
                block,
                input_size: data.len(),
                max_size: LOGO_BLOCK_MAX_SIZE,
            });
        }
    }

    let mut logo = [0; LOGO_LENGTH];
    logo[..block2.len()].copy_from_slice(block2);
    logo[LOGO_BLOCK_MAX_SIZE..LOGO_BLOCK_MAX_SIZE + block1.len()].copy_from_slice(block1);

    Ok(logo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_placement() {
        let logo = compose_logo(&[0xAA; 10], &[0xBB; 10]).unwrap();

        assert!(logo[0..10].iter().all(|&b| b == 0xBB));
        assert!(logo[10..512].iter().all(|&b| b == 0));
        assert!(logo[512..522].iter().all(|&b| b == 0xAA));
        assert!(logo[522..].iter().all(|&b| b == 0));
    }

    #[test]
    fn full_blocks() {
        let logo = compose_logo(&[1; 512], &[2; 512]).unwrap();

        assert_eq!(&logo[..512], &[2; 512]);
        assert_eq!(&logo[512..], &[1; 512]);
    }

    #[test]
    fn empty_blocks() {
        assert_eq!(compose_logo(&[], &[]).unwrap(), [0; LOGO_LENGTH]);
    }

    #[test]
    fn oversized_blocks() {
        assert_eq!(
            compose_logo(&[0; 513], &[]),
            Err(LogoBlockSizeError {
                block: 1,
                input_size: 513,
                max_size: 512,
            })
        );
        assert_eq!(compose_logo(&[], &[0; 600]).unwrap_err().block, 2);
    }
}
