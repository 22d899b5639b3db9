/// Additive checksum used by command packets and the dataflash block.
///
/// Every byte is summed as an unsigned value and the result wraps at 32 bits.
#[inline]
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(byte as u32))
}
