//! Derives report lengths from a HID report descriptor.
//!
//! hidapi does not expose the maximum report lengths of a device, so they are
//! computed the same way the operating system does: the bits of every main
//! item are summed per report ID, and the largest report of each kind is
//! rounded up to whole bytes. One byte is added for the report ID, which is
//! always present on the host side even when the device does not number its
//! reports.

use thiserror::Error;

const MAIN_ITEM: u8 = 0;
const GLOBAL_ITEM: u8 = 1;

const INPUT_TAG: u8 = 0x8;
const OUTPUT_TAG: u8 = 0x9;
const FEATURE_TAG: u8 = 0xB;

const REPORT_SIZE_TAG: u8 = 0x7;
const REPORT_ID_TAG: u8 = 0x8;
const REPORT_COUNT_TAG: u8 = 0x9;
const PUSH_TAG: u8 = 0xA;
const POP_TAG: u8 = 0xB;

const LONG_ITEM_PREFIX: u8 = 0xFE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportDescriptorError {
    #[error("Report descriptor ended inside an item at offset {0}")]
    UnexpectedEnd(usize),

    #[error("Report descriptor pops more global states than it pushes")]
    UnbalancedPop,
}

/// Report lengths of a device, each including the report ID byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportLengths {
    pub input: usize,
    pub output: usize,
    /// Whether the device prefixes its reports with a report ID.
    pub numbered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

#[derive(Debug, Clone, Copy)]
enum ReportKind {
    Input,
    Output,
    Feature,
}

/// Bit totals of one report ID, indexed by [`ReportKind`].
#[derive(Debug, Default)]
struct ReportBits {
    id: u8,
    bits: [u64; 3],
}

impl ReportLengths {
    /// Parses a raw report descriptor.
    pub fn parse(descriptor: &[u8]) -> Result<Self, ReportDescriptorError> {
        let mut state = GlobalState::default();
        let mut stack = Vec::new();
        let mut reports: Vec<ReportBits> = Vec::new();
        let mut numbered = false;

        let mut offset = 0;
        while offset < descriptor.len() {
            let prefix = descriptor[offset];

            if prefix == LONG_ITEM_PREFIX {
                let size = *descriptor
                    .get(offset + 1)
                    .ok_or(ReportDescriptorError::UnexpectedEnd(offset))?;
                offset += 3 + size as usize;
                if offset > descriptor.len() {
                    return Err(ReportDescriptorError::UnexpectedEnd(offset));
                }
                continue;
            }

            let size = match prefix & 0b11 {
                3 => 4,
                n => n as usize,
            };
            let item_type = (prefix >> 2) & 0b11;
            let tag = prefix >> 4;

            let data = descriptor
                .get(offset + 1..offset + 1 + size)
                .ok_or(ReportDescriptorError::UnexpectedEnd(offset))?;
            let value = data
                .iter()
                .rev()
                .fold(0u32, |value, &byte| (value << 8) | byte as u32);
            offset += 1 + size;

            match (item_type, tag) {
                (GLOBAL_ITEM, REPORT_SIZE_TAG) => state.report_size = value,
                (GLOBAL_ITEM, REPORT_COUNT_TAG) => state.report_count = value,
                (GLOBAL_ITEM, REPORT_ID_TAG) => {
                    state.report_id = value as u8;
                    numbered = true;
                }
                (GLOBAL_ITEM, PUSH_TAG) => stack.push(state),
                (GLOBAL_ITEM, POP_TAG) => {
                    state = stack.pop().ok_or(ReportDescriptorError::UnbalancedPop)?;
                }
                (MAIN_ITEM, INPUT_TAG | OUTPUT_TAG | FEATURE_TAG) => {
                    let kind = match tag {
                        INPUT_TAG => ReportKind::Input,
                        OUTPUT_TAG => ReportKind::Output,
                        _ => ReportKind::Feature,
                    };

                    let index = match reports.iter().position(|r| r.id == state.report_id) {
                        Some(index) => index,
                        None => {
                            reports.push(ReportBits {
                                id: state.report_id,
                                ..Default::default()
                            });
                            reports.len() - 1
                        }
                    };

                    reports[index].bits[kind as usize] +=
                        state.report_size as u64 * state.report_count as u64;
                }
                _ => {}
            }
        }

        let longest = |kind: ReportKind| {
            reports
                .iter()
                .map(|report| report.bits[kind as usize])
                .filter(|&bits| bits > 0)
                .max()
                .map_or(0, |bits| bits.div_ceil(8) as usize + 1)
        };

        Ok(Self {
            input: longest(ReportKind::Input),
            output: longest(ReportKind::Output),
            numbered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A vendor-defined device with one 64-byte report in each direction.
    const VENDOR_64: &[u8] = &[
        0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
        0x09, 0x01, // Usage (0x01)
        0xA1, 0x01, // Collection (Application)
        0x09, 0x02, //   Usage (0x02)
        0x15, 0x00, //   Logical Minimum (0)
        0x26, 0xFF, 0x00, //   Logical Maximum (255)
        0x75, 0x08, //   Report Size (8)
        0x95, 0x40, //   Report Count (64)
        0x81, 0x02, //   Input (Data,Var,Abs)
        0x09, 0x03, //   Usage (0x03)
        0x95, 0x40, //   Report Count (64)
        0x91, 0x02, //   Output (Data,Var,Abs)
        0xC0, // End Collection
    ];

    #[test]
    fn unnumbered_vendor_reports() {
        let lengths = ReportLengths::parse(VENDOR_64).unwrap();

        assert_eq!(
            lengths,
            ReportLengths {
                input: 65,
                output: 65,
                numbered: false,
            }
        );
    }

    #[test]
    fn numbered_reports_use_the_longest() {
        let descriptor = [
            0x85, 0x01, // Report ID (1)
            0x75, 0x08, // Report Size (8)
            0x95, 0x03, // Report Count (3)
            0x81, 0x02, // Input
            0x85, 0x02, // Report ID (2)
            0x95, 0x10, // Report Count (16)
            0x81, 0x02, // Input
            0x75, 0x01, // Report Size (1)
            0x95, 0x05, // Report Count (5)
            0x91, 0x02, // Output, 5 bits
        ];

        let lengths = ReportLengths::parse(&descriptor).unwrap();

        assert_eq!(lengths.input, 17);
        assert_eq!(lengths.output, 2);
        assert!(lengths.numbered);
    }

    #[test]
    fn push_and_pop_restore_globals() {
        let descriptor = [
            0x75, 0x08, // Report Size (8)
            0x95, 0x04, // Report Count (4)
            0xA4, // Push
            0x95, 0x20, // Report Count (32)
            0x81, 0x02, // Input, 32 bytes
            0xB4, // Pop
            0x91, 0x02, // Output, 4 bytes
        ];

        let lengths = ReportLengths::parse(&descriptor).unwrap();

        assert_eq!(lengths.input, 33);
        assert_eq!(lengths.output, 5);
    }

    #[test]
    fn feature_reports_are_not_counted() {
        let mut descriptor = VENDOR_64.to_vec();
        descriptor.extend_from_slice(&[
            0x96, 0x00, 0x01, // Report Count (256)
            0xB1, 0x02, // Feature
        ]);

        let lengths = ReportLengths::parse(&descriptor).unwrap();

        assert_eq!((lengths.input, lengths.output), (65, 65));
    }

    #[test]
    fn long_items_are_skipped() {
        let mut descriptor = vec![0xFE, 0x02, 0x10, 0xAA, 0xBB];
        descriptor.extend_from_slice(VENDOR_64);

        assert_eq!(ReportLengths::parse(&descriptor).unwrap().input, 65);
    }

    #[test]
    fn truncated_descriptor() {
        assert_eq!(
            ReportLengths::parse(&[0x75, 0x08, 0x26, 0xFF]),
            Err(ReportDescriptorError::UnexpectedEnd(2))
        );
        assert_eq!(
            ReportLengths::parse(&[0xB4]),
            Err(ReportDescriptorError::UnbalancedPop)
        );
    }
}
