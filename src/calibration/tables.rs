//! Static calibration tables.
//!
//! Byte values were captured from the vendor driver's traffic and are
//! replayed as-is. Segments are selected and concatenated by
//! [`CalibrationProgram`](super::CalibrationProgram).

use super::CalibrationStep;
use crate::device::EnableBits;

const fn mw(endpoint: u8, data: &'static [u8]) -> CalibrationStep {
    CalibrationStep::Write { endpoint, data }
}

const fn mq(endpoint: u8, command: &'static [u8], expected: &'static [u8]) -> CalibrationStep {
    CalibrationStep::Query {
        endpoint,
        command,
        count: expected.len(),
        expected: Some(expected),
    }
}

const fn mq_any(endpoint: u8, command: &'static [u8], count: usize) -> CalibrationStep {
    CalibrationStep::Query {
        endpoint,
        command,
        count,
        expected: None,
    }
}

const fn rd(address: u8, expected: u8) -> CalibrationStep {
    CalibrationStep::ReadDevice {
        address,
        expected: Some(expected),
    }
}

const fn rd_any(address: u8) -> CalibrationStep {
    CalibrationStep::ReadDevice {
        address,
        expected: None,
    }
}

const fn set_enable(bits: EnableBits, on: bool) -> CalibrationStep {
    CalibrationStep::SetEnable { bits, on }
}

const fn poll(endpoint: u8, command: &'static [u8], until: u8) -> CalibrationStep {
    CalibrationStep::PollMailbox {
        endpoint,
        command,
        until,
    }
}

/// One word of the indexed verification bank and its documented value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankCheck {
    /// Bank index
    pub index: u16,
    /// Documented contents
    pub expected: [u8; 2],
}

/// Request value of the verification bank reads
pub const VERIFY_BANK_VALUE: u16 = 0x0000;

/// Bank-select write issued right after the idle firmware upload:
/// `(value, index, word)`.
pub const FIRMWARE_BANK_SELECT: (u16, u16, u16) = (0x0900, 0x0070, 0x0004);

/// Bank contents checked after the idle firmware upload.
pub static IDLE_FIRMWARE_BANK: &[BankCheck] = &[
    BankCheck { index: 0x0010, expected: [0x20, 0x13] },
    BankCheck { index: 0x0012, expected: [0x12, 0x10] },
    BankCheck { index: 0x0014, expected: [0x18, 0x80] },
    BankCheck { index: 0x0016, expected: [0x20, 0x30] },
    BankCheck { index: 0x0018, expected: [0x20, 0x13] },
    BankCheck { index: 0x001a, expected: [0x12, 0x10] },
    BankCheck { index: 0x001c, expected: [0x18, 0x80] },
    BankCheck { index: 0x001e, expected: [0x20, 0x30] },
];

/// Bank contents checked after the encoder firmware upload.
pub static ENCODER_FIRMWARE_BANK: &[BankCheck] = &[
    BankCheck { index: 0x0010, expected: [0x20, 0x13] },
    BankCheck { index: 0x0012, expected: [0x12, 0x10] },
    BankCheck { index: 0x0014, expected: [0x18, 0x80] },
    BankCheck { index: 0x0016, expected: [0x20, 0x30] },
];

/// Encoder handshake, including the trigger pulse gated on its acknowledgement.
pub static ENCODER_HANDSHAKE: &[CalibrationStep] = &[
    mw(0x33, &[0x28, 0x28]),
    mq(0x33, &[0x29, 0x89, 0x5b], &[0x91]),
    mq(0x33, &[0xdd, 0xce, 0x3f, 0xb2], &[0xda, 0x67]),
    set_enable(EnableBits::ENCODER_TRIGGER, true),
    poll(0x33, &[0x43, 0x23, 0x84], 0xf7),
    set_enable(EnableBits::ENCODER_TRIGGER, false),
    mq(0x33, &[0x89, 0x89, 0xfb], &[0x6e]),
    mw(0x44, &[0x02, 0xc9]),
    mw(0x44, &[0x14, 0xd2]),
    mw(0x44, &[0x3c, 0x6b]),
    mq(0x33, &[0x89, 0x89, 0xfa], &[0xed]),
    mq(0x33, &[0x89, 0x89, 0xca], &[0xee]),
    mq(0x33, &[0x89, 0x89, 0xe7], &[0x49]),
    mw(0x44, &[0x03, 0x2a]),
    mw(0x44, &[0x05, 0x89]),
];

/// Front-end gain for analog sources.
pub static FRONT_END_ANALOG: &[CalibrationStep] = &[
    mw(0x44, &[0x08, 0x91]),
    mw(0x44, &[0x09, 0xa8]),
];

/// Front-end gain for HDMI.
pub static FRONT_END_HDMI: &[CalibrationStep] = &[
    mw(0x44, &[0x08, 0x9b]),
    mw(0x44, &[0x09, 0x7a]),
];

/// Front-end filter setup and scaler coefficients.
pub static FRONT_END_FILTERS: &[CalibrationStep] = &[
    mw(0x44, &[0x19, 0xde]),
    mw(0x44, &[0x1a, 0x87]),
    mw(0x44, &[0x1b, 0x88]),
    mw(0x44, &[0x29, 0x8b]),
    mw(0x44, &[0x2d, 0x8f]),
    mw(0x44, &[0x4c, 0x89]),
    mw(0x44, &[0x55, 0x88]),
    mw(0x44, &[0x6b, 0xae]),
    mw(0x44, &[0x6c, 0xbe]),
    mw(0x44, &[0x6d, 0x78]),
    mw(0x44, &[0x6e, 0xa0]),
    mw(0x44, &[0x06, 0x08]),
    mw(0x44, &[0x02, 0xc9]),
    mw(0x44, &[0x14, 0xd2]),
    mw(0x44, &[0x3c, 0x6b]),
    mq(0x33, &[0x89, 0x89, 0xfa], &[0xfd]),
    mw(0x44, &[0x28, 0x88]),
    mw(0x44, &[0x10, 0x88]),
    mw(0x44, &[0x11, 0xd4]),
    mw(0x44, &[0x12, 0xd0]),
    mw(0x44, &[0x13, 0x08]),
    mw(0x44, &[0x14, 0x08]),
    mw(0x44, &[0x15, 0x88]),
    mw(0x33, &[0x94, 0x47, 0xf9]),
    mw(0x33, &[0x94, 0x40, 0xf3]),
    mw(0x33, &[0x94, 0x43, 0xb7]),
    mw(0x33, &[0x94, 0x4e, 0xb7]),
    mw(0x33, &[0x94, 0x4f, 0xb7]),
    mw(0x33, &[0x94, 0x48, 0xb7]),
    mw(0x33, &[0x94, 0x49, 0xb7]),
    mw(0x33, &[0x94, 0x58, 0x77]),
    mw(0x33, &[0x94, 0x40, 0xf1]),
    mw(0x33, &[0x94, 0x4d, 0xf5]),
    mw(0x33, &[0x94, 0x4a, 0xaf]),
    mw(0x33, &[0x94, 0x4b, 0xaf]),
    mw(0x33, &[0x94, 0x5c, 0xb7]),
    mw(0x33, &[0x94, 0x46, 0xd7]),
];

/// Decoder registers up to the revision-specific clamp value.
pub static DECODER_SETUP: &[CalibrationStep] = &[
    rd(0x88, 0xb2),
    mw(0x4e, &[0xb7, 0xce]),
    mw(0x4e, &[0x41, 0xa3]),
    mw(0x4e, &[0xb8, 0xcc]),
    rd(0x3f, 0xb2),
    mw(0x4e, &[0x00, 0xcd]),
    mw(0x4e, &[0x0f, 0xce]),
    mw(0x4e, &[0x16, 0xfc]),
    mw(0x4e, &[0x17, 0xcc]),
    mw(0x4e, &[0x18, 0xcc]),
    mw(0x4e, &[0x19, 0xcc]),
    mw(0x4e, &[0x1a, 0x9c]),
    rd(0x15, 0xb2),
    mw(0x4e, &[0x2a, 0xcb]),
    rd(0x3f, 0xb3),
    mw(0x4e, &[0x00, 0xce]),
    mw(0x4e, &[0x08, 0xcf]),
    rd(0x3f, 0xb0),
    mw(0x4e, &[0x00, 0xcd]),
];

/// Decoder clamp, RevisionA.
pub static DECODER_CLAMP_REVISION_A: &[CalibrationStep] = &[
    mw(0x4e, &[0x24, 0x8d]),
];

/// Decoder clamp, RevisionB.
pub static DECODER_CLAMP_REVISION_B: &[CalibrationStep] = &[
    mw(0x4e, &[0x24, 0x8c]),
];

/// Decoder timing, status reads and sync endpoint setup.
pub static DECODER_TIMING: &[CalibrationStep] = &[
    mw(0x4e, &[0x25, 0xcc]),
    mw(0x4e, &[0x30, 0x4c]),
    mw(0x4e, &[0x31, 0xcc]),
    mw(0x4e, &[0x32, 0xcc]),
    mw(0x4e, &[0x25, 0xcc]),
    mw(0x4e, &[0x26, 0xcc]),
    mw(0x4e, &[0x27, 0xcc]),
    mw(0x4e, &[0x27, 0xcc]),
    mw(0x4e, &[0x27, 0xcc]),
    mw(0x4e, &[0x27, 0xcc]),
    mw(0x4e, &[0x27, 0xcc]),
    rd(0x3f, 0xb3),
    mw(0x4e, &[0x00, 0xcc]),
    mw(0x4e, &[0xb0, 0xe8]),
    rd(0x91, 0xb2),
    mw(0x4e, &[0xae, 0xc8]),
    mw(0x4e, &[0xb1, 0x0c]),
    mw(0x4e, &[0xb2, 0xcc]),
    mw(0x4e, &[0xb3, 0xcc]),
    mw(0x4e, &[0xb4, 0x99]),
    rd(0x8b, 0xe7),
    mw(0x4e, &[0xb4, 0x98]),
    rd(0x3f, 0xb2),
    mw(0x4e, &[0x00, 0xce]),
    mw(0x4e, &[0x01, 0xad]),
    mw(0x4e, &[0x02, 0x39]),
    rd(0x3c, 0xb2),
    mw(0x4e, &[0x03, 0xce]),
    mw(0x4e, &[0x04, 0xcd]),
    mw(0x4e, &[0x05, 0xcc]),
    mw(0x4e, &[0x06, 0xc4]),
    mw(0x4e, &[0x1c, 0xd6]),
    mw(0x4e, &[0x1d, 0xcc]),
    mw(0x4e, &[0x1e, 0xcc]),
    mw(0x4e, &[0x1f, 0xcc]),
    rd(0x1a, 0xb2),
    mw(0x4e, &[0x25, 0x6e]),
    rd(0x3d, 0x47),
    mw(0x4e, &[0x02, 0x39]),
    rd(0x38, 0xb2),
    mw(0x4e, &[0x07, 0xc8]),
    mw(0x4e, &[0x17, 0x0c]),
    mw(0x4e, &[0x19, 0x33]),
    mw(0x4e, &[0x1a, 0x33]),
    mw(0x4e, &[0x1b, 0x30]),
    mw(0x4e, &[0x20, 0xcc]),
    rd(0x1e, 0xb2),
    mw(0x4e, &[0x21, 0xcc]),
    mw(0x4e, &[0x22, 0xea]),
    mw(0x4e, &[0x27, 0xcc]),
    rd(0x11, 0xb2),
    mw(0x4e, &[0x2e, 0x6d]),
    mq(0x33, &[0x99, 0x89, 0xfa], &[0xa4]),
    mq(0x33, &[0x99, 0x89, 0xf9], &[0x7f]),
    mq(0x33, &[0x99, 0x89, 0xf8], &[0x78]),
    mq(0x33, &[0x99, 0x89, 0xfe], &[0x0e]),
    mw(0x4c, &[0x05, 0x88]),
    mw(0x4c, &[0x04, 0xb5]),
    mw(0x4c, &[0x04, 0x95]),
    mw(0x4c, &[0x61, 0xb8]),
    mw(0x4c, &[0x09, 0x3a]),
    mw(0x4c, &[0x0a, 0x70]),
    mw(0x4c, &[0x0b, 0xbf]),
    mw(0x4c, &[0xc9, 0x88]),
    mw(0x4c, &[0xca, 0x88]),
    mw(0x4c, &[0xcb, 0x88]),
    mw(0x4c, &[0xcc, 0x88]),
    mw(0x4c, &[0xcd, 0x88]),
    mw(0x4c, &[0xce, 0x88]),
    mw(0x4c, &[0xcf, 0x88]),
    mw(0x4c, &[0xd0, 0x88]),
];

/// Extra scaler writes only RevisionB takes.
pub static REVISION_B_SCALER: &[CalibrationStep] = &[
    mq(0x33, &[0x21, 0x01, 0x72], &[0xf4]),
    mw(0x33, &[0x20, 0x02, 0x63]),
    mw(0x33, &[0x20, 0x03, 0x63]),
    mw(0x33, &[0x20, 0x04, 0x77]),
    mw(0x33, &[0x20, 0x05, 0x73]),
    mw(0x33, &[0x20, 0x06, 0x73]),
    mw(0x33, &[0x20, 0x07, 0x33]),
    mw(0x33, &[0x20, 0x08, 0x31]),
    mw(0x33, &[0x20, 0x09, 0x33]),
    mw(0x33, &[0x20, 0x0a, 0x57]),
    mw(0x33, &[0x20, 0x0b, 0x7b]),
    mw(0x33, &[0x20, 0x0c, 0xf7]),
    mw(0x33, &[0x20, 0x0d, 0xf7]),
    mw(0x33, &[0x20, 0x0e, 0x73]),
    mw(0x33, &[0x20, 0x0f, 0x73]),
];

/// Commits the front-end configuration.
pub static FRONT_END_COMMIT: &[CalibrationStep] = &[
    mw(0x33, &[0xaa, 0x8f, 0x3b]),
];

/// Signal survey: 56-byte status windows, a checksum read and the activation commit.
pub static SIGNAL_SURVEY: &[CalibrationStep] = &[
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x03, 0x76], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x3b, 0x76], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x73, 0x76], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xab, 0x76], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xe3, 0x76], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x1b, 0x77], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x53, 0x77], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x8b, 0x77], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xc3, 0x77], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xfb, 0x77], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x33, 0x74], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x6b, 0x74], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xa3, 0x74], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xdb, 0x74], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x13, 0x75], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x4b, 0x75], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x83, 0x75], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xbb, 0x75], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xf3, 0x75], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x2b, 0x72], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x63, 0x72], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x9b, 0x72], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xd3, 0x72], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x0b, 0x73], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x43, 0x73], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x7b, 0x73], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xb3, 0x73], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xeb, 0x73], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x23, 0x70], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x5b, 0x70], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x93, 0x70], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xcb, 0x70], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x03, 0x71], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x3b, 0x71], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x73, 0x71], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xab, 0x71], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xe3, 0x71], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x1b, 0x7e], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x53, 0x7e], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x8b, 0x7e], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xc3, 0x7e], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xfb, 0x7e], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x33, 0x7f], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x6b, 0x7f], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xa3, 0x7f], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xdb, 0x7f], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x13, 0x7c], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x4b, 0x7c], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x83, 0x7c], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xbb, 0x7c], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xf3, 0x7c], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x2b, 0x7d], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x63, 0x7d], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x9b, 0x7d], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xd3, 0x7d], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x0b, 0x7a], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x43, 0x7a], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x7b, 0x7a], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xb3, 0x7a], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xeb, 0x7a], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x23, 0x7b], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x5b, 0x7b], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x93, 0x7b], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xcb, 0x7b], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x03, 0x78], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x3b, 0x78], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x73, 0x78], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xab, 0x78], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xe3, 0x78], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x1b, 0x79], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x53, 0x79], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0x8b, 0x79], 56),
    mq_any(0x33, &[0xab, 0x92, 0x3e, 0xb4, 0xc3, 0x79], 56),
    mq(0x33, &[0xab, 0xa2, 0x3e, 0xb4, 0xfb, 0x79], &[0xe9, 0x5c, 0xcf, 0x42, 0xb5, 0x28, 0x9b, 0x0e]),
    mw(0x33, &[0xaa, 0x8d, 0x35]),
];

// Post-activation segments. "Direct" covers every non-composite source.

/// Front-end parameter written once the encoder is active again.
pub static POST_INIT_DIRECT: &[CalibrationStep] = &[
    mw(0x44, &[0x06, 0x86]),
];

/// Composite replacement for the post-activation parameter write: a status query.
pub static POST_INIT_COMPOSITE: &[CalibrationStep] = &[
    mq(0x33, &[0x89, 0x89, 0xfd], &[0x6e]),
];

/// Status query shared by every source.
pub static POST_STATUS: &[CalibrationStep] = &[
    mq(0x33, &[0x89, 0x89, 0xf8], &[0xcc]),
];

/// Front-end gain after activation.
pub static POST_GAIN_DIRECT: &[CalibrationStep] = &[
    mw(0x44, &[0x03, 0x2f]),
];

/// Front-end gain after activation, composite.
pub static POST_GAIN_COMPOSITE: &[CalibrationStep] = &[
    mw(0x44, &[0x03, 0x28]),
];

/// Decoder status read and register select.
pub static POST_DECODER_SELECT: &[CalibrationStep] = &[
    rd(0x3f, 0xb0),
    mw(0x4e, &[0x00, 0xcc]),
];

/// Decoder clamp level.
pub static POST_CLAMP_DIRECT: &[CalibrationStep] = &[
    mw(0x4e, &[0xb3, 0xcc]),
];

/// Decoder clamp level, composite.
pub static POST_CLAMP_COMPOSITE: &[CalibrationStep] = &[
    mw(0x4e, &[0xb3, 0x33]),
];

/// Second decoder status read and register select.
pub static POST_DECODER_RESELECT: &[CalibrationStep] = &[
    rd(0x3f, 0xb2),
    mw(0x4e, &[0x00, 0xce]),
];

/// Closing decoder write.
pub static POST_TAIL_DIRECT: &[CalibrationStep] = &[
    mw(0x4e, &[0x27, 0xcc]),
];

/// Closing decoder writes, with the extra composite status reads.
pub static POST_TAIL_COMPOSITE: &[CalibrationStep] = &[
    mw(0x4e, &[0x27, 0x33]),
    rd_any(0x3f),
    mw(0x4e, &[0x00, 0xcc]),
    rd_any(0x6e),
    mw(0x4e, &[0x51, 0xcc]),
];

/// Handshake run before teardown; mirrors the post-activation parameters.
pub static QUIESCE_HANDSHAKE: &[CalibrationStep] = &[
    mw(0x44, &[0x06, 0x86]),
    mq(0x33, &[0x89, 0x89, 0xf8], &[0xc9]),
    mw(0x44, &[0x03, 0x2f]),
];
