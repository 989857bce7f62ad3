//! Calibration Programs
//!
//! The front-end, decoder and scaler setup is an opaque sequence of mailbox
//! writes, queries and decoder reads. It is kept as data: static segments in
//! [`tables`], selected by device revision and input source and concatenated
//! into a [`CalibrationProgram`] that a [`DeviceLink`] replays in order.
//!
//! Expected values on queries and decoder reads are the ones the device is
//! documented to return. They go through [`DeviceLink::verify`], so a drift is
//! either recorded or fatal depending on the session's verification policy.

pub mod tables;

use serde::Serialize;

use crate::device::revision::DeviceRevision;
use crate::device::{DeviceLink, EnableBits};
use crate::signal::InputSource;
use crate::transport::registers::bank_address;
use crate::transport::RegisterTransport;
use crate::Result;

use tables::BankCheck;

/// Version of the captured calibration tables.
pub const CALIBRATION_TABLE_VERSION: &str = "2015.1";

/// One register-level action of a calibration program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CalibrationStep {
    /// Mailbox write
    Write {
        /// Endpoint number
        endpoint: u8,
        /// Payload
        data: &'static [u8],
    },
    /// Mailbox write followed by a read of `count` bytes
    Query {
        /// Endpoint number
        endpoint: u8,
        /// Command payload
        command: &'static [u8],
        /// Bytes to read back
        count: usize,
        /// Documented answer, if there is one
        expected: Option<&'static [u8]>,
    },
    /// Single-byte decoder register read
    ReadDevice {
        /// Decoder register
        address: u8,
        /// Documented value, if there is one
        expected: Option<u8>,
    },
    /// Set or clear enable bits
    SetEnable {
        /// Bits to change
        bits: EnableBits,
        /// New value of those bits
        on: bool,
    },
    /// Repeat a query until its single-byte answer matches `until`
    PollMailbox {
        /// Endpoint number
        endpoint: u8,
        /// Command payload
        command: &'static [u8],
        /// Answer that ends the poll
        until: u8,
    },
}

/// Named slice of a calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Table name, used in logs and verification contexts
    pub name: &'static str,
    /// Steps in order
    pub steps: &'static [CalibrationStep],
}

impl Segment {
    const fn new(name: &'static str, steps: &'static [CalibrationStep]) -> Self {
        Segment { name, steps }
    }
}

/// Ordered selection of table segments for one point of the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalibrationProgram {
    segments: Vec<Segment>,
}

impl CalibrationProgram {
    /// Encoder handshake, front-end, decoder and scaler setup, and the
    /// signal survey that ends in the activation commit.
    ///
    /// Any source other than HDMI takes the analog front-end gain.
    pub fn front_end(revision: DeviceRevision, source: InputSource) -> Self {
        let mut segments = vec![Segment::new("encoder_handshake", tables::ENCODER_HANDSHAKE)];

        segments.push(match source {
            InputSource::Hdmi => Segment::new("front_end_hdmi", tables::FRONT_END_HDMI),
            _ => Segment::new("front_end_analog", tables::FRONT_END_ANALOG),
        });
        segments.push(Segment::new("front_end_filters", tables::FRONT_END_FILTERS));
        segments.push(Segment::new("decoder_setup", tables::DECODER_SETUP));

        segments.push(match revision {
            DeviceRevision::RevisionA => {
                Segment::new("decoder_clamp_revision_a", tables::DECODER_CLAMP_REVISION_A)
            }
            DeviceRevision::RevisionB => {
                Segment::new("decoder_clamp_revision_b", tables::DECODER_CLAMP_REVISION_B)
            }
        });
        segments.push(Segment::new("decoder_timing", tables::DECODER_TIMING));

        if revision == DeviceRevision::RevisionB {
            segments.push(Segment::new("revision_b_scaler", tables::REVISION_B_SCALER));
        }

        segments.push(Segment::new("front_end_commit", tables::FRONT_END_COMMIT));
        segments.push(Segment::new("signal_survey", tables::SIGNAL_SURVEY));

        CalibrationProgram { segments }
    }

    /// Mailbox traffic issued once the encoder is active again.
    ///
    /// Only composite differs from the other sources here.
    pub fn post_activation(source: InputSource) -> Self {
        let composite = source == InputSource::Composite;
        let pick = |direct: Segment, composite_segment: Segment| {
            if composite {
                composite_segment
            } else {
                direct
            }
        };

        let segments = vec![
            pick(
                Segment::new("post_init_direct", tables::POST_INIT_DIRECT),
                Segment::new("post_init_composite", tables::POST_INIT_COMPOSITE),
            ),
            Segment::new("post_status", tables::POST_STATUS),
            pick(
                Segment::new("post_gain_direct", tables::POST_GAIN_DIRECT),
                Segment::new("post_gain_composite", tables::POST_GAIN_COMPOSITE),
            ),
            Segment::new("post_decoder_select", tables::POST_DECODER_SELECT),
            pick(
                Segment::new("post_clamp_direct", tables::POST_CLAMP_DIRECT),
                Segment::new("post_clamp_composite", tables::POST_CLAMP_COMPOSITE),
            ),
            Segment::new("post_decoder_reselect", tables::POST_DECODER_RESELECT),
            pick(
                Segment::new("post_tail_direct", tables::POST_TAIL_DIRECT),
                Segment::new("post_tail_composite", tables::POST_TAIL_COMPOSITE),
            ),
        ];

        CalibrationProgram { segments }
    }

    /// Handshake issued at the start of a teardown.
    pub fn quiesce() -> Self {
        CalibrationProgram {
            segments: vec![Segment::new("quiesce_handshake", tables::QUIESCE_HANDSHAKE)],
        }
    }

    /// Selected segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &'static CalibrationStep> + '_ {
        self.segments.iter().flat_map(|segment| segment.steps.iter())
    }

    /// Total number of steps
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.steps.len()).sum()
    }

    /// True if no step is selected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: RegisterTransport> DeviceLink<T> {
    /// Replay a calibration program.
    pub fn run_program(&mut self, program: &CalibrationProgram) -> Result<()> {
        for segment in program.segments() {
            log::debug!("calibration: {} ({} steps)", segment.name, segment.steps.len());
            for (index, step) in segment.steps.iter().enumerate() {
                self.run_step(segment.name, index, step)?;
            }
        }
        Ok(())
    }

    fn run_step(&mut self, segment: &str, index: usize, step: &CalibrationStep) -> Result<()> {
        match *step {
            CalibrationStep::Write { endpoint, data } => self.mail_write(endpoint, data),
            CalibrationStep::Query {
                endpoint,
                command,
                count,
                expected,
            } => {
                self.mail_write(endpoint, command)?;
                let answer = self.mail_read(endpoint, count)?;
                match expected {
                    Some(expected) => {
                        let context = format!("{segment}[{index}] query {command:02x?}");
                        self.verify(&context, expected, &answer)
                    }
                    None => Ok(()),
                }
            }
            CalibrationStep::ReadDevice { address, expected } => {
                let value = self.read_device_9dcd(address)?;
                match expected {
                    Some(expected) => {
                        let context = format!("{segment}[{index}] decoder 0x{address:02x}");
                        self.verify(&context, &[expected], &[value])
                    }
                    None => Ok(()),
                }
            }
            CalibrationStep::SetEnable { bits, on } => {
                let value = if on { bits } else { EnableBits::empty() };
                self.do_enable(bits, value).map(|_| ())
            }
            CalibrationStep::PollMailbox {
                endpoint,
                command,
                until,
            } => self.poll_until("mailbox acknowledgement", |link| {
                link.mail_write(endpoint, command)?;
                let answer = link.mail_read(endpoint, 1)?;
                Ok((answer[0] == until).then_some(()))
            }),
        }
    }

    /// Read the verification bank and compare it against `checks`.
    pub fn verify_bank(&mut self, context: &str, checks: &[BankCheck]) -> Result<()> {
        for check in checks {
            let address = bank_address(tables::VERIFY_BANK_VALUE, check.index);
            let actual = self.read_raw(address, 2)?;
            let context = format!("{context} bank 0x{:04x}", check.index);
            self.verify(&context, &check.expected, &actual)?;
        }
        Ok(())
    }

    /// Bank-select write that follows the idle firmware upload.
    pub fn select_firmware_bank(&mut self) -> Result<()> {
        let (value, index, word) = tables::FIRMWARE_BANK_SELECT;
        self.write_raw(bank_address(value, index), &word.to_be_bytes())
    }
}
