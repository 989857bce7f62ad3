//! Device Mode Detection
//!
//! The onboard processor reports its bring-up milestone as a 24-bit "mode
//! magic" on the command endpoint. The host only observes these; the device
//! moves between them on its own.

use std::fmt;

use serde::Serialize;

use crate::transport::RegisterTransport;
use crate::Result;

use super::mailbox::ENDPOINT_COMMAND;
use super::DeviceLink;

/// Magic reported before the processor is running
pub const MAGIC_UNPROGRAMMED: u32 = 0x334455;
/// Magic reported once the processor is up and the encoder can be loaded
pub const MAGIC_ENCODER_READY: u32 = 0x27f97b;
/// Magic reported while the encoder is active
pub const MAGIC_ENCODER_ACTIVE: u32 = 0x78e045;

/// Firmware bring-up milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceModePhase {
    /// Processor not yet running
    Unprogrammed,
    /// Processor enabled; no magic of its own has been observed for it
    ProcessorEnabled,
    /// Ready for the encoder
    EncoderReady,
    /// Encoder running
    EncoderActive,
    /// Any other magic
    Unrecognized(u32),
}

impl DeviceModePhase {
    /// Map a 24-bit magic value to its phase.
    pub fn from_magic(magic: u32) -> Self {
        match magic {
            MAGIC_UNPROGRAMMED => DeviceModePhase::Unprogrammed,
            MAGIC_ENCODER_READY => DeviceModePhase::EncoderReady,
            MAGIC_ENCODER_ACTIVE => DeviceModePhase::EncoderActive,
            other => DeviceModePhase::Unrecognized(other),
        }
    }

    /// Magic value of this phase, where one is known
    pub fn magic(&self) -> Option<u32> {
        match self {
            DeviceModePhase::Unprogrammed => Some(MAGIC_UNPROGRAMMED),
            DeviceModePhase::ProcessorEnabled => None,
            DeviceModePhase::EncoderReady => Some(MAGIC_ENCODER_READY),
            DeviceModePhase::EncoderActive => Some(MAGIC_ENCODER_ACTIVE),
            DeviceModePhase::Unrecognized(code) => Some(*code),
        }
    }
}

impl fmt::Display for DeviceModePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceModePhase::Unprogrammed => write!(f, "unprogrammed"),
            DeviceModePhase::ProcessorEnabled => write!(f, "processor enabled"),
            DeviceModePhase::EncoderReady => write!(f, "encoder ready"),
            DeviceModePhase::EncoderActive => write!(f, "encoder active"),
            DeviceModePhase::Unrecognized(code) => write!(f, "unrecognized 0x{code:06x}"),
        }
    }
}

/// Which probe command to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeProbe {
    /// Probe used while bringing the processor up
    Ready,
    /// Probe used while waiting for the encoder to activate
    Activation,
}

impl ModeProbe {
    /// Five-byte probe command
    pub fn payload(self) -> [u8; 5] {
        match self {
            ModeProbe::Ready => [0xab, 0xa9, 0x0f, 0xa4, 0x55],
            ModeProbe::Activation => [0xab, 0xa9, 0x0f, 0xa4, 0x5b],
        }
    }
}

/// Interpret three bytes as a big-endian 24-bit value.
pub fn magic_from_bytes(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(3)
        .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

impl<T: RegisterTransport> DeviceLink<T> {
    /// Send a mode probe and return the 3-byte answer.
    pub fn probe_mode_raw(&mut self, probe: ModeProbe) -> Result<Vec<u8>> {
        self.mail_write(ENDPOINT_COMMAND, &probe.payload())?;
        self.mail_read(ENDPOINT_COMMAND, 3)
    }

    /// Send a mode probe and decode the phase.
    pub fn probe_mode(&mut self, probe: ModeProbe) -> Result<DeviceModePhase> {
        let answer = self.probe_mode_raw(probe)?;
        let phase = DeviceModePhase::from_magic(magic_from_bytes(&answer));
        log::trace!("mode probe {probe:?}: {phase}");
        self.note_phase(phase);
        Ok(phase)
    }

    /// Probe until the device reports `target`.
    ///
    /// With `keep_analog_live` the analog input is re-asserted after every
    /// probe; the device drops it while it is being re-probed.
    pub fn wait_for_phase(
        &mut self,
        probe: ModeProbe,
        target: DeviceModePhase,
        keep_analog_live: bool,
    ) -> Result<()> {
        self.poll_until("device mode", |link| {
            let phase = link.probe_mode(probe)?;
            if keep_analog_live {
                link.enable_analog_input()?;
            }
            Ok((phase == target).then_some(()))
        })?;
        log::debug!("device reached {target}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_lookup() {
        assert_eq!(DeviceModePhase::from_magic(0x334455), DeviceModePhase::Unprogrammed);
        assert_eq!(DeviceModePhase::from_magic(0x27f97b), DeviceModePhase::EncoderReady);
        assert_eq!(DeviceModePhase::from_magic(0x78e045), DeviceModePhase::EncoderActive);
        assert_eq!(
            DeviceModePhase::from_magic(0x000000),
            DeviceModePhase::Unrecognized(0)
        );
        assert_eq!(
            DeviceModePhase::from_magic(0xffffff),
            DeviceModePhase::Unrecognized(0xffffff)
        );
    }

    #[test]
    fn test_magic_is_big_endian() {
        assert_eq!(magic_from_bytes(&[0x27, 0xf9, 0x7b]), 0x27f97b);
        assert_eq!(magic_from_bytes(&[0x78, 0xe0, 0x45]), MAGIC_ENCODER_ACTIVE);
    }

    #[test]
    fn test_phase_magic_roundtrip() {
        for phase in [
            DeviceModePhase::Unprogrammed,
            DeviceModePhase::EncoderReady,
            DeviceModePhase::EncoderActive,
        ] {
            let magic = phase.magic().unwrap();
            assert_eq!(DeviceModePhase::from_magic(magic), phase);
        }
        assert_eq!(DeviceModePhase::ProcessorEnabled.magic(), None);
    }

    #[test]
    fn test_probe_payloads_differ_in_last_byte() {
        let ready = ModeProbe::Ready.payload();
        let activation = ModeProbe::Activation.payload();
        assert_eq!(ready[..4], activation[..4]);
        assert_eq!(ready[4], 0x55);
        assert_eq!(activation[4], 0x5b);
    }
}
