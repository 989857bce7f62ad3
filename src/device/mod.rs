//! Device Link
//!
//! [`DeviceLink`] wraps the register transport with what every higher layer
//! needs: the enable bitmask, the verification bookkeeping and the poll
//! bound. The mailbox channel, SCMD protocol and mode probe are implemented
//! on it in the submodules.

pub mod mailbox;
pub mod mode;
pub mod revision;
pub mod scmd;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::VerificationPolicy;
use crate::poll::PollPolicy;
use crate::transport::registers::{version_address, FIRMWARE_VERSION_LEN};
use crate::transport::{ConfigAddress, Register, RegisterTransport};
use crate::{BringupError, Result};

use mode::DeviceModePhase;

bitflags! {
    /// Subsystem gates in the enable register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EnableBits: u16 {
        /// Onboard firmware processor
        const FIRMWARE_PROCESSOR = 0x0001;
        /// Encoder core
        const ENCODER_ENABLE = 0x0002;
        /// Encoder trigger, pulsed during calibration
        const ENCODER_TRIGGER = 0x0004;
        /// Analog front end
        const ANALOG_INPUT = 0x0010;
        /// Analog input multiplexer
        const ANALOG_MUX = 0x0020;
        /// Composite input multiplexer
        const COMPOSITE_MUX = 0x0040;
    }
}

/// A verification read that disagreed with its documented value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationMismatch {
    /// Where in the sequence the read happened
    pub context: String,
    /// Documented value
    pub expected: Vec<u8>,
    /// Value the device returned
    pub actual: Vec<u8>,
}

/// Register transport plus session-wide policies.
pub struct DeviceLink<T> {
    transport: T,
    poll: PollPolicy,
    verification: VerificationPolicy,
    mismatches: Vec<VerificationMismatch>,
    phases: Vec<DeviceModePhase>,
}

impl<T: RegisterTransport> DeviceLink<T> {
    /// Wrap a transport.
    pub fn new(transport: T, poll: PollPolicy, verification: VerificationPolicy) -> Self {
        Self {
            transport,
            poll,
            verification,
            mismatches: Vec::new(),
            phases: Vec::new(),
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Poll bound in effect
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Read a 16-bit register.
    pub fn read_register(&mut self, register: Register) -> Result<u16> {
        Ok(self.transport.read_u16(register.into())?)
    }

    /// Write a 16-bit register.
    pub fn write_register(&mut self, register: Register, value: u16) -> Result<()> {
        Ok(self.transport.write_u16(register.into(), value)?)
    }

    /// Raw read at any address.
    pub fn read_raw(&mut self, address: ConfigAddress, len: usize) -> Result<Vec<u8>> {
        Ok(self.transport.read_config(address, len)?)
    }

    /// Raw write at any address.
    pub fn write_raw(&mut self, address: ConfigAddress, data: &[u8]) -> Result<()> {
        Ok(self.transport.write_config(address, data)?)
    }

    /// Select a register bank.
    pub fn select_bank(&mut self, bank: u16) -> Result<()> {
        self.write_register(Register::BankSelect, bank)
    }

    /// Read-modify-write the enable register.
    ///
    /// Only bits in `mask` change; they take their value from `value`.
    pub fn do_enable(&mut self, mask: EnableBits, value: EnableBits) -> Result<EnableBits> {
        let current = self.read_register(Register::Enable)?;
        let updated = (current & !mask.bits()) | (value.bits() & mask.bits());
        self.write_register(Register::Enable, updated)?;
        log::trace!("enable 0x{current:04x} -> 0x{updated:04x}");
        Ok(EnableBits::from_bits_retain(updated))
    }

    /// Turn the analog front end on.
    pub fn enable_analog_input(&mut self) -> Result<()> {
        self.do_enable(EnableBits::ANALOG_INPUT, EnableBits::ANALOG_INPUT)?;
        Ok(())
    }

    /// Clear every enable bit.
    pub fn clear_enable_state(&mut self) -> Result<()> {
        self.write_register(Register::Enable, 0x0000)
    }

    /// Read the enable state mirrored to the processor.
    pub fn read_enable_state(&mut self) -> Result<u16> {
        self.read_register(Register::EnableState)
    }

    /// Firmware version string, cut at its NUL terminator.
    pub fn read_firmware_version(&mut self) -> Result<String> {
        let raw = self.read_raw(version_address(), FIRMWARE_VERSION_LEN)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).trim().to_string())
    }

    /// Push a previously read enable state back to the processor.
    pub fn send_enable_state(&mut self, state: u16) -> Result<()> {
        self.write_register(Register::EnableState, state)
    }

    /// Compare a verification read against its documented value.
    ///
    /// Mismatches are logged and recorded; under
    /// [`VerificationPolicy::Strict`] they also end the sequence.
    pub fn verify(&mut self, context: &str, expected: &[u8], actual: &[u8]) -> Result<()> {
        if expected == actual {
            return Ok(());
        }

        log::warn!("{context}: expected {expected:02x?}, got {actual:02x?}");
        let mismatch = VerificationMismatch {
            context: context.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        };
        self.mismatches.push(mismatch.clone());

        match self.verification {
            VerificationPolicy::Advisory => Ok(()),
            VerificationPolicy::Strict => Err(BringupError::Verification {
                context: mismatch.context,
                expected: mismatch.expected,
                actual: mismatch.actual,
            }),
        }
    }

    /// Mismatches recorded so far
    pub fn mismatches(&self) -> &[VerificationMismatch] {
        &self.mismatches
    }

    /// Drain the recorded mismatches.
    pub fn take_mismatches(&mut self) -> Vec<VerificationMismatch> {
        std::mem::take(&mut self.mismatches)
    }

    /// Record a phase milestone; repeats of the latest one are folded.
    pub fn note_phase(&mut self, phase: DeviceModePhase) {
        if self.phases.last() != Some(&phase) {
            self.phases.push(phase);
        }
    }

    /// Phase milestones seen so far
    pub fn phases(&self) -> &[DeviceModePhase] {
        &self.phases
    }

    /// Drain the phase milestones.
    pub fn take_phases(&mut self) -> Vec<DeviceModePhase> {
        std::mem::take(&mut self.phases)
    }

    /// Repeat `attempt` under the session's poll bound.
    pub fn poll_until<R, F>(&mut self, operation: &'static str, mut attempt: F) -> Result<R>
    where
        F: FnMut(&mut Self) -> Result<Option<R>>,
    {
        let policy = self.poll;
        policy.run(operation, || attempt(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::revision::DeviceRevision;
    use crate::transport::simulated::SimulatedDevice;

    fn link(verification: VerificationPolicy) -> DeviceLink<SimulatedDevice> {
        DeviceLink::new(
            SimulatedDevice::new(DeviceRevision::RevisionA),
            PollPolicy::unbounded(),
            verification,
        )
    }

    #[test]
    fn test_do_enable_preserves_other_bits() {
        let mut link = link(VerificationPolicy::Advisory);
        link.write_register(Register::Enable, 0x0031).unwrap();

        let bits = link
            .do_enable(EnableBits::ENCODER_ENABLE, EnableBits::ENCODER_ENABLE)
            .unwrap();
        assert_eq!(bits.bits(), 0x0033);

        let bits = link
            .do_enable(EnableBits::ANALOG_INPUT, EnableBits::empty())
            .unwrap();
        assert_eq!(bits.bits(), 0x0023);
        assert_eq!(link.read_register(Register::Enable).unwrap(), 0x0023);
    }

    #[test]
    fn test_do_enable_ignores_value_bits_outside_mask() {
        let mut link = link(VerificationPolicy::Advisory);
        let bits = link
            .do_enable(EnableBits::ANALOG_MUX, EnableBits::all())
            .unwrap();
        assert_eq!(bits, EnableBits::ANALOG_MUX);
    }

    #[test]
    fn test_advisory_verification_records() {
        let mut link = link(VerificationPolicy::Advisory);
        link.verify("probe", &[0x01], &[0x01]).unwrap();
        link.verify("probe", &[0x01], &[0x02]).unwrap();
        assert_eq!(link.mismatches().len(), 1);
        assert_eq!(link.take_mismatches()[0].actual, vec![0x02]);
        assert!(link.mismatches().is_empty());
    }

    #[test]
    fn test_strict_verification_fails() {
        let mut link = link(VerificationPolicy::Strict);
        let err = link.verify("probe", &[0xb2], &[0xb3]).unwrap_err();
        assert!(matches!(err, BringupError::Verification { .. }));
    }

    #[test]
    fn test_phase_milestones_fold_repeats() {
        let mut link = link(VerificationPolicy::Advisory);
        link.note_phase(DeviceModePhase::Unprogrammed);
        link.note_phase(DeviceModePhase::Unprogrammed);
        link.note_phase(DeviceModePhase::EncoderReady);
        link.note_phase(DeviceModePhase::Unprogrammed);
        assert_eq!(
            link.take_phases(),
            vec![
                DeviceModePhase::Unprogrammed,
                DeviceModePhase::EncoderReady,
                DeviceModePhase::Unprogrammed,
            ]
        );
        assert!(link.phases().is_empty());
    }

    #[test]
    fn test_firmware_version_stops_at_nul() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionB).with_firmware_version("2.10.0123");
        let mut link = DeviceLink::new(device, PollPolicy::unbounded(), VerificationPolicy::Advisory);
        assert_eq!(link.read_firmware_version().unwrap(), "2.10.0123");
    }
}
