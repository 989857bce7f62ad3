//! SCMD State-Change Protocol
//!
//! Coarse device states (idle, init, reset) are changed by writing a command
//! word and confirmed by polling the state readback register. Nothing is
//! assumed reached until a read says so.

use std::fmt;

use num_derive::FromPrimitive;
use serde::Serialize;

use crate::transport::{Register, RegisterTransport};
use crate::Result;

use super::DeviceLink;

/// Bits of the readback register that carry the state code.
pub const STATE_MASK: u16 = 0x001f;
/// Readback flag set once a direct state change has completed.
pub const STATE_CHANGE_DONE: u16 = 0x0100;
/// Sticky completion bit raised by the interrupt-driven readback.
pub const COMPLETION_INTERRUPT: u16 = 0x0004;

/// Never initialized
pub const STATE_BOOT: u16 = 0x00;
/// Idle
pub const STATE_IDLE: u16 = 0x01;
/// Streaming
pub const STATE_START: u16 = 0x02;
/// Encoder initialized
pub const STATE_INIT: u16 = 0x04;
/// Null state, pipeline still running
pub const STATE_NULL: u16 = 0x08;
/// Reset; bit 1 carries the reset mode
pub const STATE_RESET: u16 = 0x10;

/// SCMD command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum ScmdCommand {
    /// Go idle
    Idle = 0x01,
    /// Initialize encoder
    Init = 0x04,
    /// Reset
    Reset = 0x07,
}

impl ScmdCommand {
    /// Readback state the device settles in after this command.
    pub fn resulting_state(self, mode: u8) -> u16 {
        match self {
            ScmdCommand::Idle => STATE_IDLE,
            ScmdCommand::Init => STATE_INIT,
            ScmdCommand::Reset => STATE_RESET | (((mode & 0x01) as u16) << 1),
        }
    }
}

/// Decoded SCMD readback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmdState {
    /// Never initialized (0x00)
    Boot,
    /// Idle (0x01)
    Idle,
    /// Streaming (0x02)
    Start,
    /// Encoder initialized (0x04)
    Init,
    /// Null (0x08)
    Null,
    /// Reset with the given mode (0x10 / 0x12)
    Reset {
        /// Reset mode the device was put in
        mode: u8,
    },
    /// Any other code
    Unknown(u16),
}

impl ScmdState {
    /// Decode a readback value; bits outside [`STATE_MASK`] are ignored.
    pub fn from_code(raw: u16) -> Self {
        match raw & STATE_MASK {
            STATE_BOOT => ScmdState::Boot,
            STATE_IDLE => ScmdState::Idle,
            STATE_START => ScmdState::Start,
            STATE_INIT => ScmdState::Init,
            STATE_NULL => ScmdState::Null,
            0x10 => ScmdState::Reset { mode: 0 },
            0x12 => ScmdState::Reset { mode: 1 },
            other => ScmdState::Unknown(other),
        }
    }

    /// Five-bit state code
    pub fn code(&self) -> u16 {
        match self {
            ScmdState::Boot => STATE_BOOT,
            ScmdState::Idle => STATE_IDLE,
            ScmdState::Start => STATE_START,
            ScmdState::Init => STATE_INIT,
            ScmdState::Null => STATE_NULL,
            ScmdState::Reset { mode } => STATE_RESET | (((*mode & 0x01) as u16) << 1),
            ScmdState::Unknown(code) => *code,
        }
    }

    /// Whether the capture pipeline may still be streaming.
    pub fn is_streaming(&self) -> bool {
        matches!(self, ScmdState::Start | ScmdState::Null)
    }

    /// Whether the device is already shut down (never initialized or reset).
    pub fn is_quiesced(&self) -> bool {
        matches!(self, ScmdState::Boot | ScmdState::Reset { .. })
    }
}

impl fmt::Display for ScmdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmdState::Boot => write!(f, "BOOT"),
            ScmdState::Idle => write!(f, "IDLE"),
            ScmdState::Start => write!(f, "START"),
            ScmdState::Init => write!(f, "INIT"),
            ScmdState::Null => write!(f, "NULL"),
            ScmdState::Reset { mode } => write!(f, "RESET(mode {mode})"),
            ScmdState::Unknown(code) => write!(f, "UNKNOWN(0x{code:02x})"),
        }
    }
}

impl<T: RegisterTransport> DeviceLink<T> {
    /// Issue a state-change command without waiting for it.
    pub fn scmd(&mut self, command: ScmdCommand, mode: u8, param: u16) -> Result<()> {
        let [param_hi, param_lo] = param.to_be_bytes();
        log::debug!("scmd {command:?} mode 0x{mode:02x} param 0x{param:04x}");
        self.write_raw(
            Register::ScmdCommand.into(),
            &[command as u8, mode, param_hi, param_lo],
        )
    }

    /// Current state code, masked to the state bits.
    pub fn read_scmd_state(&mut self) -> Result<u16> {
        Ok(self.read_register(Register::ScmdStateReadback)? & STATE_MASK)
    }

    /// Request a direct state change and wait for it.
    ///
    /// Returns as soon as the readback shows a state other than `current`;
    /// with `current == 0` this is how an already booted device is spotted.
    /// Otherwise returns once the readback reports the change done.
    pub fn complete_state_change(&mut self, current: u16, next: u16) -> Result<u16> {
        self.write_register(Register::ScmdStateChange, next)?;
        self.poll_until("SCMD state change", |link| {
            let raw = link.read_register(Register::ScmdStateReadback)?;
            let state = raw & STATE_MASK;
            if state != current || raw & STATE_CHANGE_DONE != 0 {
                Ok(Some(state))
            } else {
                Ok(None)
            }
        })
    }

    /// Raise the interrupt that makes the device publish its boot state.
    pub fn interrupt_pend(&mut self) -> Result<()> {
        self.write_register(Register::InterruptPend, 0x0001)
    }

    /// Wait for the sticky completion bit, then acknowledge it.
    pub fn await_completion_interrupt(&mut self) -> Result<()> {
        self.poll_until("SCMD completion interrupt", |link| {
            let flags = link.read_register(Register::ScmdStateChangeComplete)?;
            Ok((flags & COMPLETION_INTERRUPT != 0).then_some(()))
        })?;
        self.write_register(Register::ScmdStateChangeComplete, COMPLETION_INTERRUPT)
    }

    /// Issue a command and block until the readback confirms its state.
    pub fn state_confirmed_scmd(&mut self, command: ScmdCommand, mode: u8, param: u16) -> Result<()> {
        self.scmd(command, mode, param)?;
        let expected = command.resulting_state(mode);
        self.poll_until("SCMD state confirmation", |link| {
            let state = link.read_scmd_state()?;
            Ok((state == expected).then_some(()))
        })?;
        log::debug!("scmd {command:?} confirmed in {}", ScmdState::from_code(expected));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerificationPolicy;
    use crate::device::revision::DeviceRevision;
    use crate::poll::PollPolicy;
    use crate::transport::simulated::SimulatedDevice;
    use crate::BringupError;
    use num_traits::FromPrimitive;
    use std::time::Duration;

    fn link(device: SimulatedDevice, poll: PollPolicy) -> DeviceLink<SimulatedDevice> {
        DeviceLink::new(device, poll, VerificationPolicy::Advisory)
    }

    #[test]
    fn test_state_decoding() {
        assert_eq!(ScmdState::from_code(0x0000), ScmdState::Boot);
        assert_eq!(ScmdState::from_code(0x0112), ScmdState::Reset { mode: 1 });
        assert_eq!(ScmdState::from_code(0x0010), ScmdState::Reset { mode: 0 });
        assert_eq!(ScmdState::from_code(0x0003), ScmdState::Unknown(0x03));
        assert!(ScmdState::from_code(STATE_NULL).is_streaming());
        assert!(ScmdState::from_code(0x12).is_quiesced());
        assert!(!ScmdState::Init.is_quiesced());
        assert_eq!(ScmdState::Reset { mode: 1 }.code(), 0x12);
    }

    #[test]
    fn test_command_opcodes() {
        assert_eq!(ScmdCommand::from_u8(0x07), Some(ScmdCommand::Reset));
        assert_eq!(ScmdCommand::from_u8(0x02), None);
        assert_eq!(ScmdCommand::Reset.resulting_state(1), 0x12);
        assert_eq!(ScmdCommand::Reset.resulting_state(0), 0x10);
        assert_eq!(ScmdCommand::Init.resulting_state(0xa0), STATE_INIT);
    }

    #[test]
    fn test_confirmed_scmd_waits_for_readback() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionA).with_settle_reads(4);
        let mut link = link(device, PollPolicy::unbounded());
        link.state_confirmed_scmd(ScmdCommand::Idle, 0, 0).unwrap();
        assert_eq!(link.read_scmd_state().unwrap(), STATE_IDLE);
    }

    #[test]
    fn test_complete_state_change_on_fresh_device() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionA);
        let mut link = link(device, PollPolicy::unbounded());
        assert_eq!(link.complete_state_change(0, 0).unwrap(), STATE_BOOT);
    }

    #[test]
    fn test_complete_state_change_reports_running_device() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionA).with_scmd_state(STATE_INIT);
        let mut link = link(device, PollPolicy::unbounded());
        assert_eq!(link.complete_state_change(0, 0).unwrap(), STATE_INIT);
    }

    #[test]
    fn test_completion_interrupt_is_acknowledged() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionB).with_settle_reads(2);
        let mut link = link(device, PollPolicy::unbounded());
        link.interrupt_pend().unwrap();
        link.await_completion_interrupt().unwrap();
        let flags = link.read_register(Register::ScmdStateChangeComplete).unwrap();
        assert_eq!(flags & COMPLETION_INTERRUPT, 0);
    }

    #[test]
    fn test_stuck_device_times_out() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionA).with_stuck_scmd();
        let mut link = link(device, PollPolicy::bounded(5, Duration::ZERO));
        let err = link
            .state_confirmed_scmd(ScmdCommand::Idle, 0, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            BringupError::Timeout {
                operation: "SCMD state confirmation",
                attempts: 5
            }
        ));
    }
}
