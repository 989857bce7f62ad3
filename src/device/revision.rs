//! Hardware Revisions
//!
//! Two device generations share the bring-up sequence but read their boot
//! state differently: the older one answers a direct state-change request,
//! the newer one raises an interrupt when the readback register is touched
//! and has to be acknowledged. Each has a [`BootStateStrategy`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transport::{Register, RegisterTransport};
use crate::{BringupError, Result};

use super::scmd::{STATE_BOOT, STATE_MASK};
use super::DeviceLink;

/// Hardware generation of the attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRevision {
    /// Original generation, polled state readback
    #[default]
    #[serde(alias = "a")]
    RevisionA,
    /// Newer generation, interrupt-driven state readback
    #[serde(alias = "b")]
    RevisionB,
}

impl DeviceRevision {
    /// Read (and if necessary settle) the boot-time SCMD state.
    ///
    /// Zero means no firmware is loaded.
    pub fn settle_boot_state<T: RegisterTransport>(self, link: &mut DeviceLink<T>) -> Result<u16> {
        match self {
            DeviceRevision::RevisionA => PolledReadback.settle_boot_state(link),
            DeviceRevision::RevisionB => InterruptReadback.settle_boot_state(link),
        }
    }

    /// Enable-state value the device reports at teardown.
    pub fn quiescing_enable_state(self) -> u16 {
        match self {
            DeviceRevision::RevisionA => 0x031e,
            DeviceRevision::RevisionB => 0xd39e,
        }
    }

    /// Short name
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRevision::RevisionA => "revision-a",
            DeviceRevision::RevisionB => "revision-b",
        }
    }
}

impl fmt::Display for DeviceRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceRevision {
    type Err = BringupError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "a" | "revision-a" | "revision_a" => Ok(DeviceRevision::RevisionA),
            "b" | "revision-b" | "revision_b" => Ok(DeviceRevision::RevisionB),
            other => Err(BringupError::Configuration(format!(
                "unknown device revision: {other}"
            ))),
        }
    }
}

/// Revision-specific way of reading the boot state.
pub trait BootStateStrategy {
    /// Return the masked SCMD state, completing any transition the read
    /// itself starts.
    fn settle_boot_state<T: RegisterTransport>(&self, link: &mut DeviceLink<T>) -> Result<u16>;
}

/// RevisionA: a direct 0 -> 0 state change either completes on a fresh
/// device or bails out at once with the state of a running one.
pub struct PolledReadback;

impl BootStateStrategy for PolledReadback {
    fn settle_boot_state<T: RegisterTransport>(&self, link: &mut DeviceLink<T>) -> Result<u16> {
        link.complete_state_change(STATE_BOOT, STATE_BOOT)
    }
}

/// RevisionB: reading the readback of a fresh device triggers an interrupt
/// that has to be pended, awaited and acknowledged.
pub struct InterruptReadback;

impl BootStateStrategy for InterruptReadback {
    fn settle_boot_state<T: RegisterTransport>(&self, link: &mut DeviceLink<T>) -> Result<u16> {
        let state = link.read_register(Register::ScmdStateReadback)? & STATE_MASK;
        if state == STATE_BOOT {
            link.interrupt_pend()?;
            link.await_completion_interrupt()?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerificationPolicy;
    use crate::device::scmd::STATE_INIT;
    use crate::poll::PollPolicy;
    use crate::transport::simulated::{SimulatedDevice, TraceEvent};

    fn link(device: SimulatedDevice) -> DeviceLink<SimulatedDevice> {
        DeviceLink::new(device, PollPolicy::unbounded(), VerificationPolicy::Advisory)
    }

    fn wrote_to(events: &[TraceEvent], register: Register) -> bool {
        events.iter().any(|e| {
            matches!(e, TraceEvent::Write { address, .. } if *address == register.into())
        })
    }

    #[test]
    fn test_parse_revision() {
        assert_eq!("A".parse::<DeviceRevision>().unwrap(), DeviceRevision::RevisionA);
        assert_eq!("revision-b".parse::<DeviceRevision>().unwrap(), DeviceRevision::RevisionB);
        assert!("c".parse::<DeviceRevision>().is_err());
    }

    #[test]
    fn test_revision_a_fresh_device() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionA);
        let trace = device.trace();
        let mut link = link(device);
        assert_eq!(DeviceRevision::RevisionA.settle_boot_state(&mut link).unwrap(), 0);

        let events = trace.snapshot();
        assert!(wrote_to(&events, Register::ScmdStateChange));
        assert!(!wrote_to(&events, Register::InterruptPend));
    }

    #[test]
    fn test_revision_b_fresh_device_acknowledges_interrupt() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionB);
        let trace = device.trace();
        let mut link = link(device);
        assert_eq!(DeviceRevision::RevisionB.settle_boot_state(&mut link).unwrap(), 0);

        let events = trace.snapshot();
        assert!(wrote_to(&events, Register::InterruptPend));
        assert!(wrote_to(&events, Register::ScmdStateChangeComplete));
        assert!(!wrote_to(&events, Register::ScmdStateChange));
    }

    #[test]
    fn test_revision_b_running_device_skips_interrupt() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionB).with_scmd_state(STATE_INIT);
        let trace = device.trace();
        let mut link = link(device);
        assert_eq!(
            DeviceRevision::RevisionB.settle_boot_state(&mut link).unwrap(),
            STATE_INIT
        );
        assert!(!wrote_to(&trace.snapshot(), Register::InterruptPend));
    }
}
