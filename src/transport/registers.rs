//! Device Register Map
//!
//! Named 16-bit registers the bring-up sequence touches, plus the addressing
//! of the mailbox endpoints and the indexed verification bank.

use std::fmt;

use super::ConfigAddress;

/// Base of the mailbox endpoint window; endpoint `n` lives at `base | n`.
pub const MAILBOX_PORT_BASE: u16 = 0x1600;

/// Vendor request used for the indexed bank reads and the bank-select write.
pub const BANK_REQUEST: u8 = 0xbc;

/// Vendor request that returns the firmware version string.
pub const VERSION_REQUEST: u8 = 0xbd;

/// Bytes read for the firmware version; the string is NUL padded.
pub const FIRMWARE_VERSION_LEN: usize = 16;

/// Device Register Address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Register bank select
    BankSelect = 0x4e00,
    /// Enable state mirrored to the onboard processor
    EnableState = 0x4e02,
    /// Subsystem enable bitmask
    Enable = 0x4e04,
    /// Interrupt pending trigger (RevisionB boot readback)
    InterruptPend = 0x4e06,
    /// Signal types the device should watch for
    SignalDetectMask = 0x4e08,
    /// Live signal status bits
    SignalStatus = 0x4e0a,
    /// SCMD command word
    ScmdCommand = 0x1700,
    /// SCMD direct state change request
    ScmdStateChange = 0x1702,
    /// SCMD state readback
    ScmdStateReadback = 0x1720,
    /// SCMD sticky completion flags
    ScmdStateChangeComplete = 0x1740,
}

impl Register {
    /// Convert a raw register address to Register enum
    pub fn from_addr(addr: u16) -> Option<Self> {
        match addr {
            0x4e00 => Some(Register::BankSelect),
            0x4e02 => Some(Register::EnableState),
            0x4e04 => Some(Register::Enable),
            0x4e06 => Some(Register::InterruptPend),
            0x4e08 => Some(Register::SignalDetectMask),
            0x4e0a => Some(Register::SignalStatus),
            0x1700 => Some(Register::ScmdCommand),
            0x1702 => Some(Register::ScmdStateChange),
            0x1720 => Some(Register::ScmdStateReadback),
            0x1740 => Some(Register::ScmdStateChangeComplete),
            _ => None,
        }
    }

    /// Get the register address value
    pub fn addr(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::BankSelect => write!(f, "BANKSEL"),
            Register::EnableState => write!(f, "ENABLE_STATE"),
            Register::Enable => write!(f, "ENABLE"),
            Register::InterruptPend => write!(f, "INTERRUPT_PEND"),
            Register::SignalDetectMask => write!(f, "SIGNAL_DETECT_MASK"),
            Register::SignalStatus => write!(f, "SIGNAL_STATUS"),
            Register::ScmdCommand => write!(f, "SCMD_COMMAND"),
            Register::ScmdStateChange => write!(f, "SCMD_STATE_CHANGE"),
            Register::ScmdStateReadback => write!(f, "SCMD_STATE_READBACK"),
            Register::ScmdStateChangeComplete => write!(f, "SCMD_STATE_CHANGE_COMPLETE"),
        }
    }
}

/// Address of a mailbox endpoint.
pub fn mailbox_address(endpoint: u8) -> ConfigAddress {
    ConfigAddress::Register(MAILBOX_PORT_BASE | endpoint as u16)
}

/// Endpoint number of a mailbox address, if it is one.
pub fn mailbox_endpoint(address: ConfigAddress) -> Option<u8> {
    match address {
        ConfigAddress::Register(addr) if addr & 0xff00 == MAILBOX_PORT_BASE => {
            Some((addr & 0x00ff) as u8)
        }
        _ => None,
    }
}

/// Address of a word in the indexed verification bank.
pub fn bank_address(value: u16, index: u16) -> ConfigAddress {
    ConfigAddress::Indexed {
        request: BANK_REQUEST,
        value,
        index,
    }
}

/// Address of the firmware version string.
pub fn version_address() -> ConfigAddress {
    ConfigAddress::Indexed {
        request: VERSION_REQUEST,
        value: 0x0000,
        index: 0x0000,
    }
}
