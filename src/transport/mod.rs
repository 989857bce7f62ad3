//! Register Transport
//!
//! The raw bus primitives everything else is layered on. A transport moves
//! bytes to and from either a single 16-bit register or an indexed vendor
//! request; what the bytes mean is the business of the layers above.

pub mod registers;
pub mod simulated;

use std::fmt;

use serde::Serialize;

pub use registers::Register;

/// Address of a configuration read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfigAddress {
    /// A single 16-bit device register
    Register(u16),
    /// Indexed vendor request addressed by `(request, value, index)`
    Indexed {
        /// Vendor request number
        request: u8,
        /// Request value field
        value: u16,
        /// Request index field
        index: u16,
    },
}

impl From<Register> for ConfigAddress {
    fn from(register: Register) -> Self {
        ConfigAddress::Register(register.addr())
    }
}

impl fmt::Display for ConfigAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigAddress::Register(addr) => match Register::from_addr(*addr) {
                Some(reg) => write!(f, "0x{addr:04x} ({reg})"),
                None => write!(f, "0x{addr:04x}"),
            },
            ConfigAddress::Indexed {
                request,
                value,
                index,
            } => write!(f, "req 0x{request:02x} val 0x{value:04x} idx 0x{index:04x}"),
        }
    }
}

/// Failure reported by the register transport.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device is gone
    #[error("device disconnected")]
    Disconnected,

    /// Fewer bytes came back than were requested
    #[error("short read at {address}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        /// Address that was read
        address: ConfigAddress,
        /// Requested length
        wanted: usize,
        /// Returned length
        got: usize,
    },

    /// Any other bus failure, with the backend's description
    #[error("bus error: {0}")]
    Bus(String),
}

/// Raw register access to the capture device.
///
/// Implementations block until the bus transfer completes. The orchestrators
/// hold the transport exclusively for a whole bring-up or teardown.
pub trait RegisterTransport {
    /// Read `len` bytes at `address`.
    fn read_config(
        &mut self,
        address: ConfigAddress,
        len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError>;

    /// Write `data` at `address`.
    fn write_config(
        &mut self,
        address: ConfigAddress,
        data: &[u8],
    ) -> std::result::Result<(), TransportError>;

    /// Read a big-endian 16-bit value.
    fn read_u16(&mut self, address: ConfigAddress) -> std::result::Result<u16, TransportError> {
        let bytes = self.read_config(address, 2)?;
        match bytes.as_slice() {
            [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(TransportError::ShortRead {
                address,
                wanted: 2,
                got: bytes.len(),
            }),
        }
    }

    /// Write a big-endian 16-bit value.
    fn write_u16(
        &mut self,
        address: ConfigAddress,
        value: u16,
    ) -> std::result::Result<(), TransportError> {
        self.write_config(address, &value.to_be_bytes())
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    fn read_config(
        &mut self,
        address: ConfigAddress,
        len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        (**self).read_config(address, len)
    }

    fn write_config(
        &mut self,
        address: ConfigAddress,
        data: &[u8],
    ) -> std::result::Result<(), TransportError> {
        (**self).write_config(address, data)
    }
}
