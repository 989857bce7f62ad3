//! Mailbox Channel
//!
//! Indirect command/response channel to the onboard processor. Each endpoint
//! is a numbered port; a command is written to it and the answer read back
//! from the same port. The caller knows how many bytes a command produces.

use crate::transport::registers::mailbox_address;
use crate::transport::{RegisterTransport, TransportError};
use crate::Result;

use super::DeviceLink;

/// Processor command endpoint; also carries mode probes and status answers.
pub const ENDPOINT_COMMAND: u8 = 0x33;
/// Video front-end parameter endpoint
pub const ENDPOINT_FRONT_END: u8 = 0x44;
/// Audio/sync parameter endpoint
pub const ENDPOINT_SYNC: u8 = 0x4c;
/// Decoder register endpoint
pub const ENDPOINT_DECODER: u8 = 0x4e;

/// Probe command that reads back the selected decoder register.
pub const DECODER_READ_PROBE: [u8; 2] = [0x9d, 0xcd];

impl<T: RegisterTransport> DeviceLink<T> {
    /// Write a command to a mailbox endpoint.
    pub fn mail_write(&mut self, endpoint: u8, payload: &[u8]) -> Result<()> {
        log::trace!("mail 0x{endpoint:02x} <- {payload:02x?}");
        self.write_raw(mailbox_address(endpoint), payload)
    }

    /// Read exactly `count` bytes from a mailbox endpoint.
    pub fn mail_read(&mut self, endpoint: u8, count: usize) -> Result<Vec<u8>> {
        let address = mailbox_address(endpoint);
        let data = self.read_raw(address, count)?;
        if data.len() != count {
            return Err(TransportError::ShortRead {
                address,
                wanted: count,
                got: data.len(),
            }
            .into());
        }
        log::trace!("mail 0x{endpoint:02x} -> {data:02x?}");
        Ok(data)
    }

    /// Read one byte from the decoder register at `address`.
    ///
    /// Selects the register on the decoder endpoint, issues the read probe on
    /// the command endpoint and returns the single status byte.
    pub fn read_device_9dcd(&mut self, address: u8) -> Result<u8> {
        self.mail_write(ENDPOINT_DECODER, &[address])?;
        self.mail_write(ENDPOINT_COMMAND, &DECODER_READ_PROBE)?;
        let data = self.mail_read(ENDPOINT_COMMAND, 1)?;
        Ok(data[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerificationPolicy;
    use crate::device::revision::DeviceRevision;
    use crate::poll::PollPolicy;
    use crate::transport::simulated::{SimulatedDevice, TraceEvent};
    use crate::transport::ConfigAddress;

    #[test]
    fn test_read_device_9dcd_sequence() {
        let mut device = SimulatedDevice::new(DeviceRevision::RevisionA);
        device.script_decoder_response(0x88, &[0xb2]);
        let trace = device.trace();
        let mut link = DeviceLink::new(device, PollPolicy::unbounded(), VerificationPolicy::Advisory);

        assert_eq!(link.read_device_9dcd(0x88).unwrap(), 0xb2);

        let events = trace.snapshot();
        assert_eq!(
            events,
            vec![
                TraceEvent::Write {
                    address: ConfigAddress::Register(0x164e),
                    data: vec![0x88],
                },
                TraceEvent::Write {
                    address: ConfigAddress::Register(0x1633),
                    data: vec![0x9d, 0xcd],
                },
                TraceEvent::Read {
                    address: ConfigAddress::Register(0x1633),
                    data: vec![0xb2],
                },
            ]
        );
    }

    #[test]
    fn test_mail_read_returns_requested_length() {
        let device = SimulatedDevice::new(DeviceRevision::RevisionB);
        let mut link = DeviceLink::new(device, PollPolicy::unbounded(), VerificationPolicy::Advisory);
        link.mail_write(ENDPOINT_COMMAND, &[0xab, 0x92, 0x3e, 0xb4, 0x03, 0x76])
            .unwrap();
        assert_eq!(link.mail_read(ENDPOINT_COMMAND, 56).unwrap().len(), 56);
    }
}
