//! Simulated Capture Device
//!
//! In-memory [`RegisterTransport`] that behaves like the hardware closely
//! enough to run a full bring-up and teardown: SCMD transitions settle after
//! a configurable number of readback polls, the RevisionB completion
//! interrupt is sticky until acknowledged, and the mode probe answers follow
//! the enable bits. Mailbox answers can be scripted per command.
//!
//! Every successful transfer is appended to a shared [`Trace`], which the
//! recording pipeline writes into as well.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;

use num_traits::FromPrimitive;
use parking_lot::Mutex;
use serde::Serialize;

use super::registers::{mailbox_endpoint, Register, BANK_REQUEST, VERSION_REQUEST};
use super::{ConfigAddress, RegisterTransport, TransportError};
use crate::calibration::tables::{IDLE_FIRMWARE_BANK, VERIFY_BANK_VALUE};
use crate::calibration::{CalibrationProgram, CalibrationStep};
use crate::device::mailbox::{DECODER_READ_PROBE, ENDPOINT_COMMAND, ENDPOINT_DECODER};
use crate::device::mode::{ModeProbe, MAGIC_ENCODER_ACTIVE, MAGIC_ENCODER_READY, MAGIC_UNPROGRAMMED};
use crate::device::revision::DeviceRevision;
use crate::device::scmd::{
    ScmdCommand, COMPLETION_INTERRUPT, STATE_BOOT, STATE_CHANGE_DONE, STATE_MASK,
};
use crate::device::EnableBits;
use crate::signal::HDMI_PRESENT;
use crate::Result;

/// Command that polls for the encoder trigger acknowledgement
const TRIGGER_POLL: [u8; 3] = [0x43, 0x23, 0x84];
/// Acknowledgement returned while the trigger bit is set
const TRIGGER_ACK: u8 = 0xf7;
/// Version string reported unless overridden
const DEFAULT_FIRMWARE_VERSION: &str = "1.00.0000";

/// One observed transfer or collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Register or mailbox read
    Read {
        /// Address read
        address: ConfigAddress,
        /// Bytes returned
        data: Vec<u8>,
    },
    /// Register or mailbox write
    Write {
        /// Address written
        address: ConfigAddress,
        /// Bytes written
        data: Vec<u8>,
    },
    /// Call into the capture pipeline
    Pipeline {
        /// Call name and arguments
        call: String,
    },
}

/// Flat row for CSV export
#[derive(Debug, Serialize)]
struct TraceRecord {
    seq: usize,
    kind: &'static str,
    address: String,
    data: String,
}

impl TraceEvent {
    fn record(&self, seq: usize) -> TraceRecord {
        let hex = |data: &[u8]| {
            data.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            TraceEvent::Read { address, data } => TraceRecord {
                seq,
                kind: "read",
                address: address.to_string(),
                data: hex(data),
            },
            TraceEvent::Write { address, data } => TraceRecord {
                seq,
                kind: "write",
                address: address.to_string(),
                data: hex(data),
            },
            TraceEvent::Pipeline { call } => TraceRecord {
                seq,
                kind: "pipeline",
                address: String::new(),
                data: call.clone(),
            },
        }
    }
}

/// Shared, append-only log of device traffic.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Pipeline calls in order
    pub fn pipeline_calls(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Pipeline { call } => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    /// Write the trace as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let events = self.snapshot();
        serde_json::to_writer_pretty(writer, &events)?;
        Ok(())
    }

    /// Write the trace as CSV, one row per event.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for (seq, event) in self.snapshot().iter().enumerate() {
            csv.serialize(event.record(seq))
                .map_err(std::io::Error::from)?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Scripted answers; the last one repeats once the queue runs dry.
#[derive(Debug, Default, Clone)]
struct Script {
    answers: VecDeque<Vec<u8>>,
}

impl Script {
    fn push(&mut self, answer: &[u8]) {
        self.answers.push_back(answer.to_vec());
    }

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.answers.len() > 1 {
            self.answers.pop_front()
        } else {
            self.answers.front().cloned()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    target: u16,
    reads_left: u32,
}

/// Register-level model of the capture device.
#[derive(Debug)]
pub struct SimulatedDevice {
    revision: DeviceRevision,
    trace: Trace,
    registers: HashMap<u16, u16>,
    scmd_state: u16,
    pending: Option<PendingTransition>,
    settle_reads: u32,
    stuck: bool,
    completion_flags: u16,
    completion_countdown: Option<u32>,
    bank: HashMap<(u16, u16), [u8; 2]>,
    last_command: HashMap<u8, Vec<u8>>,
    decoder_select: u8,
    decoder_scripts: HashMap<u8, Script>,
    command_scripts: HashMap<Vec<u8>, Script>,
    activation_delay: u32,
    mode_fallback: u32,
    fallback_left: u32,
    disconnect_after: Option<usize>,
    transfers: usize,
    firmware_version: Vec<u8>,
}

impl SimulatedDevice {
    /// Fresh device of the given revision: no firmware, processor off,
    /// HDMI signal present.
    pub fn new(revision: DeviceRevision) -> Self {
        let mut registers = HashMap::new();
        registers.insert(Register::EnableState.addr(), revision.quiescing_enable_state());
        registers.insert(Register::SignalStatus.addr(), HDMI_PRESENT);

        let bank = IDLE_FIRMWARE_BANK
            .iter()
            .map(|check| ((VERIFY_BANK_VALUE, check.index), check.expected))
            .collect();

        Self {
            revision,
            trace: Trace::new(),
            registers,
            scmd_state: STATE_BOOT,
            pending: None,
            settle_reads: 0,
            stuck: false,
            completion_flags: 0,
            completion_countdown: None,
            bank,
            last_command: HashMap::new(),
            decoder_select: 0,
            decoder_scripts: HashMap::new(),
            command_scripts: HashMap::new(),
            activation_delay: 0,
            mode_fallback: 0,
            fallback_left: 0,
            disconnect_after: None,
            transfers: 0,
            firmware_version: DEFAULT_FIRMWARE_VERSION.as_bytes().to_vec(),
        }
    }

    /// Number of readback polls before a state transition (or the completion
    /// interrupt) becomes visible.
    pub fn with_settle_reads(mut self, reads: u32) -> Self {
        self.settle_reads = reads;
        self
    }

    /// Start in the given SCMD state, as if firmware were already running.
    pub fn with_scmd_state(mut self, state: u16) -> Self {
        self.scmd_state = state & STATE_MASK;
        self
    }

    /// Ignore every SCMD command.
    pub fn with_stuck_scmd(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Value of the signal status register.
    pub fn with_signal_status(mut self, status: u16) -> Self {
        self.registers.insert(Register::SignalStatus.addr(), status);
        self
    }

    /// Answer the first `probes` activation probes with "encoder ready".
    pub fn with_activation_delay(mut self, probes: u32) -> Self {
        self.activation_delay = probes;
        self
    }

    /// After the encoder init command, fall back to "unprogrammed" for the
    /// next `probes` ready probes.
    pub fn with_mode_fallback(mut self, probes: u32) -> Self {
        self.mode_fallback = probes;
        self
    }

    /// Override one word of the verification bank.
    pub fn with_bank_word(mut self, index: u16, word: [u8; 2]) -> Self {
        self.bank.insert((VERIFY_BANK_VALUE, index), word);
        self
    }

    /// Version string returned by the version request.
    pub fn with_firmware_version(mut self, version: &str) -> Self {
        self.firmware_version = version.as_bytes().to_vec();
        self
    }

    /// Fail every transfer after the first `transfers`.
    pub fn disconnect_after(mut self, transfers: usize) -> Self {
        self.disconnect_after = Some(transfers);
        self
    }

    /// Queue an answer for a decoder register read.
    pub fn script_decoder_response(&mut self, address: u8, answer: &[u8]) {
        self.decoder_scripts.entry(address).or_default().push(answer);
    }

    /// Queue an answer for a mailbox command.
    pub fn script_response(&mut self, command: &[u8], answer: &[u8]) {
        self.command_scripts
            .entry(command.to_vec())
            .or_default()
            .push(answer);
    }

    /// Queue the documented answer of every query and decoder read in
    /// `program`.
    pub fn script_from_program(&mut self, program: &CalibrationProgram) {
        for step in program.steps() {
            match *step {
                CalibrationStep::Query {
                    command,
                    expected: Some(expected),
                    ..
                } => self.script_response(command, expected),
                CalibrationStep::ReadDevice {
                    address,
                    expected: Some(expected),
                } => self.script_decoder_response(address, &[expected]),
                _ => {}
            }
        }
    }

    /// Handle on the shared trace.
    pub fn trace(&self) -> Trace {
        self.trace.clone()
    }

    /// Revision this device models
    pub fn revision(&self) -> DeviceRevision {
        self.revision
    }

    /// Current SCMD state code, without side effects
    pub fn scmd_state(&self) -> u16 {
        self.scmd_state
    }

    /// Current value of a register, without side effects
    pub fn register(&self, register: Register) -> u16 {
        self.registers.get(&register.addr()).copied().unwrap_or(0)
    }

    fn enable_bits(&self) -> EnableBits {
        EnableBits::from_bits_retain(self.register(Register::Enable))
    }

    fn check_link(&mut self) -> std::result::Result<(), TransportError> {
        if let Some(limit) = self.disconnect_after {
            if self.transfers >= limit {
                return Err(TransportError::Disconnected);
            }
        }
        self.transfers += 1;
        Ok(())
    }

    fn start_transition(&mut self, target: u16) {
        self.pending = Some(PendingTransition {
            target,
            reads_left: self.settle_reads,
        });
    }

    fn read_state_readback(&mut self) -> u16 {
        match self.pending {
            Some(mut transition) if transition.reads_left > 0 => {
                transition.reads_left -= 1;
                self.pending = Some(transition);
                self.scmd_state
            }
            Some(transition) => {
                self.pending = None;
                self.scmd_state = transition.target;
                self.scmd_state | STATE_CHANGE_DONE
            }
            None => self.scmd_state | STATE_CHANGE_DONE,
        }
    }

    fn read_completion_flags(&mut self) -> u16 {
        match self.completion_countdown {
            Some(0) => {
                self.completion_countdown = None;
                self.completion_flags |= COMPLETION_INTERRUPT;
            }
            Some(left) => self.completion_countdown = Some(left - 1),
            None => {}
        }
        self.completion_flags
    }

    fn read_register_value(&mut self, addr: u16) -> u16 {
        match Register::from_addr(addr) {
            Some(Register::ScmdStateReadback) => self.read_state_readback(),
            Some(Register::ScmdStateChangeComplete) => self.read_completion_flags(),
            _ => self.registers.get(&addr).copied().unwrap_or(0),
        }
    }

    fn write_register_value(&mut self, addr: u16, data: &[u8]) {
        let value = match data {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            [lo] => *lo as u16,
            [] => 0,
        };

        match Register::from_addr(addr) {
            Some(Register::ScmdCommand) => self.scmd_command(data),
            Some(Register::ScmdStateChange) => {
                // only a device that has not booted yet acts on this
                if !self.stuck && self.scmd_state == STATE_BOOT {
                    self.start_transition(value & STATE_MASK);
                }
            }
            Some(Register::InterruptPend) => {
                if self.revision == DeviceRevision::RevisionB {
                    self.completion_countdown = Some(self.settle_reads);
                }
            }
            Some(Register::ScmdStateChangeComplete) => self.completion_flags &= !value,
            Some(Register::SignalStatus) => {}
            _ => {
                self.registers.insert(addr, value);
            }
        }
    }

    fn scmd_command(&mut self, data: &[u8]) {
        let (Some(&opcode), Some(&mode)) = (data.first(), data.get(1)) else {
            return;
        };
        let Some(command) = ScmdCommand::from_u8(opcode) else {
            return;
        };
        if self.stuck {
            return;
        }

        match command {
            ScmdCommand::Reset => {
                self.registers.insert(Register::Enable.addr(), 0);
            }
            ScmdCommand::Init if mode == 0 => self.fallback_left = self.mode_fallback,
            _ => {}
        }
        self.start_transition(command.resulting_state(mode));
    }

    fn mailbox_write(&mut self, endpoint: u8, data: &[u8]) {
        if endpoint == ENDPOINT_DECODER && data.len() == 1 {
            self.decoder_select = data[0];
        }
        self.last_command.insert(endpoint, data.to_vec());
    }

    fn mode_answer(&mut self, probe: ModeProbe) -> u32 {
        match probe {
            ModeProbe::Ready if self.fallback_left > 0 => {
                self.fallback_left -= 1;
                MAGIC_UNPROGRAMMED
            }
            ModeProbe::Ready if self.enable_bits().contains(EnableBits::FIRMWARE_PROCESSOR) => {
                MAGIC_ENCODER_READY
            }
            ModeProbe::Ready => MAGIC_UNPROGRAMMED,
            ModeProbe::Activation if self.activation_delay > 0 => {
                self.activation_delay -= 1;
                MAGIC_ENCODER_READY
            }
            ModeProbe::Activation => MAGIC_ENCODER_ACTIVE,
        }
    }

    /// Scripted answers come back as scripted, cut to `len` but never
    /// padded; modelled and unknown commands are zero-filled to `len`.
    fn mailbox_read(&mut self, endpoint: u8, len: usize) -> Vec<u8> {
        let command = self.last_command.get(&endpoint).cloned().unwrap_or_default();

        if endpoint == ENDPOINT_COMMAND {
            let scripted = if command == DECODER_READ_PROBE {
                let address = self.decoder_select;
                self.decoder_scripts.get_mut(&address).and_then(Script::next)
            } else {
                self.command_scripts.get_mut(&command).and_then(Script::next)
            };
            if let Some(mut answer) = scripted {
                answer.truncate(len);
                return answer;
            }
        }

        let mut answer = if endpoint != ENDPOINT_COMMAND {
            Vec::new()
        } else if command == ModeProbe::Ready.payload() {
            self.mode_answer(ModeProbe::Ready).to_be_bytes()[1..].to_vec()
        } else if command == ModeProbe::Activation.payload() {
            self.mode_answer(ModeProbe::Activation).to_be_bytes()[1..].to_vec()
        } else if command == TRIGGER_POLL {
            let ack = if self.enable_bits().contains(EnableBits::ENCODER_TRIGGER) {
                TRIGGER_ACK
            } else {
                0x00
            };
            vec![ack]
        } else {
            Vec::new()
        };

        answer.resize(len, 0);
        answer
    }
}

impl RegisterTransport for SimulatedDevice {
    fn read_config(
        &mut self,
        address: ConfigAddress,
        len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        self.check_link()?;

        let data = if let Some(endpoint) = mailbox_endpoint(address) {
            self.mailbox_read(endpoint, len)
        } else {
            match address {
                ConfigAddress::Register(addr) => {
                    let mut bytes = self.read_register_value(addr).to_be_bytes().to_vec();
                    bytes.resize(len, 0);
                    bytes
                }
                ConfigAddress::Indexed {
                    request: BANK_REQUEST,
                    value,
                    index,
                } => {
                    let mut bytes = self
                        .bank
                        .get(&(value, index))
                        .map(|word| word.to_vec())
                        .unwrap_or_default();
                    bytes.resize(len, 0);
                    bytes
                }
                ConfigAddress::Indexed {
                    request: VERSION_REQUEST,
                    ..
                } => {
                    let mut bytes = self.firmware_version.clone();
                    bytes.resize(len, 0);
                    bytes
                }
                ConfigAddress::Indexed { request, .. } => {
                    return Err(TransportError::Bus(format!(
                        "unsupported vendor request 0x{request:02x}"
                    )))
                }
            }
        };

        self.trace.push(TraceEvent::Read {
            address,
            data: data.clone(),
        });
        Ok(data)
    }

    fn write_config(
        &mut self,
        address: ConfigAddress,
        data: &[u8],
    ) -> std::result::Result<(), TransportError> {
        self.check_link()?;

        if let Some(endpoint) = mailbox_endpoint(address) {
            self.mailbox_write(endpoint, data);
        } else {
            match address {
                ConfigAddress::Register(addr) => self.write_register_value(addr, data),
                ConfigAddress::Indexed {
                    request: BANK_REQUEST,
                    value,
                    index,
                } => {
                    if let [hi, lo] = data {
                        self.bank.insert((value, index), [*hi, *lo]);
                    }
                }
                ConfigAddress::Indexed { request, .. } => {
                    return Err(TransportError::Bus(format!(
                        "unsupported vendor request 0x{request:02x}"
                    )))
                }
            }
        }

        self.trace.push(TraceEvent::Write {
            address,
            data: data.to_vec(),
        });
        Ok(())
    }
}
