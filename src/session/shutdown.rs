//! Teardown sequence: any state back down to reset.

use crate::calibration::CalibrationProgram;
use crate::device::scmd::{ScmdCommand, ScmdState};
use crate::device::EnableBits;
use crate::pipeline::Pipeline;
use crate::transport::{Register, RegisterTransport};
use crate::Result;

use super::bringup::TRANSCODER_INIT_MODE;
use super::{CaptureSession, TeardownOutcome};

impl<T: RegisterTransport, P: Pipeline> CaptureSession<T, P> {
    /// Stop any running stream and put the device into reset (mode 1).
    ///
    /// A device that was never initialized or is already reset is left
    /// alone after the initial state read, so calling this twice is safe.
    pub fn teardown(&mut self) -> Result<TeardownOutcome> {
        let state = ScmdState::from_code(self.link.read_scmd_state()?);
        if state.is_streaming() {
            log::info!("Stopping stream (device in {state})");
            self.pipeline.stop_stream(true)?;
        }

        if state.is_quiesced() {
            log::debug!("device already quiesced ({state})");
            return Ok(TeardownOutcome::AlreadyQuiesced);
        }

        log::info!("Tearing down device in {state}");
        self.link.run_program(&CalibrationProgram::quiesce())?;

        self.link.select_bank(0)?;
        let enable_state = self.link.read_enable_state()?;
        let expected = self.config.revision.quiescing_enable_state();
        if enable_state != expected {
            log::debug!(
                "enable state 0x{enable_state:04x}, {} devices usually report 0x{expected:04x}",
                self.config.revision
            );
        }
        // value unused, the device expects the read
        self.link.read_register(Register::ScmdStateReadback)?;

        self.pipeline.transcoder_output_enable(false)?;
        self.link
            .scmd(ScmdCommand::Init, TRANSCODER_INIT_MODE, 0x0000)?;

        self.link.clear_enable_state()?;
        self.link
            .do_enable(EnableBits::FIRMWARE_PROCESSOR, EnableBits::empty())?;

        self.link.state_confirmed_scmd(ScmdCommand::Idle, 0x00, 0x0000)?;
        self.link.state_confirmed_scmd(ScmdCommand::Reset, 0x01, 0x0000)?;
        log::info!("Device reset");
        Ok(TeardownOutcome::Quiesced)
    }
}
