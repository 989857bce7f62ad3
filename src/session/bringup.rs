//! Bring-up sequence: power-on or unknown state to streaming armed.

use crate::calibration::tables::{ENCODER_FIRMWARE_BANK, IDLE_FIRMWARE_BANK};
use crate::calibration::CalibrationProgram;
use crate::device::mode::{DeviceModePhase, ModeProbe, MAGIC_UNPROGRAMMED};
use crate::device::scmd::{ScmdCommand, ScmdState, STATE_BOOT};
use crate::device::EnableBits;
use crate::pipeline::Pipeline;
use crate::signal::{self, InputSource};
use crate::transport::{Register, RegisterTransport};
use crate::{BringupError, Result};

use super::{BringupReport, CaptureSession};

/// Signal-detect mask that watches every signal type
pub(super) const DETECT_ALL: u16 = 0xffff;
/// SCMD init mode used once the transcoder is configured, and again at teardown
pub(super) const TRANSCODER_INIT_MODE: u8 = 0xa0;

impl<T: RegisterTransport, P: Pipeline> CaptureSession<T, P> {
    /// Drive the device to the streaming-armed state.
    ///
    /// Uploads the idle firmware if the device has none, brings up the
    /// onboard processor, loads the encoder, replays the calibration tables
    /// and enables the input path for the configured (or detected) source.
    pub fn bring_up(&mut self) -> Result<BringupReport> {
        let revision = self.config.revision;
        log::info!("Bringing up {revision} device");
        self.link.take_mismatches();
        self.link.take_phases();

        let firmware_version = self.link.read_firmware_version()?;
        log::info!("Firmware version is {firmware_version}");

        self.link.select_bank(0)?;
        self.saved_enable_state = self.link.read_enable_state()?;

        let boot_state = revision.settle_boot_state(&mut self.link)?;
        log::debug!("boot state {}", ScmdState::from_code(boot_state));

        let flashed = boot_state == STATE_BOOT;
        if flashed {
            self.flash_idle_firmware()?;
        } else {
            log::info!("Firmware already running, resetting device");
            self.link.state_confirmed_scmd(ScmdCommand::Reset, 0x00, 0x0000)?;
        }

        self.link.state_confirmed_scmd(ScmdCommand::Idle, 0x00, 0x0000)?;
        self.detect_mask = DETECT_ALL;
        self.link
            .write_register(Register::SignalDetectMask, self.detect_mask)?;

        let answer = self.link.probe_mode_raw(ModeProbe::Ready)?;
        self.link
            .verify("confirm up", &MAGIC_UNPROGRAMMED.to_be_bytes()[1..], &answer)?;

        let (input_source, auto_detected) = self.processor_handshake()?;

        self.link
            .wait_for_phase(ModeProbe::Activation, DeviceModePhase::EncoderActive, true)?;
        self.link
            .do_enable(EnableBits::ENCODER_ENABLE, EnableBits::ENCODER_ENABLE)?;

        // the device may drop back after the encoder is enabled
        self.link
            .wait_for_phase(ModeProbe::Ready, DeviceModePhase::EncoderReady, false)?;

        self.link
            .run_program(&CalibrationProgram::front_end(revision, input_source))?;

        self.link
            .wait_for_phase(ModeProbe::Activation, DeviceModePhase::EncoderActive, true)?;

        self.configure_input_path(input_source)?;
        self.finalize(input_source)?;

        let mismatches = self.link.take_mismatches();
        if !mismatches.is_empty() {
            log::warn!("{} verification reads differed from documented values", mismatches.len());
        }
        log::info!("Device armed for {input_source} input");

        Ok(BringupReport {
            firmware_version,
            input_source,
            auto_detected,
            flashed,
            phases: self.link.take_phases(),
            mismatches,
        })
    }

    fn flash_idle_firmware(&mut self) -> Result<()> {
        self.pipeline.load_firmware(&self.config.firmware.idle)?;
        self.link.select_firmware_bank()?;

        self.saved_enable_state = self.link.read_enable_state()?;
        self.saved_enable = self.link.read_register(Register::Enable)?;
        log::debug!(
            "enable snapshot: state 0x{:04x}, enable 0x{:04x}",
            self.saved_enable_state,
            self.saved_enable
        );

        self.link.verify_bank("idle firmware", IDLE_FIRMWARE_BANK)
    }

    /// Probe until the processor has come up twice: once to load the
    /// encoder, once more to confirm it.
    fn processor_handshake(&mut self) -> Result<(InputSource, bool)> {
        let mut source = self.config.input_source;
        let mut auto_detected = false;
        let mut first_visit = true;

        let policy = self.link.poll_policy();
        policy.run("processor handshake", || {
            match self.link.probe_mode(ModeProbe::Ready)? {
                DeviceModePhase::Unprogrammed => {
                    self.link.send_enable_state(self.saved_enable_state)?;
                    self.link.enable_analog_input()?;
                    self.link.do_enable(
                        EnableBits::FIRMWARE_PROCESSOR,
                        EnableBits::FIRMWARE_PROCESSOR,
                    )?;
                    self.link.note_phase(DeviceModePhase::ProcessorEnabled);
                }
                DeviceModePhase::EncoderReady => {
                    if first_visit && source == InputSource::Unknown {
                        source = self.detect_input()?;
                        auto_detected = true;
                    }
                    self.link.enable_analog_input()?;

                    if !first_visit {
                        return Ok(Some(()));
                    }
                    first_visit = false;

                    self.pipeline.transcoder_defaults_initialize()?;
                    self.link.scmd(ScmdCommand::Init, 0x00, 0x0000)?;
                    self.pipeline.load_firmware(&self.config.firmware.encoder)?;
                    // some devices briefly report unprogrammed again here
                    self.link
                        .verify_bank("encoder firmware", ENCODER_FIRMWARE_BANK)?;
                }
                other => log::trace!("processor handshake: device reports {other}"),
            }
            Ok(None)
        })?;

        Ok((source, auto_detected))
    }

    fn detect_input(&mut self) -> Result<InputSource> {
        let status = self.link.read_register(Register::SignalStatus)?;
        let mask = status & self.detect_mask;
        log::debug!("signal status 0x{status:04x}, detect mask 0x{mask:04x}");
        signal::detect(mask)
    }

    fn configure_input_path(&mut self, source: InputSource) -> Result<()> {
        self.pipeline.transcoder_setup()?;
        self.pipeline.transcoder_output_enable(true)?;
        self.link
            .scmd(ScmdCommand::Init, TRANSCODER_INIT_MODE, 0x0000)?;

        self.link
            .run_program(&CalibrationProgram::post_activation(source))?;

        let composite = source == InputSource::Composite;
        let analog = source.is_analog();
        let gate = |bits: EnableBits, on: bool| if on { bits } else { EnableBits::empty() };

        self.link.do_enable(
            EnableBits::COMPOSITE_MUX,
            gate(EnableBits::COMPOSITE_MUX, composite),
        )?;
        self.link
            .do_enable(EnableBits::ANALOG_INPUT, gate(EnableBits::ANALOG_INPUT, analog))?;
        let bits = self
            .link
            .do_enable(EnableBits::ANALOG_MUX, gate(EnableBits::ANALOG_MUX, analog))?;
        log::debug!("input path enabled: {bits:?}");
        Ok(())
    }

    fn finalize(&mut self, source: InputSource) -> Result<()> {
        match source {
            InputSource::Hdmi => self.pipeline.configure_hdmi(),
            InputSource::Component | InputSource::Composite => {
                log::warn!("No {source} finalization available; input path left as configured");
                Ok(())
            }
            InputSource::Unknown => Err(BringupError::Configuration(
                "unknown input source not allowed".to_string(),
            )),
        }
    }
}
