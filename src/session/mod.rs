//! Capture Session
//!
//! [`CaptureSession`] owns the device link and the pipeline collaborators for
//! one bring-up/teardown cycle. Every operation takes `&mut self`, so no other
//! register traffic can interleave with a running sequence.

mod bringup;
mod shutdown;

use serde::Serialize;

use crate::config::SessionConfig;
use crate::device::mode::DeviceModePhase;
use crate::device::{DeviceLink, VerificationMismatch};
use crate::pipeline::Pipeline;
use crate::signal::InputSource;
use crate::transport::RegisterTransport;

/// Outcome of a successful bring-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BringupReport {
    /// Firmware version string read before anything else
    pub firmware_version: String,
    /// Input the device was armed for
    pub input_source: InputSource,
    /// Whether the input was resolved by auto-detection
    pub auto_detected: bool,
    /// Whether the idle firmware had to be uploaded
    pub flashed: bool,
    /// Mode milestones in the order they were observed
    pub phases: Vec<DeviceModePhase>,
    /// Verification reads that disagreed with their documented value
    pub mismatches: Vec<VerificationMismatch>,
}

/// What a teardown found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TeardownOutcome {
    /// Device was never initialized or already reset; nothing was written
    AlreadyQuiesced,
    /// Device was taken down to reset
    Quiesced,
}

/// One capture device session.
pub struct CaptureSession<T, P> {
    link: DeviceLink<T>,
    pipeline: P,
    config: SessionConfig,
    saved_enable_state: u16,
    saved_enable: u16,
    detect_mask: u16,
}

impl<T: RegisterTransport, P: Pipeline> CaptureSession<T, P> {
    /// Create a session; nothing is sent to the device yet.
    pub fn new(transport: T, pipeline: P, config: SessionConfig) -> Self {
        let link = DeviceLink::new(transport, config.poll, config.verification);
        Self {
            link,
            pipeline,
            config,
            saved_enable_state: 0,
            saved_enable: 0,
            detect_mask: 0,
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Device link
    pub fn link(&self) -> &DeviceLink<T> {
        &self.link
    }

    /// Pipeline collaborators
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Enable-state and enable register snapshots taken during bring-up.
    pub fn saved_enable(&self) -> (u16, u16) {
        (self.saved_enable_state, self.saved_enable)
    }

    /// Signal-detect watch mask in effect
    pub fn detect_mask(&self) -> u16 {
        self.detect_mask
    }
}
