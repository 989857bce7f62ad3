//! Capture Device Bring-up
//!
//! Sequencer that takes a mailbox-controlled USB video capture device from an
//! undefined power-on state to a streaming-armed state, and back down again.
//!
//! The device has no documented command set. It is driven through an indirect
//! mailbox interface to its onboard processor and a state-change command
//! protocol (SCMD), with two firmware images uploaded at fixed points of the
//! sequence. The register traffic is replayed byte-for-byte.
//!
//! # Layers
//! - [`transport`]: raw register access (`RegisterTransport`) and a simulated device
//! - [`device`]: mailbox channel, SCMD protocol, enable bitmask and mode probing
//! - [`signal`]: input-source auto-detection from signal status bits
//! - [`calibration`]: static calibration tables keyed by revision and input source
//! - [`session`]: the bring-up and teardown orchestrators
//!
//! # Quick start
//! ```no_run
//! use capture_bringup::pipeline::RecordingPipeline;
//! use capture_bringup::transport::simulated::SimulatedDevice;
//! use capture_bringup::{CaptureSession, DeviceRevision, SessionConfig};
//!
//! let device = SimulatedDevice::new(DeviceRevision::RevisionA);
//! let pipeline = RecordingPipeline::new(device.trace());
//! let config = SessionConfig::new(DeviceRevision::RevisionA);
//!
//! let mut session = CaptureSession::new(device, pipeline, config);
//! let report = session.bring_up().unwrap();
//! println!("armed with {}", report.input_source);
//! session.teardown().unwrap();
//! ```

#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod device;
pub mod pipeline;
pub mod poll;
pub mod session;
pub mod signal;
pub mod transport;

use transport::TransportError;

/// Error types for bring-up and teardown operations
#[derive(thiserror::Error, Debug)]
pub enum BringupError {
    /// Register I/O failure, fatal to the session
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device answered with a value outside the legal set
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Session settings do not allow the requested path
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A bounded poll gave up before its condition held
    #[error("Timed out waiting for {operation} after {attempts} attempts")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// Number of attempts made
        attempts: u32,
    },

    /// Verification read mismatch under strict verification
    #[error("Verification failed for {context}: expected {expected:02x?}, got {actual:02x?}")]
    Verification {
        /// Where in the sequence the read happened
        context: String,
        /// Documented value
        expected: Vec<u8>,
        /// Value the device returned
        actual: Vec<u8>,
    },

    /// Firmware loader, transcoder or other collaborator failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bring-up operations
pub type Result<T> = std::result::Result<T, BringupError>;

// Public API exports
pub use config::{SessionConfig, VerificationPolicy};
pub use device::mode::DeviceModePhase;
pub use device::revision::DeviceRevision;
pub use device::EnableBits;
pub use poll::PollPolicy;
pub use session::{BringupReport, CaptureSession};
pub use signal::InputSource;
