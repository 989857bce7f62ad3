//! Session Configuration
//!
//! Settings for one bring-up/teardown session. Passed into the session by
//! value; nothing in here is mutated while the device is being driven.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::revision::DeviceRevision;
use crate::poll::PollPolicy;
use crate::signal::InputSource;
use crate::{BringupError, Result};

/// How to treat verification reads that disagree with the documented value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPolicy {
    /// Log and record mismatches, keep going
    #[default]
    Advisory,
    /// Abort the sequence on the first mismatch
    Strict,
}

/// Firmware image names handed to the firmware loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareImages {
    /// Image loaded when the device comes up without firmware
    pub idle: String,
    /// Encoder image loaded once the processor reports ready
    pub encoder: String,
}

impl Default for FirmwareImages {
    fn default() -> Self {
        Self {
            idle: "mb86h57_h58_idle.bin".to_string(),
            encoder: "mb86h57_h58_enc_h.bin".to_string(),
        }
    }
}

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hardware generation of the attached device
    pub revision: DeviceRevision,
    /// Preselected input, or `Unknown` to auto-detect during bring-up
    pub input_source: InputSource,
    /// Firmware image names
    pub firmware: FirmwareImages,
    /// Bound for every device poll
    pub poll: PollPolicy,
    /// Treatment of verification mismatches
    pub verification: VerificationPolicy,
}

impl SessionConfig {
    /// Default configuration for the given revision.
    pub fn new(revision: DeviceRevision) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            BringupError::Configuration(format!(
                "failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Preselect the input source.
    pub fn input_source(mut self, source: InputSource) -> Self {
        self.input_source = source;
        self
    }

    /// Set the poll bound.
    pub fn poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Set the verification policy.
    pub fn verification(mut self, verification: VerificationPolicy) -> Self {
        self.verification = verification;
        self
    }

    /// Override the firmware image names.
    pub fn firmware(mut self, firmware: FirmwareImages) -> Self {
        self.firmware = firmware;
        self
    }
}
