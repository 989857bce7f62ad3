//! Input Source Detection
//!
//! Works out which input is plugged in from the device's signal status bits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BringupError, Result};

/// Cable type field (bits 0-1)
pub const CABLE_TYPE_MASK: u16 = 0x0003;
/// HDMI signal present (bit 3)
pub const HDMI_PRESENT: u16 = 1 << 3;
/// Analog signal present (bit 5)
pub const ANALOG_PRESENT: u16 = 1 << 5;

/// Video input of the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Not chosen yet; resolved by auto-detection
    #[default]
    #[serde(alias = "auto")]
    Unknown,
    /// HDMI
    Hdmi,
    /// Analog component
    Component,
    /// Analog composite
    Composite,
}

impl InputSource {
    /// Whether the source goes through the analog front end.
    pub fn is_analog(&self) -> bool {
        matches!(self, InputSource::Component | InputSource::Composite)
    }

    /// Short name
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::Unknown => "unknown",
            InputSource::Hdmi => "hdmi",
            InputSource::Component => "component",
            InputSource::Composite => "composite",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputSource {
    type Err = BringupError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "unknown" | "auto" => Ok(InputSource::Unknown),
            "hdmi" => Ok(InputSource::Hdmi),
            "component" => Ok(InputSource::Component),
            "composite" => Ok(InputSource::Composite),
            other => Err(BringupError::Configuration(format!(
                "unknown input source: {other}"
            ))),
        }
    }
}

/// Infer the attached input from a signal status mask.
///
/// Cable type 0 means HDMI and is trusted only if the HDMI-present bit is
/// set; the analog cable types (2 component, 3 composite) need the
/// analog-present bit. Without a signal the answer is HDMI. Cable type 1 is
/// not a code the device should ever report.
pub fn detect(mask: u16) -> Result<InputSource> {
    let cable_type = mask & CABLE_TYPE_MASK;
    let hdmi_found = mask & HDMI_PRESENT != 0;
    let analog_found = mask & ANALOG_PRESENT != 0;

    let signal_found = if cable_type == 0 {
        hdmi_found
    } else {
        analog_found
    };

    if !signal_found {
        log::info!("No signal found. Defaulting to HDMI");
        return Ok(InputSource::Hdmi);
    }

    let source = match cable_type {
        0 => InputSource::Hdmi,
        2 => InputSource::Component,
        3 => InputSource::Composite,
        other => {
            return Err(BringupError::Protocol(format!(
                "bad cable detection code {other} (mask 0x{mask:04x})"
            )))
        }
    };
    log::info!("{source} input signal found");
    Ok(source)
}
