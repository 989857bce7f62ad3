//! Capture Pipeline Collaborators
//!
//! Firmware upload, transcoder control and stream shutdown live outside the
//! bring-up core. The orchestrators only call into them at fixed points
//! through the [`Pipeline`] trait.

use crate::transport::simulated::{Trace, TraceEvent};
use crate::{BringupError, Result};

/// Operations the bring-up and teardown sequences delegate.
///
/// Every call blocks until the collaborator is done.
pub trait Pipeline {
    /// Upload the named firmware image.
    fn load_firmware(&mut self, image: &str) -> Result<()>;

    /// Put the transcoder parameters at their defaults.
    fn transcoder_defaults_initialize(&mut self) -> Result<()>;

    /// Configure the transcoder for capture.
    fn transcoder_setup(&mut self) -> Result<()>;

    /// Switch transcoder output on or off.
    fn transcoder_output_enable(&mut self, enable: bool) -> Result<()>;

    /// HDMI-specific finalization.
    fn configure_hdmi(&mut self) -> Result<()>;

    /// Stop a running stream.
    fn stop_stream(&mut self, flush: bool) -> Result<()>;
}

impl<P: Pipeline + ?Sized> Pipeline for &mut P {
    fn load_firmware(&mut self, image: &str) -> Result<()> {
        (**self).load_firmware(image)
    }

    fn transcoder_defaults_initialize(&mut self) -> Result<()> {
        (**self).transcoder_defaults_initialize()
    }

    fn transcoder_setup(&mut self) -> Result<()> {
        (**self).transcoder_setup()
    }

    fn transcoder_output_enable(&mut self, enable: bool) -> Result<()> {
        (**self).transcoder_output_enable(enable)
    }

    fn configure_hdmi(&mut self) -> Result<()> {
        (**self).configure_hdmi()
    }

    fn stop_stream(&mut self, flush: bool) -> Result<()> {
        (**self).stop_stream(flush)
    }
}

/// Pipeline that does nothing but note each call in a [`Trace`].
///
/// Sharing the trace with a
/// [`SimulatedDevice`](crate::transport::simulated::SimulatedDevice) gives
/// one ordered log of register traffic and collaborator calls.
#[derive(Debug, Clone)]
pub struct RecordingPipeline {
    trace: Trace,
    calls: Vec<String>,
    fail_on: Option<String>,
}

impl RecordingPipeline {
    /// Record into `trace`.
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            calls: Vec::new(),
            fail_on: None,
        }
    }

    /// Fail every call whose name is `call`.
    pub fn failing_on(mut self, call: &str) -> Self {
        self.fail_on = Some(call.to_string());
        self
    }

    /// Calls made so far, formatted as `name(args)`
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// How often `name` was called
    pub fn count(&self, name: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call.split('(').next() == Some(name))
            .count()
    }

    fn record(&mut self, name: &str, args: String) -> Result<()> {
        let call = format!("{name}({args})");
        log::debug!("pipeline: {call}");
        self.trace.push(TraceEvent::Pipeline { call: call.clone() });
        self.calls.push(call);

        if self.fail_on.as_deref() == Some(name) {
            return Err(BringupError::Pipeline(format!("{name} failed")));
        }
        Ok(())
    }
}

impl Pipeline for RecordingPipeline {
    fn load_firmware(&mut self, image: &str) -> Result<()> {
        log::info!("Loading firmware {image}");
        self.record("load_firmware", image.to_string())
    }

    fn transcoder_defaults_initialize(&mut self) -> Result<()> {
        self.record("transcoder_defaults_initialize", String::new())
    }

    fn transcoder_setup(&mut self) -> Result<()> {
        self.record("transcoder_setup", String::new())
    }

    fn transcoder_output_enable(&mut self, enable: bool) -> Result<()> {
        self.record("transcoder_output_enable", enable.to_string())
    }

    fn configure_hdmi(&mut self) -> Result<()> {
        self.record("configure_hdmi", String::new())
    }

    fn stop_stream(&mut self, flush: bool) -> Result<()> {
        self.record("stop_stream", flush.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_land_in_shared_trace() {
        let trace = Trace::new();
        let mut pipeline = RecordingPipeline::new(trace.clone());
        pipeline.load_firmware("idle.bin").unwrap();
        pipeline.transcoder_output_enable(true).unwrap();

        assert_eq!(
            trace.pipeline_calls(),
            vec!["load_firmware(idle.bin)", "transcoder_output_enable(true)"]
        );
        assert_eq!(pipeline.count("load_firmware"), 1);
        assert_eq!(pipeline.count("configure_hdmi"), 0);
    }

    #[test]
    fn test_failing_call_is_still_recorded() {
        let mut pipeline = RecordingPipeline::new(Trace::new()).failing_on("configure_hdmi");
        pipeline.transcoder_setup().unwrap();
        let err = pipeline.configure_hdmi().unwrap_err();
        assert!(matches!(err, BringupError::Pipeline(_)));
        assert_eq!(pipeline.calls().len(), 2);
    }
}
