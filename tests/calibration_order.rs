use capture_bringup::calibration::{CalibrationProgram, CalibrationStep};
use capture_bringup::device::mailbox::{DECODER_READ_PROBE, ENDPOINT_COMMAND, ENDPOINT_DECODER};
use capture_bringup::pipeline::RecordingPipeline;
use capture_bringup::transport::registers::mailbox_address;
use capture_bringup::transport::simulated::{SimulatedDevice, TraceEvent};
use capture_bringup::{CaptureSession, DeviceRevision, InputSource, SessionConfig};

const DECODER_CLAMP_A: &[u8] = &[0x24, 0x8d];
const DECODER_CLAMP_B: &[u8] = &[0x24, 0x8c];

/// Decoder endpoint traffic, plus the read probes that follow decoder selects.
fn decoder_traffic(events: &[TraceEvent]) -> Vec<(u8, Vec<u8>)> {
    let decoder = mailbox_address(ENDPOINT_DECODER);
    let command = mailbox_address(ENDPOINT_COMMAND);
    events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Write { address, data } if *address == decoder => {
                Some((ENDPOINT_DECODER, data.clone()))
            }
            TraceEvent::Write { address, data }
                if *address == command && data.as_slice() == DECODER_READ_PROBE =>
            {
                Some((ENDPOINT_COMMAND, data.clone()))
            }
            _ => None,
        })
        .collect()
}

fn expected_traffic(programs: &[CalibrationProgram]) -> Vec<(u8, Vec<u8>)> {
    let mut expected = Vec::new();
    for step in programs.iter().flat_map(|program| program.steps()) {
        match *step {
            CalibrationStep::ReadDevice { address, .. } => {
                expected.push((ENDPOINT_DECODER, vec![address]));
                expected.push((ENDPOINT_COMMAND, DECODER_READ_PROBE.to_vec()));
            }
            CalibrationStep::Write { endpoint, data } if endpoint == ENDPOINT_DECODER => {
                expected.push((ENDPOINT_DECODER, data.to_vec()));
            }
            CalibrationStep::Query {
                endpoint, command, ..
            } if endpoint == ENDPOINT_DECODER
                || (endpoint == ENDPOINT_COMMAND && command == DECODER_READ_PROBE) =>
            {
                expected.push((endpoint, command.to_vec()));
            }
            _ => {}
        }
    }
    expected
}

fn run(revision: DeviceRevision, source: InputSource) -> Vec<TraceEvent> {
    let device = SimulatedDevice::new(revision);
    let trace = device.trace();
    let pipeline = RecordingPipeline::new(trace.clone());
    let config = SessionConfig::new(revision).input_source(source);
    let mut session = CaptureSession::new(device, pipeline, config);
    session.bring_up().unwrap();
    trace.snapshot()
}

#[test]
fn decoder_writes_follow_table_order() {
    for revision in [DeviceRevision::RevisionA, DeviceRevision::RevisionB] {
        for source in [
            InputSource::Hdmi,
            InputSource::Component,
            InputSource::Composite,
        ] {
            let events = run(revision, source);
            let programs = [
                CalibrationProgram::front_end(revision, source),
                CalibrationProgram::post_activation(source),
            ];
            assert_eq!(
                decoder_traffic(&events),
                expected_traffic(&programs),
                "{revision} {source}"
            );
        }
    }
}

#[test]
fn clamp_value_depends_on_revision() {
    let has_write = |events: &[TraceEvent], payload: &[u8]| {
        decoder_traffic(events)
            .iter()
            .any(|(endpoint, data)| *endpoint == ENDPOINT_DECODER && data.as_slice() == payload)
    };

    let a = run(DeviceRevision::RevisionA, InputSource::Hdmi);
    assert!(has_write(&a, DECODER_CLAMP_A));
    assert!(!has_write(&a, DECODER_CLAMP_B));

    let b = run(DeviceRevision::RevisionB, InputSource::Hdmi);
    assert!(has_write(&b, DECODER_CLAMP_B));
    assert!(!has_write(&b, DECODER_CLAMP_A));
}

#[test]
fn revision_b_adds_scaler_segment() {
    let a = CalibrationProgram::front_end(DeviceRevision::RevisionA, InputSource::Hdmi);
    let b = CalibrationProgram::front_end(DeviceRevision::RevisionB, InputSource::Hdmi);
    assert!(b.len() > a.len());
    assert!(b
        .segments()
        .iter()
        .any(|segment| segment.name == "revision_b_scaler"));
    assert!(!a
        .segments()
        .iter()
        .any(|segment| segment.name == "revision_b_scaler"));
}
