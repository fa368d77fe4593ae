use trigger_core::config::{ToothLogMode, TriggerSpeed};
use trigger_core::mocks::FixedInputs;
use trigger_core::{EdgeOutcome, SharedToothLog, Trigger};
use trigger_traits::{Edge, TriggerInput, composite};

fn logged(mode: ToothLogMode, log: &SharedToothLog) -> Trigger {
    Trigger::builder()
        .with_dual_wheel(60, TriggerSpeed::Cam)
        .with_tooth_log(mode)
        .with_logger(log.clone())
        .build()
        .expect("valid dual wheel")
}

#[test]
fn tooth_log_keeps_only_accepted_primary_edges() {
    let log = SharedToothLog::new(16);
    let t = logged(ToothLogMode::Tooth, &log);
    t.secondary_edge(1_000);
    t.primary_edge(1_250);
    t.primary_edge(1_750);
    // inside the filter
    assert_eq!(t.primary_edge(1_760), EdgeOutcome::Filtered);
    t.primary_edge(2_250);

    let entries = log.drain();
    let gaps: Vec<(u32, u32)> = entries.iter().map(|e| (e.time_us, e.gap_us)).collect();
    // the cam resync stamps the last tooth at 1 000
    assert_eq!(gaps, vec![(1_250, 250), (1_750, 500), (2_250, 500)]);
    assert!(entries.iter().all(|e| e.input == TriggerInput::Primary));
    assert!(entries.iter().all(|e| e.flags == 0));
}

#[test]
fn composite_log_sees_every_input_with_classification() {
    let log = SharedToothLog::new(16);
    let t = logged(ToothLogMode::Composite, &log);
    t.secondary_edge(1_000);
    t.primary_edge(1_250);
    t.primary_edge(1_260);
    t.tertiary_edge(1_300);

    let entries = log.drain();
    assert_eq!(entries.len(), 4);

    let cam = entries[0];
    assert_eq!(cam.input, TriggerInput::Secondary);
    assert_eq!(cam.gap_us, 0);
    assert_ne!(cam.flags & composite::CAM_TRIGGER, 0);
    // classified after the handler ran
    assert_ne!(cam.flags & composite::SYNC, 0);
    // every input reads high by default
    let levels = composite::PRIMARY_LEVEL | composite::SECONDARY_LEVEL | composite::TERTIARY_LEVEL;
    assert_eq!(cam.flags & levels, levels);

    assert_eq!(entries[1].flags & composite::CAM_TRIGGER, 0);
    // filtered edges are logged too
    assert_eq!(entries[2].time_us, 1_260);
    assert_eq!(entries[3].input, TriggerInput::Tertiary);
    assert_ne!(entries[3].flags & composite::CAM_TRIGGER, 0);
}

#[test]
fn wrong_polarity_never_reaches_the_decoder() {
    let log = SharedToothLog::new(16);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_tooth_log(ToothLogMode::Tooth)
        .with_logger(log.clone())
        .with_inputs(FixedInputs::all(false))
        .build()
        .expect("valid 36-1");
    let before = t.snapshot();
    assert_eq!(t.primary_edge(1_000), EdgeOutcome::Ignored);
    assert_eq!(t.snapshot(), before);
    assert!(log.is_empty());
}

#[test]
fn captured_level_overrides_the_live_input() {
    let inputs = FixedInputs::all(false);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_inputs(inputs.clone())
        .build()
        .expect("valid 36-1");
    let rising = Edge::new(TriggerInput::Primary, 1_000).with_level(true);
    assert_eq!(t.dispatch(rising), EdgeOutcome::Accepted);

    // the input has since gone high again, but the edge was captured low
    inputs.set(TriggerInput::Primary, true);
    let falling = Edge::new(TriggerInput::Primary, 2_000).with_level(false);
    assert_eq!(t.dispatch(falling), EdgeOutcome::Ignored);
    assert_eq!(t.snapshot().tooth_current_count, 1);

    // no captured level: the live input decides
    assert_eq!(t.dispatch(Edge::new(TriggerInput::Primary, 2_000)), EdgeOutcome::Accepted);
}

#[test]
fn composite_log_records_wrong_polarity_edges() {
    let log = SharedToothLog::new(16);
    let inputs = FixedInputs::all(false);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_tooth_log(ToothLogMode::Composite)
        .with_logger(log.clone())
        .with_inputs(inputs.clone())
        .build()
        .expect("valid 36-1");
    assert_eq!(t.primary_edge(1_000), EdgeOutcome::Ignored);
    inputs.set(TriggerInput::Primary, true);
    assert_eq!(t.primary_edge(2_000), EdgeOutcome::Accepted);

    let entries = log.drain();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].flags & composite::PRIMARY_LEVEL, 0);
    assert_ne!(entries[1].flags & composite::PRIMARY_LEVEL, 0);
}

#[test]
fn builder_defaults_to_a_buffer_when_logging_is_on() {
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_tooth_log(ToothLogMode::Tooth)
        .build()
        .expect("valid 36-1");
    t.primary_edge(1_000);
    t.primary_edge(2_000);
    // entries go to the decoder-owned buffer
    assert_eq!(t.snapshot().tooth_current_count, 2);
}
