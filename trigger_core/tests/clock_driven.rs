//! Entry points that read the decoder's own clock, and the engine status
//! flags the rest of the controller sets.

use trigger_core::builder::build_trigger;
use trigger_core::config::{DecoderCfg, EngineCfg, WheelPatternCfg};
use trigger_core::error::BuildError;
use trigger_core::mocks::{NullLogger, RecordingScheduler};
use trigger_core::{EdgeOutcome, Trigger};
use trigger_traits::ScheduleStatus;
use trigger_traits::clock::{Clock, ManualClock};

const GAP_US: u32 = 1_000;

fn engine() -> EngineCfg {
    EngineCfg {
        stg_cycles: 0,
        ..EngineCfg::default()
    }
}

/// Gap before each of `revs` revolutions of 36-1 teeth.
fn gaps(revs: usize) -> impl Iterator<Item = u32> {
    (0..revs * 35).map(|i| if i % 35 == 34 { 2 * GAP_US } else { GAP_US })
}

fn clocked(clock: &ManualClock) -> Trigger {
    Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(engine())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("valid 36-1")
}

#[test]
fn interrupts_match_explicitly_timed_edges() {
    let clock = ManualClock::new(1_000);
    let by_clock = clocked(&clock);
    let by_time = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(engine())
        .build()
        .expect("valid 36-1");

    for gap in gaps(2) {
        let now = clock.micros();
        assert_eq!(by_clock.primary_interrupt(), EdgeOutcome::Accepted);
        by_time.primary_edge(now);
        clock.advance(gap);
    }
    assert!(by_clock.snapshot().has_sync);
    assert_eq!(by_clock.snapshot(), by_time.snapshot());
}

#[test]
fn crank_angle_reads_the_clock() {
    let clock = ManualClock::new(1_000);
    let t = clocked(&clock);
    for gap in gaps(3) {
        t.primary_interrupt();
        clock.advance(gap);
    }
    clock.advance(300);
    assert_eq!(t.crank_angle(), t.crank_angle_at(clock.micros()));
}

#[test]
fn stall_check_uses_the_clock() {
    let clock = ManualClock::new(1_000);
    let t = clocked(&clock);
    for gap in gaps(3) {
        t.primary_interrupt();
        t.rpm();
        clock.advance(gap);
    }
    assert!(t.rpm() > 0);
    assert!(!t.check_stall_now());

    // 36-1 stalls after two slots at 50 RPM
    clock.advance(70_000);
    assert!(t.check_stall_now());
    assert!(!t.snapshot().has_sync);
    assert_eq!(t.rpm(), 0);
}

#[test]
fn clock_behind_an_explicit_edge_is_not_a_stall() {
    let clock = ManualClock::new(1_000);
    let t = clocked(&clock);
    let times: Vec<u32> = gaps(3)
        .scan(1_000, |next, gap| {
            let now = *next;
            *next += gap;
            Some(now)
        })
        .collect();
    for &now in &times {
        t.primary_edge(now);
    }
    let last = *times.last().expect("edges");
    // edges stamped ahead of the decoder's clock
    clock.set(last - 100);
    assert!(!t.check_stall_now());
    assert!(t.snapshot().has_sync);
}

#[test]
fn cranking_suspends_per_tooth_refinement() {
    let outputs = RecordingScheduler::all(ScheduleStatus::Running);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(engine())
        .with_outputs(outputs.clone())
        .build()
        .expect("valid 36-1");
    t.set_end_teeth(&[340]).expect("one channel");
    t.set_cranking(true);

    let mut now = 1_000;
    let mut train = gaps(4);
    for gap in train.by_ref().take(3 * 35) {
        t.primary_edge(now);
        t.rpm();
        now += gap;
    }
    assert!(outputs.requests().is_empty());

    t.set_cranking(false);
    for gap in train {
        t.primary_edge(now);
        t.rpm();
        now += gap;
    }
    assert!(outputs.requests().iter().any(|&(ch, angle, _)| ch == 1 && angle == 340));
}

#[test]
fn generic_instance_keeps_its_concrete_collaborators() {
    let cfg = DecoderCfg {
        engine: engine(),
        ..DecoderCfg::default()
    };
    let t = build_trigger(
        cfg,
        RecordingScheduler::all(ScheduleStatus::Off),
        NullLogger,
        None,
        None,
    )
    .expect("valid 36-1");
    t.primary_edge(1_000);
    assert_eq!(t.with_outputs(|o| o.requests().len()), 0);
    assert_eq!(t.snapshot().tooth_current_count, 1);
}

#[test]
fn generic_instance_validates_like_the_builder() {
    let cfg = DecoderCfg {
        wheel: WheelPatternCfg {
            teeth_total: 0,
            ..WheelPatternCfg::default()
        },
        ..DecoderCfg::default()
    };
    let err = build_trigger(cfg, RecordingScheduler::default(), NullLogger, None, None)
        .expect_err("zero teeth");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
