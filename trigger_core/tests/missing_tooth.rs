//! 36-1 crank wheel driven edge by edge.

use trigger_core::config::{EngineCfg, Strokes};
use trigger_core::mocks::RecordingScheduler;
use trigger_core::{EdgeOutcome, SyncState, Trigger};
use trigger_traits::ScheduleStatus;

const GAP_US: u32 = 1_000;
const START_US: u32 = 1_000;

/// Edge times for `revs` revolutions of a 36-1 wheel at 1 000 µs per tooth.
///
/// The first edge is an arbitrary tooth; the 2 000 µs gap follows every
/// 35th edge.
fn wheel_36_1(revs: usize) -> Vec<u32> {
    let mut t = START_US;
    let mut out = Vec::with_capacity(revs * 35);
    for _ in 0..revs {
        for tooth in 0..35 {
            out.push(t);
            t += if tooth == 34 { 2 * GAP_US } else { GAP_US };
        }
    }
    out
}

fn trigger() -> Trigger {
    Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(EngineCfg {
            stg_cycles: 0,
            ..EngineCfg::default()
        })
        .build()
        .expect("valid 36-1 config")
}

#[test]
fn gap_marks_tooth_one_and_sync() {
    let t = trigger();
    let edges = wheel_36_1(2);
    for &e in &edges[..35] {
        assert_eq!(t.primary_edge(e), EdgeOutcome::Accepted);
    }
    assert!(!t.snapshot().has_sync);
    assert_eq!(t.snapshot().tooth_current_count, 35);

    // first tooth after the first gap
    t.primary_edge(edges[35]);
    let s = t.snapshot();
    assert_eq!(s.tooth_current_count, 1);
    assert!(s.has_sync);
    assert_eq!(t.sync_state(), SyncState::Full);
}

#[test]
fn rpm_after_second_cycle() {
    let t = trigger();
    let mut edges = wheel_36_1(2);
    // tooth #1 of the third revolution, then tooth #2
    let last = *edges.last().expect("edges");
    edges.push(last + 2 * GAP_US);
    edges.push(last + 3 * GAP_US);
    for &e in &edges[..edges.len() - 1] {
        t.primary_edge(e);
    }
    let s = t.snapshot();
    assert_eq!(s.tooth_current_count, 1);
    assert!(s.has_sync);
    assert_eq!(s.start_revolutions, 1);

    // at tooth #1 the cranking estimate keeps the previous value
    assert_eq!(t.rpm(), 0);

    t.primary_edge(edges[edges.len() - 1]);
    let rpm = t.rpm();
    let expected = 60_000_000.0 / 36_000.0;
    assert!(
        (f64::from(rpm) - expected).abs() / expected < 0.01,
        "rpm {rpm} not within 1% of {expected}"
    );
    assert_eq!(t.snapshot().revolution_time, 36_000);
    // above the cranking band the standard estimate agrees
    assert_eq!(t.rpm(), rpm);
}

#[test]
fn noise_burst_is_discarded_without_touching_the_filter() {
    let t = trigger();
    let edges = wheel_36_1(2);
    for &e in &edges[..37] {
        t.primary_edge(e);
    }
    let before = t.snapshot();
    assert_eq!(before.tooth_current_count, 2);
    assert_eq!(before.filter_time, GAP_US / 4);

    let last = edges[36];
    for noise in [last + 50, last + 120, last + 240] {
        assert_eq!(t.primary_edge(noise), EdgeOutcome::Filtered);
    }
    let after = t.snapshot();
    assert_eq!(after, before);

    assert_eq!(t.primary_edge(edges[37]), EdgeOutcome::Accepted);
    assert_eq!(t.snapshot().tooth_current_count, 3);
}

#[test]
fn crank_angle_is_monotonic_across_a_revolution() {
    let t = trigger();
    let edges = wheel_36_1(3);
    // sync on the first gap, then one tooth so the cranking estimate runs
    for &e in &edges[..72] {
        t.primary_edge(e);
    }
    assert!(t.rpm() > 0);

    let mut prev = -1i16;
    for &e in &edges[72..105] {
        t.primary_edge(e);
        let angle = t.crank_angle_at(e + GAP_US / 2);
        assert!(angle > prev, "angle {angle} after {prev}");
        assert!((0..720).contains(&angle));
        prev = angle;
    }
}

#[test]
fn two_stroke_angle_stays_within_one_turn() {
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(EngineCfg {
            stg_cycles: 0,
            strokes: Strokes::Two,
            ..EngineCfg::default()
        })
        .build()
        .expect("valid 36-1");
    let edges = wheel_36_1(4);
    for &e in &edges[..36] {
        t.primary_edge(e);
    }
    // both halves of the toggled cycle read the same angles
    for (i, &e) in edges[36..].iter().enumerate() {
        t.primary_edge(e);
        let tooth = ((i + 1) % 35) as i16 + 1;
        assert_eq!(t.crank_angle_at(e), (tooth - 1) * 10, "edge {i}");
    }
}

#[test]
fn crank_angle_extrapolates_from_the_last_tooth() {
    let t = trigger();
    let edges = wheel_36_1(3);
    for &e in &edges[..72] {
        t.primary_edge(e);
    }
    t.rpm();
    // tooth 2, 500 µs later: 10° + 5°
    assert_eq!(t.snapshot().tooth_current_count, 2);
    assert_eq!(t.crank_angle_at(edges[71] + 500), 15);
}

#[test]
fn stall_drops_sync_and_rpm() {
    let t = trigger();
    let edges = wheel_36_1(3);
    for &e in &edges[..72] {
        t.primary_edge(e);
    }
    assert!(t.rpm() > 0);
    let last = edges[71];
    let max_stall = t.geometry().max_stall_time;
    assert_eq!(max_stall, 66_660);

    assert!(!t.check_stall(last + max_stall));
    assert!(t.snapshot().has_sync);

    assert!(t.check_stall(last + max_stall + 1));
    let s = t.snapshot();
    assert!(!s.has_sync);
    assert_eq!(s.tooth_current_count, 0);
    assert_eq!(s.revolution_time, 0);
    assert_eq!(t.rpm(), 0);
    // nothing left to time out
    assert!(!t.check_stall(last + 10 * max_stall));
}

#[test]
fn stall_check_behind_the_last_tooth_keeps_sync() {
    let t = trigger();
    let edges = wheel_36_1(3);
    for &e in &edges[..72] {
        t.primary_edge(e);
    }
    let rpm = t.rpm();
    assert!(rpm > 0);
    let last = edges[71];

    // `now` read just before a tooth was handled
    assert!(!t.check_stall(last - 5));
    let s = t.snapshot();
    assert!(s.has_sync);
    assert_eq!(s.tooth_current_count, 2);
    assert_eq!(t.rpm(), rpm);
}

#[test]
fn early_gap_counts_a_sync_loss() {
    let t = trigger();
    let edges = wheel_36_1(2);
    for &e in &edges[..40] {
        t.primary_edge(e);
    }
    assert_eq!(t.snapshot().tooth_current_count, 5);
    // a 3 ms gap at tooth 5 looks like the missing tooth
    t.primary_edge(edges[39] + 3 * GAP_US);
    let s = t.snapshot();
    assert!(!s.has_sync);
    assert_eq!(s.sync_loss_counter, 1);
}

#[test]
fn sync_loss_counter_survives_a_stall() {
    let t = trigger();
    let edges = wheel_36_1(2);
    for &e in &edges[..40] {
        t.primary_edge(e);
    }
    let lost_at = edges[39] + 3 * GAP_US;
    t.primary_edge(lost_at);
    assert!(t.check_stall(lost_at + 1_000_000));
    assert_eq!(t.snapshot().sync_loss_counter, 1);
}

#[test]
fn per_tooth_refines_the_channel_ending_on_this_tooth() {
    let outputs = RecordingScheduler::all(ScheduleStatus::Pending);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(EngineCfg {
            stg_cycles: 0,
            ..EngineCfg::default()
        })
        .with_outputs(outputs.clone())
        .build()
        .expect("valid");
    t.set_end_teeth(&[340]).expect("one channel");
    assert_eq!(t.end_tooth(1).expect("channel 1"), 33);

    let edges = wheel_36_1(3);
    for &e in &edges[..72] {
        t.primary_edge(e);
    }
    // per-tooth timing needs a speed
    assert!(t.rpm() > 0);
    let before = outputs.requests().len();

    // teeth 3..=33 of the same revolution
    for &e in &edges[72..103] {
        t.primary_edge(e);
    }
    assert_eq!(t.snapshot().tooth_current_count, 33);
    let requests = outputs.requests();
    assert_eq!(requests[before..], [(1u8, 340i16, 320i16)]);
}

#[test]
fn fixed_cranking_override_suppresses_refinement() {
    let outputs = RecordingScheduler::all(ScheduleStatus::Running);
    let t = Trigger::builder()
        .with_missing_tooth(36, 1)
        .with_engine(EngineCfg {
            stg_cycles: 0,
            ..EngineCfg::default()
        })
        .with_outputs(outputs.clone())
        .build()
        .expect("valid");
    t.set_end_teeth(&[340]).expect("one channel");
    t.set_fixed_cranking_override(true);
    for &e in &wheel_36_1(3) {
        t.primary_edge(e);
        t.rpm();
    }
    assert!(outputs.requests().is_empty());
}
