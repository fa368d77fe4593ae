#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use trigger_core::Trigger;
use trigger_core::config::TriggerSpeed;
use trigger_traits::{Edge, TriggerInput};

#[derive(Debug, Arbitrary)]
struct Step {
    input: u8,
    /// Gap since the previous edge; wraps like the hardware timer.
    gap_us: u16,
    query: bool,
}

#[derive(Debug, Arbitrary)]
struct Train {
    dual: bool,
    start_us: u32,
    steps: Vec<Step>,
    angles: Vec<i16>,
}

fuzz_target!(|train: Train| {
    let builder = Trigger::builder();
    let Ok(t) = (if train.dual {
        builder.with_dual_wheel(24, TriggerSpeed::Crank).try_build()
    } else {
        builder.with_missing_tooth(36, 1).try_build()
    }) else {
        return;
    };
    let _ = t.set_end_teeth(&train.angles);

    let mut now = train.start_us;
    for step in &train.steps {
        now = now.wrapping_add(u32::from(step.gap_us));
        let input = match step.input % 3 {
            0 => TriggerInput::Primary,
            1 => TriggerInput::Secondary,
            _ => TriggerInput::Tertiary,
        };
        t.dispatch(Edge::new(input, now));
        if step.query {
            let _ = t.rpm();
            let angle = t.crank_angle_at(now);
            assert!((0..720).contains(&angle), "angle {angle} out of range");
            let _ = t.check_stall(now);
        }
    }
});
