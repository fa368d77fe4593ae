use rstest::rstest;
use trigger_core::config::{TriggerSpeed, WheelPattern, WheelPatternCfg};
use trigger_core::{DecoderError, Trigger};

fn missing_tooth(teeth: u16, missing: u8) -> Trigger {
    Trigger::builder()
        .with_missing_tooth(teeth, missing)
        .build()
        .expect("valid wheel")
}

#[rstest]
#[case(36, 1, 340, 33)]
#[case(24, 1, 340, 21)]
#[case(12, 1, 340, 11)]
#[case(60, 2, 355, 58)]
// 700° on a wasted-spark wheel folds back into one turn
#[case(36, 1, 700, 33)]
fn missing_tooth_end_teeth(
    #[case] teeth: u16,
    #[case] missing: u8,
    #[case] angle: i16,
    #[case] want: u16,
) {
    let t = missing_tooth(teeth, missing);
    t.set_end_teeth(&[angle]).expect("one channel");
    assert_eq!(t.end_tooth(1), Ok(want));
}

#[test]
fn every_channel_gets_its_own_tooth() {
    let t = missing_tooth(36, 1);
    t.set_end_teeth(&[340, 160, 520, 700]).expect("four channels");
    let table = t.end_teeth();
    assert_eq!(table.channels(), 4);
    let teeth: Vec<u16> = table.iter().map(|(_, e)| e.end_tooth).collect();
    // 520° wraps to 160°
    assert_eq!(teeth, vec![33, 15, 15, 33]);
    assert_eq!(table.get(2).map(|e| e.end_angle), Some(160));
}

#[test]
fn dual_wheel_honours_the_base_offset() {
    let t = Trigger::builder()
        .with_wheel(WheelPatternCfg {
            pattern: WheelPattern::DualWheel,
            teeth_total: 24,
            missing_teeth: 0,
            trigger_speed: TriggerSpeed::Crank,
            base_angle_offset: 15,
            ..WheelPatternCfg::default()
        })
        .build()
        .expect("valid dual wheel");
    t.set_end_teeth(&[340]).expect("one channel");
    // (340 - 15) / 15 with no latency margin
    assert_eq!(t.end_tooth(1), Ok(21));
}

#[test]
fn more_angles_than_channels_is_rejected() {
    let t = missing_tooth(36, 1);
    let err = t
        .set_end_teeth(&[10, 20, 30, 40, 50])
        .expect_err("four channels configured");
    assert_eq!(
        err,
        DecoderError::TooManyEndAngles {
            given: 5,
            channels: 4
        }
    );
    // the previous table is untouched
    assert_eq!(t.end_teeth().channels(), 0);
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(9)]
fn unpopulated_channel_is_out_of_range(#[case] channel: u8) {
    let t = missing_tooth(36, 1);
    t.set_end_teeth(&[340, 160]).expect("two channels");
    assert_eq!(
        t.end_tooth(channel),
        Err(DecoderError::ChannelOutOfRange(channel, 2))
    );
}

#[test]
fn reset_keeps_the_table_and_a_new_table_replaces_it() {
    let t = missing_tooth(36, 1);
    t.set_end_teeth(&[340, 160]).expect("two channels");
    t.reset();
    assert_eq!(t.end_tooth(2), Ok(15));

    t.set_end_teeth(&[100]).expect("one channel");
    assert_eq!(t.end_teeth().channels(), 1);
    assert_eq!(t.end_tooth(1), Ok(9));
}
