use rstest::rstest;
use trigger_config::{Pattern, SecondaryPattern, Speed, ToothLog, load_toml};

#[test]
fn empty_config_uses_defaults_and_validates() {
    let cfg = load_toml("").expect("parse TOML");
    assert_eq!(cfg.wheel.pattern, Pattern::MissingTooth);
    assert_eq!(cfg.wheel.teeth, 36);
    assert_eq!(cfg.wheel.missing_teeth, 1);
    assert_eq!(cfg.wheel.gap_ratio_percent, 150);
    assert_eq!(cfg.secondary.speed, Speed::Cam);
    assert_eq!(cfg.engine.max_rpm, 18_000);
    assert_eq!(cfg.engine.crank_rpm, 400);
    assert_eq!(cfg.logging.tooth_log, ToothLog::Off);
    cfg.validate().expect("defaults should pass");
}

#[test]
fn full_config_parses() {
    let toml = r#"
[wheel]
pattern = "dual_wheel"
teeth = 24
missing_teeth = 0
speed = "crank"
angle = 15
filter = "medium"

[secondary]
pattern = "four_minus_one"
speed = "cam"
edge = "falling"

[engine]
max_rpm = 9000
crank_rpm = 350
stg_cycles = 2
spark_mode = "sequential"
inj_sequential = true
ignition_channels = 6

[vvt]
enabled = true
mode = "closed_loop"
angle_filter = 64
cl0_duty_angle = 10

[logging]
rotation = "daily"
tooth_log = "composite"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    assert_eq!(cfg.wheel.pattern, Pattern::DualWheel);
    assert_eq!(cfg.secondary.pattern, SecondaryPattern::FourMinusOne);
    assert_eq!(cfg.engine.ignition_channels, 6);
    assert_eq!(cfg.vvt.angle_filter, 64);
    cfg.validate().expect("valid config should pass");
}

#[rstest]
#[case("[wheel]\nteeth = 7", "must divide the 360° cycle")]
#[case("[wheel]\nteeth = 0", "wheel.teeth must be > 0")]
#[case("[wheel]\nteeth = 36\nmissing_teeth = 36", "missing_teeth must be < wheel.teeth")]
#[case("[wheel]\nteeth = 36\nmissing_teeth = 0", "must be >= 1 for the missing_tooth")]
#[case("[wheel]\npattern = \"dual_wheel\"\nteeth = 24\nmissing_teeth = 1", "must be 0 for the dual_wheel")]
#[case("[wheel]\nangle = 400", "wheel.angle must be in [-360, 360]")]
#[case("[wheel]\ngap_ratio_percent = 100", "gap_ratio_percent must be in [101, 400]")]
#[case("[engine]\ncrank_rpm = 10", "engine.crank_rpm must be >= 50")]
#[case("[engine]\nmax_rpm = 300", "engine.max_rpm must be > engine.crank_rpm")]
#[case("[engine]\nmax_rpm = 40000", "engine.max_rpm must be <= 30000")]
#[case("[engine]\nstrokes = 3", "engine.strokes must be 2 or 4")]
#[case("[engine]\nignition_channels = 9", "ignition_channels must be in [1, 8]")]
#[case("[engine]\nignition_channels = 0", "ignition_channels must be in [1, 8]")]
#[case("[engine]\nstrokes = 2\nspark_mode = \"sequential\"", "requires a four-stroke engine")]
#[case("[vvt]\nmode = \"closed_loop\"", "requires vvt.enabled = true")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "got: {err}");
}

#[test]
fn cam_speed_wheel_divides_720() {
    // 720 / 48 = 15, 360 / 48 is not whole
    let cfg = load_toml("[wheel]\nteeth = 48\nspeed = \"cam\"").expect("parse TOML");
    cfg.validate().expect("48 teeth at cam speed is valid");

    let cfg = load_toml("[wheel]\nteeth = 48").expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn unknown_enum_value_fails_to_parse() {
    assert!(load_toml("[wheel]\npattern = \"nissan_360\"").is_err());
}
