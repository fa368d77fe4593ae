#![no_main]
use libfuzzer_sys::fuzz_target;
use trigger_core::Trigger;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<trigger_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // a validated config must never make the builder panic
        let _ = Trigger::builder().apply_config(&cfg).try_build();
    }
});
