#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or produce a config whose
    // validation returns cleanly. Neither path may panic.
    if let Ok(cfg) = rover_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // Every pin in a valid config is a distinct BCM GPIO.
            let pins = cfg.pins.all();
            for (i, (_, a)) in pins.iter().enumerate() {
                assert!(*a <= 27);
                assert!(pins[i + 1..].iter().all(|(_, b)| b != a));
            }
        }
    }
});
