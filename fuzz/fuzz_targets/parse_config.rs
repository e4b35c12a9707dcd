#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<testdelta_types::ConfigFile>(s) {
            if let Some(pct) = config.defaults.threshold {
                let _ = testdelta_domain::DurationThreshold::new(pct);
            }
        }
    }
});
