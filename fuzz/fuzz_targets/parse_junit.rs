#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(run) = testdelta_adapters::parse_junit_str(s) {
            assert_eq!(run.total_tests, run.passed + run.failed + run.skipped);
            assert!(run.total_duration_ms >= 0.0);
        }
    }
});
