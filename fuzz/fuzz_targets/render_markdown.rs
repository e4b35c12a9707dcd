#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(receipt) = serde_json::from_slice::<testdelta_types::DiffReceipt>(data) {
        let _ = testdelta_render::render_markdown(&receipt);
        let _ = testdelta_render::github_annotations(&receipt);
        let _ = testdelta_render::render_html(&receipt);
    }
});
