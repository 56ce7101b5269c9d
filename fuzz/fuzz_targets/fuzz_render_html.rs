#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any record the extractor produces must bind into the template.
    if let Ok(xml) = std::str::from_utf8(data) {
        if let Ok(record) = danfe::nfe::extract_invoice(xml, "fuzz") {
            let _ = danfe::render::render_html(&record);
        }
    }
});
