#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes go through the same decode-then-extract path the
    // batch walk uses. Must not panic — errors are fine, panics are bugs.
    let (xml, _) = danfe::nfe::decode_xml_bytes(data);
    let _ = danfe::nfe::is_invoice_document(&xml);
    let _ = danfe::nfe::extract_invoice(&xml, "fuzz");
});
