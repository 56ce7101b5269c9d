#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The decoder must always produce text, whatever the bytes.
    let (text, encoding) = danfe::nfe::decode_xml_bytes(data);
    assert!(!encoding.is_empty());
    let _ = text.len();
});
