//! Best-effort character decoding for NFe byte streams.

use encoding_rs::Encoding;
use tracing::debug;

/// Ordered decode attempts. Per WHATWG the `iso-8859-1` and `latin1`
/// labels resolve to windows-1252, so three entries share one decoder; the
/// list stays explicit to match the documented probe order.
const PROBE_LABELS: &[&str] = &["utf-8", "iso-8859-1", "latin1", "windows-1252"];

/// Decode NFe bytes, probing encodings in a fixed order.
///
/// The first decode that reports no errors wins. Should every probe fail,
/// the bytes are decoded as UTF-8 with invalid sequences replaced — the
/// caller always gets text. Returns the text and the name of the chosen
/// encoding for diagnostics.
pub fn decode_xml_bytes(bytes: &[u8]) -> (String, &'static str) {
    for label in PROBE_LABELS {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            let (text, _, had_errors) = enc.decode(bytes);
            if !had_errors {
                debug!(encoding = enc.name(), "decoded NFe bytes");
                return (text.into_owned(), enc.name());
            }
        }
    }
    debug!("all probes reported errors, decoding lossily as UTF-8");
    (String::from_utf8_lossy(bytes).into_owned(), "UTF-8 (lossy)")
}
