//! Code 128 barcode generation for the access key.
//!
//! A 44-digit key encodes in pure subset C (22 digit pairs), giving the
//! densest possible symbol. The raster carries no human-readable text and
//! uses a fixed geometry sized for the DANFE key box.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{GrayImage, Luma};
use tracing::warn;

/// Width of one barcode module in pixels (≈0.38 mm at 96 dpi).
const MODULE_WIDTH: u32 = 2;
/// Bar height in pixels (≈11.5 mm at 96 dpi).
const BAR_HEIGHT: u32 = 44;
/// Quiet zone on each side, in modules (≈2.7 mm at 96 dpi).
const QUIET_ZONE_MODULES: u32 = 5;

const START_C: usize = 105;
const STOP: usize = 106;

/// Code 128 element widths, indexed by symbol value. Each digit is the
/// width in modules of alternating bars and spaces, starting with a bar.
const PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

/// Encode an access key as an inline PNG data URI.
///
/// Input that is not exactly 44 digits yields an empty string — the DANFE
/// page still renders, just without a barcode. Never errors.
pub fn barcode_data_uri(key: &str) -> String {
    let Some(values) = code128c_values(key) else {
        return String::new();
    };
    let image = draw(&values);
    let mut png = Vec::new();
    if let Err(e) = image.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png) {
        warn!(error = %e, "barcode PNG encoding failed");
        return String::new();
    }
    format!("data:image/png;base64,{}", STANDARD.encode(&png))
}

/// Symbol values for a pure subset C encoding: start, 22 digit pairs,
/// check symbol, stop. `None` unless the key is exactly 44 digits.
fn code128c_values(key: &str) -> Option<Vec<usize>> {
    if key.len() != 44 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut values = vec![START_C];
    for pair in key.as_bytes().chunks(2) {
        values.push(((pair[0] - b'0') as usize) * 10 + (pair[1] - b'0') as usize);
    }
    let checksum: usize = values[0]
        + values[1..]
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1) * v)
            .sum::<usize>();
    values.push(checksum % 103);
    values.push(STOP);
    Some(values)
}

fn draw(values: &[usize]) -> GrayImage {
    let data_modules: u32 = values
        .iter()
        .flat_map(|&v| PATTERNS[v].bytes())
        .map(|b| (b - b'0') as u32)
        .sum();
    let width = (data_modules + 2 * QUIET_ZONE_MODULES) * MODULE_WIDTH;
    let mut image = GrayImage::from_pixel(width, BAR_HEIGHT, Luma([255]));

    let mut x = QUIET_ZONE_MODULES * MODULE_WIDTH;
    for &value in values {
        let mut dark = true;
        for b in PATTERNS[value].bytes() {
            let element = (b - b'0') as u32 * MODULE_WIDTH;
            if dark {
                for px in x..x + element {
                    for py in 0..BAR_HEIGHT {
                        image.put_pixel(px, py, Luma([0]));
                    }
                }
            }
            x += element;
            dark = !dark;
        }
    }
    image
}
