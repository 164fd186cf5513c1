/// LUT kind classification
///
/// The decode mode of a LUT asset is decided by its file extension alone,
/// never by looking at the content. A mislabelled or corrupt file is only
/// caught later, when it is loaded or applied.

use std::path::Path;

use crate::state::data::LutKind;

/// Extensions read as cube text; everything else is a Hald CLUT image
const CUBE_EXTENSIONS: [&str; 2] = ["cube", "3dl"];

/// Classify a LUT path by extension (case-insensitive)
pub fn classify(path: &str) -> LutKind {
    let is_cube = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            CUBE_EXTENSIONS.iter().any(|cube| ext.eq_ignore_ascii_case(cube))
        });

    if is_cube {
        LutKind::CubeText
    } else {
        LutKind::HaldImage
    }
}

/// Lower-cased extension, used as the image subtype of Hald data URIs
pub fn image_subtype(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
