use image::ImageFormat;

/// Returns true when the byte range decodes as a structurally intact JPEG.
///
/// Matching start/end markers are necessary but not sufficient: garbage
/// between a coincidental marker pair must be rejected here by a full decode.
#[must_use]
pub fn validate_jpeg(bytes: &[u8]) -> bool {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).is_ok()
}
