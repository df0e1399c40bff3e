//! Luminance thresholding: collapse an RGBA image to black/white.
//!
//! Per pixel, linear luminance is computed from the RGB channels,
//! gamma-encoded to perceptual luminance, and compared against the
//! white threshold. The output raster stores 255 for white (not
//! etched) and 0 for black (etched).
//!
//! This is the first pipeline step after decoding. It always runs
//! against the original decoded image, never a prior binarization,
//! so repeated threshold changes do not compound.

use image::{GrayImage, Luma, RgbaImage};

/// Pixel value for white (not etched) in the binarized raster.
pub const WHITE: u8 = 255;

/// Pixel value for black (etched) in the binarized raster.
pub const BLACK: u8 = 0;

/// Binarize an RGBA image against a white threshold in [0, 1].
///
/// A pixel is white when its perceptual luminance is at least
/// `white_threshold`, black otherwise. The output has identical
/// dimensions to the input. Running twice with identical inputs
/// yields byte-identical output.
#[must_use = "returns the binarized raster"]
pub fn binarize(image: &RgbaImage, white_threshold: f32) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let value = if perceptual_luminance(r, g, b) >= white_threshold {
            WHITE
        } else {
            BLACK
        };
        Luma([value])
    })
}

/// Perceptual (gamma-encoded) luminance of an 8-bit RGB triple, in [0, 1].
///
/// Linear luminance uses the Rec. 709 weights over normalized channels;
/// the result is then sRGB gamma encoded so the threshold compares
/// against what the eye perceives rather than raw light energy.
#[must_use]
pub fn perceptual_luminance(r: u8, g: u8, b: u8) -> f32 {
    let linear = 0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b);
    srgb_encode(linear)
}

/// Normalize an 8-bit channel to [0, 1].
fn channel(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// The sRGB gamma encoding function.
///
/// Linear segment below 0.003_130_8, power curve above.
fn srgb_encode(c: f32) -> f32 {
    if c < 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Returns `true` if the binarized raster pixel at (x, y) is black.
///
/// Out-of-bounds coordinates read as white, so callers can probe
/// neighborhoods without separate bounds checks.
#[must_use]
pub fn is_black(raster: &GrayImage, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 {
        return false;
    }
    let (x, y) = (x.unsigned_abs(), y.unsigned_abs());
    if x >= raster.width() || y >= raster.height() {
        return false;
    }
    raster.get_pixel(x, y).0[0] == BLACK
}
