//! Gamma compression from linear HDR values to 8-bit display values
//!
//! This is a fixed display curve, not an adaptive operator: every channel
//! goes through `clip(c^(1/2.2), 0, 1) * 255`, truncated to u8.

use image::{ImageBuffer, Rgb, Rgb32FImage, RgbImage};

use crate::config::DISPLAY_GAMMA;

/// Compress a single linear channel value to an 8-bit display value
///
/// Negative and NaN inputs have no real power and are treated as black.
/// Anything brighter than 1.0 saturates at 255.
pub fn compress(c: f32) -> u8 {
    // f32::max returns the other operand when one side is NaN
    let linear = c.max(0.0);
    let display = linear.powf(1.0 / DISPLAY_GAMMA).clamp(0.0, 1.0);
    (display * 255.0) as u8
}

/// Tone-map a whole linear RGB image to RGB8
pub fn tonemap(linear: &Rgb32FImage) -> RgbImage {
    ImageBuffer::from_fn(linear.width(), linear.height(), |x, y| {
        let Rgb(channels) = *linear.get_pixel(x, y);
        Rgb(channels.map(compress))
    })
}
