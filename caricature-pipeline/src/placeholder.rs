//! Local placeholder image generation
//!
//! When the generation endpoint is absent or fails, the pipeline still has
//! to hand the user an image. The placeholder is a mirrored 5x5 geometric
//! pattern derived from a token via SHA-256: the same token always yields
//! the same image, and fresh tokens yield visually distinct ones. No
//! third-party avatar service is involved.

use base64::Engine;
use image::{Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;

const GRID: u32 = 5;
/// Rendered edge length in pixels
pub const PLACEHOLDER_SIZE: u32 = 512;

/// Renders the pattern for `token` and returns it as a PNG data URL.
pub fn placeholder_data_url(token: &str) -> String {
    let png = placeholder_png(token);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    format!("data:image/png;base64,{}", encoded)
}

/// Renders the pattern for `token` as PNG bytes.
pub fn placeholder_png(token: &str) -> Vec<u8> {
    let digest = Sha256::digest(token.as_bytes());

    // Foreground color from the first digest bytes, kept away from white
    // so the pattern stays visible on the light background.
    let foreground = Rgb([
        digest[0] % 200,
        digest[1] % 200,
        digest[2] % 200,
    ]);
    let background = Rgb([240u8, 240, 240]);

    // Left three columns from digest bits, mirrored onto the right two.
    let mut cells = [[false; GRID as usize]; GRID as usize];
    let mut bit = 0usize;
    for y in 0..GRID as usize {
        for x in 0..=(GRID as usize / 2) {
            let byte = digest[3 + bit / 8];
            let filled = (byte >> (bit % 8)) & 1 == 1;
            cells[y][x] = filled;
            cells[y][GRID as usize - 1 - x] = filled;
            bit += 1;
        }
    }

    let mut img = RgbImage::new(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE);
    for (px, py, pixel) in img.enumerate_pixels_mut() {
        let cx = (px * GRID / PLACEHOLDER_SIZE).min(GRID - 1) as usize;
        let cy = (py * GRID / PLACEHOLDER_SIZE).min(GRID - 1) as usize;
        *pixel = if cells[cy][cx] { foreground } else { background };
    }

    let mut buffer = Cursor::new(Vec::new());
    // Encoding an in-memory RGB image as PNG cannot fail
    if let Err(e) = image::DynamicImage::ImageRgb8(img).write_to(&mut buffer, image::ImageFormat::Png)
    {
        log::error!("Placeholder encode failed: {}", e);
        return Vec::new();
    }
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_deterministic_per_token() {
        let a1 = placeholder_data_url("token-a");
        let a2 = placeholder_data_url("token-a");
        let b = placeholder_data_url("token-b");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn test_placeholder_decodes_to_expected_size() {
        let png = placeholder_png("some-token");
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.width(), PLACEHOLDER_SIZE);
        assert_eq!(img.height(), PLACEHOLDER_SIZE);
    }

    #[test]
    fn test_placeholder_data_url_prefix() {
        let url = placeholder_data_url("x");
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
