//! PNG export for produced caricatures
//!
//! Takes whatever image reference the pipeline produced — remote URL, raster
//! data URL or SVG — and materializes it as a downloadable PNG file. Vector
//! sources are rasterized at a fixed 512x512 over an opaque white background
//! since the exported PNG must not carry transparency.

use crate::generate::DEFAULT_TIMEOUT_SECS;
use base64::Engine;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Edge length for rasterized vector sources
pub const SVG_RASTER_SIZE: u32 = 512;

/// Export failures. There is no fallback for "cannot produce a file", so
/// these surface to the caller as hard errors.
#[derive(Debug)]
pub enum ExportError {
    /// Source image could not be decoded
    ImageLoad(String),
    /// PNG encoding failed
    PngEncode(String),
    /// Remote image reference could not be fetched
    Fetch(String),
    Io(std::io::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::ImageLoad(msg) => write!(f, "Image load error: {}", msg),
            ExportError::PngEncode(msg) => write!(f, "PNG encode error: {}", msg),
            ExportError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            ExportError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Service materializing image references as PNG files
pub struct ExportService {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportService {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Same service with a custom bound on remote fetches.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Writes `image_ref` as a PNG named `filename` into `out_dir`.
    ///
    /// A `.png` extension is forced when absent. Returns the path of the
    /// written file.
    pub async fn export_png(
        &self,
        image_ref: &str,
        filename: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let filename = if filename.ends_with(".png") {
            filename.to_string()
        } else {
            format!("{}.png", filename)
        };

        let png = self.png_bytes(image_ref).await?;

        std::fs::create_dir_all(out_dir)?;
        let out_path = out_dir.join(&filename);
        std::fs::write(&out_path, &png)?;
        log::info!("Exported {} ({} bytes)", out_path.display(), png.len());
        Ok(out_path)
    }

    /// Produces the PNG bytes for an image reference without touching disk.
    pub async fn png_bytes(&self, image_ref: &str) -> Result<Vec<u8>, ExportError> {
        if let Some((mime, bytes)) = decode_data_url(image_ref)? {
            if mime.contains("svg") {
                return png_from_svg(&bytes);
            }
            return png_from_raster(&bytes);
        }

        // Remote reference: fetch with a bounded timeout, then dispatch on
        // what actually came back
        let response = self
            .client
            .get(image_ref)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ExportError::Fetch(format!("{}: {}", image_ref, e)))?;
        if !response.status().is_success() {
            return Err(ExportError::Fetch(format!(
                "{}: HTTP {}",
                image_ref,
                response.status().as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::Fetch(format!("{}: {}", image_ref, e)))?;

        if is_svg_ref(image_ref) || looks_like_svg(&bytes) {
            png_from_svg(&bytes)
        } else {
            png_from_raster(&bytes)
        }
    }
}

/// Splits a data URL into MIME type and decoded bytes; `None` for other
/// reference kinds.
fn decode_data_url(image_ref: &str) -> Result<Option<(String, Vec<u8>)>, ExportError> {
    let Some(rest) = image_ref.strip_prefix("data:") else {
        return Ok(None);
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExportError::ImageLoad("data URL without payload".to_string()))?;

    let mime = header.split(';').next().unwrap_or("").to_string();
    let bytes = if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ExportError::ImageLoad(format!("base64 decode failed: {}", e)))?
    } else {
        // Percent-encoded inline payloads (plain SVG data URLs)
        payload.as_bytes().to_vec()
    };
    Ok(Some((mime, bytes)))
}

/// URL-shaped hints that a reference points at a vector source
fn is_svg_ref(image_ref: &str) -> bool {
    image_ref.contains(".svg") || image_ref.contains("svg?")
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg"))
}

/// Rasterizes an SVG source into a 512x512 PNG over opaque white.
fn png_from_svg(svg: &[u8]) -> Result<Vec<u8>, ExportError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg, &options)
        .map_err(|e| ExportError::ImageLoad(format!("SVG parse failed: {}", e)))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(SVG_RASTER_SIZE, SVG_RASTER_SIZE)
        .ok_or_else(|| ExportError::PngEncode("Failed to allocate pixmap".to_string()))?;
    pixmap.fill(resvg::tiny_skia::Color::WHITE);

    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(ExportError::ImageLoad("SVG has no size".to_string()));
    }
    let sx = SVG_RASTER_SIZE as f32 / size.width();
    let sy = SVG_RASTER_SIZE as f32 / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // The background is opaque, so the premultiplied pixmap data is plain RGBA
    let img = image::RgbaImage::from_raw(SVG_RASTER_SIZE, SVG_RASTER_SIZE, pixmap.data().to_vec())
        .ok_or_else(|| ExportError::PngEncode("Pixmap buffer size mismatch".to_string()))?;
    encode_png(&image::DynamicImage::ImageRgba8(img))
}

/// Re-encodes a raster source as PNG at its native size.
fn png_from_raster(bytes: &[u8]) -> Result<Vec<u8>, ExportError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExportError::ImageLoad(format!("Image decode failed: {}", e)))?;
    encode_png(&img)
}

fn encode_png(img: &image::DynamicImage) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| ExportError::PngEncode(e.to_string()))?;
    Ok(buffer.into_inner())
}
