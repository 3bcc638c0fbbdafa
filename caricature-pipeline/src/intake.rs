//! Photo intake: normalizes file-picker and camera input
//!
//! Both sources end up as a [`PhotoAsset`] carrying the raw bytes and a
//! self-contained data URL. This is a pure normalization boundary; nothing
//! here touches the network or persistent storage.

use crate::models::{PhotoAsset, SourceKind};
use std::path::Path;

/// Errors raised while normalizing user input
#[derive(Debug)]
pub enum IntakeError {
    /// The file is not a supported image type
    UnsupportedType(String),
    Io(std::io::Error),
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::UnsupportedType(mime) => {
                write!(f, "Unsupported file type: {}", mime)
            }
            IntakeError::Io(e) => write!(f, "Failed to read photo: {}", e),
        }
    }
}

impl std::error::Error for IntakeError {}

impl From<std::io::Error> for IntakeError {
    fn from(e: std::io::Error) -> Self {
        IntakeError::Io(e)
    }
}

/// Guesses an image MIME type from the file extension, `None` when the
/// extension does not belong to a supported image format.
fn image_mime_from_ext(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        Some("png") => Some("image/png"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("bmp") => Some("image/bmp"),
        Some("heic") | Some("heif") => Some("image/heic"),
        _ => None,
    }
}

/// Reads a picked file into a normalized upload asset.
///
/// Non-image files are rejected with [`IntakeError::UnsupportedType`]
/// before any bytes are read.
pub fn from_file(path: &Path) -> Result<PhotoAsset, IntakeError> {
    let mime = image_mime_from_ext(path).ok_or_else(|| {
        IntakeError::UnsupportedType(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        )
    })?;

    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string());

    log::debug!("Photo intake from file: {:?} ({})", path, mime);
    Ok(PhotoAsset::new(bytes, mime, filename, SourceKind::Upload))
}

/// Normalizes bytes that already arrived in memory (platform pickers that
/// deliver buffers instead of paths).
pub fn from_bytes(
    bytes: Vec<u8>,
    mime: &str,
    filename: Option<String>,
) -> Result<PhotoAsset, IntakeError> {
    if !mime.starts_with("image/") {
        return Err(IntakeError::UnsupportedType(mime.to_string()));
    }
    Ok(PhotoAsset::new(bytes, mime, filename, SourceKind::Upload))
}

/// Passthrough tagging for camera captures.
pub fn from_camera_capture(asset: PhotoAsset) -> PhotoAsset {
    asset.with_source(SourceKind::CameraCapture)
}

/// Holds the single "current" photo of an attempt.
///
/// Replacing the photo discards its predecessor; clearing returns intake to
/// the empty state.
#[derive(Default)]
pub struct PhotoIntake {
    current: Option<PhotoAsset>,
}

impl PhotoIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, asset: PhotoAsset) {
        self.current = Some(asset);
    }

    pub fn current(&self) -> Option<&PhotoAsset> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
