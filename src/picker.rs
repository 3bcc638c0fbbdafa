// Platform-specific image picker. Desktop builds use the native file
// dialog; mobile builds need a platform integration and report an error
// until one is wired up.

use crate::error::AppError;
use std::path::PathBuf;

/// Opens the platform file dialog restricted to image files.
///
/// Returns `Ok(None)` when the user cancels the dialog.
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub fn pick_image() -> Result<Option<PathBuf>, AppError> {
    let picked = rfd::FileDialog::new()
        .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif", "bmp"])
        .pick_file();
    Ok(picked)
}

#[cfg(any(target_os = "android", target_os = "ios"))]
pub fn pick_image() -> Result<Option<PathBuf>, AppError> {
    Err(AppError::PlatformNotSupported(
        "The image picker is not integrated on this platform yet".to_string(),
    ))
}
