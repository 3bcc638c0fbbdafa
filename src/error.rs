use caricature_pipeline::{CameraError, ExportError, GenerationError, IntakeError, StoreError};
use std::fmt;

/// Central error types for the Caricature Studio app
#[derive(Debug)]
pub enum AppError {
    /// Camera/device error
    Camera(CameraError),
    /// Photo intake error (unsupported type, read failure)
    Intake(IntakeError),
    /// Generation pipeline error
    Generation(GenerationError),
    /// PNG export error
    Export(ExportError),
    /// Persistence layer error
    Store(StoreError),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Feature not available on this platform
    PlatformNotSupported(String),
    /// General error
    #[allow(dead_code)]
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Intake(e) => write!(f, "Photo error: {}", e),
            AppError::Generation(e) => write!(f, "Generation error: {}", e),
            AppError::Export(e) => write!(f, "Export error: {}", e),
            AppError::Store(e) => write!(f, "Storage error: {}", e),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::PlatformNotSupported(msg) => write!(f, "Not supported: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<CameraError> for AppError {
    fn from(e: CameraError) -> Self {
        AppError::Camera(e)
    }
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        AppError::Intake(e)
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        AppError::Generation(e)
    }
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        AppError::Export(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

/// User-friendly error messages for UI display
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Camera(CameraError::PermissionDenied(_)) => {
                "Camera permission is required to take a photo.".to_string()
            }
            AppError::Camera(CameraError::NotFound(_)) => {
                "No camera was found on this device.".to_string()
            }
            AppError::Camera(_) => "The camera could not be used. Please try again.".to_string(),
            AppError::Intake(IntakeError::UnsupportedType(_)) => {
                "Please choose an image file (JPEG, PNG, WebP).".to_string()
            }
            AppError::Intake(_) => "The photo could not be read.".to_string(),
            AppError::Generation(GenerationError::NoPhotoProvided) => {
                "Please add a photo before generating.".to_string()
            }
            AppError::Generation(e) => e.to_string(),
            AppError::Export(_) => "The image could not be saved as PNG.".to_string(),
            AppError::Store(_) => "A storage error occurred. Please try again.".to_string(),
            AppError::Filesystem(_) => "Error accessing files. Please check permissions.".to_string(),
            AppError::PlatformNotSupported(msg) => msg.clone(),
            AppError::Other(msg) => msg.clone(),
        }
    }
}
