//! Live camera acquisition
//!
//! Owns the start/stop/switch lifecycle of a capture device and turns the
//! current frame into a [`PhotoAsset`]. The actual device integration sits
//! behind [`CameraBackend`] so platform code (and tests) can plug in their
//! own implementation; platforms without an integration get an explicit
//! unsupported stub instead of a silent failure.

use crate::models::{FacingMode, PhotoAsset, SourceKind};
use chrono::Utc;
use std::io::Cursor;

/// Typed camera failures surfaced to the UI boundary
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    PermissionDenied(String),
    NotFound(String),
    NotReadable(String),
    /// Capture requested while no stream is attached
    NotActive,
    PlatformNotSupported(String),
    Unknown(String),
}

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CameraError::NotFound(msg) => write!(f, "No camera found: {}", msg),
            CameraError::NotReadable(msg) => write!(f, "Camera not readable: {}", msg),
            CameraError::NotActive => write!(f, "No active camera stream"),
            CameraError::PlatformNotSupported(msg) => {
                write!(f, "Platform not supported: {}", msg)
            }
            CameraError::Unknown(msg) => write!(f, "Camera error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}

/// One frame at the device's native resolution, tightly packed RGB8
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub rgb8: Vec<u8>,
}

/// Device seam for camera integrations.
///
/// Implementations own the OS-level camera handle. `open` must release any
/// partially acquired resources on failure; `close` must be safe to call
/// when nothing is open.
pub trait CameraBackend {
    fn is_supported(&self) -> bool;
    fn open(&mut self, facing: FacingMode) -> Result<(), CameraError>;
    fn close(&mut self);
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError>;
}

/// Runtime handle to a live capture device.
///
/// At most one stream is active at a time: starting while active tears the
/// old stream down first, and every exit path (stop, failed switch, drop)
/// leaves the device released.
pub struct CameraSession<B: CameraBackend> {
    backend: B,
    active: bool,
    facing: FacingMode,
    supported: Option<bool>,
    last_error: Option<CameraError>,
}

impl<B: CameraBackend> CameraSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: false,
            facing: FacingMode::Environment,
            supported: None,
            last_error: None,
        }
    }

    /// Whether the platform exposes a capture API. Resolved once, cached
    /// for the session.
    pub fn is_supported(&mut self) -> bool {
        match self.supported {
            Some(supported) => supported,
            None => {
                let supported = self.backend.is_supported();
                self.supported = Some(supported);
                supported
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn last_error(&self) -> Option<&CameraError> {
        self.last_error.as_ref()
    }

    /// Requests device access with the given facing preference.
    ///
    /// A stream that is already active is stopped first; there is never a
    /// moment with two streams open.
    pub fn start(&mut self, facing: FacingMode) -> Result<(), CameraError> {
        if self.active {
            self.backend.close();
            self.active = false;
        }
        match self.backend.open(facing) {
            Ok(()) => {
                self.active = true;
                self.facing = facing;
                self.last_error = None;
                log::debug!("Camera started ({:?})", facing);
                Ok(())
            }
            Err(e) => {
                log::warn!("Camera start failed: {}", e);
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Releases the device. Idempotent; safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.active {
            self.backend.close();
            self.active = false;
            log::debug!("Camera stopped");
        }
    }

    /// Stops the current stream and restarts with the opposite facing mode.
    ///
    /// If the restart fails the session ends in the stopped state; the old
    /// stream is never kept alive.
    pub fn switch_facing(&mut self) -> Result<(), CameraError> {
        let target = self.facing.opposite();
        self.stop();
        self.start(target)
    }

    /// Encodes the current frame into a [`PhotoAsset`] at native resolution.
    ///
    /// `quality` (0-100) applies to JPEG output; other MIME types are
    /// encoded as PNG. Fails with [`CameraError::NotActive`] when no stream
    /// is attached.
    pub fn capture_frame(&mut self, quality: u8, mime: &str) -> Result<PhotoAsset, CameraError> {
        if !self.active {
            return Err(CameraError::NotActive);
        }
        let frame = self.backend.read_frame()?;
        let img = image::RgbImage::from_raw(frame.width, frame.height, frame.rgb8)
            .ok_or_else(|| CameraError::NotReadable("Frame buffer size mismatch".to_string()))?;
        let dynamic = image::DynamicImage::ImageRgb8(img);

        let mut buffer = Cursor::new(Vec::new());
        let (encoded_mime, ext) = if mime == "image/jpeg" {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
            dynamic
                .write_with_encoder(encoder)
                .map_err(|e| CameraError::Unknown(format!("Frame encode failed: {}", e)))?;
            ("image/jpeg", "jpg")
        } else {
            dynamic
                .write_to(&mut buffer, image::ImageFormat::Png)
                .map_err(|e| CameraError::Unknown(format!("Frame encode failed: {}", e)))?;
            ("image/png", "png")
        };

        let filename = format!("capture_{}.{}", Utc::now().timestamp_millis(), ext);
        log::debug!(
            "Captured {}x{} frame as {}",
            frame.width,
            frame.height,
            filename
        );
        Ok(PhotoAsset::new(
            buffer.into_inner(),
            encoded_mime,
            Some(filename),
            SourceKind::CameraCapture,
        ))
    }
}

impl<B: CameraBackend> Drop for CameraSession<B> {
    fn drop(&mut self) {
        // Device handles are a scarce shared resource; release on teardown.
        self.stop();
    }
}

/// Platform integrations.
///
/// Desktop and mobile builds without a native capture integration get a
/// stub that reports the platform as unsupported, so the UI can offer the
/// file-picker path instead.
pub mod platform {
    use super::{CameraBackend, CameraError, CameraFrame};
    use crate::models::FacingMode;

    /// Stub backend for platforms without a camera integration
    #[derive(Debug, Default)]
    pub struct UnsupportedBackend;

    impl CameraBackend for UnsupportedBackend {
        fn is_supported(&self) -> bool {
            false
        }

        fn open(&mut self, _facing: FacingMode) -> Result<(), CameraError> {
            Err(CameraError::PlatformNotSupported(
                "Camera capture not available on this platform".to_string(),
            ))
        }

        fn close(&mut self) {}

        fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
            Err(CameraError::PlatformNotSupported(
                "Camera capture not available on this platform".to_string(),
            ))
        }
    }

    /// Backend for the current platform.
    pub fn default_backend() -> UnsupportedBackend {
        UnsupportedBackend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts open/close calls and optionally fails opening a given facing
    #[derive(Default)]
    struct MockState {
        opens: u32,
        closes: u32,
        open_streams: i32,
        fail_facing: Option<FacingMode>,
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        state: Rc<RefCell<MockState>>,
    }

    impl MockBackend {
        fn failing_on(facing: FacingMode) -> Self {
            let backend = MockBackend::default();
            backend.state.borrow_mut().fail_facing = Some(facing);
            backend
        }
    }

    impl CameraBackend for MockBackend {
        fn is_supported(&self) -> bool {
            true
        }

        fn open(&mut self, facing: FacingMode) -> Result<(), CameraError> {
            let mut state = self.state.borrow_mut();
            if state.fail_facing == Some(facing) {
                return Err(CameraError::NotReadable("mock failure".to_string()));
            }
            state.opens += 1;
            state.open_streams += 1;
            Ok(())
        }

        fn close(&mut self) {
            let mut state = self.state.borrow_mut();
            state.closes += 1;
            state.open_streams -= 1;
        }

        fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
            // 2x2 solid gray frame
            Ok(CameraFrame {
                width: 2,
                height: 2,
                rgb8: vec![128; 2 * 2 * 3],
            })
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = MockBackend::default();
        let state = backend.state.clone();
        let mut session = CameraSession::new(backend);

        session.start(FacingMode::Environment).unwrap();
        session.stop();
        session.stop();

        let state = state.borrow();
        assert_eq!(state.opens, 1);
        assert_eq!(state.closes, 1);
        assert_eq!(state.open_streams, 0);
    }

    #[test]
    fn test_start_while_active_replaces_stream() {
        let backend = MockBackend::default();
        let state = backend.state.clone();
        let mut session = CameraSession::new(backend);

        session.start(FacingMode::Environment).unwrap();
        session.start(FacingMode::Environment).unwrap();

        assert!(session.is_active());
        assert_eq!(state.borrow().open_streams, 1);
    }

    #[test]
    fn test_switch_facing_success() {
        let backend = MockBackend::default();
        let state = backend.state.clone();
        let mut session = CameraSession::new(backend);

        session.start(FacingMode::Environment).unwrap();
        session.switch_facing().unwrap();

        assert!(session.is_active());
        assert_eq!(session.facing(), FacingMode::User);
        assert_eq!(state.borrow().open_streams, 1);
    }

    #[test]
    fn test_switch_facing_failure_leaves_session_stopped() {
        let backend = MockBackend::failing_on(FacingMode::User);
        let state = backend.state.clone();
        let mut session = CameraSession::new(backend);

        session.start(FacingMode::Environment).unwrap();
        let result = session.switch_facing();

        assert!(result.is_err());
        assert!(!session.is_active());
        assert_eq!(state.borrow().open_streams, 0);
        assert!(session.last_error().is_some());
    }

    #[test]
    fn test_capture_requires_active_stream() {
        let mut session = CameraSession::new(MockBackend::default());
        let result = session.capture_frame(90, "image/jpeg");
        assert_eq!(result.unwrap_err(), CameraError::NotActive);
    }

    #[test]
    fn test_capture_frame_produces_asset() {
        let mut session = CameraSession::new(MockBackend::default());
        session.start(FacingMode::User).unwrap();

        let asset = session.capture_frame(90, "image/jpeg").unwrap();
        assert_eq!(asset.mime, "image/jpeg");
        assert_eq!(asset.source_kind, SourceKind::CameraCapture);
        assert!(asset.filename.starts_with("capture_"));
        assert!(asset.filename.ends_with(".jpg"));

        // The encoded bytes decode back to the frame's native resolution
        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn test_drop_releases_device() {
        let backend = MockBackend::default();
        let state = backend.state.clone();
        {
            let mut session = CameraSession::new(backend);
            session.start(FacingMode::Environment).unwrap();
        }
        assert_eq!(state.borrow().open_streams, 0);
    }

    #[test]
    fn test_unsupported_platform_stub() {
        let mut session = CameraSession::new(platform::default_backend());
        assert!(!session.is_supported());
        assert!(matches!(
            session.start(FacingMode::User),
            Err(CameraError::PlatformNotSupported(_))
        ));
        assert!(!session.is_active());
    }
}
