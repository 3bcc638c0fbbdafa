use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a photo came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Upload,
    CameraCapture,
}

/// Normalized in-memory representation of a user-supplied photo.
///
/// Carries both the raw bytes and a self-contained data URL. The two always
/// encode the same content; construct assets through [`PhotoAsset::new`] so
/// they cannot diverge. Assets are superseded, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoAsset {
    pub data_url: String,
    pub bytes: Vec<u8>,
    pub mime: String,
    pub filename: String,
    pub source_kind: SourceKind,
}

impl PhotoAsset {
    /// Builds an asset from raw bytes, deriving the data URL.
    ///
    /// When no filename is given, one is generated from the current timestamp
    /// and the MIME subtype (e.g. `photo_1693400000000.jpeg`).
    pub fn new(
        bytes: Vec<u8>,
        mime: &str,
        filename: Option<String>,
        source_kind: SourceKind,
    ) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let data_url = format!("data:{};base64,{}", mime, encoded);
        let filename = filename.unwrap_or_else(|| {
            let ext = mime.split('/').nth(1).unwrap_or("jpeg");
            format!("photo_{}.{}", Utc::now().timestamp_millis(), ext)
        });
        Self {
            data_url,
            bytes,
            mime: mime.to_string(),
            filename,
            source_kind,
        }
    }

    /// Re-tags the asset with a different source without touching its content.
    pub fn with_source(mut self, source_kind: SourceKind) -> Self {
        self.source_kind = source_kind;
        self
    }

    /// Reconstructs an asset from a persisted base64 data URL, e.g. when
    /// restoring the last input after a restart. `None` when the string is
    /// not a decodable data URL.
    pub fn from_data_url(
        data_url: &str,
        filename: Option<String>,
        source_kind: SourceKind,
    ) -> Option<Self> {
        let rest = data_url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        let mime = header.split(';').next()?.to_string();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?;
        Some(Self::new(bytes, &mime, filename, source_kind))
    }
}

/// Camera orientation preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacingMode {
    User,
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

/// Stylistic preset for the generated caricature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StylePreference {
    Pixar3d,
    CyberpunkNeon,
    PencilSketch,
    RenaissanceOil,
}

impl Default for StylePreference {
    fn default() -> Self {
        StylePreference::Pixar3d
    }
}

impl StylePreference {
    pub const ALL: [StylePreference; 4] = [
        StylePreference::Pixar3d,
        StylePreference::CyberpunkNeon,
        StylePreference::PencilSketch,
        StylePreference::RenaissanceOil,
    ];

    /// Wire label sent to the generation endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            StylePreference::Pixar3d => "3D Pixar",
            StylePreference::CyberpunkNeon => "Cyberpunk Neon",
            StylePreference::PencilSketch => "Pencil Sketch",
            StylePreference::RenaissanceOil => "Renaissance Oil",
        }
    }

    /// Parses a wire label, defaulting when unknown or absent.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Cyberpunk Neon" => StylePreference::CyberpunkNeon,
            "Pencil Sketch" => StylePreference::PencilSketch,
            "Renaissance Oil" => StylePreference::RenaissanceOil,
            _ => StylePreference::Pixar3d,
        }
    }
}

/// One submission attempt, immutable once constructed
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub photo: PhotoAsset,
    pub style: StylePreference,
}

/// Result of a generation attempt.
///
/// `image_ref` is either a remote URL or a data URL; bare base64 payloads
/// from the endpoint are normalized before they reach this type. A fallback
/// outcome is still a usable result, with `is_fallback` set and an advisory
/// message for non-blocking UI display.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub image_ref: String,
    pub produced_at: DateTime<Utc>,
    pub is_fallback: bool,
    pub advisory: Option<String>,
}

/// Durable "last result" record, written wholesale on each attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedResult {
    pub photo_data_url: String,
    pub photo_filename: String,
    pub style: String,
    pub image_ref: String,
    pub is_fallback: bool,
    pub produced_at_ms: i64,
}

/// Durable "last input" record (photo reference + chosen style)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInput {
    pub photo_data_url: String,
    pub photo_filename: Option<String>,
    pub style: String,
}
