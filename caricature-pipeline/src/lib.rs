//! # Caricature Pipeline
//!
//! Photo-capture and image-materialization pipeline for the caricature app.
//!
//! This crate provides the client-side core, UI-framework independent:
//! - Camera acquisition with an explicit start/stop/switch lifecycle
//! - Photo intake normalizing file-picker and camera input
//! - Caricature generation against a remote endpoint, with content-type
//!   aware response handling and a local placeholder fallback
//! - PNG export, including SVG rasterization
//! - A small key-value persistence port for the durable last-result and
//!   last-input records
//!
//! ## Platform Separation
//!
//! Device integration goes through the [`camera::CameraBackend`] trait;
//! platform-specific capture code lives behind it so the pipeline itself
//! stays testable with mock backends and an in-memory store.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use caricature_pipeline::{GenerationConfig, GenerationService, MemoryStore};
//!
//! let service = GenerationService::new(GenerationConfig::from_env(), MemoryStore::new())?;
//! let outcome = service.generate(Some(&photo), style).await?;
//! ```

pub mod camera;
pub mod export;
pub mod generate;
pub mod intake;
pub mod models;
pub mod placeholder;
pub mod store;

pub use camera::{CameraBackend, CameraError, CameraFrame, CameraSession};
pub use export::{ExportError, ExportService, SVG_RASTER_SIZE};
pub use generate::{
    classify_response, GenerationConfig, GenerationError, GenerationService, DEFAULT_TIMEOUT_SECS,
};
pub use intake::{IntakeError, PhotoIntake};
pub use models::{
    FacingMode, GenerationOutcome, GenerationRequest, PersistedResult, PhotoAsset, SourceKind,
    StoredInput, StylePreference,
};
pub use placeholder::{placeholder_data_url, PLACEHOLDER_SIZE};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError, INPUT_KEY, RESULT_KEY};
