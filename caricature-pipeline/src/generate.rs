//! Caricature generation pipeline
//!
//! Takes a normalized photo and a style preset, posts them to the remote
//! generation endpoint as multipart form data, classifies the response by
//! content type and normalizes whatever comes back into an image reference.
//! Every network-class failure degrades into a locally generated placeholder
//! so the caller always ends up with a usable image; only the missing-photo
//! precondition is surfaced as a hard error.
//!
//! Precondition (documented, not enforced): one generation per submission is
//! in flight at a time. The UI disables resubmission while one is pending.

use crate::models::{
    GenerationOutcome, GenerationRequest, PersistedResult, PhotoAsset, StoredInput,
    StylePreference,
};
use crate::placeholder;
use crate::store::{KeyValueStore, StoreError, INPUT_KEY, RESULT_KEY};
use base64::Engine;
use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

/// Default bound on the remote generation call
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Configuration for the generation pipeline.
///
/// An absent endpoint is a legal, expected state: the pipeline then runs in
/// fallback-only mode and every attempt yields a placeholder.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GenerationConfig {
    /// Reads the configuration from the environment with safe fallbacks.
    ///
    /// `CARICATURE_API_URL` — generation endpoint (unset or empty disables
    /// the remote call), `CARICATURE_API_KEY` — optional bearer token,
    /// `CARICATURE_TIMEOUT_SECS` — request bound in seconds.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("CARICATURE_API_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_key = std::env::var("CARICATURE_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let timeout = std::env::var("CARICATURE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self {
            endpoint,
            api_key,
            timeout,
        }
    }
}

/// Errors in the generation pipeline.
///
/// Only `NoPhotoProvided` ever crosses the `generate` boundary as `Err`;
/// the network-class variants are absorbed into a fallback outcome and
/// surface as its advisory message.
#[derive(Debug)]
pub enum GenerationError {
    /// Precondition: a photo must be attached before submitting
    NoPhotoProvided,
    /// Connection/CORS-class failure reaching the configured endpoint
    NetworkUnreachable { endpoint: String, detail: String },
    /// Endpoint answered with a non-success status
    HttpError(u16),
    /// Response carried neither image bytes nor a usable reference
    MalformedResponse(String),
    Store(StoreError),
    Other(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::NoPhotoProvided => {
                write!(f, "No photo provided. Pick or capture a photo first.")
            }
            GenerationError::NetworkUnreachable { endpoint, detail } => write!(
                f,
                "Could not reach the generation endpoint {}: {}. \
                 Check that the server is running, reachable from this device, \
                 and allows cross-origin requests.",
                endpoint, detail
            ),
            GenerationError::HttpError(status) => {
                write!(f, "Generation endpoint answered with HTTP {}", status)
            }
            GenerationError::MalformedResponse(msg) => {
                write!(f, "Malformed generation response: {}", msg)
            }
            GenerationError::Store(e) => write!(f, "Result store error: {}", e),
            GenerationError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<StoreError> for GenerationError {
    fn from(e: StoreError) -> Self {
        GenerationError::Store(e)
    }
}

/// Normalizes an endpoint response into an image reference.
///
/// Binary image bodies are re-encoded as a data URL. Structured bodies are
/// searched for `imageUrl` first, then for a base64 `image` payload (the
/// `data:image/jpeg;base64,` prefix is synthesized when missing).
pub fn classify_response(content_type: &str, body: &[u8]) -> Result<String, GenerationError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if media_type.starts_with("image/") {
        let encoded = base64::engine::general_purpose::STANDARD.encode(body);
        return Ok(format!("data:{};base64,{}", media_type, encoded));
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("body is neither an image nor JSON: {}", e))
    })?;

    if let Some(url) = value.get("imageUrl").and_then(|v| v.as_str()) {
        return Ok(url.to_string());
    }
    if let Some(payload) = value.get("image").and_then(|v| v.as_str()) {
        if payload.starts_with("data:") {
            return Ok(payload.to_string());
        }
        return Ok(format!("data:image/jpeg;base64,{}", payload));
    }

    Err(GenerationError::MalformedResponse(
        "response carries neither 'imageUrl' nor 'image'".to_string(),
    ))
}

/// Service driving generation attempts and the durable last-result record
pub struct GenerationService<S: KeyValueStore> {
    config: GenerationConfig,
    store: S,
    client: reqwest::Client,
}

impl<S: KeyValueStore> GenerationService<S> {
    pub fn new(config: GenerationConfig, store: S) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Other(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            config,
            store,
            client,
        })
    }

    /// Runs one generation attempt.
    ///
    /// Returns `Err` only for the missing-photo precondition, before any
    /// network activity. All remote failures yield a fallback outcome with
    /// `is_fallback` set and the failure recorded as an advisory. The
    /// result record is persisted before the outcome is returned so a
    /// restart can recover it.
    pub async fn generate(
        &self,
        photo: Option<&PhotoAsset>,
        style: StylePreference,
    ) -> Result<GenerationOutcome, GenerationError> {
        let photo = photo.ok_or(GenerationError::NoPhotoProvided)?;
        let request = GenerationRequest {
            photo: photo.clone(),
            style,
        };

        let outcome = match &self.config.endpoint {
            None => {
                log::info!("No generation endpoint configured, using placeholder");
                self.fallback_outcome(None)
            }
            Some(endpoint) => match self.call_endpoint(endpoint, &request).await {
                Ok(image_ref) => GenerationOutcome {
                    image_ref,
                    produced_at: Utc::now(),
                    is_fallback: false,
                    advisory: None,
                },
                Err(e) => {
                    log::warn!("Generation failed, falling back to placeholder: {}", e);
                    self.fallback_outcome(Some(e))
                }
            },
        };

        self.persist_result(&request, &outcome);
        Ok(outcome)
    }

    /// Posts the multipart payload and classifies the response.
    async fn call_endpoint(
        &self,
        endpoint: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let part = reqwest::multipart::Part::bytes(request.photo.bytes.clone())
            .file_name(request.photo.filename.clone())
            .mime_str(&request.photo.mime)
            .map_err(|e| GenerationError::Other(format!("Invalid photo MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("style", request.style.label());

        let mut req = self.client.post(endpoint).multipart(form);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "Posting {} ({} bytes) with style '{}' to {}",
            request.photo.filename,
            request.photo.bytes.len(),
            request.style.label(),
            endpoint
        );

        let response = req
            .send()
            .await
            .map_err(|e| GenerationError::NetworkUnreachable {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::HttpError(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| GenerationError::NetworkUnreachable {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;

        classify_response(&content_type, &body)
    }

    /// Produces the placeholder outcome. Never fails; keyed off a fresh
    /// token, not off photo content, since this is an explicit substitute.
    fn fallback_outcome(&self, cause: Option<GenerationError>) -> GenerationOutcome {
        let token = Uuid::new_v4().to_string();
        let advisory = match cause {
            Some(e) => format!("Generated a placeholder instead: {}", e),
            None => {
                "No generation endpoint is configured; a locally generated placeholder was used."
                    .to_string()
            }
        };
        GenerationOutcome {
            image_ref: placeholder::placeholder_data_url(&token),
            produced_at: Utc::now(),
            is_fallback: true,
            advisory: Some(advisory),
        }
    }

    /// Writes the durable last-result record, replacing any prior one.
    /// Store failures are logged, not raised — the user keeps the image.
    fn persist_result(&self, request: &GenerationRequest, outcome: &GenerationOutcome) {
        let record = PersistedResult {
            photo_data_url: request.photo.data_url.clone(),
            photo_filename: request.photo.filename.clone(),
            style: request.style.label().to_string(),
            image_ref: outcome.image_ref.clone(),
            is_fallback: outcome.is_fallback,
            produced_at_ms: outcome.produced_at.timestamp_millis(),
        };
        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(e) = self.store.set(RESULT_KEY, &json) {
                    log::error!("Failed to persist generation result: {}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize generation result: {}", e),
        }
    }

    /// Persists the last-input record (photo reference + style), replacing
    /// any prior one.
    pub fn save_input(
        &self,
        photo: &PhotoAsset,
        style: StylePreference,
    ) -> Result<(), GenerationError> {
        let record = StoredInput {
            photo_data_url: photo.data_url.clone(),
            photo_filename: Some(photo.filename.clone()),
            style: style.label().to_string(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| GenerationError::Other(format!("Serialize input failed: {}", e)))?;
        self.store.set(INPUT_KEY, &json)?;
        Ok(())
    }

    /// Reads the durable last-result record back. Corrupt records are
    /// treated as absent.
    pub fn last_result(&self) -> Result<Option<PersistedResult>, GenerationError> {
        match self.store.get(RESULT_KEY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    log::warn!("Discarding corrupt result record: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Reads the durable last-input record back.
    pub fn last_input(&self) -> Result<Option<StoredInput>, GenerationError> {
        match self.store.get(INPUT_KEY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    log::warn!("Discarding corrupt input record: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Removes the durable last-input record, leaving the last result in
    /// place. Idempotent.
    pub fn clear_input(&self) -> Result<(), GenerationError> {
        self.store.delete(INPUT_KEY)?;
        Ok(())
    }

    /// Removes both durable records. Idempotent.
    pub fn clear(&self) -> Result<(), GenerationError> {
        self.store.delete(RESULT_KEY)?;
        self.store.delete(INPUT_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_photo() -> PhotoAsset {
        PhotoAsset::new(
            vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
            "image/jpeg",
            Some("face.jpg".to_string()),
            SourceKind::Upload,
        )
    }

    fn service_with_endpoint(endpoint: Option<String>) -> GenerationService<MemoryStore> {
        let config = GenerationConfig {
            endpoint,
            api_key: None,
            timeout: Duration::from_secs(5),
        };
        GenerationService::new(config, MemoryStore::new()).unwrap()
    }

    /// Serves exactly one canned HTTP response, reading the full request
    /// first so the client can finish writing its multipart body.
    async fn canned_endpoint(status: &str, content_type: &str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();
        let content_type = content_type.to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read headers
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            // Drain the body based on Content-Length
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = headers
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            while buf.len() - header_end < content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response_head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                content_type,
                body.len()
            );
            socket.write_all(response_head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{}/caricature", addr)
    }

    #[test]
    fn test_classify_binary_image_response() {
        let bytes = vec![1u8, 2, 3, 4];
        let image_ref = classify_response("image/png", &bytes).unwrap();
        let payload = image_ref.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_classify_json_image_url() {
        let body = br#"{"imageUrl": "https://cdn.example.com/out.png"}"#;
        let image_ref = classify_response("application/json", body).unwrap();
        assert_eq!(image_ref, "https://cdn.example.com/out.png");
    }

    #[test]
    fn test_classify_json_bare_base64_gets_prefix() {
        let body = br#"{"image": "Zm9v"}"#;
        let image_ref = classify_response("application/json", body).unwrap();
        assert_eq!(image_ref, "data:image/jpeg;base64,Zm9v");
    }

    #[test]
    fn test_classify_json_prefixed_payload_kept() {
        let body = br#"{"image": "data:image/png;base64,Zm9v"}"#;
        let image_ref = classify_response("application/json", body).unwrap();
        assert_eq!(image_ref, "data:image/png;base64,Zm9v");
    }

    #[test]
    fn test_classify_rejects_empty_json() {
        let result = classify_response("application/json", b"{}");
        assert!(matches!(
            result,
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_classify_content_type_parameters_ignored() {
        let image_ref = classify_response("image/png; charset=binary", &[9u8]).unwrap();
        assert!(image_ref.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_generate_without_photo_makes_no_network_call() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let contacted = Arc::new(AtomicBool::new(false));
        let contacted_spy = contacted.clone();
        tokio::spawn(async move {
            if listener.accept().await.is_ok() {
                contacted_spy.store(true, Ordering::SeqCst);
            }
        });

        let service = service_with_endpoint(Some(format!("http://{}/caricature", addr)));
        let result = service.generate(None, StylePreference::default()).await;

        assert!(matches!(result, Err(GenerationError::NoPhotoProvided)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contacted.load(Ordering::SeqCst));
        assert!(service.last_result().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_binary_image_response_round_trips() {
        let body = vec![0x89u8, 0x50, 0x4E, 0x47, 7, 7, 7];
        let endpoint = canned_endpoint("200 OK", "image/png", body.clone()).await;
        let service = service_with_endpoint(Some(endpoint));

        let outcome = service
            .generate(Some(&test_photo()), StylePreference::CyberpunkNeon)
            .await
            .unwrap();

        assert!(!outcome.is_fallback);
        let payload = outcome
            .image_ref
            .strip_prefix("data:image/png;base64,")
            .unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, body);
    }

    #[tokio::test]
    async fn test_generate_json_base64_response() {
        let endpoint =
            canned_endpoint("200 OK", "application/json", br#"{"image": "Zm9v"}"#.to_vec()).await;
        let service = service_with_endpoint(Some(endpoint));

        let outcome = service
            .generate(Some(&test_photo()), StylePreference::default())
            .await
            .unwrap();

        assert!(!outcome.is_fallback);
        assert_eq!(outcome.image_ref, "data:image/jpeg;base64,Zm9v");
    }

    #[tokio::test]
    async fn test_generate_http_error_falls_back() {
        let endpoint = canned_endpoint("500 Internal Server Error", "text/plain", b"boom".to_vec())
            .await;
        let service = service_with_endpoint(Some(endpoint));

        let outcome = service
            .generate(Some(&test_photo()), StylePreference::default())
            .await
            .unwrap();

        assert!(outcome.is_fallback);
        assert!(outcome.advisory.as_deref().unwrap().contains("HTTP 500"));
        assert!(outcome.image_ref.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_generate_unreachable_endpoint_falls_back_and_persists() {
        // Bind and immediately drop to get a port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = format!("http://127.0.0.1:{}/caricature", port);
        let service = service_with_endpoint(Some(endpoint.clone()));

        let outcome = service
            .generate(Some(&test_photo()), StylePreference::PencilSketch)
            .await
            .unwrap();

        assert!(outcome.is_fallback);
        let advisory = outcome.advisory.as_deref().unwrap();
        assert!(advisory.contains(&endpoint));

        let record = service.last_result().unwrap().unwrap();
        assert_eq!(record.image_ref, outcome.image_ref);
        assert!(record.is_fallback);
        assert_eq!(record.style, "Pencil Sketch");
    }

    #[tokio::test]
    async fn test_generate_without_endpoint_uses_placeholder() {
        let service = service_with_endpoint(None);

        let outcome = service
            .generate(Some(&test_photo()), StylePreference::default())
            .await
            .unwrap();

        assert!(outcome.is_fallback);
        assert!(outcome.image_ref.starts_with("data:image/png;base64,"));
        assert!(service.last_result().unwrap().is_some());
    }

    #[test]
    fn test_persisted_records_round_trip() {
        let service = service_with_endpoint(None);
        let photo = test_photo();

        service
            .save_input(&photo, StylePreference::RenaissanceOil)
            .unwrap();
        let input = service.last_input().unwrap().unwrap();
        assert_eq!(input.photo_data_url, photo.data_url);
        assert_eq!(input.photo_filename.as_deref(), Some("face.jpg"));
        assert_eq!(input.style, "Renaissance Oil");

        service.clear().unwrap();
        assert!(service.last_input().unwrap().is_none());
        assert!(service.last_result().unwrap().is_none());
        // Clearing again is a no-op
        service.clear().unwrap();
    }

    #[tokio::test]
    async fn test_clear_input_leaves_result_untouched() {
        let service = service_with_endpoint(None);
        let photo = test_photo();

        service
            .generate(Some(&photo), StylePreference::default())
            .await
            .unwrap();
        service
            .save_input(&photo, StylePreference::default())
            .unwrap();

        service.clear_input().unwrap();
        assert!(service.last_input().unwrap().is_none());
        assert!(service.last_result().unwrap().is_some());
        // Clearing again is a no-op
        service.clear_input().unwrap();
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Runs without the variables set in the test environment
        let config = GenerationConfig::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
