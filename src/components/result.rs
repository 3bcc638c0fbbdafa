use crate::{database, error::AppError, Screen};
use caricature_pipeline::{ExportService, GenerationConfig, GenerationService, PersistedResult};
use chrono::DateTime;
use dioxus::prelude::*;
use std::path::PathBuf;

#[component]
pub fn ResultScreen(on_navigate: EventHandler<Screen>) -> Element {
    let result = use_hook(|| match load_last_result() {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Could not load last result: {}", e);
            None
        }
    });

    let mut exporting = use_signal(|| false);
    let mut exported_to = use_signal(|| None::<PathBuf>);
    let mut error = use_signal(|| None::<String>);

    let export_record = result.clone();
    let mut handle_export = move || {
        if exporting() {
            return;
        }
        let Some(record) = export_record.clone() else {
            return;
        };

        exporting.set(true);
        error.set(None);
        spawn(async move {
            match run_export(&record).await {
                Ok(path) => exported_to.set(Some(path)),
                Err(e) => error.set(Some(e.user_message())),
            }
            exporting.set(false);
        });
    };

    let mut handle_start_over = move || {
        if let Err(e) = clear_records() {
            log::warn!("Could not clear stored records: {}", e);
        }
        on_navigate.call(Screen::Upload);
    };

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",

            div { style: "display: flex; align-items: center; margin-bottom: 24px;",
                button {
                    class: "btn-secondary",
                    style: "margin-right: 12px; padding: 8px 16px;",
                    onclick: move |_| on_navigate.call(Screen::Upload),
                    "← Back"
                }
                h1 { style: "color: #0066cc; font-size: 24px; font-weight: 700; margin: 0;",
                    "Your caricature"
                }
            }

            if let Some(err) = error() {
                div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                    "⚠️ {err}"
                }
            }

            if let Some(record) = result.clone() {
                div { class: "card",

                    if record.is_fallback {
                        div { style: "background: #fff8e1; border: 1px solid #ffe082; color: #8d6e00; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                            "ℹ️ The generation service was unavailable, so this is a locally generated placeholder."
                        }
                    }

                    img {
                        src: "{record.image_ref}",
                        style: "width: 100%; border-radius: 8px; background: #f0f0f0;",
                    }

                    div { style: "display: flex; justify-content: space-between; margin: 12px 0 20px 0; font-size: 13px; color: #666;",
                        span { "{record.style}" }
                        span { "{format_produced_at(record.produced_at_ms)}" }
                    }

                    if let Some(path) = exported_to() {
                        div { style: "background: #efe; border: 1px solid #cfc; color: #3a3; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px; word-break: break-all;",
                            "✅ Saved to {path.display()}"
                        }
                    }

                    div { style: "display: flex; gap: 12px;",
                        button {
                            class: "btn-primary",
                            style: "flex: 1; padding: 14px;",
                            disabled: exporting(),
                            onclick: move |_| handle_export(),
                            if exporting() {
                                "⏳ Saving..."
                            } else {
                                "💾 Save as PNG"
                            }
                        }
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 14px;",
                            onclick: move |_| handle_start_over(),
                            "🔄 Start over"
                        }
                    }
                }
            } else {
                div { class: "card",
                    div { style: "text-align: center; color: #999; padding: 32px 16px; font-size: 14px;",
                        "No caricature yet. Go back and generate one first."
                    }
                }
            }
        }
    }
}

fn open_service() -> Result<GenerationService<caricature_pipeline::SqliteStore>, AppError> {
    let store = database::open_store()?;
    let service = GenerationService::new(GenerationConfig::from_env(), store)?;
    Ok(service)
}

fn load_last_result() -> Result<Option<PersistedResult>, AppError> {
    let service = open_service()?;
    Ok(service.last_result()?)
}

fn clear_records() -> Result<(), AppError> {
    let service = open_service()?;
    service.clear()?;
    Ok(())
}

/// Writes the result image as a PNG into the exports directory, named
/// after the source photo when one is known.
async fn run_export(record: &PersistedResult) -> Result<PathBuf, AppError> {
    let filename = export_filename(record);
    let exporter = ExportService::new();
    let path = exporter
        .export_png(&record.image_ref, &filename, &database::get_exports_directory())
        .await?;
    Ok(path)
}

fn export_filename(record: &PersistedResult) -> String {
    let stem = record
        .photo_filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(record.photo_filename.as_str());
    if stem.is_empty() {
        format!("caricature_{}.png", chrono::Utc::now().timestamp_millis())
    } else {
        format!("{}-caricature.png", stem)
    }
}

fn format_produced_at(produced_at_ms: i64) -> String {
    DateTime::from_timestamp_millis(produced_at_ms)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
