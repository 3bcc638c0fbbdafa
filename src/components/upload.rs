use crate::{
    components::{PhotoInput, StyleSelect},
    database,
    error::AppError,
    Screen,
};
use caricature_pipeline::{
    GenerationConfig, GenerationService, PhotoAsset, SourceKind, StylePreference,
};
use dioxus::prelude::*;

#[component]
pub fn UploadScreen(on_navigate: EventHandler<Screen>) -> Element {
    // Restore the last submitted photo and style so a restart picks up
    // where the user left off.
    let restored = use_hook(|| match load_stored_input() {
        Ok(input) => input,
        Err(e) => {
            log::warn!("Could not restore stored input: {}", e);
            None
        }
    });

    let photo = use_signal(|| {
        restored.as_ref().and_then(|input| {
            PhotoAsset::from_data_url(
                &input.photo_data_url,
                input.photo_filename.clone(),
                SourceKind::Upload,
            )
        })
    });
    let mut style = use_signal(|| {
        restored
            .as_ref()
            .map(|input| StylePreference::from_label(&input.style))
            .unwrap_or_default()
    });
    let mut generating = use_signal(|| false);
    let mut status = use_signal(|| None::<String>);
    let mut error = use_signal(|| None::<String>);

    // Keeps the stored input in step with the screen: a removed photo also
    // removes its record so it does not come back on the next launch.
    let persist_input = move || {
        let written = match photo() {
            Some(asset) => save_stored_input(&asset, style()),
            None => clear_stored_input(),
        };
        if let Err(e) = written {
            log::warn!("Could not persist input: {}", e);
        }
    };

    let mut handle_generate = move || {
        if generating() {
            return;
        }
        let Some(asset) = photo() else {
            error.set(Some("Please add a photo before generating.".to_string()));
            return;
        };

        generating.set(true);
        error.set(None);
        status.set(Some("Generating your caricature... this can take a while.".to_string()));

        let chosen_style = style();
        spawn(async move {
            match run_generation(asset, chosen_style).await {
                Ok(()) => {
                    generating.set(false);
                    status.set(None);
                    on_navigate.call(Screen::Result);
                }
                Err(e) => {
                    generating.set(false);
                    status.set(None);
                    error.set(Some(e.user_message()));
                }
            }
        });
    };

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",

            div { style: "margin-bottom: 24px;",
                h1 { style: "color: #0066cc; font-size: 24px; font-weight: 700; margin: 0;",
                    "🎨 Caricature Studio"
                }
                p { style: "color: #666; font-size: 14px; margin: 4px 0 0 0;",
                    "Turn a photo into a caricature"
                }
            }

            if let Some(err) = error() {
                div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                    "⚠️ {err}"
                }
            }

            if let Some(msg) = status() {
                div { style: "background: #e3f2fd; border: 1px solid #bbdefb; color: #0066cc; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                    "⏳ {msg}"
                }
            }

            div { class: "card",

                PhotoInput {
                    photo,
                    on_change: move |_| {
                        error.set(None);
                        persist_input();
                    },
                }

                StyleSelect {
                    value: style(),
                    on_change: move |s| {
                        style.set(s);
                        persist_input();
                    },
                }

                button {
                    class: "btn-primary",
                    style: "width: 100%; padding: 14px; margin-top: 4px;",
                    disabled: generating() || photo().is_none(),
                    onclick: move |_| handle_generate(),
                    if generating() {
                        "⏳ Generating..."
                    } else {
                        "✨ Generate caricature"
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

fn load_stored_input() -> Result<Option<caricature_pipeline::StoredInput>, AppError> {
    let service = open_service()?;
    Ok(service.last_input()?)
}

fn save_stored_input(photo: &PhotoAsset, style: StylePreference) -> Result<(), AppError> {
    let service = open_service()?;
    service.save_input(photo, style)?;
    Ok(())
}

fn clear_stored_input() -> Result<(), AppError> {
    let service = open_service()?;
    service.clear_input()?;
    Ok(())
}

/// One generation attempt against the configured endpoint. The outcome is
/// persisted by the service; the result screen reads it back from the store.
async fn run_generation(photo: PhotoAsset, style: StylePreference) -> Result<(), AppError> {
    let service = open_service()?;
    let outcome = service.generate(Some(&photo), style).await?;
    if outcome.is_fallback {
        if let Some(advisory) = &outcome.advisory {
            log::info!("Fallback outcome: {}", advisory);
        }
    }
    Ok(())
}
