use crate::{error::AppError, picker};
use caricature_pipeline::camera::platform::{self, UnsupportedBackend};
use caricature_pipeline::{intake, CameraSession, FacingMode, PhotoAsset};
use dioxus::prelude::*;

type PlatformCamera = CameraSession<UnsupportedBackend>;

/// Photo source selection: file picker or live camera capture.
///
/// Owns the camera session for its lifetime; the stream is released when
/// the capture completes, when the user cancels, and when the component
/// unmounts.
#[component]
pub fn PhotoInput(mut photo: Signal<Option<PhotoAsset>>, on_change: EventHandler<()>) -> Element {
    let mut camera = use_signal(|| PlatformCamera::new(platform::default_backend()));
    let camera_supported = use_hook(|| camera.write().is_supported());
    let mut camera_open = use_signal(|| false);
    let mut busy = use_signal(|| false);
    let mut error = use_signal(|| None::<String>);

    let mut close_camera = move || {
        camera.write().stop();
        camera_open.set(false);
    };

    use_drop(move || camera.write().stop());

    let mut handle_pick = move || {
        busy.set(true);
        error.set(None);
        spawn(async move {
            match pick_photo() {
                Ok(Some(asset)) => {
                    photo.set(Some(asset));
                    on_change.call(());
                }
                Ok(None) => {} // dialog cancelled
                Err(e) => error.set(Some(e.user_message())),
            }
            busy.set(false);
        });
    };

    let mut handle_open_camera = move || {
        error.set(None);
        match camera.write().start(FacingMode::Environment) {
            Ok(()) => camera_open.set(true),
            Err(e) => error.set(Some(AppError::Camera(e).user_message())),
        }
    };

    let mut handle_capture = move || {
        let captured = camera.write().capture_frame(90, "image/jpeg");
        match captured {
            Ok(asset) => {
                close_camera();
                photo.set(Some(intake::from_camera_capture(asset)));
                on_change.call(());
            }
            Err(e) => {
                close_camera();
                error.set(Some(AppError::Camera(e).user_message()));
            }
        }
    };

    let mut handle_switch = move || {
        if let Err(e) = camera.write().switch_facing() {
            camera_open.set(false);
            error.set(Some(AppError::Camera(e).user_message()));
        }
    };

    rsx! {
        div { style: "margin-bottom: 20px;",
            label { style: "display: block; margin-bottom: 6px; font-weight: 600; color: #333; font-size: 14px;",
                "Photo"
            }

            if let Some(err) = error() {
                div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; margin-bottom: 12px; border-radius: 8px; font-size: 14px;",
                    "⚠️ {err}"
                }
            }

            if let Some(asset) = photo() {
                div { style: "margin-bottom: 12px;",
                    img {
                        src: "{asset.data_url}",
                        style: "width: 100%; max-height: 320px; object-fit: contain; border-radius: 8px; background: #f0f0f0;",
                    }
                    div { style: "display: flex; align-items: center; gap: 12px; margin-top: 8px;",
                        div { style: "flex: 1; font-size: 12px; color: #666; word-break: break-all;",
                            "{asset.filename}"
                        }
                        button {
                            class: "btn-secondary",
                            style: "padding: 6px 12px; font-size: 12px;",
                            onclick: move |_| {
                                photo.set(None);
                                on_change.call(());
                            },
                            "🗑️ Remove"
                        }
                    }
                }
            } else if camera_open() {
                div { style: "margin-bottom: 12px;",
                    div { style: "width: 100%; height: 240px; background: #222; border-radius: 8px; display: flex; align-items: center; justify-content: center; color: #999; font-size: 14px;",
                        if camera.read().facing() == FacingMode::User {
                            "📷 Front camera active"
                        } else {
                            "📷 Back camera active"
                        }
                    }
                    div { style: "display: flex; gap: 8px; margin-top: 8px;",
                        button {
                            class: "btn-primary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            onclick: move |_| handle_capture(),
                            "📸 Capture"
                        }
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            onclick: move |_| handle_switch(),
                            "🔄 Switch camera"
                        }
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            onclick: move |_| close_camera(),
                            "❌ Cancel"
                        }
                    }
                }
            } else {
                div { style: "width: 100%; height: 120px; border: 2px dashed #ccc; border-radius: 8px; display: flex; align-items: center; justify-content: center; color: #999; font-size: 14px; margin-bottom: 12px;",
                    "No photo selected"
                }
                div { style: "display: flex; gap: 8px;",
                    button {
                        class: "btn-secondary",
                        style: "flex: 1; padding: 10px; font-size: 14px;",
                        disabled: busy(),
                        onclick: move |_| handle_pick(),
                        if busy() {
                            "⏳ Loading..."
                        } else {
                            "🖼️ Choose photo"
                        }
                    }
                    if camera_supported {
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            onclick: move |_| handle_open_camera(),
                            "📷 Use camera"
                        }
                    }
                }
            }
        }
    }
}

/// Runs the platform picker and reads the chosen file into a photo asset.
fn pick_photo() -> Result<Option<PhotoAsset>, AppError> {
    match picker::pick_image()? {
        Some(path) => {
            let asset = intake::from_file(&path)?;
            Ok(Some(asset))
        }
        None => Ok(None),
    }
}
