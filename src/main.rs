use dioxus::prelude::*;

mod components;
mod database;
mod error;
mod picker;

use components::{ResultScreen, UploadScreen};

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    env_logger::init();
    dioxus::launch(App);
}

/// Screen navigation for the app
#[derive(Clone, PartialEq, Debug)]
pub enum Screen {
    Upload,
    Result,
}

#[component]
fn App() -> Element {
    let mut current_screen = use_signal(|| Screen::Upload);

    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        div { style: "display: flex; flex-direction: column; height: 100vh; font-family: sans-serif;",

            div { style: "flex: 1; overflow-y: auto;",
                match current_screen() {
                    Screen::Upload => rsx! {
                        UploadScreen { on_navigate: move |s| current_screen.set(s) }
                    },
                    Screen::Result => rsx! {
                        ResultScreen { on_navigate: move |s| current_screen.set(s) }
                    },
                }
            }
        }
    }
}
