use caricature_pipeline::StylePreference;
use dioxus::prelude::*;

#[component]
pub fn StyleSelect(value: StylePreference, on_change: EventHandler<StylePreference>) -> Element {
    rsx! {
        div { style: "margin-bottom: 20px;",
            label { style: "display: block; margin-bottom: 6px; font-weight: 600; color: #333; font-size: 14px;",
                "Art style"
            }
            select {
                class: "input",
                value: "{value.label()}",
                onchange: move |e| on_change.call(StylePreference::from_label(&e.value())),
                for style in StylePreference::ALL {
                    option { value: style.label(), selected: style == value, {style.label()} }
                }
            }
        }
    }
}
