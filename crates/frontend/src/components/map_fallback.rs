use dioxus::prelude::*;

/// Shown in place of the map when the engine cannot start.
#[component]
pub fn MapFallback(message: String) -> Element {
    rsx! {
        div { class: "map-fallback", role: "alert",
            h3 { "De kaart kan niet worden geladen" }
            p { "{message}" }
            p { class: "muted",
                "De filters en resultaten blijven beschikbaar. Controleer de Mapbox-configuratie of kom later terug."
            }
        }
    }
}
