use dioxus::prelude::*;
use vacaturekaart_shared::models::GeoPoint;

use crate::dom_marker::vacancy_count_text;

/// Details of the company picked on the map.
#[component]
pub fn CompanyCard(point: GeoPoint, selected_item: Option<String>, on_close: EventHandler<()>) -> Element {
    let count = vacancy_count_text(point.weight as u64);

    rsx! {
        div { class: "panel company-card",
            div { class: "company-card-header",
                h3 { "{point.label}" }
                button {
                    class: "secondary",
                    "aria-label": "Sluiten",
                    onclick: move |_| on_close.call(()),
                    "×"
                }
            }
            p { class: "muted", "{point.region} · {count}" }
            if point.items.is_empty() {
                p { class: "muted", "Geen openstaande vacatures" }
            } else {
                ul { class: "company-card-items",
                    for item in point.items.iter() {
                        li {
                            key: "{item.id}",
                            class: if selected_item.as_deref() == Some(item.id.as_str()) { "active" } else { "" },
                            "{item.title}"
                        }
                    }
                }
            }
        }
    }
}
