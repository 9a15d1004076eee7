use dioxus::prelude::*;
use vacaturekaart_shared::filter::count_visible;
use vacaturekaart_shared::geo::NETHERLANDS;
use vacaturekaart_shared::heat::HeatmapMode;
use vacaturekaart_shared::models::{FilterState, GeoPoint, GeoPointInput};

use crate::api;
use crate::components::company_card::CompanyCard;
use crate::components::filter_panel::FilterPanel;
use crate::components::map_fallback::MapFallback;
use crate::components::map_view::MapView;

#[component]
pub fn VacancyMap() -> Element {
    // Data resources
    let config_resource = use_resource(|| api::fetch_map_config());
    let points_resource = use_resource(|| api::fetch_map_points(None));
    let regions_resource = use_resource(|| api::fetch_regions());
    let dataset_resource = use_resource(|| api::fetch_dataset());

    // UI state
    let filter = use_signal(FilterState::default);
    let mode = use_signal(HeatmapMode::default);
    let mut points = use_signal(Vec::<GeoPointInput>::new);
    let mut selected = use_signal(|| None::<GeoPoint>);
    let mut selected_item = use_signal(|| None::<(String, String)>);

    use_effect(move || {
        if let Some(Ok(loaded)) = &*points_resource.read() {
            points.set(loaded.clone());
        }
    });

    // Counted here rather than by the map so it survives a map that never starts.
    let visible_count = use_memo(move || count_visible(&points.read(), &NETHERLANDS, &filter.read()));

    // A selection hidden by the filter is dropped.
    use_effect(move || {
        let filter = filter.read().clone();
        let hidden = match &*selected.peek() {
            Some(p) => !filter.accepts(p),
            None => false,
        };
        if hidden {
            selected.set(None);
            selected_item.set(None);
        }
    });

    let regions: Vec<String> = match &*regions_resource.read() {
        Some(Ok(r)) => r.clone(),
        _ => vec![],
    };

    let points_error = match &*points_resource.read() {
        Some(Err(e)) => Some(e.clone()),
        _ => None,
    };

    let dataset_line = match &*dataset_resource.read() {
        Some(Ok(d)) if d.rejected_count > 0 => Some(format!(
            "{} bedrijven geladen, {} zonder geldige locatie",
            d.point_count, d.rejected_count
        )),
        Some(Ok(d)) => Some(format!("{} bedrijven geladen", d.point_count)),
        _ => None,
    };

    let selected_point = selected.read().clone();
    // Only highlight a vacancy that belongs to the company on the card.
    let highlighted = match (&*selected_item.read(), &selected_point) {
        (Some((point_id, item_id)), Some(p)) if &p.id == point_id => Some(item_id.clone()),
        _ => None,
    };

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "Vacaturekaart" }
                if let Some(line) = dataset_line {
                    span { class: "muted", "{line}" }
                }
            }

            div { class: "sidebar",
                FilterPanel {
                    regions: regions,
                    filter: filter,
                    mode: mode,
                    visible_count: visible_count,
                }
                if let Some(e) = points_error {
                    div { class: "panel error", "Bedrijven konden niet worden geladen: {e}" }
                }
                if let Some(point) = selected_point {
                    CompanyCard {
                        point: point,
                        selected_item: highlighted,
                        on_close: move |_| {
                            selected.set(None);
                            selected_item.set(None);
                        },
                    }
                }
            }

            div { class: "main",
                match &*config_resource.read() {
                    Some(Ok(config)) => rsx! {
                        MapView {
                            config: config.clone(),
                            points: points,
                            filter: filter,
                            mode: mode,
                            selected: selected,
                            selected_item: selected_item,
                        }
                    },
                    Some(Err(e)) => rsx! {
                        MapFallback { message: format!("Kaartconfiguratie niet beschikbaar: {}", e) }
                    },
                    None => rsx! {
                        div { class: "map-loading", "Kaart laden..." }
                    },
                }
            }
        }
    }
}
