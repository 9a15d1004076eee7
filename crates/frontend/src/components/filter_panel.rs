use dioxus::prelude::*;
use vacaturekaart_shared::heat::HeatmapMode;
use vacaturekaart_shared::models::{FilterState, RegionFilter, ALL_REGIONS};

const MODES: [(HeatmapMode, &str); 3] = [
    (HeatmapMode::Markers, "Markers"),
    (HeatmapMode::Heatmap, "Heatmap"),
    (HeatmapMode::Both, "Beide"),
];

/// Parse the minimum-vacancies input. Anything unparsable counts as 0.
pub fn parse_min_weight(value: &str) -> u32 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.floor().min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

pub fn results_text(count: usize) -> String {
    match count {
        0 => "0 resultaten".to_string(),
        1 => "1 bedrijf".to_string(),
        n => format!("{} bedrijven", n),
    }
}

#[component]
pub fn FilterPanel(
    regions: Vec<String>,
    filter: Signal<FilterState>,
    mode: Signal<HeatmapMode>,
    visible_count: ReadSignal<usize>,
) -> Element {
    let current = filter.read().clone();
    let region_value = current.selected_region.as_wire().to_string();
    let min_weight = current.min_weight;
    let count = results_text(visible_count());

    rsx! {
        div { class: "panel filter-panel",
            h3 { "Filters" }
            label { r#for: "region-select", "Regio" }
            select {
                id: "region-select",
                "aria-label": "Kies regio",
                value: "{region_value}",
                onchange: move |evt: Event<FormData>| {
                    filter.write().selected_region = RegionFilter::from_wire(&evt.value());
                },
                option { value: ALL_REGIONS, selected: region_value == ALL_REGIONS, "Alle regio's" }
                for r in regions.iter() {
                    option {
                        value: "{r}",
                        selected: region_value == *r,
                        "{r}"
                    }
                }
            }
            label { r#for: "min-weight", "Minimaal aantal vacatures" }
            input {
                id: "min-weight",
                r#type: "number",
                min: "0",
                value: "{min_weight}",
                oninput: move |evt: Event<FormData>| {
                    filter.write().min_weight = parse_min_weight(&evt.value());
                },
            }
            div { class: "mode-toggle",
                for (m, label) in MODES {
                    button {
                        class: if *mode.read() == m { "active" } else { "" },
                        onclick: move |_| mode.set(m),
                        "{label}"
                    }
                }
            }
            div { class: "filter-footer",
                span { class: if visible_count() == 0 { "results empty" } else { "results" }, "{count}" }
                button {
                    class: "secondary",
                    disabled: current.is_default(),
                    onclick: move |_| filter.set(FilterState::default()),
                    "Wis filters"
                }
            }
        }
    }
}
