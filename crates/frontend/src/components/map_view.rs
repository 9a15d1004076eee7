use std::cell::RefCell;
use std::rc::Rc;

use dioxus::logger::tracing;
use dioxus::prelude::*;
use vacaturekaart_shared::heat::HeatmapMode;
use vacaturekaart_shared::models::{FilterState, GeoPoint, GeoPointInput};
use wasm_bindgen::JsCast;

use crate::api::MapConfigData;
use crate::components::map_fallback::MapFallback;
use crate::controller::{MapController, MapHooks, SharedController};
use crate::engine;

const MAP_CONTAINER_ID: &str = "vacaturekaart-map-container";

/// How long to wait for the Mapbox script before giving up.
const LIBRARY_POLL_ATTEMPTS: u32 = 50;
const LIBRARY_POLL_MS: u32 = 100;

/// The selected vacancy: `(company id, vacancy id)`.
pub type SelectedItem = Option<(String, String)>;

fn container_element() -> Result<web_sys::HtmlElement, String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document")?;
    document
        .get_element_by_id(MAP_CONTAINER_ID)
        .ok_or("Map container missing")?
        .dyn_into::<web_sys::HtmlElement>()
        .map_err(|_| "Map container is not an HTML element".to_string())
}

#[component]
pub fn MapView(
    config: MapConfigData,
    points: ReadSignal<Vec<GeoPointInput>>,
    filter: ReadSignal<FilterState>,
    mode: ReadSignal<HeatmapMode>,
    selected: Signal<Option<GeoPoint>>,
    selected_item: Signal<SelectedItem>,
) -> Element {
    // The controller lives outside the signal system; `ready` tells the
    // effects below when it exists.
    let slot = use_hook(|| Rc::new(RefCell::new(None::<SharedController>)));
    let mut ready = use_signal(|| false);
    let mut error = use_signal(|| None::<String>);

    {
        let slot = slot.clone();
        use_effect(move || {
            if slot.borrow().is_some() {
                return;
            }
            let slot = slot.clone();
            let config = config.clone();
            spawn(async move {
                let hooks = MapHooks {
                    on_select: Rc::new(move |point: GeoPoint| {
                        let mut selected = selected;
                        let mut selected_item = selected_item;
                        selected_item.set(None);
                        selected.set(Some(point));
                    }),
                    on_item: Rc::new(move |point_id: String, item_id: String| {
                        let mut selected_item = selected_item;
                        selected_item.set(Some((point_id, item_id)));
                    }),
                    on_error: Rc::new(move |message: String| {
                        let mut error = error;
                        tracing::error!(%message, "Map failed");
                        error.set(Some(message));
                    }),
                };

                let mounted = match engine::wait_for_library(LIBRARY_POLL_ATTEMPTS, LIBRARY_POLL_MS).await {
                    Ok(()) => container_element().and_then(|container| {
                        MapController::mount(&container, config.access_token.as_deref(), &config.style_url, hooks)
                    }),
                    Err(e) => Err(e),
                };
                match mounted {
                    Ok(controller) => {
                        *slot.borrow_mut() = Some(controller);
                        ready.set(true);
                    }
                    Err(message) => {
                        tracing::error!(%message, "Map could not be initialised");
                        error.set(Some(message));
                    }
                }
            });
        });
    }

    {
        let slot = slot.clone();
        use_effect(move || {
            let points = points.read().clone();
            if !ready() {
                return;
            }
            if let Some(controller) = slot.borrow().as_ref() {
                controller.borrow_mut().set_points(&points);
            }
        });
    }

    {
        let slot = slot.clone();
        use_effect(move || {
            let filter = filter.read().clone();
            if !ready() {
                return;
            }
            if let Some(controller) = slot.borrow().as_ref() {
                controller.borrow_mut().set_filter(filter);
            }
        });
    }

    {
        let slot = slot.clone();
        use_effect(move || {
            let mode = *mode.read();
            if !ready() {
                return;
            }
            if let Some(controller) = slot.borrow().as_ref() {
                controller.borrow_mut().set_mode(mode);
            }
        });
    }

    use_drop(move || {
        if let Some(controller) = slot.borrow_mut().take() {
            controller.borrow_mut().destroy();
        }
    });

    rsx! {
        div { class: "map-wrapper",
            div { id: MAP_CONTAINER_ID, class: "map-container" }
            if let Some(message) = error() {
                MapFallback { message }
            }
        }
    }
}
