//! Thin bindings to the global `mapboxgl` object plus an owning wrapper.

use dioxus::logger::tracing;
use serde_json::Value;
use vacaturekaart_shared::filter::FitBounds;
use vacaturekaart_shared::heat::HeatLayer;
use vacaturekaart_shared::models::{BoundingBox, LngLat};
use vacaturekaart_shared::viewport::{fit_camera, Camera, ViewportState};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::layers;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    #[derive(Clone)]
    pub type Map;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map")]
    fn new(options: &JsValue) -> Map;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &Map) -> f64;

    #[wasm_bindgen(method, js_name = getBounds)]
    fn get_bounds(this: &Map) -> LngLatBounds;

    #[wasm_bindgen(method, js_name = getContainer)]
    fn get_container(this: &Map) -> web_sys::HtmlElement;

    #[wasm_bindgen(method)]
    fn on(this: &Map, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method)]
    fn off(this: &Map, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method)]
    fn resize(this: &Map);

    #[wasm_bindgen(method)]
    fn remove(this: &Map);

    #[wasm_bindgen(method, js_name = easeTo)]
    fn ease_to(this: &Map, options: &JsValue);

    #[wasm_bindgen(method, js_name = addSource)]
    fn add_source(this: &Map, id: &str, source: &JsValue);

    #[wasm_bindgen(method, js_name = getSource)]
    fn get_source(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = removeSource)]
    fn remove_source(this: &Map, id: &str);

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_layer(this: &Map, layer: &JsValue);

    #[wasm_bindgen(method, js_name = getLayer)]
    fn get_layer(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = removeLayer)]
    fn remove_layer(this: &Map, id: &str);

    pub type LngLatBounds;

    #[wasm_bindgen(method, js_name = getWest)]
    fn get_west(this: &LngLatBounds) -> f64;
    #[wasm_bindgen(method, js_name = getSouth)]
    fn get_south(this: &LngLatBounds) -> f64;
    #[wasm_bindgen(method, js_name = getEast)]
    fn get_east(this: &LngLatBounds) -> f64;
    #[wasm_bindgen(method, js_name = getNorth)]
    fn get_north(this: &LngLatBounds) -> f64;

    type GeoJsonSource;

    #[wasm_bindgen(method, js_name = setData)]
    fn set_data(this: &GeoJsonSource, data: &JsValue);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Marker)]
    #[derive(Clone)]
    pub type Marker;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Marker")]
    pub fn new(options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &Marker, lng_lat: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = getLngLat)]
    pub fn get_lng_lat(this: &Marker) -> JsValue;

    #[wasm_bindgen(method, js_name = setPopup)]
    pub fn set_popup(this: &Marker, popup: &Popup) -> Marker;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Marker, map: &Map) -> Marker;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Marker);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Popup)]
    #[derive(Clone)]
    pub type Popup;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Popup")]
    pub fn new(options: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &Popup, lng_lat: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Popup, map: &Map) -> Popup;

    #[wasm_bindgen(method, js_name = setDOMContent)]
    pub fn set_dom_content(this: &Popup, node: &web_sys::Node) -> Popup;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Popup);
}

/// Convert a serde value into a plain JS object.
pub fn to_js(value: &Value) -> Result<JsValue, String> {
    js_sys::JSON::parse(&value.to_string()).map_err(|e| format!("Invalid options: {:?}", e))
}

pub fn lng_lat(p: LngLat) -> JsValue {
    js_sys::Array::of2(&JsValue::from_f64(p.lng), &JsValue::from_f64(p.lat)).into()
}

fn mapboxgl() -> Result<JsValue, String> {
    let window = web_sys::window().ok_or("No window")?;
    let lib = js_sys::Reflect::get(&window, &JsValue::from_str("mapboxgl"))
        .map_err(|_| "mapboxgl lookup failed".to_string())?;
    if lib.is_undefined() || lib.is_null() {
        return Err("Mapbox GL library is not loaded".to_string());
    }
    Ok(lib)
}

/// Wait for the `mapboxgl` script, which loads asynchronously with the page.
pub async fn wait_for_library(attempts: u32, delay_ms: u32) -> Result<(), String> {
    for _ in 0..attempts {
        if mapboxgl().is_ok() {
            return Ok(());
        }
        gloo_timers::future::TimeoutFuture::new(delay_ms).await;
    }
    mapboxgl().map(|_| ())
}

struct Listener {
    event: &'static str,
    callback: Closure<dyn FnMut()>,
}

/// Owns the map instance and every listener registered on it.
pub struct MapEngine {
    map: Map,
    listeners: Vec<Listener>,
    window_listeners: Vec<Listener>,
}

impl MapEngine {
    /// Create the map inside `container`.
    ///
    /// Fails when there is no access token or the `mapboxgl` script never loaded.
    pub fn init(container: &web_sys::HtmlElement, access_token: Option<&str>, style_url: &str, camera: &Camera) -> Result<Self, String> {
        let token = access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or("No Mapbox access token configured")?;
        let lib = mapboxgl()?;
        js_sys::Reflect::set(&lib, &JsValue::from_str("accessToken"), &JsValue::from_str(token))
            .map_err(|_| "Failed to set Mapbox access token".to_string())?;

        let options = to_js(&layers::map_options(style_url, camera))?;
        js_sys::Reflect::set(&options, &JsValue::from_str("container"), container)
            .map_err(|_| "Failed to attach map container".to_string())?;

        let map = Map::new(&options);
        tracing::info!(style = style_url, "Map engine initialised");
        Ok(MapEngine {
            map,
            listeners: Vec::new(),
            window_listeners: Vec::new(),
        })
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Register a map event listener that lives until [`MapEngine::destroy`].
    pub fn on(&mut self, event: &'static str, f: impl FnMut() + 'static) {
        let callback = Closure::<dyn FnMut()>::new(f);
        self.map.on(event, callback.as_ref().unchecked_ref());
        self.listeners.push(Listener { event, callback });
    }

    /// Register a `window` listener that lives until [`MapEngine::destroy`].
    pub fn on_window(&mut self, event: &'static str, f: impl FnMut() + 'static) -> Result<(), String> {
        let window = web_sys::window().ok_or("No window")?;
        let callback = Closure::<dyn FnMut()>::new(f);
        window
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|_| format!("Failed to listen for window {}", event))?;
        self.window_listeners.push(Listener { event, callback });
        Ok(())
    }

    pub fn container_size(&self) -> (f64, f64) {
        let el = self.map.get_container();
        (el.client_width() as f64, el.client_height() as f64)
    }

    pub fn viewport(&self) -> ViewportState {
        let b = self.map.get_bounds();
        ViewportState {
            bbox: BoundingBox {
                west: b.get_west(),
                south: b.get_south(),
                east: b.get_east(),
                north: b.get_north(),
            },
            zoom: self.map.get_zoom(),
            width_px: self.container_size().0,
        }
    }

    /// Resize to the container, but only once it has been laid out.
    pub fn resize_if_laid_out(&self) -> bool {
        let (w, h) = self.container_size();
        if w > 0.0 && h > 0.0 {
            self.map.resize();
            true
        } else {
            false
        }
    }

    /// Move the camera onto `fit`. Returns `false` while the container has
    /// no size yet; nothing moves in that case.
    pub fn fit(&self, fit: &FitBounds) -> Result<bool, String> {
        let (w, h) = self.container_size();
        let Some(camera) = fit_camera(fit, w, h) else {
            return Ok(false);
        };
        self.ease_to(camera.center, camera.zoom)?;
        Ok(true)
    }

    pub fn ease_to(&self, center: LngLat, zoom: f64) -> Result<(), String> {
        self.map.ease_to(&to_js(&layers::ease_options(center, zoom))?);
        Ok(())
    }

    /// Show, refresh or hide the density overlay. Only valid once the style
    /// has loaded.
    pub fn set_heat_layer(&self, heat: Option<&HeatLayer>) -> Result<(), String> {
        let has_layer = !self.map.get_layer(layers::HEAT_LAYER_ID).is_undefined();
        let source = self.map.get_source(layers::HEAT_SOURCE_ID);

        match heat {
            Some(heat) => {
                if source.is_undefined() {
                    self.map
                        .add_source(layers::HEAT_SOURCE_ID, &to_js(&layers::heat_source(heat))?);
                } else {
                    source
                        .unchecked_into::<GeoJsonSource>()
                        .set_data(&to_js(&layers::heat_source_data(heat))?);
                }
                if !has_layer {
                    self.map.add_layer(&to_js(&layers::heat_layer_style(heat))?);
                }
            }
            None => {
                if has_layer {
                    self.map.remove_layer(layers::HEAT_LAYER_ID);
                }
                if !source.is_undefined() {
                    self.map.remove_source(layers::HEAT_SOURCE_ID);
                }
            }
        }
        Ok(())
    }

    /// Remove every listener and the map itself.
    pub fn destroy(self) {
        for listener in &self.listeners {
            self.map
                .off(listener.event, listener.callback.as_ref().unchecked_ref());
        }
        if let Some(window) = web_sys::window() {
            for listener in &self.window_listeners {
                let _ = window
                    .remove_event_listener_with_callback(listener.event, listener.callback.as_ref().unchecked_ref());
            }
        }
        self.map.remove();
        tracing::debug!(
            listeners = self.listeners.len() + self.window_listeners.len(),
            "Map engine destroyed"
        );
    }
}
