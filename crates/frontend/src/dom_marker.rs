//! DOM-backed markers: one badge element per mounted key, with a popup and a
//! click listener that forwards the marker's action. Company popups open on
//! click; cluster popups open on hover, since a click zooms in.

use std::cell::RefCell;
use std::rc::Rc;

use dioxus::logger::tracing;
use serde_json::json;
use vacaturekaart_shared::markers::{MarkerAction, MarkerFactory, MarkerHandle, MarkerSpec, MarkerVisual, PopupContent};
use vacaturekaart_shared::models::MarkerKey;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Node};

use crate::engine::{self, Map, Marker, Popup};

/// Pixel offset between a marker's anchor and its popup tip.
const POPUP_OFFSET_PX: f64 = 18.0;

const CLUSTER_HINT: &str = "Klik om in te zoomen";

pub type ActionCallback = Rc<dyn Fn(MarkerAction)>;
/// Called with `(company id, vacancy id)` when a popup row is clicked.
pub type ItemCallback = Rc<dyn Fn(String, String)>;

// ---------------------------------------------------------------------------
// Pure presentation helpers
// ---------------------------------------------------------------------------

pub fn badge_class(visual: &MarkerVisual) -> &'static str {
    if visual.is_cluster {
        "vk-marker vk-marker-cluster"
    } else {
        "vk-marker vk-marker-company"
    }
}

/// Inline style for the inner badge. The outer element belongs to the map
/// engine, which writes its own transform there.
pub fn badge_style(visual: &MarkerVisual) -> String {
    let s = &visual.size;
    format!(
        "max-width:{}px;height:{}px;padding:0 {}px;font-size:{}px;border-radius:{}px;transform:scale({:.3});",
        s.max_width_px, s.height_px, s.padding_px, s.font_size_px, s.border_radius_px, visual.scale
    )
}

pub fn vacancy_count_text(count: u64) -> String {
    match count {
        1 => "1 vacature".to_string(),
        n => format!("{} vacatures", n),
    }
}

pub fn company_count_text(count: usize) -> String {
    match count {
        1 => "1 bedrijf".to_string(),
        n => format!("{} bedrijven", n),
    }
}

/// Native hover text for company markers. Clusters show their popup instead.
pub fn tooltip(popup: &PopupContent) -> Option<String> {
    match popup {
        PopupContent::Point { title, region, weight, .. } => Some(format!(
            "{} ({}) - {}",
            title,
            region,
            vacancy_count_text(*weight as u64)
        )),
        PopupContent::Cluster { .. } => None,
    }
}

pub fn more_text(more: usize) -> Option<String> {
    (more > 0).then(|| format!("+ {} meer", more))
}

// ---------------------------------------------------------------------------
// DOM plumbing
// ---------------------------------------------------------------------------

/// A DOM event listener that can be detached again.
struct DomListener {
    target: Element,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    fn attach(target: &Element, event: &'static str, f: impl FnMut(web_sys::Event) + 'static) -> Option<Self> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(f);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .ok()?;
        Some(DomListener {
            target: target.clone(),
            event,
            callback,
        })
    }

    fn detach(self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn element(doc: &Document, tag: &str, class: &str) -> Option<Element> {
    let el = doc.create_element(tag).ok()?;
    el.set_class_name(class);
    Some(el)
}

fn text_element(doc: &Document, tag: &str, class: &str, text: &str) -> Option<Element> {
    let el = element(doc, tag, class)?;
    el.set_text_content(Some(text));
    Some(el)
}

fn build_cluster_body(doc: &Document, point_count: usize, total_weight: u64) -> Option<Element> {
    let root = element(doc, "div", "vk-popup vk-popup-cluster")?;
    root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "h4", "vk-popup-title", &company_count_text(point_count))?))
        .ok()?;
    root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "p", "vk-popup-meta", &vacancy_count_text(total_weight))?))
        .ok()?;
    root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "p", "vk-popup-more", CLUSTER_HINT)?)).ok()?;
    Some(root)
}

/// Popup body. Company rows are buttons that report the vacancy.
fn build_popup_body(
    doc: &Document,
    point_id: &str,
    popup: &PopupContent,
    on_item: &ItemCallback,
) -> Option<(Element, Vec<DomListener>)> {
    let (title, region, weight, items, more) = match popup {
        PopupContent::Point {
            title,
            region,
            weight,
            items,
            more,
        } => (title, region, weight, items, more),
        PopupContent::Cluster {
            point_count,
            total_weight,
        } => return Some((build_cluster_body(doc, *point_count, *total_weight)?, Vec::new())),
    };

    let root = element(doc, "div", "vk-popup")?;
    root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "h4", "vk-popup-title", title)?)).ok()?;
    let meta = format!("{} · {}", region, vacancy_count_text(*weight as u64));
    root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "p", "vk-popup-meta", &meta)?)).ok()?;

    let mut listeners = Vec::new();
    if !items.is_empty() {
        let list = element(doc, "ul", "vk-popup-items")?;
        for item in items {
            let li = element(doc, "li", "")?;
            let button = text_element(doc, "button", "vk-popup-item", &item.title)?;
            let _ = button.set_attribute("type", "button");
            let on_item = on_item.clone();
            let point_id = point_id.to_string();
            let item_id = item.id.clone();
            if let Some(listener) = DomListener::attach(&button, "click", move |_| {
                on_item(point_id.clone(), item_id.clone());
            }) {
                listeners.push(listener);
            }
            li.append_child(&button).ok()?;
            list.append_child(&li).ok()?;
        }
        root.append_child(&list).ok()?;
    }
    if let Some(text) = more_text(*more) {
        root.append_child(AsRef::<Node>::as_ref(&text_element(doc, "p", "vk-popup-more", &text)?)).ok()?;
    }
    Some((root, listeners))
}

// ---------------------------------------------------------------------------
// Marker handle
// ---------------------------------------------------------------------------

/// Elements of a marker that made it onto the map.
struct DomParts {
    marker: Marker,
    popup: Popup,
    root: Element,
    badge: HtmlElement,
    label: Element,
    count: Element,
    click: Option<DomListener>,
    /// Show/hide listeners of a cluster popup.
    hover: Vec<DomListener>,
}

pub struct DomMarker {
    key: MarkerKey,
    /// `None` when the elements could not be built; updates are then no-ops.
    parts: Option<DomParts>,
    action: Rc<RefCell<MarkerAction>>,
    popup_listeners: Vec<DomListener>,
    on_item: ItemCallback,
}

impl DomMarker {
    fn apply_visual(&self, spec: &MarkerSpec) {
        let Some(parts) = &self.parts else {
            return;
        };
        let visual = &spec.visual;
        parts.badge.set_class_name(badge_class(visual));
        let _ = parts.badge.set_attribute("style", &badge_style(visual));
        parts.label.set_text_content(Some(&visual.text));
        parts.count.set_text_content(Some(&visual.badge));
        match tooltip(&spec.popup) {
            Some(text) => {
                let _ = parts.root.set_attribute("title", &text);
            }
            None => {
                let _ = parts.root.remove_attribute("title");
            }
        }
        parts.marker.set_lng_lat(&engine::lng_lat(visual.position));
    }

    fn apply_popup(&mut self, spec: &MarkerSpec) {
        let Some(popup) = self.parts.as_ref().map(|p| &p.popup) else {
            return;
        };
        let Some(doc) = document() else {
            return;
        };
        for listener in self.popup_listeners.drain(..) {
            listener.detach();
        }
        let point_id = self.key.to_string();
        if let Some((body, listeners)) = build_popup_body(&doc, &point_id, &spec.popup, &self.on_item) {
            popup.set_dom_content(&body);
            self.popup_listeners = listeners;
        }
    }
}

impl MarkerHandle for DomMarker {
    fn update(&mut self, spec: &MarkerSpec) {
        self.apply_visual(spec);
        self.apply_popup(spec);
        *self.action.borrow_mut() = spec.action.clone();
    }

    fn destroy(mut self) {
        for listener in self.popup_listeners.drain(..) {
            listener.detach();
        }
        if let Some(parts) = self.parts.take() {
            if let Some(click) = parts.click {
                click.detach();
            }
            for listener in parts.hover {
                listener.detach();
            }
            parts.popup.remove();
            parts.marker.remove();
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct DomMarkerFactory {
    map: Map,
    on_action: ActionCallback,
    on_item: ItemCallback,
}

impl DomMarkerFactory {
    pub fn new(map: Map, on_action: ActionCallback, on_item: ItemCallback) -> Self {
        DomMarkerFactory {
            map,
            on_action,
            on_item,
        }
    }

    fn build_parts(&self, spec: &MarkerSpec, action: &Rc<RefCell<MarkerAction>>) -> Option<DomParts> {
        let doc = document()?;
        let root = element(&doc, "div", "vk-marker-anchor")?;
        let badge: HtmlElement = element(&doc, "div", badge_class(&spec.visual))?.dyn_into().ok()?;
        let label = text_element(&doc, "span", "vk-marker-label", &spec.visual.text)?;
        let count = text_element(&doc, "span", "vk-marker-count", &spec.visual.badge)?;
        badge.append_child(&label).ok()?;
        badge.append_child(&count).ok()?;
        root.append_child(&badge).ok()?;

        let marker_options = engine::to_js(&json!({ "anchor": "center" })).ok()?;
        js_sys::Reflect::set(&marker_options, &JsValue::from_str("element"), &root).ok()?;
        let marker = Marker::new(&marker_options);

        let is_cluster = spec.visual.is_cluster;
        let options = engine::to_js(&json!({
            "offset": POPUP_OFFSET_PX,
            "closeButton": !is_cluster,
            "closeOnClick": !is_cluster,
            "maxWidth": "280px"
        }))
        .ok()?;
        let popup = Popup::new(&options);

        let mut hover = Vec::new();
        if is_cluster {
            let (shown, anchor, map) = (popup.clone(), marker.clone(), self.map.clone());
            hover.extend(DomListener::attach(&root, "mouseenter", move |_| {
                shown.set_lng_lat(&anchor.get_lng_lat()).add_to(&map);
            }));
            let hidden = popup.clone();
            hover.extend(DomListener::attach(&root, "mouseleave", move |_| hidden.remove()));
        } else {
            marker.set_popup(&popup);
        }

        let click = {
            let action = action.clone();
            let on_action = self.on_action.clone();
            DomListener::attach(&root, "click", move |_| {
                let current = action.borrow().clone();
                on_action(current);
            })
        };

        Some(DomParts {
            marker,
            popup,
            root,
            badge,
            label,
            count,
            click,
            hover,
        })
    }
}

impl MarkerFactory for DomMarkerFactory {
    type Handle = DomMarker;

    fn create(&mut self, key: &MarkerKey, spec: &MarkerSpec) -> DomMarker {
        let action = Rc::new(RefCell::new(spec.action.clone()));
        let parts = self.build_parts(spec, &action);
        if parts.is_none() {
            tracing::warn!(%key, "Failed to build marker element");
        }
        let mut handle = DomMarker {
            key: key.clone(),
            parts,
            action,
            popup_listeners: Vec::new(),
            on_item: self.on_item.clone(),
        };
        handle.apply_visual(spec);
        handle.apply_popup(spec);
        if let Some(parts) = &handle.parts {
            parts.marker.add_to(&self.map);
        }
        handle
    }
}
