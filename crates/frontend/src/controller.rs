//! Glue between the map engine events and [`MapState`].
//!
//! Every engine callback holds a `Weak` reference and checks the liveness
//! flag first, so nothing runs after [`MapController::destroy`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use dioxus::logger::tracing;
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use vacaturekaart_shared::cluster::ClusterOptions;
use vacaturekaart_shared::heat::HeatmapMode;
use vacaturekaart_shared::markers::MarkerAction;
use vacaturekaart_shared::models::{ClusterId, FilterState, GeoPoint, GeoPointInput, LngLat};
use vacaturekaart_shared::state::MapState;
use vacaturekaart_shared::viewport::Camera;

use crate::debounce::{Debouncer, ZOOM_DEBOUNCE_MS};
use crate::dom_marker::{DomMarker, DomMarkerFactory};
use crate::engine::MapEngine;

/// Initial camera: the whole of the Netherlands.
pub const DEFAULT_CAMERA: Camera = Camera {
    center: LngLat { lng: 5.3, lat: 52.2 },
    zoom: 6.5,
};

/// Layout polling after mount: attempts and delay between them.
const LAYOUT_POLL_ATTEMPTS: u32 = 20;
const LAYOUT_POLL_MS: u32 = 50;

/// Callbacks into the host UI.
#[derive(Clone)]
pub struct MapHooks {
    pub on_select: Rc<dyn Fn(GeoPoint)>,
    /// `(company id, vacancy id)`.
    pub on_item: Rc<dyn Fn(String, String)>,
    pub on_error: Rc<dyn Fn(String)>,
}

pub type SharedController = Rc<RefCell<MapController>>;

pub struct MapController {
    engine: Option<MapEngine>,
    state: MapState<DomMarker>,
    factory: DomMarkerFactory,
    alive: Rc<Cell<bool>>,
    zoom_debounce: Debouncer,
    loaded: bool,
    /// A fit was requested before the container had a size.
    fit_pending: bool,
    hooks: MapHooks,
}

/// Run `f` against a live controller. A controller that is busy (the event
/// fired synchronously from inside one of its own calls) gets the work on
/// the next tick instead.
fn with_live(weak: &Weak<RefCell<MapController>>, f: impl FnOnce(&mut MapController) + 'static) {
    let Some(rc) = weak.upgrade() else {
        return;
    };
    let Ok(mut controller) = rc.try_borrow_mut() else {
        let weak = weak.clone();
        let _ = Timeout::new(0, move || with_live(&weak, f)).forget();
        return;
    };
    if controller.alive.get() {
        f(&mut controller);
    }
}

impl MapController {
    /// Create the map in `container` and wire its events.
    pub fn mount(
        container: &web_sys::HtmlElement,
        access_token: Option<&str>,
        style_url: &str,
        hooks: MapHooks,
    ) -> Result<SharedController, String> {
        let engine = MapEngine::init(container, access_token, style_url, &DEFAULT_CAMERA)?;
        let map = engine.map().clone();

        let controller = Rc::new_cyclic(|weak: &Weak<RefCell<MapController>>| {
            let on_action = {
                let weak = weak.clone();
                Rc::new(move |action: MarkerAction| {
                    with_live(&weak, move |c| c.handle_action(action));
                })
            };
            let on_item = {
                let weak = weak.clone();
                Rc::new(move |point_id: String, item_id: String| {
                    with_live(&weak, move |c| c.select_item(point_id, item_id));
                })
            };
            let factory = DomMarkerFactory::new(map, on_action, on_item);
            RefCell::new(MapController {
                engine: Some(engine),
                state: MapState::new(ClusterOptions::default()),
                factory,
                alive: Rc::new(Cell::new(true)),
                zoom_debounce: Debouncer::new(ZOOM_DEBOUNCE_MS),
                loaded: false,
                fit_pending: false,
                hooks,
            })
        });

        if let Err(e) = Self::attach_listeners(&controller) {
            controller.borrow_mut().destroy();
            return Err(e);
        }
        Self::poll_layout(Rc::downgrade(&controller));
        Ok(controller)
    }

    fn attach_listeners(controller: &SharedController) -> Result<(), String> {
        let weak = Rc::downgrade(controller);
        let mut c = controller.borrow_mut();
        let debounce = c.zoom_debounce.clone();
        let Some(engine) = c.engine.as_mut() else {
            return Ok(());
        };

        {
            let weak = weak.clone();
            engine.on("load", move || {
                with_live(&weak, |c| {
                    c.loaded = true;
                    c.refresh_heat();
                    c.render();
                });
            });
        }
        {
            let weak = weak.clone();
            engine.on("error", move || {
                with_live(&weak, |c| {
                    // Errors after load are tile hiccups; before load the style is unusable.
                    if !c.loaded {
                        (c.hooks.on_error)("De kaartstijl kon niet worden geladen".to_string());
                    }
                });
            });
        }
        {
            let weak = weak.clone();
            engine.on("moveend", move || {
                with_live(&weak, |c| c.render());
            });
        }
        {
            let weak = weak.clone();
            engine.on("zoom", move || {
                let weak = weak.clone();
                debounce.call(move || with_live(&weak, |c| c.render()));
            });
        }
        engine.on_window("resize", move || {
            with_live(&weak, |c| {
                let laid_out = c.engine.as_ref().is_some_and(|e| e.resize_if_laid_out());
                if laid_out && c.fit_pending {
                    c.fit_to_data();
                }
            });
        })?;
        Ok(())
    }

    /// The container may still be collapsed right after mount; keep trying
    /// until it has a size, then render once.
    fn poll_layout(weak: Weak<RefCell<MapController>>) {
        dioxus::prelude::spawn(async move {
            for _ in 0..LAYOUT_POLL_ATTEMPTS {
                let Some(rc) = weak.upgrade() else {
                    return;
                };
                let laid_out = match rc.try_borrow() {
                    Ok(c) if c.alive.get() => c.engine.as_ref().is_some_and(|e| e.resize_if_laid_out()),
                    Ok(_) => return,
                    Err(_) => false,
                };
                drop(rc);
                if laid_out {
                    with_live(&weak, |c| {
                        if c.fit_pending {
                            c.fit_to_data();
                        }
                        c.render();
                    });
                    return;
                }
                TimeoutFuture::new(LAYOUT_POLL_MS).await;
            }
            tracing::warn!("Map container never got a size");
        });
    }

    fn render(&mut self) {
        let Some(engine) = &self.engine else {
            return;
        };
        let viewport = engine.viewport();
        if viewport.width_px <= 0.0 {
            return;
        }
        self.state.render(&viewport, &mut self.factory);
    }

    /// Before `load` the style cannot take sources; the `load` handler
    /// applies the current layer instead.
    fn refresh_heat(&mut self) {
        if !self.loaded {
            return;
        }
        let Some(engine) = &self.engine else {
            return;
        };
        if let Err(e) = engine.set_heat_layer(self.state.heat_layer().as_ref()) {
            tracing::warn!(error = %e, "Failed to update heat layer");
        }
    }

    fn fit_to_data(&mut self) {
        self.fit_pending = false;
        let (Some(engine), Some(fit)) = (&self.engine, self.state.fit_bounds()) else {
            return;
        };
        match engine.fit(&fit) {
            Ok(fitted) => self.fit_pending = !fitted,
            Err(e) => tracing::warn!(error = %e, "Failed to fit map to data"),
        }
    }

    fn handle_action(&mut self, action: MarkerAction) {
        match action {
            MarkerAction::Select(id) => {
                if let Some(point) = self.state.point(&id).cloned() {
                    (self.hooks.on_select)(point);
                }
            }
            MarkerAction::ExpandCluster {
                cluster_id, generation, ..
            } => self.expand(cluster_id, generation),
        }
    }

    /// A vacancy row in a popup selects its company as well.
    fn select_item(&mut self, point_id: String, item_id: String) {
        if let Some(point) = self.state.point(&point_id).cloned() {
            (self.hooks.on_select)(point);
            (self.hooks.on_item)(point_id, item_id);
        }
    }

    fn expand(&mut self, cluster_id: ClusterId, generation: u64) {
        let Some(expansion) = self.state.expand_cluster(cluster_id, generation) else {
            return;
        };
        if let Some(engine) = &self.engine {
            if let Err(e) = engine.ease_to(expansion.center, expansion.zoom) {
                tracing::warn!(error = %e, cluster_id, "Failed to zoom into cluster");
            }
        }
    }

    /// Replace the data set. Moves the camera to the filtered points.
    pub fn set_points(&mut self, inputs: &[GeoPointInput]) {
        let update = self.state.set_points(inputs);
        tracing::info!(
            accepted = update.accepted,
            rejected = update.rejected.len(),
            visible = update.visible,
            "Map points updated"
        );
        self.after_data_change();
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        if *self.state.filter() == filter {
            return;
        }
        self.state.set_filter(filter);
        tracing::debug!(visible = self.state.visible_count(), "Map filter applied");
        self.after_data_change();
    }

    pub fn set_mode(&mut self, mode: HeatmapMode) {
        if self.state.mode() == mode {
            return;
        }
        self.state.set_mode(mode);
        self.refresh_heat();
        self.render();
    }

    fn after_data_change(&mut self) {
        self.refresh_heat();
        self.render();
        self.fit_to_data();
    }

    /// Tear everything down. Safe to call more than once.
    pub fn destroy(&mut self) {
        if !self.alive.replace(false) {
            return;
        }
        self.zoom_debounce.cancel();
        let removed = self.state.clear();
        if let Some(engine) = self.engine.take() {
            engine.destroy();
        }
        tracing::debug!(markers = removed, "Map controller destroyed");
    }
}
