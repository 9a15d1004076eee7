mod api;
mod components;
mod controller;
mod debounce;
mod dom_marker;
mod engine;
mod layers;
mod pages;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/kaart")]
    Kaart {},
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::vacancy_map::VacancyMap {}
    }
}

#[component]
fn Kaart() -> Element {
    rsx! {
        pages::vacancy_map::VacancyMap {}
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");
const MAPBOX_JS: &str = "https://api.mapbox.com/mapbox-gl-js/v3.4.0/mapbox-gl.js";
const MAPBOX_CSS: &str = "https://api.mapbox.com/mapbox-gl-js/v3.4.0/mapbox-gl.css";

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: MAPBOX_CSS }
        document::Stylesheet { href: CSS }
        document::Script { src: MAPBOX_JS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
