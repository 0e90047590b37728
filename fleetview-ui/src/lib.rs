use leptos::*;
use leptos_meta::*;
use leptos_router::*;
use wasm_bindgen::prelude::wasm_bindgen;

mod api;
mod collaborators;
mod components;
mod config;
mod pages;
pub mod utils;

use collaborators::{ToastStack, Toasts};
use config::UiConfig;
use pages::{NodesPage, PipelinesPage, ServiceDetailPage};

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let config = UiConfig::load();
    let toasts = Toasts::new();
    provide_context(config.clone());
    provide_context(toasts);

    view! {
        <Stylesheet id="leptos" href="/pkg/fleetview-ui.css"/>
        <Title text="Fleetview - Cluster Console"/>
        <Meta name="description" content="Nodes, DevOps pipelines and federated services across clusters"/>

        <Router>
            <nav class="navbar">
                <div class="navbar-brand">
                    <h1>"Fleetview"</h1>
                    <span class="tagline">{config.username.clone()}</span>
                </div>
            </nav>

            <main class="container">
                <Routes>
                    <Route path="/" view=Home/>
                    <Route path="/clusters/:cluster/nodes" view=NodesPage/>
                    <Route path="/:workspace/clusters/:cluster/devops/:devops/pipelines" view=PipelinesPage/>
                    <Route path="/:workspace/federatedprojects/:namespace/services/:name" view=ServiceDetailPage/>
                </Routes>
            </main>

            <ToastStack toasts=toasts/>
        </Router>
    }
}

#[component]
fn Home() -> impl IntoView {
    view! {
        <div class="page">
            <h1>"Fleetview"</h1>
            <ul class="link-list">
                <li><A href="/clusters/host/nodes">"Cluster Nodes"</A></li>
            </ul>
        </div>
    }
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}
