//! Federated Service Detail Tests

mod common;

use common::*;
use fleetview_common::action::ActionOutcome;
use fleetview_common::controller::{ResourceMode, ServiceDetailController};
use fleetview_common::federated::{ServiceInfo, WorkloadModule};
use fleetview_common::ConsoleContext;
use futures::poll;
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

fn ctx() -> ConsoleContext {
    ConsoleContext::new("admin")
        .with_workspace("ws")
        .with_actions(["view", "edit", "delete"])
}

fn service(annotations: Value) -> Value {
    json!({
        "metadata": {
            "name": "reviews",
            "namespace": "demo",
            "labels": {"app": "bookinfo"},
            "annotations": annotations,
            "creationTimestamp": "2024-01-02T03:04:05Z"
        },
        "spec": {
            "template": {"spec": {"type": "ClusterIP", "selector": {"app": "reviews"}}},
            "placement": {"clusters": [{"name": "east"}, {"name": "west"}]}
        }
    })
}

fn workload_service() -> Value {
    service(json!({
        "kubesphere.io/workloadName": "reviews-v1",
        "kubesphere.io/alias-name": "Reviews",
        "kubesphere.io/creator": "admin"
    }))
}

fn page(
    api: Rc<FakeFederatedApi>,
    ui: &Ui,
    info_form: Rc<ScriptedForm<ServiceInfo>>,
) -> ServiceDetailController {
    ServiceDetailController::new(
        ctx(),
        "demo",
        "reviews",
        api,
        ui.collaborators(),
        info_form,
        ScriptedForm::new(Some),
    )
}

fn clusters(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

fn seed(api: &FakeFederatedApi, cluster: &str, ready: u32) {
    api.copies
        .borrow_mut()
        .insert(cluster.to_string(), cluster_resource(cluster, "reviews", 0, 0));
    api.workloads
        .borrow_mut()
        .insert(cluster.to_string(), cluster_resource(cluster, "reviews-v1", 3, ready));
}

#[tokio::test]
async fn test_detail_attributes() {
    let api = FakeFederatedApi::with_service(workload_service());
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));

    page.load(Vec::new()).await;

    let view = page.view().unwrap();
    assert_eq!(view.title, "Reviews");
    assert_eq!(view.list_url, "/ws/federatedprojects/demo/services");
    let value = |name: &str| {
        view.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.clone())
            .unwrap()
    };
    assert_eq!(value("Project"), "demo");
    assert_eq!(value("Application"), "bookinfo");
    assert_eq!(value("Creator"), "admin");
    assert!(value("Type").ends_with("(ClusterIP)"));
    assert!(!page.state().detail_loading);
}

#[tokio::test]
async fn test_workload_mode_reports_replicas_per_cluster() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "east", 3);
    seed(&api, "west", 2);
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));

    page.load(clusters(&["east", "west"])).await;

    let state = page.state();
    assert_eq!(
        state.resource_mode(),
        ResourceMode::Workload {
            name: "reviews-v1".to_string(),
            module: WorkloadModule::Deployments
        }
    );
    let statuses = state.replica_statuses();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].text(), "3/3");
    assert!(statuses[0].healthy);
    assert_eq!(statuses[1].text(), "2/3");
    assert!(!statuses[1].healthy);
    assert!(!state.resources_loading);
}

#[tokio::test]
async fn test_copies_load_while_detail_is_pending() {
    let api = FakeFederatedApi::with_service(workload_service());
    *api.project_clusters.borrow_mut() = Some(clusters(&["east", "west", "south"]));
    seed(&api, "east", 3);
    seed(&api, "west", 3);
    seed(&api, "south", 1);
    let ui = Ui::new(true);
    let page = page(api.clone(), &ui, ScriptedForm::new(Some));

    let detail_gate = api.detail_gates.hold();
    let mut load = Box::pin(page.load_project());
    assert!(poll!(load.as_mut()).is_pending());

    // Every project cluster's copy is in before the template answers
    let state = page.state();
    assert!(state.detail_loading);
    assert!(state.detail.is_none());
    assert_eq!(state.clusters, clusters(&["east", "west", "south"]));
    assert_eq!(state.resources.keys().collect::<Vec<_>>(), vec!["east", "south", "west"]);
    assert!(state.resources_loading);

    detail_gate.send(()).unwrap();
    load.await;

    let state = page.state();
    assert!(!state.detail_loading);
    assert!(!state.resources_loading);
    assert_eq!(state.replica_statuses().len(), 3);
}

#[tokio::test]
async fn test_unreadable_project_falls_back_to_placement() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "east", 3);
    seed(&api, "west", 3);
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));

    page.load_project().await;

    let state = page.state();
    assert_eq!(state.clusters, clusters(&["east", "west"]));
    assert_eq!(state.resources.keys().collect::<Vec<_>>(), vec!["east", "west"]);
    assert_eq!(state.replica_statuses().len(), 2);
    assert!(state.resource_errors.is_empty());
    assert!(!state.resources_loading);
}

#[tokio::test]
async fn test_pods_mode_without_workload_annotation() {
    let api = FakeFederatedApi::with_service(service(json!({})));
    api.copies
        .borrow_mut()
        .insert("east".to_string(), cluster_resource("east", "reviews", 0, 0));
    api.pods
        .borrow_mut()
        .insert("east".to_string(), vec![pod("reviews-abc", "node-1")]);
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));

    page.load(clusters(&["east"])).await;

    let state = page.state();
    assert_eq!(state.resource_mode(), ResourceMode::Pods);
    assert!(state.workloads.is_empty());
    assert_eq!(state.pods["east"][0].name, "reviews-abc");
}

#[tokio::test]
async fn test_unreachable_cluster_does_not_hide_others() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "east", 3);
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));

    page.load(clusters(&["east", "south"])).await;

    let state = page.state();
    assert!(state.resources.contains_key("east"));
    assert!(state.workloads.contains_key("east"));
    assert!(state.resource_errors.contains_key("south"));
    assert!(!state.resource_errors.contains_key("east"));
    assert!(state.detail.is_some());
}

#[tokio::test]
async fn test_refresh_cluster_merges_one_cluster() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "east", 3);
    seed(&api, "west", 1);
    let ui = Ui::new(true);
    let page = page(api.clone(), &ui, ScriptedForm::new(Some));
    page.load(clusters(&["east", "west"])).await;

    seed(&api, "west", 3);
    seed(&api, "east", 0);
    page.refresh_cluster("west").await;

    let state = page.state();
    assert_eq!(state.workloads["west"].ready_replicas, 3);
    assert_eq!(state.workloads["east"].ready_replicas, 3);
}

#[tokio::test]
async fn test_older_cluster_refresh_loses() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "west", 1);
    let ui = Ui::new(true);
    let page = page(api.clone(), &ui, ScriptedForm::new(Some));
    page.load(clusters(&["west"])).await;

    let older_gate = api.cluster_gates.hold();
    let newer_gate = api.cluster_gates.hold();
    api.copies
        .borrow_mut()
        .insert("west".to_string(), cluster_resource("west", "reviews", 2, 0));
    let mut older = Box::pin(page.refresh_cluster("west"));
    assert!(poll!(older.as_mut()).is_pending());

    api.copies
        .borrow_mut()
        .insert("west".to_string(), cluster_resource("west", "reviews", 5, 0));
    let mut newer = Box::pin(page.refresh_cluster("west"));
    assert!(poll!(newer.as_mut()).is_pending());

    newer_gate.send(()).unwrap();
    newer.await;
    older_gate.send(()).unwrap();
    older.await;

    assert_eq!(page.state().resources["west"].replicas, Some(5));
}

#[tokio::test]
async fn test_edit_info_patches_annotations() {
    let api = FakeFederatedApi::with_service(workload_service());
    let ui = Ui::new(true);
    let form = ScriptedForm::new(|mut info: ServiceInfo| {
        info.alias_name.clear();
        info.description = "Book reviews".to_string();
        Some(info)
    });
    let page = page(api.clone(), &ui, form.clone());
    page.load(Vec::new()).await;

    let outcome = page.edit_info().await;

    assert!(outcome.is_success());
    assert_eq!(form.shown.borrow()[0].alias_name, "Reviews");
    let annotations = &api.patches.borrow()[0]["metadata"]["annotations"];
    assert_eq!(annotations["kubesphere.io/alias-name"], Value::Null);
    assert_eq!(annotations["kubesphere.io/description"], "Book reviews");
}

#[tokio::test]
async fn test_delete_returns_to_service_list() {
    let api = FakeFederatedApi::with_service(workload_service());
    let ui = Ui::new(true);
    let page = page(api.clone(), &ui, ScriptedForm::new(Some));
    page.load(Vec::new()).await;

    let outcome = page.delete().await;

    assert_eq!(outcome, ActionOutcome::Succeeded(()));
    assert!(api.deleted.get());
    assert_eq!(ui.paths(), vec!["/ws/federatedprojects/demo/services"]);
}

#[tokio::test]
async fn test_declined_delete_stays() {
    let api = FakeFederatedApi::with_service(workload_service());
    let ui = Ui::new(false);
    let page = page(api.clone(), &ui, ScriptedForm::new(Some));

    assert_eq!(page.delete().await, ActionOutcome::Cancelled);
    assert!(!api.deleted.get());
    assert!(ui.paths().is_empty());
}

#[tokio::test]
async fn test_dispose_stops_updates() {
    let api = FakeFederatedApi::with_service(workload_service());
    seed(&api, "east", 3);
    let ui = Ui::new(true);
    let page = page(api, &ui, ScriptedForm::new(Some));
    let published = Rc::new(Cell::new(0));
    let counter = published.clone();
    page.subscribe(move |_| counter.set(counter.get() + 1));

    page.dispose();
    page.load(clusters(&["east"])).await;

    assert_eq!(published.get(), 0);
    assert!(page.state().detail.is_none());
    assert!(page.state().resources.is_empty());
}
