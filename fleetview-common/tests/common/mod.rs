//! Common test utilities and fakes
//!
//! Fakes keep an in-memory "server" and can hold any response until the
//! test releases it, so responses can be made to arrive in any order.

#![allow(dead_code)]

use async_trait::async_trait;
use fleetview_common::action::{Confirmation, Confirmer, FormModal, Navigator, Notice, Notifier};
use fleetview_common::api::{FederatedApi, NodeApi, PipelineApi};
use fleetview_common::controller::Collaborators;
use fleetview_common::federated::{
    parse_federated_service, ClusterResource, PodSummary, ServiceRecord, WorkloadModule,
};
use fleetview_common::meta::Scope;
use fleetview_common::metrics::{MetricQuery, MetricResponse};
use fleetview_common::node::{NodeCounts, NodeRecord, RawNode, Taint};
use fleetview_common::pipeline::{PipelineConfig, PipelineParameter, PipelineRecord, RunRequest};
use fleetview_common::{ConsoleError, ListQuery, Page, Result};
use futures::channel::oneshot;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

/// Queue of held responses. Each call to [`Gates::pass`] waits on the oldest
/// receiver; with no gate queued it passes immediately.
#[derive(Default)]
pub struct Gates {
    queue: RefCell<VecDeque<oneshot::Receiver<()>>>,
}

impl Gates {
    /// Hold the next call until the returned sender fires
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.queue.borrow_mut().push_back(rx);
        tx
    }

    pub async fn pass(&self) {
        let gate = self.queue.borrow_mut().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

pub struct ScriptedConfirmer {
    pub answer: Cell<bool>,
    pub asked: RefCell<Vec<Confirmation>>,
}

#[async_trait(?Send)]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, confirmation: &Confirmation) -> bool {
        self.asked.borrow_mut().push(confirmation.clone());
        self.answer.get()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: RefCell<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub paths: RefCell<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.borrow_mut().push(path.to_string());
    }
}

/// Form that answers with `edit(initial)`; `None` cancels
pub struct ScriptedForm<C> {
    pub edit: Box<dyn Fn(C) -> Option<C>>,
    pub shown: RefCell<Vec<C>>,
}

impl<C: Clone> ScriptedForm<C> {
    pub fn new(edit: impl Fn(C) -> Option<C> + 'static) -> Rc<Self> {
        Rc::new(Self {
            edit: Box::new(edit),
            shown: RefCell::new(Vec::new()),
        })
    }
}

#[async_trait(?Send)]
impl<C: Clone + 'static> FormModal<C> for ScriptedForm<C> {
    async fn show(&self, initial: C) -> Option<C> {
        self.shown.borrow_mut().push(initial.clone());
        (self.edit)(initial)
    }
}

pub struct Ui {
    pub confirmer: Rc<ScriptedConfirmer>,
    pub notifier: Rc<RecordingNotifier>,
    pub navigator: Rc<RecordingNavigator>,
}

impl Ui {
    pub fn new(confirm: bool) -> Self {
        Self {
            confirmer: Rc::new(ScriptedConfirmer {
                answer: Cell::new(confirm),
                asked: RefCell::new(Vec::new()),
            }),
            notifier: Rc::new(RecordingNotifier::default()),
            navigator: Rc::new(RecordingNavigator::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            confirmer: self.confirmer.clone(),
            notifier: self.notifier.clone(),
            navigator: self.navigator.clone(),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.navigator.paths.borrow().clone()
    }
}

pub fn node(name: &str, labels: Value, taints: Value) -> NodeRecord {
    let raw: RawNode = serde_json::from_value(json!({
        "metadata": {"name": name, "labels": labels},
        "spec": {"taints": taints},
        "status": {"conditions": [{"type": "Ready", "status": "True"}]}
    }))
    .unwrap();
    NodeRecord::from_raw(raw)
}

/// Monitoring payload with one sample per `(metric, node, value)`
pub fn metric_payload(samples: &[(&str, &str, f64)]) -> Value {
    let mut by_metric: Vec<(String, Vec<Value>)> = Vec::new();
    for (metric, node, value) in samples {
        let sample = json!({"metric": {"node": node}, "value": [1700000000, value.to_string()]});
        match by_metric.iter_mut().find(|(m, _)| m == metric) {
            Some((_, series)) => series.push(sample),
            None => by_metric.push((metric.to_string(), vec![sample])),
        }
    }
    let results: Vec<Value> = by_metric
        .into_iter()
        .map(|(metric, result)| json!({"metric_name": metric, "data": {"resultType": "vector", "result": result}}))
        .collect();
    json!({ "results": results })
}

fn rejected(name: &str) -> ConsoleError {
    ConsoleError::Http {
        status: 403,
        body: format!("{} is protected", name),
    }
}

/// In-memory node API for one cluster
#[derive(Default)]
pub struct FakeNodeApi {
    pub nodes: RefCell<Vec<NodeRecord>>,
    pub list_gates: Gates,
    pub metric_gates: Gates,
    pub list_calls: Cell<usize>,
    pub list_error: RefCell<Option<ConsoleError>>,
    pub metrics: RefCell<Value>,
    pub metrics_error: RefCell<Option<ConsoleError>>,
    pub metric_queries: RefCell<Vec<MetricQuery>>,
    pub counts: Cell<NodeCounts>,
    pub protected: RefCell<BTreeSet<String>>,
    pub writes: RefCell<Vec<String>>,
}

impl FakeNodeApi {
    pub fn with_nodes(nodes: Vec<NodeRecord>) -> Rc<Self> {
        let api = Self::default();
        *api.nodes.borrow_mut() = nodes;
        *api.metrics.borrow_mut() = json!({ "results": [] });
        Rc::new(api)
    }

    fn mutate(&self, node: &str, action: &str) -> Result<()> {
        if self.protected.borrow().contains(node) {
            return Err(rejected(node));
        }
        self.writes.borrow_mut().push(format!("{} {}", action, node));
        Ok(())
    }
}

#[async_trait(?Send)]
impl NodeApi for FakeNodeApi {
    async fn list_nodes(&self, _cluster: &str, query: &ListQuery) -> Result<Page<NodeRecord>> {
        self.list_calls.set(self.list_calls.get() + 1);
        // Snapshot before waiting, the way a server answers as of request time
        let filter = query.filters.get("name").cloned().unwrap_or_default();
        let items: Vec<NodeRecord> = self
            .nodes
            .borrow()
            .iter()
            .filter(|n| n.name.contains(&filter))
            .cloned()
            .collect();
        let error = self.list_error.borrow().clone();
        self.list_gates.pass().await;

        match error {
            Some(err) => Err(err),
            None => {
                let total = items.len();
                Ok(Page::new(items, total))
            }
        }
    }

    async fn node_metrics(&self, _cluster: &str, query: &MetricQuery) -> Result<MetricResponse> {
        self.metric_queries.borrow_mut().push(query.clone());
        let payload = self.metrics.borrow().clone();
        let error = self.metrics_error.borrow().clone();
        self.metric_gates.pass().await;

        match error {
            Some(err) => Err(err),
            None => serde_json::from_value(payload).map_err(|e| ConsoleError::Validation(e.to_string())),
        }
    }

    async fn node_counts(&self, _cluster: &str) -> Result<NodeCounts> {
        Ok(self.counts.get())
    }

    async fn cordon(&self, _cluster: &str, node: &str) -> Result<()> {
        self.mutate(node, "cordon")?;
        if let Some(record) = self.nodes.borrow_mut().iter_mut().find(|n| n.name == node) {
            // The node controller mirrors the flag as a taint
            record.unschedulable = true;
            record.taints.push(Taint::unschedulable());
        }
        Ok(())
    }

    async fn uncordon(&self, _cluster: &str, node: &str) -> Result<()> {
        self.mutate(node, "uncordon")?;
        if let Some(record) = self.nodes.borrow_mut().iter_mut().find(|n| n.name == node) {
            record.unschedulable = false;
            record.taints.retain(|t| *t != Taint::unschedulable());
        }
        Ok(())
    }

    async fn delete_node(&self, _cluster: &str, node: &str) -> Result<()> {
        self.mutate(node, "delete")?;
        self.nodes.borrow_mut().retain(|n| n.name != node);
        Ok(())
    }

    async fn set_taints(&self, _cluster: &str, node: &str, taints: &[Taint]) -> Result<()> {
        self.mutate(node, "taint")?;
        if let Some(record) = self.nodes.borrow_mut().iter_mut().find(|n| n.name == node) {
            record.taints = taints.to_vec();
        }
        Ok(())
    }
}

/// In-memory pipeline API for one DevOps project
#[derive(Default)]
pub struct FakePipelineApi {
    pub pipelines: RefCell<Vec<PipelineRecord>>,
    pub list_calls: Cell<usize>,
    pub queries: RefCell<Vec<ListQuery>>,
    pub protected: RefCell<BTreeSet<String>>,
    pub runs: RefCell<Vec<(String, RunRequest)>>,
    pub configs: RefCell<BTreeMap<String, PipelineConfig>>,
    pub deleted: RefCell<Vec<String>>,
}

impl FakePipelineApi {
    pub fn with_pipelines(pipelines: Vec<PipelineRecord>) -> Rc<Self> {
        let api = Self::default();
        *api.pipelines.borrow_mut() = pipelines;
        Rc::new(api)
    }
}

#[async_trait(?Send)]
impl PipelineApi for FakePipelineApi {
    async fn list_pipelines(&self, _scope: &Scope, query: &ListQuery) -> Result<Page<PipelineRecord>> {
        self.list_calls.set(self.list_calls.get() + 1);
        self.queries.borrow_mut().push(query.clone());
        let items = self.pipelines.borrow().clone();
        let total = items.len();
        Ok(Page::new(items, total))
    }

    async fn run_pipeline(&self, _scope: &Scope, name: &str, request: &RunRequest) -> Result<()> {
        self.runs.borrow_mut().push((name.to_string(), request.clone()));
        Ok(())
    }

    async fn branch_parameters(&self, _scope: &Scope, name: &str, _branch: &str) -> Result<Vec<PipelineParameter>> {
        Ok(self
            .pipelines
            .borrow()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.parameters.clone())
            .unwrap_or_default())
    }

    async fn delete_pipeline(&self, _scope: &Scope, name: &str) -> Result<()> {
        if self.protected.borrow().contains(name) {
            return Err(rejected(name));
        }
        self.deleted.borrow_mut().push(name.to_string());
        self.pipelines.borrow_mut().retain(|p| p.name != name);
        Ok(())
    }

    async fn pipeline_config(&self, _scope: &Scope, name: &str) -> Result<PipelineConfig> {
        self.configs
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ConsoleError::Http {
                status: 404,
                body: String::new(),
            })
    }

    async fn create_pipeline(&self, _scope: &Scope, config: &PipelineConfig) -> Result<String> {
        self.configs.borrow_mut().insert(config.name.clone(), config.clone());
        self.pipelines.borrow_mut().push(PipelineRecord {
            name: config.name.clone(),
            ..Default::default()
        });
        Ok(config.name.clone())
    }

    async fn update_pipeline(&self, _scope: &Scope, config: &PipelineConfig) -> Result<()> {
        self.configs.borrow_mut().insert(config.name.clone(), config.clone());
        Ok(())
    }
}

/// In-memory federated service spread over member clusters
#[derive(Default)]
pub struct FakeFederatedApi {
    pub service: RefCell<Value>,
    pub detail_gates: Gates,
    /// Member clusters of the project; `None` fails the read
    pub project_clusters: RefCell<Option<Vec<String>>>,
    pub copies: RefCell<BTreeMap<String, ClusterResource>>,
    pub workloads: RefCell<BTreeMap<String, ClusterResource>>,
    pub pods: RefCell<BTreeMap<String, Vec<PodSummary>>>,
    pub cluster_gates: Gates,
    pub patches: RefCell<Vec<Value>>,
    pub replaced: RefCell<Vec<Value>>,
    pub deleted: Cell<bool>,
}

impl FakeFederatedApi {
    pub fn with_service(service: Value) -> Rc<Self> {
        let api = Self::default();
        *api.service.borrow_mut() = service;
        Rc::new(api)
    }

    fn missing(cluster: &str) -> ConsoleError {
        ConsoleError::Network(format!("cluster {} unreachable", cluster))
    }
}

#[async_trait(?Send)]
impl FederatedApi for FakeFederatedApi {
    async fn service(&self, _scope: &Scope, _name: &str) -> Result<ServiceRecord> {
        let payload = self.service.borrow().clone();
        self.detail_gates.pass().await;
        parse_federated_service(payload)
    }

    async fn service_raw(&self, _scope: &Scope, _name: &str) -> Result<Value> {
        Ok(self.service.borrow().clone())
    }

    async fn patch_service(&self, _scope: &Scope, _name: &str, patch: &Value) -> Result<()> {
        self.patches.borrow_mut().push(patch.clone());
        Ok(())
    }

    async fn replace_service(&self, _scope: &Scope, _name: &str, object: &Value) -> Result<()> {
        self.replaced.borrow_mut().push(object.clone());
        *self.service.borrow_mut() = object.clone();
        Ok(())
    }

    async fn delete_service(&self, _scope: &Scope, _name: &str) -> Result<()> {
        self.deleted.set(true);
        Ok(())
    }

    async fn project_clusters(&self, namespace: &str) -> Result<Vec<String>> {
        self.project_clusters
            .borrow()
            .clone()
            .ok_or_else(|| ConsoleError::Http {
                status: 403,
                body: format!("federatednamespaces {} is forbidden", namespace),
            })
    }

    async fn cluster_service(&self, cluster: &str, _namespace: &str, _name: &str) -> Result<ClusterResource> {
        let copy = self.copies.borrow().get(cluster).cloned();
        self.cluster_gates.pass().await;
        copy.ok_or_else(|| Self::missing(cluster))
    }

    async fn cluster_workload(
        &self,
        cluster: &str,
        _namespace: &str,
        _module: WorkloadModule,
        _name: &str,
    ) -> Result<ClusterResource> {
        self.workloads
            .borrow()
            .get(cluster)
            .cloned()
            .ok_or_else(|| Self::missing(cluster))
    }

    async fn cluster_pods(&self, cluster: &str, _namespace: &str, _resource: &ClusterResource) -> Result<Vec<PodSummary>> {
        Ok(self.pods.borrow().get(cluster).cloned().unwrap_or_default())
    }
}

pub fn cluster_resource(cluster: &str, name: &str, replicas: u32, ready: u32) -> ClusterResource {
    ClusterResource {
        cluster: cluster.to_string(),
        name: name.to_string(),
        namespace: "demo".to_string(),
        replicas: Some(replicas),
        ready_replicas: ready,
        available_replicas: ready,
        selector: BTreeMap::from([("app".to_string(), name.to_string())]),
    }
}

pub fn pod(name: &str, node: &str) -> PodSummary {
    PodSummary {
        name: name.to_string(),
        node: Some(node.to_string()),
        phase: "Running".to_string(),
        ready_containers: 1,
        total_containers: 1,
    }
}
