//! Federated service detail page
//!
//! The service template and its per-cluster copies load independently,
//! each under its own loading flag. Once the template is known, the resource
//! status panel either follows the annotated workload across clusters or,
//! without one, lists the service's pods per cluster.

use super::Collaborators;
use crate::action::{ActionDispatcher, ActionOutcome, Confirmation, FormModal};
use crate::api::FederatedApi;
use crate::context::ConsoleContext;
use crate::error::Result;
use crate::federated::{ClusterResource, PodSummary, ServiceInfo, ServiceRecord, WorkloadModule};
use crate::meta::Scope;
use crate::store::{RequestSequencer, Subscribers};
use crate::view::service::{replica_statuses, ReplicaStatus, ServiceView};
use futures::future::{join, join_all};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// What the resource status panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceMode {
    /// Replica status of the workload named by the service's annotations
    Workload { name: String, module: WorkloadModule },
    /// Pods selected by the service itself
    Pods,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub detail: Option<ServiceRecord>,
    pub detail_loading: bool,
    pub detail_error: Option<String>,
    /// Clusters the resource panels cover
    pub clusters: Vec<String>,
    /// The service's copy in each member cluster
    pub resources: BTreeMap<String, ClusterResource>,
    /// The annotated workload in each member cluster
    pub workloads: BTreeMap<String, ClusterResource>,
    pub pods: BTreeMap<String, Vec<PodSummary>>,
    pub resources_loading: bool,
    /// Per-cluster fetch failures
    pub resource_errors: BTreeMap<String, String>,
}

impl DetailState {
    pub fn resource_mode(&self) -> ResourceMode {
        let annotations = self.detail.as_ref().map(|d| &d.annotations);
        match annotations.and_then(|a| a.workload_name.clone().map(|name| (name, a.workload_module))) {
            Some((name, module)) => ResourceMode::Workload { name, module },
            None => ResourceMode::Pods,
        }
    }

    pub fn replica_statuses(&self) -> Vec<ReplicaStatus> {
        replica_statuses(&self.workloads)
    }
}

/// One cluster's share of the resource status panel
struct ClusterStatus {
    cluster: String,
    workload: Option<Result<ClusterResource>>,
    pods: Result<Vec<PodSummary>>,
}

pub struct ServiceDetailController {
    ctx: ConsoleContext,
    scope: Scope,
    name: String,
    clusters: RefCell<Vec<String>>,
    api: Rc<dyn FederatedApi>,
    collaborators: Collaborators,
    dispatcher: ActionDispatcher,
    info_form: Rc<dyn FormModal<ServiceInfo>>,
    yaml_form: Rc<dyn FormModal<Value>>,
    state: RefCell<DetailState>,
    detail_seq: RequestSequencer,
    resources_seq: RequestSequencer,
    cluster_seq: RefCell<BTreeMap<String, u64>>,
    subscribers: Subscribers<DetailState>,
}

impl ServiceDetailController {
    pub fn new(
        ctx: ConsoleContext,
        namespace: &str,
        name: &str,
        api: Rc<dyn FederatedApi>,
        collaborators: Collaborators,
        info_form: Rc<dyn FormModal<ServiceInfo>>,
        yaml_form: Rc<dyn FormModal<Value>>,
    ) -> Self {
        Self {
            scope: Scope::namespaced(ctx.workspace.as_deref(), ctx.cluster.as_deref(), namespace),
            ctx,
            name: name.to_string(),
            clusters: RefCell::new(Vec::new()),
            api,
            dispatcher: ActionDispatcher::new(collaborators.confirmer.clone(), collaborators.notifier.clone()),
            collaborators,
            info_form,
            yaml_form,
            state: RefCell::new(DetailState::default()),
            detail_seq: RequestSequencer::default(),
            resources_seq: RequestSequencer::default(),
            cluster_seq: RefCell::new(BTreeMap::new()),
            subscribers: Subscribers::default(),
        }
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&DetailState) + 'static) -> u64 {
        self.subscribers.subscribe(listener)
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn view(&self) -> Option<ServiceView> {
        self.state
            .borrow()
            .detail
            .as_ref()
            .map(|record| ServiceView::project(&self.ctx, record))
    }

    fn namespace(&self) -> &str {
        self.scope.namespace.as_deref().unwrap_or_default()
    }

    fn update(&self, change: impl FnOnce(&mut DetailState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            change(&mut state);
            state.clone()
        };
        self.subscribers.publish(&snapshot);
    }

    /// Load the template and the copies in `clusters`, then the status panel
    pub async fn load(&self, clusters: Vec<String>) {
        *self.clusters.borrow_mut() = clusters;
        let Some(seq) = self.begin_resources() else {
            return;
        };
        join(self.load_detail(), self.load_copies(seq)).await;
        self.load_status(seq).await;
    }

    /// Load the template alongside the project's member clusters and their
    /// copies, then the status panel
    ///
    /// When the project cannot be read the copies follow the template's own
    /// placement instead.
    pub async fn load_project(&self) {
        let Some(seq) = self.begin_resources() else {
            return;
        };
        let copies = async {
            match self.api.project_clusters(self.namespace()).await {
                Ok(clusters) => {
                    *self.clusters.borrow_mut() = clusters;
                    self.load_copies(seq).await;
                    true
                }
                Err(err) => {
                    tracing::warn!(service = %self.name, error = %err, "Project clusters unavailable");
                    false
                }
            }
        };
        let (_, loaded) = join(self.load_detail(), copies).await;

        if !loaded {
            let placement = self.state.borrow().detail.as_ref().map(|d| d.clusters.clone());
            *self.clusters.borrow_mut() = placement.unwrap_or_default();
            self.load_copies(seq).await;
        }
        self.load_status(seq).await;
    }

    pub async fn load_detail(&self) {
        if self.detail_seq.is_disposed() {
            return;
        }
        let seq = self.detail_seq.next();
        self.update(|s| s.detail_loading = true);

        let result = self.api.service(&self.scope, &self.name).await;
        if !self.detail_seq.is_current(seq) {
            tracing::debug!(service = %self.name, seq, "Dropping superseded detail response");
            return;
        }
        match result {
            Ok(record) => self.update(|s| {
                s.detail = Some(record);
                s.detail_error = None;
                s.detail_loading = false;
            }),
            Err(err) => {
                tracing::warn!(service = %self.name, error = %err, "Detail fetch failed");
                self.update(|s| {
                    s.detail_error = Some(err.message());
                    s.detail_loading = false;
                });
            }
        }
    }

    /// Refetch every cluster's copy and the status panel
    pub async fn load_resources(&self) {
        let Some(seq) = self.begin_resources() else {
            return;
        };
        self.load_copies(seq).await;
        self.load_status(seq).await;
    }

    fn begin_resources(&self) -> Option<u64> {
        if self.resources_seq.is_disposed() {
            return None;
        }
        let seq = self.resources_seq.next();
        self.update(|s| s.resources_loading = true);
        Some(seq)
    }

    async fn load_copies(&self, seq: u64) {
        let clusters = self.clusters.borrow().clone();
        let namespace = self.namespace();
        let copies = join_all(
            clusters
                .iter()
                .map(|cluster| self.api.cluster_service(cluster, namespace, &self.name)),
        )
        .await;

        if !self.resources_seq.is_current(seq) {
            tracing::debug!(service = %self.name, seq, "Dropping superseded copies");
            return;
        }
        self.update(|s| {
            s.clusters = clusters.clone();
            s.resources.clear();
            s.resource_errors.clear();
            for (cluster, copy) in clusters.into_iter().zip(copies) {
                match copy {
                    Ok(resource) => {
                        s.resources.insert(cluster, resource);
                    }
                    Err(err) => record_error(s, &cluster, err.message()),
                }
            }
        });
    }

    // Runs once the template is known: workload mode depends on its annotations
    async fn load_status(&self, seq: u64) {
        let (mode, copies) = {
            let state = self.state.borrow();
            (state.resource_mode(), state.resources.clone())
        };
        let clusters = self.clusters.borrow().clone();
        let statuses = join_all(
            clusters
                .iter()
                .map(|cluster| self.fetch_status(cluster, &mode, copies.get(cluster).cloned())),
        )
        .await;

        if !self.resources_seq.is_current(seq) {
            tracing::debug!(service = %self.name, seq, "Dropping superseded resource status");
            return;
        }
        self.update(|s| {
            s.workloads.clear();
            s.pods.clear();
            for status in statuses {
                apply_status(s, status);
            }
            s.resources_loading = false;
        });
    }

    /// Refetch one cluster and merge it into the current resources
    pub async fn refresh_cluster(&self, cluster: &str) {
        if self.resources_seq.is_disposed() {
            return;
        }
        let generation = self.resources_seq.latest();
        let token = {
            let mut tokens = self.cluster_seq.borrow_mut();
            let token = tokens.entry(cluster.to_string()).or_insert(0);
            *token += 1;
            *token
        };

        let mode = self.state.borrow().resource_mode();
        let copy = self.api.cluster_service(cluster, self.namespace(), &self.name).await;
        let status = self.fetch_status(cluster, &mode, copy.as_ref().ok().cloned()).await;

        let latest_token = self.cluster_seq.borrow().get(cluster).copied();
        if !self.resources_seq.is_current(generation) || latest_token != Some(token) {
            tracing::debug!(service = %self.name, cluster, "Dropping superseded cluster refresh");
            return;
        }
        self.update(|s| {
            s.resources.remove(cluster);
            s.workloads.remove(cluster);
            s.pods.remove(cluster);
            s.resource_errors.remove(cluster);
            match copy {
                Ok(resource) => {
                    s.resources.insert(cluster.to_string(), resource);
                }
                Err(err) => record_error(s, cluster, err.message()),
            }
            apply_status(s, status);
        });
    }

    async fn fetch_status(&self, cluster: &str, mode: &ResourceMode, copy: Option<ClusterResource>) -> ClusterStatus {
        let namespace = self.namespace();
        let workload = match mode {
            ResourceMode::Workload { name, module } => {
                Some(self.api.cluster_workload(cluster, namespace, *module, name).await)
            }
            ResourceMode::Pods => None,
        };

        let selected = match &workload {
            Some(Ok(workload)) => Some(workload),
            Some(Err(_)) => None,
            None => copy.as_ref(),
        };
        let pods = match selected {
            Some(resource) => self.api.cluster_pods(cluster, namespace, resource).await,
            None => Ok(Vec::new()),
        };

        ClusterStatus {
            cluster: cluster.to_string(),
            workload,
            pods,
        }
    }

    /// Edit alias and description, then refetch the template
    pub async fn edit_info(&self) -> ActionOutcome {
        let Some(record) = self.state.borrow().detail.clone() else {
            return ActionOutcome::Cancelled;
        };
        let Some(info) = self.info_form.show(ServiceInfo::from_record(&record)).await else {
            return ActionOutcome::Cancelled;
        };

        let patch = info.to_patch();
        let outcome = self
            .dispatcher
            .submit("Edit Info", &self.name, None, || {
                self.api.patch_service(&self.scope, &self.name, &patch)
            })
            .await;
        if outcome.is_success() {
            self.load_detail().await;
        }
        outcome
    }

    /// Replace the whole object with an edited copy
    pub async fn edit_yaml(&self) -> ActionOutcome {
        let object = match self.api.service_raw(&self.scope, &self.name).await {
            Ok(object) => object,
            Err(err) => return ActionOutcome::Failed(self.collaborators.report(&self.name, err)),
        };
        let Some(object) = self.yaml_form.show(object).await else {
            return ActionOutcome::Cancelled;
        };

        let outcome = self
            .dispatcher
            .submit("Edit YAML", &self.name, None, || {
                self.api.replace_service(&self.scope, &self.name, &object)
            })
            .await;
        if outcome.is_success() {
            self.load_detail().await;
        }
        outcome
    }

    /// Delete the service and return to the service list
    pub async fn delete(&self) -> ActionOutcome {
        let confirmation = Confirmation::delete("Service", &[self.name.clone()]);
        let outcome = self
            .dispatcher
            .submit("Delete", &self.name, Some(confirmation), || {
                self.api.delete_service(&self.scope, &self.name)
            })
            .await;
        if outcome.is_success() {
            let url = crate::view::service::service_list_url(
                self.ctx.workspace.as_deref(),
                self.ctx.cluster.as_deref(),
                self.namespace(),
            );
            self.collaborators.navigator.navigate(&url);
        }
        outcome
    }

    pub fn dispose(&self) {
        self.detail_seq.dispose();
        self.resources_seq.dispose();
        self.subscribers.clear();
    }
}

fn record_error(state: &mut DetailState, cluster: &str, message: String) {
    tracing::warn!(cluster, error = %message, "Cluster resource unavailable");
    state
        .resource_errors
        .entry(cluster.to_string())
        .and_modify(|existing| {
            existing.push_str("; ");
            existing.push_str(&message);
        })
        .or_insert(message);
}

fn apply_status(state: &mut DetailState, status: ClusterStatus) {
    let cluster = status.cluster;
    match status.workload {
        Some(Ok(resource)) => {
            state.workloads.insert(cluster.clone(), resource);
        }
        Some(Err(err)) => record_error(state, &cluster, err.message()),
        None => {}
    }
    match status.pods {
        Ok(pods) => {
            state.pods.insert(cluster, pods);
        }
        Err(err) => record_error(state, &cluster, err.message()),
    }
}
