//! Cluster node list page

use super::Collaborators;
use crate::action::{ActionDispatcher, ActionOutcome, BatchReport, Confirmation, FormModal};
use crate::api::NodeApi;
use crate::context::ConsoleContext;
use crate::error::Result;
use crate::list::{ListQuery, Page};
use crate::metrics::{MetricQuery, MetricResponse, NodeMetric};
use crate::node::{NodeCounts, NodeRecord, Taint};
use crate::store::{Aggregator, ListSource, MetricsPlan, MetricsSource, PageState, RequestSequencer};
use crate::view::{NodeOverview, NodeRow};
use async_trait::async_trait;
use std::cell::Cell;
use std::rc::Rc;

/// Adapts [`NodeApi`] to the aggregator's sources for one cluster
pub struct NodeSource {
    api: Rc<dyn NodeApi>,
    cluster: String,
}

impl NodeSource {
    pub fn new(api: Rc<dyn NodeApi>, cluster: &str) -> Self {
        Self {
            api,
            cluster: cluster.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl ListSource<NodeRecord> for NodeSource {
    async fn fetch_list(&self, query: &ListQuery) -> Result<Page<NodeRecord>> {
        self.api.list_nodes(&self.cluster, query).await
    }
}

#[async_trait(?Send)]
impl MetricsSource for NodeSource {
    async fn fetch_metrics(&self, query: &MetricQuery) -> Result<MetricResponse> {
        self.api.node_metrics(&self.cluster, query).await
    }
}

/// Taint management form: the taint set to apply to every listed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintForm {
    pub nodes: Vec<String>,
    pub taints: Vec<Taint>,
}

pub struct NodesController {
    ctx: ConsoleContext,
    cluster: String,
    api: Rc<dyn NodeApi>,
    aggregator: Aggregator<NodeRecord>,
    dispatcher: ActionDispatcher,
    taint_form: Rc<dyn FormModal<TaintForm>>,
    counts: Cell<Option<NodeCounts>>,
    counts_seq: RequestSequencer,
}

impl NodesController {
    pub fn new(
        ctx: ConsoleContext,
        cluster: &str,
        api: Rc<dyn NodeApi>,
        collaborators: Collaborators,
        taint_form: Rc<dyn FormModal<TaintForm>>,
    ) -> Self {
        let source = Rc::new(NodeSource::new(api.clone(), cluster));
        let plan = MetricsPlan {
            source: source.clone(),
            metrics: NodeMetric::all_names(),
            label: "node",
        };

        Self {
            ctx,
            cluster: cluster.to_string(),
            api,
            aggregator: Aggregator::with_metrics("nodes", source, plan),
            dispatcher: ActionDispatcher::new(collaborators.confirmer, collaborators.notifier),
            taint_form,
            counts: Cell::new(None),
            counts_seq: RequestSequencer::default(),
        }
    }

    pub fn aggregator(&self) -> &Aggregator<NodeRecord> {
        &self.aggregator
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn state(&self) -> PageState<NodeRecord> {
        self.aggregator.state()
    }

    pub async fn load(&self, query: ListQuery) {
        self.aggregator.load(query).await;
    }

    pub async fn refresh(&self) {
        self.aggregator.refresh().await;
    }

    /// Fetch master and master+worker counts for the overview card
    pub async fn load_counts(&self) {
        let seq = self.counts_seq.next();
        let result = self.api.node_counts(&self.cluster).await;
        if !self.counts_seq.is_current(seq) {
            return;
        }
        match result {
            Ok(counts) => self.counts.set(Some(counts)),
            Err(err) => tracing::warn!(cluster = %self.cluster, error = %err, "Node count fetch failed"),
        }
    }

    pub fn rows(&self) -> Vec<NodeRow> {
        let state = self.aggregator.state();
        state
            .list
            .items
            .iter()
            .map(|node| NodeRow::project(&self.ctx, node, &state.metrics))
            .collect()
    }

    pub fn overview(&self) -> NodeOverview {
        let total = self.aggregator.state().list.total;
        NodeOverview::project(total, &self.counts.get().unwrap_or_default())
    }

    /// Mark `node` unschedulable and refetch once the server acknowledges
    pub async fn cordon(&self, node: &str) -> ActionOutcome {
        let outcome = self
            .dispatcher
            .submit("Cordon", node, None, || self.api.cordon(&self.cluster, node))
            .await;
        self.refresh_after(&outcome).await;
        outcome
    }

    pub async fn uncordon(&self, node: &str) -> ActionOutcome {
        let outcome = self
            .dispatcher
            .submit("Uncordon", node, None, || self.api.uncordon(&self.cluster, node))
            .await;
        self.refresh_after(&outcome).await;
        outcome
    }

    pub async fn delete(&self, node: &str) -> ActionOutcome {
        let confirmation = Confirmation::delete("Cluster Node", &[node.to_string()]);
        let outcome = self
            .dispatcher
            .submit("Delete", node, Some(confirmation), || self.api.delete_node(&self.cluster, node))
            .await;
        self.refresh_after(&outcome).await;
        outcome
    }

    /// Show the taint form for `nodes` and apply the result to each
    pub async fn batch_taint(&self, nodes: Vec<String>) -> ActionOutcome<BatchReport> {
        let form = TaintForm {
            taints: self.shared_taints(&nodes),
            nodes: nodes.clone(),
        };
        let Some(form) = self.taint_form.show(form).await else {
            return ActionOutcome::Cancelled;
        };

        let taints = Rc::new(form.taints);
        let outcome = self
            .dispatcher
            .submit_batch("Taint Management", nodes, None, |node| {
                let taints = taints.clone();
                async move { self.api.set_taints(&self.cluster, &node, &taints).await }
            })
            .await;
        self.refresh_after(&outcome).await;
        outcome
    }

    pub async fn batch_delete(&self, nodes: Vec<String>) -> ActionOutcome<BatchReport> {
        let confirmation = Confirmation::delete("Cluster Node", &nodes);
        let outcome = self
            .dispatcher
            .submit_batch("Delete", nodes, Some(confirmation), |node| async move {
                self.api.delete_node(&self.cluster, &node).await
            })
            .await;
        self.refresh_after(&outcome).await;
        outcome
    }

    pub fn dispose(&self) {
        self.aggregator.dispose();
        self.counts_seq.dispose();
    }

    // Taints present on every selected node seed the form
    fn shared_taints(&self, nodes: &[String]) -> Vec<Taint> {
        let state = self.aggregator.state();
        let selected: Vec<&NodeRecord> = state
            .list
            .items
            .iter()
            .filter(|n| nodes.contains(&n.name))
            .collect();
        let Some((first, rest)) = selected.split_first() else {
            return Vec::new();
        };
        first
            .taints
            .iter()
            .filter(|t| rest.iter().all(|n| n.taints.contains(t)))
            .cloned()
            .collect()
    }

    async fn refresh_after<T>(&self, outcome: &ActionOutcome<T>) {
        if outcome.is_success() {
            self.refresh().await;
        }
    }
}
