//! Node list rows

use super::Utilization;
use crate::context::ConsoleContext;
use crate::metrics::{MetricSet, NodeMetric};
use crate::node::{NodeAnnotations, NodeCounts, NodeRecord, NodeStatus};
use crate::units::{format_number, format_pair, to_unit, Unit};

/// Usage column: percentage headline plus `used/total` detail
#[derive(Debug, Clone, PartialEq)]
pub struct UsageCell {
    pub utilization: Utilization,
    /// Whether the exclamation icon is drawn next to the percentage
    pub warning_icon: bool,
    /// e.g. `3.8/4 Core`
    pub detail: String,
}

impl UsageCell {
    fn project(metrics: &MetricSet, node: &str, used: NodeMetric, total: NodeMetric, unit: Unit) -> Self {
        let used = metrics.node_value(used, node);
        let total = metrics.node_value(total, node);
        let utilization = Utilization::from_parts(used, total);

        Self {
            warning_icon: utilization.warning && unit != Unit::Count,
            detail: format_pair(
                to_unit(used.unwrap_or(0.0), unit),
                to_unit(total.unwrap_or(0.0), unit),
                unit,
            ),
            utilization,
        }
    }
}

/// Taint count with one tooltip line per taint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintBadge {
    pub count: usize,
    pub lines: Vec<String>,
}

/// Requests and limits from the node's annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTooltip {
    pub requests: String,
    pub limits: String,
}

impl ResourceTooltip {
    fn project(requests: Option<f64>, requests_fraction: Option<&str>, limits: Option<f64>, limits_fraction: Option<&str>, unit: Unit) -> Self {
        let line = |value: Option<f64>, fraction: Option<&str>| {
            let value = value.map(|v| format_number(to_unit(v, unit))).unwrap_or_else(|| "-".to_string());
            format!("{} {} ({})", value, unit, fraction.unwrap_or("-"))
        };

        Self {
            requests: line(requests, requests_fraction),
            limits: line(limits, limits_fraction),
        }
    }

    pub fn cpu(annotations: &NodeAnnotations) -> Self {
        Self::project(
            annotations.cpu_requests,
            annotations.cpu_requests_fraction.as_deref(),
            annotations.cpu_limits,
            annotations.cpu_limits_fraction.as_deref(),
            NodeAnnotations::CPU_UNIT,
        )
    }

    pub fn memory(annotations: &NodeAnnotations) -> Self {
        Self::project(
            annotations.memory_requests,
            annotations.memory_requests_fraction.as_deref(),
            annotations.memory_limits,
            annotations.memory_limits_fraction.as_deref(),
            NodeAnnotations::MEMORY_UNIT,
        )
    }
}

/// Per-row node actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeAction {
    Uncordon,
    Cordon,
    Delete,
}

impl NodeAction {
    pub const ALL: [NodeAction; 3] = [Self::Uncordon, Self::Cordon, Self::Delete];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Uncordon => "uncordon",
            Self::Cordon => "cordon",
            Self::Delete => "delete",
        }
    }

    /// Permission the user needs for this action
    pub fn permission(&self) -> &'static str {
        match self {
            Self::Uncordon | Self::Cordon => "edit",
            Self::Delete => "delete",
        }
    }

    /// Whether the action applies to `node` at all
    pub fn applies_to(&self, node: &NodeRecord) -> bool {
        match self {
            Self::Uncordon => node.has_unschedulable_taint(),
            Self::Cordon => !node.has_unschedulable_taint(),
            Self::Delete => node.is_master(),
        }
    }

    pub fn visible(ctx: &ConsoleContext, node: &NodeRecord) -> Vec<NodeAction> {
        Self::ALL
            .iter()
            .copied()
            .filter(|a| ctx.allows(a.permission()) && a.applies_to(node))
            .collect()
    }
}

/// Actions over the selected rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeBatchAction {
    Taint,
    Delete,
}

impl NodeBatchAction {
    pub fn permission(&self) -> &'static str {
        match self {
            Self::Taint => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn visible(ctx: &ConsoleContext) -> Vec<NodeBatchAction> {
        [Self::Taint, Self::Delete]
            .into_iter()
            .filter(|a| ctx.allows(a.permission()))
            .collect()
    }
}

/// Everything one node row displays
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub name: String,
    pub ip: Option<String>,
    pub status: NodeStatus,
    pub status_label: String,
    /// `None` when the node has no taints
    pub taints: Option<TaintBadge>,
    pub roles: String,
    pub cpu: UsageCell,
    pub memory: UsageCell,
    pub pods: UsageCell,
    pub cpu_tooltip: ResourceTooltip,
    pub memory_tooltip: ResourceTooltip,
    pub actions: Vec<NodeAction>,
}

impl NodeRow {
    pub fn project(ctx: &ConsoleContext, node: &NodeRecord, metrics: &MetricSet) -> Self {
        let status = node.status();
        let taints = (!node.taints.is_empty()).then(|| TaintBadge {
            count: node.taints.len(),
            lines: node.taints.iter().map(ToString::to_string).collect(),
        });

        Self {
            name: node.name.clone(),
            ip: node.ip.clone(),
            status,
            status_label: status.label_key(),
            taints,
            roles: node.roles.join(","),
            cpu: UsageCell::project(metrics, &node.name, NodeMetric::CpuUsed, NodeMetric::CpuTotal, Unit::Core),
            memory: UsageCell::project(metrics, &node.name, NodeMetric::MemoryUsed, NodeMetric::MemoryTotal, Unit::Gi),
            pods: UsageCell::project(metrics, &node.name, NodeMetric::PodUsed, NodeMetric::PodTotal, Unit::Count),
            cpu_tooltip: ResourceTooltip::cpu(&node.annotations),
            memory_tooltip: ResourceTooltip::memory(&node.annotations),
            actions: NodeAction::visible(ctx, node),
        }
    }
}

/// Node count card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOverview {
    pub total: usize,
    pub masters: usize,
    pub workers: usize,
}

impl NodeOverview {
    /// Masters that also schedule workloads count as workers
    pub fn project(total: usize, counts: &NodeCounts) -> Self {
        Self {
            total,
            masters: counts.masters,
            workers: (total + counts.master_workers).saturating_sub(counts.masters),
        }
    }
}
