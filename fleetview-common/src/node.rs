//! Cluster node records
//!
//! Nodes arrive as Kubernetes `Node` objects and are reduced to a
//! [`NodeRecord`] carrying only what the node views use: roles, taints,
//! conditions and the typed resource-request annotations.

use crate::annotations::{parse_annotations, AnnotationReport, AnnotationSchema};
use crate::error::{ConsoleError, Result};
use crate::list::Page;
use crate::meta::ObjectMeta;
use crate::units::{parse_quantity, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";
pub const UNSCHEDULABLE_TAINT: &str = "node.kubernetes.io/unschedulable";

/// Taint effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSchedule => write!(f, "NoSchedule"),
            Self::PreferNoSchedule => write!(f, "PreferNoSchedule"),
            Self::NoExecute => write!(f, "NoExecute"),
        }
    }
}

impl TaintEffect {
    pub const ALL: [TaintEffect; 3] = [Self::NoSchedule, Self::PreferNoSchedule, Self::NoExecute];
}

impl FromStr for TaintEffect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|effect| effect.to_string() == s)
            .ok_or_else(|| format!("unknown taint effect `{}`", s))
    }
}

/// Scheduling taint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub effect: TaintEffect,
}

impl Taint {
    pub fn new(key: &str, value: Option<&str>, effect: TaintEffect) -> Self {
        Self {
            key: key.to_string(),
            value: value.map(str::to_string),
            effect,
        }
    }

    pub fn unschedulable() -> Self {
        Self::new(UNSCHEDULABLE_TAINT, None, TaintEffect::NoSchedule)
    }
}

// key=value:effect, value may be empty
impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}:{}",
            self.key,
            self.value.as_deref().unwrap_or(""),
            self.effect
        )
    }
}

// Accepts `key=value:effect` and `key:effect`
impl FromStr for Taint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (pair, effect) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("taint `{}` has no effect", s))?;
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, Some(value).filter(|v| !v.is_empty())),
            None => (pair, None),
        };
        if key.is_empty() {
            return Err(format!("taint `{}` has no key", s));
        }
        Ok(Taint::new(key, value, effect.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    /// `True`, `False` or `Unknown`
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NodeCondition {
    fn is_true(&self) -> bool {
        self.status == "True"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(rename = "type")]
    pub address_type: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNodeSpec {
    #[serde(default)]
    pub unschedulable: bool,
    #[serde(default)]
    pub taints: Vec<Taint>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawNodeStatus {
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

/// Node object as served by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawNode {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RawNodeSpec,
    #[serde(default)]
    pub status: RawNodeStatus,
}

/// Resource-request annotations maintained by the platform on each node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAnnotations {
    /// Cores
    pub cpu_requests: Option<f64>,
    pub cpu_requests_fraction: Option<String>,
    pub cpu_limits: Option<f64>,
    pub cpu_limits_fraction: Option<String>,
    /// Bytes
    pub memory_requests: Option<f64>,
    pub memory_requests_fraction: Option<String>,
    pub memory_limits: Option<f64>,
    pub memory_limits_fraction: Option<String>,
}

impl AnnotationSchema for NodeAnnotations {
    const PREFIXES: &'static [&'static str] = &["node.kubesphere.io/"];
    const KEYS: &'static [&'static str] = &[
        "node.kubesphere.io/cpu-requests",
        "node.kubesphere.io/cpu-requests-fraction",
        "node.kubesphere.io/cpu-limits",
        "node.kubesphere.io/cpu-limits-fraction",
        "node.kubesphere.io/memory-requests",
        "node.kubesphere.io/memory-requests-fraction",
        "node.kubesphere.io/memory-limits",
        "node.kubesphere.io/memory-limits-fraction",
    ];

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        let quantity = || parse_quantity(value).ok_or_else(|| format!("not a quantity: {:?}", value));
        let fraction = || Some(value.trim().to_string());

        match key {
            "node.kubesphere.io/cpu-requests" => self.cpu_requests = Some(quantity()?),
            "node.kubesphere.io/cpu-requests-fraction" => self.cpu_requests_fraction = fraction(),
            "node.kubesphere.io/cpu-limits" => self.cpu_limits = Some(quantity()?),
            "node.kubesphere.io/cpu-limits-fraction" => self.cpu_limits_fraction = fraction(),
            "node.kubesphere.io/memory-requests" => self.memory_requests = Some(quantity()?),
            "node.kubesphere.io/memory-requests-fraction" => self.memory_requests_fraction = fraction(),
            "node.kubesphere.io/memory-limits" => self.memory_limits = Some(quantity()?),
            "node.kubesphere.io/memory-limits-fraction" => self.memory_limits_fraction = fraction(),
            _ => {}
        }
        Ok(())
    }
}

impl NodeAnnotations {
    pub const CPU_UNIT: Unit = Unit::Core;
    pub const MEMORY_UNIT: Unit = Unit::Gi;
}

/// Display status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Running,
    Pending,
    Unschedulable,
    Warning,
    Unknown,
}

/// Precedence when several statuses apply; earlier wins.
///
/// | status        | applies when                                               |
/// |---------------|------------------------------------------------------------|
/// | unschedulable | `spec.unschedulable` or the unschedulable taint is present |
/// | warning       | `Ready=False` or any pressure / network condition is True  |
/// | unknown       | `Ready=Unknown` (kubelet stopped reporting)                |
/// | pending       | no `Ready` condition reported yet                          |
/// | running       | always                                                     |
pub const NODE_STATUS_PRIORITY: [NodeStatus; 5] = [
    NodeStatus::Unschedulable,
    NodeStatus::Warning,
    NodeStatus::Unknown,
    NodeStatus::Pending,
    NodeStatus::Running,
];

const PRESSURE_CONDITIONS: [&str; 4] = [
    "MemoryPressure",
    "DiskPressure",
    "PIDPressure",
    "NetworkUnavailable",
];

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Unschedulable => "unschedulable",
            Self::Warning => "warning",
            Self::Unknown => "unknown",
        }
    }

    /// Translation key, e.g. `NODE_STATUS_RUNNING`
    pub fn label_key(&self) -> String {
        format!("NODE_STATUS_{}", self.as_str().to_uppercase())
    }

    /// Values offered by the status column filter
    pub fn filter_options() -> [NodeStatus; 3] {
        [Self::Running, Self::Unschedulable, Self::Warning]
    }

    fn applies(&self, node: &NodeRecord) -> bool {
        let ready = node.condition("Ready");
        match self {
            Self::Unschedulable => node.unschedulable || node.has_unschedulable_taint(),
            Self::Warning => {
                ready.is_some_and(|c| c.status == "False")
                    || node
                        .conditions
                        .iter()
                        .any(|c| PRESSURE_CONDITIONS.contains(&c.condition_type.as_str()) && c.is_true())
            }
            Self::Unknown => ready.is_some_and(|c| c.status == "Unknown"),
            Self::Pending => ready.is_none(),
            Self::Running => true,
        }
    }

    /// Pick the single status label for `node`
    pub fn classify(node: &NodeRecord) -> NodeStatus {
        NODE_STATUS_PRIORITY
            .iter()
            .copied()
            .find(|status| status.applies(node))
            .unwrap_or(NodeStatus::Unknown)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node as held by the console
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub name: String,
    pub ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub roles: Vec<String>,
    pub annotations: NodeAnnotations,
    pub annotation_report: AnnotationReport,
    pub taints: Vec<Taint>,
    pub unschedulable: bool,
    pub conditions: Vec<NodeCondition>,
    pub created: Option<DateTime<Utc>>,
}

impl NodeRecord {
    pub fn from_raw(raw: RawNode) -> Self {
        let (annotations, annotation_report) = parse_annotations::<NodeAnnotations>(&raw.metadata.annotations);
        if !annotation_report.invalid.is_empty() {
            tracing::debug!(
                node = %raw.metadata.name,
                invalid = ?annotation_report.invalid,
                "Ignoring unreadable node annotations"
            );
        }

        let ip = raw
            .status
            .addresses
            .iter()
            .find(|a| a.address_type == "InternalIP")
            .map(|a| a.address.clone());

        Self {
            roles: node_roles(&raw.metadata.labels),
            name: raw.metadata.name,
            ip,
            labels: raw.metadata.labels,
            annotations,
            annotation_report,
            taints: raw.spec.taints,
            unschedulable: raw.spec.unschedulable,
            conditions: raw.status.conditions,
            created: raw.metadata.creation_timestamp,
        }
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus::classify(self)
    }

    pub fn condition(&self, condition_type: &str) -> Option<&NodeCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    pub fn has_unschedulable_taint(&self) -> bool {
        self.taints.iter().any(|t| t.key == UNSCHEDULABLE_TAINT)
    }

    pub fn is_master(&self) -> bool {
        self.roles.iter().any(|r| r == "master")
    }
}

/// Roles from `node-role.kubernetes.io/<role>` labels; `worker` when none
pub fn node_roles(labels: &BTreeMap<String, String>) -> Vec<String> {
    let roles: Vec<String> = labels
        .keys()
        .filter_map(|key| key.strip_prefix(ROLE_LABEL_PREFIX))
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();

    if roles.is_empty() {
        vec!["worker".to_string()]
    } else {
        roles
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNodeList {
    #[serde(default)]
    items: Vec<RawNode>,
    #[serde(default)]
    total_items: Option<usize>,
}

/// Parse a `{items, totalItems}` node collection
pub fn parse_node_list(payload: Value) -> Result<Page<NodeRecord>> {
    let list: RawNodeList =
        serde_json::from_value(payload).map_err(|e| ConsoleError::Validation(format!("node list: {}", e)))?;
    let total = list.total_items.unwrap_or(list.items.len());
    let items = list.items.into_iter().map(NodeRecord::from_raw).collect();
    Ok(Page::new(items, total))
}

/// Master and master+worker counts for the overview card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    pub masters: usize,
    pub master_workers: usize,
}
