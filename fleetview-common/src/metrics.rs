//! Monitoring queries and instant-vector results
//!
//! A metrics fetch always follows a list fetch and is scoped to exactly the
//! names that list returned. Samples for any other resource are dropped when
//! the response is folded into a [`MetricSet`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Node metrics shown on the node list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeMetric {
    CpuUsed,
    CpuTotal,
    MemoryUsed,
    MemoryTotal,
    PodUsed,
    PodTotal,
}

impl NodeMetric {
    pub const ALL: [NodeMetric; 6] = [
        Self::CpuUsed,
        Self::CpuTotal,
        Self::MemoryUsed,
        Self::MemoryTotal,
        Self::PodUsed,
        Self::PodTotal,
    ];

    /// Server-side metric name
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::CpuUsed => "node_cpu_usage",
            Self::CpuTotal => "node_cpu_total",
            Self::MemoryUsed => "node_memory_usage_wo_cache",
            Self::MemoryTotal => "node_memory_total",
            Self::PodUsed => "node_pod_running_count",
            Self::PodTotal => "node_pod_quota",
        }
    }

    pub fn all_names() -> Vec<String> {
        Self::ALL.iter().map(|m| m.metric_name().to_string()).collect()
    }
}

/// A monitoring request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    /// Resource names the query is restricted to
    pub resources: Vec<String>,
    /// Metric names to fetch
    pub metrics: Vec<String>,
    /// Only the latest sample of each series
    pub last: bool,
}

impl MetricQuery {
    pub fn latest(resources: Vec<String>, metrics: Vec<String>) -> Self {
        Self {
            resources,
            metrics,
            last: true,
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("metrics_filter".to_string(), format!("{}$", self.metrics.join("|"))),
            ("resources_filter".to_string(), format!("{}$", self.resources.join("|"))),
        ];
        if self.last {
            pairs.push(("last".to_string(), "true".to_string()));
        }
        pairs
    }
}

/// Raw monitoring response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResponse {
    #[serde(default)]
    pub results: Vec<MetricResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric_name: String,
    #[serde(default)]
    pub data: MetricData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    /// Samples are kept loose and validated one by one
    #[serde(default)]
    pub result: Vec<Value>,
}

/// Latest value per metric and resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    values: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Outcome of folding a response into a [`MetricSet`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFold {
    pub set: MetricSet,
    /// Samples skipped because they were malformed
    pub issues: Vec<String>,
    /// Resource names present in the response but not in scope
    pub discarded: BTreeSet<String>,
}

impl MetricSet {
    /// Fold `response` into a set, keeping only resources in `scope`.
    ///
    /// `label` is the series label carrying the resource name (`node` for
    /// node metrics). Malformed samples are skipped and reported.
    pub fn fold(response: &MetricResponse, label: &str, scope: &BTreeSet<String>) -> MetricFold {
        let mut fold = MetricFold::default();

        for result in &response.results {
            for sample in &result.data.result {
                let Some(resource) = sample
                    .get("metric")
                    .and_then(|m| m.get(label))
                    .and_then(Value::as_str)
                else {
                    fold.issues
                        .push(format!("{}: sample without `{}` label", result.metric_name, label));
                    continue;
                };

                if !scope.contains(resource) {
                    fold.discarded.insert(resource.to_string());
                    continue;
                }

                match sample_value(sample) {
                    Some(value) => {
                        fold.set
                            .values
                            .entry(result.metric_name.clone())
                            .or_default()
                            .insert(resource.to_string(), value);
                    }
                    None => fold
                        .issues
                        .push(format!("{}: unreadable value for {}", result.metric_name, resource)),
                }
            }
        }

        fold
    }

    pub fn value(&self, metric: &str, resource: &str) -> Option<f64> {
        self.values.get(metric)?.get(resource).copied()
    }

    pub fn node_value(&self, metric: NodeMetric, node: &str) -> Option<f64> {
        self.value(metric.metric_name(), node)
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(BTreeMap::is_empty)
    }

    /// Every resource name with at least one sample
    pub fn resources(&self) -> BTreeSet<String> {
        self.values
            .values()
            .flat_map(|series| series.keys().cloned())
            .collect()
    }

    /// Drop every resource not in `scope`
    pub fn retain(&mut self, scope: &BTreeSet<String>) {
        for series in self.values.values_mut() {
            series.retain(|name, _| scope.contains(name));
        }
    }
}

// Instant vector sample: `"value": [<timestamp>, "<number>"]`
fn sample_value(sample: &Value) -> Option<f64> {
    let raw = sample.get("value")?.get(1)?;
    let value = match raw {
        Value::String(text) => text.parse::<f64>().ok()?,
        Value::Number(number) => number.as_f64()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
