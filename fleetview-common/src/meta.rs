//! Object metadata shared by every resource payload

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subset of Kubernetes object metadata the console reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub managed_fields: Vec<ManagedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedField {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Last write recorded in managed fields, else creation time
    pub fn update_time(&self) -> Option<DateTime<Utc>> {
        self.managed_fields
            .iter()
            .filter_map(|f| f.time)
            .max()
            .or(self.creation_timestamp)
    }
}

/// Where a resource lives. Identity of a record is its name plus scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Scope {
    pub fn cluster(cluster: &str) -> Self {
        Self {
            cluster: Some(cluster.to_string()),
            ..Default::default()
        }
    }

    pub fn namespaced(workspace: Option<&str>, cluster: Option<&str>, namespace: &str) -> Self {
        Self {
            workspace: workspace.map(str::to_string),
            cluster: cluster.map(str::to_string),
            namespace: Some(namespace.to_string()),
        }
    }

    /// `/clusters/<cluster>` segment inserted after the API group root
    pub fn cluster_prefix(&self) -> String {
        match &self.cluster {
            Some(cluster) => format!("/clusters/{}", cluster),
            None => String::new(),
        }
    }
}

/// Render a timestamp as `YYYY-MM-DD HH:mm:ss` in `offset`
pub fn format_time(time: &DateTime<Utc>, offset: &FixedOffset) -> String {
    time.with_timezone(offset).format("%Y-%m-%d %H:%M:%S").to_string()
}
