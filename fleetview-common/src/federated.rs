//! Federated services and their per-cluster instances
//!
//! A federated resource is a template plus a placement; the member clusters
//! each run a concrete copy. The detail view reads the template for its
//! attributes and the copies for replica status.

use crate::annotations::{parse_annotations, AnnotationReport, AnnotationSchema};
use crate::error::{ConsoleError, Result};
use crate::meta::ObjectMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const APP_LABEL: &str = "app.kubernetes.io/name";

/// Workload kind a service fronts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadModule {
    #[default]
    Deployments,
    StatefulSets,
    DaemonSets,
}

impl WorkloadModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployments => "deployments",
            Self::StatefulSets => "statefulsets",
            Self::DaemonSets => "daemonsets",
        }
    }

    /// Federated kind path segment, e.g. `federateddeployments`
    pub fn federated_path(&self) -> String {
        format!("federated{}", self.as_str())
    }
}

impl FromStr for WorkloadModule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deployments" => Ok(Self::Deployments),
            "statefulsets" => Ok(Self::StatefulSets),
            "daemonsets" => Ok(Self::DaemonSets),
            other => Err(format!("unknown workload module: {}", other)),
        }
    }
}

impl fmt::Display for WorkloadModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Console annotations on a service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceAnnotations {
    /// How the service was created, e.g. `VirtualIP`
    pub service_type: Option<String>,
    pub workload_name: Option<String>,
    /// `deployments` unless annotated otherwise
    pub workload_module: WorkloadModule,
    pub alias_name: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
}

impl AnnotationSchema for ServiceAnnotations {
    const PREFIXES: &'static [&'static str] = &["kubesphere.io/"];
    const KEYS: &'static [&'static str] = &[
        "kubesphere.io/serviceType",
        "kubesphere.io/workloadName",
        "kubesphere.io/workloadModule",
        "kubesphere.io/alias-name",
        "kubesphere.io/description",
        "kubesphere.io/creator",
    ];

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        let text = (!value.is_empty()).then(|| value.to_string());
        match key {
            "kubesphere.io/serviceType" => self.service_type = text,
            "kubesphere.io/workloadName" => self.workload_name = text,
            "kubesphere.io/workloadModule" => self.workload_module = value.parse()?,
            "kubesphere.io/alias-name" => self.alias_name = text,
            "kubesphere.io/description" => self.description = text,
            "kubesphere.io/creator" => self.creator = text,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawServiceSpec {
    #[serde(rename = "type", default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTemplate {
    #[serde(default)]
    pub spec: RawServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlacement {
    #[serde(default)]
    pub clusters: Vec<ClusterRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFederatedSpec {
    #[serde(default)]
    pub template: RawTemplate,
    #[serde(default)]
    pub placement: RawPlacement,
}

/// `FederatedService` object as served by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFederatedService {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RawFederatedSpec,
}

/// Federated service as held by the detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: ServiceAnnotations,
    pub annotation_report: AnnotationReport,
    /// Kubernetes service type of the template, e.g. `ClusterIP`
    pub spec_type: Option<String>,
    pub selector: BTreeMap<String, String>,
    pub clusters: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    pub fn from_raw(raw: RawFederatedService) -> Self {
        let (annotations, annotation_report) = parse_annotations::<ServiceAnnotations>(&raw.metadata.annotations);
        let updated = raw.metadata.update_time();

        Self {
            namespace: raw.metadata.namespace.clone().unwrap_or_default(),
            name: raw.metadata.name,
            labels: raw.metadata.labels,
            annotations,
            annotation_report,
            spec_type: raw.spec.template.spec.service_type,
            selector: raw.spec.template.spec.selector,
            clusters: raw.spec.placement.clusters.into_iter().map(|c| c.name).collect(),
            created: raw.metadata.creation_timestamp,
            updated,
        }
    }

    /// Alias when set, else the object name
    pub fn display_name(&self) -> &str {
        self.annotations.alias_name.as_deref().unwrap_or(&self.name)
    }

    pub fn app(&self) -> Option<&str> {
        self.labels.get(APP_LABEL).map(String::as_str)
    }
}

/// Editable display fields of a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub alias_name: String,
    pub description: String,
}

impl ServiceInfo {
    pub fn from_record(record: &ServiceRecord) -> Self {
        Self {
            alias_name: record.annotations.alias_name.clone().unwrap_or_default(),
            description: record.annotations.description.clone().unwrap_or_default(),
        }
    }

    /// Merge patch setting both annotations; empty values remove them
    pub fn to_patch(&self) -> Value {
        let field = |value: &str| {
            if value.is_empty() {
                Value::Null
            } else {
                Value::String(value.to_string())
            }
        };
        serde_json::json!({
            "metadata": {
                "annotations": {
                    "kubesphere.io/alias-name": field(&self.alias_name),
                    "kubesphere.io/description": field(&self.description),
                }
            }
        })
    }
}

/// Parse a single federated service payload
pub fn parse_federated_service(payload: Value) -> Result<ServiceRecord> {
    let raw: RawFederatedService = serde_json::from_value(payload)
        .map_err(|e| ConsoleError::Validation(format!("federated service: {}", e)))?;
    Ok(ServiceRecord::from_raw(raw))
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawProjectSpec {
    #[serde(default)]
    placement: RawPlacement,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawFederatedNamespace {
    #[serde(default)]
    spec: RawProjectSpec,
}

/// Member clusters a federated project is placed on
pub fn parse_project_clusters(payload: Value) -> Result<Vec<String>> {
    let raw: RawFederatedNamespace = serde_json::from_value(payload)
        .map_err(|e| ConsoleError::Validation(format!("federated namespace: {}", e)))?;
    Ok(raw.spec.placement.clusters.into_iter().map(|c| c.name).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMemberSpec {
    #[serde(default)]
    replicas: Option<u32>,
    #[serde(default)]
    selector: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMemberStatus {
    #[serde(default)]
    ready_replicas: Option<u32>,
    #[serde(default)]
    available_replicas: Option<u32>,
    #[serde(default)]
    desired_number_scheduled: Option<u32>,
    #[serde(default)]
    number_ready: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RawMember {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: RawMemberSpec,
    #[serde(default)]
    status: RawMemberStatus,
}

/// Concrete copy of a federated resource in one member cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResource {
    pub cluster: String,
    pub name: String,
    pub namespace: String,
    /// Desired replicas; `None` for resources without replicas (services)
    pub replicas: Option<u32>,
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub selector: BTreeMap<String, String>,
}

/// Parse a member cluster's copy of a service or workload.
///
/// Deployments and StatefulSets report `spec.replicas`/`status.readyReplicas`;
/// DaemonSets report `desiredNumberScheduled`/`numberReady`. Selectors come
/// from `matchLabels` (workloads) or a flat map (services).
pub fn parse_cluster_resource(cluster: &str, payload: Value) -> Result<ClusterResource> {
    let raw: RawMember = serde_json::from_value(payload)
        .map_err(|e| ConsoleError::Validation(format!("member resource in {}: {}", cluster, e)))?;

    let selector = match raw.spec.selector {
        Some(Value::Object(map)) => {
            let labels = map.get("matchLabels").cloned().unwrap_or(Value::Object(map));
            serde_json::from_value(labels).unwrap_or_default()
        }
        _ => BTreeMap::new(),
    };

    let replicas = raw.spec.replicas.or(raw.status.desired_number_scheduled);
    let ready = raw.status.ready_replicas.or(raw.status.number_ready).unwrap_or(0);

    Ok(ClusterResource {
        cluster: cluster.to_string(),
        name: raw.metadata.name,
        namespace: raw.metadata.namespace.unwrap_or_default(),
        replicas,
        ready_replicas: ready,
        available_replicas: raw.status.available_replicas.unwrap_or(ready),
        selector,
    })
}

/// Pod line in the per-cluster pod card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
    pub name: String,
    pub node: Option<String>,
    pub phase: String,
    pub ready_containers: usize,
    pub total_containers: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPodSpec {
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContainerStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPodStatus {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    container_statuses: Vec<RawContainerStatus>,
}

#[derive(Deserialize)]
struct RawPod {
    metadata: ObjectMeta,
    spec: Option<RawPodSpec>,
    status: Option<RawPodStatus>,
}

#[derive(Deserialize)]
struct RawPodList {
    #[serde(default)]
    items: Vec<RawPod>,
}

/// Parse a pod collection from one member cluster
pub fn parse_pod_list(payload: Value) -> Result<Vec<PodSummary>> {
    let list: RawPodList =
        serde_json::from_value(payload).map_err(|e| ConsoleError::Validation(format!("pod list: {}", e)))?;

    Ok(list
        .items
        .into_iter()
        .map(|pod| {
            let statuses = pod.status.as_ref().map(|s| s.container_statuses.as_slice()).unwrap_or_default();
            PodSummary {
                ready_containers: statuses.iter().filter(|c| c.ready).count(),
                total_containers: statuses.len(),
                phase: pod
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                node: pod.spec.and_then(|s| s.node_name),
                name: pod.metadata.name,
            }
        })
        .collect())
}

/// `k=v,k2=v2` label selector
pub fn label_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> Value {
        json!({
            "metadata": {
                "name": "reviews",
                "namespace": "bookinfo",
                "labels": {"app.kubernetes.io/name": "bookinfo"},
                "annotations": {
                    "kubesphere.io/serviceType": "VirtualIP",
                    "kubesphere.io/workloadName": "reviews-v1",
                    "kubesphere.io/creator": "admin"
                },
                "creationTimestamp": "2024-01-02T03:04:05Z",
                "managedFields": [
                    {"time": "2024-01-02T03:04:05Z"},
                    {"time": "2024-02-01T00:00:00Z"}
                ]
            },
            "spec": {
                "template": {"spec": {"type": "ClusterIP", "selector": {"app": "reviews"}}},
                "placement": {"clusters": [{"name": "east"}, {"name": "west"}]}
            }
        })
    }

    #[test]
    fn test_parse_service() {
        let record = parse_federated_service(service()).unwrap();

        assert_eq!(record.namespace, "bookinfo");
        assert_eq!(record.app(), Some("bookinfo"));
        assert_eq!(record.spec_type.as_deref(), Some("ClusterIP"));
        assert_eq!(record.clusters, vec!["east", "west"]);
        assert_eq!(record.annotations.workload_name.as_deref(), Some("reviews-v1"));
        assert_eq!(record.annotations.workload_module, WorkloadModule::Deployments);
        assert_eq!(record.updated.unwrap().to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_bad_workload_module_is_reported() {
        let mut payload = service();
        payload["metadata"]["annotations"]["kubesphere.io/workloadModule"] = json!("cronjobs");
        let record = parse_federated_service(payload).unwrap();

        assert_eq!(record.annotations.workload_module, WorkloadModule::Deployments);
        assert_eq!(record.annotation_report.invalid[0].0, "kubesphere.io/workloadModule");
    }

    #[test]
    fn test_parse_deployment_member() {
        let member = parse_cluster_resource(
            "east",
            json!({
                "metadata": {"name": "reviews-v1", "namespace": "bookinfo"},
                "spec": {"replicas": 3, "selector": {"matchLabels": {"app": "reviews"}}},
                "status": {"readyReplicas": 2}
            }),
        )
        .unwrap();

        assert_eq!(member.replicas, Some(3));
        assert_eq!(member.ready_replicas, 2);
        assert_eq!(member.selector.get("app").map(String::as_str), Some("reviews"));
    }

    #[test]
    fn test_parse_daemonset_member() {
        let member = parse_cluster_resource(
            "west",
            json!({
                "metadata": {"name": "agent"},
                "spec": {"selector": {"matchLabels": {"app": "agent"}}},
                "status": {"desiredNumberScheduled": 4, "numberReady": 4}
            }),
        )
        .unwrap();

        assert_eq!(member.replicas, Some(4));
        assert_eq!(member.ready_replicas, 4);
    }

    #[test]
    fn test_service_member_has_flat_selector() {
        let member = parse_cluster_resource(
            "east",
            json!({"metadata": {"name": "reviews"}, "spec": {"selector": {"app": "reviews"}}}),
        )
        .unwrap();

        assert_eq!(member.replicas, None);
        assert_eq!(member.selector.len(), 1);
    }

    #[test]
    fn test_parse_pods() {
        let pods = parse_pod_list(json!({"items": [
            {
                "metadata": {"name": "reviews-v1-abc"},
                "spec": {"nodeName": "node-a"},
                "status": {"phase": "Running", "containerStatuses": [{"ready": true}, {"ready": false}]}
            },
            {"metadata": {"name": "reviews-v1-def"}}
        ]}))
        .unwrap();

        assert_eq!(pods[0].ready_containers, 1);
        assert_eq!(pods[0].total_containers, 2);
        assert_eq!(pods[0].node.as_deref(), Some("node-a"));
        assert_eq!(pods[1].phase, "Unknown");
    }

    #[test]
    fn test_label_selector() {
        let selector: BTreeMap<String, String> =
            [("app".to_string(), "reviews".to_string()), ("tier".to_string(), "web".to_string())].into();
        assert_eq!(label_selector(&selector), "app=reviews,tier=web");
    }

    #[test]
    fn test_info_patch_clears_empty_fields() {
        let info = ServiceInfo {
            alias_name: "Reviews".to_string(),
            description: String::new(),
        };
        let patch = info.to_patch();
        let annotations = &patch["metadata"]["annotations"];

        assert_eq!(annotations["kubesphere.io/alias-name"], "Reviews");
        assert!(annotations["kubesphere.io/description"].is_null());
    }
}
