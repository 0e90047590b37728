//! Federated service detail card

use crate::context::ConsoleContext;
use crate::federated::{ClusterResource, ServiceRecord};
use crate::meta::format_time;
use std::collections::BTreeMap;

/// One labelled line in the detail sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    EditInfo,
    EditYaml,
    Delete,
}

impl ServiceOperation {
    pub const ALL: [ServiceOperation; 3] = [Self::EditInfo, Self::EditYaml, Self::Delete];

    pub fn key(&self) -> &'static str {
        match self {
            Self::EditInfo => "edit",
            Self::EditYaml => "editYaml",
            Self::Delete => "delete",
        }
    }

    pub fn permission(&self) -> &'static str {
        match self {
            Self::EditInfo | Self::EditYaml => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn enabled(ctx: &ConsoleContext) -> Vec<ServiceOperation> {
        Self::ALL
            .iter()
            .copied()
            .filter(|op| ctx.allows(op.permission()))
            .collect()
    }
}

/// Ready over desired replicas in one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaStatus {
    pub cluster: String,
    pub ready: u32,
    pub desired: u32,
    pub healthy: bool,
}

impl ReplicaStatus {
    pub fn project(resource: &ClusterResource) -> Self {
        let desired = resource.replicas.unwrap_or(0);
        Self {
            cluster: resource.cluster.clone(),
            ready: resource.ready_replicas,
            desired,
            healthy: resource.ready_replicas >= desired,
        }
    }

    pub fn text(&self) -> String {
        format!("{}/{}", self.ready, self.desired)
    }
}

/// `SERVICE_TYPE_<TYPE>` translation key, or `Custom Creation`
pub fn service_type_label(record: &ServiceRecord) -> String {
    match record.annotations.service_type.as_deref() {
        Some(kind) => format!("SERVICE_TYPE_{}", kind.to_uppercase()),
        None => "Custom Creation".to_string(),
    }
}

/// Where to go after the service is deleted
pub fn service_list_url(workspace: Option<&str>, cluster: Option<&str>, namespace: &str) -> String {
    match workspace {
        Some(workspace) => format!("/{}/federatedprojects/{}/services", workspace, namespace),
        None => format!("/clusters/{}/services", cluster.unwrap_or_default()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceView {
    pub title: String,
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
    pub operations: Vec<ServiceOperation>,
    pub list_url: String,
}

impl ServiceView {
    pub fn project(ctx: &ConsoleContext, record: &ServiceRecord) -> Self {
        let time = |t: Option<&chrono::DateTime<chrono::Utc>>| {
            t.map(|t| format_time(t, &ctx.offset)).unwrap_or_default()
        };
        let type_value = match &record.spec_type {
            Some(spec_type) => format!("{} ({})", service_type_label(record), spec_type),
            None => service_type_label(record),
        };

        let attributes = vec![
            Attribute {
                name: "Project",
                value: record.namespace.clone(),
            },
            Attribute {
                name: "Type",
                value: type_value,
            },
            Attribute {
                name: "Application",
                value: record.app().unwrap_or_default().to_string(),
            },
            Attribute {
                name: "Created Time",
                value: time(record.created.as_ref()),
            },
            Attribute {
                name: "Updated Time",
                value: time(record.updated.as_ref()),
            },
            Attribute {
                name: "Creator",
                value: record.annotations.creator.clone().unwrap_or_default(),
            },
        ];

        Self {
            title: record.display_name().to_string(),
            description: record.annotations.description.clone(),
            attributes,
            operations: ServiceOperation::enabled(ctx),
            list_url: service_list_url(ctx.workspace.as_deref(), ctx.cluster.as_deref(), &record.namespace),
        }
    }
}

/// Replica status per cluster, in cluster name order
pub fn replica_statuses(resources: &BTreeMap<String, ClusterResource>) -> Vec<ReplicaStatus> {
    resources.values().map(ReplicaStatus::project).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federated::parse_federated_service;
    use serde_json::json;

    fn record() -> ServiceRecord {
        parse_federated_service(json!({
            "metadata": {
                "name": "reviews",
                "namespace": "bookinfo",
                "labels": {"app.kubernetes.io/name": "bookinfo"},
                "annotations": {
                    "kubesphere.io/serviceType": "VirtualIP",
                    "kubesphere.io/creator": "admin",
                    "kubesphere.io/alias-name": "Reviews"
                },
                "creationTimestamp": "2024-03-01T22:30:05Z"
            },
            "spec": {"template": {"spec": {"type": "ClusterIP"}}}
        }))
        .unwrap()
    }

    #[test]
    fn test_attributes() {
        let ctx = ConsoleContext::new("admin")
            .with_workspace("demo")
            .with_offset_seconds(8 * 3600)
            .with_actions(["edit"]);
        let view = ServiceView::project(&ctx, &record());

        assert_eq!(view.title, "Reviews");
        assert_eq!(view.attributes[1].value, "SERVICE_TYPE_VIRTUALIP (ClusterIP)");
        assert_eq!(view.attributes[2].value, "bookinfo");
        assert_eq!(view.attributes[3].value, "2024-03-02 06:30:05");
        assert_eq!(view.attributes[4].value, "2024-03-02 06:30:05");
        assert_eq!(view.attributes[5].value, "admin");
        assert_eq!(view.operations, vec![ServiceOperation::EditInfo, ServiceOperation::EditYaml]);
        assert_eq!(view.list_url, "/demo/federatedprojects/bookinfo/services");
    }

    #[test]
    fn test_custom_creation() {
        let mut record = record();
        record.annotations.service_type = None;
        assert_eq!(service_type_label(&record), "Custom Creation");
    }

    #[test]
    fn test_list_url_without_workspace() {
        assert_eq!(service_list_url(None, Some("host"), "ns"), "/clusters/host/services");
    }

    #[test]
    fn test_replica_status() {
        let status = ReplicaStatus::project(&ClusterResource {
            cluster: "east".to_string(),
            name: "reviews-v1".to_string(),
            namespace: "bookinfo".to_string(),
            replicas: Some(3),
            ready_replicas: 2,
            available_replicas: 2,
            selector: BTreeMap::new(),
        });
        assert_eq!(status.text(), "2/3");
        assert!(!status.healthy);
    }
}
