//! Remote API
//!
//! The console talks to three API families: the platform's aggregated
//! resource API (`/kapis`), the Kubernetes core and group APIs (`/api`,
//! `/apis`) and the monitoring API. Pages depend on the narrow traits below;
//! [`RestClient`] implements all of them on top of any [`Transport`], which
//! is the only piece that differs between the browser and the terminal.

use crate::error::{ConsoleError, Result};
use crate::federated::{
    label_selector, parse_cluster_resource, parse_federated_service, parse_pod_list, parse_project_clusters,
    ClusterResource, PodSummary, ServiceRecord, WorkloadModule,
};
use crate::list::{ListQuery, Page};
use crate::meta::Scope;
use crate::metrics::{MetricQuery, MetricResponse};
use crate::node::{parse_node_list, NodeCounts, NodeRecord, Taint, ROLE_LABEL_PREFIX};
use crate::pipeline::{parse_pipeline_list, PipelineConfig, PipelineParameter, PipelineRecord, RunRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One HTTP call, independent of the client library
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path, e.g. `/api/clusters/host/v1/nodes/node-1`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: String, body: Option<Value>) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: String) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: String, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn put(path: String, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn patch(path: String, body: Value) -> Self {
        Self::new(Method::Patch, path, Some(body))
    }

    pub fn delete(path: String) -> Self {
        Self::new(Method::Delete, path, None)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn content_type(&self) -> &'static str {
        match self.method {
            Method::Patch => "application/merge-patch+json",
            _ => "application/json",
        }
    }

    /// Full URL under `root` (no trailing slash expected)
    pub fn url(&self, root: &str) -> String {
        let mut url = format!("{}{}", root.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&crate::list::encode_pairs(&self.query));
        }
        url
    }
}

/// Sends requests and returns the decoded JSON body (`Null` when empty).
///
/// Implementations map non-2xx answers to [`ConsoleError::Http`] and
/// transport failures to [`ConsoleError::Network`].
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

#[async_trait(?Send)]
pub trait NodeApi {
    async fn list_nodes(&self, cluster: &str, query: &ListQuery) -> Result<Page<NodeRecord>>;
    async fn node_metrics(&self, cluster: &str, query: &MetricQuery) -> Result<MetricResponse>;
    async fn node_counts(&self, cluster: &str) -> Result<NodeCounts>;
    async fn cordon(&self, cluster: &str, node: &str) -> Result<()>;
    async fn uncordon(&self, cluster: &str, node: &str) -> Result<()>;
    async fn delete_node(&self, cluster: &str, node: &str) -> Result<()>;
    /// Replace the node's taints with `taints`
    async fn set_taints(&self, cluster: &str, node: &str, taints: &[Taint]) -> Result<()>;
}

/// `scope.namespace` is the DevOps project
#[async_trait(?Send)]
pub trait PipelineApi {
    async fn list_pipelines(&self, scope: &Scope, query: &ListQuery) -> Result<Page<PipelineRecord>>;
    async fn run_pipeline(&self, scope: &Scope, name: &str, request: &RunRequest) -> Result<()>;
    async fn branch_parameters(&self, scope: &Scope, name: &str, branch: &str) -> Result<Vec<PipelineParameter>>;
    async fn delete_pipeline(&self, scope: &Scope, name: &str) -> Result<()>;
    async fn pipeline_config(&self, scope: &Scope, name: &str) -> Result<PipelineConfig>;
    /// Returns the name the server assigned
    async fn create_pipeline(&self, scope: &Scope, config: &PipelineConfig) -> Result<String>;
    async fn update_pipeline(&self, scope: &Scope, config: &PipelineConfig) -> Result<()>;
}

/// `scope.namespace` is the federated project
#[async_trait(?Send)]
pub trait FederatedApi {
    async fn service(&self, scope: &Scope, name: &str) -> Result<ServiceRecord>;
    async fn service_raw(&self, scope: &Scope, name: &str) -> Result<Value>;
    async fn patch_service(&self, scope: &Scope, name: &str, patch: &Value) -> Result<()>;
    async fn replace_service(&self, scope: &Scope, name: &str, object: &Value) -> Result<()>;
    async fn delete_service(&self, scope: &Scope, name: &str) -> Result<()>;
    /// Member clusters of the federated project `namespace`
    async fn project_clusters(&self, namespace: &str) -> Result<Vec<String>>;
    /// The service's copy in one member cluster
    async fn cluster_service(&self, cluster: &str, namespace: &str, name: &str) -> Result<ClusterResource>;
    async fn cluster_workload(
        &self,
        cluster: &str,
        namespace: &str,
        module: WorkloadModule,
        name: &str,
    ) -> Result<ClusterResource>;
    async fn cluster_pods(&self, cluster: &str, namespace: &str, resource: &ClusterResource) -> Result<Vec<PodSummary>>;
}

/// REST implementation of the page APIs
pub struct RestClient<T> {
    transport: T,
}

impl<T: Transport> RestClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send_unit(&self, request: ApiRequest) -> Result<()> {
        self.transport.send(request).await.map(|_| ())
    }
}

fn core_path(cluster: &str) -> String {
    format!("/api{}/v1", Scope::cluster(cluster).cluster_prefix())
}

fn node_path(cluster: &str, node: &str) -> String {
    format!("{}/nodes/{}", core_path(cluster), urlencoding::encode(node))
}

fn resources_path(cluster: &str) -> String {
    format!("/kapis{}/resources.kubesphere.io/v1alpha3", Scope::cluster(cluster).cluster_prefix())
}

fn devops_path(scope: &Scope, version: &str) -> String {
    format!(
        "/kapis{}/devops.kubesphere.io/{}/devops/{}/pipelines",
        scope.cluster_prefix(),
        version,
        scope.namespace.as_deref().unwrap_or_default()
    )
}

fn pipeline_path(scope: &Scope, version: &str, name: &str) -> String {
    format!("{}/{}", devops_path(scope, version), urlencoding::encode(name))
}

fn federated_service_path(scope: &Scope, name: &str) -> String {
    format!(
        "/apis/types.kubefed.io/v1beta1/namespaces/{}/federatedservices/{}",
        scope.namespace.as_deref().unwrap_or_default(),
        urlencoding::encode(name)
    )
}

fn pipeline_object(scope: &Scope, config: &PipelineConfig) -> Value {
    json!({
        "apiVersion": "devops.kubesphere.io/v1alpha3",
        "kind": "Pipeline",
        "metadata": {
            "name": config.name,
            "namespace": scope.namespace,
        },
        "spec": {
            "type": "pipeline",
            "pipeline": config,
        }
    })
}

#[async_trait(?Send)]
impl<T: Transport> NodeApi for RestClient<T> {
    async fn list_nodes(&self, cluster: &str, query: &ListQuery) -> Result<Page<NodeRecord>> {
        let request = ApiRequest::get(format!("{}/nodes", resources_path(cluster))).with_query(query.to_pairs());
        parse_node_list(self.transport.send(request).await?)
    }

    async fn node_metrics(&self, cluster: &str, query: &MetricQuery) -> Result<MetricResponse> {
        let request = ApiRequest::get(format!(
            "/kapis{}/monitoring.kubesphere.io/v1alpha3/nodes",
            Scope::cluster(cluster).cluster_prefix()
        ))
        .with_query(query.to_pairs());
        let payload = self.transport.send(request).await?;
        serde_json::from_value(payload).map_err(|e| ConsoleError::Validation(format!("node metrics: {}", e)))
    }

    async fn node_counts(&self, cluster: &str) -> Result<NodeCounts> {
        let master = format!("{}master", ROLE_LABEL_PREFIX);
        let worker = format!("{}worker", ROLE_LABEL_PREFIX);

        let count = |selector: String| {
            let query = ListQuery::page(1, 1).with_filter("labelSelector", &selector);
            async move { self.list_nodes(cluster, &query).await.map(|page| page.total) }
        };
        let (masters, master_workers) =
            futures::future::try_join(count(master.clone()), count(format!("{},{}", master, worker))).await?;

        Ok(NodeCounts {
            masters,
            master_workers,
        })
    }

    async fn cordon(&self, cluster: &str, node: &str) -> Result<()> {
        self.send_unit(ApiRequest::patch(node_path(cluster, node), json!({"spec": {"unschedulable": true}})))
            .await
    }

    async fn uncordon(&self, cluster: &str, node: &str) -> Result<()> {
        self.send_unit(ApiRequest::patch(node_path(cluster, node), json!({"spec": {"unschedulable": null}})))
            .await
    }

    async fn delete_node(&self, cluster: &str, node: &str) -> Result<()> {
        self.send_unit(ApiRequest::delete(node_path(cluster, node))).await
    }

    async fn set_taints(&self, cluster: &str, node: &str, taints: &[Taint]) -> Result<()> {
        self.send_unit(ApiRequest::patch(node_path(cluster, node), json!({"spec": {"taints": taints}})))
            .await
    }
}

#[derive(Deserialize)]
struct BranchDetail {
    #[serde(default)]
    parameters: Vec<PipelineParameter>,
}

#[derive(Deserialize)]
struct PipelineObject {
    metadata: crate::meta::ObjectMeta,
    #[serde(default)]
    spec: PipelineObjectSpec,
}

#[derive(Default, Deserialize)]
struct PipelineObjectSpec {
    #[serde(default)]
    pipeline: Option<PipelineConfig>,
}

#[async_trait(?Send)]
impl<T: Transport> PipelineApi for RestClient<T> {
    async fn list_pipelines(&self, scope: &Scope, query: &ListQuery) -> Result<Page<PipelineRecord>> {
        let request = ApiRequest::get(devops_path(scope, "v1alpha3")).with_query(query.to_pairs());
        parse_pipeline_list(self.transport.send(request).await?)
    }

    async fn run_pipeline(&self, scope: &Scope, name: &str, request: &RunRequest) -> Result<()> {
        let base = pipeline_path(scope, "v1alpha2", name);
        let path = match &request.branch {
            Some(branch) => format!("{}/branches/{}/runs", base, urlencoding::encode(branch)),
            None => format!("{}/runs", base),
        };
        self.send_unit(ApiRequest::post(path, json!({ "parameters": request.parameters })))
            .await
    }

    async fn branch_parameters(&self, scope: &Scope, name: &str, branch: &str) -> Result<Vec<PipelineParameter>> {
        let path = format!(
            "{}/branches/{}",
            pipeline_path(scope, "v1alpha2", name),
            urlencoding::encode(branch)
        );
        let detail: BranchDetail = serde_json::from_value(self.transport.send(ApiRequest::get(path)).await?)?;
        Ok(detail.parameters)
    }

    async fn delete_pipeline(&self, scope: &Scope, name: &str) -> Result<()> {
        self.send_unit(ApiRequest::delete(pipeline_path(scope, "v1alpha3", name)))
            .await
    }

    async fn pipeline_config(&self, scope: &Scope, name: &str) -> Result<PipelineConfig> {
        let payload = self
            .transport
            .send(ApiRequest::get(pipeline_path(scope, "v1alpha3", name)))
            .await?;
        let object: PipelineObject = serde_json::from_value(payload)?;
        let mut config = object.spec.pipeline.unwrap_or_default();
        config.name = object.metadata.name;
        Ok(config)
    }

    async fn create_pipeline(&self, scope: &Scope, config: &PipelineConfig) -> Result<String> {
        let payload = self
            .transport
            .send(ApiRequest::post(devops_path(scope, "v1alpha3"), pipeline_object(scope, config)))
            .await?;
        let created = serde_json::from_value::<PipelineObject>(payload)
            .map(|object| object.metadata.name)
            .unwrap_or_else(|_| config.name.clone());
        Ok(created)
    }

    async fn update_pipeline(&self, scope: &Scope, config: &PipelineConfig) -> Result<()> {
        self.send_unit(ApiRequest::put(
            pipeline_path(scope, "v1alpha3", &config.name),
            pipeline_object(scope, config),
        ))
        .await
    }
}

#[async_trait(?Send)]
impl<T: Transport> FederatedApi for RestClient<T> {
    async fn service(&self, scope: &Scope, name: &str) -> Result<ServiceRecord> {
        parse_federated_service(self.service_raw(scope, name).await?)
    }

    async fn service_raw(&self, scope: &Scope, name: &str) -> Result<Value> {
        self.transport
            .send(ApiRequest::get(federated_service_path(scope, name)))
            .await
    }

    async fn patch_service(&self, scope: &Scope, name: &str, patch: &Value) -> Result<()> {
        self.send_unit(ApiRequest::patch(federated_service_path(scope, name), patch.clone()))
            .await
    }

    async fn replace_service(&self, scope: &Scope, name: &str, object: &Value) -> Result<()> {
        self.send_unit(ApiRequest::put(federated_service_path(scope, name), object.clone()))
            .await
    }

    async fn delete_service(&self, scope: &Scope, name: &str) -> Result<()> {
        self.send_unit(ApiRequest::delete(federated_service_path(scope, name)))
            .await
    }

    async fn project_clusters(&self, namespace: &str) -> Result<Vec<String>> {
        let namespace = urlencoding::encode(namespace);
        let path = format!(
            "/apis/types.kubefed.io/v1beta1/namespaces/{}/federatednamespaces/{}",
            namespace, namespace
        );
        parse_project_clusters(self.transport.send(ApiRequest::get(path)).await?)
    }

    async fn cluster_service(&self, cluster: &str, namespace: &str, name: &str) -> Result<ClusterResource> {
        let path = format!(
            "{}/namespaces/{}/services/{}",
            core_path(cluster),
            namespace,
            urlencoding::encode(name)
        );
        parse_cluster_resource(cluster, self.transport.send(ApiRequest::get(path)).await?)
    }

    async fn cluster_workload(
        &self,
        cluster: &str,
        namespace: &str,
        module: WorkloadModule,
        name: &str,
    ) -> Result<ClusterResource> {
        let path = format!(
            "/apis{}/apps/v1/namespaces/{}/{}/{}",
            Scope::cluster(cluster).cluster_prefix(),
            namespace,
            module,
            urlencoding::encode(name)
        );
        parse_cluster_resource(cluster, self.transport.send(ApiRequest::get(path)).await?)
    }

    async fn cluster_pods(&self, cluster: &str, namespace: &str, resource: &ClusterResource) -> Result<Vec<PodSummary>> {
        if resource.selector.is_empty() {
            return Ok(Vec::new());
        }
        let request = ApiRequest::get(format!("{}/namespaces/{}/pods", core_path(cluster), namespace))
            .with_query(vec![("labelSelector".to_string(), label_selector(&resource.selector))]);
        parse_pod_list(self.transport.send(request).await?)
    }
}
