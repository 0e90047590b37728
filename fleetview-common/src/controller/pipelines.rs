//! DevOps pipeline list page

use super::Collaborators;
use crate::action::{ActionDispatcher, ActionOutcome, BatchReport, Confirmation, FormModal};
use crate::api::PipelineApi;
use crate::context::ConsoleContext;
use crate::error::Result;
use crate::list::{ListQuery, Page};
use crate::meta::Scope;
use crate::pipeline::{activity_path, detail_path, PipelineConfig, PipelineParameter, PipelineRecord, RunRequest};
use crate::store::{Aggregator, ListSource, PageState};
use crate::view::PipelineRow;
use async_trait::async_trait;
use std::rc::Rc;

pub struct PipelineSource {
    api: Rc<dyn PipelineApi>,
    scope: Scope,
}

impl PipelineSource {
    pub fn new(api: Rc<dyn PipelineApi>, scope: Scope) -> Self {
        Self { api, scope }
    }
}

#[async_trait(?Send)]
impl ListSource<PipelineRecord> for PipelineSource {
    async fn fetch_list(&self, query: &ListQuery) -> Result<Page<PipelineRecord>> {
        self.api.list_pipelines(&self.scope, query).await
    }
}

/// Run form: branch choice plus parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct RunForm {
    pub pipeline: String,
    pub branches: Vec<String>,
    pub parameters: Vec<PipelineParameter>,
    pub request: RunRequest,
}

pub struct PipelinesController {
    ctx: ConsoleContext,
    scope: Scope,
    prefix: String,
    api: Rc<dyn PipelineApi>,
    aggregator: Aggregator<PipelineRecord>,
    dispatcher: ActionDispatcher,
    collaborators: Collaborators,
    run_form: Rc<dyn FormModal<RunForm>>,
    config_form: Rc<dyn FormModal<PipelineConfig>>,
}

/// `/<workspace>/clusters/<cluster>/devops/<devops>/pipelines`
pub fn pipelines_prefix(workspace: &str, cluster: &str, devops: &str) -> String {
    format!("/{}/clusters/{}/devops/{}/pipelines", workspace, cluster, devops)
}

impl PipelinesController {
    /// `ctx.workspace` and `ctx.cluster` locate the DevOps project `devops`
    pub fn new(
        ctx: ConsoleContext,
        devops: &str,
        api: Rc<dyn PipelineApi>,
        collaborators: Collaborators,
        run_form: Rc<dyn FormModal<RunForm>>,
        config_form: Rc<dyn FormModal<PipelineConfig>>,
    ) -> Self {
        let scope = Scope::namespaced(ctx.workspace.as_deref(), ctx.cluster.as_deref(), devops);
        let prefix = pipelines_prefix(
            ctx.workspace.as_deref().unwrap_or_default(),
            ctx.cluster.as_deref().unwrap_or_default(),
            devops,
        );
        let source = Rc::new(PipelineSource::new(api.clone(), scope.clone()));

        Self {
            ctx,
            scope,
            prefix,
            api,
            aggregator: Aggregator::new("pipelines", source),
            dispatcher: ActionDispatcher::new(collaborators.confirmer.clone(), collaborators.notifier.clone()),
            collaborators,
            run_form,
            config_form,
        }
    }

    pub fn aggregator(&self) -> &Aggregator<PipelineRecord> {
        &self.aggregator
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn state(&self) -> PageState<PipelineRecord> {
        self.aggregator.state()
    }

    pub async fn load(&self, query: ListQuery) {
        self.aggregator.load(query).await;
    }

    pub async fn refresh(&self) {
        self.aggregator.refresh().await;
    }

    pub fn rows(&self) -> Vec<PipelineRow> {
        self.aggregator
            .state()
            .list
            .items
            .iter()
            .map(|record| PipelineRow::project(&self.ctx, &self.prefix, record))
            .collect()
    }

    pub fn is_empty_state(&self) -> bool {
        self.aggregator.state().list.is_empty_state()
    }

    pub fn can_create(&self) -> bool {
        self.ctx.allows("create")
    }

    fn record(&self, name: &str) -> Option<PipelineRecord> {
        self.aggregator
            .state()
            .list
            .items
            .into_iter()
            .find(|record| record.name == name)
    }

    /// Parameters defined on one branch, for the run form's branch picker
    pub async fn branch_parameters(&self, name: &str, branch: &str) -> Result<Vec<PipelineParameter>> {
        self.api.branch_parameters(&self.scope, name, branch).await
    }

    /// Run `name`, asking for branch and parameters when it has any, then
    /// open its activity view
    pub async fn run(&self, name: &str) -> ActionOutcome {
        let record = self.record(name).unwrap_or_else(|| PipelineRecord {
            name: name.to_string(),
            ..Default::default()
        });

        let request = if record.needs_run_form() {
            let branch = record.branch_names.first().cloned();
            let form = RunForm {
                pipeline: record.name.clone(),
                branches: record.branch_names.clone(),
                parameters: record.parameters.clone(),
                request: RunRequest::defaults(&record, branch),
            };
            match self.run_form.show(form).await {
                Some(form) => form.request,
                None => return ActionOutcome::Cancelled,
            }
        } else {
            RunRequest::default()
        };

        let outcome = self
            .dispatcher
            .submit("Run", name, None, || self.api.run_pipeline(&self.scope, name, &request))
            .await;
        if outcome.is_success() {
            self.collaborators
                .navigator
                .navigate(&activity_path(&self.prefix, name, request.branch.as_deref()));
        }
        outcome
    }

    pub fn activity(&self, name: &str) {
        self.collaborators
            .navigator
            .navigate(&activity_path(&self.prefix, name, None));
    }

    /// Edit the pipeline's configuration and refetch the list
    pub async fn edit(&self, name: &str) -> ActionOutcome {
        let config = match self.api.pipeline_config(&self.scope, name).await {
            Ok(config) => config,
            Err(err) => return ActionOutcome::Failed(self.collaborators.report(name, err)),
        };
        let Some(config) = self.config_form.show(config).await else {
            return ActionOutcome::Cancelled;
        };

        let outcome = self
            .dispatcher
            .submit("Edit", name, None, || self.api.update_pipeline(&self.scope, &config))
            .await;
        if outcome.is_success() {
            self.refresh().await;
        }
        outcome
    }

    /// Create a pipeline from the form template, then open it
    pub async fn create(&self) -> ActionOutcome<String> {
        let template = PipelineConfig::template(
            self.scope.namespace.as_deref().unwrap_or_default(),
            self.scope.cluster.as_deref().unwrap_or_default(),
        );
        let Some(config) = self.config_form.show(template).await else {
            return ActionOutcome::Cancelled;
        };

        let outcome = self
            .dispatcher
            .submit("Create", &config.name, None, || self.api.create_pipeline(&self.scope, &config))
            .await;
        if let ActionOutcome::Succeeded(created) = &outcome {
            self.collaborators
                .navigator
                .navigate(&detail_path(&self.prefix, created));
        }
        outcome
    }

    pub async fn delete(&self, name: &str) -> ActionOutcome {
        let confirmation = Confirmation::delete("Pipeline", &[name.to_string()]);
        let outcome = self
            .dispatcher
            .submit("Delete", name, Some(confirmation), || self.api.delete_pipeline(&self.scope, name))
            .await;
        if outcome.is_success() {
            self.refresh().await;
        }
        outcome
    }

    pub async fn batch_delete(&self, names: Vec<String>) -> ActionOutcome<BatchReport> {
        let confirmation = Confirmation::delete("Pipeline", &names);
        let outcome = self
            .dispatcher
            .submit_batch("Delete", names, Some(confirmation), |name| async move {
                self.api.delete_pipeline(&self.scope, &name).await
            })
            .await;
        if outcome.is_success() {
            self.refresh().await;
        }
        outcome
    }

    pub fn dispose(&self) {
        self.aggregator.dispose();
    }
}
