//! DevOps pipeline commands

use super::{finish, finish_batch, Session};
use crate::output;
use crate::prompts::{self, PresetForm, RunPrompt};
use crate::{ConfigFlags, PipelineCommands};
use anyhow::Result;
use fleetview_common::controller::{PipelinesController, RunForm};
use fleetview_common::meta::Scope;
use fleetview_common::pipeline::{Discarder, PipelineConfig};
use fleetview_common::view::{PipelineRow, PipelineStatusCell};
use fleetview_common::ListQuery;
use serde::Serialize;
use std::rc::Rc;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct PipelineLine {
    name: String,
    status: String,
    health: String,
    branches: String,
    pull_requests: String,
}

impl From<PipelineRow> for PipelineLine {
    fn from(row: PipelineRow) -> Self {
        let status = match &row.status {
            PipelineStatusCell::Run(run) => run.as_str().to_string(),
            branches => branches.text(),
        };
        Self {
            name: row.name,
            status,
            health: row.health.as_str().to_string(),
            branches: row.branches,
            pull_requests: row.pull_requests,
        }
    }
}

impl ConfigFlags {
    /// Overwrite the settings given on the command line
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(description) = &self.description {
            config.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if self.no_discarder {
            config.enable_discarder = false;
        } else if self.days_to_keep.is_some() || self.num_to_keep.is_some() {
            config.enable_discarder = true;
        }
        if config.enable_discarder {
            let discarder = config.discarder.get_or_insert_with(|| Discarder {
                days_to_keep: "7".to_string(),
                num_to_keep: "10".to_string(),
            });
            if let Some(days) = &self.days_to_keep {
                discarder.days_to_keep = days.clone();
            }
            if let Some(num) = &self.num_to_keep {
                discarder.num_to_keep = num.clone();
            }
        }
        if self.no_timer {
            config.enable_timer_trigger = false;
        } else if let Some(cron) = &self.cron {
            config.enable_timer_trigger = true;
            config.timer_trigger = Some(cron.clone());
        }
    }
}

pub async fn handle_pipeline_command(
    command: PipelineCommands,
    session: &Session,
    workspace: &str,
    cluster: &str,
    devops: &str,
) -> Result<()> {
    let ctx = session.context(Some(workspace), Some(cluster));
    let collaborators = session.collaborators();
    let scope = Scope::namespaced(Some(workspace), Some(cluster), devops);

    let run_form: Rc<dyn fleetview_common::action::FormModal<RunForm>> = match &command {
        PipelineCommands::Run { branch, params, .. } => Rc::new(RunPrompt {
            api: session.api.clone(),
            scope,
            branch: branch.clone(),
            params: params.clone(),
            interactive: prompts::interactive(),
        }),
        _ => PresetForm::<RunForm>::accept(),
    };
    let config_form: Rc<PresetForm<PipelineConfig>> = match &command {
        PipelineCommands::Create { name, flags } => {
            let (name, flags) = (name.clone(), flags.clone());
            PresetForm::new(move |mut config: PipelineConfig| {
                config.name = name.clone();
                flags.apply(&mut config);
                Some(config)
            })
        }
        PipelineCommands::Edit { flags, .. } => {
            let flags = flags.clone();
            PresetForm::new(move |mut config: PipelineConfig| {
                flags.apply(&mut config);
                Some(config)
            })
        }
        _ => PresetForm::accept(),
    };
    let page = PipelinesController::new(ctx, devops, session.api.clone(), collaborators, run_form, config_form);

    match command {
        PipelineCommands::List {
            search,
            status,
            page: number,
        } => {
            let mut query = ListQuery::page(number, session.config.page_size);
            if let Some(search) = &search {
                query = query.with_filter("name", search);
            }
            if let Some(status) = &status {
                query = query.with_filter("status", status);
            }
            output::with_spinner("Loading pipelines...", page.load(query)).await;

            let state = page.state();
            if let Some(error) = state.list.error {
                anyhow::bail!("Could not list pipelines in {}: {}", devops, error);
            }
            if page.is_empty_state() {
                output::print_info(&format!("No pipelines in {} yet", devops));
                if page.can_create() {
                    output::print_info("Create one with `fleetview pipelines create <NAME>`");
                }
                return Ok(());
            }
            let lines: Vec<PipelineLine> = page.rows().into_iter().map(PipelineLine::from).collect();
            output::print_output(lines, session.format)?;
        }
        PipelineCommands::Run { name, .. } => {
            // Branches and parameters come from the listed record
            output::with_spinner(
                "Loading pipeline...",
                page.load(ListQuery::page(1, session.config.page_size).with_filter("name", &name)),
            )
            .await;
            finish(page.run(&name).await)?;
        }
        PipelineCommands::Activity { name } => page.activity(&name),
        PipelineCommands::Create { .. } => {
            finish(page.create().await)?;
        }
        PipelineCommands::Edit { name, .. } => {
            finish(page.edit(&name).await)?;
        }
        PipelineCommands::Delete { mut names } => {
            if names.len() == 1 {
                let name = names.remove(0);
                finish(page.delete(&name).await)?;
            } else {
                finish_batch(page.batch_delete(names).await)?;
            }
        }
    }
    Ok(())
}
