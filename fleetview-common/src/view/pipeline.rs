//! Pipeline list rows

use crate::context::ConsoleContext;
use crate::pipeline::{activity_path, detail_path, HealthLevel, PipelineRecord, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineAction {
    Run,
    Activity,
    Edit,
    Delete,
}

impl PipelineAction {
    pub const ALL: [PipelineAction; 4] = [Self::Run, Self::Activity, Self::Edit, Self::Delete];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Activity => "activity",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn permission(&self) -> &'static str {
        match self {
            Self::Run | Self::Edit => "edit",
            Self::Activity => "view",
            Self::Delete => "delete",
        }
    }

    /// Menu entries the user may see; the menu is hidden when empty
    pub fn enabled(ctx: &ConsoleContext) -> Vec<PipelineAction> {
        Self::ALL
            .iter()
            .copied()
            .filter(|a| ctx.allows(a.permission()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatusCell {
    /// Multibranch pipelines count green branches
    Branches { successful: u32 },
    Run(RunStatus),
}

impl PipelineStatusCell {
    pub fn text(&self) -> String {
        match self {
            Self::Branches { successful } => format!("{} branch success", successful),
            Self::Run(status) => status.label_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRow {
    pub name: String,
    pub key: String,
    /// Activity view for multibranch pipelines, detail view otherwise
    pub link: String,
    pub status: PipelineStatusCell,
    pub health: HealthLevel,
    pub branches: String,
    pub pull_requests: String,
    pub actions: Vec<PipelineAction>,
}

fn count_or_dash(count: Option<u32>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

impl PipelineRow {
    /// `prefix` is the pipeline list path, e.g.
    /// `/ws/clusters/host/devops/proj-x1/pipelines`
    pub fn project(ctx: &ConsoleContext, prefix: &str, record: &PipelineRecord) -> Self {
        let link = if record.number_of_failing_branches.is_some() {
            activity_path(prefix, &record.name, None)
        } else {
            detail_path(prefix, &record.name)
        };

        let status = match record.number_of_successful_branches {
            Some(successful) => PipelineStatusCell::Branches { successful },
            None => PipelineStatusCell::Run(record.run_status()),
        };

        Self {
            name: record.name.clone(),
            key: record.key().to_string(),
            link,
            status,
            health: record.health(),
            branches: count_or_dash(record.total_number_of_branches),
            pull_requests: count_or_dash(record.total_number_of_pull_requests),
            actions: PipelineAction::enabled(ctx),
        }
    }
}
