//! Subcommand handlers
//!
//! Each handler builds the page controller the browser console uses and
//! drives it with terminal collaborators.

pub mod config;
pub mod nodes;
pub mod pipelines;
pub mod service;

use crate::api::{ApiClient, HttpTransport};
use crate::config::Config;
use crate::output::OutputFormat;
use crate::prompts;
use anyhow::Result;
use fleetview_common::action::{ActionOutcome, BatchReport};
use fleetview_common::api::RestClient;
use fleetview_common::controller::Collaborators;
use fleetview_common::ConsoleContext;
use std::fmt;
use std::rc::Rc;

/// Settings resolved from the config file and global flags
pub struct Session {
    pub config: Config,
    pub format: OutputFormat,
    pub assume_yes: bool,
    pub api: Rc<ApiClient>,
}

impl Session {
    pub fn new(
        config: Config,
        server: &str,
        token: Option<String>,
        format: OutputFormat,
        assume_yes: bool,
    ) -> Result<Self> {
        let transport = HttpTransport::new(server, token)?;
        Ok(Self {
            config,
            format,
            assume_yes,
            api: Rc::new(RestClient::new(transport)),
        })
    }

    pub fn server(&self) -> &str {
        self.api.transport().base_url()
    }

    pub fn context(&self, workspace: Option<&str>, cluster: Option<&str>) -> ConsoleContext {
        let offset = chrono::Local::now().offset().local_minus_utc();
        let mut ctx = ConsoleContext::new(&self.config.username)
            .with_actions(self.config.enabled_actions.iter().cloned())
            .with_offset_seconds(offset);
        if let Some(workspace) = workspace {
            ctx = ctx.with_workspace(workspace);
        }
        if let Some(cluster) = cluster {
            ctx = ctx.with_cluster(cluster);
        }
        ctx
    }

    pub fn collaborators(&self) -> Collaborators {
        prompts::collaborators(self.server(), self.assume_yes)
    }
}

/// Failure already shown to the user by the notifier
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action failed")
    }
}

impl std::error::Error for Reported {}

/// Exit status of a single action
pub fn finish<T>(outcome: ActionOutcome<T>) -> Result<Option<T>> {
    match outcome {
        ActionOutcome::Succeeded(value) => Ok(Some(value)),
        ActionOutcome::Cancelled => {
            crate::output::print_info("Cancelled");
            Ok(None)
        }
        ActionOutcome::Busy => anyhow::bail!("another action is in progress"),
        ActionOutcome::Failed(_) => Err(Reported.into()),
    }
}

/// A batch with any failed item exits non-zero
pub fn finish_batch(outcome: ActionOutcome<BatchReport>) -> Result<()> {
    match finish(outcome)? {
        Some(report) if !report.all_succeeded() => Err(Reported.into()),
        _ => Ok(()),
    }
}
