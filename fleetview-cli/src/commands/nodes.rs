//! Cluster node commands

use super::{finish, finish_batch, Session};
use crate::output::{self, OutputFormat};
use crate::prompts::{self, TaintPrompt};
use crate::NodeCommands;
use anyhow::Result;
use fleetview_common::controller::NodesController;
use fleetview_common::view::{NodeRow, UsageCell};
use fleetview_common::ListQuery;
use serde::Serialize;
use std::rc::Rc;
use tabled::Tabled;

/// Upper bound when a command needs every node's taints
const ALL_NODES: u32 = 500;

#[derive(Tabled, Serialize)]
struct NodeLine {
    name: String,
    ip: String,
    status: String,
    roles: String,
    cpu: String,
    memory: String,
    pods: String,
    taints: String,
}

fn usage(cell: &UsageCell) -> String {
    let mark = if cell.warning_icon { " !" } else { "" };
    format!("{} ({}){}", cell.utilization.label(), cell.detail, mark)
}

impl From<NodeRow> for NodeLine {
    fn from(row: NodeRow) -> Self {
        Self {
            cpu: usage(&row.cpu),
            memory: usage(&row.memory),
            pods: usage(&row.pods),
            taints: row
                .taints
                .map(|badge| output::truncate(&badge.lines.join(", "), 40))
                .unwrap_or_default(),
            status: row.status.as_str().to_string(),
            ip: row.ip.unwrap_or_default(),
            name: row.name,
            roles: row.roles,
        }
    }
}

pub async fn handle_node_command(command: NodeCommands, session: &Session, cluster: &str) -> Result<()> {
    let ctx = session.context(None, Some(cluster));
    let collaborators = session.collaborators();
    let taint_form = match &command {
        NodeCommands::Taint { add, remove, clear, .. } => Rc::new(TaintPrompt {
            add: add.clone(),
            remove: remove.clone(),
            clear: *clear,
            interactive: prompts::interactive(),
        }),
        _ => Rc::new(TaintPrompt {
            add: Vec::new(),
            remove: Vec::new(),
            clear: false,
            interactive: false,
        }),
    };
    let page = NodesController::new(ctx, cluster, session.api.clone(), collaborators, taint_form);

    match command {
        NodeCommands::List {
            search,
            status,
            page: number,
            limit,
        } => {
            let mut query = ListQuery::page(number, limit.unwrap_or(session.config.page_size));
            if let Some(search) = &search {
                query = query.with_filter("name", search);
            }
            if let Some(status) = &status {
                query = query.with_filter("status", status);
            }

            output::with_spinner("Loading nodes...", async {
                page.load(query).await;
                page.load_counts().await;
            })
            .await;

            let state = page.state();
            if let Some(error) = state.list.error {
                anyhow::bail!("Could not list nodes in {}: {}", cluster, error);
            }
            if state.metrics_error.is_some() {
                output::print_warning("Monitoring data is unavailable; usage is shown as 0");
            }

            let lines: Vec<NodeLine> = page.rows().into_iter().map(NodeLine::from).collect();
            output::print_output(lines, session.format)?;
            if session.format == OutputFormat::Table {
                let overview = page.overview();
                println!(
                    "Nodes: {}  Masters: {}  Workers: {}  (page {}/{})",
                    overview.total,
                    overview.masters,
                    overview.workers,
                    number,
                    state.list.total_pages().max(1)
                );
            }
        }
        NodeCommands::Cordon { node } => {
            finish(page.cordon(&node).await)?;
        }
        NodeCommands::Uncordon { node } => {
            finish(page.uncordon(&node).await)?;
        }
        NodeCommands::Delete { mut nodes } => {
            if nodes.len() == 1 {
                let node = nodes.remove(0);
                finish(page.delete(&node).await)?;
            } else {
                finish_batch(page.batch_delete(nodes).await)?;
            }
        }
        NodeCommands::Taint { nodes, .. } => {
            // The form starts from the taints the nodes already share
            output::with_spinner("Loading nodes...", page.load(ListQuery::page(1, ALL_NODES))).await;
            if let Some(error) = page.state().list.error {
                anyhow::bail!("Could not list nodes in {}: {}", cluster, error);
            }
            finish_batch(page.batch_taint(nodes).await)?;
        }
    }
    Ok(())
}
