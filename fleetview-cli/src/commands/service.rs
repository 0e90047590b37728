//! Federated service commands

use super::{finish, Session};
use crate::output::{self, OutputFormat};
use crate::prompts::{self, PresetForm, YamlPrompt};
use crate::ServiceCommands;
use anyhow::Result;
use fleetview_common::controller::{DetailState, ResourceMode, ServiceDetailController};
use fleetview_common::federated::ServiceInfo;
use fleetview_common::view::{ReplicaStatus, ServiceView};
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct AttributeLine {
    attribute: String,
    value: String,
}

#[derive(Tabled, Serialize)]
struct PodLine {
    cluster: String,
    pod: String,
    node: String,
    phase: String,
    ready: String,
}

#[derive(Serialize)]
struct ClusterReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    replicas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    healthy: Option<bool>,
    pods: Vec<PodLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ServiceReport {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    attributes: BTreeMap<String, String>,
    clusters: BTreeMap<String, ClusterReport>,
}

fn cluster_reports(state: &DetailState) -> BTreeMap<String, ClusterReport> {
    let workload_mode = matches!(state.resource_mode(), ResourceMode::Workload { .. });
    state
        .clusters
        .iter()
        .map(|cluster| {
            let status = state
                .workloads
                .get(cluster)
                .filter(|_| workload_mode)
                .map(ReplicaStatus::project);
            let pods = state
                .pods
                .get(cluster)
                .map(|pods| {
                    pods.iter()
                        .map(|pod| PodLine {
                            cluster: cluster.clone(),
                            pod: pod.name.clone(),
                            node: pod.node.clone().unwrap_or_else(|| "-".to_string()),
                            phase: pod.phase.clone(),
                            ready: format!("{}/{}", pod.ready_containers, pod.total_containers),
                        })
                        .collect()
                })
                .unwrap_or_default();
            let report = ClusterReport {
                replicas: status.as_ref().map(ReplicaStatus::text),
                healthy: status.as_ref().map(|s| s.healthy),
                pods,
                error: state.resource_errors.get(cluster).cloned(),
            };
            (cluster.clone(), report)
        })
        .collect()
}

fn print_report(view: ServiceView, state: &DetailState, format: OutputFormat) -> Result<()> {
    let reports = cluster_reports(state);

    if format != OutputFormat::Table {
        let report = ServiceReport {
            title: view.title,
            description: view.description,
            attributes: view
                .attributes
                .into_iter()
                .map(|a| (a.name.to_string(), a.value))
                .collect(),
            clusters: reports,
        };
        return match format {
            OutputFormat::Yaml => output::print_yaml(&report),
            _ => output::print_json(&report),
        };
    }

    output::print_heading(&view.title);
    if let Some(description) = &view.description {
        println!("{}", description);
    }
    output::print_table(
        view.attributes
            .into_iter()
            .map(|a| AttributeLine {
                attribute: a.name.to_string(),
                value: a.value,
            })
            .collect(),
    );

    println!();
    output::print_heading("Resource Status");
    let mut pods = Vec::new();
    for (cluster, report) in reports {
        match (&report.replicas, report.healthy) {
            (Some(replicas), Some(true)) => output::print_success(&format!("{}: {} replicas ready", cluster, replicas)),
            (Some(replicas), _) => output::print_warning(&format!("{}: {} replicas ready", cluster, replicas)),
            (None, _) => println!("{}", cluster),
        }
        if let Some(error) = &report.error {
            output::print_error(&format!("{}: {}", cluster, error));
        }
        pods.extend(report.pods);
    }
    output::print_table(pods);
    Ok(())
}

pub async fn handle_service_command(
    command: ServiceCommands,
    session: &Session,
    workspace: Option<&str>,
    cluster: &str,
    namespace: &str,
) -> Result<()> {
    let ctx = session.context(workspace, Some(cluster));
    let collaborators = session.collaborators();

    let info_form = match &command {
        ServiceCommands::EditInfo { alias, description, .. } => {
            let (alias, description) = (alias.clone(), description.clone());
            PresetForm::new(move |mut info: ServiceInfo| {
                if let Some(alias) = &alias {
                    info.alias_name = alias.clone();
                }
                if let Some(description) = &description {
                    info.description = description.clone();
                }
                Some(info)
            })
        }
        _ => PresetForm::accept(),
    };
    let yaml_form = Rc::new(YamlPrompt {
        file: match &command {
            ServiceCommands::EditYaml { file, .. } => file.clone(),
            _ => None,
        },
        interactive: prompts::interactive(),
    });

    let name = command.name().to_string();
    let page = ServiceDetailController::new(
        ctx,
        namespace,
        &name,
        session.api.clone(),
        collaborators,
        info_form,
        yaml_form,
    );

    match command {
        ServiceCommands::Show { .. } => {
            output::with_spinner("Loading service...", page.load_project()).await;
            let state = page.state();
            if let Some(error) = &state.detail_error {
                anyhow::bail!("Could not load service {}: {}", name, error);
            }
            match page.view() {
                Some(view) => print_report(view, &state, session.format)?,
                None => anyhow::bail!("Service {} not found", name),
            }
        }
        ServiceCommands::EditInfo { .. } => {
            page.load_detail().await;
            if let Some(error) = page.state().detail_error {
                anyhow::bail!("Could not load service {}: {}", name, error);
            }
            finish(page.edit_info().await)?;
        }
        ServiceCommands::EditYaml { .. } => {
            finish(page.edit_yaml().await)?;
        }
        ServiceCommands::Delete { .. } => {
            finish(page.delete().await)?;
        }
    }
    Ok(())
}
