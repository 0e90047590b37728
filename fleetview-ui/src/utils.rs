use fleetview_common::node::NodeStatus;
use fleetview_common::pipeline::{HealthLevel, RunStatus};
use fleetview_common::view::NodeRow;

/// English text for a status translation key; unknown keys are shown as-is
pub fn label(key: &str) -> String {
    let text = match key {
        "NODE_STATUS_RUNNING" => "Running",
        "NODE_STATUS_PENDING" => "Pending",
        "NODE_STATUS_UNSCHEDULABLE" => "Unschedulable",
        "NODE_STATUS_WARNING" => "Warning",
        "NODE_STATUS_UNKNOWN" => "Unknown",
        "RUN_STATUS_FAILED" => "Failed",
        "RUN_STATUS_ABORTED" => "Aborted",
        "RUN_STATUS_UNSTABLE" => "Unstable",
        "RUN_STATUS_PAUSED" => "Paused",
        "RUN_STATUS_RUNNING" => "Running",
        "RUN_STATUS_QUEUED" => "Queued",
        "RUN_STATUS_NOT_BUILT" => "Not Built",
        "RUN_STATUS_SUCCESS" => "Success",
        "RUN_STATUS_NOT_RUN" => "Not Run",
        "SERVICE_TYPE_VIRTUALIP" => "Virtual IP",
        "SERVICE_TYPE_HEADLESS" => "Headless",
        "SERVICE_TYPE_HEADLESS(SELECTOR)" => "Headless (Selector)",
        "SERVICE_TYPE_HEADLESS(EXTERNALNAME)" => "Headless (External Name)",
        _ => return key.to_string(),
    };
    text.to_string()
}

/// Replace the `SERVICE_TYPE_X` key at the start of a type attribute
pub fn service_type(value: &str) -> String {
    match value.split_once(' ') {
        Some((key, rest)) if key.starts_with("SERVICE_TYPE_") => format!("{} {}", label(key), rest),
        _ => label(value),
    }
}

pub fn node_status_class(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Running => "badge badge-success",
        NodeStatus::Pending => "badge badge-info",
        NodeStatus::Unschedulable | NodeStatus::Warning => "badge badge-warning",
        NodeStatus::Unknown => "badge badge-muted",
    }
}

pub fn run_status_class(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "badge badge-success",
        RunStatus::Failed | RunStatus::Aborted => "badge badge-danger",
        RunStatus::Unstable | RunStatus::Paused => "badge badge-warning",
        RunStatus::Running | RunStatus::Queued => "badge badge-info",
        RunStatus::NotBuilt | RunStatus::NotRun => "badge badge-muted",
    }
}

pub fn health_icon(health: HealthLevel) -> &'static str {
    match health {
        HealthLevel::Sunny => "☀",
        HealthLevel::PartlyCloudy => "⛅",
        HealthLevel::Cloudy => "☁",
        HealthLevel::Rain => "🌧",
        HealthLevel::Storm => "⛈",
    }
}

/// `For` keys of the node table; a metrics update keeps every key
pub fn node_keys(rows: &[NodeRow]) -> Vec<String> {
    rows.iter().map(|row| row.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_common::metrics::{MetricResponse, MetricSet};
    use fleetview_common::node::{NodeRecord, RawNode};
    use fleetview_common::ConsoleContext;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn node_row(cpu_used: f64) -> NodeRow {
        let raw: RawNode = serde_json::from_value(json!({
            "metadata": {"name": "node-1"},
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }))
        .unwrap();
        let response: MetricResponse = serde_json::from_value(json!({"results": [
            {"metric_name": "node_cpu_usage", "data": {"resultType": "vector",
                "result": [{"metric": {"node": "node-1"}, "value": [1700000000, cpu_used.to_string()]}]}},
            {"metric_name": "node_cpu_total", "data": {"resultType": "vector",
                "result": [{"metric": {"node": "node-1"}, "value": [1700000000, "4"]}]}}
        ]}))
        .unwrap();
        let names = BTreeSet::from(["node-1".to_string()]);
        let metrics = MetricSet::fold(&response, "node", &names).set;
        NodeRow::project(&ConsoleContext::new("admin"), &NodeRecord::from_raw(raw), &metrics)
    }

    #[test]
    fn test_node_keys_survive_metric_updates() {
        let before = vec![node_row(1.0)];
        let after = vec![node_row(3.8)];

        assert_ne!(before, after);
        assert_eq!(node_keys(&before), node_keys(&after));
        assert_eq!(node_keys(&after), vec!["node-1"]);
    }

    #[test]
    fn test_known_and_unknown_labels() {
        assert_eq!(label("NODE_STATUS_UNSCHEDULABLE"), "Unschedulable");
        assert_eq!(label("RUN_STATUS_NOT_BUILT"), "Not Built");
        assert_eq!(label("Custom Creation"), "Custom Creation");
    }

    #[test]
    fn test_service_type_keeps_spec_type() {
        assert_eq!(service_type("SERVICE_TYPE_VIRTUALIP (ClusterIP)"), "Virtual IP (ClusterIP)");
        assert_eq!(service_type("Custom Creation (NodePort)"), "Custom Creation (NodePort)");
    }
}
