//! CI/CD pipeline records

use crate::error::{ConsoleError, Result};
use crate::list::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Latest execution of a pipeline as reported by the CI backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestRun {
    #[serde(default)]
    pub id: Option<String>,
    /// `QUEUED`, `RUNNING`, `PAUSED`, `FINISHED`, `SKIPPED`, `NOT_BUILT`
    #[serde(default)]
    pub state: Option<String>,
    /// `SUCCESS`, `UNSTABLE`, `FAILURE`, `NOT_BUILT`, `ABORTED`, `UNKNOWN`
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration_in_millis: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultParameterValue {
    #[serde(default)]
    pub value: Value,
}

/// Build parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default_parameter_value: Option<DefaultParameterValue>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PipelineParameter {
    pub fn default_value(&self) -> Option<String> {
        match &self.default_parameter_value.as_ref()?.value {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Pipeline as listed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub weather_score: Option<u32>,
    #[serde(default)]
    pub latest_run: Option<LatestRun>,
    #[serde(default)]
    pub branch_names: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<PipelineParameter>,
    #[serde(default)]
    pub number_of_failing_branches: Option<u32>,
    #[serde(default)]
    pub number_of_successful_branches: Option<u32>,
    #[serde(default)]
    pub total_number_of_branches: Option<u32>,
    #[serde(default)]
    pub total_number_of_pull_requests: Option<u32>,
}

impl PipelineRecord {
    /// Multibranch pipelines report per-branch counters instead of a run
    pub fn is_multibranch(&self) -> bool {
        self.number_of_successful_branches.is_some() || self.number_of_failing_branches.is_some()
    }

    /// Running needs a parameter/branch form first
    pub fn needs_run_form(&self) -> bool {
        !self.branch_names.is_empty() || !self.parameters.is_empty()
    }

    pub fn run_status(&self) -> RunStatus {
        RunStatus::classify(self.latest_run.as_ref())
    }

    pub fn health(&self) -> HealthLevel {
        HealthLevel::from_score(self.weather_score)
    }

    /// Row key; falls back to the short name
    pub fn key(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

/// Status of a pipeline's latest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Failed,
    Aborted,
    Unstable,
    Paused,
    Running,
    Queued,
    NotBuilt,
    Success,
    NotRun,
}

/// Precedence when a run reports several flags; earlier wins.
///
/// | status    | applies when                                   |
/// |-----------|------------------------------------------------|
/// | failed    | result `FAILURE`                               |
/// | aborted   | result `ABORTED`                               |
/// | unstable  | result `UNSTABLE`                              |
/// | paused    | state `PAUSED`                                 |
/// | running   | state `RUNNING`                                |
/// | queued    | state `QUEUED`                                 |
/// | not_built | result or state `NOT_BUILT`, or state `SKIPPED`|
/// | success   | result `SUCCESS`                               |
/// | not_run   | no run, or nothing above matched               |
pub const RUN_STATUS_PRIORITY: [RunStatus; 9] = [
    RunStatus::Failed,
    RunStatus::Aborted,
    RunStatus::Unstable,
    RunStatus::Paused,
    RunStatus::Running,
    RunStatus::Queued,
    RunStatus::NotBuilt,
    RunStatus::Success,
    RunStatus::NotRun,
];

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Unstable => "unstable",
            Self::Paused => "paused",
            Self::Running => "running",
            Self::Queued => "queued",
            Self::NotBuilt => "not_built",
            Self::Success => "success",
            Self::NotRun => "not_run",
        }
    }

    /// Translation key, e.g. `RUN_STATUS_SUCCESS`
    pub fn label_key(&self) -> String {
        format!("RUN_STATUS_{}", self.as_str().to_uppercase())
    }

    /// Values offered by the status filter; a pipeline that never ran has
    /// nothing to filter on
    pub fn filter_options() -> [RunStatus; 8] {
        [
            Self::Running,
            Self::Success,
            Self::Failed,
            Self::Aborted,
            Self::Unstable,
            Self::Queued,
            Self::Paused,
            Self::NotBuilt,
        ]
    }

    fn applies(&self, run: &LatestRun) -> bool {
        let state = run.state.as_deref().unwrap_or("");
        let result = run.result.as_deref().unwrap_or("");
        match self {
            Self::Failed => result == "FAILURE",
            Self::Aborted => result == "ABORTED",
            Self::Unstable => result == "UNSTABLE",
            Self::Paused => state == "PAUSED",
            Self::Running => state == "RUNNING",
            Self::Queued => state == "QUEUED",
            Self::NotBuilt => result == "NOT_BUILT" || state == "NOT_BUILT" || state == "SKIPPED",
            Self::Success => result == "SUCCESS",
            Self::NotRun => true,
        }
    }

    pub fn classify(run: Option<&LatestRun>) -> RunStatus {
        let Some(run) = run else {
            return RunStatus::NotRun;
        };
        RUN_STATUS_PRIORITY
            .iter()
            .copied()
            .find(|status| status.applies(run))
            .unwrap_or(RunStatus::NotRun)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weather icon derived from the pipeline's recent success rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Storm,
    Rain,
    Cloudy,
    PartlyCloudy,
    Sunny,
}

impl HealthLevel {
    /// Missing scores count as zero
    pub fn from_score(score: Option<u32>) -> Self {
        match score.unwrap_or(0) {
            80..=u32::MAX => Self::Sunny,
            60..=79 => Self::PartlyCloudy,
            40..=59 => Self::Cloudy,
            20..=39 => Self::Rain,
            _ => Self::Storm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storm => "storm",
            Self::Rain => "rain",
            Self::Cloudy => "cloudy",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Sunny => "sunny",
        }
    }
}

/// Parameter values for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub parameters: Vec<RunParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameter {
    pub name: String,
    pub value: String,
}

impl RunRequest {
    /// Seed a request from the pipeline's parameter defaults
    pub fn defaults(record: &PipelineRecord, branch: Option<String>) -> Self {
        Self {
            branch,
            parameters: record
                .parameters
                .iter()
                .map(|p| RunParameter {
                    name: p.name.clone(),
                    value: p.default_value().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Build discarder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discarder {
    pub days_to_keep: String,
    pub num_to_keep: String,
}

/// Editable pipeline configuration
///
/// Only the fields the console manipulates are typed; the rest of the
/// backend's config document survives a round trip in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub enable_timer_trigger: bool,
    #[serde(default)]
    pub enable_discarder: bool,
    #[serde(default)]
    pub discarder: Option<Discarder>,
    #[serde(default)]
    pub timer_trigger: Option<String>,
    #[serde(default)]
    pub parameters: Vec<PipelineParameter>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PipelineConfig {
    /// Defaults for the create form
    pub fn template(devops: &str, cluster: &str) -> Self {
        Self {
            project_name: devops.to_string(),
            cluster: cluster.to_string(),
            enable_timer_trigger: true,
            enable_discarder: true,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPipelineList {
    #[serde(default)]
    items: Vec<PipelineRecord>,
    #[serde(default, alias = "total_count")]
    total_items: Option<usize>,
}

/// Parse a pipeline collection (`totalItems` or `total_count`)
pub fn parse_pipeline_list(payload: Value) -> Result<Page<PipelineRecord>> {
    let list: RawPipelineList = serde_json::from_value(payload)
        .map_err(|e| ConsoleError::Validation(format!("pipeline list: {}", e)))?;
    let total = list.total_items.unwrap_or(list.items.len());
    Ok(Page::new(list.items, total))
}

/// `<prefix>/<name>`
pub fn detail_path(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), urlencoding::encode(name))
}

/// `<prefix>/<name>/[branch/<branch>/]activity`
pub fn activity_path(prefix: &str, name: &str, branch: Option<&str>) -> String {
    match branch {
        Some(branch) if !branch.is_empty() => format!(
            "{}/branch/{}/activity",
            detail_path(prefix, name),
            urlencoding::encode(branch)
        ),
        _ => format!("{}/activity", detail_path(prefix, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(state: Option<&str>, result: Option<&str>) -> LatestRun {
        LatestRun {
            state: state.map(str::to_string),
            result: result.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_status_single_label() {
        assert_eq!(RunStatus::classify(None), RunStatus::NotRun);
        assert_eq!(RunStatus::classify(Some(&run(Some("QUEUED"), None))), RunStatus::Queued);
        assert_eq!(
            RunStatus::classify(Some(&run(Some("RUNNING"), Some("UNKNOWN")))),
            RunStatus::Running
        );
        assert_eq!(
            RunStatus::classify(Some(&run(Some("FINISHED"), Some("SUCCESS")))),
            RunStatus::Success
        );
    }

    #[test]
    fn test_failure_outranks_running() {
        let status = RunStatus::classify(Some(&run(Some("RUNNING"), Some("FAILURE"))));
        assert_eq!(status, RunStatus::Failed);
    }

    #[test]
    fn test_aborted_and_paused() {
        assert_eq!(
            RunStatus::classify(Some(&run(Some("FINISHED"), Some("ABORTED")))),
            RunStatus::Aborted
        );
        assert_eq!(RunStatus::classify(Some(&run(Some("PAUSED"), None))), RunStatus::Paused);
    }

    #[test]
    fn test_status_filter_options() {
        let options = RunStatus::filter_options();
        assert!(!options.contains(&RunStatus::NotRun));
        let values: std::collections::BTreeSet<&str> = options.iter().map(RunStatus::as_str).collect();
        assert_eq!(values.len(), options.len());
    }

    #[test]
    fn test_health_levels() {
        assert_eq!(HealthLevel::from_score(Some(100)), HealthLevel::Sunny);
        assert_eq!(HealthLevel::from_score(Some(80)), HealthLevel::Sunny);
        assert_eq!(HealthLevel::from_score(Some(60)), HealthLevel::PartlyCloudy);
        assert_eq!(HealthLevel::from_score(Some(40)), HealthLevel::Cloudy);
        assert_eq!(HealthLevel::from_score(Some(20)), HealthLevel::Rain);
        assert_eq!(HealthLevel::from_score(None), HealthLevel::Storm);
    }

    #[test]
    fn test_parse_list_and_flags() {
        let page = parse_pipeline_list(json!({
            "items": [
                {"name": "api", "weatherScore": 100, "latestRun": {"state": "FINISHED", "result": "SUCCESS"}},
                {"name": "web", "numberOfSuccessfulBranches": 2, "branchNames": ["main", "dev"],
                 "totalNumberOfBranches": 3}
            ],
            "total_count": 7
        }))
        .unwrap();

        assert_eq!(page.total, 7);
        assert!(!page.items[0].is_multibranch());
        assert!(page.items[1].is_multibranch());
        assert!(page.items[1].needs_run_form());
    }

    #[test]
    fn test_run_request_defaults() {
        let record: PipelineRecord = serde_json::from_value(json!({
            "name": "api",
            "parameters": [
                {"name": "TAG", "type": "StringParameterDefinition",
                 "defaultParameterValue": {"value": "latest"}},
                {"name": "DRY", "type": "BooleanParameterDefinition",
                 "defaultParameterValue": {"value": false}}
            ]
        }))
        .unwrap();

        let request = RunRequest::defaults(&record, None);
        assert_eq!(request.parameters[0].value, "latest");
        assert_eq!(request.parameters[1].value, "false");
    }

    #[test]
    fn test_paths_encode_names() {
        assert_eq!(
            activity_path("/ws/clusters/host/devops/p1/pipelines", "app/ci", None),
            "/ws/clusters/host/devops/p1/pipelines/app%2Fci/activity"
        );
        assert_eq!(
            activity_path("/pipelines/", "api", Some("main")),
            "/pipelines/api/branch/main/activity"
        );
    }

    #[test]
    fn test_config_keeps_unknown_fields() {
        let config: PipelineConfig = serde_json::from_value(json!({
            "name": "api",
            "enable_discarder": true,
            "multi_branch_pipeline": {"source_type": "git"}
        }))
        .unwrap();

        assert!(config.extra.contains_key("multi_branch_pipeline"));
        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["multi_branch_pipeline"]["source_type"], "git");
    }
}
