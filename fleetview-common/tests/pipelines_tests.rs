//! Pipeline List Tests

mod common;

use common::*;
use fleetview_common::action::{ActionOutcome, NoticeLevel};
use fleetview_common::controller::{PipelinesController, RunForm};
use fleetview_common::pipeline::{PipelineConfig, PipelineRecord, RunParameter, RunRequest, RunStatus};
use fleetview_common::view::PipelineAction;
use fleetview_common::{ConsoleContext, ListQuery};
use serde_json::json;
use std::rc::Rc;

const PREFIX: &str = "/ws/clusters/host/devops/proj-x1/pipelines";

fn ctx() -> ConsoleContext {
    ConsoleContext::new("dev")
        .with_workspace("ws")
        .with_cluster("host")
        .with_actions(["view", "create", "edit", "delete"])
}

fn record(value: serde_json::Value) -> PipelineRecord {
    serde_json::from_value(value).unwrap()
}

fn named(name: &str) -> PipelineRecord {
    PipelineRecord {
        name: name.to_string(),
        ..Default::default()
    }
}

struct Fixture {
    api: Rc<FakePipelineApi>,
    ui: Ui,
    run_form: Rc<ScriptedForm<RunForm>>,
    config_form: Rc<ScriptedForm<PipelineConfig>>,
    page: PipelinesController,
}

fn fixture(
    pipelines: Vec<PipelineRecord>,
    run_form: Rc<ScriptedForm<RunForm>>,
    config_form: Rc<ScriptedForm<PipelineConfig>>,
) -> Fixture {
    let api = FakePipelineApi::with_pipelines(pipelines);
    let ui = Ui::new(true);
    let page = PipelinesController::new(
        ctx(),
        "proj-x1",
        api.clone(),
        ui.collaborators(),
        run_form.clone(),
        config_form.clone(),
    );
    Fixture {
        api,
        ui,
        run_form,
        config_form,
        page,
    }
}

#[tokio::test]
async fn test_rows_link_and_status() {
    let f = fixture(
        vec![
            record(json!({"name": "build", "weatherScore": 100, "latestRun": {"result": "SUCCESS"}})),
            record(json!({
                "name": "mono",
                "numberOfFailingBranches": 1,
                "numberOfSuccessfulBranches": 3,
                "totalNumberOfBranches": 4
            })),
        ],
        ScriptedForm::new(Some),
        ScriptedForm::new(Some),
    );

    f.page.load(ListQuery::default()).await;
    let rows = f.page.rows();

    assert_eq!(f.page.prefix(), PREFIX);
    assert_eq!(rows[0].link, format!("{}/build", PREFIX));
    assert_eq!(rows[0].pull_requests, "-");
    assert_eq!(rows[1].link, format!("{}/mono/activity", PREFIX));
    assert_eq!(rows[1].status.text(), "3 branch success");
    assert_eq!(rows[1].branches, "4");
    assert!(rows[0].actions.contains(&PipelineAction::Delete));
}

#[tokio::test]
async fn test_empty_project_shows_create_prompt() {
    let f = fixture(Vec::new(), ScriptedForm::new(Some), ScriptedForm::new(Some));

    f.page.load(ListQuery::default()).await;

    assert!(f.page.is_empty_state());
    assert!(f.page.can_create());
}

#[tokio::test]
async fn test_filtered_empty_list_is_not_empty_state() {
    let f = fixture(Vec::new(), ScriptedForm::new(Some), ScriptedForm::new(Some));

    f.page.load(ListQuery::default().with_filter("name", "nothing")).await;

    assert!(!f.page.is_empty_state());
}

#[tokio::test]
async fn test_status_filter_reaches_the_server() {
    let f = fixture(Vec::new(), ScriptedForm::new(Some), ScriptedForm::new(Some));

    f.page
        .load(ListQuery::default().with_filter("status", RunStatus::Failed.as_str()))
        .await;

    assert!(!f.page.is_empty_state());
    let queries = f.api.queries.borrow();
    assert_eq!(queries[0].filters.get("status").map(String::as_str), Some("failed"));
}

#[tokio::test]
async fn test_batch_delete_with_one_failure() {
    let f = fixture(
        vec![named("p1"), named("p2"), named("p3")],
        ScriptedForm::new(Some),
        ScriptedForm::new(Some),
    );
    f.api.protected.borrow_mut().insert("p2".to_string());
    f.page.load(ListQuery::default()).await;

    let outcome = f
        .page
        .batch_delete(vec!["p1".to_string(), "p2".to_string(), "p3".to_string()])
        .await;

    let ActionOutcome::Succeeded(report) = outcome else {
        panic!("batch should resolve with a report");
    };
    assert_eq!(report.succeeded, vec!["p1", "p3"]);
    assert_eq!(report.failed_names(), vec!["p2"]);
    assert!(!report.all_succeeded());

    let notices = f.ui.notifier.notices.borrow();
    let summary = notices.last().unwrap();
    assert_eq!(summary.level, NoticeLevel::Error);
    assert!(summary.message.contains("p2"));

    assert_eq!(f.api.list_calls.get(), 2);
    let remaining: Vec<String> = f.page.state().list.items.iter().map(|p| p.name.clone()).collect();
    assert_eq!(remaining, vec!["p2"]);
}

#[tokio::test]
async fn test_run_without_parameters_skips_form() {
    let f = fixture(vec![named("build")], ScriptedForm::new(Some), ScriptedForm::new(Some));
    f.page.load(ListQuery::default()).await;

    let outcome = f.page.run("build").await;

    assert!(outcome.is_success());
    assert!(f.run_form.shown.borrow().is_empty());
    assert_eq!(f.api.runs.borrow()[0], ("build".to_string(), RunRequest::default()));
    assert_eq!(f.ui.paths(), vec![format!("{}/build/activity", PREFIX)]);
}

#[tokio::test]
async fn test_run_with_branch_opens_branch_activity() {
    let f = fixture(
        vec![record(json!({
            "name": "mono",
            "branchNames": ["main", "release"],
            "parameters": [{"name": "TAG", "type": "string", "defaultParameterValue": {"value": "latest"}}]
        }))],
        ScriptedForm::new(|mut form: RunForm| {
            form.request.branch = Some("release".to_string());
            Some(form)
        }),
        ScriptedForm::new(Some),
    );
    f.page.load(ListQuery::default()).await;

    let outcome = f.page.run("mono").await;

    assert!(outcome.is_success());
    let shown = f.run_form.shown.borrow();
    assert_eq!(shown[0].branches, vec!["main", "release"]);
    assert_eq!(shown[0].request.branch.as_deref(), Some("main"));
    assert_eq!(
        shown[0].request.parameters,
        vec![RunParameter {
            name: "TAG".to_string(),
            value: "latest".to_string()
        }]
    );
    assert_eq!(f.api.runs.borrow()[0].1.branch.as_deref(), Some("release"));
    assert_eq!(f.ui.paths(), vec![format!("{}/mono/branch/release/activity", PREFIX)]);
}

#[tokio::test]
async fn test_cancelled_run_form_sends_nothing() {
    let f = fixture(
        vec![record(json!({"name": "mono", "branchNames": ["main"]}))],
        ScriptedForm::new(|_: RunForm| None),
        ScriptedForm::new(Some),
    );
    f.page.load(ListQuery::default()).await;

    assert_eq!(f.page.run("mono").await, ActionOutcome::Cancelled);
    assert!(f.api.runs.borrow().is_empty());
    assert!(f.ui.paths().is_empty());
}

#[tokio::test]
async fn test_create_navigates_to_detail() {
    let f = fixture(
        Vec::new(),
        ScriptedForm::new(Some),
        ScriptedForm::new(|mut config: PipelineConfig| {
            config.name = "deploy".to_string();
            Some(config)
        }),
    );

    let outcome = f.page.create().await;

    assert_eq!(outcome, ActionOutcome::Succeeded("deploy".to_string()));
    let template = &f.config_form.shown.borrow()[0];
    assert_eq!(template.project_name, "proj-x1");
    assert_eq!(template.cluster, "host");
    assert_eq!(f.ui.paths(), vec![format!("{}/deploy", PREFIX)]);
}

#[tokio::test]
async fn test_edit_failing_config_read_is_reported() {
    let f = fixture(vec![named("build")], ScriptedForm::new(Some), ScriptedForm::new(Some));

    let outcome = f.page.edit("build").await;

    assert!(matches!(outcome, ActionOutcome::Failed(_)));
    assert!(f.config_form.shown.borrow().is_empty());
    assert_eq!(f.ui.notifier.notices.borrow()[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_edit_saves_and_refreshes() {
    let f = fixture(
        vec![named("build")],
        ScriptedForm::new(Some),
        ScriptedForm::new(|mut config: PipelineConfig| {
            config.description = Some("nightly".to_string());
            Some(config)
        }),
    );
    f.api.configs.borrow_mut().insert(
        "build".to_string(),
        PipelineConfig {
            name: "build".to_string(),
            ..PipelineConfig::template("proj-x1", "host")
        },
    );
    f.page.load(ListQuery::default()).await;

    let outcome = f.page.edit("build").await;

    assert!(outcome.is_success());
    assert_eq!(
        f.api.configs.borrow()["build"].description.as_deref(),
        Some("nightly")
    );
    assert_eq!(f.api.list_calls.get(), 2);
}
