//! Terminal implementations of the controller collaborators
//!
//! Confirmations and forms use `dialoguer` when stdin is a terminal and the
//! values given on the command line otherwise.

use crate::output;
use async_trait::async_trait;
use dialoguer::{Confirm, Editor, Input, Select};
use fleetview_common::action::{Confirmation, Confirmer, FormModal, Navigator, Notice, NoticeLevel, Notifier};
use fleetview_common::api::PipelineApi;
use fleetview_common::controller::{Collaborators, RunForm, TaintForm};
use fleetview_common::meta::Scope;
use fleetview_common::node::Taint;
use fleetview_common::pipeline::{PipelineRecord, RunParameter, RunRequest};
use serde_json::Value;
use std::io::IsTerminal;
use std::rc::Rc;

pub fn interactive() -> bool {
    std::io::stdin().is_terminal()
}

pub struct TerminalConfirmer {
    assume_yes: bool,
}

#[async_trait(?Send)]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, confirmation: &Confirmation) -> bool {
        if self.assume_yes {
            return true;
        }
        if !interactive() {
            output::print_warning("Not a terminal; pass --yes to confirm");
            return false;
        }
        Confirm::new()
            .with_prompt(format!("{}: {}", confirmation.title, confirmation.message))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => output::print_success(&notice.message),
            NoticeLevel::Error => output::print_error(&notice.message),
        }
    }
}

/// Prints the console page a browser would have opened
pub struct LinkNavigator {
    base_url: String,
}

impl Navigator for LinkNavigator {
    fn navigate(&self, path: &str) {
        output::print_info(&format!("Open {}{}", self.base_url, path));
    }
}

pub fn collaborators(base_url: &str, assume_yes: bool) -> Collaborators {
    Collaborators {
        confirmer: Rc::new(TerminalConfirmer { assume_yes }),
        notifier: Rc::new(TerminalNotifier),
        navigator: Rc::new(LinkNavigator {
            base_url: base_url.to_string(),
        }),
    }
}

/// A form filled from command-line flags
pub struct PresetForm<C> {
    edit: Box<dyn Fn(C) -> Option<C>>,
}

impl<C: 'static> PresetForm<C> {
    pub fn new(edit: impl Fn(C) -> Option<C> + 'static) -> Rc<Self> {
        Rc::new(Self { edit: Box::new(edit) })
    }

    /// Submits the initial value unchanged
    pub fn accept() -> Rc<Self> {
        Self::new(Some)
    }
}

#[async_trait(?Send)]
impl<C: 'static> FormModal<C> for PresetForm<C> {
    async fn show(&self, initial: C) -> Option<C> {
        (self.edit)(initial)
    }
}

/// Parse `name=value` pairs given with `--param`
pub fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{}`", s)),
    }
}

/// Branch and parameters for a run
pub struct RunPrompt {
    pub api: Rc<dyn PipelineApi>,
    pub scope: Scope,
    pub branch: Option<String>,
    pub params: Vec<(String, String)>,
    pub interactive: bool,
}

impl RunPrompt {
    async fn reseed(&self, form: &mut RunForm, branch: String) -> Option<()> {
        if form.request.branch.as_deref() == Some(branch.as_str()) {
            return Some(());
        }
        let parameters = match self.api.branch_parameters(&self.scope, &form.pipeline, &branch).await {
            Ok(parameters) => parameters,
            Err(e) => {
                output::print_error(&format!("Parameters of branch {}: {}", branch, e));
                return None;
            }
        };
        let record = PipelineRecord {
            name: form.pipeline.clone(),
            parameters: parameters.clone(),
            ..Default::default()
        };
        form.request = RunRequest::defaults(&record, Some(branch));
        form.parameters = parameters;
        Some(())
    }
}

#[async_trait(?Send)]
impl FormModal<RunForm> for RunPrompt {
    async fn show(&self, mut form: RunForm) -> Option<RunForm> {
        let branch = match &self.branch {
            Some(branch) if !form.branches.is_empty() && !form.branches.contains(branch) => {
                output::print_error(&format!("{} has no branch `{}`", form.pipeline, branch));
                return None;
            }
            Some(branch) => Some(branch.clone()),
            None if self.interactive && form.branches.len() > 1 => {
                let index = Select::new()
                    .with_prompt("Branch")
                    .items(&form.branches)
                    .default(0)
                    .interact()
                    .ok()?;
                form.branches.get(index).cloned()
            }
            None => None,
        };
        if let Some(branch) = branch {
            self.reseed(&mut form, branch).await?;
        }

        for (name, value) in &self.params {
            match form.request.parameters.iter_mut().find(|p| &p.name == name) {
                Some(parameter) => parameter.value = value.clone(),
                None => form.request.parameters.push(RunParameter {
                    name: name.clone(),
                    value: value.clone(),
                }),
            }
        }

        if self.interactive && self.params.is_empty() {
            for parameter in form.request.parameters.iter_mut() {
                parameter.value = Input::new()
                    .with_prompt(&parameter.name)
                    .with_initial_text(parameter.value.clone())
                    .allow_empty(true)
                    .interact_text()
                    .ok()?;
            }
        }
        Some(form)
    }
}

/// Edits applied to the taint set shared by the selected nodes
pub struct TaintPrompt {
    pub add: Vec<Taint>,
    /// Keys to drop
    pub remove: Vec<String>,
    pub clear: bool,
    pub interactive: bool,
}

impl TaintPrompt {
    fn has_flags(&self) -> bool {
        self.clear || !self.add.is_empty() || !self.remove.is_empty()
    }

    /// Apply the flag edits to `taints`; an added taint replaces one with
    /// the same key and effect
    pub fn apply(&self, taints: &mut Vec<Taint>) {
        if self.clear {
            taints.clear();
        }
        taints.retain(|t| !self.remove.contains(&t.key));
        for taint in &self.add {
            taints.retain(|t| !(t.key == taint.key && t.effect == taint.effect));
            taints.push(taint.clone());
        }
    }
}

pub fn parse_taint_list(text: &str) -> Result<Vec<Taint>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[async_trait(?Send)]
impl FormModal<TaintForm> for TaintPrompt {
    async fn show(&self, mut form: TaintForm) -> Option<TaintForm> {
        if self.has_flags() || !self.interactive {
            self.apply(&mut form.taints);
            return Some(form);
        }

        let current: Vec<String> = form.taints.iter().map(|t| t.to_string()).collect();
        let text: String = Input::new()
            .with_prompt(format!("Taints for {} (key=value:effect, comma separated)", form.nodes.join(", ")))
            .with_initial_text(current.join(", "))
            .allow_empty(true)
            .interact_text()
            .ok()?;
        match parse_taint_list(&text) {
            Ok(taints) => {
                form.taints = taints;
                Some(form)
            }
            Err(e) => {
                output::print_error(&e);
                None
            }
        }
    }
}

/// Whole-object edit: a YAML file, or `$EDITOR` on a terminal
pub struct YamlPrompt {
    pub file: Option<std::path::PathBuf>,
    pub interactive: bool,
}

impl YamlPrompt {
    fn read(&self, object: &Value) -> anyhow::Result<Option<Value>> {
        if let Some(file) = &self.file {
            let text = std::fs::read_to_string(file)?;
            return Ok(Some(serde_yaml::from_str(&text)?));
        }
        if !self.interactive {
            anyhow::bail!("Not a terminal; pass --file");
        }
        let yaml = serde_yaml::to_string(object)?;
        match Editor::new().extension(".yaml").edit(&yaml)? {
            Some(text) => Ok(Some(serde_yaml::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

#[async_trait(?Send)]
impl FormModal<Value> for YamlPrompt {
    async fn show(&self, object: Value) -> Option<Value> {
        match self.read(&object) {
            Ok(edited) => edited,
            Err(e) => {
                output::print_error(&format!("{:#}", e));
                None
            }
        }
    }
}
