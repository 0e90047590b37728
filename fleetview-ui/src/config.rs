//! Console configuration for the browser

use fleetview_common::ConsoleContext;
use serde::{Deserialize, Serialize};

const STORAGE_KEY: &str = "fleetview.config";

/// Settings read once when the app mounts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Prefix for every API path; empty means the page's own origin
    pub api_root: String,
    pub username: String,
    pub workspace: Option<String>,
    /// Actions the signed-in user may perform
    pub enabled_actions: Vec<String>,
    /// Display offset in seconds east of UTC; browser offset when unset
    pub utc_offset: Option<i32>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            api_root: String::new(),
            username: "admin".to_string(),
            workspace: None,
            enabled_actions: ["view", "create", "edit", "delete"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            utc_offset: None,
        }
    }
}

impl UiConfig {
    /// Read `localStorage["fleetview.config"]`, falling back to defaults
    pub fn load() -> Self {
        let stored = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|s| s.get_item(STORAGE_KEY).ok().flatten());

        match stored {
            Some(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    leptos::logging::warn!("Ignoring unreadable {}: {}", STORAGE_KEY, e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    fn offset_seconds(&self) -> i32 {
        // getTimezoneOffset is minutes west of UTC
        self.utc_offset
            .unwrap_or_else(|| -(js_sys::Date::new_0().get_timezone_offset() as i32) * 60)
    }

    /// Context for a page scoped to `cluster` and, when given, `workspace`
    pub fn context(&self, workspace: Option<&str>, cluster: Option<&str>) -> ConsoleContext {
        let mut ctx = ConsoleContext::new(&self.username)
            .with_actions(self.enabled_actions.iter().cloned())
            .with_offset_seconds(self.offset_seconds());
        if let Some(workspace) = workspace.or(self.workspace.as_deref()) {
            ctx = ctx.with_workspace(workspace);
        }
        if let Some(cluster) = cluster {
            ctx = ctx.with_cluster(cluster);
        }
        ctx
    }
}
