//! Per-session console context
//!
//! Everything a page needs to know about who is looking and where, passed
//! explicitly to controllers and projectors.

use chrono::{FixedOffset, Offset, Utc};
use std::collections::BTreeSet;

/// Session context handed to each page
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleContext {
    pub username: String,
    pub workspace: Option<String>,
    pub cluster: Option<String>,
    /// Action names the current user may perform on this page
    pub enabled_actions: BTreeSet<String>,
    /// Offset timestamps are rendered in
    pub offset: FixedOffset,
}

impl Default for ConsoleContext {
    fn default() -> Self {
        Self {
            username: String::new(),
            workspace: None,
            cluster: None,
            enabled_actions: BTreeSet::new(),
            offset: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl ConsoleContext {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..Default::default()
        }
    }

    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    pub fn with_cluster(mut self, cluster: &str) -> Self {
        self.cluster = Some(cluster.to_string());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Offset in seconds east of UTC; out-of-range values fall back to UTC
    pub fn with_offset_seconds(mut self, seconds: i32) -> Self {
        self.offset = FixedOffset::east_opt(seconds).unwrap_or_else(utc);
        self
    }

    pub fn allows(&self, action: &str) -> bool {
        self.enabled_actions.contains(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows() {
        let ctx = ConsoleContext::new("admin").with_actions(["edit", "delete"]);
        assert!(ctx.allows("edit"));
        assert!(!ctx.allows("create"));
    }

    #[test]
    fn test_bad_offset_falls_back() {
        let ctx = ConsoleContext::default().with_offset_seconds(90_000);
        assert_eq!(ctx.offset.local_minus_utc(), 0);
    }
}
