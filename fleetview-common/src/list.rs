//! Paginated list query and state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Parameters of one list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    /// Field filters, e.g. `name` or `status`
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub ascending: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            filters: BTreeMap::new(),
            sort_by: None,
            ascending: false,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self.filters.remove(key);
        } else {
            self.filters.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn sorted_by(mut self, field: &str, ascending: bool) -> Self {
        self.sort_by = Some(field.to_string());
        self.ascending = ascending;
        self
    }

    /// Whether the user narrowed the list beyond paging
    pub fn has_user_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Query pairs in the order the API expects them
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        pairs.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(field) = &self.sort_by {
            pairs.push(("sortBy".to_string(), field.clone()));
            pairs.push(("ascending".to_string(), self.ascending.to_string()));
        }
        pairs
    }

    /// URL-encoded query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        encode_pairs(&self.to_pairs())
    }
}

pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// One page of records as reported by the server
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Server-side total across all pages
    pub total: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// State behind a list view
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub filters: BTreeMap<String, String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            filters: BTreeMap::new(),
            loading: false,
            error: None,
        }
    }
}

impl<T> ListState<T> {
    /// Replace contents with a fetched page. Items beyond the page size are
    /// dropped so that `items.len() <= limit` always holds.
    pub fn apply(&mut self, query: &ListQuery, page: Page<T>) {
        let mut items = page.items;
        items.truncate(query.limit as usize);

        self.items = items;
        self.total = page.total;
        self.page = query.page;
        self.limit = query.limit;
        self.filters = query.filters.clone();
        self.error = None;
    }

    /// Record a failed fetch as an empty list with an error banner
    pub fn fail(&mut self, query: &ListQuery, message: String) {
        self.items.clear();
        self.total = 0;
        self.page = query.page;
        self.limit = query.limit;
        self.filters = query.filters.clone();
        self.error = Some(message);
    }

    /// Nothing to show and nothing filtered: render the create prompt
    pub fn is_empty_state(&self) -> bool {
        !self.loading && self.error.is_none() && self.total == 0 && self.filters.is_empty()
    }

    pub fn total_pages(&self) -> u32 {
        let limit = self.limit.max(1) as usize;
        self.total.div_ceil(limit) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_truncates_to_page_size() {
        let query = ListQuery::page(1, 2);
        let mut state = ListState::default();
        state.apply(&query, Page::new(vec!["a", "b", "c"], 30));

        assert_eq!(state.items, vec!["a", "b"]);
        assert_eq!(state.total, 30);
        assert_eq!(state.total_pages(), 15);
    }

    #[test]
    fn test_fail_clears_items() {
        let query = ListQuery::default();
        let mut state = ListState::default();
        state.apply(&query, Page::new(vec![1, 2], 2));
        state.fail(&query, "HTTP 500".to_string());

        assert!(state.items.is_empty());
        assert_eq!(state.total, 0);
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_empty_state_ignores_paging_only() {
        let mut state: ListState<u32> = ListState::default();
        state.apply(&ListQuery::page(2, 20), Page::empty());
        assert!(state.is_empty_state());

        state.apply(&ListQuery::default().with_filter("name", "api"), Page::empty());
        assert!(!state.is_empty_state());
    }

    #[test]
    fn test_query_string_encodes_filters() {
        let query = ListQuery::page(2, 10)
            .with_filter("name", "web app")
            .sorted_by("createTime", false);

        assert_eq!(
            query.to_query_string(),
            "page=2&limit=10&name=web%20app&sortBy=createTime&ascending=false"
        );
    }

    #[test]
    fn test_empty_filter_value_removes_filter() {
        let query = ListQuery::default()
            .with_filter("status", "running")
            .with_filter("status", "");
        assert!(!query.has_user_filters());
    }
}
