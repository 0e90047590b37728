//! List aggregation
//!
//! An [`Aggregator`] owns one page's list and metric state. It issues list
//! fetches, follows each successful list with a metrics fetch scoped to the
//! names just returned, and publishes a snapshot to subscribers after every
//! change. Responses belonging to a superseded request, or arriving after
//! [`Aggregator::dispose`], are dropped without touching state.
//!
//! Everything here runs on one cooperative event loop: state sits in
//! `RefCell`s and no borrow is held across an `.await`.

use crate::error::{ErrorKind, Result};
use crate::list::{ListQuery, ListState, Page};
use crate::metrics::{MetricQuery, MetricResponse, MetricSet};
use crate::node::NodeRecord;
use crate::pipeline::PipelineRecord;
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Name a record is addressed by in metric queries and actions
pub trait Named {
    fn resource_name(&self) -> &str;
}

impl Named for NodeRecord {
    fn resource_name(&self) -> &str {
        &self.name
    }
}

impl Named for PipelineRecord {
    fn resource_name(&self) -> &str {
        &self.name
    }
}

/// Fetches one page of a collection
#[async_trait(?Send)]
pub trait ListSource<T> {
    async fn fetch_list(&self, query: &ListQuery) -> Result<Page<T>>;
}

/// Fetches monitoring data
#[async_trait(?Send)]
pub trait MetricsSource {
    async fn fetch_metrics(&self, query: &MetricQuery) -> Result<MetricResponse>;
}

/// Monotonic request tokens. Only the latest issued token is current, and
/// none is once the owner is disposed.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: Cell<u64>,
    disposed: Cell<bool>,
}

impl RequestSequencer {
    pub fn next(&self) -> u64 {
        let seq = self.issued.get() + 1;
        self.issued.set(seq);
        seq
    }

    /// Latest token issued so far
    pub fn latest(&self) -> u64 {
        self.issued.get()
    }

    pub fn is_current(&self, seq: u64) -> bool {
        !self.disposed.get() && seq == self.issued.get()
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

pub type Listener<T> = Rc<dyn Fn(&T)>;

/// Explicit subscribe/publish registry
pub struct Subscribers<T> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<T> Subscribers<T> {
    /// Register `listener`; the returned id unsubscribes it
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(listener_id, _)| *listener_id != id);
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Call every listener with `value`. The registry is not borrowed while
    /// listeners run, so a listener may subscribe or unsubscribe.
    pub fn publish(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self.listeners.borrow().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(value);
        }
    }
}

/// Metrics that follow each list fetch
pub struct MetricsPlan {
    pub source: Rc<dyn MetricsSource>,
    pub metrics: Vec<String>,
    /// Series label carrying the resource name
    pub label: &'static str,
}

/// Snapshot published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    pub list: ListState<T>,
    pub metrics: MetricSet,
    pub metrics_loading: bool,
    pub metrics_error: Option<String>,
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        Self {
            list: ListState::default(),
            metrics: MetricSet::default(),
            metrics_loading: false,
            metrics_error: None,
        }
    }
}

struct Inner<T> {
    name: &'static str,
    source: Rc<dyn ListSource<T>>,
    metrics: Option<MetricsPlan>,
    state: RefCell<PageState<T>>,
    last_query: RefCell<ListQuery>,
    sequencer: RequestSequencer,
    subscribers: Subscribers<PageState<T>>,
}

/// List data aggregator for one page. Cloning shares the same state.
pub struct Aggregator<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Aggregator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Named + Clone + 'static> Aggregator<T> {
    /// `name` identifies the page in logs
    pub fn new(name: &'static str, source: Rc<dyn ListSource<T>>) -> Self {
        Self::build(name, source, None)
    }

    pub fn with_metrics(name: &'static str, source: Rc<dyn ListSource<T>>, plan: MetricsPlan) -> Self {
        Self::build(name, source, Some(plan))
    }

    fn build(name: &'static str, source: Rc<dyn ListSource<T>>, metrics: Option<MetricsPlan>) -> Self {
        Self {
            inner: Rc::new(Inner {
                name,
                source,
                metrics,
                state: RefCell::new(PageState::default()),
                last_query: RefCell::new(ListQuery::default()),
                sequencer: RequestSequencer::default(),
                subscribers: Subscribers::default(),
            }),
        }
    }

    pub fn state(&self) -> PageState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn last_query(&self) -> ListQuery {
        self.inner.last_query.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&PageState<T>) + 'static) -> u64 {
        self.inner.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.unsubscribe(id);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.sequencer.is_disposed()
    }

    /// Stop all future mutation; pending responses are dropped on arrival
    pub fn dispose(&self) {
        tracing::debug!(page = self.inner.name, "Disposing aggregator");
        self.inner.sequencer.dispose();
        self.inner.subscribers.clear();
    }

    /// Fetch the list for `query`, then its metrics
    pub async fn load(&self, query: ListQuery) {
        if self.is_disposed() {
            return;
        }
        let seq = self.inner.sequencer.next();
        *self.inner.last_query.borrow_mut() = query.clone();
        self.update(|state| state.list.loading = true);

        let result = self.inner.source.fetch_list(&query).await;
        if !self.inner.sequencer.is_current(seq) {
            tracing::debug!(page = self.inner.name, seq, "Dropping superseded list response");
            return;
        }

        let names = match result {
            Ok(page) => {
                let names: BTreeSet<String> = page
                    .items
                    .iter()
                    .take(query.limit as usize)
                    .map(|item| item.resource_name().to_string())
                    .collect();
                self.update(|state| {
                    state.list.apply(&query, page);
                    state.list.loading = false;
                    state.metrics.retain(&names);
                });
                names
            }
            Err(err) => {
                tracing::warn!(page = self.inner.name, error = %err, "List fetch failed");
                self.update(|state| {
                    state.list.fail(&query, err.message());
                    state.list.loading = false;
                    state.metrics = MetricSet::default();
                    state.metrics_loading = false;
                });
                return;
            }
        };

        self.load_metrics(seq, names).await;
    }

    /// Re-run the most recent query
    pub async fn refresh(&self) {
        let query = self.last_query();
        self.load(query).await;
    }

    async fn load_metrics(&self, seq: u64, names: BTreeSet<String>) {
        let Some(plan) = &self.inner.metrics else {
            return;
        };
        if names.is_empty() {
            self.update(|state| {
                state.metrics = MetricSet::default();
                state.metrics_loading = false;
                state.metrics_error = None;
            });
            return;
        }

        self.update(|state| state.metrics_loading = true);
        let query = MetricQuery::latest(names.iter().cloned().collect(), plan.metrics.clone());
        let result = plan.source.fetch_metrics(&query).await;
        if !self.inner.sequencer.is_current(seq) {
            tracing::debug!(page = self.inner.name, seq, "Dropping superseded metrics response");
            return;
        }

        match result {
            Ok(response) => {
                let fold = MetricSet::fold(&response, plan.label, &names);
                if !fold.discarded.is_empty() {
                    tracing::debug!(page = self.inner.name, discarded = ?fold.discarded, "Ignoring metrics outside the list");
                }
                if !fold.issues.is_empty() {
                    tracing::debug!(page = self.inner.name, issues = ?fold.issues, "Skipped malformed samples");
                }
                self.update(|state| {
                    state.metrics = fold.set;
                    state.metrics_loading = false;
                    state.metrics_error = None;
                });
            }
            Err(err) => {
                tracing::warn!(page = self.inner.name, error = %err, "Metrics fetch failed");
                // Malformed payloads degrade silently; transport failures get a flag
                let flag = (err.kind() != ErrorKind::Validation).then(|| err.message());
                self.update(|state| {
                    state.metrics = MetricSet::default();
                    state.metrics_loading = false;
                    state.metrics_error = flag;
                });
            }
        }
    }

    fn update(&self, change: impl FnOnce(&mut PageState<T>)) {
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            change(&mut state);
            state.clone()
        };
        self.inner.subscribers.publish(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencer_latest_only() {
        let seq = RequestSequencer::default();
        let first = seq.next();
        let second = seq.next();

        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));

        seq.dispose();
        assert!(!seq.is_current(second));
    }

    #[test]
    fn test_subscribers_publish_and_unsubscribe() {
        let subs: Subscribers<u32> = Subscribers::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let id = subs.subscribe(move |v| sink.borrow_mut().push(*v));
        subs.publish(&1);
        subs.unsubscribe(id);
        subs.publish(&2);

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let subs: Rc<Subscribers<u32>> = Rc::new(Subscribers::default());
        let handle = subs.clone();
        let id = Rc::new(Cell::new(0));
        let own = id.clone();
        id.set(subs.subscribe(move |_| handle.unsubscribe(own.get())));

        subs.publish(&1);
        subs.publish(&2);
        assert!(subs.listeners.borrow().is_empty());
    }
}
