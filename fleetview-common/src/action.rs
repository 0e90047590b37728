//! User-triggered mutations
//!
//! Each page owns one [`ActionDispatcher`]. An action walks
//! `Idle -> Confirming -> Submitting -> Idle`; confirmation is skipped for
//! non-destructive actions. Whatever the server answers, the dispatcher ends
//! in `Idle` and reports the outcome through the [`Notifier`]. Refreshing the
//! list afterwards is the caller's job.

use crate::error::{ConsoleError, Result};
use crate::store::Subscribers;
use async_trait::async_trait;
use futures::future::join_all;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    Confirming,
    Submitting,
}

/// Text of a confirmation dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub title: String,
    pub message: String,
    pub destructive: bool,
}

impl Confirmation {
    /// Standard delete prompt naming the resources
    pub fn delete(kind: &str, names: &[String]) -> Self {
        Self {
            title: format!("Delete {}", kind),
            message: format!("Delete {} {}?", kind, names.join(", ")),
            destructive: true,
        }
    }
}

/// Asks the user to confirm
#[async_trait(?Send)]
pub trait Confirmer {
    async fn confirm(&self, confirmation: &Confirmation) -> bool;
}

/// Shows a form seeded with `initial`; `None` means the user cancelled
#[async_trait(?Send)]
pub trait FormModal<C> {
    async fn show(&self, initial: C) -> Option<C>;
}

pub trait Navigator {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Terminal state of one dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T = ()> {
    Succeeded(T),
    Failed(ConsoleError),
    Cancelled,
    /// Another action was still in flight
    Busy,
}

impl<T> ActionOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Per-item result of a batch action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, ConsoleError)>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn summary(&self, label: &str) -> Notice {
        if self.failed.is_empty() {
            return Notice::success(format!("{}: {} succeeded", label, self.succeeded.len()));
        }
        let failures: Vec<String> = self.failed.iter().map(|(_, err)| err.to_string()).collect();
        Notice::error(format!(
            "{}: {} succeeded, {} failed ({})",
            label,
            self.succeeded.len(),
            self.failed.len(),
            failures.join("; ")
        ))
    }
}

pub struct ActionDispatcher {
    phase: Cell<ActionPhase>,
    confirmer: Rc<dyn Confirmer>,
    notifier: Rc<dyn Notifier>,
    subscribers: Subscribers<ActionPhase>,
}

impl ActionDispatcher {
    pub fn new(confirmer: Rc<dyn Confirmer>, notifier: Rc<dyn Notifier>) -> Self {
        Self {
            phase: Cell::new(ActionPhase::Idle),
            confirmer,
            notifier,
            subscribers: Subscribers::default(),
        }
    }

    pub fn phase(&self) -> ActionPhase {
        self.phase.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&ActionPhase) + 'static) -> u64 {
        self.subscribers.subscribe(listener)
    }

    fn set_phase(&self, phase: ActionPhase) {
        self.phase.set(phase);
        self.subscribers.publish(&phase);
    }

    /// Move to `Confirming` when asked to, and back to `Idle` on refusal
    async fn begin(&self, confirmation: Option<&Confirmation>) -> std::result::Result<(), Early> {
        if self.phase.get() != ActionPhase::Idle {
            return Err(Early::Busy);
        }
        if let Some(confirmation) = confirmation {
            self.set_phase(ActionPhase::Confirming);
            if !self.confirmer.confirm(confirmation).await {
                self.set_phase(ActionPhase::Idle);
                return Err(Early::Cancelled);
            }
        }
        self.set_phase(ActionPhase::Submitting);
        Ok(())
    }

    /// Run `op` against `target`, confirming first when `confirmation` is set
    pub async fn submit<T, F, Fut>(
        &self,
        label: &str,
        target: &str,
        confirmation: Option<Confirmation>,
        op: F,
    ) -> ActionOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Err(early) = self.begin(confirmation.as_ref()).await {
            return early.into();
        }

        let result = op().await;
        self.set_phase(ActionPhase::Idle);

        match result {
            Ok(value) => {
                tracing::info!(action = label, resource = target, "Action succeeded");
                self.notifier.notify(Notice::success(format!("{}: {}", label, target)));
                ActionOutcome::Succeeded(value)
            }
            Err(err) => {
                let err = err.into_action(target);
                tracing::warn!(action = label, resource = target, error = %err, "Action failed");
                self.notifier.notify(Notice::error(err.to_string()));
                ActionOutcome::Failed(err)
            }
        }
    }

    /// Run `op` for every target concurrently and report each result.
    ///
    /// Partial failure still resolves to `Succeeded` with the failures
    /// listed in the report.
    pub async fn submit_batch<F, Fut>(
        &self,
        label: &str,
        targets: Vec<String>,
        confirmation: Option<Confirmation>,
        op: F,
    ) -> ActionOutcome<BatchReport>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if let Err(early) = self.begin(confirmation.as_ref()).await {
            return early.into();
        }

        let results = join_all(targets.iter().cloned().map(&op)).await;
        self.set_phase(ActionPhase::Idle);

        let mut report = BatchReport::default();
        for (target, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => report.succeeded.push(target),
                Err(err) => {
                    let err = err.into_action(&target);
                    report.failed.push((target, err));
                }
            }
        }

        tracing::info!(
            action = label,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Batch action finished"
        );
        self.notifier.notify(report.summary(label));
        ActionOutcome::Succeeded(report)
    }
}

// Dispatch ended before the operation ran
enum Early {
    Busy,
    Cancelled,
}

impl<T> From<Early> for ActionOutcome<T> {
    fn from(early: Early) -> Self {
        match early {
            Early::Busy => ActionOutcome::Busy,
            Early::Cancelled => ActionOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Answer(bool);

    #[async_trait(?Send)]
    impl Confirmer for Answer {
        async fn confirm(&self, _: &Confirmation) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct Inbox(RefCell<Vec<Notice>>);

    impl Notifier for Inbox {
        fn notify(&self, notice: Notice) {
            self.0.borrow_mut().push(notice);
        }
    }

    fn dispatcher(answer: bool) -> (ActionDispatcher, Rc<Inbox>) {
        let inbox = Rc::new(Inbox::default());
        (ActionDispatcher::new(Rc::new(Answer(answer)), inbox.clone()), inbox)
    }

    #[tokio::test]
    async fn test_cancelled_confirmation_skips_op() {
        let (dispatcher, inbox) = dispatcher(false);
        let called = Cell::new(false);

        let outcome = dispatcher
            .submit("Delete", "node-1", Some(Confirmation::delete("node", &["node-1".into()])), || async {
                called.set(true);
                Ok(())
            })
            .await;

        assert_eq!(outcome, ActionOutcome::Cancelled);
        assert!(!called.get());
        assert_eq!(dispatcher.phase(), ActionPhase::Idle);
        assert!(inbox.0.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_failure_returns_to_idle_with_notice() {
        let (dispatcher, inbox) = dispatcher(true);

        let outcome: ActionOutcome<()> = dispatcher
            .submit("Cordon", "node-1", None, || async {
                Err(ConsoleError::Http {
                    status: 403,
                    body: "forbidden".into(),
                })
            })
            .await;

        assert!(matches!(outcome, ActionOutcome::Failed(ConsoleError::Action { .. })));
        assert_eq!(dispatcher.phase(), ActionPhase::Idle);
        assert_eq!(inbox.0.borrow()[0], Notice::error("node-1: forbidden"));
    }

    #[tokio::test]
    async fn test_phases_are_published() {
        let (dispatcher, _) = dispatcher(true);
        let phases = Rc::new(RefCell::new(Vec::new()));
        let sink = phases.clone();
        dispatcher.subscribe(move |p| sink.borrow_mut().push(*p));

        let _ = dispatcher
            .submit("Delete", "x", Some(Confirmation::delete("pipeline", &["x".into()])), || async { Ok(()) })
            .await;

        assert_eq!(
            *phases.borrow(),
            vec![ActionPhase::Confirming, ActionPhase::Submitting, ActionPhase::Idle]
        );
    }

    #[tokio::test]
    async fn test_batch_reports_each_item() {
        let (dispatcher, inbox) = dispatcher(true);
        let targets = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let outcome = dispatcher
            .submit_batch("Delete", targets, None, |name| async move {
                if name == "b" {
                    Err(ConsoleError::Network("timeout".into()))
                } else {
                    Ok(())
                }
            })
            .await;

        let ActionOutcome::Succeeded(report) = outcome else {
            panic!("batch should resolve with a report");
        };
        assert_eq!(report.succeeded, vec!["a", "c"]);
        assert_eq!(report.failed_names(), vec!["b"]);
        assert_eq!(inbox.0.borrow()[0].level, NoticeLevel::Error);
    }
}
