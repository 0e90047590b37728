//! Page controllers
//!
//! A controller wires one page's aggregator, projector and dispatcher to its
//! API. Front ends hold a controller behind an `Rc`, forward user intents to
//! it and re-render on every published state.

pub mod nodes;
pub mod pipelines;
pub mod service_detail;

pub use nodes::{NodeSource, NodesController, TaintForm};
pub use pipelines::{PipelineSource, PipelinesController, RunForm};
pub use service_detail::{DetailState, ResourceMode, ServiceDetailController};

use crate::action::{Confirmer, Navigator, Notice, Notifier};
use crate::error::ConsoleError;
use std::rc::Rc;

/// Front-end services a controller calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub confirmer: Rc<dyn Confirmer>,
    pub notifier: Rc<dyn Notifier>,
    pub navigator: Rc<dyn Navigator>,
}

impl Collaborators {
    /// Surface a failed read that an action depended on
    pub(crate) fn report(&self, target: &str, err: ConsoleError) -> ConsoleError {
        let err = err.into_action(target);
        tracing::warn!(resource = target, error = %err, "Could not prepare action");
        self.notifier.notify(Notice::error(err.to_string()));
        err
    }
}
