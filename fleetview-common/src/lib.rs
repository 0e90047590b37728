//! Core of the fleetview console shared by the browser UI and the CLI
//!
//! Records and their parsing, display projections, list aggregation and
//! action dispatch for the Nodes, Pipelines and Federated Service pages.
//! Nothing in here performs I/O directly: remote calls go through the traits
//! in [`api`], user prompts through the collaborator traits in [`action`].

pub mod action;
pub mod annotations;
pub mod api;
pub mod context;
pub mod controller;
pub mod error;
pub mod federated;
pub mod list;
pub mod meta;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod store;
pub mod units;
pub mod view;

pub use context::ConsoleContext;
pub use error::{ConsoleError, ErrorKind, Result};
pub use list::{ListQuery, ListState, Page};
