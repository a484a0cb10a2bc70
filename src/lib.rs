//! # Tabflow
//!
//! Tabflow is the execution core of a visual data-transformation pipeline.
//! A workflow is a directed acyclic graph of typed nodes (readers, writers,
//! table manipulations and flow variables); the engine runs it in dependency
//! order and reports a result for every node.
//!
//! ## Core Features
//!
//! - **Typed Parameters**: Node options are declared once per node type and validated before a node runs
//! - **Node-Link Documents**: Workflows round-trip through JSON with unknown attributes preserved
//! - **Failure Isolation**: A failing node skips its descendants while independent branches keep running
//! - **Flow Variables**: Flow nodes publish values that override options of the nodes below them
//! - **Async Execution**: Powered by `tokio`, independent branches run concurrently
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabflow::{EngineBuilder, RunOptions, Workflow};
//!
//! let engine = EngineBuilder::new().build()?;
//! let workflow = Workflow::from_json(json_str)?;
//! let report = engine.run(&workflow, RunOptions::default())?;
//!
//! for (nid, result) in report.results.iter() {
//!     println!("{}: {}", nid, result.state.as_ref());
//! }
//! ```

mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod model;
mod runtime;
mod utils;
mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::Vars;
pub use config::{Config, ExecutionConfig, ExecutionMode};
pub use engine::Engine;
pub use error::TabflowError;
pub use events::*;
pub use model::*;
pub use runtime::{Channel, ChannelEvent, ChannelOptions, RunHandle, RunId, RunOptions, RunReport, RunStatus};
pub use workflow::{
    Action, Arity, Artifact, Catalog, FlowVariable, Header, Node, NodeCategory, NodeDescriptor, NodeId, NodeRegistry, NodeResult, NodeState, NodeTypeInfo, Parameter,
    ParameterType, Table, Workflow, actions,
};

/// Result type alias for Tabflow operations.
pub type Result<T> = std::result::Result<T, TabflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
