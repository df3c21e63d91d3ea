//! # Modgate
//!
//! Contract validation and staged test orchestration for declarative router
//! modules.
//!
//! Modgate checks that each module keeps its published interface and that it
//! still initializes, validates, plans and (optionally) applies:
//!
//! - **Contract checks**: declared inputs and outputs are extracted from the
//!   module's declaration files and diffed against an expected contract
//! - **Staged pipeline**: structure, syntax, plan and apply run in order, each
//!   producing an outcome with every violation it found
//! - **Layered gating**: per-module, per-stage and global flags decide what
//!   runs; mutating stages need two explicit opt-ins
//! - **Ephemeral workspaces**: plan and apply run in throwaway directories
//!   that are always removed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modgate::prelude::*;
//!
//! let config = RunConfig::from_env()?;
//! let suite = ModuleSuite::builtin(&config.modules_root)
//!     .select(config.module_filter.as_deref())?;
//!
//! let report = Orchestrator::from_config(&config)?
//!     .with_events(Arc::new(LoggingEventSink::default()))
//!     .run_all(&suite)
//!     .await;
//! assert!(report.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod contracts;
pub mod core;
pub mod errors;
pub mod events;
pub mod gate;
pub mod pipeline;
pub mod stages;
pub mod suite;
pub mod testing;
pub mod tool;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BackendSettings, Credentials, RunConfig, ToolConfig};
    pub use crate::contracts::{
        validate_contract, ContractExtractor, ContractReport, ContractViolation, ModuleContract,
    };
    pub use crate::core::{
        FatalRecord, ModuleReport, RunReport, RunSummary, SkipReason, StageName, StageOutcome,
        StageStatus,
    };
    pub use crate::errors::ModgateError;
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::gate::{ExecutionDecision, ExecutionGate, GateFlags};
    pub use crate::pipeline::Orchestrator;
    pub use crate::stages::{Stage, StageContext};
    pub use crate::suite::{ModuleSuite, ModuleUnderTest};
    pub use crate::tool::{TerraformCli, ToolCommand, ToolOutput, ToolRunner};
    pub use crate::workspace::{Workspace, WorkspaceProvisioner};
}
