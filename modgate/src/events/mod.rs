//! Lifecycle events.
//!
//! Sinks are injected into the orchestrator; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// A module run began.
pub const MODULE_STARTED: &str = "module.started";
/// A module run finished with stage outcomes.
pub const MODULE_COMPLETED: &str = "module.completed";
/// A module was aborted by a fatal error.
pub const MODULE_FATAL: &str = "module.fatal";
/// A stage body began.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage body finished.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage was skipped.
pub const STAGE_SKIPPED: &str = "stage.skipped";
/// Declarations were found that the contract does not document.
pub const CONTRACT_UNDOCUMENTED: &str = "contract.undocumented";
/// A workspace directory could not be removed.
pub const WORKSPACE_CLEANUP_FAILED: &str = "workspace.cleanup_failed";
/// Destroy failed after apply; live resources may be orphaned.
pub const APPLY_DESTROY_FAILED: &str = "apply.destroy_failed";
