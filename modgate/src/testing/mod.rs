//! Testing utilities for modgate.
//!
//! This module provides:
//! - Module fixtures written to temporary directories
//! - A scripted tool runner that records invocations
//! - A harness that runs a single stage
//! - Assertions for stage outcomes and module reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_failed_with, assert_fatal, assert_passed, assert_skipped, assert_skipped_by_flag,
};
pub use fixtures::{ModuleFixture, StageHarness};
pub use mocks::{RecordedInvocation, ScriptedToolRunner};
