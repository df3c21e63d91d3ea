//! Plain-text rendering of reports.

use modgate::contracts::{ContractReport, ExtractionResult};
use modgate::core::{ModuleReport, RunReport, StageStatus};
use modgate::suite::{ModuleSuite, ModuleUnderTest};
use std::fmt::Write as _;

const NAME_WIDTH: usize = 14;
const STATUS_WIDTH: usize = 9;

fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Passed => "PASS",
        StageStatus::Failed => "FAIL",
        StageStatus::Skipped => "SKIP",
        StageStatus::Pending | StageStatus::Running => "-",
    }
}

fn module_rows(out: &mut String, module: &ModuleReport) {
    if let Some(fatal) = &module.fatal {
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {} ({}): {}",
            module.module, "FATAL", fatal.stage, fatal.kind, fatal.message
        );
        return;
    }

    for outcome in &module.stages {
        let detail = match (&outcome.skip_reason, outcome.violations.len()) {
            (Some(reason), _) => reason.to_string(),
            (None, 0) => format!("{:.0} ms", outcome.duration_ms),
            (None, n) => format!("{n} violation(s)"),
        };
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {:<10} {}",
            module.module,
            status_label(outcome.status),
            outcome.stage,
            detail
        );
        for violation in &outcome.violations {
            let _ = writeln!(out, "{:NAME_WIDTH$}   - {}", "", violation.replace('\n', " | "));
        }
        for failure in &outcome.cleanup_failures {
            let _ = writeln!(out, "{:NAME_WIDTH$}   ! cleanup: {failure}", "");
        }
        for note in &outcome.notes {
            let _ = writeln!(out, "{:NAME_WIDTH$}   * {note}", "");
        }
    }
}

/// Renders a run as a table followed by a summary line.
pub fn run_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {:<10} DETAIL",
        "MODULE", "STATUS", "STAGE"
    );
    for module in &report.modules {
        module_rows(&mut out, module);
    }

    let summary = report.summary();
    let _ = writeln!(
        out,
        "\n{} passed, {} failed, {} skipped, {} fatal, {} cleanup failure(s)",
        summary.passed, summary.failed, summary.skipped, summary.fatal, summary.cleanup_failures
    );
    out
}

/// Renders the module list.
pub fn suite(suite: &ModuleSuite) -> String {
    let mut out = String::new();
    for module in suite.modules() {
        let _ = writeln!(out, "{:<NAME_WIDTH$} {}", module.name, module.path.display());
    }
    out
}

fn names(result: Option<&ExtractionResult>) -> String {
    match result {
        None => "(file not found)".to_string(),
        Some(found) if found.is_empty() => "(none)".to_string(),
        Some(found) => found
            .symbols()
            .map(|s| {
                if s.has_default {
                    format!("{} (default)", s.name)
                } else {
                    s.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Renders what was extracted from one module and how it compares.
pub fn extraction(
    module: &ModuleUnderTest,
    inputs: Option<&ExtractionResult>,
    outputs: Option<&ExtractionResult>,
    report: &ContractReport,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module:  {} ({})", module.name, module.path.display());
    let _ = writeln!(out, "inputs:  {}", names(inputs));
    let _ = writeln!(out, "outputs: {}", names(outputs));

    if report.is_satisfied() {
        let _ = writeln!(out, "contract: satisfied");
    } else {
        let _ = writeln!(out, "contract: {} violation(s)", report.violations.len());
        for message in report.violation_messages() {
            let _ = writeln!(out, "  - {message}");
        }
    }
    for note in report.undocumented_notes() {
        let _ = writeln!(out, "  * {note}");
    }
    out
}
