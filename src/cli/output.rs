//! CLI output formatting

use crate::core::state::{PlanStatus, StepStatus};
use crate::execution::stream::{EventKind, StreamingEvent};
use crate::persistence::ExecutionSummary;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create the step progress bar shown during a run
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Completed => style("COMPLETED").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a plan status for display
pub fn format_status(status: PlanStatus) -> String {
    match status {
        PlanStatus::Created => style("CREATED").dim().to_string(),
        PlanStatus::Running => style("RUNNING").yellow().to_string(),
        PlanStatus::Completed => style("COMPLETED").green().to_string(),
        PlanStatus::Failed => style("FAILED").red().to_string(),
        PlanStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution summary line
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    let status_icon = match summary.status {
        PlanStatus::Completed => CHECK,
        PlanStatus::Failed => CROSS,
        PlanStatus::Running => SPINNER,
        _ => INFO,
    };

    format!(
        "{} {} - {} - {} ({}/{} ok, {} failed)",
        status_icon,
        style(&summary.execution_id.to_string()[..8]).dim(),
        style(truncate(&summary.query, 40)).bold(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
        style(summary.failed_steps).red(),
    )
}

/// Format a streaming event for display
pub fn format_event(event: &StreamingEvent) -> String {
    let step = event.step_id.as_deref().unwrap_or("-");
    match event.kind {
        EventKind::PlanStarted => format!(
            "{} Starting plan: {}",
            ROCKET,
            style(&event.content).bold()
        ),
        EventKind::StepStarted => format!("{} {}", SPINNER, style(step).cyan()),
        EventKind::StepProgress => format!("  {}", style(&event.content).dim()),
        EventKind::ToolStarted => format!(
            "{} {} tool {}",
            INFO,
            style(step).dim(),
            style(&event.content).cyan()
        ),
        EventKind::ToolEnded => format!(
            "{} {} tool {} finished",
            INFO,
            style(step).dim(),
            style(&event.content).cyan()
        ),
        EventKind::StepRetrying => format!(
            "{} {} ({})",
            WARN,
            style(step).yellow(),
            event.content
        ),
        EventKind::StepCompleted => format!("{} {}", CHECK, style(step).green()),
        EventKind::StepFailed => format!(
            "{} {}: {}",
            CROSS,
            style(step).red(),
            style(&event.content).dim()
        ),
        EventKind::StepSkipped => format!(
            "{} {} skipped ({})",
            INFO,
            style(step).dim(),
            event.content
        ),
        EventKind::PlanCompleted => format!("{} {}", INFO, style(&event.content).bold()),
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{} ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}…", prefix)
    }
}
