//! Terminal rendering helpers for session results.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::models::{ConsolidatedResult, HistoryEntry, IterationOutcome};

/// A spinner for live session progress.
pub fn session_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

/// Summary table for a consolidated result.
pub fn summary_table(result: &ConsolidatedResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        Cell::new("Session"),
        Cell::new(result.session_id.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Termination"),
        Cell::new(result.termination.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Iterations"),
        Cell::new(result.iterations.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Best score"),
        Cell::new(
            result
                .best_score
                .map_or_else(|| "not assessed".to_string(), |s| format!("{s:.3}")),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Elapsed"),
        Cell::new(format!("{} ms", result.elapsed_ms)),
    ]);
    table
}

/// Per-iteration history table.
pub fn history_table(history: &[HistoryEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Iter", "Category", "Outcome", "Delta", "Duration"]);
    for entry in history {
        let delta = match entry.outcome {
            IterationOutcome::Applied { delta } | IterationOutcome::Reverted { delta } => {
                format!("{delta:+.3}")
            }
            _ => "--".to_string(),
        };
        table.add_row(vec![
            Cell::new(entry.iteration.to_string()),
            Cell::new(entry.opportunity.category.to_string()),
            Cell::new(entry.outcome.as_str()),
            Cell::new(delta),
            Cell::new(format!("{} ms", entry.duration_ms)),
        ]);
    }
    table
}

/// Styled heading for the final payload section.
pub fn payload_heading() -> String {
    style("Best result").green().bold().to_string()
}
