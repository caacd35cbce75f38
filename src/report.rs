//! CSV export of a period's completion summaries.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    stats::{CompletionSummary, PeriodView},
    traits::Clock,
};

/// Label of the row carrying the summary over all habits.
pub const OVERALL_LABEL: &str = "ALL";

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    habit: &'a str,
    completed: u32,
    total: u32,
    percentage: u32,
}

impl<'a> ReportRow<'a> {
    fn new(habit: &'a str, summary: &CompletionSummary) -> Self {
        Self {
            habit,
            completed: summary.completed,
            total: summary.total,
            percentage: summary.percentage,
        }
    }
}

/// Write one row per habit followed by the overall row.
pub fn write_csv<W: Write>(writer: W, view: &PeriodView) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    for row in &view.rows {
        csv.serialize(ReportRow::new(&row.habit.name, &row.summary))
            .with_context(|| format!("Failed to write report row for `{}`", row.habit.name))?;
    }
    csv.serialize(ReportRow::new(OVERALL_LABEL, &view.overall))
        .context("Failed to write overall report row")?;

    csv.flush().context("Failed to flush report")?;
    Ok(())
}

/// File name for a report generated at the clock's current time.
pub fn report_file_name<C: Clock>(view: &PeriodView, clock: &C) -> String {
    format!(
        "habit_report_{}_{}.csv",
        view.period.granularity,
        clock.now_utc().format("%Y%m%d_%H%M%S")
    )
}

/// Write the report for `view` into `dir` and return the created path.
pub async fn export_csv<C: Clock>(dir: &Path, view: &PeriodView, clock: &C) -> Result<PathBuf> {
    let path = dir.join(report_file_name(view, clock));
    let view = view.clone();
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        write_csv(std::io::BufWriter::new(file), &view)
    })
    .await
    .context("Report task panicked")??;

    tracing::info!(path = %path.display(), "exported report");
    Ok(path)
}
