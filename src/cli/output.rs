//! Output formatting for CLI

use crate::models::{ImportReport, WorkerState};

/// Format an import report as human-readable text
#[must_use]
pub fn format_text(report: &ImportReport) -> String {
    let mut lines = vec![
        format!("Job:          {}", report.job_name),
        format!("Repository:   {}", report.repository),
        format!("Destination:  {}", report.destination_path),
        format!("Documents:    {}", report.created),
        format!(
            "Elapsed:      {} ({:.1} docs/s)",
            format_elapsed(report.elapsed_ms),
            report.average_docs_per_sec
        ),
        format!(
            "Workers:      {} ({} failed)",
            report.workers.len(),
            report.failed_workers
        ),
    ];

    if !report.workers.is_empty() {
        let thread_width = report
            .workers
            .iter()
            .map(|w| w.thread_name.len())
            .max()
            .unwrap_or(6)
            .max(6);

        lines.push(String::new());
        lines.push(format!(
            "{:<6} {:<thread_width$} {:<10} {:>9} {:>8}  ROOT",
            "TASK", "THREAD", "STATE", "CREATED", "COMMITS"
        ));
        lines.extend(report.workers.iter().map(|worker| {
            format!(
                "{:<6} {:<thread_width$} {:<10} {:>9} {:>8}  {}",
                worker.task_id,
                worker.thread_name,
                worker.state.as_str(),
                worker.committed,
                worker.commit_cycles,
                worker.root_path
            )
        }));

        let failures: Vec<_> = report
            .workers
            .iter()
            .filter(|w| w.state == WorkerState::Failed)
            .collect();
        if !failures.is_empty() {
            lines.push(String::new());
            lines.push("Errors:".to_string());
            for worker in failures {
                lines.push(format!(
                    "  {}: {}",
                    worker.task_id,
                    worker.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Format an import report as JSON
pub fn format_json(report: &ImportReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Format milliseconds as `1.2s` or `3m04s`
#[must_use]
pub fn format_elapsed(elapsed_ms: u64) -> String {
    if elapsed_ms < 60_000 {
        #[allow(clippy::cast_precision_loss)]
        let secs = elapsed_ms as f64 / 1000.0;
        format!("{secs:.1}s")
    } else {
        let total_secs = elapsed_ms / 1000;
        format!("{}m{:02}s", total_secs / 60, total_secs % 60)
    }
}
