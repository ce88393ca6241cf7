//! Markdown summary generation
//!
//! This module renders a human-readable markdown summary of one sync:
//! the crawl counters and, when the index was reconciled, the diff.

use crate::index::ReconcileReport;
use crate::output::CrawlStatistics;
use crate::SyncError;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Everything the markdown summary shows
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub run_id: i64,
    pub crawler_name: String,
    pub index_name: String,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub crawl: CrawlStatistics,
    pub aborted: bool,
    pub pending: usize,

    /// `None` when the index was not reconciled
    pub reconcile: Option<ReconcileReport>,

    /// The diff was computed but not written
    pub dry_run: bool,
}

impl SyncSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Writes the markdown summary to `output_path`
pub fn write_markdown_summary(summary: &SyncSummary, output_path: &Path) -> Result<(), SyncError> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Summary written to {}", output_path.display());
    Ok(())
}

/// Formats a sync summary as markdown
pub fn format_markdown_summary(summary: &SyncSummary) -> String {
    let mut md = String::new();

    md.push_str("# Site Sync Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Crawler**: {}\n", summary.crawler_name));
    md.push_str(&format!("- **Index**: {}\n", summary.index_name));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    let status = if summary.aborted { "aborted" } else { "completed" };
    md.push_str(&format!("- **Crawl Status**: {}\n", status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Crawl
    let crawl = &summary.crawl;
    md.push_str("## Crawl Statistics\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Seeds Enqueued | {} |\n", crawl.seeds_enqueued));
    md.push_str(&format!("| Pages Done | {} |\n", crawl.pages_done));
    md.push_str(&format!("| Pages Failed | {} |\n", crawl.pages_failed));
    md.push_str(&format!("| Retries | {} |\n", crawl.retries));
    md.push_str(&format!("| Records Persisted | {} |\n", crawl.records_persisted));
    md.push_str(&format!("| Records Dropped | {} |\n", crawl.records_dropped));
    md.push_str(&format!("| Failure Records | {} |\n", crawl.failure_records));
    md.push_str(&format!("| Links Enqueued | {} |\n", crawl.links_enqueued));
    if summary.aborted {
        md.push_str(&format!("| Requests Left Pending | {} |\n", summary.pending));
    }
    md.push_str(&format!(
        "\n- **Success Rate**: {:.2}%\n\n",
        crawl.success_rate()
    ));

    // Index
    md.push_str("## Index Reconciliation\n\n");
    match &summary.reconcile {
        None => md.push_str("Index was not reconciled.\n"),
        Some(report) => {
            md.push_str(&format!("- **Snapshot Records**: {}\n", report.snapshot_size));
            md.push_str(&format!("- **Crawled Records**: {}\n\n", report.crawled));

            md.push_str("| Operation | Planned | Written |\n");
            md.push_str("|-----------|---------|---------|\n");
            md.push_str(&format!(
                "| Add | {} | {} |\n",
                report.to_add, report.write.added
            ));
            md.push_str(&format!(
                "| Update | {} | {} |\n",
                report.to_update, report.write.updated
            ));
            md.push_str(&format!(
                "| Remove | {} | {} |\n",
                report.to_remove, report.write.removed
            ));

            if summary.dry_run {
                md.push_str("\nDry run: nothing was written to the index.\n");
            }
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::WriteReport;
    use chrono::TimeZone;

    fn create_test_summary() -> SyncSummary {
        SyncSummary {
            run_id: 7,
            crawler_name: "docs".to_string(),
            index_name: "docs-index".to_string(),
            config_hash: "abc123".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap(),
            crawl: CrawlStatistics {
                seeds_enqueued: 1,
                pages_done: 40,
                pages_failed: 2,
                records_persisted: 40,
                ..Default::default()
            },
            aborted: false,
            pending: 0,
            reconcile: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let summary = create_test_summary();
        let markdown = format_markdown_summary(&summary);

        assert!(markdown.contains("# Site Sync Summary"));
        assert!(markdown.contains("- **Run ID**: 7"));
        assert!(markdown.contains("- **Duration**: 120 seconds"));
        assert!(markdown.contains("| Pages Done | 40 |"));
        assert!(markdown.contains("Index was not reconciled."));
        assert!(!markdown.contains("Requests Left Pending"));
    }

    #[test]
    fn test_markdown_with_reconcile_report() {
        let mut summary = create_test_summary();
        summary.reconcile = Some(ReconcileReport {
            snapshot_size: 38,
            crawled: 40,
            to_add: 3,
            to_update: 5,
            to_remove: 1,
            write: WriteReport {
                added: 3,
                updated: 5,
                removed: 1,
                ..Default::default()
            },
        });

        let markdown = format_markdown_summary(&summary);

        assert!(markdown.contains("- **Snapshot Records**: 38"));
        assert!(markdown.contains("| Add | 3 | 3 |"));
        assert!(markdown.contains("| Update | 5 | 5 |"));
        assert!(markdown.contains("| Remove | 1 | 1 |"));
        assert!(!markdown.contains("Dry run"));
    }

    #[test]
    fn test_markdown_for_aborted_dry_run() {
        let mut summary = create_test_summary();
        summary.aborted = true;
        summary.pending = 12;
        summary.dry_run = true;
        summary.reconcile = Some(ReconcileReport {
            to_add: 2,
            ..Default::default()
        });

        let markdown = format_markdown_summary(&summary);

        assert!(markdown.contains("- **Crawl Status**: aborted"));
        assert!(markdown.contains("| Requests Left Pending | 12 |"));
        assert!(markdown.contains("| Add | 2 | 0 |"));
        assert!(markdown.contains("Dry run: nothing was written"));
    }

    #[test]
    fn test_write_markdown_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        write_markdown_summary(&create_test_summary(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Site Sync Summary"));
    }
}
