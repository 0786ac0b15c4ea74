//! `codeclock status`: read-only summary of the persisted records.

use chrono::NaiveDate;
use codeclock_core::{
    date_key, format_duration, summarize, summarize_all, TimeStore, TimeSummary,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub date: String,
    pub editor_seconds: u64,
    pub projects: Vec<ProjectStatus>,
    pub all_projects: TimeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStatus {
    pub path: String,
    #[serde(flatten)]
    pub summary: TimeSummary,
}

/// Loads both stores and summarizes them as of `today`.
pub fn build_report(store: &TimeStore, today: NaiveDate) -> StatusReport {
    let global = store.load_global();
    let records = store.load_project_records();

    let projects = records
        .iter()
        .map(|(path, record)| ProjectStatus {
            path: path.clone(),
            summary: summarize(record, today),
        })
        .collect();

    StatusReport {
        date: date_key(today),
        editor_seconds: global.seconds_total,
        projects,
        all_projects: summarize_all(&records, today),
    }
}

pub fn render_text(report: &StatusReport) -> String {
    let path_width = report
        .projects
        .iter()
        .map(|p| p.path.chars().count())
        .max()
        .unwrap_or(0)
        .max("All projects".len());

    let mut out = String::new();
    out.push_str(&format!(
        "Editor open: {}  (as of {})\n\n",
        format_duration(report.editor_seconds),
        report.date
    ));

    if report.projects.is_empty() {
        out.push_str("No projects tracked yet.\n");
        return out;
    }

    out.push_str(&row(path_width, "PROJECT", "TODAY", "14 DAYS", "TOTAL"));
    for project in &report.projects {
        out.push_str(&summary_row(path_width, &project.path, &project.summary));
    }
    out.push_str(&summary_row(path_width, "All projects", &report.all_projects));
    out
}

fn summary_row(width: usize, label: &str, summary: &TimeSummary) -> String {
    row(
        width,
        label,
        &format_duration(summary.today),
        &format_duration(summary.recent_window),
        &format_duration(summary.total),
    )
}

fn row(width: usize, label: &str, today: &str, window: &str, total: &str) -> String {
    format!(
        "{:<width$}  {:>7}  {:>7}  {:>7}\n",
        label,
        today,
        window,
        total,
        width = width
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeclock_core::{GlobalTimerRecord, ProjectRecords, ProjectTimerRecord, StorageConfig};
    use tempfile::TempDir;

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn seeded_store(temp: &TempDir) -> TimeStore {
        let store = TimeStore::new(StorageConfig::with_root(temp.path().to_path_buf()));
        store.save_global(&GlobalTimerRecord::new(7200)).unwrap();

        let mut a = ProjectTimerRecord::default();
        for _ in 0..120 {
            a.record_second("2024-01-11");
        }
        for _ in 0..60 {
            a.record_second("2023-12-01");
        }
        let mut b = ProjectTimerRecord::default();
        b.record_second("2024-01-05");

        let mut records = ProjectRecords::new();
        records.insert("/repo/a".to_string(), a);
        records.insert("/repo/b".to_string(), b);
        store.save_project_records(&records).unwrap();
        store
    }

    #[test]
    fn report_summarizes_each_project_and_the_aggregate() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let report = build_report(&store, day("2024-01-11"));

        assert_eq!(report.date, "2024-01-11");
        assert_eq!(report.editor_seconds, 7200);
        assert_eq!(report.projects.len(), 2);
        assert_eq!(
            report.projects[0].summary,
            TimeSummary {
                today: 120,
                recent_window: 120,
                total: 180
            }
        );
        assert_eq!(
            report.all_projects,
            TimeSummary {
                today: 120,
                recent_window: 121,
                total: 181
            }
        );
    }

    #[test]
    fn text_rendering_uses_short_durations() {
        let temp = TempDir::new().unwrap();
        let report = build_report(&seeded_store(&temp), day("2024-01-11"));

        let text = render_text(&report);

        assert!(text.starts_with("Editor open: 2.0h"));
        assert!(text.contains("/repo/a"));
        assert!(text.contains("All projects"));
        assert!(text.contains("2m"));
    }

    #[test]
    fn empty_store_renders_placeholder() {
        let temp = TempDir::new().unwrap();
        let store = TimeStore::new(StorageConfig::with_root(temp.path().to_path_buf()));

        let text = render_text(&build_report(&store, day("2024-01-11")));

        assert!(text.contains("Editor open: 0m"));
        assert!(text.contains("No projects tracked yet."));
    }

    #[test]
    fn json_shape_flattens_summaries() {
        let temp = TempDir::new().unwrap();
        let report = build_report(&seeded_store(&temp), day("2024-01-11"));

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["editorSeconds"], 7200);
        assert_eq!(json["projects"][0]["path"], "/repo/a");
        assert_eq!(json["projects"][0]["total"], 180);
        assert_eq!(json["allProjects"]["recentWindow"], 121);
    }
}
