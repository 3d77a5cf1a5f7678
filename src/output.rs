use std::io::{self, Write};

use serde::Serialize;

use crate::payload::{AuthSession, DatasetSummary, Insight, Segmentation, StatsSummary};
use crate::upload::UploadStatus;
use crate::view::ViewModel;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_dashboard(view: &ViewModel) -> io::Result<()> {
        Self::print_json(view)
    }

    pub fn print_upload(status: &UploadStatus, summary: Option<&DatasetSummary>) -> io::Result<()> {
        #[derive(Serialize)]
        struct UploadReport<'a> {
            status: &'a UploadStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            summary: Option<&'a DatasetSummary>,
        }
        Self::print_json(&UploadReport { status, summary })
    }

    pub fn print_segmentation(result: &Segmentation) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_insights(result: &[Insight]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_stats(result: &StatsSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_login(session: &AuthSession) -> io::Result<()> {
        Self::print_json(session)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Plain-text rendering of a dashboard load for interactive use. The console
/// stays dumb: it prints whatever sections the view model carries and nothing
/// else.
pub fn render_dashboard(view: &ViewModel) -> String {
    if view.empty {
        return "No data available. Upload datasets to view the dashboard.\n".to_string();
    }

    let mut out = String::new();
    for section in &view.sections {
        out.push_str(&format!("== {} ==\n", section.title));
        for kpi in &section.kpis {
            out.push_str(&format!("  {}: {}\n", kpi.label, kpi.value));
        }
        if let Some(series) = &section.series {
            out.push_str(&format!(
                "  {} — {} rows by {}\n",
                series.label,
                series.points.len(),
                series.category_key
            ));
        }
    }

    if let Some(selected) = view.selected {
        out.push_str(&format!("\nSegmentation and insights driven by: {selected}\n"));
    }
    if let Some(segmentation) = &view.segmentation {
        for cluster in &segmentation.clusters {
            out.push_str(&format!(
                "  cluster {} ({} items)\n",
                cluster.cluster_id, cluster.size
            ));
        }
    }
    for insight in &view.insights {
        out.push_str(&format!(
            "  [{:?}] {}: {}\n",
            insight.impact, insight.category, insight.insight
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DashboardData;
    use crate::view::assemble;

    #[test]
    fn empty_dashboard_renders_single_empty_state() {
        let view = assemble(&DashboardData::default(), "$");
        let text = render_dashboard(&view);
        assert!(text.contains("No data available"));
        assert_eq!(text.lines().count(), 1);
    }
}
