use crate::core::{models::HostAssessment, state::RunState};
use crate::fingerprint::cvedb;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::{Path, PathBuf};

const REPORT_TEMPLATE: &str = include_str!("../../templates/markdown/report.md.j2");

/// One line of `results.jsonl`.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub host: String,
    pub open_ports: Vec<u16>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_header: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub login_pages: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub brand: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cves: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cve_links: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub found_cred: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rtsp_server: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rtsp_public: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mjpeg_streams: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub onvif: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&HostAssessment> for ReportRecord {
    fn from(a: &HostAssessment) -> Self {
        let mut login_pages = a.login_urls.clone();
        login_pages.sort();
        let mut mjpeg_streams = a.mjpeg_urls.clone();
        mjpeg_streams.sort();

        Self {
            host: a.host.clone(),
            open_ports: a.ports.clone(),
            server_header: a.http.server.clone(),
            login_pages,
            brand: a.vendor.clone(),
            note: a.note.clone(),
            cves: a.vulnerabilities.clone(),
            cve_links: cvedb::links(&a.vulnerabilities),
            found_cred: a.credential.clone(),
            rtsp_server: a.rtsp.server.clone(),
            rtsp_public: a.rtsp.public.clone(),
            mjpeg_streams,
            onvif: a.onvif.clone(),
            error: a.error.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub jsonl: PathBuf,
    pub markdown: PathBuf,
}

/// Sorts by host, then writes `results.jsonl` and `report.md` into `out_dir`.
pub fn write_all(assessments: &[HostAssessment], state: &RunState, out_dir: &Path) -> Result<ReportPaths> {
    let mut records: Vec<ReportRecord> = assessments.iter().map(ReportRecord::from).collect();
    records.sort_by(|a, b| a.host.cmp(&b.host));

    let paths = ReportPaths {
        jsonl: out_dir.join("results.jsonl"),
        markdown: out_dir.join("report.md"),
    };

    let jsonl = render_jsonl(&records)?;
    atomic_write(&paths.jsonl, jsonl.as_bytes())?;

    let markdown = render_markdown(&records, state)?;
    atomic_write(&paths.markdown, markdown.as_bytes())?;

    tracing::info!(
        "Wrote {} record(s) to {} and {}",
        records.len(),
        paths.jsonl.display(),
        paths.markdown.display()
    );
    Ok(paths)
}

fn render_jsonl(records: &[ReportRecord]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record).context("Failed to serialize result record")?);
        out.push('\n');
    }
    Ok(out)
}

fn render_markdown(records: &[ReportRecord], state: &RunState) -> Result<String> {
    let mut env = Environment::new();
    env.add_filter("format_duration", |ms: u64| {
        let secs = ms as f64 / 1000.0;
        if secs < 60.0 {
            format!("{:.1}s", secs)
        } else if secs < 3600.0 {
            format!("{:.1}m", secs / 60.0)
        } else {
            format!("{:.1}h", secs / 3600.0)
        }
    });
    env.add_template("report.md", REPORT_TEMPLATE)
        .context("Failed to load report template")?;

    let template = env.get_template("report.md")?;
    let rendered = template
        .render(context! {
            state => state,
            started => state.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            records => records,
        })
        .context("Failed to render report.md")?;
    Ok(rendered)
}
