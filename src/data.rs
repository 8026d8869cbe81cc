// src/data.rs - Per-session selection log with CSV export and a text summary
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::progress::ProgressEvent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionRecord {
    pub timestamp_ms: u64,
    pub activity: String,
    pub step: usize,
    pub region: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub selections: usize,
    pub accepted: usize,
    pub retries: usize,
    pub rejections: usize,
    pub ignored: usize,
    pub duration_ms: u64,
}

pub fn outcome_label(event: &ProgressEvent) -> &'static str {
    match event {
        ProgressEvent::Ignored => "ignored",
        ProgressEvent::Advanced { .. } => "advanced",
        ProgressEvent::Retry { .. } => "retry",
        ProgressEvent::Rejected { .. } => "rejected",
        ProgressEvent::Finished => "finished",
    }
}

pub struct SessionRecorder {
    session_name: String,
    records: Vec<SelectionRecord>,
    first_frame_ms: Option<u64>,
    last_frame_ms: Option<u64>,
}

impl SessionRecorder {
    pub fn new(session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            let id = Uuid::new_v4().simple().to_string();
            format!(
                "session_{}_{}",
                Local::now().format("%Y%m%d_%H%M%S"),
                &id[..8]
            )
        });

        Self {
            session_name,
            records: Vec::new(),
            first_frame_ms: None,
            last_frame_ms: None,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.session_name)
    }

    /// Note a processed frame; the summary's duration spans these.
    pub fn observe_frame(&mut self, timestamp_ms: u64) {
        self.first_frame_ms.get_or_insert(timestamp_ms);
        self.last_frame_ms = Some(timestamp_ms);
    }

    pub fn record(&mut self, timestamp_ms: u64, activity: &str, step: usize, region: &str, event: &ProgressEvent) {
        self.records.push(SelectionRecord {
            timestamp_ms,
            activity: activity.to_string(),
            step,
            region: region.to_string(),
            outcome: outcome_label(event).to_string(),
        });
    }

    pub fn records(&self) -> &[SelectionRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            selections: self.records.len(),
            duration_ms: match (self.first_frame_ms, self.last_frame_ms) {
                (Some(first), Some(last)) => last - first,
                _ => 0,
            },
            ..Default::default()
        };
        for record in &self.records {
            match record.outcome.as_str() {
                "advanced" | "finished" => summary.accepted += 1,
                "retry" => summary.retries += 1,
                "rejected" => summary.rejections += 1,
                _ => summary.ignored += 1,
            }
        }
        summary
    }

    pub fn export_csv(&self, output_dir: &Path) -> Result<PathBuf> {
        let csv_path = self.session_dir(output_dir).join("selections.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!("Exported {} selections to {}", self.records.len(), csv_path.display());
        Ok(csv_path)
    }

    pub fn write_summary(&self, output_dir: &Path) -> Result<PathBuf> {
        let summary_path = self.session_dir(output_dir).join("summary.txt");

        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&summary_path, self.summary_text())?;
        Ok(summary_path)
    }

    fn summary_text(&self) -> String {
        let summary = self.summary();
        let mut text = String::new();
        let _ = writeln!(text, "Session: {}", self.session_name);
        let _ = writeln!(text, "Selections: {}", summary.selections);
        let _ = writeln!(text, "Accepted: {}", summary.accepted);
        let _ = writeln!(text, "Retries: {}", summary.retries);
        let _ = writeln!(text, "Rejections: {}", summary.rejections);
        let _ = writeln!(text, "Ignored: {}", summary.ignored);
        let _ = writeln!(text, "Duration: {:.1} s", summary.duration_ms as f64 / 1000.0);
        text
    }

    /// CSV plus summary. Skipped without an output directory or when
    /// nothing was selected.
    pub fn export(&self, output_dir: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(output_dir) = output_dir else {
            return Ok(None);
        };
        if self.records.is_empty() {
            return Ok(None);
        }
        self.export_csv(output_dir)?;
        self.write_summary(output_dir)?;
        Ok(Some(self.session_dir(output_dir)))
    }
}
