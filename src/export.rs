//! Export functionality for review sessions
//!
//! Produces a markdown report for humans and a JSON session document for
//! tools. Both are computed from the session without mutating it.

use crate::diff::{Hunk, HunkId, LineKind};
use crate::host::FileWriter;
use crate::review::{
    FileVersion, Outcome, ReviewComment, ReviewSession, SelectionRange, StagingStatus, Verdict,
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Schema version of the session document
pub const SESSION_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Group hunks by file, keeping diff order within each file
fn hunks_by_file(session: &ReviewSession) -> BTreeMap<&str, Vec<&Hunk>> {
    let mut by_file: BTreeMap<&str, Vec<&Hunk>> = BTreeMap::new();
    for hunk in &session.hunks {
        by_file.entry(hunk.file.as_str()).or_default().push(hunk);
    }
    by_file
}

/// Render the review as a markdown report
pub fn export_report(session: &ReviewSession, now: DateTime<Utc>) -> String {
    let mut output = String::new();
    output.push_str("# Code Review\n\n");
    output.push_str(&format!("_Generated: {}_\n\n", now.format("%Y-%m-%d %H:%M UTC")));

    if let Some(request) = &session.original_request {
        output.push_str("## Original Request\n\n");
        for line in request.lines() {
            output.push_str(&format!("> {}\n", line));
        }
        output.push('\n');
    }

    if let Some(feedback) = &session.overall_feedback {
        output.push_str("## Overall Feedback\n\n");
        output.push_str(feedback);
        output.push_str("\n\n");
    }

    output.push_str("## Summary\n\n");
    for (verdict, count) in session.verdict_counts() {
        output.push_str(&format!("- {}: {}\n", verdict.label(), count));
    }
    output.push_str(&format!(
        "- {} hunks in {} files, {} staged\n\n",
        session.hunks.len(),
        session.file_count(),
        session.staged_count()
    ));

    if session.hunks.is_empty() {
        output.push_str("_No changes to review._\n");
        return output;
    }

    for (file, hunks) in hunks_by_file(session) {
        output.push_str(&format!("## {}\n\n", file));

        for hunk in hunks {
            let title = if hunk.context.is_empty() {
                format!("Line {}", hunk.new_start)
            } else {
                format!("Line {}: {}", hunk.new_start, hunk.context)
            };
            output.push_str(&format!("### {}\n\n", title));
            output.push_str(&format!("**Verdict:** {}", hunk.verdict.label()));
            if hunk.status != StagingStatus::Pending {
                output.push_str(&format!(" ({})", hunk.status.as_str()));
            }
            output.push_str("\n\n");

            for comment in session.comments_for(&hunk.id) {
                push_comment(&mut output, comment);
            }
        }
    }

    output
}

fn push_comment(output: &mut String, comment: &ReviewComment) {
    let label = comment.line_label().unwrap_or_else(|| "[hunk]".to_string());
    let mut lines = comment.text.lines();
    output.push_str(&format!("- **{}** {}\n", label, lines.next().unwrap_or("")));
    for line in lines {
        output.push_str(&format!("  {}\n", line));
    }

    if let Some(content) = &comment.line_content {
        output.push_str(&format!("  > {}\n", code_span(content)));
    }
    if let Some(selection) = &comment.selection {
        output.push_str(&format!(
            "  _Lines {}-{} ({})_\n",
            selection.start_line,
            selection.end_line,
            match selection.version {
                FileVersion::Old => "old",
                FileVersion::New => "new",
            }
        ));
    }
    output.push('\n');
}

/// Inline code span whose fence is longer than any backtick run in `content`
fn code_span(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let pad = if content.starts_with('`') || content.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{pad}{content}{pad}{fence}")
}

#[derive(Serialize)]
struct SessionDocument<'a> {
    version: u32,
    timestamp: String,
    original_request: Option<&'a str>,
    overall_feedback: Option<&'a str>,
    files: BTreeMap<&'a str, FileEntry<'a>>,
}

#[derive(Serialize)]
struct FileEntry<'a> {
    hunks: Vec<HunkEntry<'a>>,
}

#[derive(Serialize)]
struct HunkEntry<'a> {
    id: &'a HunkId,
    context: &'a str,
    old_lines: [u32; 2],
    new_lines: [u32; 2],
    status: Verdict,
    staging: StagingStatus,
    comments: Vec<CommentEntry<'a>>,
}

#[derive(Serialize)]
struct CommentEntry<'a> {
    id: Uuid,
    text: &'a str,
    line_type: Option<LineKind>,
    old_line: Option<u32>,
    new_line: Option<u32>,
    line_content: Option<&'a str>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<SelectionRange>,
}

impl<'a> From<&'a ReviewComment> for CommentEntry<'a> {
    fn from(c: &'a ReviewComment) -> Self {
        Self {
            id: c.id,
            text: &c.text,
            line_type: c.line_type,
            old_line: c.old_line,
            new_line: c.new_line,
            line_content: c.line_content.as_deref(),
            created_at: c.created_at,
            selection: c.selection,
        }
    }
}

/// Serialize the review as a JSON session document
pub fn export_session(session: &ReviewSession, now: DateTime<Utc>) -> Result<String, ExportError> {
    let files = hunks_by_file(session)
        .into_iter()
        .map(|(file, hunks)| {
            let hunks = hunks
                .into_iter()
                .map(|hunk| HunkEntry {
                    id: &hunk.id,
                    context: &hunk.context,
                    old_lines: hunk.old_range(),
                    new_lines: hunk.new_range(),
                    status: hunk.verdict,
                    staging: hunk.status,
                    comments: session.comments_for(&hunk.id).map(CommentEntry::from).collect(),
                })
                .collect();
            (file, FileEntry { hunks })
        })
        .collect();

    let document = SessionDocument {
        version: SESSION_VERSION,
        timestamp: now.to_rfc3339(),
        original_request: session.original_request.as_deref(),
        overall_feedback: session.overall_feedback.as_deref(),
        files,
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Export in the chosen format
pub fn export(
    session: &ReviewSession,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Markdown => Ok(export_report(session, now)),
        ExportFormat::Json => export_session(session, now),
    }
}

/// Write both documents through `writer`.
///
/// Failures are reported in the outcome; a document that failed to write
/// should not be trusted.
pub fn write_exports(
    session: &ReviewSession,
    writer: &dyn FileWriter,
    report_path: &Path,
    session_path: &Path,
    now: DateTime<Utc>,
) -> Outcome {
    match try_write_exports(session, writer, report_path, session_path, now) {
        Ok(()) => {
            info!(
                "Exported review to {} and {}",
                report_path.display(),
                session_path.display()
            );
            Outcome::Applied(format!("Exported to {}", report_path.display()))
        }
        Err(e) => {
            warn!("Export failed: {}", e);
            Outcome::Skipped(format!("Export failed: {}", e))
        }
    }
}

fn try_write_exports(
    session: &ReviewSession,
    writer: &dyn FileWriter,
    report_path: &Path,
    session_path: &Path,
    now: DateTime<Utc>,
) -> Result<(), ExportError> {
    let report = export_report(session, now);
    let document = export_session(session, now)?;

    for (path, content) in [(report_path, &report), (session_path, &document)] {
        writer
            .write_file(path, content)
            .map_err(|source| ExportError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}
