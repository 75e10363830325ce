//! Review session state: per-hunk staging and verdicts plus line comments
//!
//! The session is an explicit value owned by the caller. Every user action is
//! a method on it that either applies or reports why it could not; unknown
//! hunk ids are never errors.

use crate::diff::{parse_diff, DiffSource, DiffSourceError, Hunk, HunkId, LineKind};
use crate::render::{LineRef, SegmentTag};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Whether a hunk is kept, dropped, or undecided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingStatus {
    #[default]
    Pending,
    Staged,
    Discarded,
}

impl StagingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Staged => "staged",
            Self::Discarded => "discarded",
        }
    }
}

/// Reviewer's judgment on a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[default]
    Pending,
    Approved,
    NeedsChanges,
    Rejected,
    Question,
}

impl Verdict {
    pub const ALL: [Verdict; 5] = [
        Verdict::Approved,
        Verdict::NeedsChanges,
        Verdict::Rejected,
        Verdict::Question,
        Verdict::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::NeedsChanges => "needs_changes",
            Self::Rejected => "rejected",
            Self::Question => "question",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::NeedsChanges => "NEEDS CHANGES",
            Self::Rejected => "REJECTED",
            Self::Question => "QUESTION",
        }
    }
}

/// Which file version a multi-line selection refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileVersion {
    Old,
    New,
}

/// Inclusive line range selected when the comment was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionRange {
    pub start_line: u32,
    pub end_line: u32,
    pub version: FileVersion,
}

impl SelectionRange {
    /// Selection spanning two line references, if both live on a common side.
    /// The new side wins when both lines have new-file numbers.
    pub fn between(a: &LineRef, b: &LineRef) -> Option<Self> {
        let (version, x, y) = match (a.new_line, b.new_line, a.old_line, b.old_line) {
            (Some(x), Some(y), _, _) => (FileVersion::New, x, y),
            (_, _, Some(x), Some(y)) => (FileVersion::Old, x, y),
            _ => return None,
        };

        Some(Self {
            start_line: x.min(y),
            end_line: x.max(y),
            version,
        })
    }
}

/// Where a new comment gets anchored: a hunk and, optionally, one of its lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext {
    pub hunk_id: HunkId,
    pub file: String,
    pub line: Option<LineRef>,
}

impl LineContext {
    /// Derive the anchor from the semantic tag under the cursor.
    /// Rows outside any hunk (banners, help) have no context.
    pub fn from_tag(tag: &SegmentTag) -> Option<Self> {
        Some(Self {
            hunk_id: tag.hunk_id.clone()?,
            file: tag.file.clone()?,
            line: tag.line.clone(),
        })
    }
}

/// A free-text annotation on a hunk, optionally pinned to one of its lines
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewComment {
    pub id: Uuid,
    /// Owning hunk, used for grouping
    pub hunk_id: HunkId,
    pub file: String,
    /// Comment body, may span several lines
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    /// The line's text at the time the comment was written
    pub line_content: Option<String>,
    pub line_type: Option<LineKind>,
    pub selection: Option<SelectionRange>,
}

impl ReviewComment {
    /// Create a comment anchored at `context`.
    ///
    /// A removed line keeps only its old-file number and an added line only
    /// its new-file number; context lines keep both.
    pub fn new(context: LineContext, text: impl Into<String>) -> Self {
        let (old_line, new_line, line_content, line_type) = match context.line {
            Some(line) => {
                let (old, new) = match line.kind {
                    LineKind::Deletion => (line.old_line, None),
                    LineKind::Addition => (None, line.new_line),
                    LineKind::Context => (line.old_line, line.new_line),
                };
                (old, new, Some(line.text), Some(line.kind))
            }
            None => (None, None, None, None),
        };

        Self {
            id: Uuid::new_v4(),
            hunk_id: context.hunk_id,
            file: context.file,
            text: text.into(),
            created_at: Utc::now(),
            old_line,
            new_line,
            line_content,
            line_type,
            selection: None,
        }
    }

    pub fn with_selection(mut self, selection: SelectionRange) -> Self {
        self.selection = Some(selection);
        self
    }

    /// `[+N]`, `[-N]` or `[LN]` depending on the kind of line commented on
    pub fn line_label(&self) -> Option<String> {
        match self.line_type? {
            LineKind::Addition => self.new_line.map(|n| format!("[+{}]", n)),
            LineKind::Deletion => self.old_line.map(|n| format!("[-{}]", n)),
            LineKind::Context => self.new_line.or(self.old_line).map(|n| format!("[L{}]", n)),
        }
    }
}

/// What a user action did, with a message for the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(String),
    Skipped(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Applied(msg) | Outcome::Skipped(msg) => msg,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// The review aggregate: hunks, persisted per-hunk state, comments and feedback
#[derive(Debug, Default)]
pub struct ReviewSession {
    pub hunks: Vec<Hunk>,
    /// Source of truth for staging; survives hunk reconstruction
    staging: HashMap<HunkId, StagingStatus>,
    verdicts: HashMap<HunkId, Verdict>,
    pub comments: Vec<ReviewComment>,
    pub overall_feedback: Option<String>,
    pub original_request: Option<String>,
    source_label: Option<String>,
    refreshing: bool,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin reviewing `source_label`.
    ///
    /// When the source differs from the current one, comments, staging,
    /// verdicts and overall feedback are dropped. Returns whether a new
    /// session was started.
    pub fn start(&mut self, source_label: &str) -> bool {
        if self.source_label.as_deref() == Some(source_label) {
            return false;
        }

        info!("Starting review session for {}", source_label);
        self.hunks.clear();
        self.staging.clear();
        self.verdicts.clear();
        self.comments.clear();
        self.overall_feedback = None;
        self.source_label = Some(source_label.to_string());
        true
    }

    pub fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }

    /// Replace the hunk list, carrying staging and verdicts forward by identity
    pub fn apply_diff(&mut self, mut hunks: Vec<Hunk>) {
        for hunk in &mut hunks {
            hunk.status = self.staging.get(&hunk.id).copied().unwrap_or_default();
            hunk.verdict = self.verdicts.get(&hunk.id).copied().unwrap_or_default();
        }
        debug!("Applied diff with {} hunks", hunks.len());
        self.hunks = hunks;
    }

    /// Claim the busy guard. Returns false if a refresh is already in flight.
    pub fn try_begin_refresh(&mut self) -> bool {
        if self.refreshing {
            debug!("Refresh requested while busy; dropped");
            return false;
        }
        self.refreshing = true;
        true
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Apply the result of a diff fetch and release the busy guard.
    ///
    /// A failed fetch leaves the session with no hunks; persisted staging and
    /// verdicts are kept for the next successful refresh.
    pub fn finish_refresh(&mut self, result: Result<String, DiffSourceError>) -> Outcome {
        self.refreshing = false;

        match result {
            Ok(text) => {
                self.apply_diff(parse_diff(&text));
                let files = self.file_count();
                Outcome::Applied(format!("{} hunks in {} files", self.hunks.len(), files))
            }
            Err(e) => {
                warn!("Diff refresh failed: {}", e);
                self.apply_diff(Vec::new());
                Outcome::Skipped(format!("Diff failed: {}", e))
            }
        }
    }

    /// Fetch and apply the diff in one step
    pub fn refresh(&mut self, source: &DiffSource) -> Outcome {
        if !self.try_begin_refresh() {
            return Outcome::Skipped("Refresh already in progress".to_string());
        }
        let result = source.fetch_diff();
        self.finish_refresh(result)
    }

    pub fn hunk(&self, id: &HunkId) -> Option<&Hunk> {
        self.hunks.iter().find(|h| &h.id == id)
    }

    /// Persisted staging status for a hunk id, if the id is known
    pub fn staging_of(&self, id: &HunkId) -> Option<StagingStatus> {
        self.hunk(id)
            .map(|_| self.staging.get(id).copied().unwrap_or_default())
    }

    pub fn file_count(&self) -> usize {
        let mut files: Vec<&str> = self.hunks.iter().map(|h| h.file.as_str()).collect();
        files.dedup();
        files.len()
    }

    pub fn stage(&mut self, id: &HunkId) -> Outcome {
        self.set_staging(id, StagingStatus::Staged)
    }

    pub fn discard(&mut self, id: &HunkId) -> Outcome {
        self.set_staging(id, StagingStatus::Discarded)
    }

    pub fn clear_staging(&mut self, id: &HunkId) -> Outcome {
        self.set_staging(id, StagingStatus::Pending)
    }

    // Any status may be set from any other in one step.
    fn set_staging(&mut self, id: &HunkId, status: StagingStatus) -> Outcome {
        let Some(hunk) = self.hunks.iter_mut().find(|h| &h.id == id) else {
            return unknown_hunk(id);
        };

        if status == StagingStatus::Pending {
            self.staging.remove(id);
        } else {
            self.staging.insert(id.clone(), status);
        }
        hunk.status = status;
        Outcome::Applied(format!("Hunk {} {}", id, status.as_str()))
    }

    pub fn set_verdict(&mut self, id: &HunkId, verdict: Verdict) -> Outcome {
        let Some(hunk) = self.hunks.iter_mut().find(|h| &h.id == id) else {
            return unknown_hunk(id);
        };

        if verdict == Verdict::Pending {
            self.verdicts.remove(id);
        } else {
            self.verdicts.insert(id.clone(), verdict);
        }
        hunk.verdict = verdict;
        Outcome::Applied(format!("Hunk {} marked {}", id, verdict.label()))
    }

    pub fn clear_verdict(&mut self, id: &HunkId) -> Outcome {
        self.set_verdict(id, Verdict::Pending)
    }

    pub fn add_comment(&mut self, comment: ReviewComment) -> Outcome {
        if self.hunk(&comment.hunk_id).is_none() {
            return unknown_hunk(&comment.hunk_id);
        }

        let msg = match comment.line_label() {
            Some(label) => format!("Comment added on {} {}", comment.file, label),
            None => format!("Comment added on hunk {}", comment.hunk_id),
        };
        self.comments.push(comment);
        Outcome::Applied(msg)
    }

    /// Set the overall feedback; blank text clears it
    pub fn set_overall_feedback(&mut self, text: &str) -> Outcome {
        self.overall_feedback = non_blank(text);
        match self.overall_feedback {
            Some(_) => Outcome::Applied("Overall feedback saved".to_string()),
            None => Outcome::Applied("Overall feedback cleared".to_string()),
        }
    }

    /// Set the request the reviewed change was made for; blank text clears it
    pub fn set_original_request(&mut self, text: &str) -> Outcome {
        self.original_request = non_blank(text);
        match self.original_request {
            Some(_) => Outcome::Applied("Original request saved".to_string()),
            None => Outcome::Applied("Original request cleared".to_string()),
        }
    }

    pub fn comments_for<'a>(&'a self, id: &'a HunkId) -> impl Iterator<Item = &'a ReviewComment> {
        self.comments.iter().filter(move |c| &c.hunk_id == id)
    }

    /// Number of hunks per verdict, in `Verdict::ALL` order
    pub fn verdict_counts(&self) -> Vec<(Verdict, usize)> {
        Verdict::ALL
            .iter()
            .map(|v| (*v, self.hunks.iter().filter(|h| h.verdict == *v).count()))
            .collect()
    }

    pub fn staged_count(&self) -> usize {
        self.hunks
            .iter()
            .filter(|h| h.status == StagingStatus::Staged)
            .count()
    }
}

fn unknown_hunk(id: &HunkId) -> Outcome {
    debug!("No hunk with id {}", id);
    Outcome::Skipped(format!("No hunk {} in the current diff", id))
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
