//! Unified diff parsing and the git-backed diff source
//!
//! `git diff` output is scanned line by line into review hunks. Git itself is
//! reached through the [`ProcessRunner`] collaborator, so the parser and the
//! source both work without a repository on disk.

use crate::host::{ProcessOutput, ProcessRunner};
use crate::review::{StagingStatus, Verdict};
use anyhow::{Context, Result};
use git2::Repository;
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use thiserror::Error;

static FILE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").expect("file header pattern"));

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$").expect("hunk header pattern")
});

/// Diff mode - what to compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffMode {
    /// Working tree vs index (unstaged changes) - `git diff`
    Unstaged,
    /// Index vs HEAD (staged changes) - `git diff --staged`
    Staged,
    /// Working tree vs a specific revision - `git diff <commit>`
    WorkingTree { base: String },
    /// Between two commits - `git diff <from>..<to>`
    Commits { from: String, to: String },
    /// Changes since merge-base - `git diff <from>...<to>`
    MergeBase { from: String, to: String },
    /// Unified diff text read from a file (`-` for stdin)
    Patch { path: PathBuf },
}

impl DiffMode {
    /// Revision arguments passed after `git diff`
    fn git_args(&self) -> Vec<String> {
        match self {
            DiffMode::Unstaged | DiffMode::Patch { .. } => Vec::new(),
            DiffMode::Staged => vec!["--staged".to_string()],
            DiffMode::WorkingTree { base } => vec![base.clone()],
            DiffMode::Commits { from, to } => vec![format!("{}..{}", from, to)],
            DiffMode::MergeBase { from, to } => vec![format!("{}...{}", from, to)],
        }
    }

    /// Revision holding the "old" side of the diff, in `git show <rev>:<path>` form.
    /// The empty revision addresses the index.
    pub fn base_revision(&self) -> Option<&str> {
        match self {
            DiffMode::Unstaged => Some(""),
            DiffMode::Staged => Some("HEAD"),
            DiffMode::WorkingTree { base } => Some(base),
            DiffMode::Commits { from, .. } | DiffMode::MergeBase { from, .. } => Some(from),
            DiffMode::Patch { .. } => None,
        }
    }

    /// Human-readable label, also used to detect that the review source changed
    pub fn label(&self) -> String {
        match self {
            DiffMode::Unstaged => "unstaged changes".to_string(),
            DiffMode::Staged => "staged changes".to_string(),
            DiffMode::WorkingTree { base } => format!("working tree vs {}", base),
            DiffMode::Commits { from, to } => format!("{}..{}", from, to),
            DiffMode::MergeBase { from, to } => format!("{}...{}", from, to),
            DiffMode::Patch { path } => format!("patch {}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum DiffSourceError {
    #[error("Failed to run git: {0}")]
    Launch(#[from] std::io::Error),
    #[error("git {command} failed ({code}): {stderr}")]
    Failed {
        command: String,
        code: String,
        stderr: String,
    },
    #[error("Failed to read patch {path}: {source}")]
    ReadPatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No prior revision available for {0}")]
    NoBaseRevision(String),
}

/// Classification of a raw hunk line by its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineKind {
    #[serde(rename = "context")]
    Context,
    #[serde(rename = "add")]
    Addition,
    #[serde(rename = "remove")]
    Deletion,
}

impl LineKind {
    fn from_prefix(line: &str) -> Option<Self> {
        match line.as_bytes().first() {
            Some(b'+') => Some(Self::Addition),
            Some(b'-') => Some(Self::Deletion),
            Some(b' ') => Some(Self::Context),
            _ => None,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            Self::Context => ' ',
            Self::Addition => '+',
            Self::Deletion => '-',
        }
    }
}

/// Hunk identity: `file:new_start`.
///
/// Not stable when an earlier edit shifts the hunk's new-file start line;
/// state keyed by it is orphaned in that case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HunkId(String);

impl HunkId {
    pub fn new(file: &str, new_start: u32) -> Self {
        Self(format!("{}:{}", file, new_start))
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of a hunk, kept exactly as it appeared in the diff (prefix included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub kind: LineKind,
    pub text: String,
}

impl RawLine {
    /// Line content without the one-character diff prefix
    pub fn content(&self) -> &str {
        self.text.get(1..).unwrap_or("")
    }
}

/// A raw line annotated with its old/new file line numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberedLine<'a> {
    pub index: usize,
    pub kind: LineKind,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    pub content: &'a str,
}

/// A contiguous block of changed lines in one file
#[derive(Debug, Clone)]
pub struct Hunk {
    pub id: HunkId,
    pub file: String,
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Text following the closing `@@` of the header
    pub context: String,
    pub lines: Vec<RawLine>,
    pub status: StagingStatus,
    pub verdict: Verdict,
    /// Where this hunk's header starts in the most recent render
    pub byte_offset: usize,
}

impl Hunk {
    fn from_header(file: &str, header: HunkHeader) -> Self {
        Self {
            id: HunkId::new(file, header.new_start),
            file: file.to_string(),
            old_start: header.old_start,
            old_count: header.old_count,
            new_start: header.new_start,
            new_count: header.new_count,
            context: header.context,
            lines: Vec::new(),
            status: StagingStatus::Pending,
            verdict: Verdict::Pending,
            byte_offset: 0,
        }
    }

    /// Inclusive old-file line range `[start, end]`
    pub fn old_range(&self) -> [u32; 2] {
        [
            self.old_start,
            self.old_start.saturating_add(self.old_count.saturating_sub(1)),
        ]
    }

    /// Inclusive new-file line range `[start, end]`
    pub fn new_range(&self) -> [u32; 2] {
        [
            self.new_start,
            self.new_start.saturating_add(self.new_count.saturating_sub(1)),
        ]
    }

    /// Replays the raw lines, numbering them against both files.
    ///
    /// Context lines advance both counters, removals only the old one and
    /// additions only the new one. Counters saturate at `u32::MAX`.
    pub fn numbered_lines(&self) -> impl Iterator<Item = NumberedLine<'_>> {
        let mut old_line = self.old_start;
        let mut new_line = self.new_start;

        self.lines.iter().enumerate().map(move |(index, line)| {
            let (old_no, new_no) = match line.kind {
                LineKind::Context => {
                    let numbers = (Some(old_line), Some(new_line));
                    old_line = old_line.saturating_add(1);
                    new_line = new_line.saturating_add(1);
                    numbers
                }
                LineKind::Deletion => {
                    let numbers = (Some(old_line), None);
                    old_line = old_line.saturating_add(1);
                    numbers
                }
                LineKind::Addition => {
                    let numbers = (None, Some(new_line));
                    new_line = new_line.saturating_add(1);
                    numbers
                }
            };

            NumberedLine {
                index,
                kind: line.kind,
                old_line: old_no,
                new_line: new_no,
                content: line.content(),
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkHeader {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
    context: String,
}

/// Parse a unified diff hunk header: @@ -old_start[,old_count] +new_start[,new_count] @@<context>
fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let caps = HUNK_HEADER.captures(line)?;
    let number = |idx: usize, default: u32| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    Some(HunkHeader {
        old_start: number(1, 0)?,
        old_count: number(2, 1)?,
        new_start: number(3, 0)?,
        new_count: number(4, 1)?,
        context: caps
            .get(5)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

/// Parse unified diff text into hunks, in source order.
///
/// Unrecognised lines are skipped, so malformed input yields fewer hunks
/// rather than an error. Hunk headers seen before any `diff --git` line
/// have no file to belong to and are dropped along with their lines.
pub fn parse_diff(diff_text: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current_file: Option<String> = None;
    let mut current_hunk: Option<Hunk> = None;

    for line in diff_text.lines() {
        if let Some(caps) = FILE_HEADER.captures(line) {
            hunks.extend(current_hunk.take());
            current_file = Some(caps[2].to_string());
        } else if line.starts_with("@@") {
            hunks.extend(current_hunk.take());

            let Some(file) = current_file.as_deref() else {
                debug!("Ignoring hunk header outside a file section: {}", line);
                continue;
            };

            match parse_hunk_header(line) {
                Some(header) => current_hunk = Some(Hunk::from_header(file, header)),
                None => debug!("Skipping malformed hunk header: {}", line),
            }
        } else if let Some(hunk) = current_hunk.as_mut() {
            // File boundary markers, even when they show up inside a hunk
            if line.starts_with("---") || line.starts_with("+++") {
                continue;
            }
            if let Some(kind) = LineKind::from_prefix(line) {
                hunk.lines.push(RawLine {
                    kind,
                    text: line.to_string(),
                });
            }
        }
    }

    hunks.extend(current_hunk);
    hunks
}

/// Obtains diff text and prior file revisions by running git
#[derive(Clone)]
pub struct DiffSource {
    repo_path: PathBuf,
    context_lines: u32,
    mode: DiffMode,
    runner: Arc<dyn ProcessRunner>,
    /// Stdin can only be drained once; clones share the captured patch
    stdin_patch: Arc<Mutex<Option<Arc<str>>>>,
}

impl DiffSource {
    pub fn new(
        repo_path: PathBuf,
        context_lines: u32,
        mode: DiffMode,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            repo_path,
            context_lines,
            mode,
            runner,
            stdin_patch: Arc::default(),
        }
    }

    pub fn mode(&self) -> &DiffMode {
        &self.mode
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Fetch the raw unified diff text for the configured mode
    pub fn fetch_diff(&self) -> Result<String, DiffSourceError> {
        if let DiffMode::Patch { path } = &self.mode {
            if path == Path::new("-") {
                return self.stdin_patch_with(|| {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text).map(|_| text)
                });
            }
            return read_patch(path);
        }

        let mut args = vec![
            "diff".to_string(),
            "--no-color".to_string(),
            format!("-U{}", self.context_lines),
        ];
        args.extend(self.mode.git_args());

        debug!("Running git {}", args.join(" "));
        let output = self.runner.run("git", &args, &self.repo_path)?;
        check_output("diff", output)
    }

    /// The stdin patch, read with `read` on first use and replayed afterwards
    pub(crate) fn stdin_patch_with<F>(&self, read: F) -> Result<String, DiffSourceError>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let mut cached = self.stdin_patch.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(text) = cached.as_ref() {
            debug!("Replaying {} bytes of patch read from stdin", text.len());
            return Ok(text.to_string());
        }

        let text = read().map_err(|source| DiffSourceError::ReadPatch {
            path: PathBuf::from("-"),
            source,
        })?;
        *cached = Some(Arc::from(text.as_str()));
        Ok(text)
    }

    /// Content of `path` at the revision forming the old side of the diff
    pub fn file_at_revision(&self, path: &str) -> Result<String, DiffSourceError> {
        let base = self
            .mode
            .base_revision()
            .ok_or_else(|| DiffSourceError::NoBaseRevision(path.to_string()))?;

        let args = vec!["show".to_string(), format!("{}:{}", base, path)];
        let output = self.runner.run("git", &args, &self.repo_path)?;
        check_output("show", output)
    }
}

fn check_output(command: &str, output: ProcessOutput) -> Result<String, DiffSourceError> {
    if output.success() {
        return Ok(output.stdout);
    }

    Err(DiffSourceError::Failed {
        command: command.to_string(),
        code: output
            .exit_code
            .map(|c| format!("exit {}", c))
            .unwrap_or_else(|| "terminated".to_string()),
        stderr: output.stderr.trim().to_string(),
    })
}

fn read_patch(path: &Path) -> Result<String, DiffSourceError> {
    std::fs::read_to_string(path).map_err(|source| DiffSourceError::ReadPatch {
        path: path.to_path_buf(),
        source,
    })
}

/// Find the git repository root from a path
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(start).context("Not in a git repository")?;

    repo.workdir()
        .map(PathBuf::from)
        .context("Repository has no working directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ProcessOutput;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const TWO_HUNKS: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 3b18e51..a9c3f2d 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@ mod tests
 use std::fmt;
-fn old() {}
+fn new() {}
 }
@@ -20,2 +20,3 @@ impl Display
 fn fmt() {
+    todo!()
 }
";

    #[test]
    fn test_parse_two_hunks_in_order() {
        let hunks = parse_diff(TWO_HUNKS);

        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].id.as_str(), "src/lib.rs:1");
        assert_eq!((hunks[0].old_start, hunks[0].new_start), (1, 1));
        assert_eq!(hunks[0].context, "mod tests");
        assert_eq!(hunks[1].id.as_str(), "src/lib.rs:20");
        assert_eq!((hunks[1].old_start, hunks[1].new_start), (20, 20));
        assert_eq!(hunks[1].new_count, 3);

        let texts: Vec<&str> = hunks[0].lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec![" use std::fmt;", "-fn old() {}", "+fn new() {}", " }"]);
        assert!(hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .all(|l| !l.text.starts_with("---") && !l.text.starts_with("+++")));
    }

    #[test]
    fn test_parse_sample_hunk() {
        let diff = "diff --git a/a.txt b/a.txt\n@@ -1,2 +1,2 @@ sample\n-foo\n+fooo\n context\n";
        let hunks = parse_diff(diff);

        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 1);
        assert_eq!(hunks[0].new_start, 1);
        assert_eq!(hunks[0].context, "sample");
        let texts: Vec<&str> = hunks[0].lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["-foo", "+fooo", " context"]);
    }

    #[test]
    fn test_hunk_without_file_is_dropped() {
        let diff = "@@ -1,2 +1,2 @@\n-a\n+b\n";
        assert!(parse_diff(diff).is_empty());
    }

    #[test]
    fn test_malformed_header_is_skipped() {
        let diff = "diff --git a/x b/x\n@@ -a,b +c @@\n+lost\n@@ -5 +5 @@\n+kept\n";
        let hunks = parse_diff(diff);

        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].new_start, 5);
        assert_eq!(hunks[0].old_count, 1);
        assert_eq!(hunks[0].new_count, 1);
        assert_eq!(hunks[0].lines.len(), 1);
    }

    #[test]
    fn test_new_file_section_closes_hunk() {
        let diff = "\
diff --git a/one.rs b/one.rs
@@ -1 +1 @@
-a
+b
diff --git a/two.rs b/two.rs
new file mode 100644
@@ -0,0 +1,2 @@
+x
+y
";
        let hunks = parse_diff(diff);

        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].file, "one.rs");
        assert_eq!(hunks[0].lines.len(), 2);
        assert_eq!(hunks[1].file, "two.rs");
        assert_eq!(hunks[1].new_range(), [1, 2]);
        assert_eq!(hunks[1].old_range(), [0, 0]);
    }

    #[test]
    fn test_line_counters_never_decrease() {
        for hunk in parse_diff(TWO_HUNKS) {
            let (mut old, mut new) = (hunk.old_start, hunk.new_start);
            for line in hunk.numbered_lines() {
                if let Some(o) = line.old_line {
                    assert!(o >= old);
                    old = o;
                }
                if let Some(n) = line.new_line {
                    assert!(n >= new);
                    new = n;
                }
            }
        }
    }

    #[test]
    fn test_line_numbers_saturate_at_max() {
        let diff = "diff --git a/x b/x\n@@ -4294967295,3 +4294967294,2 @@\n a\n-b\n+c\n d\n";
        let hunks = parse_diff(diff);
        assert_eq!(hunks.len(), 1);

        assert_eq!(hunks[0].old_range(), [u32::MAX, u32::MAX]);
        assert_eq!(hunks[0].new_range(), [u32::MAX - 1, u32::MAX]);

        let numbers: Vec<(Option<u32>, Option<u32>)> = hunks[0]
            .numbered_lines()
            .map(|l| (l.old_line, l.new_line))
            .collect();
        assert_eq!(
            numbers,
            vec![
                (Some(u32::MAX), Some(u32::MAX - 1)),
                (Some(u32::MAX), None),
                (None, Some(u32::MAX)),
                (Some(u32::MAX), Some(u32::MAX)),
            ]
        );
    }

    #[test]
    fn test_numbered_lines() {
        let hunks = parse_diff(TWO_HUNKS);
        let numbers: Vec<(LineKind, Option<u32>, Option<u32>)> = hunks[0]
            .numbered_lines()
            .map(|l| (l.kind, l.old_line, l.new_line))
            .collect();

        assert_eq!(
            numbers,
            vec![
                (LineKind::Context, Some(1), Some(1)),
                (LineKind::Deletion, Some(2), None),
                (LineKind::Addition, None, Some(2)),
                (LineKind::Context, Some(3), Some(3)),
            ]
        );
    }

    struct ScriptedRunner {
        output: ProcessOutput,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, _command: &str, args: &[String], _cwd: &Path) -> std::io::Result<ProcessOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self.output.clone())
        }
    }

    fn scripted(exit_code: i32, stdout: &str, stderr: &str) -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner {
            output: ProcessOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_fetch_diff_builds_git_args() {
        let runner = scripted(0, TWO_HUNKS, "");
        let source = DiffSource::new(
            PathBuf::from("/repo"),
            5,
            DiffMode::Commits {
                from: "main".into(),
                to: "topic".into(),
            },
            runner.clone(),
        );

        assert_eq!(source.fetch_diff().unwrap(), TWO_HUNKS);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0], vec!["diff", "--no-color", "-U5", "main..topic"]);
    }

    #[test]
    fn test_fetch_diff_reports_failure() {
        let runner = scripted(128, "", "fatal: bad revision\n");
        let source = DiffSource::new(PathBuf::from("/repo"), 3, DiffMode::Staged, runner);

        let err = source.fetch_diff().unwrap_err();
        assert!(err.to_string().contains("fatal: bad revision"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Each counter only moves forward while a hunk is replayed
            #[test]
            fn line_counters_never_decrease(diff in crate::diff::strategies::diff_text()) {
                for hunk in parse_diff(&diff) {
                    let (mut old, mut new) = (hunk.old_start, hunk.new_start);
                    for line in hunk.numbered_lines() {
                        if let Some(o) = line.old_line {
                            prop_assert!(o >= old);
                            old = o;
                        }
                        if let Some(n) = line.new_line {
                            prop_assert!(n >= new);
                            new = n;
                        }
                    }
                    prop_assert!(hunk.old_range()[0] <= hunk.old_range()[1]);
                    prop_assert!(hunk.new_range()[0] <= hunk.new_range()[1]);
                }
            }
        }
    }

    fn stdin_source() -> DiffSource {
        DiffSource::new(
            PathBuf::from("/repo"),
            3,
            DiffMode::Patch { path: "-".into() },
            scripted(0, "", ""),
        )
    }

    #[test]
    fn test_stdin_patch_is_read_once() {
        let source = stdin_source();
        let worker_copy = source.clone();

        let first = source.stdin_patch_with(|| Ok(TWO_HUNKS.to_string())).unwrap();
        let again = worker_copy
            .stdin_patch_with(|| Ok(String::new()))
            .unwrap();

        assert_eq!(first, TWO_HUNKS);
        assert_eq!(again, TWO_HUNKS);
        assert_eq!(source.fetch_diff().unwrap(), TWO_HUNKS);
    }

    #[test]
    fn test_stdin_read_error_is_not_cached() {
        let source = stdin_source();
        let err = source
            .stdin_patch_with(|| Err(std::io::Error::other("closed")))
            .unwrap_err();
        assert!(matches!(err, DiffSourceError::ReadPatch { .. }));

        let text = source.stdin_patch_with(|| Ok(TWO_HUNKS.to_string())).unwrap();
        assert_eq!(text, TWO_HUNKS);
    }

    #[test]
    fn test_file_at_revision_uses_base() {
        let runner = scripted(0, "old content\n", "");
        let source = DiffSource::new(PathBuf::from("/repo"), 3, DiffMode::Unstaged, runner.clone());

        assert_eq!(source.file_at_revision("src/a.rs").unwrap(), "old content\n");
        assert_eq!(runner.calls.lock().unwrap()[0], vec!["show", ":src/a.rs"]);

        let patch = DiffSource::new(
            PathBuf::from("/repo"),
            3,
            DiffMode::Patch { path: "x.diff".into() },
            scripted(0, "", ""),
        );
        assert!(matches!(
            patch.file_at_revision("src/a.rs"),
            Err(DiffSourceError::NoBaseRevision(_))
        ));
    }
}
