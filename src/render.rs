//! Renders a review session into a linear stream of tagged text rows
//!
//! The stream is a list of segments (one display row each, newline included)
//! plus style instructions addressing absolute byte ranges in the
//! concatenated text. Offsets are UTF-8 byte offsets, so every emitted row
//! advances the cursor by `str::len`, never by a character count.

use crate::diff::{Hunk, HunkId, LineKind, NumberedLine, RawLine};
use crate::host::HostView;
use crate::line_diff::{diff_chars, PartKind};
use crate::review::{ReviewComment, ReviewSession, StagingStatus, Verdict};
use log::debug;
use std::ops::Range;
use unicode_width::UnicodeWidthStr;

const BANNER_WIDTH: usize = 72;
const COMMENT_INDENT: &str = "            ";

const HELP_BANNER: &[&str] = &[
    "Review diff: s stage · d discard · u undo · 1 approve · 2 needs changes · 3 reject · 4 question · 0 clear",
    "c comment · v select · f feedback · o request · p old revision · n/N hunks · r refresh · e export · q quit",
];

/// What a row of the stream represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    HelpBanner,
    FileBanner,
    HunkHeader,
    DiffLine,
    LineComment,
    CommentBorder,
    HunkComment,
    FileFooter,
    Placeholder,
    HelpFooter,
}

/// A diff line as seen from the stream: kind, numbers and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef {
    pub kind: LineKind,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    pub text: String,
}

impl From<&NumberedLine<'_>> for LineRef {
    fn from(line: &NumberedLine<'_>) -> Self {
        Self {
            kind: line.kind,
            old_line: line.old_line,
            new_line: line.new_line,
            text: line.content.to_string(),
        }
    }
}

/// Semantic tags carried by every row, used for cursor-contextual actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTag {
    pub role: SegmentRole,
    pub file: Option<String>,
    pub hunk_id: Option<HunkId>,
    pub line: Option<LineRef>,
}

impl SegmentTag {
    pub fn new(role: SegmentRole) -> Self {
        Self {
            role,
            file: None,
            hunk_id: None,
            line: None,
        }
    }

    fn for_file(role: SegmentRole, file: &str) -> Self {
        Self {
            file: Some(file.to_string()),
            ..Self::new(role)
        }
    }

    fn for_hunk(role: SegmentRole, hunk: &Hunk) -> Self {
        Self {
            role,
            file: Some(hunk.file.clone()),
            hunk_id: Some(hunk.id.clone()),
            line: None,
        }
    }

    fn with_line(mut self, line: LineRef) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub tag: SegmentTag,
}

impl Segment {
    pub fn new(text: impl Into<String>, tag: SegmentTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// Visual class of a styled range; hosts map these to concrete colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    Help,
    FileBanner,
    HunkHeader,
    Added,
    Removed,
    Context,
    AddedInline,
    RemovedInline,
    Staged,
    Discarded,
    Comment,
    Border,
    Verdict(Verdict),
}

/// Style instruction over an absolute byte range `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpan {
    pub range: Range<usize>,
    pub class: StyleClass,
}

#[derive(Debug, Clone, Default)]
pub struct RenderedStream {
    pub segments: Vec<Segment>,
    pub styles: Vec<StyleSpan>,
    pub total_bytes: usize,
}

impl RenderedStream {
    /// The full text of the stream
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Emit the help banner and footer
    pub show_help: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { show_help: true }
    }
}

#[derive(Default)]
struct StreamBuilder {
    segments: Vec<Segment>,
    styles: Vec<StyleSpan>,
    cursor: usize,
}

impl StreamBuilder {
    /// Append `text` plus a newline; returns the byte range of `text`
    fn row(&mut self, text: &str, tag: SegmentTag) -> Range<usize> {
        let start = self.cursor;
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.cursor += line.len();
        self.segments.push(Segment::new(line, tag));
        start..start + text.len()
    }

    fn styled_row(&mut self, text: &str, tag: SegmentTag, class: StyleClass) -> Range<usize> {
        let range = self.row(text, tag);
        self.style(range.clone(), class);
        range
    }

    fn style(&mut self, range: Range<usize>, class: StyleClass) {
        if range.start < range.end {
            debug_assert!(range.end <= self.cursor);
            self.styles.push(StyleSpan { range, class });
        }
    }

    fn finish(self) -> RenderedStream {
        RenderedStream {
            segments: self.segments,
            styles: self.styles,
            total_bytes: self.cursor,
        }
    }
}

/// Render the session and record where each hunk starts.
///
/// Never fails: lookups that miss fall back to blank glyphs.
pub fn render(session: &mut ReviewSession, options: &RenderOptions) -> RenderedStream {
    let (stream, offsets) = build_stream(session, options);
    for (hunk, offset) in session.hunks.iter_mut().zip(offsets) {
        hunk.byte_offset = offset;
    }
    stream
}

/// Hand a rendered stream to a host view: text first, then every style
pub fn present<H: HostView + ?Sized>(stream: &RenderedStream, host: &mut H) {
    debug!(
        "Presenting {} segments, {} bytes, {} styles",
        stream.segments.len(),
        stream.total_bytes,
        stream.styles.len()
    );
    host.render_stream(&stream.segments);
    for span in &stream.styles {
        host.apply_style(span.range.clone(), span.class);
    }
    host.finish_stream();
}

fn build_stream(session: &ReviewSession, options: &RenderOptions) -> (RenderedStream, Vec<usize>) {
    let mut out = StreamBuilder::default();
    let mut offsets = Vec::with_capacity(session.hunks.len());

    if session.hunks.is_empty() {
        out.styled_row(
            "No changes to review.",
            SegmentTag::new(SegmentRole::Placeholder),
            StyleClass::Help,
        );
        return (out.finish(), offsets);
    }

    if options.show_help {
        for line in HELP_BANNER {
            out.styled_row(line, SegmentTag::new(SegmentRole::HelpBanner), StyleClass::Help);
        }
        out.row("", SegmentTag::new(SegmentRole::HelpBanner));
    }

    for (idx, hunk) in session.hunks.iter().enumerate() {
        let file_changed = idx == 0 || session.hunks[idx - 1].file != hunk.file;
        if file_changed {
            emit_file_banner(&mut out, &hunk.file);
        }

        offsets.push(out.cursor);
        emit_hunk(&mut out, session, hunk);

        let last_in_file = session
            .hunks
            .get(idx + 1)
            .map_or(true, |next| next.file != hunk.file);
        if last_in_file {
            out.styled_row(
                &"─".repeat(BANNER_WIDTH),
                SegmentTag::for_file(SegmentRole::FileFooter, &hunk.file),
                StyleClass::Border,
            );
        }
    }

    if options.show_help {
        out.row("", SegmentTag::new(SegmentRole::HelpFooter));
        let summary = format!(
            "{} hunks · {} staged · {} comments · ? for help",
            session.hunks.len(),
            session.staged_count(),
            session.comments.len()
        );
        out.styled_row(&summary, SegmentTag::new(SegmentRole::HelpFooter), StyleClass::Help);
    }

    (out.finish(), offsets)
}

fn emit_file_banner(out: &mut StreamBuilder, file: &str) {
    let fill = BANNER_WIDTH.saturating_sub(file.width() + 5).max(3);
    let banner = format!("━━━ {} {}", file, "━".repeat(fill));
    out.styled_row(
        &banner,
        SegmentTag::for_file(SegmentRole::FileBanner, file),
        StyleClass::FileBanner,
    );
}

fn emit_hunk(out: &mut StreamBuilder, session: &ReviewSession, hunk: &Hunk) {
    emit_hunk_header(out, session, hunk);

    let lines: Vec<NumberedLine<'_>> = hunk.numbered_lines().collect();
    let mut i = 0;
    while i < lines.len() {
        if is_change_pair(&hunk.lines[i], hunk.lines.get(i + 1), hunk.status) {
            emit_change_pair(out, session, hunk, &lines[i], &lines[i + 1]);
            i += 2;
        } else {
            emit_diff_line(out, session, hunk, &lines[i]);
            i += 1;
        }
    }

    emit_hunk_comments(out, session, hunk);
}

fn emit_hunk_header(out: &mut StreamBuilder, session: &ReviewSession, hunk: &Hunk) {
    let mut header = format!(
        "{} {} @@ -{},{} +{},{} @@",
        staging_icon(session.staging_of(&hunk.id)),
        verdict_icon(session.hunk(&hunk.id).map(|h| h.verdict)),
        hunk.old_start,
        hunk.old_count,
        hunk.new_start,
        hunk.new_count
    );
    if !hunk.context.is_empty() {
        header.push(' ');
        header.push_str(&hunk.context);
    }

    let label = (hunk.verdict != Verdict::Pending).then(|| {
        header.push_str("  ");
        let start = header.len();
        header.push('[');
        header.push_str(hunk.verdict.label());
        header.push(']');
        start..header.len()
    });

    let range = out.styled_row(
        &header,
        SegmentTag::for_hunk(SegmentRole::HunkHeader, hunk),
        StyleClass::HunkHeader,
    );
    if let Some(label) = label {
        out.style(
            range.start + label.start..range.start + label.end,
            StyleClass::Verdict(hunk.verdict),
        );
    }
}

fn staging_icon(status: Option<StagingStatus>) -> &'static str {
    match status {
        Some(StagingStatus::Staged) => "●",
        Some(StagingStatus::Discarded) => "✗",
        Some(StagingStatus::Pending) => "○",
        None => " ",
    }
}

fn verdict_icon(verdict: Option<Verdict>) -> &'static str {
    match verdict {
        Some(Verdict::Approved) => "✅",
        Some(Verdict::NeedsChanges) => "🔧",
        Some(Verdict::Rejected) => "❌",
        Some(Verdict::Question) => "❓",
        Some(Verdict::Pending) | None => " ",
    }
}

/// A removal immediately followed by an addition in an undecided hunk is
/// shown as a single change with character-level highlights. Staged and
/// discarded hunks are colored by their status instead.
pub fn is_change_pair(current: &RawLine, next: Option<&RawLine>, status: StagingStatus) -> bool {
    status == StagingStatus::Pending
        && current.kind == LineKind::Deletion
        && next.is_some_and(|n| n.kind == LineKind::Addition)
}

fn line_class(kind: LineKind, status: StagingStatus) -> StyleClass {
    match status {
        StagingStatus::Staged => StyleClass::Staged,
        StagingStatus::Discarded => StyleClass::Discarded,
        StagingStatus::Pending => match kind {
            LineKind::Addition => StyleClass::Added,
            LineKind::Deletion => StyleClass::Removed,
            LineKind::Context => StyleClass::Context,
        },
    }
}

/// Row text for a diff line and the byte offset where its content starts
fn line_text(line: &NumberedLine<'_>) -> (String, usize) {
    let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
    let gutter = format!(
        "{:>5} {:>5} {}",
        number(line.old_line),
        number(line.new_line),
        line.kind.prefix()
    );
    let content_at = gutter.len();
    (gutter + line.content, content_at)
}

fn line_tag(hunk: &Hunk, line: &NumberedLine<'_>) -> SegmentTag {
    SegmentTag::for_hunk(SegmentRole::DiffLine, hunk).with_line(LineRef::from(line))
}

fn emit_diff_line(out: &mut StreamBuilder, session: &ReviewSession, hunk: &Hunk, line: &NumberedLine<'_>) {
    let (text, _) = line_text(line);
    out.styled_row(&text, line_tag(hunk, line), line_class(line.kind, hunk.status));
    emit_line_comments(out, session, hunk, line);
}

fn emit_change_pair(
    out: &mut StreamBuilder,
    session: &ReviewSession,
    hunk: &Hunk,
    removed: &NumberedLine<'_>,
    added: &NumberedLine<'_>,
) {
    let parts = diff_chars(removed.content, added.content);

    for (line, side, inline) in [
        (removed, PartKind::Removed, StyleClass::RemovedInline),
        (added, PartKind::Added, StyleClass::AddedInline),
    ] {
        let (text, content_at) = line_text(line);
        let range = out.styled_row(&text, line_tag(hunk, line), line_class(line.kind, hunk.status));

        let mut pos = range.start + content_at;
        for part in parts.iter().filter(|p| p.kind == side || p.kind == PartKind::Unchanged) {
            let end = pos + part.text.len();
            if part.kind == side {
                out.style(pos..end, inline);
            }
            pos = end;
        }

        emit_line_comments(out, session, hunk, line);
    }
}

/// Whether `comment` is pinned to exactly this line of `hunk`
fn comment_matches(comment: &ReviewComment, hunk: &Hunk, line: &NumberedLine<'_>) -> bool {
    if comment.hunk_id != hunk.id || comment.line_type != Some(line.kind) {
        return false;
    }

    match line.kind {
        LineKind::Deletion => comment.old_line.is_some() && comment.old_line == line.old_line,
        LineKind::Addition => comment.new_line.is_some() && comment.new_line == line.new_line,
        LineKind::Context => match comment.new_line {
            Some(n) => Some(n) == line.new_line,
            None => comment.old_line.is_some() && comment.old_line == line.old_line,
        },
    }
}

fn emit_line_comments(out: &mut StreamBuilder, session: &ReviewSession, hunk: &Hunk, line: &NumberedLine<'_>) {
    for comment in session
        .comments_for(&hunk.id)
        .filter(|c| comment_matches(c, hunk, line))
    {
        let tag = SegmentTag::for_hunk(SegmentRole::LineComment, hunk).with_line(LineRef::from(line));
        emit_comment(out, comment, tag);
    }
}

fn emit_hunk_comments(out: &mut StreamBuilder, session: &ReviewSession, hunk: &Hunk) {
    let comments: Vec<&ReviewComment> = session
        .comments_for(&hunk.id)
        .filter(|c| c.line_type.is_none())
        .collect();
    if comments.is_empty() {
        return;
    }

    let border = SegmentTag::for_hunk(SegmentRole::CommentBorder, hunk);
    out.styled_row(
        &format!("{}┌─ hunk comments", COMMENT_INDENT),
        border.clone(),
        StyleClass::Border,
    );
    for comment in comments {
        emit_comment(out, comment, SegmentTag::for_hunk(SegmentRole::HunkComment, hunk));
    }
    out.styled_row(&format!("{}└─", COMMENT_INDENT), border, StyleClass::Border);
}

/// One row per line of the comment body, continuation lines aligned under the first
fn emit_comment(out: &mut StreamBuilder, comment: &ReviewComment, tag: SegmentTag) {
    let selection = comment
        .selection
        .map(|s| format!("(lines {}-{}) ", s.start_line, s.end_line))
        .unwrap_or_default();

    for (i, body) in comment.text.split('\n').enumerate() {
        let body = body.trim_end_matches('\r');
        let row = if i == 0 {
            format!("{}» {}{}", COMMENT_INDENT, selection, body)
        } else {
            format!("{}  {}", COMMENT_INDENT, body)
        };
        out.styled_row(&row, tag.clone(), StyleClass::Comment);
    }
}

/// A display row with row-local style runs covering its whole text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRow {
    pub text: String,
    pub runs: Vec<StyleRun>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRun {
    pub range: Range<usize>,
    pub class: Option<StyleClass>,
}

/// Resolve absolute style spans into per-row runs.
///
/// Where spans overlap the one applied last wins. Run boundaries that would
/// split a character are dropped.
pub fn layout_rows(segments: &[Segment], styles: &[StyleSpan]) -> Vec<StyledRow> {
    let mut starts = Vec::with_capacity(segments.len());
    let mut cursor = 0;
    for segment in segments {
        starts.push(cursor);
        cursor += segment.text.len();
    }

    let mut per_row: Vec<Vec<(Range<usize>, StyleClass)>> = vec![Vec::new(); segments.len()];
    for span in styles {
        let first = starts
            .partition_point(|&s| s <= span.range.start)
            .saturating_sub(1);
        for row in first..segments.len() {
            let row_start = starts[row];
            if row_start >= span.range.end {
                break;
            }
            let row_end = row_start + segments[row].text.len();
            let start = span.range.start.max(row_start) - row_start;
            let end = span.range.end.min(row_end).saturating_sub(row_start);
            if start < end {
                per_row[row].push((start..end, span.class));
            }
        }
    }

    segments
        .iter()
        .zip(per_row)
        .map(|(segment, spans)| style_row(segment.text.trim_end_matches('\n'), &spans))
        .collect()
}

fn style_row(text: &str, spans: &[(Range<usize>, StyleClass)]) -> StyledRow {
    let len = text.len();
    let mut bounds = vec![0, len];
    for (range, _) in spans {
        bounds.push(range.start.min(len));
        bounds.push(range.end.min(len));
    }
    bounds.retain(|&b| text.is_char_boundary(b));
    bounds.sort_unstable();
    bounds.dedup();

    let runs = bounds
        .windows(2)
        .map(|w| {
            let class = spans
                .iter()
                .rev()
                .find(|(r, _)| r.start <= w[0] && w[1] <= r.end)
                .map(|(_, class)| *class);
            StyleRun {
                range: w[0]..w[1],
                class,
            }
        })
        .collect();

    StyledRow {
        text: text.to_string(),
        runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_diff;
    use crate::review::{LineContext, ReviewComment};
    use pretty_assertions::assert_eq;

    const DIFF: &str = "\
diff --git a/src/émoji.rs b/src/émoji.rs
@@ -1,3 +1,3 @@ fn grüß()
 let crab = \"🦀\";
-let name = \"naïve\";
+let name = \"naïveté 🎉\";
@@ -20,2 +20,3 @@
 a();
+b();
 c();
diff --git a/README.md b/README.md
@@ -1 +1 @@
-# Title
+# Titles
";

    fn session() -> ReviewSession {
        let mut session = ReviewSession::new();
        session.start("test");
        session.apply_diff(parse_diff(DIFF));
        session
    }

    fn rows_with_role(stream: &RenderedStream, role: SegmentRole) -> Vec<&Segment> {
        stream.segments.iter().filter(|s| s.tag.role == role).collect()
    }

    fn styled_text(stream: &RenderedStream, class: StyleClass) -> Vec<String> {
        let text = stream.text();
        stream
            .styles
            .iter()
            .filter(|s| s.class == class)
            .map(|s| text[s.range.clone()].to_string())
            .collect()
    }

    fn comment_on(session: &ReviewSession, hunk: usize, line: usize, text: &str) -> ReviewComment {
        let hunk = &session.hunks[hunk];
        let numbered = hunk.numbered_lines().nth(line).unwrap();
        let context = LineContext {
            hunk_id: hunk.id.clone(),
            file: hunk.file.clone(),
            line: Some(LineRef::from(&numbered)),
        };
        ReviewComment::new(context, text)
    }

    fn assert_sound(stream: &RenderedStream) {
        let sum: usize = stream.segments.iter().map(|s| s.text.len()).sum();
        assert_eq!(stream.total_bytes, sum);
        assert_eq!(stream.text().len(), sum);
        let text = stream.text();
        for span in &stream.styles {
            assert!(span.range.start <= span.range.end);
            assert!(span.range.end <= stream.total_bytes);
            assert!(text.is_char_boundary(span.range.start), "{:?}", span);
            assert!(text.is_char_boundary(span.range.end), "{:?}", span);
        }
    }

    #[test]
    fn test_byte_offsets_are_sound() {
        let mut session = session();
        let comment = comment_on(&session, 0, 2, "prefer ASCII?\nor keep ✨");
        session.add_comment(comment);
        let hunk = session.hunks[1].id.clone();
        session.set_verdict(&hunk, Verdict::NeedsChanges);
        session.stage(&hunk);

        let stream = render(&mut session, &RenderOptions::default());
        assert_sound(&stream);

        let stream = render(&mut session, &RenderOptions { show_help: false });
        assert_sound(&stream);
    }

    #[test]
    fn test_line_numbers_at_u32_max_render() {
        let mut session = ReviewSession::new();
        session.start("test");
        session.apply_diff(parse_diff(
            "diff --git a/x b/x\n@@ -4294967295,2 +4294967295,2 @@\n a\n b\n",
        ));

        let stream = render(&mut session, &RenderOptions::default());
        assert_sound(&stream);
        let lines = rows_with_role(&stream, SegmentRole::DiffLine);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].text.starts_with("4294967295 4294967295"));
    }

    #[test]
    fn test_paired_lines_get_inline_highlights() {
        let mut session = ReviewSession::new();
        session.apply_diff(parse_diff(
            "diff --git a/a.txt b/a.txt\n@@ -1,2 +1,2 @@ sample\n-foo\n+fooo\n context\n",
        ));

        let stream = render(&mut session, &RenderOptions::default());
        assert_sound(&stream);
        assert_eq!(styled_text(&stream, StyleClass::AddedInline), vec!["o"]);
        assert!(styled_text(&stream, StyleClass::RemovedInline).is_empty());
        assert_eq!(styled_text(&stream, StyleClass::Removed), vec!["    1       -foo"]);
        assert_eq!(styled_text(&stream, StyleClass::Added), vec!["          1 +fooo"]);
        assert_eq!(styled_text(&stream, StyleClass::Context), vec!["    2     2  context"]);
    }

    #[test]
    fn test_inline_ranges_measure_multibyte_text() {
        let mut session = session();
        let stream = render(&mut session, &RenderOptions::default());

        assert_eq!(styled_text(&stream, StyleClass::AddedInline), vec!["té 🎉", "s"]);
    }

    #[test]
    fn test_change_pair_rule() {
        let line = |kind, text: &str| RawLine {
            kind,
            text: text.to_string(),
        };
        let removed = line(LineKind::Deletion, "-a");
        let added = line(LineKind::Addition, "+b");
        let context = line(LineKind::Context, " c");

        assert!(is_change_pair(&removed, Some(&added), StagingStatus::Pending));
        assert!(!is_change_pair(&removed, Some(&added), StagingStatus::Staged));
        assert!(!is_change_pair(&removed, Some(&added), StagingStatus::Discarded));
        assert!(!is_change_pair(&added, Some(&removed), StagingStatus::Pending));
        assert!(!is_change_pair(&removed, Some(&context), StagingStatus::Pending));
        assert!(!is_change_pair(&removed, None, StagingStatus::Pending));
    }

    #[test]
    fn test_staged_hunk_is_colored_uniformly() {
        let mut session = session();
        let hunk = session.hunks[0].id.clone();
        session.stage(&hunk);

        let stream = render(&mut session, &RenderOptions::default());
        let inline = styled_text(&stream, StyleClass::AddedInline);
        assert_eq!(inline, vec!["s"]);
        assert_eq!(styled_text(&stream, StyleClass::Staged).len(), 3);
        assert!(stream.segments.iter().any(|s| s.text.starts_with("● ")));
    }

    #[test]
    fn test_file_banners_and_footers() {
        let mut session = session();
        let stream = render(&mut session, &RenderOptions::default());

        let banners = rows_with_role(&stream, SegmentRole::FileBanner);
        assert_eq!(banners.len(), 2);
        assert!(banners[0].text.contains("src/émoji.rs"));
        assert!(banners[1].text.contains("README.md"));
        assert_eq!(rows_with_role(&stream, SegmentRole::FileFooter).len(), 2);

        let roles: Vec<SegmentRole> = stream.segments.iter().map(|s| s.tag.role).collect();
        let footer = roles.iter().position(|r| *r == SegmentRole::FileFooter).unwrap();
        assert_eq!(roles[footer + 1], SegmentRole::FileBanner);
        assert_eq!(roles.last(), Some(&SegmentRole::HelpFooter));
        assert_eq!(roles.first(), Some(&SegmentRole::HelpBanner));
    }

    #[test]
    fn test_hunk_offsets_point_at_headers() {
        let mut session = session();
        let stream = render(&mut session, &RenderOptions::default());
        let text = stream.text();

        for hunk in &session.hunks {
            let rest = &text[hunk.byte_offset..];
            assert!(rest.starts_with("○   @@"), "{:?}", &rest[..20.min(rest.len())]);
        }
    }

    #[test]
    fn test_verdict_label_in_header() {
        let mut session = session();
        let hunk = session.hunks[2].id.clone();
        session.set_verdict(&hunk, Verdict::Approved);

        let stream = render(&mut session, &RenderOptions::default());
        assert_eq!(styled_text(&stream, StyleClass::Verdict(Verdict::Approved)), vec!["[APPROVED]"]);
        let headers = rows_with_role(&stream, SegmentRole::HunkHeader);
        assert_eq!(headers[2].text, "○ ✅ @@ -1,1 +1,1 @@  [APPROVED]\n");
    }

    #[test]
    fn test_line_comment_follows_its_line() {
        let mut session = session();
        let comment = comment_on(&session, 1, 1, "call order\nmatters here");
        session.add_comment(comment);

        let stream = render(&mut session, &RenderOptions::default());
        let idx = stream
            .segments
            .iter()
            .position(|s| s.text.ends_with("+b();\n"))
            .unwrap();

        assert_eq!(stream.segments[idx + 1].tag.role, SegmentRole::LineComment);
        assert_eq!(stream.segments[idx + 1].text, format!("{}» call order\n", COMMENT_INDENT));
        assert_eq!(stream.segments[idx + 2].text, format!("{}  matters here\n", COMMENT_INDENT));
        assert!(stream.segments[idx + 3].text.ends_with(" c();\n"));
        assert_eq!(
            stream.segments[idx + 1].tag.line.as_ref().and_then(|l| l.new_line),
            Some(21)
        );
    }

    #[test]
    fn test_comment_on_removed_half_of_pair() {
        let mut session = session();
        let comment = comment_on(&session, 0, 1, "was fine");
        session.add_comment(comment);

        let stream = render(&mut session, &RenderOptions::default());
        let idx = stream
            .segments
            .iter()
            .position(|s| s.tag.role == SegmentRole::LineComment)
            .unwrap();
        assert!(stream.segments[idx - 1].text.contains("-let name"));
        assert!(stream.segments[idx + 1].text.contains("+let name"));
    }

    #[test]
    fn test_hunk_comments_between_borders() {
        let mut session = session();
        let hunk = &session.hunks[1];
        let context = LineContext {
            hunk_id: hunk.id.clone(),
            file: hunk.file.clone(),
            line: None,
        };
        session.add_comment(ReviewComment::new(context, "split this"));

        let stream = render(&mut session, &RenderOptions::default());
        let roles: Vec<SegmentRole> = stream.segments.iter().map(|s| s.tag.role).collect();
        let start = roles.iter().position(|r| *r == SegmentRole::CommentBorder).unwrap();
        assert_eq!(
            &roles[start..start + 4],
            &[
                SegmentRole::CommentBorder,
                SegmentRole::HunkComment,
                SegmentRole::CommentBorder,
                SegmentRole::FileFooter
            ]
        );
        assert!(stream.segments[start - 1].text.ends_with(" c();\n"));
    }

    #[test]
    fn test_orphaned_comment_is_not_rendered() {
        let mut session = session();
        let mut comment = comment_on(&session, 1, 1, "stale");
        comment.new_line = Some(99);
        session.add_comment(comment);

        let stream = render(&mut session, &RenderOptions::default());
        assert!(!stream.text().contains("stale"));
    }

    #[test]
    fn test_empty_session_renders_placeholder_only() {
        let mut session = ReviewSession::new();
        let stream = render(&mut session, &RenderOptions::default());

        assert_eq!(stream.segments.len(), 1);
        assert_eq!(stream.segments[0].tag.role, SegmentRole::Placeholder);
        assert_eq!(stream.total_bytes, stream.segments[0].text.len());
    }

    #[test]
    fn test_layout_rows_last_style_wins() {
        let segments = vec![
            Segment::new("ab€d\n", SegmentTag::new(SegmentRole::Placeholder)),
            Segment::new("xy\n", SegmentTag::new(SegmentRole::Placeholder)),
        ];
        let styles = vec![
            StyleSpan {
                range: 0..6,
                class: StyleClass::Added,
            },
            StyleSpan {
                range: 1..5,
                class: StyleClass::AddedInline,
            },
            StyleSpan {
                range: 8..9,
                class: StyleClass::Removed,
            },
        ];

        let rows = layout_rows(&segments, &styles);
        assert_eq!(rows[0].text, "ab€d");
        assert_eq!(
            rows[0].runs,
            vec![
                StyleRun {
                    range: 0..1,
                    class: Some(StyleClass::Added)
                },
                StyleRun {
                    range: 1..5,
                    class: Some(StyleClass::AddedInline)
                },
                StyleRun {
                    range: 5..6,
                    class: Some(StyleClass::Added)
                },
            ]
        );
        assert_eq!(
            rows[1].runs,
            vec![
                StyleRun {
                    range: 0..1,
                    class: None
                },
                StyleRun {
                    range: 1..2,
                    class: Some(StyleClass::Removed)
                },
            ]
        );
    }

    #[derive(Default)]
    struct RecordingHost {
        text: String,
        styles: Vec<(Range<usize>, StyleClass)>,
        finished: bool,
    }

    impl HostView for RecordingHost {
        fn render_stream(&mut self, segments: &[Segment]) {
            self.text = segments.iter().map(|s| s.text.as_str()).collect();
            self.styles.clear();
            self.finished = false;
        }

        fn apply_style(&mut self, range: Range<usize>, class: StyleClass) {
            assert!(range.end <= self.text.len());
            self.styles.push((range, class));
        }

        fn finish_stream(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn test_present_replays_stream() {
        let mut session = session();
        let stream = render(&mut session, &RenderOptions::default());
        let mut host = RecordingHost::default();

        present(&stream, &mut host);
        assert!(host.finished);
        assert_eq!(host.text, stream.text());
        assert_eq!(host.styles.len(), stream.styles.len());
    }

    mod properties {
        use super::*;
        use crate::diff::strategies::diff_text;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn generated_diffs_render_soundly(
                diff in diff_text(),
                note in "\\PC{0,20}",
                show_help in any::<bool>(),
            ) {
                let mut session = ReviewSession::new();
                session.start("generated");
                session.apply_diff(parse_diff(&diff));

                let ids: Vec<HunkId> = session.hunks.iter().map(|h| h.id.clone()).collect();
                for (i, id) in ids.iter().enumerate() {
                    match i % 3 {
                        0 => session.stage(id),
                        1 => session.set_verdict(id, Verdict::NeedsChanges),
                        _ => session.discard(id),
                    };
                }
                if session.hunks.first().is_some_and(|h| !h.lines.is_empty()) {
                    let comment = comment_on(&session, 0, 0, &note);
                    session.add_comment(comment);
                }

                let stream = render(&mut session, &RenderOptions { show_help });
                let sum: usize = stream.segments.iter().map(|s| s.text.len()).sum();
                prop_assert_eq!(stream.total_bytes, sum);

                let text = stream.text();
                for span in &stream.styles {
                    prop_assert!(span.range.start <= span.range.end);
                    prop_assert!(span.range.end <= stream.total_bytes);
                    prop_assert!(text.is_char_boundary(span.range.start));
                    prop_assert!(text.is_char_boundary(span.range.end));
                }
                for hunk in &session.hunks {
                    prop_assert!(hunk.byte_offset < stream.total_bytes);
                }
            }
        }
    }
}
