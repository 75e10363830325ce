//! TUI layer using ratatui and crossterm
//!
//! Hosts the rendered review stream with a row cursor, modal text prompts,
//! a background diff refresh and a work tree watcher.

use crate::config::Config;
use crate::diff::{DiffMode, DiffSource, DiffSourceError, HunkId};
use crate::export::write_exports;
use crate::host::{FsWriter, HostView};
use crate::render::{
    layout_rows, present, render, RenderOptions, Segment, SegmentTag, StyleClass, StyleSpan, StyledRow,
};
use crate::review::{LineContext, Outcome, ReviewComment, ReviewSession, SelectionRange, Verdict};
use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tui_textarea::TextArea;

/// Rows of the last presented stream, ready for drawing
#[derive(Default)]
pub struct StreamView {
    segments: Vec<Segment>,
    styles: Vec<StyleSpan>,
    row_starts: Vec<usize>,
    rows: Vec<StyledRow>,
}

impl HostView for StreamView {
    fn render_stream(&mut self, segments: &[Segment]) {
        self.segments = segments.to_vec();
        self.styles.clear();
        self.row_starts.clear();

        let mut cursor = 0;
        for segment in segments {
            self.row_starts.push(cursor);
            cursor += segment.text.len();
        }
    }

    fn apply_style(&mut self, range: Range<usize>, class: StyleClass) {
        self.styles.push(StyleSpan { range, class });
    }

    fn finish_stream(&mut self) {
        self.rows = layout_rows(&self.segments, &self.styles);
    }
}

impl StreamView {
    fn len(&self) -> usize {
        self.segments.len()
    }

    fn tag(&self, row: usize) -> Option<&SegmentTag> {
        self.segments.get(row).map(|s| &s.tag)
    }

    /// Row containing the given byte offset of the stream
    fn row_at_byte(&self, offset: usize) -> usize {
        self.row_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    fn line(&self, row: usize) -> Line<'static> {
        let Some(row) = self.rows.get(row) else {
            return Line::default();
        };

        let spans: Vec<Span<'static>> = row
            .runs
            .iter()
            .map(|run| {
                let text = row.text[run.range.clone()].to_string();
                match run.class {
                    Some(class) => Span::styled(text, tui_style(class)),
                    None => Span::raw(text),
                }
            })
            .collect();
        Line::from(spans)
    }
}

fn tui_style(class: StyleClass) -> Style {
    let base = Style::default();
    match class {
        StyleClass::Help => base.fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        StyleClass::FileBanner => base.fg(Color::Cyan).add_modifier(Modifier::BOLD),
        StyleClass::HunkHeader => base.fg(Color::Magenta),
        StyleClass::Added => base.fg(Color::Green),
        StyleClass::Removed => base.fg(Color::Red),
        StyleClass::Context => base,
        StyleClass::AddedInline => base
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD),
        StyleClass::RemovedInline => base
            .fg(Color::Black)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
        StyleClass::Staged => base.fg(Color::Green).add_modifier(Modifier::DIM),
        StyleClass::Discarded => base.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
        StyleClass::Comment => base.fg(Color::Yellow),
        StyleClass::Border => base.fg(Color::DarkGray),
        StyleClass::Verdict(verdict) => {
            let color = match verdict {
                Verdict::Approved => Color::Green,
                Verdict::NeedsChanges => Color::Yellow,
                Verdict::Rejected => Color::Red,
                Verdict::Question => Color::Blue,
                Verdict::Pending => Color::Reset,
            };
            base.fg(color).add_modifier(Modifier::BOLD)
        }
    }
}

/// Messages from background threads to the UI loop
pub enum WorkerMsg {
    DiffLoaded(Result<String, DiffSourceError>),
    FilesChanged,
}

enum PromptPurpose {
    Comment {
        context: LineContext,
        selection: Option<SelectionRange>,
    },
    OverallFeedback,
    OriginalRequest,
}

enum Mode {
    Normal,
    Help,
    Prompt {
        purpose: PromptPurpose,
        input: TextArea<'static>,
    },
    Snapshot {
        title: String,
        text: String,
        scroll: u16,
    },
}

/// Application state
pub struct App {
    session: ReviewSession,
    source: DiffSource,
    config: Config,
    view: StreamView,

    cursor: usize,
    scroll: usize,
    viewport: usize,
    /// Row where a multi-line selection started
    anchor: Option<usize>,

    mode: Mode,
    message: Option<String>,

    worker_tx: Sender<WorkerMsg>,
    worker_rx: Receiver<WorkerMsg>,
}

impl App {
    pub fn new(session: ReviewSession, source: DiffSource, config: Config) -> Self {
        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        let mut app = Self {
            session,
            source,
            config,
            view: StreamView::default(),
            cursor: 0,
            scroll: 0,
            viewport: 20,
            anchor: None,
            mode: Mode::Normal,
            message: None,
            worker_tx,
            worker_rx,
        };
        app.rerender();
        app
    }

    /// Re-render the whole session into the view
    fn rerender(&mut self) {
        let options = RenderOptions {
            show_help: self.config.show_help,
        };
        let stream = render(&mut self.session, &options);
        present(&stream, &mut self.view);

        self.cursor = self.cursor.min(self.view.len().saturating_sub(1));
        if self.anchor.is_some_and(|row| row >= self.view.len()) {
            self.anchor = None;
        }
        self.ensure_visible();
    }

    fn report(&mut self, outcome: Outcome) {
        debug!("{:?}", outcome);
        self.message = Some(outcome.message().to_string());
    }

    /// Start a background refresh unless one is already running
    fn request_refresh(&mut self) {
        if !self.session.try_begin_refresh() {
            return;
        }

        self.message = Some("Refreshing…".to_string());
        let source = self.source.clone();
        let tx = self.worker_tx.clone();
        thread::spawn(move || {
            let result = source.fetch_diff();
            // The UI may already be gone
            let _ = tx.send(WorkerMsg::DiffLoaded(result));
        });
    }

    fn drain_worker(&mut self) {
        while let Ok(msg) = self.worker_rx.try_recv() {
            match msg {
                WorkerMsg::DiffLoaded(result) => {
                    let outcome = self.session.finish_refresh(result);
                    self.report(outcome);
                    self.rerender();
                }
                WorkerMsg::FilesChanged => self.request_refresh(),
            }
        }
    }

    fn start_watcher(&self) -> Option<RecommendedWatcher> {
        if !self.config.watch || matches!(self.source.mode(), DiffMode::Patch { .. }) {
            return None;
        }

        let root = self.source.repo_path();
        let export_dir = self.config.export_dir_for(root);
        match spawn_watcher(root, export_dir, self.worker_tx.clone()) {
            Ok(watcher) => {
                info!("Watching {}", root.display());
                Some(watcher)
            }
            Err(e) => {
                warn!("File watching disabled: {}", e);
                None
            }
        }
    }

    fn current_tag(&self) -> Option<&SegmentTag> {
        self.view.tag(self.cursor)
    }

    fn current_hunk(&self) -> Option<HunkId> {
        self.current_tag().and_then(|t| t.hunk_id.clone())
    }

    /// Apply an action to the hunk under the cursor, then re-render
    fn on_hunk(&mut self, action: impl FnOnce(&mut ReviewSession, &HunkId) -> Outcome) {
        let Some(id) = self.current_hunk() else {
            self.message = Some("No hunk under cursor".to_string());
            return;
        };

        let outcome = action(&mut self.session, &id);
        self.report(outcome);
        self.rerender();
    }

    fn ensure_visible(&mut self) {
        let viewport = self.viewport.max(1);
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + viewport {
            self.scroll = self.cursor + 1 - viewport;
        }
    }

    fn move_to(&mut self, row: usize) {
        self.cursor = row.min(self.view.len().saturating_sub(1));
        self.ensure_visible();
    }

    fn move_by(&mut self, delta: isize) {
        self.move_to(self.cursor.saturating_add_signed(delta));
    }

    fn hunk_rows(&self) -> Vec<usize> {
        self.session
            .hunks
            .iter()
            .map(|h| self.view.row_at_byte(h.byte_offset))
            .collect()
    }

    fn next_hunk(&mut self) {
        match self.hunk_rows().into_iter().find(|&row| row > self.cursor) {
            Some(row) => self.move_to(row),
            None => self.message = Some("Last hunk".to_string()),
        }
    }

    fn prev_hunk(&mut self) {
        match self.hunk_rows().into_iter().filter(|&row| row < self.cursor).last() {
            Some(row) => self.move_to(row),
            None => self.message = Some("First hunk".to_string()),
        }
    }

    fn toggle_anchor(&mut self) {
        if self.anchor.take().is_some() {
            self.message = Some("Selection cleared".to_string());
        } else if self.current_tag().is_some_and(|t| t.line.is_some()) {
            self.anchor = Some(self.cursor);
            self.message = Some("Selection started; move and press c to comment".to_string());
        } else {
            self.message = Some("Selections start on a diff line".to_string());
        }
    }

    fn start_comment(&mut self) {
        let Some(context) = self.current_tag().and_then(LineContext::from_tag) else {
            self.message = Some("Move the cursor onto a hunk to comment".to_string());
            return;
        };

        let selection = self.anchor.take().and_then(|row| {
            let start = self.view.tag(row)?.line.as_ref()?;
            SelectionRange::between(start, context.line.as_ref()?)
        });

        let title = match (&selection, &context.line) {
            (Some(s), _) => format!(" Comment on {} lines {}-{} ", context.file, s.start_line, s.end_line),
            (None, Some(line)) => format!(
                " Comment on {} line {} ",
                context.file,
                line.new_line.or(line.old_line).unwrap_or_default()
            ),
            (None, None) => format!(" Comment on hunk {} ", context.hunk_id),
        };

        self.open_prompt(PromptPurpose::Comment { context, selection }, title, "");
    }

    fn open_prompt(&mut self, purpose: PromptPurpose, title: String, initial: &str) {
        let mut input = if initial.is_empty() {
            TextArea::default()
        } else {
            TextArea::from(initial.lines())
        };
        input.set_block(Block::default().borders(Borders::ALL).title(title));
        self.mode = Mode::Prompt { purpose, input };
    }

    fn submit_prompt(&mut self, purpose: PromptPurpose, text: String) {
        let outcome = match purpose {
            PromptPurpose::Comment { context, selection } => {
                let text = text.trim_end();
                if text.trim().is_empty() {
                    Outcome::Skipped("Empty comment discarded".to_string())
                } else {
                    let mut comment = ReviewComment::new(context, text);
                    if let Some(selection) = selection {
                        comment = comment.with_selection(selection);
                    }
                    self.session.add_comment(comment)
                }
            }
            PromptPurpose::OverallFeedback => self.session.set_overall_feedback(&text),
            PromptPurpose::OriginalRequest => self.session.set_original_request(&text),
        };

        self.report(outcome);
        self.rerender();
    }

    fn export(&mut self) {
        let (report, document) = self.config.export_paths(self.source.repo_path());
        let outcome = write_exports(&self.session, &FsWriter, &report, &document, Utc::now());
        self.report(outcome);
    }

    fn show_snapshot(&mut self) {
        let Some(file) = self.current_tag().and_then(|t| t.file.clone()) else {
            self.message = Some("No file under cursor".to_string());
            return;
        };

        match self.source.file_at_revision(&file) {
            Ok(text) => {
                let revision = match self.source.mode().base_revision() {
                    Some("") | None => "index",
                    Some(rev) => rev,
                };
                self.mode = Mode::Snapshot {
                    title: format!(" {} @ {} ", file, revision),
                    text,
                    scroll: 0,
                };
            }
            Err(e) => {
                warn!("Snapshot of {} failed: {}", file, e);
                self.message = Some(format!("Snapshot failed: {}", e));
            }
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> Result<bool> {
        match &self.mode {
            Mode::Normal => {
                self.message = None;
                Ok(self.handle_normal_input(key))
            }
            Mode::Help => {
                self.mode = Mode::Normal;
                Ok(false)
            }
            Mode::Prompt { .. } => {
                self.handle_prompt_input(key);
                Ok(false)
            }
            Mode::Snapshot { .. } => {
                self.handle_snapshot_input(key);
                Ok(false)
            }
        }
    }

    fn handle_normal_input(&mut self, key: KeyEvent) -> bool {
        let page = self.viewport.max(1) as isize;

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('?') => self.mode = Mode::Help,

            // Navigation
            KeyCode::Char('j') | KeyCode::Down => self.move_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_by(-1),
            KeyCode::PageDown => self.move_by(page),
            KeyCode::PageUp => self.move_by(-page),
            KeyCode::Char('g') | KeyCode::Home => self.move_to(0),
            KeyCode::Char('G') | KeyCode::End => self.move_to(usize::MAX),
            KeyCode::Char('n') => self.next_hunk(),
            KeyCode::Char('N') => self.prev_hunk(),

            // Staging
            KeyCode::Char('s') => self.on_hunk(|s, id| s.stage(id)),
            KeyCode::Char('d') => self.on_hunk(|s, id| s.discard(id)),
            KeyCode::Char('u') => self.on_hunk(|s, id| s.clear_staging(id)),

            // Verdicts
            KeyCode::Char('1') => self.on_hunk(|s, id| s.set_verdict(id, Verdict::Approved)),
            KeyCode::Char('2') => self.on_hunk(|s, id| s.set_verdict(id, Verdict::NeedsChanges)),
            KeyCode::Char('3') => self.on_hunk(|s, id| s.set_verdict(id, Verdict::Rejected)),
            KeyCode::Char('4') => self.on_hunk(|s, id| s.set_verdict(id, Verdict::Question)),
            KeyCode::Char('0') => self.on_hunk(|s, id| s.clear_verdict(id)),

            // Comments and feedback
            KeyCode::Char('c') => self.start_comment(),
            KeyCode::Char('v') => self.toggle_anchor(),
            KeyCode::Char('f') => {
                let initial = self.session.overall_feedback.clone().unwrap_or_default();
                self.open_prompt(PromptPurpose::OverallFeedback, " Overall feedback ".to_string(), &initial);
            }
            KeyCode::Char('o') => {
                let initial = self.session.original_request.clone().unwrap_or_default();
                self.open_prompt(PromptPurpose::OriginalRequest, " Original request ".to_string(), &initial);
            }

            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('p') => self.show_snapshot(),
            KeyCode::Esc => {
                self.anchor = None;
            }

            _ => {}
        }

        false
    }

    fn handle_prompt_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.message = Some("Cancelled".to_string());
            }
            KeyCode::Enter if !key.modifiers.contains(KeyModifiers::ALT) => {
                if let Mode::Prompt { purpose, input } = std::mem::replace(&mut self.mode, Mode::Normal) {
                    self.submit_prompt(purpose, input.lines().join("\n"));
                }
            }
            _ => {
                if let Mode::Prompt { input, .. } = &mut self.mode {
                    if key.code == KeyCode::Enter {
                        input.insert_newline();
                    } else {
                        input.input(key);
                    }
                }
            }
        }
    }

    fn handle_snapshot_input(&mut self, key: KeyEvent) {
        let Mode::Snapshot { scroll, .. } = &mut self.mode else {
            return;
        };

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => *scroll = scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => *scroll = scroll.saturating_sub(1),
            KeyCode::PageDown => *scroll = scroll.saturating_add(20),
            KeyCode::PageUp => *scroll = scroll.saturating_sub(20),
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('p') => self.mode = Mode::Normal,
            _ => {}
        }
    }
}

fn spawn_watcher(root: &Path, export_dir: PathBuf, tx: Sender<WorkerMsg>) -> notify::Result<RecommendedWatcher> {
    let repo = root.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            if event.paths.iter().any(|p| !is_ignored(p, &repo, &export_dir)) {
                let _ = tx.send(WorkerMsg::FilesChanged);
            }
        }
        Err(e) => warn!("Watch error: {}", e),
    })?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Paths whose changes never affect the diff: exports and git internals other than the index
fn is_ignored(path: &Path, repo: &Path, export_dir: &Path) -> bool {
    if path.starts_with(export_dir) {
        return true;
    }
    let Ok(rel) = path.strip_prefix(repo) else {
        return false;
    };

    match rel.components().next() {
        Some(first) if first.as_os_str() == ".git" => rel != Path::new(".git/index"),
        _ => false,
    }
}

/// Runs the TUI application
pub fn run(session: ReviewSession, source: DiffSource, config: Config) -> Result<()> {
    let mut app = App::new(session, source, config);
    let _watcher = app.start_watcher();
    app.request_refresh();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.drain_worker();

        // Header and status take three rows each, the stream border two more
        app.viewport = terminal.size()?.height.saturating_sub(8) as usize;
        app.ensure_visible();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_input(key)? {
                    return Ok(());
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Review stream
            Constraint::Length(3), // Status
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_stream(f, app, chunks[1]);
    render_status(f, app, chunks[2]);

    match &app.mode {
        Mode::Normal => {}
        Mode::Help => render_help(f),
        Mode::Prompt { input, .. } => {
            let area = centered_rect(70, 40, f.area());
            f.render_widget(Clear, area);
            f.render_widget(input, area);
        }
        Mode::Snapshot { title, text, scroll } => render_snapshot(f, title, text, *scroll),
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut info = format!(
        " {} | {} hunks in {} files | {} staged | {} comments",
        app.session.source_label().unwrap_or("no source"),
        app.session.hunks.len(),
        app.session.file_count(),
        app.session.staged_count(),
        app.session.comments.len()
    );
    if app.session.is_refreshing() {
        info.push_str(" | refreshing…");
    }

    let header = Paragraph::new(info)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" revdiff "));

    f.render_widget(header, area);
}

fn render_stream(f: &mut Frame, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let selection = app
        .anchor
        .map(|anchor| (anchor.min(app.cursor), anchor.max(app.cursor)));

    let items: Vec<ListItem> = (app.scroll..app.view.len())
        .take(visible_height)
        .map(|row| {
            let mut line = app.view.line(row);
            if row == app.cursor {
                line = line.patch_style(Style::default().add_modifier(Modifier::REVERSED));
            } else if selection.is_some_and(|(start, end)| start <= row && row <= end) {
                line = line.patch_style(Style::default().bg(Color::DarkGray));
            }
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL));
    f.render_widget(list, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let content = match (&app.mode, &app.message) {
        (Mode::Prompt { .. }, _) => " Enter: save | Alt+Enter: new line | Esc: cancel".to_string(),
        (Mode::Snapshot { .. }, _) => " j/k: scroll | Esc: close".to_string(),
        (_, Some(msg)) => format!(" {}", msg),
        (_, None) => {
            " j/k: move | n/N: hunks | s/d/u: stage | 1-4/0: verdict | c: comment | e: export | ?: help | q: quit"
                .to_string()
        }
    };

    let status = Paragraph::new(content)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn render_snapshot(f: &mut Frame, title: &str, text: &str, scroll: u16) {
    let area = centered_rect(85, 85, f.area());
    let snapshot = Paragraph::new(text.to_string())
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .scroll((scroll, 0));

    f.render_widget(Clear, area);
    f.render_widget(snapshot, area);
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());

    let help_text = [
        "",
        "  Navigation:",
        "    j / ↓       Move down",
        "    k / ↑       Move up",
        "    PgDn / PgUp Move a page",
        "    g / G       Go to top / bottom",
        "    n / N       Next / previous hunk",
        "",
        "  Hunk under cursor:",
        "    s           Stage",
        "    d           Discard",
        "    u           Undo staging",
        "    1 2 3 4     Approve / needs changes / reject / question",
        "    0           Clear verdict",
        "",
        "  Review:",
        "    c           Comment on line (or selection)",
        "    v           Start / clear a line selection",
        "    f           Overall feedback",
        "    o           Original request",
        "    p           Show file at the old revision",
        "    e           Export report and session",
        "    r           Refresh diff",
        "",
        "  Other:",
        "    ?           Toggle this help",
        "    q           Quit",
        "",
    ];

    let help = Paragraph::new(help_text.join("\n"))
        .style(Style::default())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
