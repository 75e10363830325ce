//! Narrow interfaces to the collaborators around the review engine
//!
//! Process execution, report writing and the display surface are reached only
//! through these traits. The system implementations live here too; the
//! interactive terminal view is in `tui.rs`.

use crate::render::{layout_rows, Segment, StyleClass, StyleSpan};
use crate::review::Verdict;
use crossterm::style::{Attribute, Attributes, Color, ContentStyle};
use log::debug;
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::process::Command;

/// Result of running an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands (git) on behalf of the diff source
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &str, args: &[String], cwd: &Path) -> io::Result<ProcessOutput>;
}

/// Runs commands with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &str, args: &[String], cwd: &Path) -> io::Result<ProcessOutput> {
        let output = Command::new(command).args(args).current_dir(cwd).output()?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Destination for exported review documents
pub trait FileWriter {
    fn write_file(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Writes to the local file system, creating parent directories as needed
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl FileWriter for FsWriter {
    fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

/// Display surface for a rendered review stream.
///
/// `render_stream` replaces the whole text; the `apply_style` calls that
/// follow address absolute byte ranges in it. Later styles win where ranges
/// overlap. `finish_stream` marks the end of one presentation.
pub trait HostView {
    fn render_stream(&mut self, segments: &[Segment]);
    fn apply_style(&mut self, range: Range<usize>, class: StyleClass);
    fn finish_stream(&mut self) {}
}

/// Prints the stream to a terminal using ANSI escape sequences
pub struct AnsiHost {
    segments: Vec<Segment>,
    styles: Vec<StyleSpan>,
    color: bool,
}

impl AnsiHost {
    pub fn new(color: bool) -> Self {
        Self {
            segments: Vec::new(),
            styles: Vec::new(),
            color,
        }
    }

    /// Write the presented stream, one row per line
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in layout_rows(&self.segments, &self.styles) {
            for run in &row.runs {
                let text = &row.text[run.range.clone()];
                match run.class {
                    Some(class) if self.color => write!(out, "{}", ansi_style(class).apply(text))?,
                    _ => out.write_all(text.as_bytes())?,
                }
            }
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

impl HostView for AnsiHost {
    fn render_stream(&mut self, segments: &[Segment]) {
        self.segments = segments.to_vec();
        self.styles.clear();
    }

    fn apply_style(&mut self, range: Range<usize>, class: StyleClass) {
        self.styles.push(StyleSpan { range, class });
    }
}

fn ansi_style(class: StyleClass) -> ContentStyle {
    let (fg, bg, attrs): (Option<Color>, Option<Color>, &[Attribute]) = match class {
        StyleClass::Help => (Some(Color::DarkGrey), None, &[Attribute::Italic]),
        StyleClass::FileBanner => (Some(Color::Cyan), None, &[Attribute::Bold]),
        StyleClass::HunkHeader => (Some(Color::Magenta), None, &[]),
        StyleClass::Added => (Some(Color::Green), None, &[]),
        StyleClass::Removed => (Some(Color::Red), None, &[]),
        StyleClass::Context => (None, None, &[]),
        StyleClass::AddedInline => (Some(Color::Black), Some(Color::Green), &[Attribute::Bold]),
        StyleClass::RemovedInline => (Some(Color::Black), Some(Color::Red), &[Attribute::Bold]),
        StyleClass::Staged => (Some(Color::DarkGreen), None, &[Attribute::Dim]),
        StyleClass::Discarded => (Some(Color::DarkGrey), None, &[Attribute::CrossedOut]),
        StyleClass::Comment => (Some(Color::Yellow), None, &[]),
        StyleClass::Border => (Some(Color::DarkGrey), None, &[]),
        StyleClass::Verdict(verdict) => {
            let color = match verdict {
                Verdict::Approved => Color::Green,
                Verdict::NeedsChanges => Color::Yellow,
                Verdict::Rejected => Color::Red,
                Verdict::Question => Color::Blue,
                Verdict::Pending => Color::Reset,
            };
            (Some(color), None, &[Attribute::Bold])
        }
    };

    let mut attributes = Attributes::default();
    for attr in attrs {
        attributes.set(*attr);
    }

    ContentStyle {
        foreground_color: fg,
        background_color: bg,
        underline_color: None,
        attributes,
    }
}
