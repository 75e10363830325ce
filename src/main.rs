//! revdiff - Hunk-by-hunk review of git diffs
//!
//! Walk a diff, stage or discard hunks, give each one a verdict, comment on
//! lines, and export the review as a markdown report plus a JSON session
//! document.

mod config;
mod diff;
mod export;
mod host;
mod line_diff;
mod render;
mod review;
mod tui;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::diff::{find_repo_root, DiffMode, DiffSource};
use crate::export::{export, write_exports, ExportFormat};
use crate::host::{AnsiHost, FileWriter, FsWriter, SystemRunner};
use crate::render::{present, render, RenderOptions};
use crate::review::ReviewSession;

#[derive(Parser)]
#[command(name = "revdiff")]
#[command(about = "Review a git diff hunk by hunk and export the review")]
#[command(version)]
struct Cli {
    /// Log at info level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Which diff to review
#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Base revision; without revisions the unstaged changes are reviewed
    from: Option<String>,

    /// Target revision
    #[arg(requires = "from")]
    to: Option<String>,

    /// Review staged changes
    #[arg(long, conflicts_with_all = ["from", "to", "input"])]
    staged: bool,

    /// Compare TO against its merge base with FROM
    #[arg(long, requires = "to")]
    merge_base: bool,

    /// Read a unified diff from a file ("-" for stdin) instead of running git
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    input: Option<PathBuf>,

    /// Context lines around each change
    #[arg(short = 'U', long = "context")]
    context: Option<u32>,
}

impl SourceArgs {
    fn mode(&self) -> DiffMode {
        if let Some(path) = &self.input {
            return DiffMode::Patch { path: path.clone() };
        }
        if self.staged {
            return DiffMode::Staged;
        }

        match (&self.from, &self.to) {
            (Some(from), Some(to)) if self.merge_base => DiffMode::MergeBase {
                from: from.clone(),
                to: to.clone(),
            },
            (Some(from), Some(to)) => DiffMode::Commits {
                from: from.clone(),
                to: to.clone(),
            },
            (Some(base), None) => DiffMode::WorkingTree { base: base.clone() },
            _ => DiffMode::Unstaged,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Review the diff interactively (default)
    Review {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the rendered review once
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Disable colors
        #[arg(long)]
        no_color: bool,
    },

    /// Export a review of the diff
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Single document format: markdown (md) or json. Without it both
        /// documents are written to the export directory.
        #[arg(short, long)]
        format: Option<String>,

        /// Output file for a single document (default: stdout)
        #[arg(short, long, requires = "format")]
        output: Option<PathBuf>,

        /// Directory for the report and session documents
        #[arg(long, conflicts_with = "format")]
        export_dir: Option<PathBuf>,

        /// Original request the change was made for
        #[arg(long)]
        request: Option<String>,

        /// Overall feedback
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Show the configuration file path, or create it
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Review {
        source: SourceArgs::default(),
    });

    init_logging(cli.verbose, matches!(command, Commands::Review { .. }))?;
    let config = Config::load()?;

    match command {
        Commands::Review { source } => cmd_review(&source, config),
        Commands::Show { source, no_color } => cmd_show(&source, config, no_color),
        Commands::Export {
            source,
            format,
            output,
            export_dir,
            request,
            feedback,
        } => {
            let config = config.with_overrides(source.context, export_dir);
            cmd_export(&source, config, format.as_deref(), output, request, feedback)
        }
        Commands::Config { init } => cmd_config(init, &config),
    }
}

/// Log to stderr, or to the log file while the terminal UI owns the screen
fn init_logging(verbose: bool, interactive: bool) -> Result<()> {
    let default_level = if verbose { "info" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if interactive {
        let path = Config::log_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn diff_source(args: &SourceArgs, config: &Config) -> Result<DiffSource> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let mode = args.mode();

    // A patch file can be reviewed outside any repository
    let repo_path = match mode {
        DiffMode::Patch { .. } => find_repo_root(&cwd).unwrap_or(cwd),
        _ => find_repo_root(&cwd)?,
    };

    info!("Reviewing {} in {}", mode.label(), repo_path.display());
    Ok(DiffSource::new(
        repo_path,
        config.context_lines,
        mode,
        Arc::new(SystemRunner),
    ))
}

/// Fetch the diff once into a fresh session
fn load_session(source: &DiffSource) -> Result<ReviewSession> {
    let mut session = ReviewSession::new();
    session.start(&source.mode().label());

    let outcome = session.refresh(source);
    if !outcome.is_applied() {
        bail!("{}", outcome.message());
    }
    Ok(session)
}

fn cmd_review(args: &SourceArgs, config: Config) -> Result<()> {
    let config = config.with_overrides(args.context, None);
    let source = diff_source(args, &config)?;

    let mut session = ReviewSession::new();
    session.start(&source.mode().label());

    tui::run(session, source, config)
}

fn cmd_show(args: &SourceArgs, config: Config, no_color: bool) -> Result<()> {
    let config = config.with_overrides(args.context, None);
    let source = diff_source(args, &config)?;
    let mut session = load_session(&source)?;

    let stream = render(
        &mut session,
        &RenderOptions {
            show_help: false,
        },
    );
    let mut host = AnsiHost::new(!no_color && io::stdout().is_terminal());
    present(&stream, &mut host);
    host.write_to(&mut io::stdout().lock())
        .context("Failed to write to stdout")?;

    Ok(())
}

fn cmd_export(
    args: &SourceArgs,
    config: Config,
    format: Option<&str>,
    output: Option<PathBuf>,
    request: Option<String>,
    feedback: Option<String>,
) -> Result<()> {
    let source = diff_source(args, &config)?;
    let mut session = load_session(&source)?;

    if let Some(request) = request {
        session.set_original_request(&request);
    }
    if let Some(feedback) = feedback {
        session.set_overall_feedback(&feedback);
    }

    let Some(format) = format else {
        let (report, document) = config.export_paths(source.repo_path());
        let outcome = write_exports(&session, &FsWriter, &report, &document, Utc::now());
        if !outcome.is_applied() {
            bail!("{}", outcome.message());
        }
        println!("{}", outcome.message());
        return Ok(());
    };

    let export_format =
        ExportFormat::from_str(format).context("Invalid format. Use: markdown (md) or json")?;
    let content = export(&session, export_format, Utc::now())?;

    if let Some(path) = output {
        FsWriter
            .write_file(&path, &content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
        println!("Exported to {}", path.display());
    } else {
        print!("{}", content);
    }

    Ok(())
}

fn cmd_config(init: bool, config: &Config) -> Result<()> {
    if init {
        let path = Config::create_default()?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    println!("# {}", Config::default_path().display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
