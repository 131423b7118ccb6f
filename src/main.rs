use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use format_bridge::config::{load_for_workspace, load_from_path, FormatterConfig};
use format_bridge::{
    apply_edits, write_atomic, FormatError, FormatOutcome, Formatter, Position, Range,
    SkipReason, SourceDocument, TextDocument, VariableContext,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "format-bridge")]
#[command(about = "Format files through a clang-format compatible formatter", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to format-bridge.toml in the workspace root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root used for ${workspaceRoot} and ignored paths
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format files; directories are searched for configured extensions
    Format {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write results back to the files
        #[arg(long, conflicts_with = "check")]
        write: bool,

        /// Exit with status 1 if any file would change
        #[arg(long)]
        check: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Only format LINE:COL-LINE:COL (1-based, end exclusive)
        #[arg(long, value_parser = parse_range)]
        range: Option<Range>,
    },

    /// Print the formatter's edits for a file as JSON
    Edits {
        file: PathBuf,

        /// Only format LINE:COL-LINE:COL (1-based, end exclusive)
        #[arg(long, value_parser = parse_range)]
        range: Option<Range>,
    },

    /// Print the resolved formatter executable
    Resolve {
        /// Executable name (defaults to the configured one)
        name: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = format_bridge::log::init(cli.verbose) {
        eprintln!("{}", format!("Warning: logging unavailable: {e}").yellow());
    }

    let workspace = resolve_workspace(cli.workspace)?;
    let (config, config_path) = load_config(cli.config.as_deref(), &workspace)?;
    let formatter = Formatter::new(config, VariableContext::from_env(Some(workspace)));

    match cli.command {
        Commands::Format {
            paths,
            write,
            check,
            diff,
            range,
        } => cmd_format(&formatter, paths, write, check, diff, range).await,

        Commands::Edits { file, range } => cmd_edits(&formatter, &file, range).await,

        Commands::Resolve { name } => cmd_resolve(&formatter, name),

        Commands::Config => cmd_config(&formatter, config_path.as_deref()),
    }
}

/// Parse `LINE:COL-LINE:COL` (1-based) into a zero-based range.
fn parse_range(input: &str) -> Result<Range, String> {
    let (start, end) = input
        .split_once('-')
        .ok_or_else(|| format!("expected LINE:COL-LINE:COL, got '{input}'"))?;
    let start = parse_position(start)?;
    let end = parse_position(end)?;
    if end < start {
        return Err(format!("range end is before its start in '{input}'"));
    }
    Ok(Range::new(start, end))
}

fn parse_position(input: &str) -> Result<Position, String> {
    let (line, column) = input
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COL, got '{input}'"))?;
    let parse = |value: &str, what: &str| -> Result<usize, String> {
        match value.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("{what} must be a positive integer, got '{value}'")),
            Ok(n) => Ok(n - 1),
        }
    };
    Ok(Position::new(parse(line, "line")?, parse(column, "column")?))
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("cannot read current directory")?;
    Ok(match workspace {
        Some(path) if path.is_absolute() => path,
        Some(path) => cwd.join(path),
        None => cwd,
    })
}

fn load_config(
    explicit: Option<&Path>,
    workspace: &Path,
) -> Result<(FormatterConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = load_from_path(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }
    let config = load_for_workspace(workspace)?;
    Ok((config, format_bridge::config::discover(workspace)))
}

/// Expand the command line paths into files to format.
///
/// Files named explicitly are always formatted; directories contribute only
/// files with a configured extension.
fn collect_files(paths: &[PathBuf], config: &FormatterConfig) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir().context("cannot read current directory")?;
    let mut files = Vec::new();

    for path in paths {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };

        if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && config.matches_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path);
        } else {
            anyhow::bail!("{} does not exist", path.display());
        }
    }

    Ok(files)
}

/// Ctrl-C cancels the formatter run in flight.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Helper: Show unified diff between original and formatted content
fn display_diff(file: &Path, original: &str, formatted: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (formatted)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, formatted);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_failure(file: &Path, error: &FormatError) {
    eprintln!("{} {}: {}", "✗".red(), file.display(), error);
    if let Some(stderr) = error.stderr() {
        for line in stderr.lines() {
            eprintln!("  {}", line.dimmed());
        }
    }
}

async fn cmd_format(
    formatter: &Formatter,
    paths: Vec<PathBuf>,
    write: bool,
    check: bool,
    show_diff: bool,
    range: Option<Range>,
) -> Result<()> {
    let files = collect_files(&paths, formatter.config())?;

    let mut total_changed = 0;
    let mut total_unchanged = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for file in &files {
        let document = SourceDocument::open(file)
            .with_context(|| format!("failed to read {}", file.display()))?;

        let edits = match formatter.format(&document, range, interrupted()).await {
            Ok(FormatOutcome::Edits(edits)) => edits,
            Ok(FormatOutcome::Skipped(SkipReason::ExecutableNotFound(exe))) => {
                println!(
                    "{}",
                    format!(
                        "The {} command is not available; nothing was formatted.",
                        exe.display()
                    )
                    .yellow()
                );
                return Ok(());
            }
            Ok(FormatOutcome::Skipped(reason)) => {
                println!("{} {}: Skipped ({:?})", "⊘".cyan(), file.display(), reason);
                total_skipped += 1;
                continue;
            }
            Err(e) if e.is_cancelled() => {
                eprintln!("{}", "Interrupted".yellow());
                std::process::exit(130);
            }
            Err(e) => {
                report_failure(file, &e);
                total_failed += 1;
                continue;
            }
        };

        let original = document.text();
        let formatted = apply_edits(original, &edits)?;

        if formatted == original {
            total_unchanged += 1;
            if !write && !check && !show_diff {
                print!("{formatted}");
            }
            continue;
        }
        total_changed += 1;

        if show_diff {
            display_diff(file, original, &formatted);
        }

        if write {
            write_atomic(file, formatted.as_bytes())?;
            println!("{} {}: Formatted", "✓".green(), file.display());
        } else if check {
            println!("{} {}: Would reformat", "⊙".yellow(), file.display());
        } else if !show_diff {
            print!("{formatted}");
        }
    }

    if write || check {
        println!();
        println!("{}", "Summary:".bold());
        let changed = if write { "formatted" } else { "would change" };
        println!("  {} {changed}", format!("{}", total_changed).green());
        println!("  {} unchanged", format!("{}", total_unchanged).normal());
        println!("  {} skipped", format!("{}", total_skipped).cyan());
        println!("  {} failed", format!("{}", total_failed).red());
    }

    if total_failed > 0 || (check && total_changed > 0) {
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_edits(formatter: &Formatter, file: &Path, range: Option<Range>) -> Result<()> {
    let document = SourceDocument::open(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    match formatter.format(&document, range, interrupted()).await {
        Ok(outcome) => {
            let edits = outcome.into_edits();
            println!("{}", serde_json::to_string_pretty(&edits)?);
            Ok(())
        }
        Err(e) => {
            report_failure(file, &e);
            std::process::exit(1);
        }
    }
}

fn cmd_resolve(formatter: &Formatter, name: Option<String>) -> Result<()> {
    let path = match name {
        Some(name) => {
            let name = formatter.variables().expand(&name);
            format_bridge::ExecutableResolver::new().resolve(&name)
        }
        None => formatter.executable(),
    };
    println!("{}", path.display());
    Ok(())
}

fn cmd_config(formatter: &Formatter, source: Option<&Path>) -> Result<()> {
    match source {
        Some(path) => eprintln!("{}", format!("Loaded from {}", path.display()).dimmed()),
        None => eprintln!("{}", "No config file found, using defaults".dimmed()),
    }
    println!("{}", serde_json::to_string_pretty(formatter.config())?);
    Ok(())
}
