use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tplfold_core::{
    format_file, format_folded_screen, format_output, EditorConfig, FoldingError,
    MemoryEditor, OutputFormat, Point, ProjectScanner, ScanConfig, SourceKind, TemplateFoldings,
    TextSurface,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tplfold")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fold C++ template parameter lists behind one-line previews")]
#[command(long_about = "Finds `template<...>` declarations in C++ sources and condenses each \
    parameter list into a compact preview:\n\n\
    template<\n        typename Key,\n        class Value = std::string\n    >\n\n\
    becomes `template<Key, Value = std::string>`.\n\n\
    Without a subcommand the project at PATH is scanned and a template map is printed.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
    pub format: OutputFormatArg,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only scan headers or sources
    #[arg(long, value_enum)]
    pub kind: Option<KindFilter>,

    /// Additional ignore patterns (glob)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Extra ignore file in gitignore syntax
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// Parallel threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Disable colors in terminal output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show progress and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a project and show template statistics
    Scan {
        /// Project root directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Ansi)]
        format: OutputFormatArg,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the template declarations of a single file
    List {
        /// File to analyze
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
        format: OutputFormatArg,
    },

    /// Fold every template of a file and print the folded screen
    Render {
        /// File to render
        file: PathBuf,

        /// Force ANSI colors
        #[arg(long)]
        ansi: bool,

        /// TOML file with an [editor] table
        #[arg(long)]
        editor_config: Option<PathBuf>,

        /// Preferred line length used when soft wrap is on
        #[arg(long)]
        preferred_line_length: Option<usize>,

        /// Soft wrap at the preferred line length
        #[arg(long)]
        soft_wrap: bool,

        /// Cursor position as ROW:COLUMN (one-based); its preview is highlighted
        #[arg(long, value_parser = parse_cursor)]
        cursor: Option<Point>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
    Ansi,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindFilter {
    Header,
    Source,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match &args.command {
        Some(Commands::Scan { path, format, output }) => {
            run_scan(path, *format, output.as_deref(), &args)
        }
        Some(Commands::List { file, format }) => run_list(file, *format, &args),
        Some(Commands::Render {
            file,
            ansi,
            editor_config,
            preferred_line_length,
            soft_wrap,
            cursor,
        }) => {
            let config = load_editor_config(
                editor_config.as_deref(),
                *preferred_line_length,
                *soft_wrap,
            )?;
            run_render(file, *ansi, config, *cursor, &args)
        }
        None => run_scan(&args.path, args.format, args.output.as_deref(), &args),
    }
}

/// Filter priority: `TPLFOLD_LOG` > `RUST_LOG` > `warn` (`debug` with --verbose)
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = env::var("TPLFOLD_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_scan(
    path: &Path,
    format: OutputFormatArg,
    output_file: Option<&Path>,
    args: &Args,
) -> anyhow::Result<()> {
    let mut config = ScanConfig::new(path.to_path_buf())
        .with_ignore_patterns(args.ignore.clone())
        .with_include_hidden(args.include_hidden)
        .with_threads(args.threads);

    if let Some(kind) = args.kind {
        config = config.with_kind_filter(vec![match kind {
            KindFilter::Header => SourceKind::Header,
            KindFilter::Source => SourceKind::Source,
        }]);
    }

    if let Some(ref ignore_file) = args.ignore_file {
        config = config.with_ignore_file(ignore_file.clone());
    }

    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let scanner = ProjectScanner::new(config)?;
    let result = scanner.scan()?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let format = match format {
        OutputFormatArg::Ansi if args.no_color => OutputFormatArg::Summary,
        other => other,
    };
    let output = format_output(&result, format.into())?;

    if let Some(path) = output_file {
        fs::write(path, &output)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if args.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn run_list(file: &Path, format: OutputFormatArg, args: &Args) -> anyhow::Result<()> {
    let scanner = ProjectScanner::new(ScanConfig::default())?;
    let source_file = scanner
        .scan_file(file)
        .with_context(|| format!("failed to scan {}", file.display()))?;

    let format = match format {
        OutputFormatArg::Ansi if args.no_color => OutputFormatArg::Summary,
        other => other,
    };
    let output = format_file(&source_file, format.into())?;

    print!("{}", output);
    Ok(())
}

fn run_render(
    file: &Path,
    ansi: bool,
    config: EditorConfig,
    cursor: Option<Point>,
    args: &Args,
) -> anyhow::Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut editor = MemoryEditor::with_config(&text, config);
    if let Some(cursor) = cursor {
        editor.set_cursor(cursor);
    }

    let mut foldings = TemplateFoldings::new(editor);
    tracing::debug!("rendering {}", file.display());
    match foldings.fold_all() {
        Ok(report) => {
            for line in report.notification_lines() {
                eprintln!("{}: {}", file.display(), line);
            }
            if args.verbose {
                eprintln!(
                    "--- {} templates folded, {} skipped, {} failed ---",
                    report.folded,
                    report.skipped,
                    report.failures.len()
                );
            }
        }
        Err(err @ FoldingError::UnsupportedSoftWrap) => eprintln!("warning: {}", err),
    }

    let colored = ansi || (atty::is(atty::Stream::Stdout) && !args.no_color);
    print!("{}", format_folded_screen(foldings.surface(), colored)?);
    Ok(())
}

fn load_editor_config(
    path: Option<&Path>,
    preferred_line_length: Option<usize>,
    soft_wrap: bool,
) -> anyhow::Result<EditorConfig> {
    let mut config = match path {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load editor config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if soft_wrap {
        config.soft_wrap = true;
        config.soft_wrap_at_preferred_line_length = true;
    }
    if let Some(length) = preferred_line_length {
        anyhow::ensure!(length > 0, "preferred line length must be positive");
        config.preferred_line_length = length;
    }
    Ok(config)
}

/// `ROW:COLUMN`, one-based, into a zero-based point
fn parse_cursor(value: &str) -> Result<Point, String> {
    let (row, column) = value
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:COLUMN, got '{}'", value))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("'{}' is not a positive number", part))
    };
    Ok(Point::new(parse(row)? - 1, parse(column)? - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor() {
        assert_eq!(parse_cursor("15:6"), Ok(Point::new(14, 5)));
        assert!(parse_cursor("15").is_err());
        assert!(parse_cursor("0:1").is_err());
        assert!(parse_cursor("a:1").is_err());
    }

    #[test]
    fn test_editor_config_overrides() {
        let config = load_editor_config(None, Some(100), true).unwrap();
        assert!(config.soft_wrap);
        assert!(config.soft_wrap_at_preferred_line_length);
        assert_eq!(config.preferred_line_length, 100);
        assert!(load_editor_config(None, Some(0), false).is_err());
    }

    #[test]
    fn test_editor_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        fs::write(&path, "[editor]\nsoft_wrap = true\n").unwrap();
        let config = load_editor_config(Some(&path), None, false).unwrap();
        assert!(config.soft_wrap);
        assert!(!config.soft_wrap_at_preferred_line_length);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["tplfold", "render", "a.hpp", "--cursor", "3:1"]).unwrap();
        match args.command {
            Some(Commands::Render { cursor, .. }) => assert_eq!(cursor, Some(Point::new(2, 0))),
            _ => panic!("expected render"),
        }
    }
}
