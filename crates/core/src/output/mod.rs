use crate::models::{SourceFile, TemplateMap};
use crate::surface::MemoryEditor;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorSpec, WriteColor};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
    Ansi,
}

/// Format a TemplateMap according to the specified format
pub fn format_output(map: &TemplateMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(map),
        OutputFormat::Yaml => to_yaml(map),
        OutputFormat::Summary => Ok(format_summary(map)),
        OutputFormat::Ansi => format_summary_ansi(map),
    }
}

/// Occurrences of one file in the requested format
pub fn format_file(file: &SourceFile, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(file),
        OutputFormat::Yaml => to_yaml(file),
        OutputFormat::Summary => format_file_listing(file, false),
        OutputFormat::Ansi => format_file_listing(file, true),
    }
}

/// Pretty-printed JSON of a report
pub fn to_json<T: Serialize + ?Sized>(report: &T) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn to_yaml<T: Serialize + ?Sized>(report: &T) -> Result<String, FormatError> {
    Ok(serde_yaml::to_string(report)?)
}

/// Generate a human-readable summary
pub fn format_summary(map: &TemplateMap) -> String {
    let mut output = String::new();
    let stats = &map.stats;

    output.push_str(&format!(
        "Template Scan Summary\n\
         =====================\n\
         Root: {}\n\n",
        map.root.display()
    ));

    output.push_str(&format!(
        "Files Scanned: {}\n\
         - Headers: {}\n\
         - Sources: {}\n\
         Total Lines: {}\n\n",
        stats.total_files, stats.header_files, stats.source_files, stats.total_lines
    ));

    output.push_str(&format!(
        "Templates: {}\n\
         - With preview: {}\n\
         - Multi-line: {}\n\
         - Parameters: {}\n\
         Chars hidden by folding: {}\n\n",
        stats.total_templates,
        stats.previewable_templates,
        stats.multiline_templates,
        stats.total_params,
        stats.saved_chars
    ));

    let top = files_by_templates(map);
    if !top.is_empty() {
        output.push_str("Top files by templates:\n");
        for file in top {
            output.push_str(&format!(
                "  {} ({} templates, {} lines)\n",
                file.path.display(),
                file.occurrences.len(),
                file.line_count
            ));
        }
        output.push('\n');
    }

    let failed: Vec<&SourceFile> = map.files.iter().filter(|f| !f.parsed).collect();
    if !failed.is_empty() {
        output.push_str("Unreadable files:\n");
        for file in failed {
            output.push_str(&format!(
                "  {}: {}\n",
                file.path.display(),
                file.error.as_deref().unwrap_or("unknown error")
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        map.metadata.scan_duration_ms,
        map.metadata.files_per_second,
        map.metadata.timestamp,
        map.metadata.tool_version
    ));

    output
}

/// Summary with terminal colors
pub fn format_summary_ansi(map: &TemplateMap) -> Result<String, FormatError> {
    let mut buf = Buffer::ansi();
    let stats = &map.stats;
    let title = spec(Some(Color::Cyan), true);
    let label = dim();

    styled(&mut buf, &title, "Template Scan Summary")?;
    writeln!(buf)?;
    styled(&mut buf, &spec(Some(Color::Cyan), false), "=====================")?;
    writeln!(buf)?;
    styled(&mut buf, &label, "Root:")?;
    writeln!(buf, " {}\n", map.root.display())?;

    styled(&mut buf, &label, "Files Scanned:")?;
    writeln!(
        buf,
        " {} (headers: {}, sources: {}) | {} lines\n",
        stats.total_files, stats.header_files, stats.source_files, stats.total_lines
    )?;

    styled(&mut buf, &label, "Templates:")?;
    write!(buf, " ")?;
    styled(&mut buf, &spec(Some(Color::Green), true), &stats.total_templates.to_string())?;
    writeln!(
        buf,
        " (with preview: {}, multi-line: {}, parameters: {})",
        stats.previewable_templates, stats.multiline_templates, stats.total_params
    )?;
    styled(&mut buf, &label, "Chars hidden by folding:")?;
    writeln!(buf, " {}\n", stats.saved_chars)?;

    let top = files_by_templates(map);
    if !top.is_empty() {
        styled(&mut buf, &label, "Top files by templates:")?;
        writeln!(buf)?;
        for file in top {
            write!(buf, "  ")?;
            styled(&mut buf, &spec(Some(Color::Yellow), false), &file.path.display().to_string())?;
            writeln!(buf, " ({} templates, {} lines)", file.occurrences.len(), file.line_count)?;
        }
        writeln!(buf)?;
    }

    styled(&mut buf, &label, "Scan:")?;
    writeln!(
        buf,
        " {}ms ({:.2} files/sec)",
        map.metadata.scan_duration_ms, map.metadata.files_per_second
    )?;

    Ok(String::from_utf8_lossy(buf.as_slice()).into_owned())
}

/// Occurrences of one file, one line each, rows shown one-based
pub fn format_file_listing(file: &SourceFile, ansi: bool) -> Result<String, FormatError> {
    let mut buf = if ansi { Buffer::ansi() } else { Buffer::no_color() };
    let location = dim();

    styled(&mut buf, &spec(None, true), &file.path.display().to_string())?;
    writeln!(buf, " ({} templates)", file.occurrences.len())?;
    if let Some(error) = &file.error {
        styled(&mut buf, &spec(Some(Color::Red), false), &format!("  error: {}", error))?;
        writeln!(buf)?;
    }

    for occurrence in &file.occurrences {
        let range = occurrence.range;
        styled(
            &mut buf,
            &location,
            &format!(
                "  {}:{}-{}:{}",
                range.start.row + 1,
                range.start.column + 1,
                range.end.row + 1,
                range.end.column + 1
            ),
        )?;
        write!(buf, "  ")?;
        match (&occurrence.preview, &occurrence.skipped) {
            (Some(preview), _) => {
                write_preview(&mut buf, preview)?;
                writeln!(
                    buf,
                    "  ({} lines, {} chars hidden)",
                    occurrence.line_count,
                    occurrence.saved_chars()
                )?;
            }
            (None, skipped) => {
                styled(
                    &mut buf,
                    &spec(Some(Color::Yellow), false),
                    &format!("skipped: {}", skipped.as_deref().unwrap_or("no preview")),
                )?;
                writeln!(buf)?;
            }
        }
    }

    Ok(String::from_utf8_lossy(buf.as_slice()).into_owned())
}

/// Screen of an editor with every visible preview painted in
pub fn format_folded_screen(editor: &MemoryEditor, ansi: bool) -> Result<String, FormatError> {
    let mut lines: Vec<Vec<char>> = editor
        .screen_lines()
        .into_iter()
        .map(|line| line.chars().collect())
        .collect();
    // (start column, text, under cursor) per screen row
    let mut overlays: Vec<Vec<(usize, String, bool)>> = vec![Vec::new(); lines.len()];

    for view in editor.overlay_decorations() {
        let row = view.screen_position.row as usize;
        let column = view.screen_position.column as usize;
        let Some(line) = lines.get_mut(row) else {
            continue;
        };
        let end = column + view.text.chars().count();
        if line.len() < end {
            line.resize(end, ' ');
        }
        for (offset, ch) in view.text.chars().enumerate() {
            line[column + offset] = ch;
        }
        overlays[row].push((column, view.text, view.class.ends_with("under-cursor")));
    }

    let mut buf = if ansi { Buffer::ansi() } else { Buffer::no_color() };
    for (line, mut row_overlays) in lines.into_iter().zip(overlays) {
        row_overlays.sort_by_key(|(column, _, _)| *column);
        let mut column = 0;
        for (start, text, under_cursor) in row_overlays {
            if start < column {
                continue;
            }
            write!(buf, "{}", line[column..start].iter().collect::<String>())?;
            if under_cursor {
                buf.set_color(ColorSpec::new().set_underline(true))?;
            }
            write_preview(&mut buf, &text)?;
            buf.reset()?;
            column = start + text.chars().count();
        }
        writeln!(buf, "{}", line[column..].iter().collect::<String>())?;
    }

    let mut text = String::from_utf8_lossy(buf.as_slice()).into_owned();
    // screen_lines ends with the row after the last line ending
    if text.ends_with("\n\n") || text == "\n" {
        text.pop();
    }
    Ok(text)
}

fn files_by_templates(map: &TemplateMap) -> Vec<&SourceFile> {
    let mut files: Vec<&SourceFile> = map
        .files
        .iter()
        .filter(|f| !f.occurrences.is_empty())
        .collect();
    files.sort_by(|a, b| b.occurrences.len().cmp(&a.occurrences.len()));
    files.truncate(5);
    files
}

/// `template<` and the closing `>` in the keyword color, parameters plain
fn write_preview(buf: &mut Buffer, preview: &str) -> io::Result<()> {
    let keyword = spec(Some(Color::Magenta), true);
    match preview
        .strip_prefix("template<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        Some(params) => {
            styled(buf, &keyword, "template<")?;
            write!(buf, "{}", params)?;
            styled(buf, &keyword, ">")
        }
        None => write!(buf, "{}", preview),
    }
}

fn styled(buf: &mut Buffer, color: &ColorSpec, text: &str) -> io::Result<()> {
    buf.set_color(color)?;
    write!(buf, "{}", text)?;
    buf.reset()
}

fn spec(fg: Option<Color>, bold: bool) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(fg).set_bold(bold);
    spec
}

fn dim() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_dimmed(true);
    spec
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Write error: {0}")]
    IoError(#[from] io::Error),
}
