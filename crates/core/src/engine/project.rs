use super::{PreviewRenderer, TemplateScanner};
use crate::config::{IgnoreFilter, ScanConfig};
use crate::models::{OccurrenceEntry, ScanMetadata, SourceFile, SourceKind, TemplateMap, TemplateStats};
use crate::surface::visual_len;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Not a C/C++ source file: {0}")]
    UnsupportedFile(PathBuf),
}

/// Scanner for template declarations across a C/C++ project
pub struct ProjectScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
    scanner: TemplateScanner,
    renderer: PreviewRenderer,
}

impl ProjectScanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
            scanner: TemplateScanner::new(),
            renderer: PreviewRenderer::new(),
        })
    }

    /// Scan the project and return the template map
    pub fn scan(&self) -> Result<TemplateMap, ScanError> {
        let start = Instant::now();

        let source_files = self.find_source_files();
        tracing::debug!("scanning {} source files", source_files.len());

        let files: Vec<SourceFile> = if self.config.threads == 1 {
            source_files
                .iter()
                .map(|(path, kind)| self.scan_path(path, *kind))
                .collect()
        } else {
            let pool = if self.config.threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()
                    .ok()
            } else {
                None
            };

            match pool {
                Some(pool) => pool.install(|| {
                    source_files
                        .par_iter()
                        .map(|(path, kind)| self.scan_path(path, *kind))
                        .collect()
                }),
                None => source_files
                    .par_iter()
                    .map(|(path, kind)| self.scan_path(path, *kind))
                    .collect(),
            }
        };

        let mut stats = TemplateStats::default();
        for file in &files {
            stats.add_file(file);
        }

        let duration = start.elapsed();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                files.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            ..ScanMetadata::default()
        };
        tracing::info!(
            "found {} templates in {} files",
            stats.total_templates,
            stats.total_files
        );

        Ok(TemplateMap {
            root: self.config.root.clone(),
            files,
            stats,
            metadata,
        })
    }

    /// Scan a single file
    pub fn scan_file(&self, path: &Path) -> Result<SourceFile, ScanError> {
        let kind = path
            .extension()
            .and_then(|ext| SourceKind::from_extension(&ext.to_string_lossy()))
            .ok_or_else(|| ScanError::UnsupportedFile(path.to_path_buf()))?;
        let content = fs::read_to_string(path)?;
        Ok(self.scan_content(path, kind, &content))
    }

    /// Template occurrences of an in-memory source text
    pub fn scan_text(&self, text: &str) -> Vec<OccurrenceEntry> {
        self.scanner
            .scan_with_offsets(text)
            .into_iter()
            .map(|(span, occurrence)| {
                let (preview, skipped) = match self.renderer.render(&occurrence.params) {
                    Ok(preview) => (Some(preview.text), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                OccurrenceEntry {
                    line_count: occurrence.range.end.row - occurrence.range.start.row + 1,
                    visual_length: visual_len(&text[span]),
                    range: occurrence.range,
                    preview,
                    skipped,
                    params: occurrence.params,
                }
            })
            .collect()
    }

    fn find_source_files(&self) -> Vec<(PathBuf, SourceKind)> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if self.ignore_filter.should_ignore(path, false) {
                continue;
            }
            if !self
                .ignore_filter
                .matches_kind_filter(path, &self.config.kind_filter)
            {
                continue;
            }
            if let Some(kind) = path
                .extension()
                .and_then(|ext| SourceKind::from_extension(&ext.to_string_lossy()))
            {
                files.push((path.to_path_buf(), kind));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    /// Scan one file; read failures are recorded on the file, not propagated
    fn scan_path(&self, path: &Path, kind: SourceKind) -> SourceFile {
        let failed = |error: String| SourceFile {
            path: self.relative_path(path),
            absolute_path: path.to_path_buf(),
            kind,
            occurrences: Vec::new(),
            line_count: 0,
            parsed: false,
            error: Some(error),
        };

        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_size => {
                tracing::debug!("skipping {}: {} bytes", path.display(), meta.len());
                return failed(format!(
                    "file exceeds the {} byte limit",
                    self.config.max_file_size
                ));
            }
            Err(e) => return failed(e.to_string()),
            Ok(_) => {}
        }

        match fs::read_to_string(path) {
            Ok(content) => self.scan_content(path, kind, &content),
            Err(e) => failed(e.to_string()),
        }
    }

    fn scan_content(&self, path: &Path, kind: SourceKind, content: &str) -> SourceFile {
        SourceFile {
            path: self.relative_path(path),
            absolute_path: path.to_path_buf(),
            kind,
            occurrences: self.scan_text(content),
            line_count: content.lines().count(),
            parsed: true,
            error: None,
        }
    }

    fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf()
    }
}
