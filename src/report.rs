//! Workspace report.
//!
//! Scans every source file under a root with the compiler adapter and folds the
//! results into totals plus a folder tree with rolled-up counts.

pub mod progress;
pub mod scan;
pub mod tree;

use std::fs;
use std::path::{Component, Path, PathBuf};

use ahash::AHashSet;
use anyhow::anyhow;
use serde::Serialize;

use crate::compiler::{CompilerAdapter, DiagnosticEvent, PluginLocation};
use crate::settings::Settings;

pub use progress::{PROGRESS_INTERVAL, Progress, ProgressThrottle};
pub use tree::{NodeKind, TreeNode, build_tree};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub root: PathBuf,
    pub plugin_path_hint: String,
    pub max_concurrency: Option<usize>,
    pub include_extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
}

impl ReportOptions {
    pub fn from_settings(root: PathBuf, settings: &Settings) -> Self {
        Self {
            root,
            plugin_path_hint: settings.babel_plugin_path.clone(),
            max_concurrency: settings.max_concurrency,
            include_extensions: settings.include_extensions.clone(),
            exclude_dirs: settings.exclude_dirs.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub files_scanned: usize,
    pub files_with_results: usize,
    pub compiled_files: usize,
    pub failed_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub path: String,
    pub success: Vec<DiagnosticEvent>,
    pub failed: Vec<DiagnosticEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: String,
    pub totals: Totals,
    pub files: Vec<FileResult>,
    pub errors: Vec<ScanError>,
    pub tree: TreeNode,
}

/// Scan `options.root`. Fails only when the root is unusable or the compiler
/// plugin cannot be found; per-file problems land in `Report::errors`.
pub fn generate_report(
    adapter: &CompilerAdapter,
    options: &ReportOptions,
    on_progress: &(dyn Fn(Progress) + Send + Sync),
) -> anyhow::Result<Report> {
    let root = std::path::absolute(&options.root)?;
    if !root.is_dir() {
        return Err(anyhow!("{} is not a directory", root.display()));
    }

    let _span = tracing::info_span!("report.scan", root = %root.display()).entered();

    let plugin_path = adapter
        .resolve(&PluginLocation::new(Some(root.clone()), options.plugin_path_hint.clone()))
        .map_err(|e| anyhow!("{e}"))?;

    let extensions = lowercase_set(options.include_extensions.as_deref(), &scan::DEFAULT_EXTENSIONS);
    let excludes = string_set(options.exclude_dirs.as_deref(), &scan::DEFAULT_EXCLUDES);
    let files = scan::list_source_files(&root, &extensions, &excludes);
    let limit = options.max_concurrency.unwrap_or_else(scan::default_concurrency);
    tracing::info!(files = files.len(), limit, "Scanning workspace");

    let throttle = ProgressThrottle::new(files.len(), PROGRESS_INTERVAL, on_progress);
    throttle.start();

    let outcomes = scan::map_with_concurrency(&files, limit, |file| {
        let outcome = scan_file(adapter, &root, &plugin_path, file);
        throttle.advance();
        outcome
    })?;

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) if !result.success.is_empty() || !result.failed.is_empty() => results.push(result),
            Ok(_) => (),
            Err(error) => errors.push(error),
        }
    }

    let totals = Totals {
        files_scanned: files.len(),
        files_with_results: results.len(),
        compiled_files: results.iter().filter(|r| !r.success.is_empty()).count(),
        failed_files: results.iter().filter(|r| !r.failed.is_empty()).count(),
        success_count: results.iter().map(|r| r.success.len()).sum(),
        failed_count: results.iter().map(|r| r.failed.len()).sum(),
    };
    log::debug!(
        "Report: {} files, {} compiled, {} failed, {} errors",
        totals.files_scanned,
        totals.success_count,
        totals.failed_count,
        errors.len()
    );

    Ok(Report {
        generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        tree: build_tree(&results),
        totals,
        files: results,
        errors,
    })
}

fn scan_file(adapter: &CompilerAdapter, root: &Path, plugin_path: &Path, file: &Path) -> Result<FileResult, ScanError> {
    let path = relative_path(root, file);
    let _span = tracing::info_span!("report.file", file = %path).entered();

    let source = fs::read_to_string(file).map_err(|e| ScanError {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let filename = file.to_string_lossy();

    match adapter.run_diagnostics(&source, &filename, plugin_path, Some(root)) {
        Ok(result) => Ok(FileResult {
            path,
            success: result.successful_compilations,
            failed: result.failed_compilations,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "Compile failed");
            Err(ScanError {
                path,
                message: e.to_string(),
            })
        }
    }
}

/// `/`-separated path of `file` below `root`.
fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn string_set(values: Option<&[String]>, defaults: &[&str]) -> AHashSet<String> {
    match values {
        Some(values) => values.iter().cloned().collect(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn lowercase_set(values: Option<&[String]>, defaults: &[&str]) -> AHashSet<String> {
    string_set(values, defaults)
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect()
}
