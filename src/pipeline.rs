//! Per-file dispatch and the parallel build loop.
//!
//! Dispatch is the plugin's contract: every configured rule is evaluated
//! against the incoming asset, in list order and without short-circuiting;
//! each matching rule fans out into generated derivatives; if nothing
//! matched the original passes through unchanged, and if anything matched
//! the original is consumed and only derivatives flow downstream.
//!
//! The build loop walks a source tree, runs dispatch on every file in
//! parallel (bounded by the rayon pool, sized from config), and writes
//! results under the output root preserving relative paths. Writes are
//! atomic per file: nothing touches the disk for a file until the whole
//! derivative set succeeded. A file's failure is reported and does not
//! abort sibling files already in flight.

use crate::asset::ImageAsset;
use crate::generate::{EmitFn, GenerateError, SrcsetGenerator};
use crate::imaging::ImageBackend;
use crate::rules::Rule;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single file's failure, with everything upstream folded in.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Outcome of dispatching one asset through the rule list.
#[derive(Debug)]
pub enum FileOutcome {
    /// No rule matched: the original is forwarded unchanged.
    Passthrough(ImageAsset),
    /// At least one rule matched: the original is consumed, only these
    /// derivatives are forwarded.
    Derivatives(Vec<ImageAsset>),
}

impl FileOutcome {
    /// The assets that actually flow downstream.
    pub fn assets(&self) -> &[ImageAsset] {
        match self {
            FileOutcome::Passthrough(original) => std::slice::from_ref(original),
            FileOutcome::Derivatives(derivatives) => derivatives,
        }
    }
}

/// Dispatch one asset through the configured rule list.
///
/// Assets without realized content are forwarded untouched, never
/// inspected. Rules are evaluated in list order, each independently; a
/// matching rule's generation failure aborts this file only.
pub fn process_asset<B: ImageBackend>(
    generator: &SrcsetGenerator<B>,
    asset: &ImageAsset,
    rules: &[Rule],
    emit: Option<&EmitFn>,
) -> Result<FileOutcome, GenerateError> {
    if asset.is_empty() {
        return Ok(FileOutcome::Passthrough(asset.clone()));
    }

    let mut matched = false;
    let mut derivatives = Vec::new();
    for rule in rules {
        if generator
            .match_image(asset, &rule.matchers)
            .map_err(GenerateError::Imaging)?
        {
            matched = true;
            derivatives.extend(generator.generate(asset, rule, emit)?);
        }
    }

    if matched {
        Ok(FileOutcome::Derivatives(derivatives))
    } else {
        Ok(FileOutcome::Passthrough(asset.clone()))
    }
}

/// Per-file progress event, drained by the CLI's printer thread.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    FileDone {
        path: PathBuf,
        matched: bool,
        outputs: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
}

/// One source file's entry in the build manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub source: String,
    pub matched: bool,
    pub outputs: Vec<String>,
}

/// Machine-readable record of everything a build produced.
#[derive(Debug, Serialize)]
pub struct BuildManifest {
    pub files: Vec<ManifestEntry>,
}

/// Aggregate result of a build run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub files: usize,
    pub matched: usize,
    pub passthrough: usize,
    pub outputs: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Walk `source_root`, dispatch every file, and write results under
/// `output_root` preserving relative paths.
///
/// Returns the summary; per-file failures are collected in it rather than
/// aborting the run. `events` receives one event per completed file, in
/// completion order.
pub fn run<B: ImageBackend>(
    generator: &SrcsetGenerator<B>,
    rules: &[Rule],
    source_root: &Path,
    output_root: &Path,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BuildSummary, PipelineError> {
    std::fs::create_dir_all(output_root)?;

    let mut files: Vec<(PathBuf, PathBuf)> = WalkDir::new(source_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let disk = entry.into_path();
            let relative = disk
                .strip_prefix(source_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| disk.clone());
            (disk, relative)
        })
        .collect();
    files.sort();

    let results: Vec<Result<ManifestEntry, (PathBuf, String)>> = files
        .par_iter()
        .map_with(events, |events, (disk, relative)| {
            let result = process_one(generator, rules, disk, relative, output_root)
                .map_err(|e| (relative.clone(), e.to_string()));

            if let Some(tx) = events {
                let event = match &result {
                    Ok(entry) => ProcessEvent::FileDone {
                        path: relative.clone(),
                        matched: entry.matched,
                        outputs: entry.outputs.len(),
                    },
                    Err((path, error)) => ProcessEvent::FileFailed {
                        path: path.clone(),
                        error: error.clone(),
                    },
                };
                // A dropped receiver just means nobody is listening.
                let _ = tx.send(event);
            }

            result
        })
        .collect();

    let mut summary = BuildSummary::default();
    let mut entries = Vec::new();
    for result in results {
        summary.files += 1;
        match result {
            Ok(entry) => {
                if entry.matched {
                    summary.matched += 1;
                } else {
                    summary.passthrough += 1;
                }
                summary.outputs += entry.outputs.len();
                entries.push(entry);
            }
            Err(failure) => summary.failures.push(failure),
        }
    }

    let manifest = BuildManifest { files: entries };
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(output_root.join("manifest.json"), json)?;

    Ok(summary)
}

/// Read, dispatch, and (on success) write one file's outputs.
fn process_one<B: ImageBackend>(
    generator: &SrcsetGenerator<B>,
    rules: &[Rule],
    disk_path: &Path,
    relative: &Path,
    output_root: &Path,
) -> Result<ManifestEntry, FileError> {
    let asset = ImageAsset::read(disk_path, relative)?;

    // No emit callback: outputs are buffered and written only after the
    // whole file succeeded.
    let outcome = process_asset(generator, &asset, rules, None)?;
    let matched = matches!(outcome, FileOutcome::Derivatives(_));

    let mut outputs = Vec::new();
    for produced in outcome.assets() {
        let target = output_root.join(produced.path());
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, produced.contents())?;
        outputs.push(produced.path().to_string_lossy().into_owned());
    }

    Ok(ManifestEntry {
        source: relative.to_string_lossy().into_owned(),
        matched,
        outputs,
    })
}
