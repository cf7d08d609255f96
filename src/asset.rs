//! In-memory file representation carried through the pipeline.
//!
//! An [`ImageAsset`] is a logical path (directory, stem, extension) plus the
//! file's bytes. Derivatives are produced by clone-with-overrides
//! constructors — an asset is never mutated in place once published
//! downstream, so clones handed to concurrent combinations are independent.
//!
//! Pixel dimensions are decoded lazily and memoized: the first call to
//! [`ImageAsset::metadata`] probes the contents through the backend and
//! caches the result for the lifetime of the asset (and of every clone made
//! after the probe).

use crate::format::Format;
use crate::imaging::{BackendError, ImageBackend};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Decoded pixel dimensions, attached at most once per asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
}

/// An in-memory file: logical path parts plus binary content.
///
/// Contents are behind an `Arc` so cloning an asset (which happens once per
/// generated combination) never copies pixel data.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    dir: PathBuf,
    stem: String,
    ext: String,
    contents: Arc<Vec<u8>>,
    metadata: OnceLock<Metadata>,
}

impl ImageAsset {
    /// Build an asset from a logical path and its contents.
    ///
    /// The path needs no base directory semantics — `dir` is whatever parent
    /// the caller wants reflected in derivative paths (typically the path
    /// relative to the source root).
    pub fn new(path: impl AsRef<Path>, contents: Vec<u8>) -> Self {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            dir,
            stem,
            ext,
            contents: Arc::new(contents),
            metadata: OnceLock::new(),
        }
    }

    /// Read an asset from disk, keeping `logical_path` as its pipeline path.
    pub fn read(
        disk_path: &Path,
        logical_path: impl AsRef<Path>,
    ) -> Result<Self, std::io::Error> {
        let contents = std::fs::read(disk_path)?;
        Ok(Self::new(logical_path, contents))
    }

    /// Logical path: `dir/stem.ext` (or `dir/stem` when there is no extension).
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }

    /// File name including extension.
    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.stem.clone()
        } else {
            format!("{}.{}", self.stem, self.ext)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.ext
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Format derived from the file extension, if it is in the supported set.
    pub fn format(&self) -> Option<Format> {
        Format::from_extension(&self.ext)
    }

    /// Decoded pixel dimensions, probed on first access and cached.
    ///
    /// Repeated calls never re-decode, regardless of how many matchers or
    /// combinations ask. Callers that don't need dimensions must simply not
    /// call this — there is no eager decode anywhere.
    pub fn metadata(&self, backend: &impl ImageBackend) -> Result<Metadata, BackendError> {
        if let Some(cached) = self.metadata.get() {
            return Ok(*cached);
        }
        let format = self.format().ok_or_else(|| {
            BackendError::Decode(format!("\"{}\" is not a supported image format", self.ext))
        })?;
        let probed = backend.probe(&self.contents, format)?;
        Ok(*self.metadata.get_or_init(|| probed))
    }

    /// Cached metadata, if a probe already happened.
    pub fn cached_metadata(&self) -> Option<Metadata> {
        self.metadata.get().copied()
    }

    /// Derivative constructor: new format, stem postfix, new contents.
    ///
    /// The metadata cache is not carried over — derivative dimensions differ
    /// from the source's.
    pub fn with_variant(&self, format: Format, postfix: &str, contents: Arc<Vec<u8>>) -> Self {
        Self {
            dir: self.dir.clone(),
            stem: format!("{}{}", self.stem, postfix),
            ext: format.extension().to_string(),
            contents,
            metadata: OnceLock::new(),
        }
    }

    /// Shared handle to the contents, for verbatim byte reuse.
    pub fn contents_arc(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.contents)
    }
}
