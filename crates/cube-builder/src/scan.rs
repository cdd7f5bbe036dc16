//! Cubes from a directory of already downloaded rasters.
//!
//! File dates come from the file names through a [`DateGlob`]; there is no
//! catalog and no band map. Each file becomes one time step holding all of
//! its bands, labelled `"1"`, `"2"`, ... in file order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::config::default_processes;
use crate::date_glob::DateGlob;
use crate::error::{CubeError, Result};
use crate::raster::RasterReader;
use crate::types::{Cube, SliceArray};

/// A file found by [`scan_directory`] and the date in its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScannedFile {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Recursively list files under `root` whose name matches
/// `*{date pattern}*.{extension}`, with their dates, sorted by date.
///
/// Fails with `NoFilesFound` when nothing matches or `root` is not a
/// directory. Files whose date digits are not a calendar date are skipped.
pub fn scan_directory(root: &Path, date_format: &str, extension: &str) -> Result<Vec<ScannedFile>> {
    let date_glob = DateGlob::new(date_format)?;
    let extension = extension.trim_start_matches('.');
    let pattern = format!(
        "*{}*.{}",
        date_glob.glob_pattern(),
        glob::Pattern::escape(extension)
    );
    let matcher = glob::Pattern::new(&pattern)
        .map_err(|e| CubeError::config_format(format!("'{}': {}", pattern, e)))?;

    let no_files = || CubeError::NoFilesFound {
        root: root.display().to_string(),
        pattern: pattern.clone(),
    };

    if !root.is_dir() {
        return Err(no_files());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Unreadable directory entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !matcher.matches(name) {
            continue;
        }

        match date_glob.extract_date(name) {
            Ok(date) => {
                debug!(path = %entry.path().display(), date = %date, "Matched file");
                files.push(ScannedFile {
                    date,
                    path: entry.into_path(),
                });
            }
            Err(CubeError::NoDateFound { .. }) => {
                warn!(path = %entry.path().display(), "File matches pattern but holds no valid date, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    if files.is_empty() {
        return Err(no_files());
    }

    files.sort();
    info!(root = %root.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

/// Builds cubes from scanned files.
pub struct ScanCubeAssembler {
    reader: Arc<dyn RasterReader>,
    processes: usize,
}

impl ScanCubeAssembler {
    pub fn new(reader: Arc<dyn RasterReader>) -> Self {
        Self {
            reader,
            processes: default_processes(),
        }
    }

    /// Number of files read concurrently.
    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes.max(1);
        self
    }

    /// Scan `root` and stack every matching file along time.
    #[instrument(skip(self))]
    pub async fn assemble(&self, root: &Path, date_format: &str, extension: &str) -> Result<Cube> {
        let files = scan_directory(root, date_format, extension)?;

        let slices: Vec<SliceArray> = stream::iter(files)
            .map(|file| self.read_file(file))
            .buffered(self.processes)
            .try_collect()
            .await?;

        let cube = Cube::from_slices(slices)?;
        info!(shape = ?cube.shape(), "Assembled cube from directory");
        Ok(cube)
    }

    async fn read_file(&self, file: ScannedFile) -> Result<SliceArray> {
        let location = file.path.to_string_lossy();
        let rasters = self.reader.read(&location).await?;

        let label = file
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bands = rasters
            .into_iter()
            .enumerate()
            .map(|(i, raster)| ((i + 1).to_string(), raster))
            .collect();

        SliceArray::stack(file.date, label, bands)
    }
}

/// Scan `root` and assemble its files into a cube.
pub async fn assemble_directory(
    root: &Path,
    date_format: &str,
    extension: &str,
    reader: Arc<dyn RasterReader>,
) -> Result<Cube> {
    ScanCubeAssembler::new(reader)
        .assemble(root, date_format, extension)
        .await
}
