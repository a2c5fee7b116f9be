//! Run-scoped scratch space and output naming.
//!
//! Every run gets its own directory under the cache dir, holding the
//! `compressed/` intermediates and the `concat/` list file. It is removed when
//! the [`RunWorkspace`] is dropped. Deliverables go to the output dir with a
//! timestamped, collision-resistant name.

use crate::error::CoreResult;
use crate::output::OutputLocator;

use chrono::Local;
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};

pub const COMPRESSED_DIR: &str = "compressed";
pub const CONCAT_DIR: &str = "concat";

/// Container extension for every produced file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Scratch directories for one run plus the output directory.
#[derive(Debug)]
pub struct RunWorkspace {
    root: TempDir,
    output_dir: PathBuf,
}

impl RunWorkspace {
    /// Creates `<cache_dir>/reelfit-run-XXXX/{compressed,concat}` and `output_dir`.
    pub fn create(cache_dir: &Path, output_dir: &Path) -> CoreResult<Self> {
        let cache_dir = std::path::absolute(cache_dir)?;
        let output_dir = std::path::absolute(output_dir)?;
        fs::create_dir_all(&cache_dir)?;
        fs::create_dir_all(&output_dir)?;
        let root = TempFileBuilder::new()
            .prefix("reelfit-run-")
            .tempdir_in(&cache_dir)?;
        fs::create_dir_all(root.path().join(COMPRESSED_DIR))?;
        fs::create_dir_all(root.path().join(CONCAT_DIR))?;
        log::debug!("Created run workspace at {}", root.path().display());

        Ok(Self { root, output_dir })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    #[must_use]
    pub fn compressed_dir(&self) -> PathBuf {
        self.root.path().join(COMPRESSED_DIR)
    }

    #[must_use]
    pub fn concat_dir(&self) -> PathBuf {
        self.root.path().join(CONCAT_DIR)
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Intermediate file for one clip. Position keeps names unique even when
    /// two clips share an id.
    #[must_use]
    pub fn compressed_path(&self, position: usize, clip_id: &str) -> PathBuf {
        self.compressed_dir()
            .join(format!("{position:03}_{}.{OUTPUT_EXTENSION}", sanitize(clip_id)))
    }

    #[must_use]
    pub fn concat_list_path(&self) -> PathBuf {
        self.concat_dir().join("inputs.txt")
    }

    /// Fresh deliverable path in the output directory.
    #[must_use]
    pub fn deliverable_path(&self, stem: &str) -> PathBuf {
        unique_output_path(&self.output_dir, stem)
    }

    /// URI minting rooted at this run's directories.
    #[must_use]
    pub fn locator(&self, app_id: Option<String>) -> OutputLocator {
        OutputLocator::new(app_id)
            .with_root("output", self.output_dir.clone())
            .with_root("cache", self.root.path().to_path_buf())
    }
}

/// `<dir>/<stem>_<YYYYmmdd_HHMMSS>_<6 random>.mp4`. Does not create the file.
#[must_use]
pub fn unique_output_path(dir: &Path, stem: &str) -> PathBuf {
    let random_suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!(
        "{}_{timestamp}_{random_suffix}.{OUTPUT_EXTENSION}",
        sanitize(stem)
    ))
}

/// Keeps file-name-safe characters only.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "clip".to_string() } else { cleaned }
}
