// ============================================================
// Layer 4 - QMNIST Download Cache
// ============================================================
// Fetches the four QMNIST archive files on first use and keeps
// them under <root>/QMNIST/raw/ for every later run.
//
//   <root>/QMNIST/raw/
//     qmnist-train-images-idx3-ubyte.gz
//     qmnist-train-labels-idx2-int.gz
//     qmnist-test-images-idx3-ubyte.gz
//     qmnist-test-labels-idx2-int.gz
//
// A file is downloaded into "<name>.part" and renamed once the
// whole body has been written, so a file that exists under its
// final name is always complete. There is no retry: a failed
// request fails the run.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::image::Split;

/// Public mirror of the QMNIST release files
pub const QMNIST_BASE_URL: &str =
    "https://raw.githubusercontent.com/facebookresearch/qmnist/master";

/// The gzip image/label file pair for one split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub images: PathBuf,
    pub labels: PathBuf,
}

/// Owns the on-disk dataset cache directory
#[derive(Debug, Clone)]
pub struct QmnistCache {
    raw_dir:  PathBuf,
    base_url: String,
}

impl QmnistCache {
    /// Cache rooted at `root`; files live in `<root>/QMNIST/raw`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_base_url(root, QMNIST_BASE_URL)
    }

    pub fn with_base_url(root: impl AsRef<Path>, base_url: impl Into<String>) -> Self {
        Self {
            raw_dir:  root.as_ref().join("QMNIST").join("raw"),
            base_url: base_url.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// File names of a split's image and label archives
    pub fn file_names(split: Split) -> (String, String) {
        let stem = split.file_stem();
        (
            format!("{stem}-images-idx3-ubyte.gz"),
            format!("{stem}-labels-idx2-int.gz"),
        )
    }

    /// Cache paths of a split, whether or not the files exist yet
    pub fn paths(&self, split: Split) -> DatasetPaths {
        let (images, labels) = Self::file_names(split);
        DatasetPaths {
            images: self.raw_dir.join(images),
            labels: self.raw_dir.join(labels),
        }
    }

    /// True when both files of the split are already cached
    pub fn is_cached(&self, split: Split) -> bool {
        let paths = self.paths(split);
        paths.images.exists() && paths.labels.exists()
    }

    /// Make sure the split is on disk, downloading whatever is missing
    pub fn ensure(&self, split: Split) -> Result<DatasetPaths> {
        fs::create_dir_all(&self.raw_dir)
            .with_context(|| format!("Cannot create dataset cache '{}'", self.raw_dir.display()))?;

        let paths = self.paths(split);
        if self.is_cached(split) {
            tracing::debug!("QMNIST {} split already cached", split);
            return Ok(paths);
        }
        for path in [&paths.images, &paths.labels] {
            if path.exists() {
                tracing::debug!("Using cached '{}'", path.display());
                continue;
            }
            self.download(path)?;
        }
        Ok(paths)
    }

    fn download(&self, target: &Path) -> Result<()> {
        let filename = target
            .file_name()
            .and_then(|n| n.to_str())
            .context("Dataset file name is not valid UTF-8")?;
        let url = format!("{}/{}", self.base_url, filename);

        tracing::info!("Downloading {}", url);
        let body = reqwest::blocking::get(&url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())
            .with_context(|| format!("Failed to download '{url}'"))?;

        let partial = target.with_extension("gz.part");
        fs::write(&partial, &body)
            .with_context(|| format!("Cannot write '{}'", partial.display()))?;
        fs::rename(&partial, target)
            .with_context(|| format!("Cannot move download into '{}'", target.display()))?;

        tracing::info!("Saved {} bytes to '{}'", body.len(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_follow_archive_layout() {
        let (images, labels) = QmnistCache::file_names(Split::Train);
        assert_eq!(images, "qmnist-train-images-idx3-ubyte.gz");
        assert_eq!(labels, "qmnist-train-labels-idx2-int.gz");

        let (images, labels) = QmnistCache::file_names(Split::Test);
        assert_eq!(images, "qmnist-test-images-idx3-ubyte.gz");
        assert_eq!(labels, "qmnist-test-labels-idx2-int.gz");
    }

    #[test]
    fn test_paths_live_under_raw_dir() {
        let cache = QmnistCache::new("qmnist/data");
        let paths = cache.paths(Split::Test);
        assert_eq!(
            paths.images,
            PathBuf::from("qmnist/data/QMNIST/raw/qmnist-test-images-idx3-ubyte.gz")
        );
    }

    #[test]
    fn test_cached_files_skip_network() {
        let dir   = tempfile::tempdir().unwrap();
        // Unroutable base URL: any download attempt would fail the test
        let cache = QmnistCache::with_base_url(dir.path(), "http://127.0.0.1:9");
        let paths = cache.paths(Split::Train);
        fs::create_dir_all(cache.raw_dir()).unwrap();
        fs::write(&paths.images, b"images").unwrap();
        fs::write(&paths.labels, b"labels").unwrap();

        assert!(cache.is_cached(Split::Train));
        assert_eq!(cache.ensure(Split::Train).unwrap(), paths);
        assert!(!cache.is_cached(Split::Test));
    }

    #[test]
    fn test_failed_download_leaves_no_cache_entry() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = QmnistCache::with_base_url(dir.path(), "http://127.0.0.1:9");
        assert!(cache.ensure(Split::Test).is_err());
        assert!(!cache.paths(Split::Test).images.exists());
    }
}
