use crate::dataset::allocator::CLIP_EXTENSION;
use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where clips and metadata for one gesture label go
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub label: String,
    pub metadata_path: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: &Path, label: &str, metadata_path: &Path) -> Result<Self> {
        let label = label.trim();
        ensure!(!label.is_empty(), "Gesture label must not be empty");
        ensure!(
            !label.contains(['/', '\\']) && label != "." && label != "..",
            "Invalid gesture label: {:?}",
            label
        );

        Ok(Self {
            root: root.to_path_buf(),
            label: label.to_string(),
            metadata_path: metadata_path.to_path_buf(),
        })
    }

    /// One directory per label under the dataset root
    pub fn label_dir(&self) -> PathBuf {
        self.root.join(&self.label)
    }

    /// Create the label directory if needed and return it
    pub fn prepare(&self) -> Result<PathBuf> {
        let dir = self.label_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create clip directory {:?}", dir))?;
        Ok(dir)
    }
}

/// Clip files already present in a label directory
pub fn list_clips(label_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(label_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case(CLIP_EXTENSION))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}
