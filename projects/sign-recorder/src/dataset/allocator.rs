use crate::segmentation::ClipTicket;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CLIP_PREFIX: &str = "video_";
pub const CLIP_EXTENSION: &str = "mp4";

/// Hands out `video_<n>.mp4` names that are free in one label directory.
///
/// Indices present at startup are never reused, gaps are filled lowest-first,
/// and every index handed out is marked taken for the rest of the run.
#[derive(Debug, Clone)]
pub struct ClipAllocator {
    dir: PathBuf,
    taken: BTreeSet<u64>,
}

impl ClipAllocator {
    /// Scan `dir` (non-recursively) for existing clip files.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry =
                entry.with_context(|| format!("Failed to scan clip directory {:?}", dir))?;
            if entry.file_type().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        Ok(Self::from_existing(dir, names.iter().map(String::as_str)))
    }

    pub fn from_existing<'a>(dir: &Path, names: impl IntoIterator<Item = &'a str>) -> Self {
        let taken = names.into_iter().filter_map(parse_clip_index).collect();
        Self {
            dir: dir.to_path_buf(),
            taken,
        }
    }

    pub fn taken_count(&self) -> usize {
        self.taken.len()
    }

    pub fn allocate(&mut self) -> ClipTicket {
        let mut index = 0;
        while self.taken.contains(&index) {
            index += 1;
        }
        self.taken.insert(index);

        let file_name = clip_file_name(index);
        ClipTicket {
            path: self.dir.join(&file_name),
            file_name,
        }
    }
}

pub fn clip_file_name(index: u64) -> String {
    format!("{}{}.{}", CLIP_PREFIX, index, CLIP_EXTENSION)
}

/// `video_12.mp4` -> `Some(12)`. The extension is matched case-insensitively.
pub fn parse_clip_index(name: &str) -> Option<u64> {
    let (stem, extension) = name.strip_prefix(CLIP_PREFIX)?.rsplit_once('.')?;
    if !extension.eq_ignore_ascii_case(CLIP_EXTENSION) {
        return None;
    }
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
