// Clip catalog: one CSV row per finalized clip
//
// The file is shared by every label and is only ever appended to.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const CATALOG_HEADER: [&str; 4] = ["Archivo", "Etiqueta", "Fecha", "Duracion_Frames"];

/// Metadata row for one stored clip
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipRecord {
    #[serde(rename = "Archivo")]
    pub file_name: String,
    #[serde(rename = "Etiqueta")]
    pub label: String,
    #[serde(rename = "Fecha")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "Duracion_Frames")]
    pub frame_count: usize,
}

/// Append-only store of clip records
pub trait Catalog {
    fn append(&mut self, record: &ClipRecord) -> Result<()>;
}

pub struct CsvCatalog {
    path: PathBuf,
}

impl CsvCatalog {
    /// Open the catalog, writing the header if the file is missing or empty.
    pub fn open(path: &Path) -> Result<Self> {
        let needs_header = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        if needs_header {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create catalog directory {:?}", parent))?;
            }
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create catalog {:?}", path))?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(CATALOG_HEADER)?;
            writer.flush()?;
            tracing::info!("Created clip catalog at {:?}", path);
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record currently in the catalog
    pub fn records(&self) -> Result<Vec<ClipRecord>> {
        // Other tools write this file too; tolerate `Archivo, Etiqueta, ...` style headers
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Failed to read catalog {:?}", self.path))?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn count_for_label(&self, label: &str) -> Result<usize> {
        Ok(self
            .records()?
            .iter()
            .filter(|r| r.label == label)
            .count())
    }
}

impl Catalog for CsvCatalog {
    fn append(&mut self, record: &ClipRecord) -> Result<()> {
        // Reopened per append so each row hits the disk on its own
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open catalog {:?}", self.path))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
