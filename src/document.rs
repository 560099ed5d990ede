//! Object documents
//!
//! Desired objects are declared in `.toml` or `.json` files under the
//! objects directory. Every file holds a list of documents:
//!
//! ```toml
//! [[objects]]
//! type = "Folder"
//! key = "ops"
//! spec = { title = "Operations" }
//! ```

use anyhow::{Context, Result, bail};
use reconcile::MonitoringObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A monitoring object of any type, with a free-form spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(rename = "type")]
    pub type_name: String,
    pub key: String,
    #[serde(default)]
    pub spec: Value,
}

impl Document {
    pub fn new(type_name: impl Into<String>, key: impl Into<String>, spec: Value) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            spec,
        }
    }
}

impl MonitoringObject for Document {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn local_key(&self) -> String {
        self.key.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentFile {
    #[serde(default)]
    objects: Vec<Document>,
}

/// Document file format, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn detect(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Some(Self::Toml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse one document file
pub fn load_file(path: &Path) -> Result<Vec<Document>> {
    let Some(format) = Format::detect(path) else {
        bail!("Unsupported document file: {}", path.display());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file: DocumentFile = match format {
        Format::Toml => toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        Format::Json => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
    };

    log::debug!("{}: {} objects", path.display(), file.objects.len());
    Ok(file.objects)
}

/// Document files under `dir`, in path order
pub fn document_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Objects directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() && Format::detect(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Load every document under `dir`
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in document_files(dir)? {
        documents.extend(load_file(&path)?);
    }
    log::info!("Loaded {} objects from {}", documents.len(), dir.display());
    Ok(documents)
}
