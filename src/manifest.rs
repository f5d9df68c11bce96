use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "manifest.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Output names and their pixel sizes, in the order they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    label: String,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    /// A name seen before keeps its position and takes the new size.
    pub fn record(&mut self, name: &str, width: u32, height: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.width = width;
            entry.height = height;
            return;
        }
        self.entries.push(ManifestEntry {
            name: name.to_string(),
            width,
            height,
        });
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn render(&self) -> String {
        let mut out = format!("Generated App Store screenshots ({}):\n", self.label);
        for entry in &self.entries {
            out.push_str(&format!(
                "- {}: {}x{}\n",
                entry.name, entry.width, entry.height
            ));
        }
        out
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, self.render())
            .with_context(|| format!("failed to write manifest: {}", path.display()))?;
        Ok(path)
    }
}
