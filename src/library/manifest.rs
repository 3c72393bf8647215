//! Library manifest and the asset descriptors derived from it.
//!
//! The manifest is the static list of shape libraries offered to the user.
//! A built-in manifest ships with the crate; a JSON manifest file can
//! replace it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a library asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryId(String);

impl LibraryId {
    /// Create a library ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LibraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LibraryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Immutable metadata identifying a fetchable library asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Library identifier
    pub id: LibraryId,

    /// Human-readable name
    pub name: String,

    /// Network location of the library file
    pub locator: String,

    /// Path of the same file among bundled assets
    pub asset_path: String,
}

/// One entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    /// File name relative to the library host and the asset prefix
    pub file: String,
}

/// Built-in libraries: (id, name, file)
const BUILTIN_LIBRARIES: &[(&str, &str, &str)] = &[
    ("system-design", "System Design", "system-design.excalidrawlib"),
    ("software-architecture", "Software Architecture", "software-architecture.excalidrawlib"),
    ("flowchart", "Flowchart Symbols", "flowchart-symbols.excalidrawlib"),
    ("uml", "UML Diagrams", "uml-diagrams.excalidrawlib"),
    ("network-topology", "Network Topology", "network-topology.excalidrawlib"),
    ("wireframing", "Wireframing Kit", "wireframing-kit.excalidrawlib"),
    ("business-forms", "Business Forms", "business-forms.excalidrawlib"),
    ("icons", "Basic Icons", "basic-icons.excalidrawlib"),
];

/// Ordered list of manifest entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Manifest {
    /// The manifest compiled into the crate
    pub fn builtin() -> Self {
        let entries = BUILTIN_LIBRARIES
            .iter()
            .map(|(id, name, file)| ManifestEntry {
                id: id.to_string(),
                name: name.to_string(),
                file: file.to_string(),
            })
            .collect();

        Self { entries }
    }

    /// Create a manifest from explicit entries
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON manifest (`[{"id", "name", "file"}, ...]`)
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json).context("Failed to parse manifest JSON")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a JSON manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        Self::from_json(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if entry.id.trim().is_empty() {
                anyhow::bail!("Manifest entry with empty id (file: {})", entry.file);
            }
            if entry.file.trim().is_empty() {
                anyhow::bail!("Manifest entry '{}' has no file", entry.id);
            }
            if !seen.insert(entry.id.as_str()) {
                anyhow::bail!("Duplicate manifest id: {}", entry.id);
            }
        }
        Ok(())
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derive descriptors, keeping manifest order
    pub fn descriptors(&self, base_url: &str, asset_prefix: &str) -> Vec<AssetDescriptor> {
        let base_url = base_url.trim_end_matches('/');
        let asset_prefix = asset_prefix.trim_matches('/');

        self.entries
            .iter()
            .map(|entry| {
                let file = entry.file.trim_start_matches('/');
                AssetDescriptor {
                    id: LibraryId::new(entry.id.clone()),
                    name: entry.name.clone(),
                    locator: format!("{}/{}", base_url, file),
                    asset_path: if asset_prefix.is_empty() {
                        file.to_string()
                    } else {
                        format!("{}/{}", asset_prefix, file)
                    },
                }
            })
            .collect()
    }
}
