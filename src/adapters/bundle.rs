//! Asset provider backed by a directory of bundled library files.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::AssetProvider;

/// Serves asset paths from files under a root directory
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an asset path, refusing anything that leaves the root
    fn resolve(&self, asset_path: &str) -> Result<PathBuf> {
        let relative = Path::new(asset_path);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            anyhow::bail!("Asset path escapes the asset directory: {}", asset_path);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetProvider for DirectoryProvider {
    fn name(&self) -> &str {
        "directory"
    }

    async fn load_library_asset(&self, asset_path: &str) -> Result<Option<String>> {
        let path = self.resolve(asset_path)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read asset: {}", path.display()))?;

        Ok(Some(content))
    }
}
