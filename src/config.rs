//! Configuration for shapelib.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHAPELIB_BASE_URL, SHAPELIB_MANIFEST,
//!    SHAPELIB_ASSET_DIR, SHAPELIB_FETCH_TIMEOUT)
//! 2. Config file (.shapelib/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .shapelib/config.yaml
//! - Paths in config file are relative to the project root (the parent of .shapelib/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Host the built-in manifest's library files live on
pub const DEFAULT_BASE_URL: &str = "https://libraries.excalidraw.com/libraries";

/// Directory bundled library files live under
pub const DEFAULT_ASSET_PREFIX: &str = "libraries";

/// Client-side request timeout for library fetches
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub libraries: LibrariesConfig,
    #[serde(default)]
    pub network: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibrariesConfig {
    /// Host library files are fetched from
    pub base_url: Option<String>,
    /// JSON manifest replacing the built-in one (relative to project root)
    pub manifest: Option<String>,
    /// Directory of bundled library files (relative to project root)
    pub asset_dir: Option<String>,
    /// Prefix of bundled asset paths
    pub asset_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub fetch_timeout_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Host library files are fetched from
    pub base_url: String,
    /// Manifest file (built-in manifest when absent)
    pub manifest: Option<PathBuf>,
    /// Directory of bundled library files
    pub asset_dir: Option<PathBuf>,
    /// Prefix of bundled asset paths
    pub asset_prefix: String,
    /// Request timeout for network fetches
    pub fetch_timeout: Duration,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            manifest: None,
            asset_dir: default_asset_dir(),
            asset_prefix: DEFAULT_ASSET_PREFIX.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            config_file: None,
        }
    }
}

/// Platform data directory for bundled libraries (~/.local/share/shapelib on Linux)
fn default_asset_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("shapelib"))
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shapelib").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn parse_timeout(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid SHAPELIB_FETCH_TIMEOUT: {}", value))
}

/// Resolve configuration from an optional config file and an environment lookup
fn resolve_config(
    config_path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::default();

    if let Some(ref path) = config_path {
        let config = load_config_file(path)?;

        // Base directory is the parent of .shapelib/ (i.e., grandparent of config.yaml)
        let base_dir = path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let libraries = config.libraries;
        if let Some(base_url) = libraries.base_url {
            resolved.base_url = base_url;
        }
        if let Some(manifest) = libraries.manifest {
            resolved.manifest = Some(resolve_path(base_dir, &manifest));
        }
        if let Some(asset_dir) = libraries.asset_dir {
            resolved.asset_dir = Some(resolve_path(base_dir, &asset_dir));
        }
        if let Some(prefix) = libraries.asset_prefix {
            resolved.asset_prefix = prefix;
        }
        if let Some(secs) = config.network.and_then(|n| n.fetch_timeout_seconds) {
            resolved.fetch_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(base_url) = env("SHAPELIB_BASE_URL") {
        resolved.base_url = base_url;
    }
    if let Some(manifest) = env("SHAPELIB_MANIFEST") {
        resolved.manifest = Some(PathBuf::from(manifest));
    }
    if let Some(asset_dir) = env("SHAPELIB_ASSET_DIR") {
        resolved.asset_dir = Some(PathBuf::from(asset_dir));
    }
    if let Some(timeout) = env("SHAPELIB_FETCH_TIMEOUT") {
        resolved.fetch_timeout = Duration::from_secs(parse_timeout(&timeout)?);
    }

    resolved.config_file = config_path;
    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    resolve_config(find_config_file(), |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let dir = temp.path().join(".shapelib");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve_config(None, no_env).unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.asset_prefix, "libraries");
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.manifest.is_none());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
libraries:
  base_url: https://mirror.example.com/libs
  manifest: manifest.json
  asset_dir: /opt/assets
  asset_prefix: bundled
network:
  fetch_timeout_seconds: 5
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");
        assert_eq!(file.libraries.asset_prefix.as_deref(), Some("bundled"));

        let config = resolve_config(Some(config_path.clone()), no_env).unwrap();
        assert_eq!(config.base_url, "https://mirror.example.com/libs");
        assert_eq!(config.manifest, Some(temp.path().join("manifest.json")));
        assert_eq!(config.asset_dir, Some(PathBuf::from("/opt/assets")));
        assert_eq!(config.asset_prefix, "bundled");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
libraries:
  base_url: https://from-file.example.com
"#,
        );

        let env: HashMap<&str, &str> = [
            ("SHAPELIB_BASE_URL", "https://from-env.example.com"),
            ("SHAPELIB_FETCH_TIMEOUT", "12"),
            ("SHAPELIB_ASSET_DIR", "/env/assets"),
        ]
        .into_iter()
        .collect();

        let config = resolve_config(Some(config_path), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.base_url, "https://from-env.example.com");
        assert_eq!(config.fetch_timeout, Duration::from_secs(12));
        assert_eq!(config.asset_dir, Some(PathBuf::from("/env/assets")));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let result = resolve_config(None, |key| {
            (key == "SHAPELIB_FETCH_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
