//! Command-line interface for shapelib.
//!
//! Lists the libraries in the manifest and loads them through the same
//! loader the app uses, which makes it handy for checking a manifest or a
//! bundled asset directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::library::{LibraryLoader, ParsedLibrary};

/// shapelib - Shape library loader
#[derive(Parser, Debug)]
#[command(name = "shapelib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List libraries in the manifest
    List,

    /// Load a single library and show its items
    Load {
        /// Library ID
        library_id: String,

        /// Print the parsed library as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every library in the manifest
    LoadAll,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::List => list_libraries(),
            Commands::Load { library_id, json } => load_library(&library_id, json).await,
            Commands::LoadAll => load_all_libraries().await,
            Commands::Config => show_config(),
        }
    }
}

fn loader() -> Result<LibraryLoader> {
    LibraryLoader::from_config(config::config()?)
}

/// List libraries in the manifest
fn list_libraries() -> Result<()> {
    let loader = loader()?;
    let descriptors = loader.list_descriptors();

    if descriptors.is_empty() {
        println!("Manifest is empty.");
        return Ok(());
    }

    println!("{:<24} {:<28} {:<50}", "ID", "NAME", "LOCATOR");
    println!("{}", "-".repeat(102));

    for descriptor in descriptors.iter() {
        println!(
            "{:<24} {:<28} {:<50}",
            descriptor.id.as_str(),
            truncate(&descriptor.name, 28),
            descriptor.locator
        );
    }

    println!("\nTotal: {} libraries", descriptors.len());

    Ok(())
}

/// Load one library
async fn load_library(library_id: &str, json: bool) -> Result<()> {
    let loader = loader()?;

    if loader.descriptor(library_id).is_none() {
        anyhow::bail!("Unknown library: {}", library_id);
    }

    let Some(library) = loader.load_by_id(library_id).await else {
        anyhow::bail!("Library '{}' is unavailable (see log for details)", library_id);
    };

    if json {
        let output = serde_json::to_string_pretty(library.as_ref())
            .context("Failed to serialize library")?;
        println!("{}", output);
        return Ok(());
    }

    print_library(&library);
    Ok(())
}

/// Load every library
async fn load_all_libraries() -> Result<()> {
    let loader = loader()?;
    let total = loader.list_descriptors().len();
    let libraries = loader.load_all().await;

    println!("{:<24} {:<28} {:>6} {:<8}", "ID", "NAME", "ITEMS", "SOURCE");
    println!("{}", "-".repeat(70));

    for library in &libraries {
        println!(
            "{:<24} {:<28} {:>6} {:<8}",
            library.id.as_str(),
            truncate(&library.name, 28),
            library.len(),
            library.source.to_string()
        );
    }

    println!("\nLoaded {} of {} libraries", libraries.len(), total);

    Ok(())
}

fn print_library(library: &ParsedLibrary) {
    println!("Library: {} ({})", library.name, library.id);
    println!("Source:  {}", library.source);
    println!("Fetched: {}", library.fetched_at);
    println!();

    if library.is_empty() {
        println!("  (no items)");
        return;
    }

    for item in &library.items {
        println!("  {:<32} {:>4} elements  [{}]", truncate(&item.name, 32), item.elements.len(), item.id);
    }

    println!("\nTotal: {} items", library.len());
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("shapelib configuration");
    println!();
    println!(
        "Config file:   {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Base URL:      {}", cfg.base_url);
    println!(
        "Manifest:      {}",
        cfg.manifest
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string())
    );
    println!(
        "Asset dir:     {}",
        cfg.asset_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("Asset prefix:  {}", cfg.asset_prefix);
    println!("Fetch timeout: {}s", cfg.fetch_timeout.as_secs());

    Ok(())
}

/// Truncate to `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
