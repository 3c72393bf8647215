//! shapelib - Lazy loader for Excalidraw shape libraries
//!
//! Fetches the shape libraries a diagramming canvas offers in its library
//! panel, parses them into a normalized form, and keeps them cached.
//!
//! # Behaviour
//!
//! - Descriptors come from a static manifest and are derived once
//! - Each library is fetched at most once; concurrent requests share it
//! - A bundled asset provider is consulted before the network
//! - Unavailable libraries are logged and reported as `None`, never cached
//!
//! # Modules
//!
//! - `adapters`: Collaborators (HTTP fetcher, bundled asset provider)
//! - `library`: Manifest, parser, and loader
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List libraries in the manifest
//! shapelib list
//!
//! # Load one library
//! shapelib load flowchart
//!
//! # Load everything
//! shapelib load-all
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{AssetProvider, DirectoryProvider, FetchError, Fetcher, HttpFetcher};
pub use library::{
    AssetDescriptor, LibraryId, LibraryItem, LibraryLoader, Manifest, ParsedLibrary, Primitive,
};
