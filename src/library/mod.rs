//! Shape libraries offered to the canvas.
//!
//! # Layout
//!
//! ```text
//! manifest  ──► AssetDescriptor (id, name, locator, asset_path)
//!                    │
//! loader    ──► provider? ──► network ──► content::parse_library
//!                    │
//!                    ▼
//!               ParsedLibrary (cached per id)
//! ```

pub mod content;
pub mod loader;
pub mod manifest;

pub use content::{
    parse_library, ContentSource, LibraryItem, ParseError, ParsedLibrary, Primitive, LIBRARY_TYPE,
};
pub use loader::{LibraryLoader, LoadError};
pub use manifest::{AssetDescriptor, LibraryId, Manifest, ManifestEntry};
