//! Parsed library content and the `excalidrawlib` schema parser.
//!
//! Two historical item shapes exist in the wild and both are accepted:
//!
//! ```text
//! { "type": "excalidrawlib", "library":      [ [ {..}, {..} ], ... ] }          // v1: bare arrays
//! { "type": "excalidrawlib", "libraryItems": [ { "id", "name", "elements" } ] } // v2: wrapped objects
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::manifest::{AssetDescriptor, LibraryId};

/// Document type marker every library file must carry
pub const LIBRARY_TYPE: &str = "excalidrawlib";

/// Reasons a payload is rejected as a library
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed library JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Library document has no `type` field")]
    MissingType,

    #[error("Unexpected document type: {0:?} (expected \"excalidrawlib\")")]
    UnexpectedType(String),

    #[error("Library document has neither `libraryItems` nor `library`")]
    MissingItems,
}

/// Where a library payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Injected native asset provider
    Provider,

    /// Network fetch of the descriptor's locator
    Network,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::Provider => write!(f, "provider"),
            ContentSource::Network => write!(f, "network"),
        }
    }
}

/// A single drawable primitive, kept as the raw JSON object the canvas expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Primitive(Map<String, Value>);

impl Primitive {
    /// Primitive kind (`rectangle`, `text`, ...)
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Text carried by this primitive, if it has any visible text
    pub fn text(&self) -> Option<&str> {
        self.0
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// One reusable drawable unit within a library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Item identifier (explicit, or `<library>-<position>`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Drawable primitives (never empty)
    pub elements: Vec<Primitive>,
}

/// A successfully loaded library asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedLibrary {
    /// Descriptor id this content was loaded for
    pub id: LibraryId,

    /// Display name from the descriptor
    pub name: String,

    /// Items in source order
    pub items: Vec<LibraryItem>,

    /// Where the payload was read from
    pub source: ContentSource,

    /// When the payload was parsed
    pub fetched_at: DateTime<Utc>,
}

impl ParsedLibrary {
    /// Look up an item by id
    pub fn item(&self, id: &str) -> Option<&LibraryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the library has no usable items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct LibraryDocument {
    #[serde(rename = "type")]
    kind: Option<String>,

    #[serde(rename = "libraryItems")]
    library_items: Option<Vec<RawItem>>,

    library: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawItem {
    Bare(Vec<Primitive>),
    Wrapped {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        elements: Vec<Primitive>,
    },
    Unrecognized(Value),
}

/// Parse a library payload for the given descriptor.
///
/// Items without primitives are dropped. Unnamed items are named after
/// their first text primitive, or `Item N` by 1-based source position.
pub fn parse_library(
    descriptor: &AssetDescriptor,
    payload: &str,
    source: ContentSource,
) -> Result<ParsedLibrary, ParseError> {
    let document: LibraryDocument = serde_json::from_str(payload)?;

    match document.kind.as_deref() {
        Some(LIBRARY_TYPE) => {}
        Some(other) => return Err(ParseError::UnexpectedType(other.to_string())),
        None => return Err(ParseError::MissingType),
    }

    let raw_items = document
        .library_items
        .or(document.library)
        .ok_or(ParseError::MissingItems)?;

    let items = raw_items
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| normalize_item(&descriptor.id, index + 1, raw))
        .collect();

    Ok(ParsedLibrary {
        id: descriptor.id.clone(),
        name: descriptor.name.clone(),
        items,
        source,
        fetched_at: Utc::now(),
    })
}

fn normalize_item(library: &LibraryId, position: usize, raw: RawItem) -> Option<LibraryItem> {
    let (id, name, elements) = match raw {
        RawItem::Bare(elements) => (None, None, elements),
        RawItem::Wrapped { id, name, elements } => (id, name, elements),
        RawItem::Unrecognized(_) => {
            tracing::debug!(%library, position, "Skipping unrecognized library item");
            return None;
        }
    };

    if elements.is_empty() {
        return None;
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| derive_name(&elements))
        .unwrap_or_else(|| format!("Item {}", position));

    let id = id
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| format!("{}-{}", library, position));

    Some(LibraryItem { id, name, elements })
}

/// First non-blank line of the first text-bearing primitive
fn derive_name(elements: &[Primitive]) -> Option<String> {
    let text = elements.iter().find_map(Primitive::text)?;
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
