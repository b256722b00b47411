//! Store models - typed views of the on-device JSON files

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Metadata `type` values written by the device
pub const DOCUMENT_TYPE: &str = "DocumentType";
pub const COLLECTION_TYPE: &str = "CollectionType";

/// `parent` value of entities the user moved to the trash
pub const TRASH_PARENT: &str = "trash";

/// One entity of the store: an article/note or a folder
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub visible_name: String,
    pub kind: DocumentKind,
    /// Owning collection id, empty for the store root
    pub parent: String,
    pub deleted: bool,
    /// Epoch milliseconds
    pub last_modified: u64,
    /// Epoch milliseconds, 0 if never opened
    pub last_opened: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Document,
    Collection,
    /// Anything the device may add later (templates, ...)
    Other,
}

impl Document {
    pub fn from_metadata(id: impl Into<String>, metadata: RawMetadata) -> Self {
        let kind = match metadata.kind.as_str() {
            DOCUMENT_TYPE => DocumentKind::Document,
            COLLECTION_TYPE => DocumentKind::Collection,
            _ => DocumentKind::Other,
        };

        Self {
            id: id.into(),
            visible_name: metadata.visible_name,
            kind,
            parent: metadata.parent,
            deleted: metadata.deleted,
            last_modified: metadata.last_modified,
            last_opened: metadata.last_opened,
        }
    }

    pub fn is_live_collection(&self) -> bool {
        self.kind == DocumentKind::Collection && !self.deleted
    }

    pub fn is_at_root(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn is_trashed(&self) -> bool {
        self.parent == TRASH_PARENT
    }
}

/// One snapshot of the store
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Parsed entities, sorted by id
    pub documents: Vec<Document>,
    /// Ids whose metadata file exists but could not be read or parsed
    pub unreadable: Vec<String>,
}

impl Listing {
    /// Every id with a metadata file on disk, readable or not
    pub fn ids(&self) -> HashSet<&str> {
        self.documents
            .iter()
            .map(|d| d.id.as_str())
            .chain(self.unreadable.iter().map(String::as_str))
            .collect()
    }
}

/// Fields of a `.metadata` file the engine consumes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetadata {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub visible_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub parent: String,
    #[serde(default, deserialize_with = "nullable")]
    pub deleted: bool,
    #[serde(default, deserialize_with = "millis")]
    pub last_modified: u64,
    #[serde(default, deserialize_with = "millis")]
    pub last_opened: u64,
}

/// `.content` descriptor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDescriptor {
    #[serde(default)]
    pub pages: Vec<serde_json::Value>,
    #[serde(default)]
    pub bookmarks: Vec<serde_json::Value>,
}

impl ContentDescriptor {
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    pub fn has_bookmarks(&self) -> bool {
        !self.bookmarks.is_empty()
    }
}

/// `<page>-metadata.json` descriptor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageAnnotations {
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub strokes: Option<serde_json::Value>,
    #[serde(default)]
    pub highlights: Option<serde_json::Value>,
}

impl Layer {
    fn has_marks(&self) -> bool {
        self.strokes.as_ref().is_some_and(is_truthy)
            || self.highlights.as_ref().is_some_and(is_truthy)
    }
}

impl PageAnnotations {
    /// A page is annotated if any layer carries strokes or highlights
    pub fn is_annotated(&self) -> bool {
        self.layers.iter().any(Layer::has_marks)
    }
}

/// Empty lists, empty strings, zero, false and null mean "no marks"
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// `null` reads as the field's default
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The device writes timestamps as decimal strings; older files use numbers
fn millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(v) => v,
        Raw::Float(v) if v.is_finite() && v > 0.0 => v as u64,
        Raw::Float(_) | Raw::Null(()) => 0,
        Raw::Text(s) => s.trim().parse().unwrap_or(0),
    })
}
