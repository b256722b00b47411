//! Document store - access to the device's local document directory
//!
//! The triage engine only talks to the store through [`DocumentReader`] and
//! [`DocumentWriter`]. [`XochitlStore`] implements both on top of the
//! reMarkable `xochitl` directory layout:
//!
//! ```text
//! xochitl/
//!   <id>.metadata               # entity metadata (name, type, parent, timestamps)
//!   <id>.content                # content descriptor (pages, bookmarks)
//!   <id>/<page>.rm              # stroke data, only presence is checked
//!   <id>/<page>-metadata.json   # per-page layer descriptors
//! ```

pub mod models;
pub mod xochitl;

pub use models::{ContentDescriptor, Document, DocumentKind, Listing, PageAnnotations};
pub use xochitl::XochitlStore;

use crate::error::StoreError;

/// Read side of the document store
pub trait DocumentReader {
    /// Every entity in the store, deleted ones included
    fn list_documents(&self) -> Result<Listing, StoreError>;

    /// Content descriptor of a document, `None` if it has none
    fn content(&self, id: &str) -> Result<Option<ContentDescriptor>, StoreError>;

    /// Per-page annotation descriptors of a document
    fn page_annotations(&self, id: &str) -> Result<Vec<PageAnnotations>, StoreError>;
}

/// Write side of the document store, used only by the folder resolver
pub trait DocumentWriter {
    /// Create a collection and return its fresh id
    fn create_collection(&self, name: &str, parent: &str) -> Result<String, StoreError>;

    /// Re-parent an entity
    fn set_parent(&self, id: &str, parent: &str) -> Result<(), StoreError>;

    /// Bump an entity's modification timestamp
    fn touch(&self, id: &str) -> Result<(), StoreError>;

    /// Re-parent an entity and bump its modification timestamp
    fn relocate(&self, id: &str, parent: &str) -> Result<(), StoreError> {
        self.set_parent(id, parent)?;
        self.touch(id)
    }
}

/// Write JSON to `<path>.tmp`, then rename it over `path`
pub(crate) fn write_json_atomic(
    path: &std::path::Path,
    value: &serde_json::Value,
) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;

    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    let staged = std::path::PathBuf::from(staged);

    std::fs::write(&staged, body).map_err(|e| StoreError::io(&staged, e))?;
    std::fs::rename(&staged, path).map_err(|e| StoreError::io(path, e))
}
