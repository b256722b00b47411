//! Filesystem-backed document store over the xochitl directory
//!
//! Metadata rewrites go through a temporary sibling file and a rename so the
//! device never sees a half-written `.metadata` file.

use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

use super::models::{
    ContentDescriptor, Document, Listing, PageAnnotations, RawMetadata, COLLECTION_TYPE,
};
use super::{write_json_atomic, DocumentReader, DocumentWriter};
use crate::error::StoreError;
use crate::now_millis;

const METADATA_EXT: &str = "metadata";
const CONTENT_EXT: &str = "content";
const PAGE_EXT: &str = "rm";

/// Document store rooted at a xochitl directory
#[derive(Debug, Clone)]
pub struct XochitlStore {
    root: PathBuf,
}

impl XochitlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, METADATA_EXT))
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, CONTENT_EXT))
    }

    fn read_metadata_map(&self, id: &str) -> Result<Map<String, Value>, StoreError> {
        let path = self.metadata_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::json(&path, e))
    }

    /// Rewrite selected metadata keys, keeping everything else the device stored
    fn update_metadata(
        &self,
        id: &str,
        update: impl FnOnce(&mut Map<String, Value>),
    ) -> Result<(), StoreError> {
        let mut metadata = self.read_metadata_map(id)?;
        update(&mut metadata);
        metadata.insert("metadatamodified".to_string(), Value::Bool(true));
        metadata.insert("modified".to_string(), Value::Bool(true));
        write_json_atomic(&self.metadata_path(id), &Value::Object(metadata))
    }
}

impl DocumentReader for XochitlStore {
    fn list_documents(&self) -> Result<Listing, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut listing = Listing::default();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.root, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(METADATA_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let parsed = fs::read_to_string(&path)
                .map_err(|e| StoreError::io(&path, e))
                .and_then(|content| {
                    serde_json::from_str::<RawMetadata>(&content)
                        .map_err(|e| StoreError::json(&path, e))
                });

            match parsed {
                Ok(raw) => listing.documents.push(Document::from_metadata(id, raw)),
                Err(e) => {
                    // Usually the device is mid-write; the id still exists
                    warn!(doc_id = %id, error = %e, "Skipping unreadable metadata file");
                    listing.unreadable.push(id.to_string());
                }
            }
        }

        // Stable enumeration order across passes
        listing.documents.sort_by(|a, b| a.id.cmp(&b.id));
        listing.unreadable.sort();
        trace!(
            count = listing.documents.len(),
            unreadable = listing.unreadable.len(),
            "Listed documents"
        );
        Ok(listing)
    }

    fn content(&self, id: &str) -> Result<Option<ContentDescriptor>, StoreError> {
        let path = self.content_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::json(&path, e))
    }

    fn page_annotations(&self, id: &str) -> Result<Vec<PageAnnotations>, StoreError> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut page_files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| StoreError::io(&dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(PAGE_EXT))
            .collect();
        page_files.sort();

        let mut pages = Vec::new();
        for page_file in page_files {
            let Some(stem) = page_file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let descriptor = dir.join(format!("{}-metadata.json", stem));
            if !descriptor.exists() {
                continue;
            }

            let parsed = fs::read_to_string(&descriptor)
                .map_err(|e| StoreError::io(&descriptor, e))
                .and_then(|content| {
                    serde_json::from_str::<PageAnnotations>(&content)
                        .map_err(|e| StoreError::json(&descriptor, e))
                });

            match parsed {
                Ok(page) => pages.push(page),
                Err(e) => warn!(doc_id = %id, error = %e, "Skipping unreadable page descriptor"),
            }
        }

        Ok(pages)
    }
}

impl DocumentWriter for XochitlStore {
    fn create_collection(&self, name: &str, parent: &str) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();

        let metadata = json!({
            "deleted": false,
            "lastModified": now_millis().to_string(),
            "metadatamodified": true,
            "modified": true,
            "parent": parent,
            "pinned": false,
            "synced": false,
            "type": COLLECTION_TYPE,
            "version": 1,
            "visibleName": name,
        });

        write_json_atomic(&self.content_path(&id), &json!({}))?;
        write_json_atomic(&self.metadata_path(&id), &metadata)?;

        info!(folder_id = %id, name, parent, "Created folder");
        Ok(id)
    }

    fn set_parent(&self, id: &str, parent: &str) -> Result<(), StoreError> {
        self.update_metadata(id, |metadata| {
            metadata.insert("parent".to_string(), Value::String(parent.to_string()));
        })?;
        debug!(doc_id = %id, parent, "Updated parent");
        Ok(())
    }

    fn touch(&self, id: &str) -> Result<(), StoreError> {
        self.update_metadata(id, |metadata| {
            metadata.insert(
                "lastModified".to_string(),
                Value::String(now_millis().to_string()),
            );
        })
    }

    /// One metadata rewrite, so a move is never left half applied
    fn relocate(&self, id: &str, parent: &str) -> Result<(), StoreError> {
        self.update_metadata(id, |metadata| {
            metadata.insert("parent".to_string(), Value::String(parent.to_string()));
            metadata.insert(
                "lastModified".to_string(),
                Value::String(now_millis().to_string()),
            );
        })?;
        debug!(doc_id = %id, parent, "Moved document");
        Ok(())
    }
}
