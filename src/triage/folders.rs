//! Folder resolver - role folders, locations, and moves
//!
//! Built once per pass from the store listing. Every collection it finds or
//! creates goes into its index, so asking for the same folder twice never
//! creates a duplicate.

use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, info};

use super::models::{FolderRole, Location};
use crate::config::FoldersConfig;
use crate::error::StoreError;
use crate::store::{Document, DocumentKind, DocumentWriter};

/// Resolves role folders against one listing snapshot
pub struct FolderResolver<'a, W: DocumentWriter + ?Sized> {
    writer: &'a W,
    folders: &'a FoldersConfig,
    /// Live collections by id, including those created this pass
    collections: HashMap<String, Document>,
    resolved: HashMap<FolderRole, String>,
}

impl<'a, W: DocumentWriter + ?Sized> FolderResolver<'a, W> {
    pub fn new(writer: &'a W, folders: &'a FoldersConfig, documents: &[Document]) -> Self {
        let collections = documents
            .iter()
            .filter(|d| d.is_live_collection())
            .map(|d| (d.id.clone(), d.clone()))
            .collect();

        Self {
            writer,
            folders,
            collections,
            resolved: HashMap::new(),
        }
    }

    /// Configured display name of a role
    pub fn folder_name(&self, role: FolderRole) -> &'a str {
        match role {
            FolderRole::ToRead => &self.folders.to_read,
            FolderRole::Read => &self.folders.read,
            FolderRole::Archive => &self.folders.archive,
        }
    }

    /// Id of the role's folder, looking it up without creating it
    pub fn lookup(&mut self, role: FolderRole) -> Option<String> {
        if let Some(id) = self.resolved.get(&role) {
            return Some(id.clone());
        }
        let id = self.find_role_folder(self.folder_name(role))?;
        self.resolved.insert(role, id.clone());
        Some(id)
    }

    /// Id of the role's folder, creating it at the root if missing
    pub fn resolve_or_create(&mut self, role: FolderRole) -> Result<String, StoreError> {
        if let Some(id) = self.lookup(role) {
            return Ok(id);
        }

        let name = self.folder_name(role);
        let id = self.create(name, "")?;
        info!(role = %role, folder_id = %id, name, "Created role folder");
        self.resolved.insert(role, id.clone());
        Ok(id)
    }

    /// Dated child folder of a role folder, created on demand
    pub fn resolve_bucket(&mut self, role_folder_id: &str, name: &str) -> Result<String, StoreError> {
        let existing = self
            .collections
            .values()
            .filter(|c| c.visible_name == name && c.parent == role_folder_id)
            .map(|c| c.id.as_str())
            .min()
            .map(str::to_string);

        match existing {
            Some(id) => Ok(id),
            None => {
                let id = self.create(name, role_folder_id)?;
                info!(folder_id = %id, name, parent = %role_folder_id, "Created date folder");
                Ok(id)
            }
        }
    }

    /// Classify a document's position relative to the resolved role folders.
    /// With `bucketed`, a child collection of a role folder counts as that role.
    pub fn current_location(&self, doc: &Document, bucketed: bool) -> Location {
        if doc.parent.is_empty() {
            return Location::Root;
        }

        if let Some(role) = self.role_of_folder(&doc.parent) {
            return role.into();
        }

        if bucketed {
            if let Some(role) = self
                .collections
                .get(&doc.parent)
                .and_then(|bucket| self.role_of_folder(&bucket.parent))
            {
                return role.into();
            }
        }

        Location::Other
    }

    /// Move a document into `destination`; `false` when it is already there
    pub fn move_to(&self, doc: &Document, destination: &str) -> Result<bool, StoreError> {
        if doc.parent == destination {
            debug!(doc_id = %doc.id, destination, "Document already in destination");
            return Ok(false);
        }

        self.writer.relocate(&doc.id, destination)?;
        Ok(true)
    }

    fn role_of_folder(&self, folder_id: &str) -> Option<FolderRole> {
        self.resolved
            .iter()
            .find(|(_, id)| id.as_str() == folder_id)
            .map(|(role, _)| *role)
    }

    /// Matching live collection outside the trash, preferring the root,
    /// then the smallest id
    fn find_role_folder(&self, name: &str) -> Option<String> {
        self.collections
            .values()
            .filter(|c| c.visible_name == name && !self.in_trash(c))
            .min_by(|a, b| {
                (!a.is_at_root(), a.id.as_str()).cmp(&(!b.is_at_root(), b.id.as_str()))
            })
            .map(|c| c.id.clone())
    }

    /// Whether the collection or any ancestor sits in the trash
    fn in_trash(&self, collection: &Document) -> bool {
        let mut current = collection;
        // bounded walk, the listing may contain a parent cycle
        for _ in 0..=self.collections.len() {
            if current.is_trashed() {
                return true;
            }
            match self.collections.get(&current.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    fn create(&mut self, name: &str, parent: &str) -> Result<String, StoreError> {
        let id = self.writer.create_collection(name, parent)?;
        self.collections.insert(
            id.clone(),
            Document {
                id: id.clone(),
                visible_name: name.to_string(),
                kind: DocumentKind::Collection,
                parent: parent.to_string(),
                deleted: false,
                last_modified: crate::now_millis(),
                last_opened: 0,
            },
        );
        Ok(id)
    }
}

/// Dated sub-folder name for a document, from its modification time in the
/// local time zone (the current time when it has none)
pub fn bucket_name(doc: &Document, date_format: &str, now_ms: u64) -> Result<String, std::fmt::Error> {
    use chrono::TimeZone;

    let millis = if doc.last_modified > 0 { doc.last_modified } else { now_ms };
    let millis = i64::try_from(millis).map_err(|_| std::fmt::Error)?;
    let moment = chrono::Local
        .timestamp_millis_opt(millis)
        .earliest()
        .ok_or(std::fmt::Error)?;

    let mut name = String::new();
    write!(name, "{}", moment.format(date_format))?;
    Ok(name)
}
