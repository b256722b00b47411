//! Triage models - roles, locations, and pass reporting

use serde::Serialize;
use std::fmt;

use super::analyzer::ReadingAnalysis;

/// Logical destination a document can be filed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderRole {
    ToRead,
    Read,
    Archive,
}

impl FolderRole {
    pub const ALL: [FolderRole; 3] = [FolderRole::ToRead, FolderRole::Read, FolderRole::Archive];

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderRole::ToRead => "to_read",
            FolderRole::Read => "read",
            FolderRole::Archive => "archive",
        }
    }
}

impl fmt::Display for FolderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a document currently sits, relative to the role folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Root,
    ToRead,
    Read,
    Archive,
    /// Inside some collection that is not a role folder
    Other,
}

impl From<FolderRole> for Location {
    fn from(role: FolderRole) -> Self {
        match role {
            FolderRole::ToRead => Location::ToRead,
            FolderRole::Read => Location::Read,
            FolderRole::Archive => Location::Archive,
        }
    }
}

/// Aggregate counters of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Entities returned by the store listing
    pub examined: usize,
    /// Documents that passed the eligibility gate
    pub eligible: usize,
    /// New articles filed from the root into "to read"
    pub processed: usize,
    pub moved_to_read: usize,
    pub archived: usize,
    pub failed_moves: usize,
    /// Orphaned observation records dropped
    pub pruned: usize,
    pub observations_flushed: bool,
}

impl PassReport {
    pub fn moved_any(&self) -> bool {
        self.processed + self.moved_to_read + self.archived > 0
    }
}

/// Read-only view of one eligible document (the `analyze` command)
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub analysis: ReadingAnalysis,
    /// Role the next pass would move the document to
    pub next_role: Option<FolderRole>,
}
