//! Triage - reading-progress driven folder state machine
//!
//! Each pass lists the store, filters article-like documents, analyzes their
//! reading progress, and advances each one at most one step:
//!
//! ```text
//!   root ──new──▶ to_read ──likely read──▶ read ──old & read──▶ archive
//! ```
//!
//! Anything outside the role folders is left alone.

pub mod analyzer;
pub mod folders;
pub mod models;
pub mod observations;

use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::TriageError;
use crate::store::{Document, DocumentKind, DocumentReader, DocumentWriter};
pub use analyzer::{Analyzer, ReadingAnalysis};
pub use folders::FolderResolver;
pub use models::{DocumentReport, FolderRole, Location, PassReport};
pub use observations::{ObservationRecord, ObservationStore};

/// Name fragments that mark web content regardless of configured patterns
const WEB_INDICATORS: [&str; 7] = ["http", "www.", ".com", ".org", ".net", "article", "blog"];

const MINUTE_MS: u64 = 60_000;
const DAY_MS: u64 = 86_400_000;

/// Owns the triage state of one long-running process
pub struct TriageController<S> {
    store: S,
    config: Config,
    analyzer: Analyzer,
    observations: ObservationStore,
    /// Root documents already filed by this controller; not persisted
    processed: HashSet<String>,
}

impl<S: DocumentReader + DocumentWriter> TriageController<S> {
    pub fn new(store: S, config: Config, observations: ObservationStore) -> Self {
        Self {
            analyzer: Analyzer::new(config.reading_detection.clone()),
            store,
            config,
            observations,
            processed: HashSet::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn observations(&self) -> &ObservationStore {
        &self.observations
    }

    /// Run one pass against the current time
    pub fn run_pass(&mut self) -> Result<PassReport, TriageError> {
        self.run_pass_at(crate::now_millis())
    }

    /// Run one pass as of `now_ms`
    pub fn run_pass_at(&mut self, now_ms: u64) -> Result<PassReport, TriageError> {
        debug!("Triage pass starting");

        let listing = self.store.list_documents().map_err(TriageError::Listing)?;
        let documents = &listing.documents;

        let mut report = PassReport {
            examined: documents.len(),
            ..Default::default()
        };

        let mut resolver = FolderResolver::new(&self.store, &self.config.folders, documents);
        for role in FolderRole::ALL {
            resolver
                .resolve_or_create(role)
                .map_err(|source| TriageError::FolderResolution {
                    role: role.to_string(),
                    source,
                })?;
        }

        for doc in documents {
            if !is_eligible(doc, &self.config, now_ms) {
                continue;
            }
            report.eligible += 1;

            let analysis =
                self.analyzer
                    .analyze(&self.store, doc, self.observations.get(&doc.id), now_ms);
            self.observations
                .put(doc.id.clone(), analysis.to_record(now_ms / 1000));

            let location = resolver.current_location(doc, self.config.organize_by_date);
            let already_processed = self.processed.contains(&doc.id);
            let Some(target) =
                next_role(location, &analysis, already_processed, &self.config, now_ms)
            else {
                continue;
            };

            if target == FolderRole::ToRead {
                self.processed.insert(doc.id.clone());
            } else {
                info!(
                    doc_id = %doc.id,
                    name = %doc.visible_name,
                    completion = %format!("{:.1}%", analysis.completion_ratio * 100.0),
                    target = %target,
                    "Article advanced by reading progress"
                );
            }

            // Role folders were resolved above, so this never creates
            let role_folder = match resolver.resolve_or_create(target) {
                Ok(id) => id,
                Err(e) => {
                    error!(doc_id = %doc.id, error = %e, "Role folder unavailable");
                    report.failed_moves += 1;
                    continue;
                }
            };
            let destination = if self.config.organize_by_date {
                dated_destination(&mut resolver, &role_folder, doc, &self.config.date_format, now_ms)
            } else {
                role_folder
            };

            match resolver.move_to(doc, &destination) {
                Ok(_) => {
                    info!(
                        doc_id = %doc.id,
                        name = %doc.visible_name,
                        folder = %resolver.folder_name(target),
                        "Moved document"
                    );
                    match target {
                        FolderRole::ToRead => report.processed += 1,
                        FolderRole::Read => report.moved_to_read += 1,
                        FolderRole::Archive => report.archived += 1,
                    }
                }
                Err(e) => {
                    error!(doc_id = %doc.id, error = %e, "Failed to move document");
                    report.failed_moves += 1;
                }
            }
        }

        if self.config.prune_orphaned_observations {
            // Unreadable ids are still live, their metadata is often mid-write
            report.pruned = self.observations.prune(&listing.ids());
        }

        match self.observations.flush() {
            Ok(written) => report.observations_flushed = written,
            Err(e) => error!(error = %e, "Failed to save reading state"),
        }

        if report.moved_any() {
            info!(
                processed = report.processed,
                moved_to_read = report.moved_to_read,
                archived = report.archived,
                "Processing summary"
            );
        }
        debug!(eligible = report.eligible, "Triage pass complete");

        Ok(report)
    }

    /// Analyze every eligible document without moving anything or touching
    /// the observation store
    pub fn analyze_all(&self, now_ms: u64) -> Result<Vec<DocumentReport>, TriageError> {
        let listing = self.store.list_documents().map_err(TriageError::Listing)?;
        let documents = &listing.documents;
        let mut resolver = FolderResolver::new(&self.store, &self.config.folders, documents);
        for role in FolderRole::ALL {
            resolver.lookup(role);
        }

        let reports = documents
            .iter()
            .filter(|doc| is_eligible(doc, &self.config, now_ms))
            .map(|doc| {
                let analysis =
                    self.analyzer
                        .analyze(&self.store, doc, self.observations.get(&doc.id), now_ms);
                let location = resolver.current_location(doc, self.config.organize_by_date);
                let already_processed = self.processed.contains(&doc.id);
                DocumentReport {
                    id: doc.id.clone(),
                    name: doc.visible_name.clone(),
                    location,
                    next_role: next_role(location, &analysis, already_processed, &self.config, now_ms),
                    analysis,
                }
            })
            .collect();

        Ok(reports)
    }
}

/// Dated sub-folder of the role folder, or the role folder itself when the
/// bucket cannot be named or created
fn dated_destination<W: DocumentWriter + ?Sized>(
    resolver: &mut FolderResolver<'_, W>,
    role_folder: &str,
    doc: &Document,
    date_format: &str,
    now_ms: u64,
) -> String {
    let bucket = folders::bucket_name(doc, date_format, now_ms)
        .map_err(|e| e.to_string())
        .and_then(|name| {
            resolver
                .resolve_bucket(role_folder, &name)
                .map_err(|e| e.to_string())
        });

    match bucket {
        Ok(id) => id,
        Err(e) => {
            warn!(doc_id = %doc.id, error = %e, "Error creating date folder, using role folder");
            role_folder.to_string()
        }
    }
}

/// Article-like, live, and old enough to no longer be mid-transfer
pub fn is_eligible(doc: &Document, config: &Config, now_ms: u64) -> bool {
    if doc.kind != DocumentKind::Document || doc.deleted {
        return false;
    }
    if !is_article_like(&doc.visible_name, &config.source_patterns) {
        return false;
    }

    let age_ms = now_ms.saturating_sub(doc.last_modified);
    age_ms >= config.file_age_threshold.saturating_mul(MINUTE_MS)
}

/// Case-insensitive match against the source patterns and web indicators
pub fn is_article_like(visible_name: &str, source_patterns: &[String]) -> bool {
    let name = visible_name.to_lowercase();

    source_patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| name.contains(&p.to_lowercase()))
        || WEB_INDICATORS.iter().any(|indicator| name.contains(indicator))
}

/// The single transition a document may take this pass, if any
pub fn next_role(
    location: Location,
    analysis: &ReadingAnalysis,
    already_processed: bool,
    config: &Config,
    now_ms: u64,
) -> Option<FolderRole> {
    match location {
        Location::Root if !already_processed => Some(FolderRole::ToRead),
        Location::ToRead
            if config.reading_detection.enable_auto_move && analysis.likely_read =>
        {
            Some(FolderRole::Read)
        }
        Location::Read if should_archive(analysis, config, now_ms) => Some(FolderRole::Archive),
        _ => None,
    }
}

fn should_archive(analysis: &ReadingAnalysis, config: &Config, now_ms: u64) -> bool {
    let archive = &config.archive_read_articles;
    if !archive.enable || !analysis.likely_read {
        return false;
    }

    let days_since_opened = now_ms.saturating_sub(analysis.last_opened) as f64 / DAY_MS as f64;
    days_since_opened >= archive.days_threshold as f64
}
