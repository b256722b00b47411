//! Analyzer - reading progress estimation
//!
//! Turns the raw signals the device leaves behind (page count, bookmarks,
//! per-page annotation layers, open timestamps) plus the previous observation
//! into a best-effort [`ReadingAnalysis`]. Read failures never escape: the
//! affected fields stay at zero and the failure is logged.

use serde::Serialize;
use tracing::{trace, warn};

use super::observations::ObservationRecord;
use crate::config::ReadingDetectionConfig;
use crate::store::{Document, DocumentReader};

/// A document opened this recently is assumed partially read
const RECENT_OPEN_WINDOW_SECS: u64 = 86_400;

/// Upper bound of reading time credited for one open session
const MAX_SESSION_SECS: u64 = 3_600;

/// Completion ratio above which annotations count as a read signal
const ANNOTATED_COMPLETION_FLOOR: f64 = 0.3;

/// Per-run reading progress estimate for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingAnalysis {
    pub pages_read: u32,
    pub total_pages: u32,
    pub has_annotations: bool,
    pub has_bookmarks: bool,
    /// Epoch milliseconds
    pub last_opened: u64,
    /// Accumulated seconds across passes
    pub reading_time: u64,
    pub completion_ratio: f64,
    pub likely_read: bool,
}

impl ReadingAnalysis {
    /// Snapshot persisted in the observation store
    pub fn to_record(&self, checked_at_secs: u64) -> ObservationRecord {
        ObservationRecord {
            last_opened: self.last_opened,
            reading_time: self.reading_time,
            completion_ratio: self.completion_ratio,
            has_annotations: self.has_annotations,
            last_checked: checked_at_secs,
        }
    }
}

/// Progress analyzer
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: ReadingDetectionConfig,
}

impl Analyzer {
    pub fn new(config: ReadingDetectionConfig) -> Self {
        Self { config }
    }

    /// Analyze one document as of `now_ms`
    pub fn analyze<R: DocumentReader + ?Sized>(
        &self,
        reader: &R,
        doc: &Document,
        prior: Option<&ObservationRecord>,
        now_ms: u64,
    ) -> ReadingAnalysis {
        let mut analysis = ReadingAnalysis {
            last_opened: doc.last_opened,
            ..Default::default()
        };

        let content = match reader.content(&doc.id) {
            Ok(content) => content,
            Err(e) => {
                warn!(doc_id = %doc.id, error = %e, "Content unavailable, progress left at zero");
                None
            }
        };

        if let Some(content) = content {
            analysis.total_pages = content.page_count();
            analysis.has_bookmarks = content.has_bookmarks();

            let pages = match reader.page_annotations(&doc.id) {
                Ok(pages) => pages,
                Err(e) => {
                    warn!(doc_id = %doc.id, error = %e, "Page data unavailable, ignoring annotations");
                    Vec::new()
                }
            };
            let annotated_pages = pages.iter().filter(|p| p.is_annotated()).count();
            let annotated_pages = u32::try_from(annotated_pages).unwrap_or(u32::MAX);
            analysis.has_annotations = annotated_pages > 0;

            if analysis.total_pages > 0 {
                analysis.pages_read = estimate_pages_read(
                    analysis.total_pages,
                    annotated_pages,
                    doc.last_opened,
                    now_ms,
                );
                analysis.completion_ratio =
                    f64::from(analysis.pages_read) / f64::from(analysis.total_pages);
            }
        }

        analysis.reading_time = accumulate_reading_time(doc.last_opened, prior);
        analysis.likely_read = self.is_likely_read(&analysis);

        trace!(
            doc_id = %doc.id,
            pages_read = analysis.pages_read,
            total_pages = analysis.total_pages,
            reading_time = analysis.reading_time,
            likely_read = analysis.likely_read,
            "Analyzed document"
        );

        analysis
    }

    fn is_likely_read(&self, analysis: &ReadingAnalysis) -> bool {
        analysis.completion_ratio >= self.config.pages_threshold
            || (self.config.annotation_indicates_read
                && analysis.has_annotations
                && analysis.completion_ratio > ANNOTATED_COMPLETION_FLOOR)
            || analysis.reading_time >= self.config.time_threshold
    }
}

/// Annotated pages when there are any; otherwise a quarter of the document
/// (at least one page) if it was opened in the last 24 hours
fn estimate_pages_read(total_pages: u32, annotated_pages: u32, last_opened_ms: u64, now_ms: u64) -> u32 {
    if annotated_pages > 0 {
        return annotated_pages;
    }

    // A last_opened in the future counts as recent
    let since_opened_secs = now_ms.saturating_sub(last_opened_ms) / 1000;
    if since_opened_secs < RECENT_OPEN_WINDOW_SECS {
        (total_pages / 4).max(1).min(total_pages)
    } else {
        0
    }
}

/// Carry the prior total forward, adding the capped session length when the
/// document has been opened again since
fn accumulate_reading_time(last_opened_ms: u64, prior: Option<&ObservationRecord>) -> u64 {
    let Some(prior) = prior else {
        return 0;
    };

    if last_opened_ms > prior.last_opened {
        let session_secs = (last_opened_ms - prior.last_opened) / 1000;
        prior.reading_time.saturating_add(session_secs.min(MAX_SESSION_SECS))
    } else {
        prior.reading_time
    }
}
