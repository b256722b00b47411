//! End-to-end triage passes against a throwaway xochitl directory

use std::path::Path;

use rm_triage::store::{Document, DocumentKind, DocumentReader};
use rm_triage::triage::Location;
use rm_triage::{Config, ObservationStore, TriageController, XochitlStore};
use serde_json::json;
use tempfile::TempDir;

const MINUTE_MS: u64 = 60_000;
const DAY_MS: u64 = 86_400_000;

struct Device {
    dir: TempDir,
}

impl Device {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("xochitl")).unwrap();
        Self { dir }
    }

    fn store_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("xochitl")
    }

    fn state_file(&self) -> std::path::PathBuf {
        self.dir.path().join("state").join("reading_state.json")
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.store_dir = self.store_dir();
        config.state_file = self.state_file();
        config
    }

    fn controller(&self, config: Config) -> TriageController<XochitlStore> {
        TriageController::new(
            XochitlStore::new(self.store_dir()),
            config,
            ObservationStore::open(self.state_file()),
        )
    }

    fn write_entity(&self, id: &str, name: &str, kind: &str, parent: &str, modified: u64, opened: u64) {
        let metadata = json!({
            "type": kind,
            "visibleName": name,
            "parent": parent,
            "deleted": false,
            "lastModified": modified.to_string(),
            "lastOpened": opened.to_string(),
            "pinned": false,
        });
        write(&self.store_dir().join(format!("{}.metadata", id)), &metadata.to_string());
    }

    fn add_document(&self, id: &str, name: &str, parent: &str, modified: u64, opened: u64) {
        self.write_entity(id, name, "DocumentType", parent, modified, opened);
    }

    fn add_folder(&self, id: &str, name: &str, parent: &str) {
        self.write_entity(id, name, "CollectionType", parent, 1, 0);
    }

    /// Content with `total` pages, the first `annotated` of them carrying strokes
    fn add_pages(&self, id: &str, total: usize, annotated: usize) {
        let pages: Vec<String> = (0..total).map(|i| format!("page-{}", i)).collect();
        write(
            &self.store_dir().join(format!("{}.content", id)),
            &json!({ "pages": pages }).to_string(),
        );

        let page_dir = self.store_dir().join(id);
        std::fs::create_dir_all(&page_dir).unwrap();
        for page in pages.iter().take(annotated) {
            write(&page_dir.join(format!("{}.rm", page)), "");
            write(
                &page_dir.join(format!("{}-metadata.json", page)),
                r#"{"layers": [{"name": "Layer 1", "strokes": [{"points": 12}]}]}"#,
            );
        }
    }

    fn listing(&self) -> Vec<Document> {
        XochitlStore::new(self.store_dir()).list_documents().unwrap().documents
    }

    fn parent_of(&self, id: &str) -> String {
        self.listing().into_iter().find(|d| d.id == id).unwrap().parent
    }

    fn folders_named(&self, name: &str) -> Vec<Document> {
        self.listing()
            .into_iter()
            .filter(|d| d.kind == DocumentKind::Collection && d.visible_name == name)
            .collect()
    }

    fn folder_id(&self, name: &str) -> String {
        let folders = self.folders_named(name);
        assert_eq!(folders.len(), 1, "expected exactly one '{}' folder", name);
        folders[0].id.clone()
    }
}

fn write(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
}

#[test]
fn test_new_article_filed_once_and_left_alone() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_document("art", "Read on reMarkable - example.com", "", now - 10 * MINUTE_MS, 0);
    device.add_pages("art", 4, 0);

    let mut controller = device.controller(device.config());
    let report = controller.run_pass_at(now).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.moved_to_read, 0);
    assert!(report.observations_flushed);
    let to_read = device.folder_id("To Read");
    assert_eq!(device.parent_of("art"), to_read);

    // later passes see it in "to read", unread, and leave it there
    for minutes in [10, 20, 30] {
        let report = controller.run_pass_at(now + minutes * MINUTE_MS).unwrap();
        assert_eq!(report.processed + report.moved_to_read + report.archived, 0);
    }
    assert_eq!(device.parent_of("art"), to_read);
}

#[test]
fn test_no_duplicate_role_folders_after_many_passes() {
    let device = Device::new();
    let now = rm_triage::now_millis();

    for pass in 0..5 {
        // a fresh controller each time, like separate `once` runs
        let mut controller = device.controller(device.config());
        controller.run_pass_at(now + pass * MINUTE_MS).unwrap();
    }

    for name in ["To Read", "Read Articles", "Archived Articles"] {
        let folders = device.folders_named(name);
        assert_eq!(folders.len(), 1, "duplicate '{}' folders", name);
        assert!(folders[0].parent.is_empty());
    }
}

#[test]
fn test_existing_role_folder_is_reused() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("existing-read", "Read Articles", "");

    device.controller(device.config()).run_pass_at(now).unwrap();

    assert_eq!(device.folder_id("Read Articles"), "existing-read");
}

#[test]
fn test_fully_annotated_article_moves_to_read() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-to-read", "To Read", "");
    device.add_document("art", "www.blog.org/post", "f-to-read", now - DAY_MS, now - 2 * DAY_MS);
    device.add_pages("art", 5, 5);

    let report = device.controller(device.config()).run_pass_at(now).unwrap();

    assert_eq!(report.moved_to_read, 1);
    assert_eq!(device.parent_of("art"), device.folder_id("Read Articles"));
}

#[test]
fn test_auto_move_disabled_keeps_read_article() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-to-read", "To Read", "");
    device.add_document("art", "www.blog.org/post", "f-to-read", now - DAY_MS, now - 2 * DAY_MS);
    device.add_pages("art", 5, 5);

    let mut config = device.config();
    config.reading_detection.enable_auto_move = false;
    let report = device.controller(config).run_pass_at(now).unwrap();

    assert_eq!(report.moved_to_read, 0);
    assert_eq!(device.parent_of("art"), "f-to-read");
}

#[test]
fn test_old_read_article_is_archived_when_enabled() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-read", "Read Articles", "");
    device.add_document("art", "news.com story", "f-read", now - 40 * DAY_MS, now - 40 * DAY_MS);
    device.add_pages("art", 5, 5);

    let mut config = device.config();
    config.archive_read_articles.enable = true;
    let report = device.controller(config).run_pass_at(now).unwrap();

    assert_eq!(report.archived, 1);
    assert_eq!(device.parent_of("art"), device.folder_id("Archived Articles"));
}

#[test]
fn test_archiving_disabled_never_archives() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-read", "Read Articles", "");
    device.add_document("art", "news.com story", "f-read", now - 400 * DAY_MS, now - 400 * DAY_MS);
    device.add_pages("art", 5, 5);

    let mut controller = device.controller(device.config());
    for day in 0..3 {
        let report = controller.run_pass_at(now + day * DAY_MS).unwrap();
        assert_eq!(report.archived, 0);
    }
    assert_eq!(device.parent_of("art"), "f-read");
}

#[test]
fn test_gate_skips_young_foreign_and_deleted_documents() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_document("young", "example.com fresh", "", now - 2 * MINUTE_MS, 0);
    device.add_document("notes", "Meeting notes", "", now - DAY_MS, 0);
    device.add_folder("f-misc", "Misc", "");
    device.add_document("filed", "example.com filed by hand", "f-misc", now - DAY_MS, 0);
    device.add_document("trashed", "example.com old", "trash", now - DAY_MS, 0);

    let mut metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(device.store_dir().join("notes.metadata")).unwrap(),
    )
    .unwrap();
    metadata["visibleName"] = json!("blog draft");
    metadata["deleted"] = json!(true);
    write(&device.store_dir().join("gone.metadata"), &metadata.to_string());

    let report = device.controller(device.config()).run_pass_at(now).unwrap();

    assert_eq!(report.eligible, 2);
    assert_eq!(report.processed, 0);
    assert_eq!(device.parent_of("young"), "");
    assert_eq!(device.parent_of("notes"), "");
    assert_eq!(device.parent_of("filed"), "f-misc");
    assert_eq!(device.parent_of("trashed"), "trash");
    assert_eq!(device.parent_of("gone"), "");
}

#[test]
fn test_date_buckets_under_role_folder() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_document("art", "example.com", "", now - 10 * MINUTE_MS, 0);

    let mut config = device.config();
    config.organize_by_date = true;
    config.date_format = "%Y".to_string();
    let mut controller = device.controller(config);
    controller.run_pass_at(now).unwrap();

    let to_read = device.folder_id("To Read");
    let bucket = device.parent_of("art");
    let bucket_doc = device.listing().into_iter().find(|d| d.id == bucket).unwrap();
    assert_eq!(bucket_doc.parent, to_read);
    assert_eq!(bucket_doc.visible_name.len(), 4);

    // bucketed documents still count as "to read"
    let reports = controller.analyze_all(now + 10 * MINUTE_MS).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].location, Location::ToRead);
    assert_eq!(reports[0].next_role, None);
}

#[test]
fn test_reading_time_survives_restarts() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-to-read", "To Read", "");
    device.add_document("art", "example.com long read", "f-to-read", now - DAY_MS, now - 10 * DAY_MS);
    device.add_pages("art", 40, 0);

    device.controller(device.config()).run_pass_at(now).unwrap();

    // reopened four minutes later, then six more
    device.add_document("art", "example.com long read", "f-to-read", now - DAY_MS, now - 10 * DAY_MS + 4 * MINUTE_MS);
    let report = device.controller(device.config()).run_pass_at(now + MINUTE_MS).unwrap();
    assert_eq!(report.moved_to_read, 0);

    device.add_document("art", "example.com long read", "f-to-read", now - DAY_MS, now - 10 * DAY_MS + 10 * MINUTE_MS);
    let mut controller = device.controller(device.config());
    assert_eq!(controller.observations().get("art").unwrap().reading_time, 240);
    let report = controller.run_pass_at(now + 2 * MINUTE_MS).unwrap();

    assert_eq!(report.moved_to_read, 1);
    assert_eq!(controller.observations().get("art").unwrap().reading_time, 600);
}

#[test]
fn test_orphaned_observations_are_pruned() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_document("art", "example.com", "", now - DAY_MS, 0);

    device.controller(device.config()).run_pass_at(now).unwrap();
    std::fs::remove_file(device.store_dir().join("art.metadata")).unwrap();

    let mut controller = device.controller(device.config());
    assert!(controller.observations().get("art").is_some());
    let report = controller.run_pass_at(now + MINUTE_MS).unwrap();

    assert_eq!(report.pruned, 1);
    assert!(ObservationStore::open(device.state_file()).get("art").is_none());
}

#[test]
fn test_unreadable_metadata_keeps_its_observations() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-to-read", "To Read", "");
    device.add_document("art", "example.com long read", "f-to-read", now - DAY_MS, now - 10 * DAY_MS);
    device.add_pages("art", 40, 0);
    device.controller(device.config()).run_pass_at(now).unwrap();

    device.add_document("art", "example.com long read", "f-to-read", now - DAY_MS, now - 10 * DAY_MS + 4 * MINUTE_MS);
    device.controller(device.config()).run_pass_at(now + MINUTE_MS).unwrap();

    // the device is halfway through rewriting the metadata
    write(&device.store_dir().join("art.metadata"), r#"{"type": "Docu"#);
    let mut controller = device.controller(device.config());
    let report = controller.run_pass_at(now + 2 * MINUTE_MS).unwrap();

    assert_eq!(report.pruned, 0);
    let record = ObservationStore::open(device.state_file()).get("art").cloned();
    assert_eq!(record.map(|r| r.reading_time), Some(240));
}

#[test]
fn test_trashed_role_folder_is_replaced() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_folder("f-trashed", "To Read", "trash");
    device.add_document("art", "example.com", "", now - 10 * MINUTE_MS, 0);

    let report = device.controller(device.config()).run_pass_at(now).unwrap();

    assert_eq!(report.processed, 1);
    let fresh: Vec<_> = device
        .folders_named("To Read")
        .into_iter()
        .filter(|f| f.parent.is_empty())
        .collect();
    assert_eq!(fresh.len(), 1);
    assert_ne!(fresh[0].id, "f-trashed");
    assert_eq!(device.parent_of("art"), fresh[0].id);
}

#[test]
fn test_null_parent_is_treated_as_root() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    let metadata = json!({
        "type": "DocumentType",
        "visibleName": "example.com",
        "parent": null,
        "lastModified": (now - DAY_MS).to_string(),
    });
    write(&device.store_dir().join("art.metadata"), &metadata.to_string());

    let report = device.controller(device.config()).run_pass_at(now).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(device.parent_of("art"), device.folder_id("To Read"));
}

#[test]
fn test_analyze_is_read_only() {
    let device = Device::new();
    let now = rm_triage::now_millis();
    device.add_document("art", "example.com", "", now - DAY_MS, now - DAY_MS / 2);
    device.add_pages("art", 8, 0);

    let controller = device.controller(device.config());
    let reports = controller.analyze_all(now).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].location, Location::Root);
    assert_eq!(reports[0].analysis.pages_read, 2);
    assert_eq!(reports[0].next_role, Some(rm_triage::triage::FolderRole::ToRead));

    assert!(device.folders_named("To Read").is_empty());
    assert_eq!(device.parent_of("art"), "");
    assert!(!device.state_file().exists());
}

#[test]
fn test_missing_store_fails_the_pass() {
    let device = Device::new();
    let mut config = device.config();
    config.store_dir = device.dir.path().join("absent");

    let mut controller = TriageController::new(
        XochitlStore::new(&config.store_dir),
        config,
        ObservationStore::open(device.state_file()),
    );
    assert!(controller.run_pass().is_err());
}
