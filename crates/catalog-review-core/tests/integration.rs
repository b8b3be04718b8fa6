//! Integration tests for the review workflow end to end.
//!
//! Uses a MockService that records every backend call and can be told to
//! fail specific ones, and a MockTextLayers that returns pre-built layers
//! without invoking pdftotext.

use catalog_review_core::error::{FinishStage, ReviewError};
use catalog_review_core::model::{
    CatalogProduct, CatalogProducts, ConsolidationAction, FileInfo, Product, ProductSource,
    ReviewStatus,
};
use catalog_review_core::preview::text_layer::{TextLayer, TextLayerSource, TextSpan};
use catalog_review_core::preview::{
    LoadErrorKind, LoadStatus, PreviewDialog, PreviewOptions, PreviewSource, PreviewTarget,
    ScrollLockHost, ScrollRequest,
};
use catalog_review_core::review::{
    FinishOutcome, NavigationDecision, NavigationIntent, ReviewPhase, RowField, UnsavedChoice,
};
use catalog_review_core::service::cache::DownloadUrlCache;
use catalog_review_core::service::local::{LocalCatalogService, LocalStore, StoredFile};
use catalog_review_core::service::CatalogService;
use catalog_review_core::{load_preview, load_preview_bytes, ReviewSession};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct MockService {
    products: Vec<CatalogProduct>,
    existing: BTreeMap<String, Product>,
    fail: Mutex<Vec<&'static str>>,
    calls: Mutex<Vec<String>>,
    saved: Mutex<Vec<Product>>,
}

impl MockService {
    fn failing(&self, call: &'static str) {
        self.fail.lock().unwrap().push(call);
    }

    fn recover(&self) {
        self.fail.lock().unwrap().clear();
    }

    fn record(&self, call: &str) -> Result<(), ReviewError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.fail.lock().unwrap().iter().any(|f| *f == call) {
            return Err(ReviewError::Api {
                status: 503,
                message: format!("{call} unavailable"),
            });
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CatalogService for MockService {
    fn fetch_download_url(&self, key: &str) -> Result<String, ReviewError> {
        self.record("fetch_download_url")?;
        Ok(format!("https://files.test/{key}"))
    }

    fn fetch_catalog_products(&self, _file_id: &str) -> Result<CatalogProducts, ReviewError> {
        self.record("fetch_catalog_products")?;
        Ok(CatalogProducts {
            products: self.products.clone(),
            source_file: None,
        })
    }

    fn update_catalog_products(
        &self,
        _file_id: &str,
        _products: &[CatalogProduct],
    ) -> Result<(), ReviewError> {
        self.record("update_catalog_products")
    }

    fn fetch_file_info(&self, _file_id: &str) -> Result<FileInfo, ReviewError> {
        self.record("fetch_file_info")?;
        Ok(FileInfo {
            file_name: "fittings-2024.pdf".into(),
            display_name: Some("Fittings 2024".into()),
            product_category: Some("fittings".into()),
        })
    }

    fn complete_file_review(&self, _file_id: &str) -> Result<(), ReviewError> {
        self.record("complete_file_review")
    }

    fn check_existing_products(
        &self,
        ordering_numbers: &[String],
    ) -> Result<BTreeMap<String, Product>, ReviewError> {
        self.record("check_existing_products")?;
        let saved = self.saved.lock().unwrap();
        Ok(ordering_numbers
            .iter()
            .filter_map(|n| {
                let latest = saved.iter().rev().find(|p| &p.ordering_number == n);
                latest
                    .or_else(|| self.existing.get(n))
                    .map(|p| (n.clone(), p.clone()))
            })
            .collect())
    }

    fn save_products(&self, products: &[Product]) -> Result<(), ReviewError> {
        self.record("save_products")?;
        self.saved.lock().unwrap().extend(products.iter().cloned());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn product(id: &str, ordering_number: &str, status: ReviewStatus) -> CatalogProduct {
    CatalogProduct {
        id: id.into(),
        ordering_number: ordering_number.into(),
        description: Some(format!("{ordering_number} fitting")),
        manual_notes: None,
        specs: None,
        location: None,
        status,
        table_index: Some(0),
    }
}

fn with_catalog_source(number: &str) -> Product {
    let mut p = Product::new(number);
    p.catalog_sources
        .push(ProductSource::pointer("fittings-2021", "row-7"));
    p
}

fn loaded(service: &MockService) -> ReviewSession {
    let mut session = ReviewSession::new("file-1");
    session.load(service).unwrap();
    session
}

// ---------------------------------------------------------------------------
// Finish review
// ---------------------------------------------------------------------------
#[test]
fn existing_catalog_product_blocks_completion_until_resolved() {
    let service = MockService {
        products: vec![product("a", "X-100", ReviewStatus::Reviewed)],
        existing: [("X-100".to_string(), with_catalog_source("X-100"))]
            .into_iter()
            .collect(),
        ..Default::default()
    };
    let mut session = loaded(&service);

    let outcome = session.finish_review(&service, false).unwrap();
    assert_eq!(outcome, FinishOutcome::AwaitingConsolidation { conflicts: 1 });
    assert!(!service.calls().contains(&"complete_file_review".to_string()));

    let dialog = session.consolidation_mut().unwrap();
    assert_eq!(dialog.len(), 1);
    assert!(!dialog.can_confirm());
    assert!(session.complete_consolidation(&service).is_err());
    assert!(!service.calls().contains(&"save_products".to_string()));

    session
        .consolidation_mut()
        .unwrap()
        .choose("X-100", ConsolidationAction::Replace)
        .unwrap();
    let summary = session.complete_consolidation(&service).unwrap();
    assert_eq!(summary.replaced, 1);
    assert_eq!(session.phase(), &ReviewPhase::Done);

    let saved = service.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].catalog_sources,
        vec![ProductSource::pointer("file-1", "a")]
    );
    assert_eq!(saved[0].category.as_deref(), Some("fittings"));
}

#[test]
fn price_list_only_product_is_not_a_conflict() {
    let mut priced = Product::new("Y-200");
    priced
        .price_list_sources
        .push(ProductSource::pointer("prices-2024", "pl-3"));
    let service = MockService {
        products: vec![product("a", "Y-200", ReviewStatus::Reviewed)],
        existing: [("Y-200".to_string(), priced)].into_iter().collect(),
        ..Default::default()
    };
    let mut session = loaded(&service);

    let FinishOutcome::Completed(summary) = session.finish_review(&service, false).unwrap() else {
        panic!("expected the review to complete");
    };
    assert_eq!(summary.appended, 1);
    let saved = service.saved.lock().unwrap();
    assert_eq!(saved[0].price_list_sources.len(), 1);
    assert_eq!(saved[0].catalog_sources.len(), 1);
}

#[test]
fn finish_runs_steps_in_order() {
    let service = MockService {
        products: vec![product("a", "Z-1", ReviewStatus::Pending)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    session.toggle_reviewed("a").unwrap();
    session.finish_review(&service, false).unwrap();

    assert_eq!(
        service.calls()[2..],
        [
            "update_catalog_products",
            "check_existing_products",
            "save_products",
            "complete_file_review",
        ]
    );
}

#[test]
fn failed_check_leaves_session_retryable() {
    let service = MockService {
        products: vec![product("a", "Z-1", ReviewStatus::Reviewed)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    service.failing("check_existing_products");

    let err = session.finish_review(&service, false).unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Finalize {
            stage: FinishStage::CheckingExisting,
            ..
        }
    ));
    assert!(matches!(session.phase(), ReviewPhase::FinalizeError(_)));

    service.recover();
    assert!(matches!(
        session.finish_review(&service, false).unwrap(),
        FinishOutcome::Completed(_)
    ));
}

#[test]
fn failed_save_before_finish_halts_sequence() {
    let service = MockService {
        products: vec![product("a", "Z-1", ReviewStatus::Pending)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    session.toggle_reviewed("a").unwrap();
    service.failing("update_catalog_products");

    let err = session.finish_review(&service, false).unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Finalize {
            stage: FinishStage::SavingChanges,
            ..
        }
    ));
    assert!(!service.calls().contains(&"check_existing_products".to_string()));
    assert!(session.has_unsaved_changes());
}

#[test]
fn failed_completion_reports_stage() {
    let service = MockService {
        products: vec![product("a", "Z-1", ReviewStatus::Reviewed)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    service.failing("complete_file_review");
    assert!(matches!(
        session.finish_review(&service, false),
        Err(ReviewError::Finalize {
            stage: FinishStage::Completing,
            ..
        })
    ));
}

#[test]
fn retry_after_failed_completion_finishes_without_self_conflict() {
    let service = MockService {
        products: vec![product("a", "Z-1", ReviewStatus::Reviewed)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    service.failing("complete_file_review");
    assert!(session.finish_review(&service, false).is_err());
    assert_eq!(service.saved.lock().unwrap().len(), 1);

    service.recover();
    let FinishOutcome::Completed(summary) = session.finish_review(&service, false).unwrap() else {
        panic!("retry should complete without a consolidation prompt");
    };
    assert_eq!(summary.appended, 1);
    let saved = service.saved.lock().unwrap();
    assert_eq!(
        saved.last().unwrap().catalog_sources,
        vec![ProductSource::pointer("file-1", "a")]
    );
}

// ---------------------------------------------------------------------------
// Editing, saving and navigation
// ---------------------------------------------------------------------------
#[test]
fn save_failure_keeps_edits_and_blocks_navigation() {
    let service = MockService {
        products: vec![product("a", "A-1", ReviewStatus::Pending)],
        ..Default::default()
    };
    let mut session = loaded(&service);
    assert_eq!(session.title(), "Fittings 2024");

    session
        .set_field("a", RowField::Description, "Elbow 90 DN50")
        .unwrap();
    service.failing("update_catalog_products");
    assert!(matches!(session.save(&service), Err(ReviewError::Save(_))));
    assert_eq!(session.row("a").unwrap().description, "Elbow 90 DN50");

    let NavigationDecision::Blocked(pending) = session.request_navigation(NavigationIntent::Back)
    else {
        panic!("expected navigation to be blocked");
    };
    assert!(session
        .resolve_navigation(pending.clone(), UnsavedChoice::SaveAndContinue, &service)
        .is_err());
    assert!(session.has_unsaved_changes());

    service.recover();
    let go = session
        .resolve_navigation(pending, UnsavedChoice::SaveAndContinue, &service)
        .unwrap();
    assert_eq!(go, Some(NavigationIntent::Back));
    assert!(!session.has_unsaved_changes());
}

#[test]
fn pushed_products_survive_fetch_failure() {
    let service = MockService::default();
    service.failing("fetch_catalog_products");
    let mut session =
        ReviewSession::with_pushed("file-1", vec![product("a", "A-1", ReviewStatus::Pending)]);
    session.load(&service).unwrap();
    assert_eq!(session.rows().len(), 1);
    assert_eq!(session.phase(), &ReviewPhase::Ready);
}

// ---------------------------------------------------------------------------
// Local store
// ---------------------------------------------------------------------------
#[test]
fn local_store_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut store = LocalStore::default();
    store.files.insert(
        "file-1".into(),
        StoredFile {
            info: FileInfo {
                file_name: "fittings.pdf".into(),
                display_name: None,
                product_category: None,
            },
            products: vec![product("a", "A-1", ReviewStatus::Pending)],
            ..Default::default()
        },
    );
    std::fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();

    let service = LocalCatalogService::open(&path).unwrap();
    let mut session = loaded_local(&service);
    session.toggle_reviewed("a").unwrap();
    session.finish_review(&service, false).unwrap();

    let reopened = LocalCatalogService::open(&path).unwrap();
    let on_disk = reopened.snapshot().unwrap();
    assert!(on_disk.files["file-1"].review_completed);
    assert_eq!(
        on_disk.files["file-1"].products[0].status,
        ReviewStatus::Reviewed
    );
    assert_eq!(
        on_disk.products["A-1"].catalog_sources,
        vec![ProductSource::pointer("file-1", "a")]
    );
}

fn loaded_local(service: &LocalCatalogService) -> ReviewSession {
    let mut session = ReviewSession::new("file-1");
    session.load(service).unwrap();
    session
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------
struct NoScroll;

impl ScrollLockHost for NoScroll {
    fn lock_scroll(&self) {}
    fn unlock_scroll(&self) {}
}

struct MockTextLayers {
    layers: Vec<TextLayer>,
}

impl TextLayerSource for MockTextLayers {
    fn text_layers(&self, _pdf_bytes: &[u8]) -> Result<Vec<TextLayer>, ReviewError> {
        Ok(self.layers.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn layer(page_number: u32, lines: &[&str]) -> TextLayer {
    TextLayer {
        page_number,
        width: 600.0,
        height: 800.0,
        spans: lines
            .iter()
            .enumerate()
            .map(|(i, text)| TextSpan {
                line_index: i,
                text: text.to_string(),
                x_min: 50.0,
                y_min: 100.0 + 20.0 * i as f64,
                x_max: 400.0,
                y_max: 114.0 + 20.0 * i as f64,
                highlighted: false,
            })
            .collect(),
    }
}

#[test]
fn preview_highlights_and_scrolls_once() {
    let extractor = MockTextLayers {
        layers: vec![
            layer(1, &["Contents", "Elbows"]),
            layer(2, &["Tees", "X-100 Tee DN50", "X-101 Tee DN65"]),
        ],
    };
    let mut dialog = PreviewDialog::open(
        PreviewSource::Url("/tmp/fittings.pdf".into()),
        PreviewOptions {
            initial_page: 2,
            target: PreviewTarget::Highlight("x-100".into()),
            product_id: Some("a".into()),
            container_width: 900.0,
            ..Default::default()
        },
        Arc::new(NoScroll),
    );
    load_preview_bytes(&mut dialog, b"%PDF-1.4\n", &extractor).unwrap();
    assert_eq!(dialog.status(), &LoadStatus::Ready { page_count: 2 });
    assert_eq!(dialog.current_page(), 2);

    let start = Instant::now();
    assert!(dialog.page_rendered(2, start).is_none());
    let request = dialog.poll_scroll(start + Duration::from_millis(60));
    assert!(matches!(
        request,
        Some(ScrollRequest::TextMatch {
            page: 2,
            line_index: 1,
            ..
        })
    ));

    dialog.page_rendered(2, start + Duration::from_millis(100));
    assert!(dialog
        .poll_scroll(start + Duration::from_millis(200))
        .is_none());
}

#[test]
fn preview_rejects_non_pdf_bytes() {
    let extractor = MockTextLayers { layers: vec![] };
    let mut dialog = PreviewDialog::open(
        PreviewSource::Url("/tmp/page.html".into()),
        PreviewOptions::default(),
        Arc::new(NoScroll),
    );
    assert!(load_preview_bytes(&mut dialog, b"<html></html>", &extractor).is_err());
    assert_eq!(
        dialog.error_message(),
        Some(LoadErrorKind::Corrupted.message())
    );
}

#[test]
fn preview_missing_storage_key_is_not_found() {
    let service = LocalCatalogService::in_memory(LocalStore::default());
    let urls = DownloadUrlCache::new(Duration::from_secs(300));
    let mut dialog = PreviewDialog::open(
        PreviewSource::StorageKey("uploads/gone.pdf".into()),
        PreviewOptions::default(),
        Arc::new(NoScroll),
    );
    load_preview(
        &mut dialog,
        None,
        &service,
        &urls,
        &MockTextLayers { layers: vec![] },
        Duration::from_secs(5),
    );
    assert!(matches!(
        dialog.status(),
        LoadStatus::Failed {
            kind: LoadErrorKind::NotFound,
            ..
        }
    ));
    assert_eq!(
        dialog.error_message(),
        Some("Document not found. It may have been moved or deleted.")
    );
}

#[test]
fn preview_unreachable_url_is_network_error() {
    let service = LocalCatalogService::in_memory(LocalStore::default());
    let urls = DownloadUrlCache::new(Duration::from_secs(300));
    let mut dialog = PreviewDialog::open(
        PreviewSource::Url("http://127.0.0.1:1/catalogs/2024-404.pdf".into()),
        PreviewOptions::default(),
        Arc::new(NoScroll),
    );
    load_preview(
        &mut dialog,
        None,
        &service,
        &urls,
        &MockTextLayers { layers: vec![] },
        Duration::from_secs(5),
    );
    assert!(matches!(
        dialog.status(),
        LoadStatus::Failed {
            kind: LoadErrorKind::Network,
            ..
        }
    ));
    assert_eq!(dialog.error_message(), Some(LoadErrorKind::Network.message()));
}
