use crate::error::ReviewError;
use crate::model::{CatalogProduct, FileInfo, ReviewProduct, SourceFile, SpecEntry};
use crate::review::finish::PendingFinish;
use crate::review::rows::{
    normalize_products, rows_from_snapshot, snapshot_of, to_catalog_product, validate_row, RowIds,
};
use crate::service::CatalogService;
use serde::Serialize;
use tracing::{info, warn};

/// Rows per table page.
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewPhase {
    Idle,
    Loading,
    Error(String),
    Ready,
    Editing,
    Saving,
    SaveError(String),
    FinishRequested,
    SaveBeforeFinish,
    CheckCollisions,
    AwaitingConsolidation,
    Finalizing,
    Done,
    FinalizeError(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFilter {
    #[default]
    All,
    Reviewed,
    Pending,
}

impl ReviewFilter {
    pub fn matches(&self, row: &ReviewProduct) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Reviewed => row.reviewed,
            ReviewFilter::Pending => !row.reviewed,
        }
    }
}

impl std::str::FromStr for ReviewFilter {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ReviewFilter::All),
            "reviewed" => Ok(ReviewFilter::Reviewed),
            "pending" => Ok(ReviewFilter::Pending),
            other => Err(ReviewError::Validation(format!("unknown filter '{other}'"))),
        }
    }
}

/// Plain text columns of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    OrderingNumber,
    Description,
    ManualNotes,
}

/// Open "remove this product?" confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalPrompt {
    pub row_id: String,
    pub ordering_number: String,
}

/// Editable state of one catalog file under review.
#[derive(Debug)]
pub struct ReviewSession {
    pub(crate) file_id: String,
    pub(crate) rows: Vec<ReviewProduct>,
    pub(crate) ids: RowIds,
    pub(crate) saved_snapshot: String,
    pub(crate) file_info: Option<FileInfo>,
    pub(crate) source_file: Option<SourceFile>,
    pub(crate) phase: ReviewPhase,
    pub(crate) filter: ReviewFilter,
    pub(crate) page: usize,
    pub(crate) pending_removal: Option<RemovalPrompt>,
    pub(crate) pending_finish: Option<PendingFinish>,
}

impl ReviewSession {
    pub fn new(file_id: impl Into<String>) -> Self {
        ReviewSession {
            file_id: file_id.into(),
            rows: Vec::new(),
            ids: RowIds::default(),
            saved_snapshot: snapshot_of(&[]),
            file_info: None,
            source_file: None,
            phase: ReviewPhase::Idle,
            filter: ReviewFilter::All,
            page: 0,
            pending_removal: None,
            pending_finish: None,
        }
    }

    /// Session seeded with products handed over by the previous screen.
    /// They are shown right away and count as saved.
    pub fn with_pushed(file_id: impl Into<String>, products: Vec<CatalogProduct>) -> Self {
        let mut session = ReviewSession::new(file_id);
        session.replace_rows(products);
        session.phase = ReviewPhase::Ready;
        session
    }

    fn replace_rows(&mut self, products: Vec<CatalogProduct>) {
        self.ids = RowIds::default();
        self.rows = normalize_products(products, &mut self.ids);
        self.saved_snapshot = snapshot_of(&self.rows);
        self.page = 0;
    }

    pub fn load(&mut self, service: &dyn CatalogService) -> Result<(), ReviewError> {
        self.phase = ReviewPhase::Loading;

        match service.fetch_catalog_products(&self.file_id) {
            Ok(fetched) => {
                info!(file_id = %self.file_id, products = fetched.products.len(), "loaded catalog products");
                self.replace_rows(fetched.products);
                self.source_file = fetched.source_file;
            }
            Err(e) if !self.rows.is_empty() => {
                warn!(file_id = %self.file_id, error = %e, "product fetch failed, keeping pushed products");
            }
            Err(e) => {
                self.phase = ReviewPhase::Error(e.to_string());
                return Err(e);
            }
        }

        match service.fetch_file_info(&self.file_id) {
            Ok(file_info) => self.file_info = Some(file_info),
            Err(e) => warn!(file_id = %self.file_id, error = %e, "file info unavailable"),
        }

        self.phase = ReviewPhase::Ready;
        Ok(())
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn phase(&self) -> &ReviewPhase {
        &self.phase
    }

    pub fn file_info(&self) -> Option<&FileInfo> {
        self.file_info.as_ref()
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn title(&self) -> &str {
        self.file_info
            .as_ref()
            .map(FileInfo::title)
            .unwrap_or(self.file_id.as_str())
    }

    pub fn rows(&self) -> &[ReviewProduct] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&ReviewProduct> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn filter(&self) -> ReviewFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ReviewFilter) {
        self.filter = filter;
        self.page = 0;
    }

    fn filtered(&self) -> impl Iterator<Item = &ReviewProduct> {
        let filter = self.filter;
        self.rows.iter().filter(move |r| filter.matches(r))
    }

    /// Number of table pages for the current filter, at least 1.
    pub fn page_count(&self) -> usize {
        self.filtered().count().div_ceil(PAGE_SIZE).max(1)
    }

    /// Zero-based page index.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn visible_rows(&self) -> Vec<&ReviewProduct> {
        let page = self.page.min(self.page_count() - 1);
        self.filtered()
            .skip(page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }

    pub fn unreviewed_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.reviewed).count()
    }

    pub fn reviewed_count(&self) -> usize {
        self.rows.len() - self.unreviewed_count()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        snapshot_of(&self.rows) != self.saved_snapshot
    }

    fn row_mut(&mut self, id: &str) -> Result<&mut ReviewProduct, ReviewError> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ReviewError::UnknownRow(id.to_string()))
    }

    fn edit_row<F>(&mut self, id: &str, f: F) -> Result<(), ReviewError>
    where
        F: FnOnce(&mut ReviewProduct) -> Result<(), ReviewError>,
    {
        let row = self.row_mut(id)?;
        f(row)?;
        row.saved = false;
        self.phase = ReviewPhase::Editing;
        Ok(())
    }

    pub fn set_field(&mut self, id: &str, field: RowField, value: &str) -> Result<(), ReviewError> {
        self.edit_row(id, |row| {
            let target = match field {
                RowField::OrderingNumber => &mut row.ordering_number,
                RowField::Description => &mut row.description,
                RowField::ManualNotes => &mut row.manual_notes,
            };
            *target = value.to_string();
            Ok(())
        })
    }

    pub fn add_spec(&mut self, id: &str) -> Result<(), ReviewError> {
        self.edit_row(id, |row| {
            row.specs.push(SpecEntry::new("", ""));
            Ok(())
        })
    }

    pub fn update_spec(
        &mut self,
        id: &str,
        index: usize,
        key: &str,
        value: &str,
    ) -> Result<(), ReviewError> {
        self.edit_row(id, |row| {
            let spec = row.specs.get_mut(index).ok_or_else(|| {
                ReviewError::Validation(format!("row '{}' has no spec #{index}", row.id))
            })?;
            spec.key = key.to_string();
            spec.value = value.to_string();
            Ok(())
        })
    }

    pub fn remove_spec(&mut self, id: &str, index: usize) -> Result<(), ReviewError> {
        self.edit_row(id, |row| {
            if index >= row.specs.len() {
                return Err(ReviewError::Validation(format!(
                    "row '{}' has no spec #{index}",
                    row.id
                )));
            }
            row.specs.remove(index);
            Ok(())
        })
    }

    pub fn set_reviewed(&mut self, id: &str, reviewed: bool) -> Result<(), ReviewError> {
        self.edit_row(id, |row| {
            row.reviewed = reviewed;
            Ok(())
        })
    }

    pub fn toggle_reviewed(&mut self, id: &str) -> Result<bool, ReviewError> {
        let reviewed = !self.row_mut(id)?.reviewed;
        self.set_reviewed(id, reviewed)?;
        Ok(reviewed)
    }

    /// Mark every row reviewed (or pending). Returns how many rows changed.
    pub fn mark_all(&mut self, reviewed: bool) -> usize {
        let mut changed = 0;
        for row in self.rows.iter_mut().filter(|r| r.reviewed != reviewed) {
            row.reviewed = reviewed;
            row.saved = false;
            changed += 1;
        }
        if changed > 0 {
            self.phase = ReviewPhase::Editing;
        }
        changed
    }

    /// Mark the named rows reviewed (or pending). Unknown ids are rejected
    /// before anything changes. Returns how many rows changed state.
    pub fn mark_rows(&mut self, ids: &[String], reviewed: bool) -> Result<usize, ReviewError> {
        if let Some(missing) = ids.iter().find(|id| self.row(id).is_none()) {
            return Err(ReviewError::UnknownRow(missing.clone()));
        }
        let mut changed = 0;
        for id in ids {
            if self.row(id).is_some_and(|r| r.reviewed != reviewed) {
                self.set_reviewed(id, reviewed)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Append an empty pending row and return its id.
    pub fn add_row(&mut self) -> String {
        let id = self.ids.fresh();
        self.rows.push(ReviewProduct::blank(id.clone()));
        self.phase = ReviewPhase::Editing;
        id
    }

    pub fn request_remove(&mut self, id: &str) -> Result<&RemovalPrompt, ReviewError> {
        let row = self
            .row(id)
            .ok_or_else(|| ReviewError::UnknownRow(id.to_string()))?;
        let prompt = RemovalPrompt {
            row_id: row.id.clone(),
            ordering_number: row.ordering_number.clone(),
        };
        Ok(self.pending_removal.insert(prompt))
    }

    pub fn pending_removal(&self) -> Option<&RemovalPrompt> {
        self.pending_removal.as_ref()
    }

    /// Remove the row named by the open prompt.
    pub fn confirm_remove(&mut self) -> Option<ReviewProduct> {
        let prompt = self.pending_removal.take()?;
        let index = self.rows.iter().position(|r| r.id == prompt.row_id)?;
        let removed = self.rows.remove(index);
        self.phase = ReviewPhase::Editing;
        self.set_page(self.page);
        Some(removed)
    }

    pub fn cancel_remove(&mut self) {
        self.pending_removal = None;
    }

    /// Write all rows to the backend.
    ///
    /// Rows are validated first; an invalid row aborts before any request.
    pub fn save(&mut self, service: &dyn CatalogService) -> Result<(), ReviewError> {
        for row in &self.rows {
            validate_row(row)?;
        }

        self.phase = ReviewPhase::Saving;
        let payload: Vec<CatalogProduct> = self.rows.iter().map(to_catalog_product).collect();
        match service.update_catalog_products(&self.file_id, &payload) {
            Ok(()) => {
                for row in &mut self.rows {
                    row.saved = true;
                }
                self.saved_snapshot = snapshot_of(&self.rows);
                self.phase = ReviewPhase::Ready;
                info!(file_id = %self.file_id, products = payload.len(), "saved catalog products");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(file_id = %self.file_id, error = %reason, "saving catalog products failed");
                self.phase = ReviewPhase::SaveError(reason.clone());
                Err(ReviewError::Save(reason))
            }
        }
    }

    /// Revert rows to the last saved snapshot.
    pub fn discard_changes(&mut self) -> Result<(), ReviewError> {
        self.rows = rows_from_snapshot(&self.saved_snapshot)?;
        for row in &self.rows {
            self.ids.reserve(&row.id);
        }
        self.pending_removal = None;
        self.set_page(self.page);
        self.phase = ReviewPhase::Ready;
        Ok(())
    }
}
