use crate::consolidation::{self, ConsolidationDialog, IncomingProduct, MergePlan};
use crate::error::{FinishStage, ReviewError};
use crate::model::{ConsolidationAction, Product};
use crate::review::session::{ReviewPhase, ReviewSession};
use crate::service::CatalogService;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Work held while the consolidation dialog is open.
#[derive(Debug, Clone)]
pub struct PendingFinish {
    incoming: Vec<IncomingProduct>,
    existing: BTreeMap<String, Product>,
    dialog: ConsolidationDialog,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinishSummary {
    pub created: usize,
    pub appended: usize,
    pub replaced: usize,
    pub kept: usize,
    /// Rows left out because they were never marked reviewed.
    pub skipped_unreviewed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Some rows are still pending; call again with confirmation to go on.
    NeedsConfirmation { unreviewed: usize },
    /// Existing products collide; resolve them in [`ReviewSession::consolidation_mut`].
    AwaitingConsolidation { conflicts: usize },
    Completed(FinishSummary),
}

fn stage_error(stage: FinishStage, e: ReviewError) -> ReviewError {
    ReviewError::Finalize {
        stage,
        reason: e.to_string(),
    }
}

impl ReviewSession {
    /// Run the finish-review sequence up to the first point that needs the
    /// user: the unreviewed-rows prompt or the consolidation dialog.
    pub fn finish_review(
        &mut self,
        service: &dyn CatalogService,
        confirm_unreviewed: bool,
    ) -> Result<FinishOutcome, ReviewError> {
        self.phase = ReviewPhase::FinishRequested;
        self.pending_finish = None;

        if self.has_unsaved_changes() {
            self.phase = ReviewPhase::SaveBeforeFinish;
            match self.save(service) {
                Ok(()) => {}
                Err(e @ ReviewError::Validation(_)) => {
                    self.phase = ReviewPhase::Editing;
                    return Err(e);
                }
                Err(e) => return Err(self.fail(stage_error(FinishStage::SavingChanges, e))),
            }
        }

        let unreviewed = self.unreviewed_count();
        if unreviewed > 0 && !confirm_unreviewed {
            self.phase = ReviewPhase::Ready;
            return Ok(FinishOutcome::NeedsConfirmation { unreviewed });
        }

        self.phase = ReviewPhase::CheckCollisions;
        let category = self
            .file_info
            .as_ref()
            .and_then(|f| f.product_category.as_deref());
        let incoming = consolidation::build_incoming(&self.file_id, category, &self.rows);

        let existing = if incoming.is_empty() {
            BTreeMap::new()
        } else {
            let numbers: Vec<String> = incoming
                .iter()
                .map(|i| i.product.ordering_number.clone())
                .collect();
            service
                .check_existing_products(&numbers)
                .map_err(|e| self.fail(stage_error(FinishStage::CheckingExisting, e)))?
        };

        let conflicts = consolidation::detect_conflicts(&self.file_id, &incoming, &existing);
        if !conflicts.is_empty() {
            let count = conflicts.len();
            info!(file_id = %self.file_id, conflicts = count, "waiting for consolidation choices");
            self.pending_finish = Some(PendingFinish {
                incoming,
                existing,
                dialog: ConsolidationDialog::new(conflicts),
            });
            self.phase = ReviewPhase::AwaitingConsolidation;
            return Ok(FinishOutcome::AwaitingConsolidation { conflicts: count });
        }

        let summary = self.finalize(service, &incoming, &existing, &BTreeMap::new())?;
        Ok(FinishOutcome::Completed(summary))
    }

    pub fn consolidation(&self) -> Option<&ConsolidationDialog> {
        self.pending_finish.as_ref().map(|p| &p.dialog)
    }

    pub fn consolidation_mut(&mut self) -> Option<&mut ConsolidationDialog> {
        self.pending_finish.as_mut().map(|p| &mut p.dialog)
    }

    /// Finish after every conflict has a choice. The dialog stays open
    /// when a backend call fails so the user can retry.
    pub fn complete_consolidation(
        &mut self,
        service: &dyn CatalogService,
    ) -> Result<FinishSummary, ReviewError> {
        let pending = self
            .pending_finish
            .as_ref()
            .ok_or_else(|| ReviewError::Validation("no consolidation in progress".into()))?;
        let resolutions = pending.dialog.confirm()?;
        let incoming = pending.incoming.clone();
        let existing = pending.existing.clone();

        let summary = self.finalize(service, &incoming, &existing, &resolutions)?;
        self.pending_finish = None;
        Ok(summary)
    }

    pub fn cancel_consolidation(&mut self) {
        if self.pending_finish.take().is_some() {
            info!(file_id = %self.file_id, "consolidation cancelled");
        }
        self.phase = ReviewPhase::Ready;
    }

    fn finalize(
        &mut self,
        service: &dyn CatalogService,
        incoming: &[IncomingProduct],
        existing: &BTreeMap<String, Product>,
        resolutions: &BTreeMap<String, ConsolidationAction>,
    ) -> Result<FinishSummary, ReviewError> {
        self.phase = ReviewPhase::Finalizing;
        let plan = consolidation::merge(&self.file_id, incoming, existing, resolutions)?;
        self.write_plan(service, &plan).map_err(|e| self.fail(e))?;

        self.phase = ReviewPhase::Done;
        let summary = FinishSummary {
            created: plan.created,
            appended: plan.appended,
            replaced: plan.replaced,
            kept: plan.kept,
            skipped_unreviewed: self.unreviewed_count(),
        };
        info!(
            file_id = %self.file_id,
            created = summary.created,
            appended = summary.appended,
            replaced = summary.replaced,
            kept = summary.kept,
            "review completed"
        );
        Ok(summary)
    }

    fn write_plan(&self, service: &dyn CatalogService, plan: &MergePlan) -> Result<(), ReviewError> {
        if !plan.products.is_empty() {
            service
                .save_products(&plan.products)
                .map_err(|e| stage_error(FinishStage::SavingProducts, e))?;
        }
        service
            .complete_file_review(&self.file_id)
            .map_err(|e| stage_error(FinishStage::Completing, e))
    }

    fn fail(&mut self, e: ReviewError) -> ReviewError {
        warn!(file_id = %self.file_id, error = %e, "finish review failed");
        self.phase = ReviewPhase::FinalizeError(e.to_string());
        e
    }
}
