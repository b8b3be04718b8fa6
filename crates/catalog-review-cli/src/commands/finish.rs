use catalog_review_core::error::ReviewError;
use catalog_review_core::model::ConsolidationAction;
use catalog_review_core::review::{FinishOutcome, FinishSummary};
use catalog_review_core::ReviewConfig;
use std::path::Path;

use crate::output;

pub fn run(
    store: Option<&Path>,
    file_id: &str,
    yes: bool,
    keep: &[String],
    replace: &[String],
    output_format: &str,
) -> Result<(), ReviewError> {
    if let Some(both) = keep.iter().find(|k| replace.contains(*k)) {
        return Err(ReviewError::Validation(format!(
            "'{both}' is listed under both --keep and --replace"
        )));
    }

    let config = ReviewConfig::from_env()?;
    let service = super::backend(store, &config)?;
    let mut session = super::load_session(service.as_ref(), file_id)?;

    let summary = match session.finish_review(service.as_ref(), yes)? {
        FinishOutcome::Completed(summary) => summary,
        FinishOutcome::NeedsConfirmation { unreviewed } => {
            return Err(ReviewError::Validation(format!(
                "{unreviewed} product(s) are not reviewed and will be skipped; rerun with --yes to continue"
            )));
        }
        FinishOutcome::AwaitingConsolidation { .. } => {
            let Some(dialog) = session.consolidation_mut() else {
                return Err(ReviewError::Validation("consolidation was not opened".into()));
            };
            for number in keep {
                dialog.choose(number, ConsolidationAction::Keep)?;
            }
            for number in replace {
                dialog.choose(number, ConsolidationAction::Replace)?;
            }
            if !dialog.can_confirm() {
                let entries = dialog.entries();
                match output_format {
                    "json" => output::json::print(&entries)?,
                    _ => output::table::print_conflicts(&entries),
                }
                return Err(ReviewError::ConsolidationUnresolved {
                    count: dialog.unresolved_count(),
                });
            }
            session.complete_consolidation(service.as_ref())?
        }
    };

    print_summary(&summary, output_format)
}

fn print_summary(summary: &FinishSummary, output_format: &str) -> Result<(), ReviewError> {
    match output_format {
        "json" => output::json::print(summary)?,
        _ => output::table::print_finish(summary),
    }
    Ok(())
}
