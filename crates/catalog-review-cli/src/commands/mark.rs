use catalog_review_core::error::ReviewError;
use catalog_review_core::ReviewConfig;
use std::path::Path;

pub fn run(
    store: Option<&Path>,
    file_id: &str,
    all: bool,
    rows: &[String],
    reviewed: bool,
) -> Result<(), ReviewError> {
    if !all && rows.is_empty() {
        return Err(ReviewError::Validation(
            "nothing to mark: pass --all or at least one --row".into(),
        ));
    }

    let config = ReviewConfig::from_env()?;
    let service = super::backend(store, &config)?;
    let mut session = super::load_session(service.as_ref(), file_id)?;

    let changed = if all {
        session.mark_all(reviewed)
    } else {
        session.mark_rows(rows, reviewed)?
    };

    if session.has_unsaved_changes() {
        session.save(service.as_ref())?;
    }

    let state = if reviewed { "reviewed" } else { "pending" };
    println!(
        "Marked {changed} product(s) {state}; {} of {} reviewed.",
        session.reviewed_count(),
        session.rows().len()
    );
    Ok(())
}
