use catalog_review_core::error::ReviewError;
use catalog_review_core::review::ReviewFilter;
use catalog_review_core::ReviewConfig;
use std::path::Path;

use crate::output;

pub fn run(
    store: Option<&Path>,
    file_id: &str,
    filter: &str,
    page: usize,
    output_format: &str,
) -> Result<(), ReviewError> {
    let filter: ReviewFilter = filter.parse()?;
    let config = ReviewConfig::from_env()?;
    let service = super::backend(store, &config)?;

    let mut session = super::load_session(service.as_ref(), file_id)?;
    session.set_filter(filter);
    session.set_page(page.saturating_sub(1));

    match output_format {
        "json" => output::json::print(&session.visible_rows())?,
        _ => output::table::print_products(&session),
    }

    Ok(())
}
