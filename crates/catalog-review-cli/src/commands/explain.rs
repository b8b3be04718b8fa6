use catalog_review_core::error::ReviewError;
use catalog_review_core::preview::classify_load_error;

pub fn run(message: &str) -> Result<(), ReviewError> {
    let kind = classify_load_error(message);
    println!("{kind:?}: {kind}");
    Ok(())
}
