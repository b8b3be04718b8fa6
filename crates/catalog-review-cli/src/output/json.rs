use catalog_review_core::error::ReviewError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), ReviewError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
