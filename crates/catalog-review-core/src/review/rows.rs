use crate::error::ReviewError;
use crate::model::{CatalogProduct, ReviewProduct, ReviewStatus, SpecEntry};
use std::collections::{BTreeMap, HashSet};

/// Hands out row ids that never collide with ids already in the session.
#[derive(Debug, Clone, Default)]
pub struct RowIds {
    used: HashSet<String>,
    next: u64,
}

impl RowIds {
    pub fn reserve(&mut self, id: &str) -> bool {
        self.used.insert(id.to_string())
    }

    pub fn fresh(&mut self) -> String {
        loop {
            self.next += 1;
            let candidate = format!("row-{}", self.next);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Convert fetched products into editable rows.
///
/// Blank and duplicate ids are replaced by fresh ones; the first holder of
/// an id keeps it.
pub fn normalize_products(products: Vec<CatalogProduct>, ids: &mut RowIds) -> Vec<ReviewProduct> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(products.len());
    for p in &products {
        let id = p.id.trim();
        keep.push(!id.is_empty() && taken.insert(id.to_string()));
    }
    for id in &taken {
        ids.reserve(id);
    }

    products
        .into_iter()
        .zip(keep)
        .map(|(p, keep_id)| {
            let id = if keep_id {
                p.id.trim().to_string()
            } else {
                ids.fresh()
            };
            to_review_product(p, id)
        })
        .collect()
}

fn to_review_product(p: CatalogProduct, id: String) -> ReviewProduct {
    ReviewProduct {
        id,
        ordering_number: p.ordering_number,
        description: p.description.unwrap_or_default(),
        manual_notes: p.manual_notes.unwrap_or_default(),
        specs: p
            .specs
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| SpecEntry { key, value })
            .collect(),
        location: p.location,
        table_index: p.table_index,
        reviewed: p.status == ReviewStatus::Reviewed,
        saved: true,
    }
}

/// Check a row before it is written to the backend.
pub fn validate_row(row: &ReviewProduct) -> Result<(), ReviewError> {
    if row.ordering_number.trim().is_empty() {
        return Err(ReviewError::Validation(format!(
            "row '{}' has no ordering number",
            row.id
        )));
    }

    let mut keys = HashSet::new();
    for spec in &row.specs {
        let key = spec.key.trim();
        if key.is_empty() {
            if spec.value.trim().is_empty() {
                continue;
            }
            return Err(ReviewError::Validation(format!(
                "product '{}' has a spec value '{}' without a name",
                row.ordering_number, spec.value
            )));
        }
        if !keys.insert(key.to_lowercase()) {
            return Err(ReviewError::Validation(format!(
                "product '{}' lists spec '{}' more than once",
                row.ordering_number, key
            )));
        }
    }

    if let Some(loc) = &row.location {
        if loc.page == 0 {
            return Err(ReviewError::Validation(format!(
                "product '{}' points at page 0",
                row.ordering_number
            )));
        }
    }

    Ok(())
}

/// Wire form of a row. Blank spec entries are dropped.
pub fn to_catalog_product(row: &ReviewProduct) -> CatalogProduct {
    let specs: BTreeMap<String, String> = row
        .specs
        .iter()
        .filter(|s| !s.key.trim().is_empty())
        .map(|s| (s.key.trim().to_string(), s.value.trim().to_string()))
        .collect();

    CatalogProduct {
        id: row.id.clone(),
        ordering_number: row.ordering_number.trim().to_string(),
        description: Some(row.description.clone()).filter(|d| !d.trim().is_empty()),
        manual_notes: Some(row.manual_notes.clone()).filter(|n| !n.trim().is_empty()),
        specs: Some(specs).filter(|s| !s.is_empty()),
        location: row.location,
        status: if row.reviewed {
            ReviewStatus::Reviewed
        } else {
            ReviewStatus::Pending
        },
        table_index: row.table_index,
    }
}

/// Serialized form of the rows used to detect unsaved edits. The `saved`
/// flag is left out so that marking rows saved does not change it.
pub fn snapshot_of(rows: &[ReviewProduct]) -> String {
    let normalized: Vec<ReviewProduct> = rows
        .iter()
        .map(|r| ReviewProduct {
            saved: true,
            ..r.clone()
        })
        .collect();
    serde_json::to_string(&normalized).unwrap_or_default()
}

/// Rows as they were when the snapshot was taken.
pub fn rows_from_snapshot(snapshot: &str) -> Result<Vec<ReviewProduct>, ReviewError> {
    if snapshot.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(snapshot)?)
}
