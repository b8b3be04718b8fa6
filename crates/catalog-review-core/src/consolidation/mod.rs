//! Reconciling reviewed catalog products with canonical products that
//! already exist under the same ordering number.

pub mod dialog;

use crate::error::ReviewError;
use crate::model::{ConsolidationAction, ConsolidationConflict, Product, ProductSource, ReviewProduct};
use std::collections::BTreeMap;
use tracing::debug;

pub use dialog::{ConflictView, ConsolidationDialog, ProductSummary};

/// A canonical record built from reviewed rows, with the row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingProduct {
    pub product: Product,
    /// First reviewed row carrying this ordering number.
    pub row: ReviewProduct,
}

/// Turn reviewed rows into pointer-style canonical products.
///
/// Rows sharing an ordering number collapse into one product holding one
/// catalog pointer per row. Unreviewed rows are skipped.
pub fn build_incoming(
    file_id: &str,
    category: Option<&str>,
    rows: &[ReviewProduct],
) -> Vec<IncomingProduct> {
    let mut out: Vec<IncomingProduct> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.reviewed) {
        let ordering_number = row.ordering_number.trim();
        if ordering_number.is_empty() {
            continue;
        }
        let pointer = ProductSource::pointer(file_id, row.id.clone());
        match index.get(ordering_number) {
            Some(&i) => out[i].product.catalog_sources.push(pointer),
            None => {
                let mut product = Product::new(ordering_number);
                product.category = category.map(str::to_string);
                product.catalog_sources.push(pointer);
                index.insert(ordering_number.to_string(), out.len());
                out.push(IncomingProduct {
                    product,
                    row: row.clone(),
                });
            }
        }
    }

    out
}

/// Collisions needing an explicit choice. Records without catalog data
/// are merged silently and never show up here, and neither are records
/// whose only catalog data came from `file_id` itself.
pub fn detect_conflicts(
    file_id: &str,
    incoming: &[IncomingProduct],
    existing: &BTreeMap<String, Product>,
) -> Vec<ConsolidationConflict> {
    incoming
        .iter()
        .filter_map(|inc| {
            let found = existing.get(&inc.product.ordering_number)?;
            if !found.has_catalog_data_from_other_files(file_id) {
                return None;
            }
            Some(ConsolidationConflict {
                ordering_number: inc.product.ordering_number.clone(),
                existing: found.clone(),
                incoming: inc.row.clone(),
                action: None,
            })
        })
        .collect()
}

/// Products to write plus what happened to each incoming record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub products: Vec<Product>,
    pub created: usize,
    pub appended: usize,
    pub replaced: usize,
    pub kept: usize,
}

/// Merge incoming records into what exists. Catalog pointers already
/// written for `file_id` by an earlier attempt are swapped for the new ones.
pub fn merge(
    file_id: &str,
    incoming: &[IncomingProduct],
    existing: &BTreeMap<String, Product>,
    resolutions: &BTreeMap<String, ConsolidationAction>,
) -> Result<MergePlan, ReviewError> {
    let mut plan = MergePlan::default();

    for inc in incoming {
        let number = &inc.product.ordering_number;
        let Some(current) = existing.get(number) else {
            plan.products.push(inc.product.clone());
            plan.created += 1;
            continue;
        };

        if !current.has_catalog_data_from_other_files(file_id) {
            let mut merged = current.clone();
            merged.catalog_sources.clear();
            merged
                .catalog_sources
                .extend(inc.product.catalog_sources.iter().cloned());
            if merged.category.is_none() {
                merged.category = inc.product.category.clone();
            }
            debug!(ordering_number = %number, "appending catalog pointer to existing product");
            plan.products.push(merged);
            plan.appended += 1;
            continue;
        }

        match resolutions.get(number) {
            Some(ConsolidationAction::Replace) => {
                let mut merged = current.clone();
                merged.catalog_sources = inc.product.catalog_sources.clone();
                if inc.product.category.is_some() {
                    merged.category = inc.product.category.clone();
                }
                plan.products.push(merged);
                plan.replaced += 1;
            }
            Some(ConsolidationAction::Keep) => plan.kept += 1,
            None => {
                return Err(ReviewError::ConsolidationUnresolved { count: 1 });
            }
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceSnapshot;

    fn reviewed(id: &str, ordering_number: &str) -> ReviewProduct {
        ReviewProduct {
            reviewed: true,
            ordering_number: ordering_number.into(),
            ..ReviewProduct::blank(id)
        }
    }

    fn with_catalog(number: &str) -> Product {
        let mut p = Product::new(number);
        p.catalog_sources.push(ProductSource::Resolved {
            source_file_id: "old".into(),
            snapshot: SourceSnapshot::default(),
        });
        p
    }

    fn price_list_only(number: &str) -> Product {
        let mut p = Product::new(number);
        p.price_list_sources
            .push(ProductSource::pointer("prices-2023", "pl-1"));
        p
    }

    #[test]
    fn test_build_incoming_groups_and_skips_unreviewed() {
        let mut pending = reviewed("r3", "B-2");
        pending.reviewed = false;
        let rows = vec![reviewed("r1", "A-1"), reviewed("r2", " A-1 "), pending];
        let inc = build_incoming("f1", Some("valves"), &rows);
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].product.catalog_sources.len(), 2);
        assert_eq!(inc[0].product.category.as_deref(), Some("valves"));
        assert_eq!(inc[0].row.id, "r1");
    }

    #[test]
    fn test_conflict_only_with_catalog_data() {
        let inc = build_incoming(
            "f1",
            None,
            &[reviewed("r1", "X-100"), reviewed("r2", "Y-200"), reviewed("r3", "Z-300")],
        );
        let existing: BTreeMap<String, Product> = [
            ("X-100".to_string(), with_catalog("X-100")),
            ("Y-200".to_string(), price_list_only("Y-200")),
        ]
        .into_iter()
        .collect();

        let conflicts = detect_conflicts("f1", &inc, &existing);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].ordering_number, "X-100");
        assert!(conflicts[0].action.is_none());
    }

    #[test]
    fn test_merge_rules() {
        let inc = build_incoming(
            "f1",
            Some("valves"),
            &[
                reviewed("r1", "X-100"),
                reviewed("r2", "Y-200"),
                reviewed("r3", "Z-300"),
                reviewed("r4", "K-400"),
            ],
        );
        let existing: BTreeMap<String, Product> = [
            ("X-100".to_string(), with_catalog("X-100")),
            ("Y-200".to_string(), price_list_only("Y-200")),
            ("K-400".to_string(), with_catalog("K-400")),
        ]
        .into_iter()
        .collect();
        let resolutions: BTreeMap<String, ConsolidationAction> = [
            ("X-100".to_string(), ConsolidationAction::Replace),
            ("K-400".to_string(), ConsolidationAction::Keep),
        ]
        .into_iter()
        .collect();

        let plan = merge("f1", &inc, &existing, &resolutions).unwrap();
        assert_eq!(
            (plan.created, plan.appended, plan.replaced, plan.kept),
            (1, 1, 1, 1)
        );
        assert_eq!(plan.products.len(), 3);

        let x = plan.products.iter().find(|p| p.ordering_number == "X-100").unwrap();
        assert_eq!(x.catalog_sources, vec![ProductSource::pointer("f1", "r1")]);
        assert_eq!(x.category.as_deref(), Some("valves"));

        let y = plan.products.iter().find(|p| p.ordering_number == "Y-200").unwrap();
        assert_eq!(y.price_list_sources.len(), 1);
        assert_eq!(y.catalog_sources.len(), 1);

        assert!(!plan.products.iter().any(|p| p.ordering_number == "K-400"));
    }

    #[test]
    fn test_merge_refuses_unresolved_conflict() {
        let inc = build_incoming("f1", None, &[reviewed("r1", "X-100")]);
        let existing: BTreeMap<String, Product> =
            [("X-100".to_string(), with_catalog("X-100"))].into_iter().collect();
        assert!(matches!(
            merge("f1", &inc, &existing, &BTreeMap::new()),
            Err(ReviewError::ConsolidationUnresolved { .. })
        ));
    }

    #[test]
    fn test_own_earlier_write_is_not_a_conflict() {
        let inc = build_incoming("f1", Some("valves"), &[reviewed("r1", "X-100")]);
        let mut written = Product::new("X-100");
        written.category = Some("valves".into());
        written
            .catalog_sources
            .push(ProductSource::pointer("f1", "r1"));
        let existing: BTreeMap<String, Product> =
            [("X-100".to_string(), written)].into_iter().collect();

        assert!(detect_conflicts("f1", &inc, &existing).is_empty());

        let plan = merge("f1", &inc, &existing, &BTreeMap::new()).unwrap();
        assert_eq!(plan.appended, 1);
        assert_eq!(
            plan.products[0].catalog_sources,
            vec![ProductSource::pointer("f1", "r1")]
        );
    }
}
