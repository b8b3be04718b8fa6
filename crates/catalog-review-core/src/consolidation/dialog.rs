use crate::error::ReviewError;
use crate::model::{ConsolidationAction, ConsolidationConflict, Product, ReviewProduct, SpecEntry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of specs shown per product in the comparison.
pub const LEADING_SPECS: usize = 3;

/// Short description of one side of a conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub description: String,
    pub specs: Vec<SpecEntry>,
    pub sources: String,
}

impl ProductSummary {
    pub fn of_existing(product: &Product) -> Self {
        let snapshot = product
            .catalog_sources
            .iter()
            .chain(&product.price_list_sources)
            .chain(&product.drawing_sources)
            .find_map(|s| s.snapshot());

        let (description, specs) = match snapshot {
            Some(s) => (
                s.description.clone().unwrap_or_default(),
                s.specs
                    .iter()
                    .take(LEADING_SPECS)
                    .map(|(k, v)| SpecEntry::new(k.clone(), v.clone()))
                    .collect(),
            ),
            None => (String::new(), Vec::new()),
        };

        ProductSummary {
            description,
            specs,
            sources: format!(
                "{} catalog, {} price list, {} drawing",
                product.catalog_sources.len(),
                product.price_list_sources.len(),
                product.drawing_sources.len()
            ),
        }
    }

    pub fn of_incoming(row: &ReviewProduct) -> Self {
        ProductSummary {
            description: row.description.clone(),
            specs: row
                .specs
                .iter()
                .filter(|s| !s.key.trim().is_empty())
                .take(LEADING_SPECS)
                .cloned()
                .collect(),
            sources: "this catalog".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictView {
    pub ordering_number: String,
    pub existing: ProductSummary,
    pub incoming: ProductSummary,
    pub action: Option<ConsolidationAction>,
}

/// Confirmation step listing every conflict. Confirming needs a choice
/// for each one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationDialog {
    conflicts: Vec<ConsolidationConflict>,
}

impl ConsolidationDialog {
    pub fn new(conflicts: Vec<ConsolidationConflict>) -> Self {
        ConsolidationDialog { conflicts }
    }

    pub fn conflicts(&self) -> &[ConsolidationConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn entries(&self) -> Vec<ConflictView> {
        self.conflicts
            .iter()
            .map(|c| ConflictView {
                ordering_number: c.ordering_number.clone(),
                existing: ProductSummary::of_existing(&c.existing),
                incoming: ProductSummary::of_incoming(&c.incoming),
                action: c.action,
            })
            .collect()
    }

    pub fn choose(
        &mut self,
        ordering_number: &str,
        action: ConsolidationAction,
    ) -> Result<(), ReviewError> {
        let conflict = self
            .conflicts
            .iter_mut()
            .find(|c| c.ordering_number == ordering_number)
            .ok_or_else(|| {
                ReviewError::Validation(format!("no conflict for ordering number '{ordering_number}'"))
            })?;
        conflict.action = Some(action);
        Ok(())
    }

    /// Apply `action` to every conflict still without a choice.
    pub fn choose_remaining(&mut self, action: ConsolidationAction) {
        for c in self.conflicts.iter_mut().filter(|c| c.action.is_none()) {
            c.action = Some(action);
        }
    }

    pub fn unresolved_count(&self) -> usize {
        self.conflicts.iter().filter(|c| c.action.is_none()).count()
    }

    /// Whether the confirm control is enabled.
    pub fn can_confirm(&self) -> bool {
        self.unresolved_count() == 0
    }

    pub fn confirm(&self) -> Result<BTreeMap<String, ConsolidationAction>, ReviewError> {
        let count = self.unresolved_count();
        if count > 0 {
            return Err(ReviewError::ConsolidationUnresolved { count });
        }
        Ok(self
            .conflicts
            .iter()
            .filter_map(|c| c.action.map(|a| (c.ordering_number.clone(), a)))
            .collect())
    }
}
