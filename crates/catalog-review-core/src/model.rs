use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Reviewed,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// Rectangle in page-relative units (0.0..=1.0), origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Convert an absolute box (PDF points) into page fractions.
    pub fn from_absolute(
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
        page_width: f64,
        page_height: f64,
    ) -> Option<BoundingBox> {
        if page_width <= 0.0 || page_height <= 0.0 {
            return None;
        }
        Some(BoundingBox {
            x: (x_min / page_width).clamp(0.0, 1.0),
            y: (y_min / page_height).clamp(0.0, 1.0),
            width: ((x_max - x_min) / page_width).clamp(0.0, 1.0),
            height: ((y_max - y_min) / page_height).clamp(0.0, 1.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductLocation {
    /// 1-based page number.
    pub page: u32,
    pub bbox: BoundingBox,
}

/// A product record as extracted from a scanned catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    #[serde(default)]
    pub id: String,
    pub ordering_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ProductLocation>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEntry {
    pub key: String,
    pub value: String,
}

impl SpecEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SpecEntry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Editable projection of a [`CatalogProduct`] used by the review table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewProduct {
    pub id: String,
    pub ordering_number: String,
    pub description: String,
    pub manual_notes: String,
    pub specs: Vec<SpecEntry>,
    pub location: Option<ProductLocation>,
    pub table_index: Option<u32>,
    pub reviewed: bool,
    /// True only after the row was written to the backend unchanged.
    pub saved: bool,
}

impl ReviewProduct {
    /// Empty pending row, as created by "add row".
    pub fn blank(id: impl Into<String>) -> Self {
        ReviewProduct {
            id: id.into(),
            ordering_number: String::new(),
            description: String::new(),
            manual_notes: String::new(),
            specs: Vec::new(),
            location: None,
            table_index: None,
            reviewed: false,
            saved: false,
        }
    }
}

/// Data copied out of a source table into the canonical store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

/// Where a canonical product's data lives.
///
/// The variant is chosen by the explicit `kind` tag on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProductSource {
    #[serde(rename_all = "camelCase")]
    Pointer {
        source_file_id: String,
        record_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Resolved {
        source_file_id: String,
        snapshot: SourceSnapshot,
    },
}

impl ProductSource {
    pub fn pointer(source_file_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        ProductSource::Pointer {
            source_file_id: source_file_id.into(),
            record_id: record_id.into(),
        }
    }

    pub fn source_file_id(&self) -> &str {
        match self {
            ProductSource::Pointer { source_file_id, .. } => source_file_id,
            ProductSource::Resolved { source_file_id, .. } => source_file_id,
        }
    }

    pub fn snapshot(&self) -> Option<&SourceSnapshot> {
        match self {
            ProductSource::Pointer { .. } => None,
            ProductSource::Resolved { snapshot, .. } => Some(snapshot),
        }
    }
}

/// Canonical product keyed by ordering number. Holds references only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub ordering_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub catalog_sources: Vec<ProductSource>,
    #[serde(default)]
    pub price_list_sources: Vec<ProductSource>,
    #[serde(default)]
    pub drawing_sources: Vec<ProductSource>,
}

impl Product {
    pub fn new(ordering_number: impl Into<String>) -> Self {
        Product {
            ordering_number: ordering_number.into(),
            category: None,
            catalog_sources: Vec::new(),
            price_list_sources: Vec::new(),
            drawing_sources: Vec::new(),
        }
    }

    pub fn has_catalog_data(&self) -> bool {
        !self.catalog_sources.is_empty()
    }

    /// Catalog data contributed by any file other than `file_id`.
    pub fn has_catalog_data_from_other_files(&self, file_id: &str) -> bool {
        self.catalog_sources
            .iter()
            .any(|s| s.source_file_id() != file_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationAction {
    Replace,
    Keep,
}

impl fmt::Display for ConsolidationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsolidationAction::Replace => write!(f, "replace"),
            ConsolidationAction::Keep => write!(f, "keep"),
        }
    }
}

/// An existing canonical product colliding with a newly reviewed one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationConflict {
    pub ordering_number: String,
    pub existing: Product,
    pub incoming: ReviewProduct,
    pub action: Option<ConsolidationAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
}

impl FileInfo {
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.file_name)
    }
}

/// The uploaded document the products were extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub key: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProducts {
    pub products: Vec<CatalogProduct>,
    #[serde(default)]
    pub source_file: Option<SourceFile>,
}
