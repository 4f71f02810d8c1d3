//! Read-only catalog of regulatory forms.
//!
//! The catalog is built once by the composition root and handed around by
//! reference (or behind an `Arc`). There is no mutation API.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use crate::CatalogError;
use crate::form::{Category, FormRecord, Frequency, Jurisdiction, Status};

const BUILTIN_FORMS: &str = include_str!("../data/forms.json");

/// Immutable, id-unique list of form records in catalog order.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<FormRecord>,
}

impl Catalog {
    /// Load the bundled San Francisco small-business catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_FORMS)
    }

    /// Parse a catalog from a JSON array of form records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<FormRecord> = serde_json::from_str(json)?;
        let catalog = Self::from_records(records)?;
        info!(count = catalog.len(), "loaded form catalog");
        Ok(catalog)
    }

    /// Build a catalog from records, rejecting duplicate ids.
    pub fn from_records(records: Vec<FormRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(CatalogError::DuplicateId(record.id));
            }
        }
        Ok(Self { records })
    }

    pub fn list_all(&self) -> &[FormRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id. Absence is an ordinary outcome, not an error.
    pub fn get_by_id(&self, id: u32) -> Option<&FormRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn filter_by_category(&self, category: Category) -> Vec<&FormRecord> {
        self.filter(|r| r.category == category)
    }

    pub fn filter_by_jurisdiction(&self, jurisdiction: Jurisdiction) -> Vec<&FormRecord> {
        self.filter(|r| r.jurisdiction == jurisdiction)
    }

    pub fn filter_by_status(&self, status: Status) -> Vec<&FormRecord> {
        self.filter(|r| r.status == status)
    }

    pub fn filter_by_frequency(&self, frequency: Frequency) -> Vec<&FormRecord> {
        self.filter(|r| r.frequency == frequency)
    }

    /// Forms every business in scope must file.
    pub fn required(&self) -> Vec<&FormRecord> {
        self.filter_by_status(Status::Required)
    }

    /// Records matching every supplied criterion; `None` means "any".
    pub fn filter_matching(
        &self,
        category: Option<Category>,
        jurisdiction: Option<Jurisdiction>,
        status: Option<Status>,
        frequency: Option<Frequency>,
    ) -> Vec<&FormRecord> {
        self.filter(|r| {
            category.is_none_or(|c| r.category == c)
                && jurisdiction.is_none_or(|j| r.jurisdiction == j)
                && status.is_none_or(|s| r.status == s)
                && frequency.is_none_or(|f| r.frequency == f)
        })
    }

    /// The catalog keyed by stringified id, as served to the front end.
    pub fn to_id_map(&self) -> BTreeMap<String, &FormRecord> {
        self.records.iter().map(|r| (r.id.to_string(), r)).collect()
    }

    fn filter(&self, pred: impl Fn(&FormRecord) -> bool) -> Vec<&FormRecord> {
        self.records.iter().filter(|r| pred(r)).collect()
    }
}
