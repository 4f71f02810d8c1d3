//! Stable column sorting for the forms table.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;
use crate::form::FormRecord;
use crate::views::FormRow;

/// Sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Id,
    Name,
    GoverningBody,
    Status,
    Category,
    Jurisdiction,
    Frequency,
    DueDate,
    /// Only meaningful for [`FormRow`]s; records compare equal on it.
    Progress,
}

impl SortKey {
    pub const ALL: &'static [SortKey] = &[
        SortKey::Id,
        SortKey::Name,
        SortKey::GoverningBody,
        SortKey::Status,
        SortKey::Category,
        SortKey::Jurisdiction,
        SortKey::Frequency,
        SortKey::DueDate,
        SortKey::Progress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::GoverningBody => "governingBody",
            SortKey::Status => "status",
            SortKey::Category => "category",
            SortKey::Jurisdiction => "jurisdiction",
            SortKey::Frequency => "frequency",
            SortKey::DueDate => "dueDate",
            SortKey::Progress => "progress",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    /// Accepts the camelCase column name or a snake/kebab spelling of it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        SortKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(&folded))
            .ok_or_else(|| ParseEnumError {
                kind: "sort key",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            _ => Err(ParseEnumError {
                kind: "sort direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Compare two records on one column, ascending. Missing due dates sort last.
pub fn compare_records(a: &FormRecord, b: &FormRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::GoverningBody => a.governing_body.cmp(&b.governing_body),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Category => a.category.as_str().cmp(b.category.as_str()),
        SortKey::Jurisdiction => a.jurisdiction.as_str().cmp(b.jurisdiction.as_str()),
        SortKey::Frequency => a.frequency.as_str().cmp(b.frequency.as_str()),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Progress => Ordering::Equal,
    }
}

/// `compare_records` in `direction`. Records without a due date stay last
/// either way.
fn compare_directed(a: &FormRecord, b: &FormRecord, key: SortKey, direction: SortDirection) -> Ordering {
    match (key, a.due_date, b.due_date) {
        (SortKey::DueDate, Some(x), Some(y)) => direction.apply(x.cmp(&y)),
        (SortKey::DueDate, _, _) => compare_records(a, b, key),
        _ => direction.apply(compare_records(a, b, key)),
    }
}

/// Sorted copy of `records`. Equal keys keep their relative input order in
/// both directions.
pub fn sort_by(records: &[FormRecord], key: SortKey, direction: SortDirection) -> Vec<FormRecord> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| compare_directed(a, b, key, direction));
    out
}

pub fn sort_rows(rows: &[FormRow], key: SortKey, direction: SortDirection) -> Vec<FormRow> {
    let mut out = rows.to_vec();
    out.sort_by(|a, b| match key {
        SortKey::Progress => direction.apply(a.progress.cmp(&b.progress)),
        _ => compare_directed(&a.record, &b.record, key, direction),
    });
    out
}
