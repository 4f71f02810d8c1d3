//! Regulatory form records and their closed enumerations.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Generates `ALL`, `as_str`, `Display` and case-insensitive `FromStr` for a
/// fieldless enum whose serde form is the lowercase variant name.
macro_rules! closed_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

/// Whether a business has to file the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Required,
    Optional,
    Conditional,
}

closed_enum!(Status, "status", {
    Required => "required",
    Optional => "optional",
    Conditional => "conditional",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Registration,
    Permits,
    Insurance,
    Tax,
    Health,
    Safety,
}

closed_enum!(Category, "category", {
    Registration => "registration",
    Permits => "permits",
    Insurance => "insurance",
    Tax => "tax",
    Health => "health",
    Safety => "safety",
});

/// Level of government that issues the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Federal,
    State,
    Local,
}

closed_enum!(Jurisdiction, "jurisdiction", {
    Federal => "federal",
    State => "state",
    Local => "local",
});

/// How often the obligation recurs.
///
/// The capitalised spellings (`"Once"`, `"Annual"`) used by older catalog
/// exports are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[serde(alias = "Once")]
    Once,
    #[serde(alias = "Annual")]
    Annual,
    #[serde(alias = "Quarterly")]
    Quarterly,
    #[serde(alias = "Miscellaneous")]
    Miscellaneous,
}

closed_enum!(Frequency, "frequency", {
    Once => "once",
    Annual => "annual",
    Quarterly => "quarterly",
    Miscellaneous => "miscellaneous",
});

/// One regulatory obligation in the catalog.
///
/// Records are created when the catalog is loaded and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: u32,
    pub name: String,
    pub governing_body: String,
    pub description: String,
    pub resource_url: String,
    pub status: Status,
    pub category: Category,
    pub jurisdiction: Jurisdiction,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}
