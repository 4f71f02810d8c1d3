//! Derived dashboard views: progress heuristic, completion counts, due-soon list.
//!
//! Everything here is a pure function of its inputs and a caller-supplied
//! `today`, so results are reproducible in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::form::{FormRecord, Frequency};

/// Lookahead over which progress ramps from 0 to 100.
pub const PROGRESS_WINDOW_DAYS: i64 = 30;
/// Progress reported once a due date has passed.
pub const OVERDUE_PROGRESS: u8 = 10;
/// Progress reported with no due date, or one beyond the lookahead.
pub const DEFAULT_PROGRESS: u8 = 40;
/// A form counts as complete at this progress.
pub const COMPLETION_THRESHOLD: u8 = 100;
/// Window used for the due-soon list.
pub const DUE_SOON_WINDOW_DAYS: i64 = 30;
/// Maximum number of due-soon entries served at once.
pub const DUE_SOON_LIMIT: usize = 10;

/// Presentation heuristic for how close a form is to its deadline, 0..=100.
///
/// Not a completion signal: a value of 100 only means the form is due today.
pub fn compute_progress(record: &FormRecord, today: NaiveDate) -> u8 {
    progress_for_due_date(record.due_date, today)
}

pub fn progress_for_due_date(due_date: Option<NaiveDate>, today: NaiveDate) -> u8 {
    let Some(due) = due_date else {
        return DEFAULT_PROGRESS;
    };
    let days = (due - today).num_days();
    if days < 0 {
        OVERDUE_PROGRESS
    } else if days <= PROGRESS_WINDOW_DAYS {
        // Linear: 0% at the window edge, 100% on the due date.
        ((PROGRESS_WINDOW_DAYS - days) * 100 / PROGRESS_WINDOW_DAYS) as u8
    } else {
        DEFAULT_PROGRESS
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub completed_count: usize,
    pub total_count: usize,
}

/// Count how many of `items` satisfy `is_complete`.
pub fn aggregate_completion<T>(items: &[T], is_complete: impl Fn(&T) -> bool) -> CompletionStats {
    CompletionStats {
        completed_count: items.iter().filter(|item| is_complete(item)).count(),
        total_count: items.len(),
    }
}

/// A catalog record paired with its computed progress, one dashboard table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRow {
    #[serde(flatten)]
    pub record: FormRecord,
    pub progress: u8,
}

impl FormRow {
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETION_THRESHOLD
    }
}

pub fn build_rows<'a>(
    records: impl IntoIterator<Item = &'a FormRecord>,
    today: NaiveDate,
) -> Vec<FormRow> {
    records
        .into_iter()
        .map(|record| FormRow {
            progress: compute_progress(record, today),
            record: record.clone(),
        })
        .collect()
}

/// Completion counts for the dashboard stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub all: CompletionStats,
    pub once: CompletionStats,
    pub annual: CompletionStats,
    pub quarterly: CompletionStats,
    pub miscellaneous: CompletionStats,
}

pub fn completion_by_frequency(rows: &[FormRow]) -> CompletionSummary {
    let stats_for = |frequency: Frequency| {
        let subset: Vec<&FormRow> = rows
            .iter()
            .filter(|row| row.record.frequency == frequency)
            .collect();
        aggregate_completion(&subset, |row| row.is_complete())
    };
    CompletionSummary {
        all: aggregate_completion(rows, FormRow::is_complete),
        once: stats_for(Frequency::Once),
        annual: stats_for(Frequency::Annual),
        quarterly: stats_for(Frequency::Quarterly),
        miscellaneous: stats_for(Frequency::Miscellaneous),
    }
}

/// Urgency bucket of an upcoming due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// `<= 7` days is high, `<= 14` medium, anything later low.
    pub fn from_days_until(days: i64) -> Self {
        if days <= 7 {
            Priority::High
        } else if days <= 14 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSoonEntry {
    pub name: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub document_url: String,
}

/// Anything that can appear in a due-soon list.
///
/// Implemented by catalog records and by due-date predictions fetched from
/// the analytics service.
pub trait DueDated {
    fn display_name(&self) -> &str;
    fn due_date(&self) -> Option<NaiveDate>;
    fn document_url(&self) -> &str;
}

impl DueDated for FormRecord {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    fn document_url(&self) -> &str {
        &self.resource_url
    }
}

impl<T: DueDated + ?Sized> DueDated for &T {
    fn display_name(&self) -> &str {
        (**self).display_name()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        (**self).due_date()
    }

    fn document_url(&self) -> &str {
        (**self).document_url()
    }
}

/// Items due within `[today, today + window_days]`, nearest first.
///
/// Ties keep input order.
pub fn select_due_soon<T: DueDated>(
    items: &[T],
    today: NaiveDate,
    window_days: i64,
) -> Vec<DueSoonEntry> {
    let mut entries: Vec<DueSoonEntry> = items
        .iter()
        .filter_map(|item| {
            let due = item.due_date()?;
            let days = (due - today).num_days();
            (0..=window_days).contains(&days).then(|| DueSoonEntry {
                name: item.display_name().to_string(),
                due_date: due,
                priority: Priority::from_days_until(days),
                document_url: item.document_url().to_string(),
            })
        })
        .collect();
    // `sort_by_key` is stable.
    entries.sort_by_key(|e| e.due_date);
    entries
}
