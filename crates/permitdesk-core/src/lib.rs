//! Core types for permitdesk: the form catalog, dashboard views, and the intake wizard.

pub mod business;
pub mod catalog;
mod error;
pub mod fill;
pub mod form;
pub mod sort;
pub mod views;
pub mod wizard;

pub use business::BusinessDetails;
pub use catalog::Catalog;
pub use error::{CatalogError, FillError, ParseEnumError, WizardError};
pub use fill::{FormField, fill_business_form, fill_fields, list_fields, read_fields};
pub use form::{Category, FormRecord, Frequency, Jurisdiction, Status};
pub use sort::{SortDirection, SortKey, sort_by, sort_rows};
pub use views::{
    CompletionStats, CompletionSummary, DUE_SOON_LIMIT, DUE_SOON_WINDOW_DAYS, DueDated,
    DueSoonEntry, FormRow, Priority, aggregate_completion, build_rows, completion_by_frequency,
    compute_progress, select_due_soon,
};
pub use wizard::{AnswerSink, ChatAnswer, Prompt, PromptKind, Wizard, WizardPhase};
