use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate form id {0} in catalog")]
    DuplicateId(u32),
}

/// A string did not name any member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("a wizard needs at least one prompt")]
    NoPrompts,

    #[error("the wizard has not been started")]
    NotStarted,

    #[error("the answers have already been submitted")]
    AlreadySubmitted,

    #[error("answer is blank")]
    BlankAnswer,

    #[error("{answer:?} is not one of the options for this prompt")]
    UnknownOption { answer: String },

    #[error("the final prompt has not been answered yet")]
    NotReady,

    #[error("delivering answers failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Error)]
pub enum FillError {
    #[error("PDF is unreadable or malformed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("writing PDF failed: {0}")]
    Io(#[from] std::io::Error),
}
