//! Linear question/answer intake wizard.
//!
//! The wizard walks a fixed list of prompts in order. Each answer is recorded
//! against the prompt currently shown, then the cursor moves on; there is no
//! way to skip a prompt or reorder answers. Once the last prompt has been
//! answered, [`Wizard::submit`] joins every answer into one transcript and
//! hands it to an [`AnswerSink`].
//!
//! ```text
//! Idle -> Presenting(0) -> .. -> Presenting(n-2) -> AwaitingFinalSubmit -> Submitted
//! ```

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::WizardError;

/// Separator placed between answers in the submitted transcript.
pub const ANSWER_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptKind {
    Text,
    Choice { options: Vec<String> },
}

/// One question shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
    #[serde(flatten)]
    pub kind: PromptKind,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: PromptKind::Text,
        }
    }

    pub fn choice<I, S>(text: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            kind: PromptKind::Choice {
                options: options.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            PromptKind::Text => None,
            PromptKind::Choice { options } => Some(options),
        }
    }
}

/// Prompts for the small-business intake flow.
///
/// They cover the fields the extraction endpoint pulls out of the transcript.
pub fn business_intake_prompts() -> Vec<Prompt> {
    vec![
        Prompt::text("What is your name?"),
        Prompt::text("What is your business about?"),
        Prompt::choice(
            "How is your business structured?",
            ["Sole proprietorship", "Partnership", "LLC", "Corporation"],
        ),
        Prompt::text("What name does your business operate under, if different from its legal name?"),
        Prompt::text("What phone numbers can we reach you and the business at?"),
        Prompt::text("Where are you located? Include street address, suite, city and ZIP."),
    ]
}

/// A recorded answer together with the prompt it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Idle,
    Presenting(usize),
    /// The last prompt is on screen. Its answer may be recorded and replaced
    /// until submission succeeds.
    AwaitingFinalSubmit,
    Submitted,
}

/// Destination for a finished transcript.
pub trait AnswerSink {
    type Output;
    type Error: Display;

    fn deliver(&self, transcript: &str) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct Wizard {
    prompts: Vec<Prompt>,
    phase: WizardPhase,
    answers: Vec<ChatAnswer>,
}

impl Wizard {
    pub fn new(prompts: Vec<Prompt>) -> Result<Self, WizardError> {
        if prompts.is_empty() {
            return Err(WizardError::NoPrompts);
        }
        Ok(Self {
            prompts,
            phase: WizardPhase::Idle,
            answers: Vec::new(),
        })
    }

    pub fn business_intake() -> Self {
        Self {
            prompts: business_intake_prompts(),
            phase: WizardPhase::Idle,
            answers: Vec::new(),
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn answers(&self) -> &[ChatAnswer] {
        &self.answers
    }

    /// Index of the prompt on screen; `prompt_count()` once submitted.
    pub fn cursor(&self) -> usize {
        match self.phase {
            WizardPhase::Idle => 0,
            WizardPhase::Presenting(i) => i,
            WizardPhase::AwaitingFinalSubmit => self.last_index(),
            WizardPhase::Submitted => self.prompts.len(),
        }
    }

    /// True while the last prompt is displayed.
    pub fn is_terminal(&self) -> bool {
        self.phase == WizardPhase::AwaitingFinalSubmit
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        match self.phase {
            WizardPhase::Presenting(_) | WizardPhase::AwaitingFinalSubmit => {
                self.prompts.get(self.cursor())
            }
            WizardPhase::Idle | WizardPhase::Submitted => None,
        }
    }

    /// Share of prompts answered, 0..=100.
    pub fn progress(&self) -> u8 {
        (self.answers.len() * 100 / self.prompts.len()) as u8
    }

    /// Show the first prompt. A no-op once started.
    pub fn start(&mut self) {
        if self.phase == WizardPhase::Idle {
            self.phase = self.phase_at(0);
            debug!(prompts = self.prompts.len(), "intake wizard started");
        }
    }

    /// Record an answer for the prompt on screen and move to the next one.
    ///
    /// Blank answers leave the wizard untouched. Surrounding whitespace is
    /// ignored only to detect blanks and to match options. On the final prompt the
    /// answer is stored but the cursor stays put, and a later call replaces it.
    pub fn record_answer(&mut self, text: &str) -> Result<(), WizardError> {
        let index = match self.phase {
            WizardPhase::Idle => return Err(WizardError::NotStarted),
            WizardPhase::Submitted => return Err(WizardError::AlreadySubmitted),
            WizardPhase::Presenting(i) => i,
            WizardPhase::AwaitingFinalSubmit => self.last_index(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WizardError::BlankAnswer);
        }
        let prompt = &self.prompts[index];
        // Free text is kept as typed; a choice is stored as the option itself.
        let answer = match prompt.options() {
            Some(options) => options
                .iter()
                .find(|o| o.as_str() == trimmed)
                .cloned()
                .ok_or_else(|| WizardError::UnknownOption {
                    answer: trimmed.to_string(),
                })?,
            None => text.to_string(),
        };

        let entry = ChatAnswer {
            prompt: prompt.text.clone(),
            answer,
        };
        if self.phase == WizardPhase::AwaitingFinalSubmit {
            self.answers.truncate(index);
            self.answers.push(entry);
        } else {
            self.answers.push(entry);
            self.advance();
        }
        Ok(())
    }

    /// Pick option `index` of the current choice prompt.
    pub fn select_option(&mut self, index: usize) -> Result<(), WizardError> {
        let choice = self
            .current_prompt()
            .and_then(Prompt::options)
            .and_then(|options| options.get(index))
            .cloned();
        match (choice, self.phase) {
            (_, WizardPhase::Idle) => Err(WizardError::NotStarted),
            (_, WizardPhase::Submitted) => Err(WizardError::AlreadySubmitted),
            (Some(choice), _) => self.record_answer(&choice),
            (None, _) => Err(WizardError::UnknownOption {
                answer: format!("option #{index}"),
            }),
        }
    }

    /// The transcript that would be submitted: every answer, in order,
    /// separated by a blank line.
    pub fn transcript(&self) -> Result<String, WizardError> {
        match self.phase {
            WizardPhase::Idle => Err(WizardError::NotStarted),
            WizardPhase::Submitted => Err(WizardError::AlreadySubmitted),
            WizardPhase::Presenting(_) => Err(WizardError::NotReady),
            WizardPhase::AwaitingFinalSubmit if self.answers.len() < self.prompts.len() => {
                Err(WizardError::NotReady)
            }
            WizardPhase::AwaitingFinalSubmit => Ok(self
                .answers
                .iter()
                .map(|a| a.answer.as_str())
                .collect::<Vec<_>>()
                .join(ANSWER_SEPARATOR)),
        }
    }

    /// Deliver the transcript. On success the wizard is finished and the
    /// answers are released; on failure everything stays as it was so the
    /// caller can retry.
    pub async fn submit<S: AnswerSink>(&mut self, sink: &S) -> Result<S::Output, WizardError> {
        let transcript = self.transcript()?;
        match sink.deliver(&transcript).await {
            Ok(output) => {
                self.phase = WizardPhase::Submitted;
                self.answers.clear();
                info!(prompts = self.prompts.len(), "intake answers submitted");
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, "intake submission failed, answers kept");
                Err(WizardError::Delivery(e.to_string()))
            }
        }
    }

    fn advance(&mut self) {
        if let WizardPhase::Presenting(i) = self.phase {
            self.phase = self.phase_at(i + 1);
        }
    }

    fn phase_at(&self, index: usize) -> WizardPhase {
        if index >= self.last_index() {
            WizardPhase::AwaitingFinalSubmit
        } else {
            WizardPhase::Presenting(index)
        }
    }

    fn last_index(&self) -> usize {
        self.prompts.len() - 1
    }
}
