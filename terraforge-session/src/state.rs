//! Session state and its transitions
//!
//! `SessionState` is a plain value. Every transition takes it by value and
//! returns the next one, so the workflow can be exercised without any
//! provider or store in the loop.

use terraforge_core::{Draft, HistoryRecord, InferenceOutcome, NewHistoryRecord, OperationMode, Result};

/// Shown when the inference layer fails in a way it could not describe.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your request.";

/// The working state of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub mode: OperationMode,
    /// Prompt in Generate mode, source code in Edit and Analyze
    pub input_content: String,
    /// Edit instructions; kept but unused in the other modes
    pub instruction: String,
    pub is_loading: bool,
    pub output: String,
}

/// A call that `prepare` decided is ready to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Generate { prompt: String },
    Edit { code: String, instructions: String },
    Analyze { code: String },
}

impl Action {
    pub fn mode(&self) -> OperationMode {
        match self {
            Action::Generate { .. } => OperationMode::Generate,
            Action::Edit { .. } => OperationMode::Edit,
            Action::Analyze { .. } => OperationMode::Analyze,
        }
    }
}

impl SessionState {
    pub fn new(mode: OperationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The call to issue, or `None` when there is nothing to run: blank
    /// input, History mode, or a call already in flight.
    pub fn prepare(&self) -> Option<Action> {
        if self.is_loading || self.input_content.trim().is_empty() {
            return None;
        }

        match self.mode {
            OperationMode::Generate => Some(Action::Generate {
                prompt: self.input_content.clone(),
            }),
            OperationMode::Edit => Some(Action::Edit {
                code: self.input_content.clone(),
                instructions: self.instruction.clone(),
            }),
            OperationMode::Analyze => Some(Action::Analyze {
                code: self.input_content.clone(),
            }),
            OperationMode::History => None,
        }
    }

    pub fn begin(mut self) -> Self {
        self.is_loading = true;
        self
    }

    /// Apply the result of a call. Returns the record to persist when the
    /// call succeeded.
    pub fn settle(mut self, result: Result<InferenceOutcome>, model: &str) -> (Self, Option<NewHistoryRecord>) {
        self.is_loading = false;

        match result {
            Ok(InferenceOutcome::Success(text)) => {
                self.output = text;
                let instruction = self
                    .mode
                    .takes_instruction()
                    .then(|| self.instruction.clone());
                let record = NewHistoryRecord::new(
                    self.mode,
                    self.input_content.clone(),
                    instruction,
                    self.output.clone(),
                    model,
                );
                (self, Some(record))
            }
            Ok(failure @ InferenceOutcome::Failure { .. }) => {
                self.output = failure.into_text();
                (self, None)
            }
            Err(_) => {
                self.output = GENERIC_FAILURE_MESSAGE.to_string();
                (self, None)
            }
        }
    }

    /// Load a history record into the working fields. No call is issued.
    pub fn restore(mut self, record: &HistoryRecord) -> Self {
        self.mode = record.mode;
        self.input_content = record.input.clone();
        self.instruction = record.instruction.clone().unwrap_or_default();
        self.output = record.output.clone();
        self
    }

    /// Switch mode. Input, instruction and output carry over untouched.
    pub fn with_mode(mut self, mode: OperationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input_content = input.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.input_content = draft.content;
        self.instruction = draft.instruction;
        self
    }
}
