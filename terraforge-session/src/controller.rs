//! Session controller - drives one session against inference and the store

use crate::state::{Action, SessionState};
use std::path::{Path, PathBuf};
use terraforge_core::error::{self, Error, ErrorKind, Result};
use terraforge_core::{
    ExportArtifact, HistoryRecord, Inference, InferenceOutcome, OperationMode, PersistenceStore,
};
use tracing::{debug, error, info};

/// What `run_action` did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionReport {
    /// Nothing to run (blank input, History mode, or already loading)
    Skipped,
    /// Output was produced and recorded
    Succeeded(HistoryRecord),
    /// The service failed; the message is in the output
    Failed { kind: ErrorKind },
    /// The inference layer raised an error it could not describe
    Unexpected,
}

/// Owns the working state, the inference client and the store.
pub struct SessionController<I> {
    state: SessionState,
    inference: I,
    store: PersistenceStore,
}

impl<I: Inference> SessionController<I> {
    pub fn new(inference: I, store: PersistenceStore) -> Self {
        Self {
            state: SessionState::default(),
            inference,
            store,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    pub fn inference(&self) -> &I {
        &self.inference
    }

    pub fn set_mode(&mut self, mode: OperationMode) {
        self.state = std::mem::take(&mut self.state).with_mode(mode);
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.state = std::mem::take(&mut self.state).with_input(input);
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.state = std::mem::take(&mut self.state).with_instruction(instruction);
    }

    /// Run the current mode's operation on the current input.
    pub async fn run_action(&mut self) -> ActionReport {
        let Some(action) = self.state.prepare() else {
            debug!(mode = %self.state.mode, "nothing to run");
            return ActionReport::Skipped;
        };

        self.state = std::mem::take(&mut self.state).begin();
        info!(mode = %action.mode(), model = self.inference.model(), "running action");

        let result = match &action {
            Action::Generate { prompt } => self.inference.generate(prompt).await,
            Action::Edit { code, instructions } => self.inference.edit(code, instructions).await,
            Action::Analyze { code } => self.inference.analyze(code).await,
        };

        let failure = match &result {
            Ok(InferenceOutcome::Failure { kind, .. }) => Some(ActionReport::Failed { kind: *kind }),
            Ok(InferenceOutcome::Success(_)) => None,
            Err(err) => {
                error!(mode = %action.mode(), error = %err, "inference raised an error");
                Some(ActionReport::Unexpected)
            }
        };

        let (state, new_record) = std::mem::take(&mut self.state).settle(result, self.inference.model());
        self.state = state;

        match new_record {
            Some(new_record) => ActionReport::Succeeded(self.store.append_history(new_record)),
            None => failure.unwrap_or(ActionReport::Unexpected),
        }
    }

    /// Load a history record into the working fields without calling anything.
    pub fn restore(&mut self, record: &HistoryRecord) {
        self.state = std::mem::take(&mut self.state).restore(record);
    }

    pub fn restore_by_id(&mut self, id: &str) -> Result<()> {
        let record = self
            .store
            .find_history(id)
            .ok_or_else(|| error::history_not_found(id).with_operation("session::restore_by_id"))?;
        self.restore(&record);
        Ok(())
    }

    /// Persist the current input and instruction as the draft for the current mode.
    pub fn save_draft(&mut self) {
        self.store
            .save_draft(self.state.mode, &self.state.input_content, &self.state.instruction);
    }

    /// Replace the working text with the saved draft for the current mode.
    /// History mode has no draft and is left alone.
    pub fn load_draft(&mut self) {
        if self.state.mode == OperationMode::History {
            return;
        }
        let draft = self.store.load_draft(self.state.mode);
        self.state = std::mem::take(&mut self.state).with_draft(draft);
    }

    /// Write the current output as a `.tf` file.
    pub fn export_output(&self, target: impl AsRef<Path>) -> Result<PathBuf> {
        if self.state.output.is_empty() {
            return Err(Error::empty_input("output").with_operation("session::export_output"));
        }
        ExportArtifact::new(self.state.output.clone()).write_to(target)
    }
}
