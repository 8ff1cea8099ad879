//! # TerraForge Core
//!
//! Everything below the session: talking to the model and remembering what
//! happened.
//!
//! ## Core Concepts
//! - **Modes**: Generate, Edit, Analyze (and History, which only browses)
//! - **Provider**: Trait-based access to the remote model (Gemini)
//! - **Inference**: Prompt templates and sampling policy per operation
//! - **Storage**: Raw key-value backends (memory, JSON files)
//! - **Store**: History records and per-mode drafts on top of storage
//! - **Config**: Defaults plus environment overrides

pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod mode;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use export::ExportArtifact;
pub use inference::{
    Inference, InferenceClient, InferenceKind, InferenceOutcome, ERROR_MARKER,
};
pub use mode::{DraftMode, OperationMode};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, GeminiProvider,
    LlmProvider, ProviderConfig, ProviderError, Role, Usage,
};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{Draft, DraftRecord, HistoryRecord, NewHistoryRecord, PersistenceStore, MAX_HISTORY};
