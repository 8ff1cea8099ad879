//! # TerraForge Session
//!
//! The workflow on top of terraforge-core:
//! 1. User picks a mode and fills in input (and instructions, for Edit)
//! 2. The controller turns that into one inference call
//! 3. Output replaces whatever was shown before
//! 4. Successful runs land in history; failures only show their message
//! 5. History records can be restored into the working fields
//!
//! State transitions are pure functions on [`SessionState`]; the controller
//! owns the side effects.

mod controller;
mod state;

pub use controller::{ActionReport, SessionController};
pub use state::{Action, SessionState, GENERIC_FAILURE_MESSAGE};
