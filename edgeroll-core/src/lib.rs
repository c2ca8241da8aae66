//! Core types and traits for edgeroll
//!
//! This crate provides the collaborator contracts shared by the rotation
//! coordinator and the concrete secret store / rule modifier backends.

pub mod error;
pub mod modifier;
pub mod outcome;
pub mod stage;
pub mod store;

pub use error::{ModifierError, RotationError, StoreError};
pub use modifier::{AcceptedTokens, RuleModifier, RuleTarget};
pub use outcome::CallOutcome;
pub use stage::Stage;
pub use store::{SecretDescription, SecretStore, SecretValue};
