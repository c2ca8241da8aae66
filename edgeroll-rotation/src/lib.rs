//! Rotation coordinator for edge authentication tokens
//!
//! Drives `createSecret → setSecret → testSecret → finishSecret` against a
//! [`SecretStore`](edgeroll_core::SecretStore) and two
//! [`RuleModifier`](edgeroll_core::RuleModifier)s. Every step is idempotent so
//! the invoking trigger can replay it after any failure.

mod coordinator;
mod dual_write;
mod step;

pub use coordinator::{RotationCoordinator, RotationSettings};
pub use dual_write::Phase;
pub use step::{RotationEvent, RotationStep};
