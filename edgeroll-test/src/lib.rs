//! Test utilities for edgeroll
//!
//! Provides utilities for testing rotation end to end:
//! - Run the Secrets Manager emulator in-process on a random port
//! - Seed secrets with a current token and rotation enabled
//! - Recording rule modifiers sharing one call timeline, with scripted
//!   rejections, transport failures and hangs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use edgeroll_test::{EmulatorServer, Timeline};
//!
//! #[tokio::test]
//! async fn test_rotation() {
//!     let server = EmulatorServer::start().await.unwrap();
//!     let arn = server.seed_secret("edge-token", "old123").unwrap();
//!
//!     let store = server.secret_store().await;
//!     let timeline = Timeline::new();
//!     // build a coordinator with `store` and recording modifiers...
//! }
//! ```

pub mod recorder;
pub mod server;

pub use recorder::{RecordedCall, RecordingModifier, Timeline};
pub use server::{EmulatorServer, TestError};

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgeroll=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
