//! Secret store backends for edgeroll
//!
//! Provides:
//! - `AwsSecretStore`: the production store backed by AWS Secrets Manager
//! - `SecretsManagerStorage`: in-memory versioned storage with stage labels
//! - A Secrets Manager JSON protocol emulator over the in-memory storage
//!   (CreateSecret, GetSecretValue, PutSecretValue, DescribeSecret,
//!   UpdateSecretVersionStage, GetRandomPassword)

mod client;
mod error;
pub mod handlers;
mod storage;

use axum::{routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use client::AwsSecretStore;
pub use error::{AwsError, ErrorCode};
pub use handlers::handle_request;
pub use storage::{
    random_password, Secret, SecretVersion, SecretsManagerError, SecretsManagerState,
    SecretsManagerStorage,
};

/// Router serving the emulator on `/`
pub fn router(state: Arc<SecretsManagerState>) -> Router {
    Router::new()
        .route("/", post(handle_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
