//! edgeroll - Edge authentication token rotation
//!
//! Rotates the shared token a CDN edge injects into origin-bound requests and
//! the load balancer listener checks, without rejecting legitimate traffic
//! while the token changes.

mod config;

use anyhow::Context;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edgeroll_cloudflare::CloudflareEdgeModifier;
use edgeroll_core::SecretStore;
use edgeroll_elb::ElbListenerModifier;
use edgeroll_rotation::{RotationCoordinator, RotationEvent};
use edgeroll_secretsmanager::AwsSecretStore;

use crate::config::{AwsConfig, Config};

#[derive(Parser, Debug)]
#[command(name = "edgeroll")]
#[command(about = "Edge authentication token rotation", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./edgeroll.toml when present)
    #[arg(long, global = true, env = "EDGEROLL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "EDGEROLL_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single rotation step, as delivered by the rotation trigger
    Step(StepArgs),

    /// Run all four steps under a fresh request token
    Rotate {
        /// Secret name or ARN
        #[arg(long)]
        secret_id: String,
    },
}

#[derive(ClapArgs, Debug)]
struct StepArgs {
    /// JSON event file with SecretId, ClientRequestToken and Step; `-` reads stdin
    #[arg(long, conflicts_with_all = ["secret_id", "token", "step"])]
    event: Option<String>,

    /// Secret name or ARN
    #[arg(long, required_unless_present = "event")]
    secret_id: Option<String>,

    /// Client request token, also the id of the new version
    #[arg(long, required_unless_present = "event")]
    token: Option<String>,

    /// createSecret, setSecret, testSecret or finishSecret
    #[arg(long, required_unless_present = "event")]
    step: Option<String>,
}

impl StepArgs {
    fn into_event(self) -> anyhow::Result<RotationEvent> {
        if let Some(source) = self.event {
            let raw = if source == "-" {
                let mut raw = String::new();
                std::io::stdin()
                    .read_to_string(&mut raw)
                    .context("reading event from stdin")?;
                raw
            } else {
                std::fs::read_to_string(&source)
                    .with_context(|| format!("reading event file {}", source))?
            };
            return serde_json::from_str(&raw).context("parsing rotation event");
        }

        match (self.secret_id, self.token, self.step) {
            (Some(secret_id), Some(client_request_token), Some(step)) => Ok(RotationEvent {
                secret_id,
                client_request_token,
                step,
            }),
            _ => anyhow::bail!("--secret-id, --token and --step are required without --event"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("edgeroll={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    config.validate().context("invalid configuration")?;

    let coordinator = build_coordinator(&config).await?;

    match args.command {
        Command::Step(step) => {
            let event = step.into_event()?;
            coordinator.handle(&event).await.with_context(|| {
                format!("{} failed for {}", event.step, event.secret_id)
            })?;
            info!(secret_id = %event.secret_id, step = %event.step, "Step complete");
        }
        Command::Rotate { secret_id } => {
            let token = coordinator
                .rotate(&secret_id)
                .await
                .with_context(|| format!("rotation failed for {}", secret_id))?;
            println!("{}", token);
        }
    }

    Ok(())
}

async fn build_coordinator(config: &Config) -> anyhow::Result<RotationCoordinator> {
    let sdk_config = load_sdk_config(&config.aws, config.call_timeout()).await;

    let store: Arc<dyn SecretStore> = Arc::new(AwsSecretStore::from_sdk_config(&sdk_config));
    let edge = CloudflareEdgeModifier::new(config.edge_rule(), store.clone())
        .context("building Cloudflare client")?;
    let listener = ElbListenerModifier::from_sdk_config(&sdk_config, config.listener_rule());

    info!(
        zone_id = %config.cloudflare.zone_id,
        rule_id = %config.cloudflare.rule_id,
        listener_rule = %config.listener.rule_arn,
        "Rotation targets configured"
    );

    Ok(RotationCoordinator::new(
        store,
        Arc::new(edge),
        Arc::new(listener),
        config.rotation_settings(),
    ))
}

async fn load_sdk_config(aws: &AwsConfig, timeout: Duration) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());

    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &aws.endpoint_url {
        info!(endpoint_url = %endpoint_url, "Using AWS endpoint override");
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}
