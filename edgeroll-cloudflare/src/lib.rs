//! Cloudflare edge rule modifier for edgeroll
//!
//! Rewrites the header-injection value of a single HTTP request header
//! transform rule so the edge forwards the rotated token to the origin.

mod client;
mod edge;

pub use client::{ApiMessage, RulePatch, RulesetsClient};
pub use edge::{CloudflareEdgeModifier, EdgeRuleConfig};
