//! ELBv2 listener rule modifier for edgeroll
//!
//! The listener rule forwards only requests whose secret header matches one
//! of the configured values; everything else falls through to the default
//! action.

mod listener;

pub use listener::{ElbListenerModifier, HeaderCondition, ListenerRuleConfig};
