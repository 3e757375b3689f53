//! Bridges from other logging facades

#[cfg(feature = "log-compat")]
pub mod log_bridge;

#[cfg(feature = "log-compat")]
pub use log_bridge::{init_log_bridge, LogBridge, BRIDGE_PACKAGE, BRIDGE_REPO, MESSAGE_KEY};
