//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::reasoner::Reasoner;

/// Application state shared across handlers.
///
/// The reasoner sits behind a single mutex: every tool call (including any
/// store eviction it triggers) completes before the next one starts, which
/// is the serialization the session model requires.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The reasoning session.
    pub reasoner: Mutex<Reasoner>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Self {
        let reasoner = Reasoner::new(config.clone());
        Self {
            config,
            reasoner: Mutex::new(reasoner),
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, LoggingConfig};

    fn create_test_config() -> Config {
        Config {
            search: Default::default(),
            store: Default::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = AppState::new(create_test_config());
        let reasoner = state.reasoner.lock().await;
        assert_eq!(reasoner.get_available_strategies().len(), 5);
    }

    #[tokio::test]
    async fn test_shared_state_type() {
        let state = AppState::new(create_test_config());
        let shared: SharedState = Arc::new(state);

        let shared2 = Arc::clone(&shared);
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(shared2);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[tokio::test]
    async fn test_app_state_config_access() {
        let state = AppState::new(create_test_config());
        assert_eq!(state.config.search.beam_width, 3);
        assert_eq!(state.config.store.capacity, 1000);
    }
}
