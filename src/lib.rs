//! # MCP Strategic Reasoning Server
//!
//! A Model Context Protocol (MCP) server that builds and evaluates a tree of
//! reasoning steps, exploring alternative continuations under interchangeable
//! search strategies.
//!
//! ## Features
//!
//! - **Beam Search**: scan-based frontier with stable tie-breaking
//! - **Monte-Carlo Tree Search**: visit/reward accounting with backpropagation
//! - **A\* Search**: open/closed set expansion with a cost heuristic
//! - **Constraint Satisfaction**: finite-domain propagation over thought payloads
//! - **Hybrid Arbiter**: signal-driven switching among the other four
//! - **Category Defaults**: game-design problem bundles (mechanics, balance,
//!   narrative, progression, economy) with recommendations
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Reasoner → Strategy
//!                                      ↓
//!                                Thought Store (bounded, in-memory)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_strategic_reasoning::{AppState, Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = Arc::new(AppState::new(config));
//!     let server = McpServer::new(state);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the MCP server.
pub mod config;
/// Game-design category defaults and response enrichment.
pub mod domain;
/// Error types and result aliases for the application.
pub mod error;
/// Reasoner dispatcher and cross-strategy statistics.
pub mod reasoner;
/// MCP server implementation and request handling.
pub mod server;
/// Bounded in-memory thought tree storage.
pub mod store;
/// Search strategy implementations (beam, MCTS, A*, CSP, hybrid).
pub mod strategies;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use reasoner::Reasoner;
pub use server::{AppState, McpServer, SharedState};
pub use strategies::{ReasoningRequest, ReasoningResponse, StrategyType};
