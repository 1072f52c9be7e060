//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use mcp_strategic_reasoning::config::{Config, LogFormat};
use mcp_strategic_reasoning::strategies::StrategyType;
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_successfully() {
    // Every variable has a default, so loading always succeeds.
    let result = Config::from_env();
    assert!(result.is_ok(), "Config::from_env() should succeed");
}

#[test]
#[serial]
fn test_config_from_env_defaults() {
    env::remove_var("REASONING_BEAM_WIDTH");
    env::remove_var("REASONING_STORE_CAPACITY");
    env::remove_var("REASONING_DEFAULT_STRATEGY");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.beam_width, 3);
    assert_eq!(config.store.capacity, 1000);
    assert_eq!(config.search.default_strategy, StrategyType::BeamSearch);
}

#[test]
#[serial]
fn test_config_from_env_custom_search() {
    env::set_var("REASONING_BEAM_WIDTH", "7");
    env::set_var("REASONING_MAX_DEPTH", "12");
    env::set_var("REASONING_MIN_SCORE", "2.5");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.beam_width, 7);
    assert_eq!(config.search.max_depth, 12);
    assert_eq!(config.search.min_score, 2.5);

    // Restore defaults
    env::remove_var("REASONING_BEAM_WIDTH");
    env::remove_var("REASONING_MAX_DEPTH");
    env::remove_var("REASONING_MIN_SCORE");
}

#[test]
#[serial]
fn test_config_from_env_custom_store_capacity() {
    env::set_var("REASONING_STORE_CAPACITY", "50");

    let config = Config::from_env().unwrap();
    assert_eq!(config.store.capacity, 50);

    env::remove_var("REASONING_STORE_CAPACITY");
}

#[test]
#[serial]
fn test_config_from_env_default_strategy() {
    env::set_var("REASONING_DEFAULT_STRATEGY", "hybrid");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.default_strategy, StrategyType::Hybrid);

    env::remove_var("REASONING_DEFAULT_STRATEGY");
}

#[test]
#[serial]
fn test_config_from_env_rejects_unknown_default_strategy() {
    env::set_var("REASONING_DEFAULT_STRATEGY", "quantum");

    let result = Config::from_env();
    assert!(result.is_err());

    env::remove_var("REASONING_DEFAULT_STRATEGY");
}

#[test]
#[serial]
fn test_config_from_env_hybrid_thresholds() {
    env::set_var("HYBRID_CONSTRAINT_DENSITY_THRESHOLD", "5");
    env::set_var("HYBRID_GOAL_CLARITY_THRESHOLD", "0.9");
    env::set_var("HYBRID_UNCERTAINTY_THRESHOLD", "0.2");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.thresholds.constraint_density, 5.0);
    assert_eq!(config.search.thresholds.goal_clarity, 0.9);
    assert_eq!(config.search.thresholds.uncertainty, 0.2);

    env::remove_var("HYBRID_CONSTRAINT_DENSITY_THRESHOLD");
    env::remove_var("HYBRID_GOAL_CLARITY_THRESHOLD");
    env::remove_var("HYBRID_UNCERTAINTY_THRESHOLD");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    // Restore default
    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_invalid_numbers_fall_back() {
    env::set_var("REASONING_BEAM_WIDTH", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.search.beam_width, 3);

    env::remove_var("REASONING_BEAM_WIDTH");
}
