use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::strategies::StrategyType;

/// Application configuration loaded from environment variables.
///
/// The surface is fixed at process start; nothing here is runtime-reloadable.
#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Search and strategy tuning parameters
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of top paths beam search keeps in view.
    pub beam_width: usize,
    /// Maximum accepted thought depth.
    pub max_depth: usize,
    /// Viability threshold for counting live leaves.
    pub min_score: f64,
    /// Diversity parameter for enrichment suggestions.
    pub temperature: f64,
    /// Session default strategy.
    pub default_strategy: StrategyType,
    /// Hybrid switch thresholds.
    pub thresholds: SwitchThresholds,
}

/// Thought store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity bound; the oldest nodes are evicted past this.
    pub capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Named thresholds driving the hybrid arbiter's switch policy.
///
/// These are tunable policy constants, not derived values; the defaults
/// carry no admissibility claim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchThresholds {
    /// At or above this constraint density, delegate to CSP.
    pub constraint_density: f64,
    /// At or above this goal clarity, delegate to A*.
    pub goal_clarity: f64,
    /// At or above this uncertainty, delegate to MCTS.
    pub uncertainty: f64,
}

impl Default for SwitchThresholds {
    fn default() -> Self {
        Self {
            constraint_density: 3.0,
            goal_clarity: 0.7,
            uncertainty: 0.3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let default_strategy = match env::var("REASONING_DEFAULT_STRATEGY") {
            Ok(raw) => StrategyType::from_str(&raw).map_err(|_| AppError::Config {
                message: format!("REASONING_DEFAULT_STRATEGY is not a known strategy: {}", raw),
            })?,
            Err(_) => StrategyType::BeamSearch,
        };

        let search = SearchConfig {
            beam_width: env_parse("REASONING_BEAM_WIDTH", 3),
            max_depth: env_parse("REASONING_MAX_DEPTH", 24),
            min_score: env_parse("REASONING_MIN_SCORE", 0.0),
            temperature: env_parse("REASONING_TEMPERATURE", 0.7),
            default_strategy,
            thresholds: SwitchThresholds {
                constraint_density: env_parse(
                    "HYBRID_CONSTRAINT_DENSITY_THRESHOLD",
                    SwitchThresholds::default().constraint_density,
                ),
                goal_clarity: env_parse(
                    "HYBRID_GOAL_CLARITY_THRESHOLD",
                    SwitchThresholds::default().goal_clarity,
                ),
                uncertainty: env_parse(
                    "HYBRID_UNCERTAINTY_THRESHOLD",
                    SwitchThresholds::default().uncertainty,
                ),
            },
        };

        let store = StoreConfig {
            capacity: env_parse("REASONING_STORE_CAPACITY", 1000),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            search,
            store,
            logging,
        })
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 3,
            max_depth: 24,
            min_score: 0.0,
            temperature: 0.7,
            default_strategy: StrategyType::BeamSearch,
            thresholds: SwitchThresholds::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

fn env_parse<T: FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}
