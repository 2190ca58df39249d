//! Error types for road network generation.

use thiserror::Error;

/// Result type alias for road generation operations.
pub type Result<T> = std::result::Result<T, RoadError>;

/// Errors that can occur while registering grammars or generating networks.
///
/// Lenient conditions (unknown pattern names, dangling edge endpoints,
/// zero-length edges) are deliberately absent: they are either handled by a
/// fallback or reported through [`crate::topology::validate`].
#[derive(Error, Debug)]
pub enum RoadError {
    // === Grammar ===
    /// Rewriting produced more symbols than the engine allows.
    #[error("generation too large: {symbols} symbols over limit {limit} (iteration {iteration})")]
    GenerationTooLarge {
        symbols: usize,
        limit: usize,
        iteration: u32,
    },

    /// A rule set references a symbol outside the road alphabet.
    #[error("rule set '{ruleset}' uses symbol {symbol:?} outside the road alphabet")]
    InvalidSymbol { ruleset: String, symbol: char },

    /// A rule probability is not a finite number in `[0, 1]`.
    #[error("rule set '{ruleset}' has a rule with invalid probability {probability}")]
    InvalidProbability { ruleset: String, probability: f64 },

    /// Rule sets are registered by name, so the name must not be empty.
    #[error("rule set name must not be empty")]
    EmptyRuleSetName,

    // === Generation ===
    /// The bounding rectangle leaves no room inside its margin.
    #[error("invalid dimensions {width}x{height} for a boundary margin of {margin}")]
    InvalidDimensions { width: f64, height: f64, margin: f64 },

    // === Interchange ===
    /// A node or edge id string could not be parsed.
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
