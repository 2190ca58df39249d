//! # symbios-roads
//!
//! Procedural road networks for virtual cities, grown from stochastic L-Systems.
//!
//! A [`GrammarEngine`] rewrites an axiom with a pattern-specific rule set, a
//! [`RoadInterpreter`] walks the result with a turtle to lay down nodes and edges,
//! and [`topology::classify`] derives junction types from the final topology.
//! The resulting [`RoadNetwork`] is engine-agnostic and serializes to a plain JSON
//! interchange format for mesh builders and persistence layers.
//!
//! Every call owns its random stream: the same inputs and seed always produce the
//! same network, and independent calls can run on independent threads.

pub mod error;
pub mod generator;
pub mod grammar;
pub mod interpreter;
pub mod network;
pub mod topology;
pub mod turtle;

pub use error::*;
pub use generator::*;
pub use grammar::*;
pub use interpreter::*;
pub use network::*;
pub use topology::{Issue, classify, merge_coincident_nodes, validate};
pub use turtle::*;

use glam::DVec2;

/// Generates a network from `axiom` with the built-in rule sets.
///
/// `pattern` selects the rule set and interpretation preset (`grid`, `organic`,
/// `suburban`, `highway`, `downtown`); unknown names behave like `grid`.
pub fn generate(
    axiom: &str,
    iterations: u32,
    pattern: &str,
    dimensions: DVec2,
    start_position: Option<DVec2>,
    seed: Option<u64>,
) -> Result<RoadNetwork> {
    let request = GenerateRequest {
        axiom: Some(axiom.to_string()),
        iterations,
        pattern: pattern.to_string(),
        dimensions,
        start_position,
        seed,
        merge_epsilon: None,
    };
    RoadGenerator::default().generate(&request)
}

/// Like [`generate`], starting from the pattern's default axiom.
pub fn generate_pattern(
    pattern: &str,
    iterations: u32,
    dimensions: DVec2,
    seed: Option<u64>,
) -> Result<RoadNetwork> {
    let mut request = GenerateRequest::new(pattern, dimensions).with_iterations(iterations);
    request.seed = seed;
    RoadGenerator::default().generate(&request)
}
