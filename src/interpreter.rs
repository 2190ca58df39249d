//! Interpreter that converts a rewritten road string into a [`RoadNetwork`].
//!
//! The entry point is [`RoadInterpreter`]. Configure it with a [`RoadConfig`]
//! (or a per-pattern preset from [`RoadConfig::for_pattern`]), then call
//! [`RoadInterpreter::build_network`] with the rewritten symbols and a random stream.

use crate::grammar::Pattern;
use crate::network::{LaneConfig, NodeId, RoadEdge, RoadNetwork, RoadType, SurfaceType};
use crate::turtle::{Anchor, RoadOp, RoadTurtleState};
use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for road interpretation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadConfig {
    /// Base length of an `R` segment.
    pub segment_length: f64,
    /// Base turn angle (in degrees) for `+`/`-`.
    pub turn_angle: f64,
    /// Relative random variation applied to segment lengths and turn angles.
    /// `0.1` means every length/angle is scaled by a factor in `[0.9, 1.1]`.
    pub variation: f64,
    /// Distance from the edge of the dimensions that roads must stay inside.
    pub boundary_margin: f64,
    /// Maximum heading perturbation (in degrees) of a `~` curve.
    pub curve_deviation: f64,
    /// Length of a `~` step as a fraction of `segment_length`.
    pub curve_step_factor: f64,
    /// Length of an `H` step as a multiple of `segment_length`.
    pub highway_step_factor: f64,
    /// Heading (in degrees) the turtle starts with.
    pub initial_heading: f64,
    /// Maximum stack depth for push/pop operations.
    pub max_stack_depth: usize,
    pub local_lanes: LaneConfig,
    pub highway_lanes: LaneConfig,
    pub local_speed_limit: f64,
    pub highway_speed_limit: f64,
    pub local_surface: SurfaceType,
    /// Width of the median separating highway carriageways.
    pub highway_median_width: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            segment_length: 20.0,
            turn_angle: 90.0,
            variation: 0.1,
            boundary_margin: 5.0,
            curve_deviation: 30.0,
            curve_step_factor: 0.7,
            highway_step_factor: 2.0,
            initial_heading: 0.0,
            max_stack_depth: 1024,
            local_lanes: LaneConfig::local(),
            highway_lanes: LaneConfig::highway(),
            local_speed_limit: 50.0,
            highway_speed_limit: 100.0,
            local_surface: SurfaceType::Asphalt,
            highway_median_width: 3.0,
        }
    }
}

impl RoadConfig {
    /// The preset that suits a pattern's rule set. Unknown names get the grid preset.
    pub fn for_pattern(pattern: &str) -> Self {
        let base = Self::default();
        match Pattern::from_name(pattern).unwrap_or(Pattern::Grid) {
            Pattern::Grid => Self {
                variation: 0.05,
                ..base
            },
            Pattern::Organic => Self {
                segment_length: 15.0,
                turn_angle: 35.0,
                variation: 0.35,
                ..base
            },
            Pattern::Suburban => Self {
                segment_length: 12.0,
                variation: 0.15,
                local_speed_limit: 30.0,
                local_lanes: LaneConfig {
                    has_parking: true,
                    ..LaneConfig::local()
                },
                ..base
            },
            Pattern::Highway => Self {
                segment_length: 30.0,
                turn_angle: 20.0,
                ..base
            },
            Pattern::Downtown => Self {
                segment_length: 10.0,
                variation: 0.02,
                local_speed_limit: 40.0,
                local_surface: SurfaceType::Cobblestone,
                local_lanes: LaneConfig {
                    has_center_turn: true,
                    has_bike_lane: true,
                    has_parking: true,
                    sidewalk_width: 2.5,
                    ..LaneConfig::local()
                },
                ..base
            },
        }
    }
}

/// Interprets a rewritten road string to build a [`RoadNetwork`].
#[derive(Clone, Debug, Default)]
pub struct RoadInterpreter {
    config: RoadConfig,
}

impl RoadInterpreter {
    pub fn new(config: RoadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoadConfig {
        &self.config
    }

    /// Interprets `symbols` and returns the resulting, not yet classified, [`RoadNetwork`].
    ///
    /// Walks every symbol in order; characters outside the road alphabet are ignored.
    /// The turtle starts at `start` (the center of `dimensions` when `None`) facing
    /// [`RoadConfig::initial_heading`]. All nodes are created as four-way junctions;
    /// run [`crate::topology::classify`] afterwards to derive the real types.
    ///
    /// # Roads
    ///
    /// Drawing symbols (`R`, `H`, `~`) extend a polyline. The polyline is turned into an
    /// edge ("finalized") by turns, branches, dead-ends, leaving the bounding rectangle
    /// and the end of the string. Finalizing creates exactly one node at the turtle's
    /// position and one edge from the turtle's [`Anchor`] to it.
    ///
    /// # Boundary exits
    ///
    /// A step that lands outside `[margin, dimension - margin]` keeps its end point as the
    /// terminal of a dead-end edge. The turtle continues from there with an open anchor,
    /// so that out-of-bounds point is the only geometry allowed outside the rectangle.
    ///
    /// # Push / Pop
    ///
    /// `[` closes the road at the branch point and saves the turtle state (position,
    /// heading, anchor). `]` closes the branch road and restores the state; a `]` with
    /// nothing to restore does nothing. Pushes beyond `max_stack_depth` are dropped;
    /// the `]` matching a dropped push only closes the road and leaves the turtle in
    /// place, so every other `]` still restores the state of its own `[`.
    ///
    /// `rng` is consumed strictly in symbol order, so the same string, stream and
    /// configuration always produce the same network.
    pub fn build_network<R: Rng + ?Sized>(
        &self,
        symbols: &str,
        dimensions: DVec2,
        start: Option<DVec2>,
        rng: &mut R,
    ) -> RoadNetwork {
        let origin = start.unwrap_or(dimensions / 2.0);
        let margin = DVec2::splat(self.config.boundary_margin);
        let mut walk = Walk {
            config: &self.config,
            rng,
            network: RoadNetwork::new(dimensions, ""),
            min: margin,
            max: dimensions - margin,
            origin,
            start_node: None,
            turtle: RoadTurtleState::new(origin, self.config.initial_heading),
            stack: Vec::new(),
            polyline: vec![origin],
            road_type: RoadType::Local,
            local_count: 0,
            highway_count: 0,
            dropped_pushes: 0,
        };

        debug!(symbols = symbols.len(), "interpreting road string");
        for op in symbols.chars().filter_map(RoadOp::from_symbol) {
            walk.apply(op);
        }
        walk.finalize(false);

        let network = walk.network;
        debug!(
            nodes = network.nodes.len(),
            edges = network.edges.len(),
            "interpretation finished"
        );
        network
    }
}

/// Mutable state of a single interpretation pass.
struct Walk<'a, R: Rng + ?Sized> {
    config: &'a RoadConfig,
    rng: &'a mut R,
    network: RoadNetwork,
    min: DVec2,
    max: DVec2,
    origin: DVec2,
    /// Node at `origin`, created the first time a road starts there.
    start_node: Option<NodeId>,
    turtle: RoadTurtleState,
    stack: Vec<RoadTurtleState>,
    /// Points of the road being accumulated. Always ends at the turtle's position.
    polyline: Vec<DVec2>,
    road_type: RoadType,
    local_count: u32,
    highway_count: u32,
    /// Pushes refused by the depth limit whose `]` has not been seen yet.
    dropped_pushes: usize,
}

impl<R: Rng + ?Sized> Walk<'_, R> {
    fn apply(&mut self, op: RoadOp) {
        let seg = self.config.segment_length;
        match op {
            // --- DRAWING ---
            RoadOp::Road => {
                let len = seg * (1.0 + self.jitter());
                self.step(len);
            }
            RoadOp::Highway => {
                let len = seg * self.config.highway_step_factor * (1.0 + self.jitter());
                self.road_type = RoadType::Highway;
                self.step(len);
            }
            RoadOp::Curve => {
                let c = self.config.curve_deviation;
                let deviation = if c > 0.0 {
                    self.rng.random_range(-c..=c)
                } else {
                    0.0
                };
                self.turtle.turn(deviation);
                self.step(seg * self.config.curve_step_factor);
            }

            // --- STEERING ---
            RoadOp::TurnLeft | RoadOp::TurnRight => {
                let sign = if op == RoadOp::TurnLeft { 1.0 } else { -1.0 };
                let angle = self.config.turn_angle * (1.0 + self.jitter());
                self.turtle.turn(sign * angle);
                // Turns close the road even when nothing was drawn since the last node.
                self.finalize(true);
            }

            // --- FLOW ---
            RoadOp::Push => {
                self.finalize(false);
                if self.stack.len() < self.config.max_stack_depth {
                    self.stack.push(self.turtle.clone());
                } else {
                    warn!(depth = self.stack.len(), "branch stack full, dropping push");
                    self.dropped_pushes += 1;
                }
            }
            RoadOp::Pop => {
                if self.dropped_pushes > 0 {
                    self.dropped_pushes -= 1;
                    self.finalize(false);
                } else if let Some(saved) = self.stack.pop() {
                    self.finalize(false);
                    self.turtle = saved;
                    self.restart();
                }
            }
            RoadOp::DeadEnd => {
                self.finalize(false);
                self.turtle.anchor = Anchor::Open;
            }
        }
    }

    /// Relative variation factor in `[-variation, variation]`.
    fn jitter(&mut self) -> f64 {
        let v = self.config.variation;
        if v > 0.0 {
            self.rng.random_range(-v..=v)
        } else {
            0.0
        }
    }

    fn inside(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Moves the turtle forward and extends the current road.
    fn step(&mut self, distance: f64) {
        let next = self.turtle.advance(distance);
        self.polyline.push(next);
        if !self.inside(next) {
            self.finalize(true);
            self.turtle.anchor = Anchor::Open;
        }
    }

    /// Starts a new polyline at the turtle's position.
    fn restart(&mut self) {
        self.polyline.clear();
        self.polyline.push(self.turtle.position);
        self.road_type = RoadType::Local;
    }

    /// Turns the accumulated polyline into a node and an edge.
    ///
    /// Without `force`, a polyline that has not advanced since the last node is
    /// left alone, so branch and dead-end markers don't produce zero-length edges.
    fn finalize(&mut self, force: bool) {
        if self.polyline.len() < 2 && !force {
            return;
        }

        let from = match self.turtle.anchor {
            Anchor::Origin => Some(self.start_node()),
            Anchor::Node(id) => Some(id),
            Anchor::Open => None,
        };
        let to = self.network.add_node(self.turtle.position);
        let points = std::mem::take(&mut self.polyline);
        let edge = self.make_edge(from, to, points);
        self.network.add_edge(edge);

        self.turtle.anchor = Anchor::Node(to);
        self.restart();
    }

    fn start_node(&mut self) -> NodeId {
        match self.start_node {
            Some(id) => id,
            None => {
                let id = self.network.add_node(self.origin);
                self.start_node = Some(id);
                id
            }
        }
    }

    fn make_edge(
        &mut self,
        from: Option<NodeId>,
        to: NodeId,
        curve_points: Vec<DVec2>,
    ) -> RoadEdge {
        let config = self.config;
        let id = self.network.next_edge_id();
        match self.road_type {
            RoadType::Local => {
                self.local_count += 1;
                RoadEdge {
                    id,
                    from_node: from,
                    to_node: Some(to),
                    road_type: RoadType::Local,
                    name: format!("Street {}", self.local_count),
                    lanes: config.local_lanes.clone(),
                    curve_points,
                    speed_limit: config.local_speed_limit,
                    has_median: false,
                    median_width: 0.0,
                    surface: config.local_surface,
                }
            }
            RoadType::Highway => {
                self.highway_count += 1;
                RoadEdge {
                    id,
                    from_node: from,
                    to_node: Some(to),
                    road_type: RoadType::Highway,
                    name: format!("Highway {}", self.highway_count),
                    lanes: config.highway_lanes.clone(),
                    curve_points,
                    speed_limit: config.highway_speed_limit,
                    has_median: config.highway_median_width > 0.0,
                    median_width: config.highway_median_width,
                    surface: SurfaceType::Concrete,
                }
            }
        }
    }
}
