//! Turtle state and the road alphabet.

use crate::network::NodeId;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Where the road currently being drawn begins.
///
/// When the turtle finalizes a road, the new edge starts at this anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// The start position. Its node is only created once a road actually uses it.
    Origin,
    /// An existing node of the network.
    Node(NodeId),
    /// No node: the next edge is a stub with an empty `from_node`.
    /// Set after dead-ends so the closed road does not gain more connections.
    Open,
}

/// The state of the Road Builder Turtle.
///
/// Tracks position, heading and the topological context (which node the current road
/// starts from). The full state is what `[` saves and `]` restores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadTurtleState {
    /// Current position of the "cursor".
    pub position: DVec2,

    /// Current heading in degrees. 0 points along +X, positive angles turn counter-clockwise.
    pub heading: f64,

    /// The node the road being accumulated will be attached to.
    pub anchor: Anchor,
}

impl Default for RoadTurtleState {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            heading: 0.0,
            anchor: Anchor::Origin,
        }
    }
}

impl RoadTurtleState {
    /// Creates a turtle at `position` facing `heading` degrees, anchored at the origin.
    pub fn new(position: DVec2, heading: f64) -> Self {
        Self {
            position,
            heading,
            anchor: Anchor::Origin,
        }
    }

    /// Returns the unit vector the turtle is facing.
    pub fn direction(&self) -> DVec2 {
        DVec2::from_angle(self.heading.to_radians())
    }

    /// Turns the turtle by `degrees` (positive is left).
    pub fn turn(&mut self, degrees: f64) {
        self.heading = (self.heading + degrees).rem_euclid(360.0);
    }

    /// Moves the turtle `distance` units along its heading and returns the new position.
    pub fn advance(&mut self, distance: f64) -> DVec2 {
        self.position += self.direction() * distance;
        self.position
    }
}

/// Operations that can be performed by the road turtle, one per alphabet symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoadOp {
    // --- Drawing ---
    /// Extend the current road by one segment (`R`).
    Road,
    /// Extend the current road by a double-length highway segment (`H`).
    Highway,
    /// Randomly bent short segment (`~`).
    Curve,

    // --- Steering ---
    /// Turn left and close the current road (`+`).
    TurnLeft,
    /// Turn right and close the current road (`-`).
    TurnRight,

    // --- Flow Control ---
    /// Save the full turtle state onto the stack (`[`).
    Push,
    /// Restore the most recently pushed turtle state (`]`).
    Pop,
    /// Close the current road as a dead-end (`.`).
    DeadEnd,
}

impl RoadOp {
    /// Every symbol of the road alphabet, in canonical order.
    pub const ALPHABET: [char; 8] = ['R', 'H', '+', '-', '~', '[', ']', '.'];

    /// Maps a symbol to its operation. Symbols outside the alphabet return `None`.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'R' => Some(Self::Road),
            'H' => Some(Self::Highway),
            '~' => Some(Self::Curve),
            '+' => Some(Self::TurnLeft),
            '-' => Some(Self::TurnRight),
            '[' => Some(Self::Push),
            ']' => Some(Self::Pop),
            '.' => Some(Self::DeadEnd),
            _ => None,
        }
    }

    /// The alphabet symbol that encodes this operation.
    pub fn symbol(self) -> char {
        match self {
            Self::Road => 'R',
            Self::Highway => 'H',
            Self::Curve => '~',
            Self::TurnLeft => '+',
            Self::TurnRight => '-',
            Self::Push => '[',
            Self::Pop => ']',
            Self::DeadEnd => '.',
        }
    }

    /// Whether `symbol` belongs to the road alphabet.
    pub fn is_symbol(symbol: char) -> bool {
        Self::from_symbol(symbol).is_some()
    }
}
