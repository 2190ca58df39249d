use crate::error::{Result, RoadError};
use glam::DVec2;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Version tag written into every serialized network.
pub const FORMAT_VERSION: &str = "1.0";

/// Width of one bike lane. Bike lanes are laid out on both sides of the road.
pub const BIKE_LANE_WIDTH: f64 = 1.5;

/// Width of one parking strip. Parking is laid out on both sides of the road.
pub const PARKING_LANE_WIDTH: f64 = 2.5;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = RoadError;

            fn from_str(s: &str) -> Result<Self> {
                s.strip_prefix($prefix)
                    .and_then(|n| n.parse().ok())
                    .map(Self)
                    .ok_or_else(|| RoadError::InvalidId(s.to_string()))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

arena_id!(
    /// Identifier of a [`RoadNode`]. Serialized as `node_<n>`.
    NodeId,
    "node_"
);

arena_id!(
    /// Identifier of a [`RoadEdge`]. Serialized as `edge_<n>`.
    EdgeId,
    "edge_"
);

/// Serializes an optional edge endpoint, using the empty string for "no node".
mod endpoint {
    use super::NodeId;
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(
        id: &Option<NodeId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NodeId>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(de::Error::custom)
    }
}

/// Junction classification of a node, derived from its connection degree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    FourWay,
    ThreeWay,
    FiveWay,
    Roundabout,
    DeadEnd,
    CurvePoint,
}

impl NodeType {
    /// The type a node with `degree` incident edges is classified as.
    /// Isolated nodes have no classification.
    pub fn from_degree(degree: usize) -> Option<Self> {
        match degree {
            0 => None,
            1 => Some(Self::DeadEnd),
            2 => Some(Self::CurvePoint),
            3 => Some(Self::ThreeWay),
            _ => Some(Self::FourWay),
        }
    }
}

/// Functional class of a road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Local,
    Highway,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneDirection {
    Bidirectional,
    Oneway,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    Asphalt,
    Concrete,
    Cobblestone,
}

/// Cross-section of a road: driving lanes plus optional features.
///
/// The total width is always derived from the fields, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "LaneRecord", from = "LaneRecord")]
pub struct LaneConfig {
    /// Number of driving lanes across both directions.
    pub count: u32,
    /// Width of a single driving lane.
    pub width: f64,
    pub direction: LaneDirection,
    /// A shared center turn lane (one extra lane width).
    pub has_center_turn: bool,
    pub has_bike_lane: bool,
    pub has_parking: bool,
    pub has_sidewalk: bool,
    /// Width of one sidewalk. Sidewalks are laid out on both sides.
    pub sidewalk_width: f64,
}

impl LaneConfig {
    /// Two-lane residential street with sidewalks.
    pub fn local() -> Self {
        Self {
            count: 2,
            width: 3.0,
            direction: LaneDirection::Bidirectional,
            has_center_turn: false,
            has_bike_lane: false,
            has_parking: false,
            has_sidewalk: true,
            sidewalk_width: 1.5,
        }
    }

    /// Four-lane divided highway without pedestrian features.
    pub fn highway() -> Self {
        Self {
            count: 4,
            width: 3.75,
            direction: LaneDirection::Bidirectional,
            has_center_turn: false,
            has_bike_lane: false,
            has_parking: false,
            has_sidewalk: false,
            sidewalk_width: 0.0,
        }
    }

    /// Sum of the widths of every active feature.
    pub fn total_width(&self) -> f64 {
        let mut total = f64::from(self.count) * self.width;
        if self.has_center_turn {
            total += self.width;
        }
        if self.has_bike_lane {
            total += 2.0 * BIKE_LANE_WIDTH;
        }
        if self.has_parking {
            total += 2.0 * PARKING_LANE_WIDTH;
        }
        if self.has_sidewalk {
            total += 2.0 * self.sidewalk_width;
        }
        total
    }
}

/// Interchange shape of [`LaneConfig`], carrying the derived total width.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct LaneRecord {
    count: u32,
    width: f64,
    direction: LaneDirection,
    has_center_turn: bool,
    has_bike_lane: bool,
    has_parking: bool,
    has_sidewalk: bool,
    sidewalk_width: f64,
    #[serde(default)]
    total_width: f64,
}

impl From<LaneConfig> for LaneRecord {
    fn from(lanes: LaneConfig) -> Self {
        Self {
            total_width: lanes.total_width(),
            count: lanes.count,
            width: lanes.width,
            direction: lanes.direction,
            has_center_turn: lanes.has_center_turn,
            has_bike_lane: lanes.has_bike_lane,
            has_parking: lanes.has_parking,
            has_sidewalk: lanes.has_sidewalk,
            sidewalk_width: lanes.sidewalk_width,
        }
    }
}

impl From<LaneRecord> for LaneConfig {
    fn from(record: LaneRecord) -> Self {
        Self {
            count: record.count,
            width: record.width,
            direction: record.direction,
            has_center_turn: record.has_center_turn,
            has_bike_lane: record.has_bike_lane,
            has_parking: record.has_parking,
            has_sidewalk: record.has_sidewalk,
            sidewalk_width: record.sidewalk_width,
        }
    }
}

/// A junction, bend or end point of the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: NodeId,
    pub position: DVec2,
    pub node_type: NodeType,
    pub elevation: f64,
    /// Incident edges, filled in by [`crate::topology::classify`].
    pub connections: Vec<EdgeId>,
    pub has_traffic_light: bool,
    pub has_crosswalk: bool,
}

impl RoadNode {
    /// A fresh, unclassified node at `position`.
    pub fn new(id: NodeId, position: DVec2) -> Self {
        Self {
            id,
            position,
            node_type: NodeType::FourWay,
            elevation: 0.0,
            connections: Vec::new(),
            has_traffic_light: false,
            has_crosswalk: false,
        }
    }

    pub fn degree(&self) -> usize {
        self.connections.len()
    }
}

/// A road between two nodes, following an ordered centerline polyline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "EdgeRecord", from = "EdgeRecord")]
pub struct RoadEdge {
    pub id: EdgeId,
    /// Start node. `None` for a stub that begins without a junction.
    pub from_node: Option<NodeId>,
    /// End node. `None` for a stub that ends without a junction.
    pub to_node: Option<NodeId>,
    pub road_type: RoadType,
    pub name: String,
    pub lanes: LaneConfig,
    /// Centerline from `from_node` to `to_node`.
    pub curve_points: Vec<DVec2>,
    pub speed_limit: f64,
    pub has_median: bool,
    pub median_width: f64,
    pub surface: SurfaceType,
}

impl RoadEdge {
    /// Arclength of the centerline. Degenerate polylines have length 0.
    pub fn length(&self) -> f64 {
        polyline_length(&self.curve_points)
    }

    /// Whether `node` is one of this edge's endpoints.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from_node == Some(node) || self.to_node == Some(node)
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint and the other end resolves.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.from_node == Some(node) {
            self.to_node
        } else if self.to_node == Some(node) {
            self.from_node
        } else {
            None
        }
    }
}

/// Sum of the distances between consecutive points.
pub fn polyline_length(points: &[DVec2]) -> f64 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Interchange shape of [`RoadEdge`], carrying the derived length.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct EdgeRecord {
    id: EdgeId,
    #[serde(with = "endpoint")]
    from_node: Option<NodeId>,
    #[serde(with = "endpoint")]
    to_node: Option<NodeId>,
    road_type: RoadType,
    name: String,
    lanes: LaneConfig,
    curve_points: Vec<DVec2>,
    #[serde(default)]
    length: f64,
    speed_limit: f64,
    has_median: bool,
    median_width: f64,
    surface: SurfaceType,
}

impl From<RoadEdge> for EdgeRecord {
    fn from(edge: RoadEdge) -> Self {
        Self {
            length: edge.length(),
            id: edge.id,
            from_node: edge.from_node,
            to_node: edge.to_node,
            road_type: edge.road_type,
            name: edge.name,
            lanes: edge.lanes,
            curve_points: edge.curve_points,
            speed_limit: edge.speed_limit,
            has_median: edge.has_median,
            median_width: edge.median_width,
            surface: edge.surface,
        }
    }
}

impl From<EdgeRecord> for RoadEdge {
    fn from(record: EdgeRecord) -> Self {
        Self {
            id: record.id,
            from_node: record.from_node,
            to_node: record.to_node,
            road_type: record.road_type,
            name: record.name,
            lanes: record.lanes,
            curve_points: record.curve_points,
            speed_limit: record.speed_limit,
            has_median: record.has_median,
            median_width: record.median_width,
            surface: record.surface,
        }
    }
}

/// Summary figures written alongside a serialized network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_road_length: f64,
    pub is_connected: bool,
}

/// The complete generated road graph.
///
/// Connectivity is checkable through [`RoadNetwork::is_connected`] but never enforced,
/// and edges may reference nodes that do not exist (see [`crate::topology::validate`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "NetworkRecord", from = "NetworkRecord")]
pub struct RoadNetwork {
    pub version: String,
    /// Width and height of the bounding rectangle.
    pub dimensions: DVec2,
    pub nodes: Vec<RoadNode>,
    pub edges: Vec<RoadEdge>,
    /// Name of the pattern that produced the network.
    pub style: String,
    pub seed: Option<u64>,
}

impl RoadNetwork {
    pub fn new(dimensions: DVec2, style: impl Into<String>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            dimensions,
            nodes: Vec::new(),
            edges: Vec::new(),
            style: style.into(),
            seed: None,
        }
    }

    /// Appends an unclassified node and returns its id.
    pub fn add_node(&mut self, position: DVec2) -> NodeId {
        let id = NodeId(self.nodes.last().map_or(0, |n| n.id.0 + 1));
        self.nodes.push(RoadNode::new(id, position));
        id
    }

    /// The id the next call to [`add_edge`](Self::add_edge) should use.
    pub fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.edges.last().map_or(0, |e| e.id.0 + 1))
    }

    pub fn add_edge(&mut self, edge: RoadEdge) -> EdgeId {
        let id = edge.id;
        self.edges.push(edge);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        // Generated networks store node `n` at index `n`; fall back to a scan otherwise.
        match self.nodes.get(id.index()) {
            Some(node) if node.id == id => Some(node),
            _ => self.nodes.iter().find(|n| n.id == id),
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut RoadNode> {
        let index = match self.nodes.get(id.index()) {
            Some(node) if node.id == id => Some(id.index()),
            _ => self.nodes.iter().position(|n| n.id == id),
        };
        self.nodes.get_mut(index?)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&RoadEdge> {
        match self.edges.get(id.index()) {
            Some(edge) if edge.id == id => Some(edge),
            _ => self.edges.iter().find(|e| e.id == id),
        }
    }

    /// All edges with `node` as one of their endpoints.
    pub fn edges_for_node(&self, node: NodeId) -> impl Iterator<Item = &RoadEdge> {
        self.edges.iter().filter(move |e| e.touches(node))
    }

    /// Nodes reachable from `node` over a single edge, in edge order, without duplicates.
    pub fn connected_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.edges_for_node(node)
            .filter_map(|e| e.other_end(node))
            .filter(|other| seen.insert(*other))
            .collect()
    }

    pub fn total_road_length(&self) -> f64 {
        self.edges.iter().map(RoadEdge::length).sum()
    }

    /// Whether every node is reachable from the first one. Edges with an unresolved
    /// endpoint do not connect anything. An empty network counts as connected.
    pub fn is_connected(&self) -> bool {
        let Some(first) = self.nodes.first() else {
            return true;
        };

        let known: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &self.edges {
            if let (Some(a), Some(b)) = (edge.from_node, edge.to_node)
                && known.contains(&a)
                && known.contains(&b)
            {
                adjacency.entry(a).or_default().push(b);
                adjacency.entry(b).or_default().push(a);
            }
        }

        let mut visited = HashSet::from([first.id]);
        let mut queue = VecDeque::from([first.id]);
        while let Some(current) = queue.pop_front() {
            for next in adjacency.get(&current).into_iter().flatten() {
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        visited.len() == known.len()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            total_road_length: self.total_road_length(),
            is_connected: self.is_connected(),
        }
    }

    /// Converts the network into its JSON interchange structure.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a network from its JSON interchange structure.
    /// Derived fields (`stats`, `length`, `total_width`) are ignored.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Interchange shape of [`RoadNetwork`], carrying the derived statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct NetworkRecord {
    version: String,
    dimensions: DVec2,
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
    style: String,
    seed: Option<u64>,
    #[serde(default)]
    stats: Option<NetworkStats>,
}

impl From<RoadNetwork> for NetworkRecord {
    fn from(network: RoadNetwork) -> Self {
        Self {
            stats: Some(network.stats()),
            version: network.version,
            dimensions: network.dimensions,
            nodes: network.nodes,
            edges: network.edges,
            style: network.style,
            seed: network.seed,
        }
    }
}

impl From<NetworkRecord> for RoadNetwork {
    fn from(record: NetworkRecord) -> Self {
        Self {
            version: record.version,
            dimensions: record.dimensions,
            nodes: record.nodes,
            edges: record.edges,
            style: record.style,
            seed: record.seed,
        }
    }
}
