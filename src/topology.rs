//! Finishing passes over a generated network: junction classification, integrity
//! checks and optional merging of coincident nodes.

use crate::network::{EdgeId, NodeId, NodeType, RoadNetwork, RoadNode};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Rebuilds every node's connection list and derives its [`NodeType`] from the degree.
///
/// Each edge endpoint that resolves to a node registers the edge there; endpoints that
/// are empty or dangling are skipped. Degrees map as 1 → dead-end, 2 → curve point,
/// 3 → three-way, 4+ → four-way (with a traffic light). Junctions of degree 3+ get a
/// crosswalk. Isolated nodes keep whatever type they had.
pub fn classify(network: &mut RoadNetwork) {
    let index: HashMap<NodeId, usize> = network
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id, i))
        .collect();

    for node in &mut network.nodes {
        node.connections.clear();
    }

    for edge in &network.edges {
        for endpoint in [edge.from_node, edge.to_node].into_iter().flatten() {
            if let Some(&i) = index.get(&endpoint) {
                network.nodes[i].connections.push(edge.id);
            }
        }
    }

    for node in &mut network.nodes {
        let degree = node.degree();
        if let Some(node_type) = NodeType::from_degree(degree) {
            node.node_type = node_type;
        }
        node.has_traffic_light = degree >= 4;
        node.has_crosswalk = degree >= 3;
    }
}

/// An integrity problem found by [`validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    DuplicateNodeId(NodeId),
    DuplicateEdgeId(EdgeId),
    /// An edge endpoint names a node that is not in the network.
    DanglingEndpoint { edge: EdgeId, node: NodeId },
    /// A node lists an edge that does not exist or does not touch it.
    UnknownConnection { node: NodeId, edge: EdgeId },
    /// An edge without any centerline points.
    EmptyPolyline(EdgeId),
    /// A node whose type contradicts the number of edges touching it.
    DegreeMismatch {
        node: NodeId,
        node_type: NodeType,
        degree: usize,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeId(id) => write!(f, "duplicate node id {id}"),
            Self::DuplicateEdgeId(id) => write!(f, "duplicate edge id {id}"),
            Self::DanglingEndpoint { edge, node } => {
                write!(f, "edge {edge} references missing node {node}")
            }
            Self::UnknownConnection { node, edge } => {
                write!(f, "node {node} lists edge {edge} which does not touch it")
            }
            Self::EmptyPolyline(id) => write!(f, "edge {id} has no curve points"),
            Self::DegreeMismatch {
                node,
                node_type,
                degree,
            } => write!(f, "node {node} is {node_type:?} but has degree {degree}"),
        }
    }
}

/// Reports integrity problems without failing.
///
/// Degree checks count the edges touching each node, so they are meaningful for
/// classified networks; five-way and roundabout nodes are not checked.
pub fn validate(network: &RoadNetwork) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut node_ids = HashSet::new();
    for node in &network.nodes {
        if !node_ids.insert(node.id) {
            issues.push(Issue::DuplicateNodeId(node.id));
        }
    }
    let mut edge_ids = HashSet::new();
    for edge in &network.edges {
        if !edge_ids.insert(edge.id) {
            issues.push(Issue::DuplicateEdgeId(edge.id));
        }
    }

    let mut degrees: HashMap<NodeId, usize> = HashMap::new();
    for edge in &network.edges {
        for endpoint in [edge.from_node, edge.to_node].into_iter().flatten() {
            if node_ids.contains(&endpoint) {
                *degrees.entry(endpoint).or_default() += 1;
            } else {
                issues.push(Issue::DanglingEndpoint {
                    edge: edge.id,
                    node: endpoint,
                });
            }
        }
        if edge.curve_points.is_empty() {
            issues.push(Issue::EmptyPolyline(edge.id));
        }
    }

    for node in &network.nodes {
        for &edge_id in &node.connections {
            if !network.edge(edge_id).is_some_and(|e| e.touches(node.id)) {
                issues.push(Issue::UnknownConnection {
                    node: node.id,
                    edge: edge_id,
                });
            }
        }

        let degree = degrees.get(&node.id).copied().unwrap_or(0);
        let consistent = match node.node_type {
            NodeType::DeadEnd => degree == 1,
            NodeType::CurvePoint => degree == 2,
            NodeType::ThreeWay => degree == 3,
            NodeType::FourWay => degree >= 4,
            NodeType::FiveWay | NodeType::Roundabout => true,
        };
        if !consistent {
            issues.push(Issue::DegreeMismatch {
                node: node.id,
                node_type: node.node_type,
                degree,
            });
        }
    }

    issues
}

/// Merges every node lying within `epsilon` of an earlier node into that node.
///
/// Edge endpoints are redirected to the surviving node and zero-length self loops
/// created by the merge are removed. Nodes left without any edge are dropped too.
/// Connection lists are cleared, so run [`classify`] afterwards. Returns the number
/// of nodes removed.
pub fn merge_coincident_nodes(network: &mut RoadNetwork, epsilon: f64) -> usize {
    let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
    let mut kept: Vec<RoadNode> = Vec::with_capacity(network.nodes.len());

    for node in network.nodes.drain(..) {
        let survivor = kept
            .iter()
            .find(|k| k.position.distance(node.position) <= epsilon)
            .map(|k| k.id);
        match survivor {
            Some(id) => {
                remap.insert(node.id, id);
            }
            None => kept.push(node),
        }
    }
    network.nodes = kept;

    for node in &mut network.nodes {
        node.connections.clear();
    }
    for edge in &mut network.edges {
        for endpoint in [&mut edge.from_node, &mut edge.to_node] {
            if let Some(id) = endpoint
                && let Some(&survivor) = remap.get(&*id)
            {
                *id = survivor;
            }
        }
    }

    network.edges.retain(|edge| {
        let self_loop = edge.from_node.is_some() && edge.from_node == edge.to_node;
        !(self_loop && edge.length() <= epsilon)
    });

    let touched: HashSet<NodeId> = network
        .edges
        .iter()
        .flat_map(|edge| [edge.from_node, edge.to_node])
        .flatten()
        .collect();
    let before = network.nodes.len();
    network.nodes.retain(|node| touched.contains(&node.id));
    let isolated = before - network.nodes.len();

    debug!(merged = remap.len(), isolated, epsilon, "merged coincident nodes");
    remap.len() + isolated
}
