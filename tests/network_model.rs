// tests/network_model.rs
use glam::DVec2;
use serde_json::Value;
use symbios_roads::{
    EdgeId, Issue, LaneConfig, NodeId, NodeType, RoadEdge, RoadNetwork, RoadType, SurfaceType,
    classify, generate_pattern, polyline_length, validate,
};

fn edge(id: u32, from: Option<u32>, to: Option<u32>, points: &[(f64, f64)]) -> RoadEdge {
    RoadEdge {
        id: EdgeId(id),
        from_node: from.map(NodeId),
        to_node: to.map(NodeId),
        road_type: RoadType::Local,
        name: format!("Street {id}"),
        lanes: LaneConfig::local(),
        curve_points: points.iter().map(|&(x, y)| DVec2::new(x, y)).collect(),
        speed_limit: 50.0,
        has_median: false,
        median_width: 0.0,
        surface: SurfaceType::Asphalt,
    }
}

/// A -- B -- C with a stub hanging off C and a separate edge to a missing node.
fn sample_network() -> RoadNetwork {
    let mut network = RoadNetwork::new(DVec2::new(100.0, 100.0), "grid");
    let a = network.add_node(DVec2::new(10.0, 10.0));
    let b = network.add_node(DVec2::new(13.0, 14.0));
    let c = network.add_node(DVec2::new(13.0, 20.0));
    assert_eq!((a, b, c), (NodeId(0), NodeId(1), NodeId(2)));

    network.add_edge(edge(0, Some(0), Some(1), &[(10.0, 10.0), (13.0, 14.0)]));
    network.add_edge(edge(1, Some(1), Some(2), &[(13.0, 14.0), (13.0, 20.0)]));
    network.add_edge(edge(2, Some(2), None, &[(13.0, 20.0), (13.0, 30.0)]));
    network
}

#[test]
fn test_lane_total_width() {
    assert_eq!(LaneConfig::local().total_width(), 9.0);
    assert_eq!(LaneConfig::highway().total_width(), 15.0);

    let boulevard = LaneConfig {
        has_center_turn: true,
        has_bike_lane: true,
        has_parking: true,
        sidewalk_width: 2.0,
        ..LaneConfig::local()
    };
    // 2 lanes + turn lane (3 x 3.0) + bikes (2 x 1.5) + parking (2 x 2.5) + sidewalks (2 x 2.0)
    assert_eq!(boulevard.total_width(), 21.0);
}

#[test]
fn test_polyline_length() {
    let points = [DVec2::ZERO, DVec2::new(3.0, 4.0), DVec2::new(3.0, 10.0)];
    assert_eq!(polyline_length(&points), 11.0);
    assert_eq!(polyline_length(&points[..1]), 0.0);
    assert_eq!(polyline_length(&[]), 0.0);
}

#[test]
fn test_lookup_and_traversal() {
    let network = sample_network();

    assert_eq!(network.edge(EdgeId(1)).unwrap().length(), 6.0);
    assert_eq!(network.node(NodeId(2)).unwrap().position, DVec2::new(13.0, 20.0));
    assert!(network.node(NodeId(9)).is_none());

    let incident: Vec<EdgeId> = network.edges_for_node(NodeId(1)).map(|e| e.id).collect();
    assert_eq!(incident, vec![EdgeId(0), EdgeId(1)]);
    assert_eq!(network.connected_nodes(NodeId(1)), vec![NodeId(0), NodeId(2)]);
    // The stub has no far end to travel to.
    assert_eq!(network.connected_nodes(NodeId(2)), vec![NodeId(1)]);

    assert_eq!(network.total_road_length(), 21.0);
    assert!(network.is_connected());
}

#[test]
fn test_lookup_survives_sparse_ids() {
    let mut network = sample_network();
    network.nodes.remove(0);
    assert_eq!(network.node(NodeId(2)).unwrap().id, NodeId(2));
    assert_eq!(network.add_node(DVec2::ZERO), NodeId(3));
}

#[test]
fn test_classify_counts_resolved_endpoints() {
    let mut network = sample_network();
    network.add_edge(edge(3, Some(1), Some(42), &[(13.0, 14.0), (20.0, 14.0)]));
    classify(&mut network);

    let types: Vec<NodeType> = network.nodes.iter().map(|n| n.node_type).collect();
    assert_eq!(
        types,
        vec![NodeType::DeadEnd, NodeType::ThreeWay, NodeType::CurvePoint]
    );
    assert_eq!(
        network.node(NodeId(1)).unwrap().connections,
        vec![EdgeId(0), EdgeId(1), EdgeId(3)]
    );

    // Classification is lenient; validation reports the broken reference.
    let issues = validate(&network);
    assert_eq!(
        issues,
        vec![Issue::DanglingEndpoint {
            edge: EdgeId(3),
            node: NodeId(42),
        }]
    );
}

#[test]
fn test_validate_flags_inconsistent_nodes() {
    let mut network = sample_network();
    classify(&mut network);
    network.nodes[1].connections.push(EdgeId(7));
    network.nodes[2].node_type = NodeType::FourWay;
    network.edges[2].curve_points.clear();

    let issues = validate(&network);
    assert!(issues.contains(&Issue::UnknownConnection {
        node: NodeId(1),
        edge: EdgeId(7),
    }));
    assert!(issues.contains(&Issue::DegreeMismatch {
        node: NodeId(2),
        node_type: NodeType::FourWay,
        degree: 2,
    }));
    assert!(issues.contains(&Issue::EmptyPolyline(EdgeId(2))));
}

#[test]
fn test_disconnected_components() {
    let mut network = sample_network();
    network.add_node(DVec2::new(80.0, 80.0));
    assert!(!network.is_connected());
    assert!(RoadNetwork::new(DVec2::ONE, "grid").is_connected());
}

#[test]
fn test_interchange_layout() {
    let mut network = sample_network();
    network.seed = Some(5);
    classify(&mut network);
    let value = network.to_value().unwrap();

    assert_eq!(value["version"], "1.0");
    assert_eq!(value["dimensions"], serde_json::json!([100.0, 100.0]));
    assert_eq!(value["style"], "grid");
    assert_eq!(value["seed"], 5);

    let node = &value["nodes"][1];
    assert_eq!(node["id"], "node_1");
    assert_eq!(node["position"], serde_json::json!([13.0, 14.0]));
    assert_eq!(node["node_type"], "curve_point");
    assert_eq!(node["connections"], serde_json::json!(["edge_0", "edge_1"]));

    let stub = &value["edges"][2];
    assert_eq!(stub["from_node"], "node_2");
    assert_eq!(stub["to_node"], "");
    assert_eq!(stub["road_type"], "local");
    assert_eq!(stub["length"], 10.0);
    assert_eq!(stub["lanes"]["total_width"], 9.0);
    assert_eq!(stub["lanes"]["direction"], "bidirectional");
    assert_eq!(stub["surface"], "asphalt");

    let stats = &value["stats"];
    assert_eq!(stats["node_count"], 3);
    assert_eq!(stats["edge_count"], 3);
    assert_eq!(stats["total_road_length"], 21.0);
    assert_eq!(stats["is_connected"], true);
}

#[test]
fn test_round_trip_generated_network() {
    let network = generate_pattern("downtown", 2, DVec2::new(400.0, 400.0), Some(99)).unwrap();

    let back = RoadNetwork::from_value(network.to_value().unwrap()).unwrap();
    assert_eq!(back, network);

    let back = RoadNetwork::from_json(&network.to_json_pretty().unwrap()).unwrap();
    assert_eq!(back, network);
}

#[test]
fn test_derived_fields_are_not_trusted() {
    let network = sample_network();
    let mut value = network.to_value().unwrap();
    value["edges"][0]["length"] = Value::from(1234.0);
    value["edges"][0]["lanes"]["total_width"] = Value::from(-1.0);
    value.as_object_mut().unwrap().remove("stats");

    let back = RoadNetwork::from_value(value).unwrap();
    assert_eq!(back, network);
    assert_eq!(back.edges[0].length(), 5.0);
}

#[test]
fn test_rejects_malformed_ids() {
    let mut value = sample_network().to_value().unwrap();
    value["nodes"][0]["id"] = Value::from("intersection-7");
    assert!(RoadNetwork::from_value(value).is_err());
}
