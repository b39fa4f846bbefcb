use super::*;

#[test]
fn boundary_type_resume_and_compaction_both_map_to_resume_edge() {
    assert_eq!(EdgeType::from_boundary_type("resume"), Some(EdgeType::Resume));
    assert_eq!(EdgeType::from_boundary_type("compaction"), Some(EdgeType::Resume));
}

#[test]
fn unrecognized_boundary_type_maps_to_none() {
    assert_eq!(EdgeType::from_boundary_type("nonsense"), None);
}

#[test]
fn edge_type_round_trips_through_display_and_from_str() {
    for et in [EdgeType::Branch, EdgeType::Fork, EdgeType::Resume, EdgeType::Semantic] {
        assert_eq!(et.to_string().parse::<EdgeType>().expect("valid edge type string"), et);
    }
}
