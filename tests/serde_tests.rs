//! JSON integration tests for the serialisable types.
//!
//! Checks that a pipeline configuration can be loaded from a hand-written
//! JSON document with missing fields filled by defaults, and that events and
//! matrices survive a trip through JSON unchanged.

#[cfg(feature = "serde")]
mod tests {
    use momentum_graph::{
        AdjacencyMode, AffinityTransform, GraphConfig, MetricKind, MomentumSet, SquareMatrix,
        SymmetrizePolicy,
    };

    // ── Config loading ───────────────────────────────────────────────────────

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "metric": { "kind": "kinematic_distance", "params": { "exponent": -1.0 } },
            "mode": { "mode": "k_nearest_neighbours", "k": 4, "weighted": true }
        }"#;
        let cfg: GraphConfig = serde_json::from_str(json).expect("parse config");
        assert_eq!(cfg.metric.kind, MetricKind::KinematicDistance);
        assert_eq!(cfg.metric.params.exponent, -1.0);
        assert_eq!(cfg.metric.params.transform, AffinityTransform::Exponential);
        assert_eq!(
            cfg.mode,
            AdjacencyMode::KNearestNeighbours { k: 4, weighted: true, symmetrize: SymmetrizePolicy::Union }
        );
    }

    #[test]
    fn test_empty_json_is_default_config() {
        let cfg: GraphConfig = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(cfg, GraphConfig::default());
    }

    #[test]
    fn test_fully_connected_mode_json() {
        let mode = AdjacencyMode::fully_connected(true);
        let json = serde_json::to_string(&mode).expect("serialise mode");
        assert_eq!(json, r#"{"mode":"fully_connected","weighted":true}"#);
    }

    // ── Data ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_event_is_a_plain_list_of_momenta() {
        let event = MomentumSet::from_rows(&[[10.0, 3.0, 0.0, 0.0], [5.0, 0.0, 4.0, 1.0]]);
        let json = serde_json::to_string(&event).expect("serialise event");
        assert!(json.starts_with('['));
        let restored: MomentumSet = serde_json::from_str(&json).expect("deserialise event");
        assert_eq!(restored, event);
    }

    #[test]
    fn test_square_matrix_rejects_ragged_rows() {
        let ok: SquareMatrix = serde_json::from_str("[[0.0,1.0],[1.0,0.0]]").expect("square");
        assert_eq!(ok.dim(), 2);
        assert!(serde_json::from_str::<SquareMatrix>("[[0.0,1.0],[1.0]]").is_err());
    }
}
