//! # Event Graph Walkthrough
//!
//! Builds graphs for a small two-jet event under several metrics and modes.
//! Shows ΔR and generalised-kt affinities, k-NN selection with union,
//! intersection and directed reconciliation, the fully-connected limit, and
//! the edge-list export.
//!
//! Run with `cargo run --example event_graph --features std`.

use momentum_graph::{
    build_adjacency, compute_affinity, AdjacencyMatrix, AdjacencyMode, AffinityMatrix,
    AffinityTransform, GraphConfig, GraphError, Metric, MomentumSet, SymmetrizePolicy,
};

// ── Event ────────────────────────────────────────────────────────────────────

/// Two collimated sprays, back to back in φ, plus one soft wide-angle particle.
fn two_jet_event() -> MomentumSet {
    MomentumSet::from_rows(&[
        // jet A, φ ≈ 0
        [45.2, 40.0, 3.1, 20.5],
        [22.8, 20.1, -1.9, 10.4],
        [9.7, 8.9, 0.6, 3.8],
        // jet B, φ ≈ π
        [51.0, -48.3, -2.2, -15.9],
        [17.4, -16.9, 1.4, -3.7],
        // soft, wide-angle
        [3.2, 0.4, 2.9, -1.2],
    ])
}

// ── Printing ─────────────────────────────────────────────────────────────────

fn print_affinity(title: &str, a: &AffinityMatrix) {
    println!("  {title}  ({:?})", a.polarity());
    for row in a.to_rows() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:9.4}")).collect();
        println!("    [{}]", cells.join(" "));
    }
    println!();
}

fn print_adjacency(title: &str, a: &AdjacencyMatrix) {
    println!("  {title}");
    for row in a.to_rows() {
        let cells: Vec<&str> = row.iter().map(|&v| if v != 0.0 { "■" } else { "·" }).collect();
        println!("    {}", cells.join(" "));
    }
    println!("    degrees: {:?}   edges: {}\n", a.degrees(), a.edge_count());
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<(), GraphError> {
    let event = two_jet_event();

    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║  momentum-graph — affinity and adjacency for a two-jet event        ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝\n");

    println!("▶  KINEMATICS\n");
    for (i, p) in event.iter().enumerate() {
        println!(
            "  {i}: pT={:7.3}  η={:+.3}  φ={:+.3}  m={:.3}",
            p.pt(),
            p.eta(),
            p.phi(),
            p.mass()
        );
    }
    println!("\n  jet mass (all particles): {:.3}\n", event.jet_mass(None)?);

    println!("▶  AFFINITY\n");
    let angular = compute_affinity(&event, &Metric::angular())?;
    print_affinity("exp(−ΔR)", &angular);
    let kt = compute_affinity(
        &event,
        &Metric::kinematic(-1.0).with_transform(AffinityTransform::Distance),
    )?;
    print_affinity("anti-kt distance  min(pT⁻²)·ΔR²", &kt);

    println!("▶  k-NN, k = 2\n");
    for policy in [SymmetrizePolicy::Directed, SymmetrizePolicy::Union, SymmetrizePolicy::Intersection] {
        let mode = AdjacencyMode::knn(2, false, policy)?;
        print_adjacency(&format!("{policy}"), &build_adjacency(&angular, &mode)?);
    }

    println!("▶  FULLY CONNECTED LIMIT\n");
    let full = build_adjacency(&angular, &AdjacencyMode::fully_connected(true))?;
    let big_k = build_adjacency(&angular, &AdjacencyMode::knn(100, true, SymmetrizePolicy::Union)?)?;
    println!("  k = 100 matches fully-connected: {}\n", full == big_k);

    println!("▶  EDGE LIST (anti-kt, k = 1, mutual)\n");
    let graph = GraphConfig::new(
        Metric::kinematic(-1.0),
        AdjacencyMode::knn(1, true, SymmetrizePolicy::Intersection)?,
    )
    .build(&event)?;
    for (i, j, w) in graph.adjacency.edges().filter(|&(i, j, _)| i < j) {
        println!("  {i} ── {j}   w = {w:.4e}");
    }
    println!();

    Ok(())
}
