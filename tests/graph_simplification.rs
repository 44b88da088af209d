//! Simplification pass scenarios on hand-built bidirected graphs.

use contig_forge::graph::{
    full_overlap, EdgeAlignment, EdgeId, GraphAlignment, GraphSimplifier, NodeId, ReadAligner,
    RepeatGraph,
};
use contig_forge::utils::configuration::SimplifyConfig;

/// Node pair: one node per strand.
fn node_pair(graph: &mut RepeatGraph) -> (NodeId, NodeId) {
    (graph.add_node(), graph.add_node())
}

/// Edge pair between strand-paired nodes.
fn edge_between(
    graph: &mut RepeatGraph,
    from: (NodeId, NodeId),
    to: (NodeId, NodeId),
    length: i64,
    coverage: i64,
) -> (EdgeId, EdgeId) {
    graph.add_edge_pair(from.0, to.0, to.1, from.1, length, coverage)
}

/// A read spanning one edge end to end.
fn spanning_read(edge: EdgeId, length: i64) -> GraphAlignment {
    vec![EdgeAlignment {
        edge,
        overlap: full_overlap(length),
    }]
}

fn chained_read(edges: &[(EdgeId, i64)]) -> GraphAlignment {
    edges
        .iter()
        .flat_map(|(edge, length)| spanning_read(*edge, *length))
        .collect()
}

#[test]
fn unsupported_edges_pass_reaches_fixed_point() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let x = node_pair(&mut graph);
    let y = node_pair(&mut graph);
    let (strong, strong_rc) = edge_between(&mut graph, a, b, 1000, 0);
    let (weak, weak_rc) = edge_between(&mut graph, x, y, 1000, 0);

    let mut reads = Vec::new();
    for _ in 0..10 {
        reads.push(spanning_read(strong, 1000));
        reads.push(spanning_read(strong_rc, 1000));
    }
    reads.push(spanning_read(weak, 1000));
    reads.push(spanning_read(weak_rc, 1000));

    let mut aligner = ReadAligner::new(reads);
    let config = SimplifyConfig {
        graph_cov_drop_rate: 2.0,
        ..SimplifyConfig::default()
    };
    let mut simplifier = GraphSimplifier::new(&mut graph, &mut aligner, config);
    simplifier.estimate_coverage();

    let removed = simplifier.remove_unsupported_edges().unwrap();
    assert_eq!(removed, 1);

    // second application removes nothing
    let removed_again = simplifier.remove_unsupported_edges().unwrap();
    assert_eq!(removed_again, 0);

    assert!(graph.has_edge(strong));
    assert!(graph.has_edge(strong_rc));
    assert!(!graph.has_edge(weak));
    assert!(!graph.has_edge(weak_rc));
    graph.check_symmetry().unwrap();

    // alignments over the removed edge were dropped by the refresh
    assert_eq!(aligner.alignments().len(), 20);
}

#[test]
fn chimeric_connection_is_severed_without_read_support() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    let d = node_pair(&mut graph);
    let (e, e_rc) = edge_between(&mut graph, a, b, 1000, 10);
    let (f, _) = edge_between(&mut graph, b, c, 1000, 10);
    let (g, _) = edge_between(&mut graph, b, d, 1000, 10);

    // no reads connect e to f or g across the bifurcation at b
    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    let cuts = simplifier.remove_unsupported_connections().unwrap();
    assert!(cuts > 0);

    // e was detached from the junction; f and g still join there
    assert_ne!(graph.edge(e).node_right, graph.edge(f).node_left);
    assert_ne!(graph.edge(e_rc).node_left, graph.edge(g).node_left);
    graph.check_symmetry().unwrap();
}

#[test]
fn supported_connection_survives() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    let d = node_pair(&mut graph);
    let (e, _) = edge_between(&mut graph, a, b, 1000, 10);
    let (f, f_rc) = edge_between(&mut graph, b, c, 1000, 10);
    let (g, g_rc) = edge_between(&mut graph, b, d, 1000, 10);

    // every junction edge pair is witnessed by reads on both strands
    let e_rc = graph.complement_edge(e);
    let reads = vec![
        chained_read(&[(e, 1000), (f, 1000)]),
        chained_read(&[(f_rc, 1000), (e_rc, 1000)]),
        chained_read(&[(e, 1000), (g, 1000)]),
        chained_read(&[(g_rc, 1000), (e_rc, 1000)]),
    ];
    let mut aligner = ReadAligner::new(reads);

    let node_before = graph.edge(e).node_right;
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    simplifier.remove_unsupported_connections().unwrap();

    assert_eq!(graph.edge(e).node_right, node_before);
    assert_eq!(graph.edge(f).node_left, node_before);
    graph.check_symmetry().unwrap();
}

#[test]
fn low_coverage_loop_is_removed() {
    let mut graph = RepeatGraph::new();
    let m = node_pair(&mut graph);
    let n = node_pair(&mut graph);
    let p = node_pair(&mut graph);
    let (entrance, _) = edge_between(&mut graph, m, n, 200, 20);
    let (loop_edge, loop_rc) = edge_between(&mut graph, n, n, 50, 3);
    let (exit, _) = edge_between(&mut graph, n, p, 200, 20);

    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    let collapsed = simplifier.collapse_heterozygous_loops().unwrap();
    assert_eq!(collapsed, 1);

    // the loop edge dangles between fresh nodes now
    assert!(graph.has_edge(loop_edge));
    assert!(!graph.edge(loop_edge).is_looped());
    assert!(!graph.edge(loop_rc).is_looped());
    let junction = graph.edge(entrance).node_right;
    assert_eq!(graph.node(junction).in_edges, vec![entrance]);
    assert_eq!(graph.node(junction).out_edges, vec![exit]);
    graph.check_symmetry().unwrap();
}

#[test]
fn moderate_coverage_loop_is_unrolled() {
    let mut graph = RepeatGraph::new();
    let m = node_pair(&mut graph);
    let n = node_pair(&mut graph);
    let p = node_pair(&mut graph);
    let (entrance, _) = edge_between(&mut graph, m, n, 200, 20);
    let (loop_edge, _) = edge_between(&mut graph, n, n, 50, 15);
    let (exit, _) = edge_between(&mut graph, n, p, 200, 20);

    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    let collapsed = simplifier.collapse_heterozygous_loops().unwrap();
    assert_eq!(collapsed, 1);

    // entrance -> loop -> exit is linear now
    assert!(!graph.edge(loop_edge).is_looped());
    let spliced = graph.edge(entrance).node_right;
    assert_eq!(graph.node(spliced).out_edges, vec![loop_edge]);
    assert_eq!(graph.node(spliced).in_edges, vec![entrance]);
    assert_eq!(graph.edge(loop_edge).node_right, graph.edge(exit).node_left);
    graph.check_symmetry().unwrap();
}

#[test]
fn weak_tip_is_excised_on_the_complement_strand() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    let x = node_pair(&mut graph);
    let (tip, tip_rc) = edge_between(&mut graph, a, b, 100, 2);
    let (_support, _) = edge_between(&mut graph, x, b, 1000, 20);
    let (downstream, _) = edge_between(&mut graph, b, c, 1000, 20);

    let reads = vec![chained_read(&[(tip, 100), (downstream, 1000)])];
    let mut aligner = ReadAligner::new(reads);
    let config = SimplifyConfig {
        tip_length_threshold: 500,
        ..SimplifyConfig::default()
    };
    let mut simplifier = GraphSimplifier::new(&mut graph, &mut aligner, config);
    let trimmed = simplifier.trim_tips().unwrap();
    assert_eq!(trimmed, 1);

    // the tip survives but is disconnected from the junction
    assert!(graph.has_edge(tip));
    assert!(graph.has_edge(tip_rc));
    assert_ne!(graph.edge(tip).node_right, graph.edge(downstream).node_left);
    assert!(!graph
        .node(graph.edge(downstream).node_left)
        .in_edges
        .contains(&tip));
    graph.check_symmetry().unwrap();
}

#[test]
fn long_tip_is_left_alone() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    let x = node_pair(&mut graph);
    let (tip, _) = edge_between(&mut graph, a, b, 5000, 2);
    let (_support, _) = edge_between(&mut graph, x, b, 1000, 20);
    let (downstream, _) = edge_between(&mut graph, b, c, 1000, 20);

    let reads = vec![chained_read(&[(tip, 5000), (downstream, 1000)])];
    let mut aligner = ReadAligner::new(reads);
    let config = SimplifyConfig {
        tip_length_threshold: 500,
        ..SimplifyConfig::default()
    };
    let mut simplifier = GraphSimplifier::new(&mut graph, &mut aligner, config);
    assert_eq!(simplifier.trim_tips().unwrap(), 0);
    graph.check_symmetry().unwrap();
}

#[test]
fn lower_coverage_bulge_branch_is_popped() {
    let mut graph = RepeatGraph::new();
    let m = node_pair(&mut graph);
    let left = node_pair(&mut graph);
    let right = node_pair(&mut graph);
    let s = node_pair(&mut graph);
    let (entrance, _) = edge_between(&mut graph, m, left, 300, 21);
    let (p, p_rc) = edge_between(&mut graph, left, right, 100, 10);
    let (q, _) = edge_between(&mut graph, left, right, 105, 11);
    let (exit, _) = edge_between(&mut graph, right, s, 300, 20);

    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    let popped = simplifier.collapse_heterozygous_bulges().unwrap();
    assert_eq!(popped, 1);

    // the weaker branch is detached on both strands, the stronger survives
    assert!(graph.has_edge(p));
    assert_ne!(graph.edge(p).node_left, graph.edge(entrance).node_right);
    assert_ne!(graph.edge(p).node_right, graph.edge(exit).node_left);
    assert_ne!(graph.edge(p_rc).node_left, graph.edge(exit).node_left);
    assert_eq!(graph.edge(q).node_left, graph.edge(entrance).node_right);
    assert_eq!(graph.edge(q).node_right, graph.edge(exit).node_left);
    graph.check_symmetry().unwrap();
}

#[test]
fn unbalanced_bulge_is_kept() {
    let mut graph = RepeatGraph::new();
    let m = node_pair(&mut graph);
    let left = node_pair(&mut graph);
    let right = node_pair(&mut graph);
    let s = node_pair(&mut graph);
    // branch coverages sum to 21 but the entrance carries 40
    let (_entrance, _) = edge_between(&mut graph, m, left, 300, 40);
    let (p, _) = edge_between(&mut graph, left, right, 100, 10);
    let (q, _) = edge_between(&mut graph, left, right, 105, 11);
    let (_exit, _) = edge_between(&mut graph, right, s, 300, 40);

    let left_node = graph.edge(p).node_left;
    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    assert_eq!(simplifier.collapse_heterozygous_bulges().unwrap(), 0);
    assert_eq!(graph.edge(p).node_left, left_node);
    assert_eq!(graph.edge(q).node_left, left_node);
}

#[test]
fn passes_are_noops_on_a_graph_with_no_reads() {
    // bifurcation-free chain: nothing for any pass to act on
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    edge_between(&mut graph, a, b, 1000, 10);
    edge_between(&mut graph, b, c, 1000, 10);

    let edges_before = graph.num_edges();
    let nodes_before = graph.num_nodes();

    let mut aligner = ReadAligner::new(vec![]);
    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    assert_eq!(simplifier.remove_unsupported_edges().unwrap(), 0);
    assert_eq!(simplifier.remove_unsupported_connections().unwrap(), 0);
    assert_eq!(simplifier.collapse_heterozygous_loops().unwrap(), 0);
    assert_eq!(simplifier.trim_tips().unwrap(), 0);
    assert_eq!(simplifier.collapse_heterozygous_bulges().unwrap(), 0);

    assert_eq!(graph.num_edges(), edges_before);
    assert_eq!(graph.num_nodes(), nodes_before);
    graph.check_symmetry().unwrap();
}

#[test]
fn full_pipeline_runs_and_keeps_symmetry() {
    let mut graph = RepeatGraph::new();
    let a = node_pair(&mut graph);
    let b = node_pair(&mut graph);
    let c = node_pair(&mut graph);
    let (main1, main1_rc) = edge_between(&mut graph, a, b, 1000, 0);
    let (main2, main2_rc) = edge_between(&mut graph, b, c, 1000, 0);

    let mut reads = Vec::new();
    for _ in 0..10 {
        reads.push(chained_read(&[(main1, 1000), (main2, 1000)]));
        reads.push(chained_read(&[(main2_rc, 1000), (main1_rc, 1000)]));
    }
    let mut aligner = ReadAligner::new(reads);

    let mut simplifier =
        GraphSimplifier::new(&mut graph, &mut aligner, SimplifyConfig::default());
    let summary = simplifier.simplify().unwrap();
    assert!(simplifier.mean_coverage() > 0);

    assert_eq!(summary.unsupported_edges, 0);
    assert_eq!(summary.popped_bulges, 0);
    assert_eq!(graph.num_edges(), 4);
    graph.check_symmetry().unwrap();
}
