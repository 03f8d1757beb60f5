//! Tests for diagram construction, structural invariants, and validity

use macid::{
    AgentId, Diagram, DecisionRule, Distribution, Error, NodeKind, TabularDistribution,
    TabularRule, UtilityFunction,
};

fn agent(id: u32) -> AgentId {
    AgentId::new(id)
}

#[test]
fn failed_cycle_edge_leaves_the_graph_unchanged() {
    let mut diagram = Diagram::new();
    diagram.add_chance("A").unwrap();
    diagram.add_chance("B").unwrap();
    diagram.add_chance("C").unwrap();
    diagram.add_edge("A", "B").unwrap();
    diagram.add_edge("B", "C").unwrap();

    let edges_before = diagram.edges();
    let version_before = diagram.version();

    let err = diagram.add_edge("C", "A").unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));

    assert_eq!(diagram.edges(), edges_before, "graph must be unchanged");
    assert_eq!(diagram.version(), version_before, "no version bump on failure");
}

#[test]
fn unknown_endpoints_are_reported() {
    let mut diagram = Diagram::new();
    diagram.add_chance("A").unwrap();
    assert!(matches!(
        diagram.add_edge("A", "missing"),
        Err(Error::UnknownNode { .. })
    ));
    assert!(matches!(
        diagram.add_edge("missing", "A"),
        Err(Error::UnknownNode { .. })
    ));
}

#[test]
fn utility_nodes_stay_sinks() {
    let mut diagram = Diagram::new();
    diagram.add_utility("U", agent(0)).unwrap();
    diagram.add_chance("X").unwrap();
    assert!(matches!(
        diagram.add_edge("U", "X"),
        Err(Error::UtilityHasChildren { .. })
    ));
}

#[test]
fn topological_order_is_deterministic_across_clones() {
    let mut diagram = Diagram::new();
    for name in ["C", "A", "B", "D"] {
        diagram.add_chance(name).unwrap();
    }
    diagram.add_edge("A", "B").unwrap();
    diagram.add_edge("C", "B").unwrap();
    diagram.add_edge("B", "D").unwrap();

    let order = diagram.topological_order();
    assert_eq!(order, diagram.clone().topological_order());

    // Roots come out in insertion order: C was inserted before A.
    assert_eq!(order[0], "C");
    assert_eq!(order[1], "A");
    assert_eq!(order[3], "D");
}

#[test]
fn removing_a_node_strips_incident_edges() {
    let mut diagram = Diagram::new();
    diagram.add_chance("A").unwrap();
    diagram.add_chance("B").unwrap();
    diagram.add_chance("C").unwrap();
    diagram.add_edge("A", "B").unwrap();
    diagram.add_edge("B", "C").unwrap();

    diagram.remove_node("B").unwrap();
    assert!(!diagram.contains("B"));
    assert!(diagram.edges().is_empty());
    assert!(diagram.children_of("A").unwrap().is_empty());
    assert!(diagram.parents_of("C").unwrap().is_empty());
}

#[test]
fn validity_requires_all_attachments() {
    let mut diagram = Diagram::new();
    diagram.add_chance("S").unwrap();
    diagram.add_decision("D", agent(0)).unwrap();
    diagram.add_utility("U", agent(0)).unwrap();
    diagram.add_edge("S", "D").unwrap();
    diagram.add_edge("D", "U").unwrap();
    assert!(!diagram.is_valid(), "nothing attached yet");

    diagram
        .attach_distribution("S", Distribution::uniform([0, 1]))
        .unwrap();
    diagram.set_decision_domain("D", [0, 1]).unwrap();
    assert!(!diagram.is_valid(), "utility still missing");

    diagram
        .attach_utility(
            "U",
            UtilityFunction::from_fn(["D"], |v| v.value_of("D") as f64),
        )
        .unwrap();
    assert!(diagram.is_valid());
}

#[test]
fn tabular_rows_are_validated_at_attach_time() {
    let mut diagram = Diagram::new();
    diagram.add_chance("P").unwrap();
    diagram.add_chance("X").unwrap();
    diagram.add_edge("P", "X").unwrap();
    diagram
        .attach_distribution("P", Distribution::uniform([0, 1]))
        .unwrap();

    // Row does not sum to 1.
    let bad = TabularDistribution::new(["P"], [0, 1])
        .with_row(&[0], vec![0.7, 0.7])
        .with_row(&[1], vec![0.5, 0.5]);
    assert!(matches!(
        diagram.attach_distribution("X", Distribution::Table(bad)),
        Err(Error::InvalidDistribution { .. })
    ));

    // Declared parents disagree with the diagram.
    let wrong_parents = TabularDistribution::new(["Q"], [0, 1]).with_row(&[0], vec![0.5, 0.5]);
    assert!(matches!(
        diagram.attach_distribution("X", Distribution::Table(wrong_parents)),
        Err(Error::DomainMismatch { .. })
    ));
}

#[test]
fn incomplete_tables_fail_validation() {
    let mut diagram = Diagram::new();
    diagram.add_chance("P").unwrap();
    diagram.add_chance("X").unwrap();
    diagram.add_edge("P", "X").unwrap();
    diagram
        .attach_distribution("P", Distribution::uniform([0, 1]))
        .unwrap();

    // Only one of the two P contexts is covered.
    let partial = TabularDistribution::new(["P"], [0, 1]).with_row(&[0], vec![0.5, 0.5]);
    diagram
        .attach_distribution("X", Distribution::Table(partial))
        .unwrap();

    assert!(matches!(
        diagram.validate(),
        Err(Error::DomainMismatch { .. })
    ));
}

#[test]
fn wrong_attachment_kind_is_rejected() {
    let mut diagram = Diagram::new();
    diagram.add_chance("S").unwrap();
    assert!(matches!(
        diagram.attach_decision_rule("S", DecisionRule::domain([0, 1])),
        Err(Error::WrongAttachment { .. })
    ));
    assert!(matches!(
        diagram.attach_utility("S", UtilityFunction::from_fn::<[&str; 0], _>([], |_| 0.0)),
        Err(Error::WrongAttachment { .. })
    ));
}

#[test]
fn structural_edits_invalidate_solved_profiles() {
    let mut diagram = Diagram::new();
    diagram.add_decision("D", agent(0)).unwrap();
    diagram.add_utility("U", agent(0)).unwrap();
    diagram.add_edge("D", "U").unwrap();
    diagram
        .attach_utility(
            "U",
            UtilityFunction::from_fn(["D"], |v| v.value_of("D") as f64),
        )
        .unwrap();

    let rule = TabularRule::new(Vec::<macid::NodeName>::new(), [0, 1]).with_row(&[], vec![0.0, 1.0]);
    diagram
        .attach_decision_rule("D", DecisionRule::Resolved(rule))
        .unwrap();
    assert!(diagram.fully_resolved());

    // A new edge into the diagram demotes the solved profile.
    diagram.add_chance("S").unwrap();
    assert!(diagram.fully_resolved(), "adding a node alone keeps rules");
    diagram.add_edge("S", "D").unwrap();
    assert!(!diagram.fully_resolved());

    // The action domain survives the demotion.
    match diagram.decision_rule("D").unwrap() {
        Some(rule) => assert_eq!(rule.actions().len(), 2),
        None => panic!("rule placeholder must remain"),
    }
}

#[test]
fn agents_are_collected_from_node_kinds() {
    let mut diagram = Diagram::new();
    diagram.add_decision("D1", agent(2)).unwrap();
    diagram.add_decision("D2", agent(0)).unwrap();
    diagram.add_utility("U1", agent(2)).unwrap();
    diagram.add_utility("U0", agent(0)).unwrap();

    assert_eq!(diagram.agents(), vec![agent(0), agent(2)]);
    assert_eq!(diagram.decisions_of(agent(2)), vec!["D1"]);
    assert_eq!(diagram.utilities_of(agent(0)), vec!["U0"]);
    assert_eq!(diagram.kind_of("D1").unwrap(), NodeKind::Decision(agent(2)));

    diagram.add_chance("S").unwrap();
    assert_eq!(diagram.chance_nodes(), vec!["S"]);
    assert_eq!(diagram.decisions(), vec!["D1", "D2"]);
    assert_eq!(diagram.utilities(), vec!["U1", "U0"]);
}
