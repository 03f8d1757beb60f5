//! Tests for path activity and d-separation

use std::collections::BTreeSet;

use macid::{
    Diagram, NodeName,
    paths::{active_paths, d_separated, directed_paths, is_active, undirected_paths},
};

fn names(list: &[&str]) -> Vec<NodeName> {
    list.iter().map(|s| NodeName::new(*s)).collect()
}

fn observed(list: &[&str]) -> BTreeSet<NodeName> {
    list.iter().map(|s| NodeName::new(*s)).collect()
}

/// Fork F -> A, F -> B; chain A -> M -> B; collider A -> C <- B; C -> E.
fn fixture() -> Diagram {
    let mut diagram = Diagram::new();
    for name in ["F", "A", "M", "B", "C", "E"] {
        diagram.add_chance(name).unwrap();
    }
    diagram.add_edge("F", "A").unwrap();
    diagram.add_edge("F", "B").unwrap();
    diagram.add_edge("A", "M").unwrap();
    diagram.add_edge("M", "B").unwrap();
    diagram.add_edge("A", "C").unwrap();
    diagram.add_edge("B", "C").unwrap();
    diagram.add_edge("C", "E").unwrap();
    diagram
}

#[test]
fn chain_fork_and_collider_patterns() {
    let diagram = fixture();

    let chain = names(&["A", "M", "B"]);
    assert!(is_active(&diagram, &chain, &observed(&[])).unwrap());
    assert!(!is_active(&diagram, &chain, &observed(&["M"])).unwrap());

    let fork = names(&["A", "F", "B"]);
    assert!(is_active(&diagram, &fork, &observed(&[])).unwrap());
    assert!(!is_active(&diagram, &fork, &observed(&["F"])).unwrap());

    let collider = names(&["A", "C", "B"]);
    assert!(!is_active(&diagram, &collider, &observed(&[])).unwrap());
    assert!(is_active(&diagram, &collider, &observed(&["C"])).unwrap());
    assert!(is_active(&diagram, &collider, &observed(&["E"])).unwrap());
}

#[test]
fn d_separation_is_symmetric_on_every_conditioning_set() {
    let diagram = fixture();
    let node_names = ["F", "A", "M", "B", "C", "E"];

    // All subsets of {F, M, C, E} as conditioning sets.
    let pool = ["F", "M", "C", "E"];
    for mask in 0..(1usize << pool.len()) {
        let obs: BTreeSet<NodeName> = pool
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, s)| NodeName::new(*s))
            .collect();
        for x in node_names {
            for y in node_names {
                let forward = d_separated(&diagram, &names(&[x]), &names(&[y]), &obs).unwrap();
                let backward = d_separated(&diagram, &names(&[y]), &names(&[x]), &obs).unwrap();
                assert_eq!(forward, backward, "asymmetry for {x}/{y} given {obs:?}");
            }
        }
    }
}

#[test]
fn observing_chain_and_fork_nodes_only_blocks() {
    let diagram = fixture();
    let a = names(&["A"]);
    let b = names(&["B"]);

    // Baseline: connected via fork F and chain M.
    assert!(!d_separated(&diagram, &a, &b, &observed(&[])).unwrap());
    // Closing both non-collider routes separates A and B.
    assert!(d_separated(&diagram, &a, &b, &observed(&["F", "M"])).unwrap());

    // Monotonicity of non-collider conditioning: growing the observed set
    // by a chain/fork node can only remove active paths, never add one.
    let chains = [
        (observed(&[]), observed(&["F"])),
        (observed(&[]), observed(&["M"])),
        (observed(&["F"]), observed(&["F", "M"])),
        (observed(&["M"]), observed(&["F", "M"])),
    ];
    for (smaller_obs, larger_obs) in chains {
        let with_more = active_paths(&diagram, "A", "B", &larger_obs).unwrap();
        let with_less = active_paths(&diagram, "A", "B", &smaller_obs).unwrap();
        for path in &with_more {
            assert!(
                with_less.contains(path),
                "conditioning on chain/fork nodes must never activate {path:?}"
            );
        }
        assert!(with_more.len() <= with_less.len());
    }
}

#[test]
fn observing_a_collider_or_its_descendant_only_activates() {
    let diagram = fixture();

    // With F and M blocked, only the collider route A -> C <- B remains.
    let base = observed(&["F", "M"]);
    assert!(d_separated(&diagram, &names(&["A"]), &names(&["B"]), &base).unwrap());

    for extra in ["C", "E"] {
        let mut obs = base.clone();
        obs.insert(NodeName::new(extra));
        assert!(
            !d_separated(&diagram, &names(&["A"]), &names(&["B"]), &obs).unwrap(),
            "observing {extra} must open the collider path"
        );
        let opened = active_paths(&diagram, "A", "B", &obs).unwrap();
        assert!(opened.contains(&names(&["A", "C", "B"])));
    }
}

#[test]
fn overlapping_sets_are_never_separated() {
    let diagram = fixture();
    assert!(
        !d_separated(&diagram, &names(&["A", "M"]), &names(&["M"]), &observed(&[])).unwrap()
    );
}

#[test]
fn directed_and_undirected_path_enumeration() {
    let diagram = fixture();

    let directed = directed_paths(&diagram, "F", "C").unwrap();
    assert_eq!(directed.len(), 3, "F->A->C, F->A->M->B->C, F->B->C");
    for path in &directed {
        for pair in path.windows(2) {
            assert!(diagram.has_edge(pair[0].as_str(), pair[1].as_str()));
        }
    }

    let undirected = undirected_paths(&diagram, "E", "F").unwrap();
    assert!(!undirected.is_empty());
    assert!(undirected.iter().all(|p| p.first().unwrap().as_str() == "E"));
    assert!(undirected.iter().all(|p| p.last().unwrap().as_str() == "F"));
}
