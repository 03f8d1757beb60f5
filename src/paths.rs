//! Path classification and d-separation over diagram structure.
//!
//! Everything here is pure graph reasoning: numeric content of the diagram is
//! ignored, and no function mutates anything. A path between two nodes walks
//! edges in either direction without revisiting a node; it is *active* under
//! a conditioning set when every interior node lets dependence through:
//!
//! - a chain or fork node blocks iff it is observed;
//! - a collider blocks iff neither it nor any of its descendants is observed.

use std::collections::BTreeSet;

use crate::{Error, Result, diagram::Diagram, identifiers::NodeName};

/// Find all directed paths from `from` to `to` (simple paths, no revisits).
///
/// Paths are returned in depth-first order following edge insertion order,
/// each as the full node sequence including both endpoints. `from == to`
/// yields the single trivial path `[from]`.
pub fn directed_paths(diagram: &Diagram, from: &str, to: &str) -> Result<Vec<Vec<NodeName>>> {
    diagram.require(from)?;
    diagram.require(to)?;

    let mut paths = Vec::new();
    let mut current = vec![NodeName::new(from)];
    let mut visited: BTreeSet<NodeName> = current.iter().cloned().collect();
    directed_dfs(diagram, to, &mut current, &mut visited, &mut paths)?;
    Ok(paths)
}

fn directed_dfs(
    diagram: &Diagram,
    to: &str,
    current: &mut Vec<NodeName>,
    visited: &mut BTreeSet<NodeName>,
    paths: &mut Vec<Vec<NodeName>>,
) -> Result<()> {
    let last = current.last().expect("path is never empty").clone();
    if last.as_str() == to {
        paths.push(current.clone());
        return Ok(());
    }
    for child in diagram.children_of(last.as_str())? {
        if visited.contains(&child) {
            continue;
        }
        visited.insert(child.clone());
        current.push(child.clone());
        directed_dfs(diagram, to, current, visited, paths)?;
        current.pop();
        visited.remove(&child);
    }
    Ok(())
}

/// Find all undirected paths from `from` to `to` (simple paths, no revisits).
pub fn undirected_paths(diagram: &Diagram, from: &str, to: &str) -> Result<Vec<Vec<NodeName>>> {
    diagram.require(from)?;
    diagram.require(to)?;

    let mut paths = Vec::new();
    let mut current = vec![NodeName::new(from)];
    let mut visited: BTreeSet<NodeName> = current.iter().cloned().collect();
    undirected_dfs(diagram, to, &mut current, &mut visited, &mut paths)?;
    Ok(paths)
}

fn undirected_dfs(
    diagram: &Diagram,
    to: &str,
    current: &mut Vec<NodeName>,
    visited: &mut BTreeSet<NodeName>,
    paths: &mut Vec<Vec<NodeName>>,
) -> Result<()> {
    let last = current.last().expect("path is never empty").clone();
    if last.as_str() == to {
        paths.push(current.clone());
        return Ok(());
    }
    let mut neighbors = diagram.children_of(last.as_str())?;
    neighbors.extend(diagram.parents_of(last.as_str())?);
    for neighbor in neighbors {
        if visited.contains(&neighbor) {
            continue;
        }
        visited.insert(neighbor.clone());
        current.push(neighbor.clone());
        undirected_dfs(diagram, to, current, visited, paths)?;
        current.pop();
        visited.remove(&neighbor);
    }
    Ok(())
}

/// Classify a path as active or inactive under a conditioning set.
///
/// The path is given as its full node sequence; consecutive nodes must be
/// connected by an edge in either direction.
///
/// # Errors
///
/// [`Error::UnknownNode`] if a path node is absent from the diagram;
/// [`Error::InvalidPath`] if consecutive nodes are not adjacent.
pub fn is_active(
    diagram: &Diagram,
    path: &[NodeName],
    observed: &BTreeSet<NodeName>,
) -> Result<bool> {
    for node in path {
        diagram.require(node.as_str())?;
    }
    for window in path.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        if !diagram.has_edge(a.as_str(), b.as_str()) && !diagram.has_edge(b.as_str(), a.as_str()) {
            return Err(Error::InvalidPath {
                reason: format!("'{a}' and '{b}' are not adjacent"),
            });
        }
    }

    for window in path.windows(3) {
        let (prev, mid, next) = (&window[0], &window[1], &window[2]);
        let into_from_prev = diagram.has_edge(prev.as_str(), mid.as_str());
        let into_from_next = diagram.has_edge(next.as_str(), mid.as_str());
        let collider = into_from_prev && into_from_next;

        if collider {
            let observed_here = observed.contains(mid)
                || diagram
                    .descendants(mid.as_str())?
                    .iter()
                    .any(|d| observed.contains(d));
            if !observed_here {
                return Ok(false);
            }
        } else if observed.contains(mid) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Find all active paths from `from` to `to` under a conditioning set.
pub fn active_paths(
    diagram: &Diagram,
    from: &str,
    to: &str,
    observed: &BTreeSet<NodeName>,
) -> Result<Vec<Vec<NodeName>>> {
    let mut active = Vec::new();
    for path in undirected_paths(diagram, from, to)? {
        if is_active(diagram, &path, observed)? {
            active.push(path);
        }
    }
    Ok(active)
}

/// The first active path from `from` to `to`, if any (deterministic order).
pub fn first_active_path(
    diagram: &Diagram,
    from: &str,
    to: &str,
    observed: &BTreeSet<NodeName>,
) -> Result<Option<Vec<NodeName>>> {
    for path in undirected_paths(diagram, from, to)? {
        if is_active(diagram, &path, observed)? {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Whether node sets `a` and `b` are d-separated given `observed`.
///
/// True iff no active path connects any node of `a` to any node of `b`.
/// Overlapping sets are never separated (a shared node is a trivial active
/// path). Symmetric in `a` and `b`.
pub fn d_separated(
    diagram: &Diagram,
    a: &[NodeName],
    b: &[NodeName],
    observed: &BTreeSet<NodeName>,
) -> Result<bool> {
    for x in a {
        for y in b {
            if x == y {
                return Ok(false);
            }
            if first_active_path(diagram, x.as_str(), y.as_str(), observed)?.is_some() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<NodeName> {
        list.iter().map(|s| NodeName::new(*s)).collect()
    }

    fn observed(list: &[&str]) -> BTreeSet<NodeName> {
        list.iter().map(|s| NodeName::new(*s)).collect()
    }

    /// Chain A -> M -> B plus collider A -> C <- B with child E of C.
    fn fixture() -> Diagram {
        let mut diagram = Diagram::new();
        for name in ["A", "M", "B", "C", "E"] {
            diagram.add_chance(name).unwrap();
        }
        diagram.add_edge("A", "M").unwrap();
        diagram.add_edge("M", "B").unwrap();
        diagram.add_edge("A", "C").unwrap();
        diagram.add_edge("B", "C").unwrap();
        diagram.add_edge("C", "E").unwrap();
        diagram
    }

    #[test]
    fn chain_blocks_when_mediator_observed() {
        let diagram = fixture();
        let chain = names(&["A", "M", "B"]);
        assert!(is_active(&diagram, &chain, &observed(&[])).unwrap());
        assert!(!is_active(&diagram, &chain, &observed(&["M"])).unwrap());
    }

    #[test]
    fn collider_activates_when_observed() {
        let diagram = fixture();
        let collider = names(&["A", "C", "B"]);
        assert!(!is_active(&diagram, &collider, &observed(&[])).unwrap());
        assert!(is_active(&diagram, &collider, &observed(&["C"])).unwrap());
        // A descendant of the collider also activates it
        assert!(is_active(&diagram, &collider, &observed(&["E"])).unwrap());
    }

    #[test]
    fn d_separation_requires_blocking_all_paths() {
        let diagram = fixture();
        let a = names(&["A"]);
        let b = names(&["B"]);

        // Chain open, collider closed: connected.
        assert!(!d_separated(&diagram, &a, &b, &observed(&[])).unwrap());
        // Observing M closes the chain and the collider stays closed.
        assert!(d_separated(&diagram, &a, &b, &observed(&["M"])).unwrap());
        // Observing M and C closes the chain but opens the collider.
        assert!(!d_separated(&diagram, &a, &b, &observed(&["M", "C"])).unwrap());
    }

    #[test]
    fn d_separation_is_symmetric() {
        let diagram = fixture();
        let a = names(&["A"]);
        let b = names(&["B"]);
        for obs in [observed(&[]), observed(&["M"]), observed(&["M", "E"])] {
            assert_eq!(
                d_separated(&diagram, &a, &b, &obs).unwrap(),
                d_separated(&diagram, &b, &a, &obs).unwrap(),
            );
        }
    }

    #[test]
    fn directed_paths_do_not_walk_backwards() {
        let diagram = fixture();
        let paths = directed_paths(&diagram, "A", "B").unwrap();
        assert_eq!(paths, vec![names(&["A", "M", "B"])]);
        assert!(directed_paths(&diagram, "B", "A").unwrap().is_empty());
    }

    #[test]
    fn non_adjacent_path_is_invalid() {
        let diagram = fixture();
        let broken = names(&["A", "B"]);
        assert!(matches!(
            is_active(&diagram, &broken, &observed(&[])),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn unknown_node_is_reported() {
        let diagram = fixture();
        assert!(matches!(
            directed_paths(&diagram, "A", "Z"),
            Err(Error::UnknownNode { .. })
        ));
    }
}
