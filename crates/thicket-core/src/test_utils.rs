//! Test utilities for thicket

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::ids::IdGenerator;
use crate::model::{EdgeId, NodeId, ViewId};
use crate::structure::Structure;

/// Create an empty main-view structure with default configuration
pub fn new_structure() -> Structure {
    Structure::new(ViewId::MAIN, Arc::new(IdGenerator::new()), StoreConfig::default())
}

/// Two collapsed clusters: `a` over `a1`, `a2` and `b` over `b1`, with
/// edges `a1 -> b1` (weight 1) and `a2 -> b1` (weight 2).
pub struct Clustered {
    pub structure: Structure,
    pub a: NodeId,
    pub a1: NodeId,
    pub a2: NodeId,
    pub b: NodeId,
    pub b1: NodeId,
    pub a1_b1: EdgeId,
    pub a2_b1: EdgeId,
}

pub fn clustered() -> Clustered {
    let mut structure = new_structure();
    let a1 = structure.add_node(None).unwrap();
    let a2 = structure.add_node(None).unwrap();
    let b1 = structure.add_node(None).unwrap();
    let a1_b1 = structure.add_edge(a1, b1, 1.0, true).unwrap();
    let a2_b1 = structure.add_edge(a2, b1, 2.0, true).unwrap();
    let a = structure.group(&[a1, a2]).unwrap();
    let b = structure.group(&[b1]).unwrap();

    Clustered {
        structure,
        a,
        a1,
        a2,
        b,
        b1,
        a1_b1,
        a2_b1,
    }
}

/// Top-level `x` (children `x1`, `x2`) followed by a leaf `y`.
pub struct DescendantScenario {
    pub structure: Structure,
    pub x: NodeId,
    pub x1: NodeId,
    pub x2: NodeId,
    pub y: NodeId,
}

pub fn descendant_scenario() -> DescendantScenario {
    let mut structure = new_structure();
    let x = structure.add_node(None).unwrap();
    let x1 = structure.add_node(Some(x)).unwrap();
    let x2 = structure.add_node(Some(x)).unwrap();
    let y = structure.add_node(None).unwrap();
    DescendantScenario {
        structure,
        x,
        x1,
        x2,
        y,
    }
}

/// Depth-3 tree: `left` and `right` at level 1, each with three children
/// and two grandchildren per child.
pub struct ThreeLevels {
    pub structure: Structure,
    pub left: NodeId,
    pub right: NodeId,
    pub left_children: Vec<NodeId>,
    pub right_children: Vec<NodeId>,
}

pub fn three_levels() -> ThreeLevels {
    let mut structure = new_structure();
    let left = structure.add_node(None).unwrap();
    let right = structure.add_node(None).unwrap();
    let mut branches = Vec::new();
    for top in [left, right] {
        let mut children = Vec::new();
        for _ in 0..3 {
            let child = structure.add_node(Some(top)).unwrap();
            for _ in 0..2 {
                structure.add_node(Some(child)).unwrap();
            }
            children.push(child);
        }
        branches.push(children);
    }
    let right_children = branches.pop().unwrap();
    let left_children = branches.pop().unwrap();

    ThreeLevels {
        structure,
        left,
        right,
        left_children,
        right_children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        clustered().structure.validate().unwrap();
        descendant_scenario().structure.validate().unwrap();

        let tree = three_levels();
        tree.structure.validate().unwrap();
        assert_eq!(tree.structure.node_count(), 2 + 6 + 12);
        assert_eq!(tree.structure.height(), 3);
    }
}
