//! Candidate search and ranked candidate lists.
//!
//! Searching the whole opposite tree for a partner is quadratic. Instead the
//! search starts from an *anchor* in the other tree (usually the node at the
//! same position) and only looks at a window around it: nearby siblings,
//! cousins, a few levels of descendants and a few levels of ancestors.

use crate::DiffConfig;
use crate::tree::Tree;
use indextree::NodeId;

/// Siblings of `node` within `round(len × distance)` positions, nearest
/// first, alternating left then right.
pub fn siblings(tree: &Tree, node: NodeId, distance: f64) -> Vec<NodeId> {
    let Some(parent) = tree.parent(node) else {
        return Vec::new();
    };
    let nodes = tree.child_vec(parent);
    let index = tree.position(node);
    let window = (nodes.len() as f64 * distance).round() as usize;
    let mut out = Vec::with_capacity(window * 2);
    for step in 1..=window {
        if let Some(left) = index.checked_sub(step) {
            out.push(nodes[left]);
        }
        if let Some(&right) = nodes.get(index + step) {
            out.push(right);
        }
    }
    out
}

/// Nodes of `y_tree` near `anchor` whose kind equals the kind of `x`.
///
/// Order: the anchor and its siblings, the children of the anchor's
/// parent's siblings, descendants of the first group level by level, then
/// ancestors together with their siblings. Duplicates are possible; the
/// virtual root is never returned.
pub fn find_candidates(
    x_tree: &Tree,
    x: NodeId,
    y_tree: &Tree,
    anchor: NodeId,
    config: &DiffConfig,
) -> Vec<NodeId> {
    let kind = x_tree.kind(x);
    let keep = |n: &NodeId| !y_tree.is_root(*n) && y_tree.kind(*n) == kind;
    let distance = config.distance_threshold;
    let depth = config.depth_threshold;

    let mut level = vec![anchor];
    level.extend(siblings(y_tree, anchor, distance));
    let mut out: Vec<NodeId> = level.iter().copied().filter(keep).collect();

    if let Some(parent) = y_tree.parent(anchor) {
        for uncle in siblings(y_tree, parent, distance) {
            out.extend(y_tree.children(uncle).filter(keep));
        }
    }

    for _ in 0..depth {
        let next: Vec<NodeId> = level.iter().flat_map(|&n| y_tree.children(n)).collect();
        if next.is_empty() {
            break;
        }
        out.extend(next.iter().copied().filter(keep));
        level = next;
    }

    let mut ancestor = y_tree.parent(anchor);
    for _ in 0..depth {
        let Some(p) = ancestor else {
            break;
        };
        if keep(&p) {
            out.push(p);
        }
        out.extend(siblings(y_tree, p, distance).into_iter().filter(keep));
        ancestor = y_tree.parent(p);
    }

    out
}

/// Candidates for one node, best score first.
///
/// Ties keep insertion order, so the earliest-found candidate wins.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    entries: Vec<(NodeId, f64)>,
}

impl CandidateList {
    /// Record a candidate.
    pub fn add(&mut self, node: NodeId, score: f64) {
        let at = self.entries.partition_point(|&(_, s)| s >= score);
        self.entries.insert(at, (node, score));
    }

    /// The top-ranked candidate.
    pub fn best(&self) -> Option<NodeId> {
        self.entries.first().map(|&(node, _)| node)
    }

    /// Number of recorded candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Candidate lists for every node of one tree, indexed by `NodeId`.
#[derive(Debug)]
pub(crate) struct Candidates {
    lists: Vec<CandidateList>,
}

impl Candidates {
    pub(crate) fn for_tree(tree: &Tree) -> Self {
        Self {
            lists: vec![CandidateList::default(); tree.arena().count() + 1],
        }
    }

    pub(crate) fn add(&mut self, of: NodeId, node: NodeId, score: f64) {
        if let Some(list) = self.lists.get_mut(usize::from(of)) {
            list.add(node, score);
        }
    }

    pub(crate) fn best(&self, of: NodeId) -> Option<NodeId> {
        self.lists.get(usize::from(of)).and_then(CandidateList::best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeData, TreeBuilder};
    use facet_testhelpers::test;

    /// root -> block -> [s0 .. s9], each statement holding one identifier
    fn statements(n: usize) -> (Tree, Vec<NodeId>) {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let block = b.add_child(root, NodeData::new("block").block());
        let mut ids = Vec::new();
        for i in 0..n {
            let s = b.add_child(block, NodeData::new("return_statement"));
            b.add_child(s, NodeData::with_value("identifier", &i.to_string()));
            ids.push(s);
        }
        (b.finish(), ids)
    }

    #[test]
    fn test_siblings_alternate_outward() {
        let (tree, ids) = statements(10);
        // window = round(10 * 0.5) = 5
        let got = siblings(&tree, ids[4], 0.5);
        assert_eq!(
            got,
            vec![ids[3], ids[5], ids[2], ids[6], ids[1], ids[7], ids[0], ids[8], ids[9]]
        );
        assert!(siblings(&tree, ids[4], 0.0).is_empty());
        assert!(siblings(&tree, tree.root(), 0.5).is_empty());
    }

    #[test]
    fn test_candidates_are_filtered_by_kind() {
        let (tree, ids) = statements(4);
        let config = DiffConfig::default();
        let got = find_candidates(&tree, ids[0], &tree, ids[1], &config);
        assert!(got.iter().all(|&n| tree.kind(n) == "return_statement"));
        assert_eq!(got[0], ids[1]);
        assert!(got.contains(&ids[3]));
    }

    #[test]
    fn test_candidates_reach_ancestors() {
        let (tree, ids) = statements(2);
        let block = tree.parent(ids[0]).unwrap();
        let config = DiffConfig::default();
        let leaf = tree.children(ids[0]).next().unwrap();
        let got = find_candidates(&tree, block, &tree, leaf, &config);
        assert_eq!(got, vec![block]);
    }

    #[test]
    fn test_candidate_list_ranking() {
        let (tree, ids) = statements(3);
        let _ = tree;
        let mut list = CandidateList::default();
        list.add(ids[0], 0.7);
        list.add(ids[1], 0.9);
        list.add(ids[2], 0.9);
        assert_eq!(list.best(), Some(ids[1]));
        assert_eq!(list.len(), 3);
    }
}
