//! Edit script generation from a matching.
//!
//! Passes, in order:
//! 1. Delete: every unmatched before node, nested under the enclosing delete.
//! 2. Insert/Move/Update over the after tree: unmatched nodes are inserted,
//!    matched nodes whose parent changed are moved, relabeled pairs updated.
//! 3. Replace inference (see `replace.rs`).
//! 4. Ordering changes: children of a matched pair that fall outside the LCS
//!    of the two child lists are moved.
//! 5. Optional move split (see `split.rs`).
//!
//! Structure follows Chawathe et al., "Change Detection in Hierarchically
//! Structured Information" (1996), with nesting of subsumed operations.

use crate::lcs::LcsTable;
use crate::matching::{MatchStats, Matching, Side};
use crate::script::{Action, EditOp, EditScript, OpKind};
use crate::tree::Tree;
use crate::{DiffConfig, debug, trace};
use indextree::{NodeEdge, NodeId};

/// Per-node change tags, one table per tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Change {
    #[default]
    Unchanged,
    Inserted,
    Deleted,
}

#[derive(Debug)]
pub(crate) struct ChangeMarks {
    before: Vec<Change>,
    after: Vec<Change>,
}

impl ChangeMarks {
    fn for_trees(before: &Tree, after: &Tree) -> Self {
        Self {
            before: vec![Change::Unchanged; before.arena().count() + 1],
            after: vec![Change::Unchanged; after.arena().count() + 1],
        }
    }

    fn table_mut(&mut self, side: Side) -> &mut Vec<Change> {
        match side {
            Side::Before => &mut self.before,
            Side::After => &mut self.after,
        }
    }

    pub(crate) fn set(&mut self, side: Side, node: NodeId, change: Change) {
        if let Some(slot) = self.table_mut(side).get_mut(usize::from(node)) {
            *slot = change;
        }
    }

    pub(crate) fn get(&self, side: Side, node: NodeId) -> Change {
        let table = match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        };
        table.get(usize::from(node)).copied().unwrap_or_default()
    }

    /// Inserted or deleted.
    pub(crate) fn is_changed(&self, side: Side, node: NodeId) -> bool {
        self.get(side, node) != Change::Unchanged
    }
}

/// Operations under construction, addressed by index so that an open
/// operation can receive nested ones while its subtree is walked.
#[derive(Default)]
struct OpForest {
    actions: Vec<Action>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl OpForest {
    fn open(&mut self, action: Action, under: Option<usize>) -> usize {
        debug!(%action, nested = under.is_some(), "emit");
        let index = self.actions.len();
        self.actions.push(action);
        self.children.push(Vec::new());
        match under {
            Some(parent) => self.children[parent].push(index),
            None => self.roots.push(index),
        }
        index
    }

    fn into_ops(self) -> Vec<EditOp> {
        let Self {
            actions,
            mut children,
            roots,
        } = self;
        let mut built: Vec<Option<EditOp>> = actions.into_iter().map(|a| Some(EditOp::new(a))).collect();
        // nested operations always have a larger index than their parent
        for i in (0..built.len()).rev() {
            let nested: Vec<EditOp> = core::mem::take(&mut children[i])
                .into_iter()
                .filter_map(|k| built[k].take())
                .collect();
            if let Some(op) = built[i].as_mut() {
                op.children = nested;
            }
        }
        roots.into_iter().filter_map(|r| built[r].take()).collect()
    }
}

/// Generate the edit script turning `before` into `after` under `matching`.
pub fn generate_edit_script(
    before: &Tree,
    after: &Tree,
    matching: &Matching,
    stats: MatchStats,
    config: &DiffConfig,
) -> EditScript {
    debug!(matched_pairs = matching.len(), "generate_edit_script start");
    let mut generator = Generator::new(before, after, matching, config);

    let mut forest = OpForest::default();
    generator.delete_pass(&mut forest);
    generator.insert_move_update_pass(&mut forest);
    generator.ops = forest.into_ops().into_iter().map(Some).collect();
    debug!(ops = generator.ops.len(), "after delete/insert/move/update passes");

    if config.enable_replace {
        generator.infer_replaces();
        debug!(ops = generator.live_ops().count(), "after replace inference");
    }

    generator.ordering_pass();
    debug!(ops = generator.live_ops().count(), "after ordering pass");

    if config.enable_move_split {
        generator.split_moves();
        debug!(ops = generator.live_ops().count(), "after move split");
    }

    let ops: Vec<EditOp> = generator.ops.into_iter().flatten().collect();
    debug!(total_ops = ops.len(), "generate_edit_script done");
    EditScript::new(ops, stats)
}

/// Shared state of the generation passes.
///
/// `ops` holds the top-level operations; removed ones are `None` so
/// indices stay stable while passes rewrite the script.
pub(crate) struct Generator<'t> {
    pub(crate) before: &'t Tree,
    pub(crate) after: &'t Tree,
    pub(crate) matching: &'t Matching,
    pub(crate) config: &'t DiffConfig,
    pub(crate) marks: ChangeMarks,
    pub(crate) ops: Vec<Option<EditOp>>,
}

impl<'t> Generator<'t> {
    pub(crate) fn new(before: &'t Tree, after: &'t Tree, matching: &'t Matching, config: &'t DiffConfig) -> Self {
        Self {
            before,
            after,
            matching,
            config,
            marks: ChangeMarks::for_trees(before, after),
            ops: Vec::new(),
        }
    }

    pub(crate) fn tree(&self, side: Side) -> &'t Tree {
        match side {
            Side::Before => self.before,
            Side::After => self.after,
        }
    }

    pub(crate) fn partner(&self, side: Side, node: NodeId) -> Option<NodeId> {
        match side {
            Side::Before => self.matching.get_b(node),
            Side::After => self.matching.get_a(node),
        }
    }

    /// The tree an operation's primary node belongs to.
    pub(crate) fn tree_of(&self, op: &EditOp) -> &'t Tree {
        if op.action.in_after_tree() {
            self.after
        } else {
            self.before
        }
    }

    pub(crate) fn live_ops(&self) -> impl Iterator<Item = &EditOp> + '_ {
        self.ops.iter().flatten()
    }

    /// Append a top-level operation.
    pub(crate) fn emit(&mut self, op: EditOp) {
        debug!(%op, "emit");
        self.ops.push(Some(op));
    }

    fn delete_pass(&mut self, forest: &mut OpForest) {
        let before = self.before;
        let mut open: Vec<usize> = Vec::new();

        for edge in before.root().traverse(before.arena()) {
            match edge {
                NodeEdge::Start(n) => {
                    let Some(parent) = before.parent(n) else {
                        continue;
                    };
                    if self.matching.contains_a(n) {
                        continue;
                    }
                    self.marks.set(Side::Before, n, Change::Deleted);
                    let action = Action::Delete {
                        node_a: n,
                        parent_a: parent,
                        position: before.position(n),
                    };
                    open.push(forest.open(action, open.last().copied()));
                }
                NodeEdge::End(n) => {
                    if !before.is_root(n) && !self.matching.contains_a(n) {
                        open.pop();
                    }
                }
            }
        }
    }

    fn insert_move_update_pass(&mut self, forest: &mut OpForest) {
        let after = self.after;
        let before = self.before;
        // (op index, is a move) of every open operation
        let mut open: Vec<(usize, bool)> = Vec::new();
        // whether the node at each traversal level opened an operation
        let mut opened: Vec<bool> = Vec::new();

        for edge in after.root().traverse(after.arena()) {
            let n = match edge {
                NodeEdge::Start(n) => n,
                NodeEdge::End(n) => {
                    if !after.is_root(n) && opened.pop() == Some(true) {
                        open.pop();
                    }
                    continue;
                }
            };
            let Some(parent) = after.parent(n) else {
                continue;
            };
            let position = after.position(n);

            let Some(a) = self.matching.get_a(n) else {
                self.marks.set(Side::After, n, Change::Inserted);
                let under = match open.last() {
                    Some(&(index, false)) => Some(index),
                    _ => None,
                };
                let action = Action::Insert {
                    node_b: n,
                    parent_b: parent,
                    position,
                };
                open.push((forest.open(action, under), false));
                opened.push(true);
                continue;
            };

            let mut moved = false;
            if self.matching.get_a(parent) != before.parent(a) {
                self.marks.set(Side::After, n, Change::Inserted);
                self.marks.set(Side::Before, a, Change::Deleted);
                let under = match open.last() {
                    Some(&(index, true)) => Some(index),
                    _ => None,
                };
                let action = Action::Move {
                    node_a: a,
                    node_b: n,
                    parent_b: parent,
                    position,
                };
                open.push((forest.open(action, under), true));
                moved = true;
            }
            if before.label(a) != after.label(n) {
                forest.open(Action::Update { node_a: a, node_b: n }, None);
            }
            opened.push(moved);
        }
    }

    /// Move every child of a matched pair that is not part of the LCS of
    /// the two child lists.
    fn ordering_pass(&mut self) {
        let before = self.before;
        let after = self.after;

        for n in core::iter::once(before.root()).chain(before.pre_order()) {
            let Some(m) = self.matching.get_b(n) else {
                continue;
            };
            let olds = before.child_vec(n);
            let news = after.child_vec(m);
            if olds.is_empty() || news.is_empty() {
                continue;
            }

            let matching = self.matching;
            let agree = |i: usize, j: usize| matching.get_b(olds[i]) == Some(news[j]);
            let table = LcsTable::new(olds.len(), news.len(), agree);

            let mut out_of_order = Vec::new();
            let (mut i, mut j) = (0, 0);
            while i < olds.len() && j < news.len() {
                let old = olds[i];
                if agree(i, j) {
                    i += 1;
                    j += 1;
                } else if table.at(i + 1, j) >= table.at(i, j + 1) || !matching.contains_a(old) {
                    if self.marks.get(Side::Before, old) != Change::Deleted {
                        out_of_order.push(old);
                    }
                    i += 1;
                } else {
                    j += 1;
                }
            }
            // before children left over once the after list is exhausted are
            // outside the LCS too
            out_of_order.extend(
                olds[i..]
                    .iter()
                    .copied()
                    .filter(|&old| self.marks.get(Side::Before, old) != Change::Deleted),
            );

            for old in out_of_order {
                let Some(new) = matching.get_b(old) else {
                    continue;
                };
                let Some(parent_b) = after.parent(new) else {
                    continue;
                };
                trace!(node = %before.describe(old), "ordering change");
                self.marks.set(Side::Before, old, Change::Deleted);
                self.marks.set(Side::After, new, Change::Inserted);
                self.emit(EditOp::new(Action::Move {
                    node_a: old,
                    node_b: new,
                    parent_b,
                    position: after.position(new),
                }));
            }
        }
    }

    /// A Delete (`Side::Before`) or Insert (`Side::After`) of the whole
    /// subtree at `root`, matched descendants included.
    ///
    /// Top-level operations on unmatched nodes of the subtree whose parent
    /// is matched are subsumed and removed. Every node of the subtree is
    /// marked deleted/inserted.
    pub(crate) fn full_subtree_op(&mut self, side: Side, root: NodeId) -> EditOp {
        let tree = self.tree(side);
        let (kind, change) = match side {
            Side::Before => (OpKind::Delete, Change::Deleted),
            Side::After => (OpKind::Insert, Change::Inserted),
        };

        for n in root.descendants(tree.arena()) {
            let parent_matched = tree
                .parent(n)
                .is_some_and(|p| self.partner(side, p).is_some());
            if self.partner(side, n).is_none() && parent_matched {
                let found = self
                    .ops
                    .iter()
                    .position(|op| op.as_ref().is_some_and(|op| op.kind() == kind && op.node() == n));
                if let Some(index) = found {
                    self.ops[index] = None;
                }
            }
            self.marks.set(side, n, change);
        }

        EditOp::for_subtree(tree, root, |n| {
            let parent = tree.parent(n).unwrap_or(tree.root());
            let position = tree.position(n);
            match side {
                Side::Before => Action::Delete {
                    node_a: n,
                    parent_a: parent,
                    position,
                },
                Side::After => Action::Insert {
                    node_b: n,
                    parent_b: parent,
                    position,
                },
            }
        })
    }

    /// Nest `op` under a live top-level operation of the same kind whose
    /// node is an ancestor of `op`'s node. Gives `op` back when none fits.
    pub(crate) fn attach_to_script(&mut self, mut op: EditOp) -> Result<(), EditOp> {
        let tree = self.tree_of(&op);
        for target in self.ops.iter_mut().flatten() {
            if target.kind() != op.kind() || !tree.is_ancestor(target.node(), op.node()) {
                continue;
            }
            match target.attach(op, tree) {
                Ok(()) => return Ok(()),
                Err(back) => op = back,
            }
        }
        Err(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::compute_matching;
    use crate::tree::{NodeData, Slot, TreeBuilder};
    use facet_testhelpers::test;

    /// `m() { <stmts> }` with one `method_invocation(identifier, args..)`
    /// statement per entry of `calls`.
    fn method(calls: &[(&str, &[&str])]) -> Tree {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let method = b.add_child(root, NodeData::new("method_declaration").declaration().at_line(1));
        b.add_child(
            method,
            NodeData::with_value("identifier", "m").in_slot(Slot::single("name")),
        );
        let block = b.add_child(
            method,
            NodeData::new("block").block().in_slot(Slot::single("body")).at_line(1),
        );
        for (i, (name, args)) in calls.iter().enumerate() {
            let line = 2 + i as u32;
            let call = b.add_child(
                block,
                NodeData::new("method_invocation")
                    .in_slot(Slot::statements())
                    .at_line(line),
            );
            b.add_child(
                call,
                NodeData::with_value("identifier", name)
                    .in_slot(Slot::single("name"))
                    .at_line(line),
            );
            for arg in *args {
                b.add_child(
                    call,
                    NodeData::with_value("decimal_integer_literal", arg)
                        .in_slot(Slot::list("arguments"))
                        .at_line(line),
                );
            }
        }
        b.finish()
    }

    fn diff(before: &Tree, after: &Tree, config: &DiffConfig) -> EditScript {
        let (matching, stats) = compute_matching(before, after, config).unwrap();
        generate_edit_script(before, after, &matching, stats, config)
    }

    #[test]
    fn test_identical_trees_have_no_ops() {
        let a = method(&[("foo", &["1"])]);
        let b = method(&[("foo", &["1"])]);
        let script = diff(&a, &b, &DiffConfig::default());
        assert!(script.is_empty(), "{:?}", script.ops());
        assert_eq!(script.stats().exact, 2 * a.len());
    }

    #[test]
    fn test_swapped_statements_yield_one_move() {
        let a = method(&[("foo", &[]), ("bar", &[])]);
        let b = method(&[("bar", &[]), ("foo", &[])]);
        let script = diff(&a, &b, &DiffConfig::default());

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let op = &script.ops()[0];
        assert_eq!(op.kind(), OpKind::Move);
        let Action::Move { node_a, position, .. } = op.action else {
            unreachable!()
        };
        assert_eq!(a.position(node_a), 0);
        assert_eq!(position, 1);
    }

    #[test]
    fn test_changed_literal_yields_one_update() {
        let a = method(&[("foo", &["1"])]);
        let b = method(&[("foo", &["2"])]);
        let script = diff(&a, &b, &DiffConfig::default());

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let Action::Update { node_a, node_b } = script.ops()[0].action else {
            panic!("expected an update, got {:?}", script.ops());
        };
        assert_eq!(a.label(node_a), "decimal_integer_literal|#|1");
        assert_eq!(b.label(node_b), "decimal_integer_literal|#|2");
        assert_eq!(
            script.display(&a, &b).to_string(),
            "update\tdecimal_integer_literal|#|1(2) to decimal_integer_literal|#|2\n"
        );
    }

    #[test]
    fn test_inserted_statement_nests_its_subtree() {
        let a = method(&[("foo", &[])]);
        let b = method(&[("foo", &[]), ("bar", &["1", "2"])]);
        let config = DiffConfig {
            enable_replace: false,
            ..Default::default()
        };
        let script = diff(&a, &b, &config);

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let insert = &script.ops()[0];
        assert_eq!(insert.kind(), OpKind::Insert);
        assert_eq!(b.kind(insert.node()), "method_invocation");
        assert_eq!(insert.size(), 4);
        assert!(insert.subtree().all(|op| op.kind() == OpKind::Insert));
    }

    #[test]
    fn test_deleted_statement_nests_its_subtree() {
        let a = method(&[("foo", &[]), ("bar", &["1"])]);
        let b = method(&[("foo", &[])]);
        let script = diff(&a, &b, &DiffConfig::default());

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let delete = &script.ops()[0];
        assert_eq!(delete.kind(), OpKind::Delete);
        assert_eq!(delete.size(), 3);
        assert_eq!(
            script.display(&a, &b).to_string(),
            "delete\tmethod_invocation(3),block(1),1\n"
        );
    }

    #[test]
    fn test_ordering_moves_are_outside_the_lcs() {
        let a = method(&[("a", &[]), ("b", &[]), ("c", &[]), ("d", &[])]);
        let b = method(&[("d", &[]), ("a", &[]), ("b", &[]), ("c", &[])]);
        let (matching, stats) = compute_matching(&a, &b, &DiffConfig::default()).unwrap();
        let script = generate_edit_script(&a, &b, &matching, stats, &DiffConfig::default());

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        for op in script.ops() {
            let Action::Move { node_a, node_b, .. } = op.action else {
                panic!("unexpected {op:?}");
            };
            assert_eq!(matching.get_b(node_a), Some(node_b));
            let moved = a.children(node_a).next().unwrap();
            assert_eq!(a.label(moved), "identifier|#|d");
        }
    }

    #[test]
    fn test_forest_nesting() {
        let a = method(&[("foo", &["1"])]);
        let ids: Vec<NodeId> = a.pre_order().collect();
        let mut forest = OpForest::default();
        let del = |n: NodeId| Action::Delete {
            node_a: n,
            parent_a: a.parent(n).unwrap(),
            position: a.position(n),
        };
        let top = forest.open(del(ids[2]), None);
        let call = forest.open(del(ids[3]), Some(top));
        forest.open(del(ids[4]), Some(call));
        forest.open(del(ids[5]), Some(call));
        forest.open(del(ids[0]), None);

        let ops = forest.into_ops();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].size(), 4);
        let order: Vec<NodeId> = ops[0].subtree().map(EditOp::node).collect();
        assert_eq!(order, ids[2..6].to_vec());
    }
}
