//! Move split: every Move becomes a Delete of the source subtree plus an
//! Insert of the target subtree.
//!
//! Operations inside a moved subtree are covered by those and dropped.

use crate::chawathe::Generator;
use crate::matching::Side;
use crate::script::{Action, EditOp, OpKind};
use crate::tree::Tree;
use crate::{debug, trace};

impl Generator<'_> {
    pub(crate) fn split_moves(&mut self) {
        // Deletes/Inserts/Updates under a moved node
        for index in 0..self.ops.len() {
            let Some(op) = &self.ops[index] else {
                continue;
            };
            if matches!(op.kind(), OpKind::Move | OpKind::Replace) {
                continue;
            }
            let side = if op.action.in_after_tree() {
                Side::After
            } else {
                Side::Before
            };
            let tree = self.tree(side);
            let covered = tree
                .parent(op.node())
                .into_iter()
                .flat_map(|p| p.ancestors(tree.arena()))
                .any(|anc| self.partner(side, anc).is_some() && self.marks.is_changed(side, anc));
            if covered {
                trace!(%op, "covered by a moved subtree");
                self.ops[index] = None;
            }
        }

        let mut pending: Vec<Option<EditOp>> = Vec::new();
        for index in 0..self.ops.len() {
            if self.ops[index].as_ref().is_none_or(|op| op.kind() != OpKind::Move) {
                continue;
            }
            let Some(op) = self.ops[index].take() else {
                continue;
            };
            // nested moves lose their parent op, split them as well
            let moves: Vec<Action> = op.subtree().map(|op| op.action).collect();
            for action in moves {
                if let Action::Move { node_a, node_b, .. } = action {
                    pending.push(Some(self.full_subtree_op(Side::Before, node_a)));
                    pending.push(Some(self.full_subtree_op(Side::After, node_b)));
                }
            }
        }
        debug!(split = pending.len() / 2, "moves split");

        for index in 0..pending.len() {
            let Some(op) = pending[index].take() else {
                continue;
            };
            let tree = self.tree_of(&op);
            let Err(op) = attach_to_pending(&mut pending, op, tree) else {
                continue;
            };
            if let Err(op) = self.attach_to_script(op) {
                self.emit(op);
            }
        }
    }
}

/// Nest `op` under another pending operation of the same kind on one of
/// its ancestors.
fn attach_to_pending(pending: &mut [Option<EditOp>], mut op: EditOp, tree: &Tree) -> Result<(), EditOp> {
    for host in pending.iter_mut().flatten() {
        if host.kind() != op.kind() || !tree.is_ancestor(host.node(), op.node()) {
            continue;
        }
        match host.attach(op, tree) {
            Ok(()) => return Ok(()),
            Err(back) => op = back,
        }
    }
    Err(op)
}

#[cfg(test)]
mod tests {
    use crate::DiffConfig;
    use crate::chawathe::generate_edit_script;
    use crate::matching::compute_matching;
    use crate::script::{EditScript, OpKind};
    use crate::testing::{nth, tree};
    use crate::tree::Tree;
    use facet_testhelpers::test;

    fn diff(before: &Tree, after: &Tree, config: &DiffConfig) -> EditScript {
        let (matching, stats) = compute_matching(before, after, config).unwrap();
        generate_edit_script(before, after, &matching, stats, config)
    }

    fn split() -> DiffConfig {
        DiffConfig {
            enable_move_split: true,
            ..Default::default()
        }
    }

    const BEFORE: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=foo :name
      decimal_integer_literal=1 :arguments[]
    method_invocation :stmt
      identifier=bar :name
";

    const AFTER: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=bar :name
    method_invocation :stmt
      identifier=foo :name
      decimal_integer_literal=2 :arguments[]
";

    #[test]
    fn test_move_becomes_delete_and_insert() {
        let a = tree(BEFORE);
        let b = tree(AFTER);

        let plain = diff(&a, &b, &DiffConfig::default());
        assert_eq!(plain.count(OpKind::Move), 1, "{:?}", plain.ops());
        assert_eq!(plain.count(OpKind::Update), 1, "{:?}", plain.ops());

        let script = diff(&a, &b, &split());
        assert_eq!(script.count(OpKind::Move), 0, "{:?}", script.ops());
        assert_eq!(script.len(), 2, "{:?}", script.ops());

        let delete = script.ops().iter().find(|op| op.kind() == OpKind::Delete).unwrap();
        assert_eq!(delete.node(), nth(&a, "method_invocation", 0));
        assert_eq!(delete.size(), 3);

        let insert = script.ops().iter().find(|op| op.kind() == OpKind::Insert).unwrap();
        assert_eq!(insert.node(), nth(&b, "method_invocation", 1));
        assert_eq!(insert.size(), 3);
    }

    #[test]
    fn test_split_without_moves_changes_nothing() {
        let a = tree(BEFORE);
        let script = diff(&a, &tree(BEFORE), &split());
        assert!(script.is_empty(), "{:?}", script.ops());
    }
}
