//! Replace inference.
//!
//! A Delete and an Insert (or a Move standing in for one of them) at the
//! same location in matched parents collapse into one Replace. Updates inside
//! the replaced region are dropped. Moves that touch a subtree that became
//! part of a Replace are re-expressed as full-subtree Deletes/Inserts.

use crate::chawathe::Generator;
use crate::matching::Side;
use crate::script::{Action, EditOp, OpKind};
use crate::{debug, trace};
use indextree::NodeId;

/// A pairing decided while scanning the moves, carried out afterwards.
#[derive(Debug, Clone, Copy)]
enum Plan {
    DeleteInsert { delete: usize, insert: usize },
    DeleteMove { delete: usize, mv: usize },
    InsertMove { insert: usize, mv: usize },
    /// A move whose source or target lies under the Delete/Insert `host`.
    Rider { mv: usize, host: usize },
}

/// Region whose Updates a Replace makes redundant.
#[derive(Debug, Clone, Copy)]
enum Region {
    Before(NodeId),
    After(NodeId),
}

impl Generator<'_> {
    pub(crate) fn infer_replaces(&mut self) {
        let actions: Vec<Option<Action>> = self.ops.iter().map(|op| op.as_ref().map(|op| op.action)).collect();
        let indices_of = |kind: OpKind| -> Vec<usize> {
            actions
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_some_and(|a| a.kind() == kind))
                .map(|(i, _)| i)
                .collect()
        };
        let deletes = indices_of(OpKind::Delete);
        let inserts = indices_of(OpKind::Insert);
        let moves = indices_of(OpKind::Move);
        let updates = indices_of(OpKind::Update);

        let mut partner: Vec<Option<usize>> = vec![None; self.ops.len()];
        let mut plans = Vec::new();

        for &mv in &moves {
            let Some(Action::Move { node_a, node_b, .. }) = actions[mv] else {
                continue;
            };
            let delete = self.enclosing_op(&deletes, Side::Before, node_a);
            let insert = self.enclosing_op(&inserts, Side::After, node_b);
            match (delete, insert) {
                (Some(d), Some(i)) => {
                    if partner[d].is_none()
                        && partner[i].is_none()
                        && self.same_location(self.op_node(d), self.op_node(i), false)
                    {
                        partner[d] = Some(i);
                        partner[i] = Some(d);
                        plans.push(Plan::DeleteInsert { delete: d, insert: i });
                    }
                    plans.push(Plan::Rider { mv, host: d });
                }
                (Some(d), None) => {
                    if partner[d].is_none() && self.same_location(self.op_node(d), node_b, false) {
                        partner[d] = Some(mv);
                        plans.push(Plan::DeleteMove { delete: d, mv });
                    } else {
                        plans.push(Plan::Rider { mv, host: d });
                    }
                }
                (None, Some(i)) => {
                    if partner[i].is_none() && self.same_location(node_a, self.op_node(i), false) {
                        partner[i] = Some(mv);
                        plans.push(Plan::InsertMove { insert: i, mv });
                    } else {
                        plans.push(Plan::Rider { mv, host: i });
                    }
                }
                (None, None) => {}
            }
        }

        debug!(plans = plans.len(), "replace plans");
        for plan in plans {
            self.carry_out(plan, &partner, &actions, &updates);
        }

        // plain Delete/Insert pairs at the same location
        let mut free_inserts: Vec<usize> = inserts
            .into_iter()
            .filter(|&i| partner[i].is_none() && self.ops[i].is_some())
            .collect();
        for d in deletes {
            if partner[d].is_some() || self.ops[d].is_none() {
                continue;
            }
            let a = self.op_node(d);
            let Some(k) = free_inserts
                .iter()
                .position(|&i| self.same_location(a, self.op_node(i), true))
            else {
                continue;
            };
            let i = free_inserts.remove(k);
            let b = self.op_node(i);
            self.ops[d] = None;
            self.ops[i] = None;
            self.discard_updates(&updates, Region::Before(a));
            self.emit_replace(a, b);
        }
    }

    fn carry_out(&mut self, plan: Plan, partner: &[Option<usize>], actions: &[Option<Action>], updates: &[usize]) {
        trace!(?plan, "replace plan");
        let live = |ops: &[Option<EditOp>], i: usize| ops[i].is_some();
        match plan {
            Plan::DeleteInsert { delete, insert } => {
                // an earlier re-expression may have absorbed one side
                if !live(&self.ops, delete) || !live(&self.ops, insert) {
                    return;
                }
                let (a, b) = (self.op_node(delete), self.op_node(insert));
                self.ops[delete] = None;
                self.ops[insert] = None;
                self.discard_updates(updates, Region::Before(a));
                self.emit_replace(a, b);
            }
            Plan::DeleteMove { delete, mv } => {
                let Some(Action::Move { node_b, .. }) = actions[mv] else {
                    return;
                };
                if !live(&self.ops, delete) || !live(&self.ops, mv) {
                    return;
                }
                let a = self.op_node(delete);
                self.ops[delete] = None;
                self.ops[mv] = None;
                self.discard_updates(updates, Region::Before(a));
                self.emit_replace(a, node_b);
            }
            Plan::InsertMove { insert, mv } => {
                let Some(Action::Move { node_a, .. }) = actions[mv] else {
                    return;
                };
                if !live(&self.ops, insert) || !live(&self.ops, mv) {
                    return;
                }
                let b = self.op_node(insert);
                self.ops[insert] = None;
                self.ops[mv] = None;
                self.discard_updates(updates, Region::After(b));
                self.emit_replace(node_a, b);
            }
            Plan::Rider { mv, host } => {
                let Some(claim) = partner[host] else {
                    return;
                };
                let Some(Action::Move { node_a, node_b, .. }) = actions[mv] else {
                    return;
                };
                if !live(&self.ops, mv) {
                    return;
                }
                self.ops[mv] = None;
                self.discard_updates(updates, Region::Before(node_a));

                // one end of the rider lies in the replaced region; the
                // other end must still leave or enter the tree
                let op = match (actions[host].map(|a| a.kind()), actions[claim]) {
                    (
                        Some(OpKind::Delete),
                        Some(Action::Insert { node_b: root, .. } | Action::Move { node_b: root, .. }),
                    ) if !self.after.is_ancestor_or_self(root, node_b) => self.full_subtree_op(Side::After, node_b),
                    (
                        Some(OpKind::Insert),
                        Some(Action::Delete { node_a: root, .. } | Action::Move { node_a: root, .. }),
                    ) if !self.before.is_ancestor_or_self(root, node_a) => self.full_subtree_op(Side::Before, node_a),
                    _ => return,
                };
                if let Err(op) = self.attach_to_script(op) {
                    self.emit(op);
                }
            }
        }
    }

    fn op_node(&self, index: usize) -> NodeId {
        match &self.ops[index] {
            Some(op) => op.node(),
            None => self.tree(Side::Before).root(),
        }
    }

    /// The Delete/Insert among `candidates` on the topmost unmatched
    /// ancestor of `node`, if `node` sits inside an unmatched region.
    fn enclosing_op(&self, candidates: &[usize], side: Side, node: NodeId) -> Option<usize> {
        let tree = self.tree(side);
        let parent = tree.parent(node)?;
        if self.partner(side, parent).is_some() {
            return None;
        }
        let mut top = parent;
        while let Some(p) = tree.parent(top)
            && self.partner(side, p).is_none()
        {
            top = p;
        }
        candidates
            .iter()
            .copied()
            .find(|&i| self.ops[i].as_ref().is_some_and(|op| op.node() == top))
    }

    fn discard_updates(&mut self, updates: &[usize], region: Region) {
        for &u in updates {
            let Some(Action::Update { node_a, node_b }) = self.ops[u].as_ref().map(|op| op.action) else {
                continue;
            };
            let inside = match region {
                Region::Before(root) => self.before.is_ancestor(root, node_a),
                Region::After(root) => self.after.is_ancestor(root, node_b),
            };
            if inside {
                trace!(node = %self.before.describe(node_a), "update absorbed by replace");
                self.ops[u] = None;
            }
        }
    }

    /// Emit `Replace(a, b)`, widened to the parents when both are blocks
    /// directly under a matched pair of non-declaration statements.
    fn emit_replace(&mut self, a: NodeId, b: NodeId) {
        let (before, after) = (self.before, self.after);
        let (mut a, mut b) = (a, b);
        if self.config.enable_block_promotion
            && before.is_block(a)
            && after.is_block(b)
            && let (Some(p1), Some(p2)) = (before.parent(a), after.parent(b))
            && !before.is_root(p1)
            && self.matching.get_b(p1) == Some(p2)
            && !before.is_declaration(p1)
            && !after.is_declaration(p2)
        {
            trace!(node = %before.describe(p1), "block replace promoted");
            a = p1;
            b = p2;
        }
        self.emit(EditOp::new(Action::Replace { node_a: a, node_b: b }));
    }

    /// Whether before node `n1` and after node `n2` occupy the same place:
    /// matched parents, the same slot, and for statements the same matched
    /// left neighbor.
    pub(crate) fn same_location(&self, n1: NodeId, n2: NodeId, check_kind: bool) -> bool {
        let (before, after) = (self.before, self.after);
        let (Some(p1), Some(p2)) = (before.parent(n1), after.parent(n2)) else {
            return false;
        };
        if self.matching.get_b(p1) != Some(p2) {
            return false;
        }
        if before.is_declaration(n1) || after.is_declaration(n2) {
            return false;
        }
        let (Some(s1), Some(s2)) = (before.slot(n1), after.slot(n2)) else {
            return false;
        };
        if s1 != s2 {
            return false;
        }
        if !s1.is_statements() {
            return !s1.is_list() || before.position(n1) == after.position(n2);
        }
        if check_kind && before.kind(n1) != after.kind(n2) {
            return false;
        }

        let c1 = self.matched_left_count(Side::Before, n1);
        let c2 = self.matched_left_count(Side::After, n2);
        let (o1, o2) = if c1 > c2 { (c1 - c2, 0) } else { (0, c2 - c1) };
        let l1 = left_at(before, n1, o1);
        let l2 = left_at(after, n2, o2);
        match (l1, l2) {
            (None, None) => true,
            (Some(l1), l2) => self.matching.get_b(l1) == l2,
            (None, Some(_)) => false,
        }
    }

    fn matched_left_count(&self, side: Side, node: NodeId) -> usize {
        let tree = self.tree(side);
        let mut count = 0;
        let mut cur = tree.left(node);
        while let Some(l) = cur {
            if self.partner(side, l).is_some() {
                count += 1;
            }
            cur = tree.left(l);
        }
        count
    }
}

/// The left sibling `offset` steps beyond the immediate one.
fn left_at(tree: &crate::tree::Tree, node: NodeId, offset: usize) -> Option<NodeId> {
    let mut cur = tree.left(node)?;
    for _ in 0..offset {
        cur = tree.left(cur)?;
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use crate::DiffConfig;
    use crate::chawathe::{Generator, generate_edit_script};
    use crate::matching::{Matching, compute_matching};
    use crate::script::{Action, EditScript, OpKind};
    use crate::testing::{find, nth, tree};
    use crate::tree::Tree;
    use facet_testhelpers::test;

    fn diff(before: &Tree, after: &Tree, config: &DiffConfig) -> EditScript {
        let (matching, stats) = compute_matching(before, after, config).unwrap();
        generate_edit_script(before, after, &matching, stats, config)
    }

    const CALLS: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
    method_invocation :stmt
      identifier=b :name
      decimal_integer_literal=1 :arguments[]
    method_invocation :stmt
      identifier=c :name
";

    const CALLS_REPLACED: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
    method_invocation :stmt
      identifier=zed :name
      identifier=q :arguments[]
    method_invocation :stmt
      identifier=c :name
";

    #[test]
    fn test_unrelated_statement_in_place_is_one_replace() {
        let a = tree(CALLS);
        let b = tree(CALLS_REPLACED);
        let script = diff(&a, &b, &DiffConfig::default());

        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let Action::Replace { node_a, node_b } = script.ops()[0].action else {
            panic!("expected a replace, got {:?}", script.ops());
        };
        assert_eq!(node_a, nth(&a, "method_invocation", 1));
        assert_eq!(node_b, nth(&b, "method_invocation", 1));
        assert_eq!(
            script.display(&a, &b).to_string(),
            "replace\tmethod_invocation(6) with method_invocation(6)\n"
        );
    }

    #[test]
    fn test_replace_disabled_keeps_delete_and_insert() {
        let a = tree(CALLS);
        let b = tree(CALLS_REPLACED);
        let config = DiffConfig {
            enable_replace: false,
            ..Default::default()
        };
        let script = diff(&a, &b, &config);

        assert_eq!(script.count(OpKind::Delete), 1, "{:?}", script.ops());
        assert_eq!(script.count(OpKind::Insert), 1, "{:?}", script.ops());
        assert_eq!(script.count(OpKind::Replace), 0);
    }

    #[test]
    fn test_different_kinds_are_not_paired() {
        let a = tree(CALLS);
        let b = tree(
            "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
    return_statement :stmt
      decimal_integer_literal=5 :value
    method_invocation :stmt
      identifier=c :name
",
        );
        let script = diff(&a, &b, &DiffConfig::default());
        assert_eq!(script.count(OpKind::Replace), 0, "{:?}", script.ops());
        assert_eq!(script.count(OpKind::Delete), 1);
        assert_eq!(script.count(OpKind::Insert), 1);
    }

    #[test]
    fn test_unwrapped_statement_is_delete_move_replace() {
        let a = tree(
            "
method_declaration decl
  identifier=m :name
  block block :body
    while_statement :stmt
      identifier=c :condition
      block block :body
        method_invocation :stmt
          identifier=foo :name
          decimal_integer_literal=1 :arguments[]
          decimal_integer_literal=2 :arguments[]
",
        );
        let b = tree(
            "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=foo :name
      decimal_integer_literal=1 :arguments[]
      decimal_integer_literal=2 :arguments[]
",
        );

        let without = diff(
            &a,
            &b,
            &DiffConfig {
                enable_replace: false,
                ..Default::default()
            },
        );
        assert_eq!(without.count(OpKind::Delete), 1, "{:?}", without.ops());
        assert_eq!(without.count(OpKind::Move), 1, "{:?}", without.ops());

        let script = diff(&a, &b, &DiffConfig::default());
        assert_eq!(script.len(), 1, "{:?}", script.ops());
        let Action::Replace { node_a, node_b } = script.ops()[0].action else {
            panic!("expected a replace, got {:?}", script.ops());
        };
        assert_eq!(a.kind(node_a), "while_statement");
        assert_eq!(node_b, find(&b, "method_invocation"));
    }

    #[test]
    fn test_declarations_are_never_replaced() {
        let a = tree(
            "
class_body
  method_declaration decl
    identifier=m :name
  method_declaration decl
    identifier=n :name
    decimal_integer_literal=1 :arguments[]
",
        );
        let b = tree(
            "
class_body
  method_declaration decl
    identifier=m :name
  method_declaration decl
    identifier=k :name
    identifier=z :arguments[]
",
        );
        let script = diff(&a, &b, &DiffConfig::default());
        assert_eq!(script.count(OpKind::Replace), 0, "{:?}", script.ops());
    }

    const IF_BLOCK: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    if_statement :stmt
      identifier=x :condition
      block block :consequence
        method_invocation :stmt
          identifier=foo :name
";

    /// Links every node of `a` to the node of `b` at the same pre-order
    /// index, except the listed ones.
    fn matching_except(a: &Tree, b: &Tree, skip: &[usize]) -> Matching {
        let mut matching = Matching::new();
        matching.add(a.root(), b.root()).unwrap();
        for (i, (x, y)) in a.pre_order().zip(b.pre_order()).enumerate() {
            if !skip.contains(&i) {
                matching.add(x, y).unwrap();
            }
        }
        matching
    }

    #[test]
    fn test_block_replace_is_promoted_to_statement() {
        let a = tree(IF_BLOCK);
        let b = tree(IF_BLOCK);
        // inner block and its subtree unmatched
        let matching = matching_except(&a, &b, &[5, 6, 7]);
        let inner_a = nth(&a, "block", 1);
        let inner_b = nth(&b, "block", 1);

        let config = DiffConfig::default();
        let mut generator = Generator::new(&a, &b, &matching, &config);
        generator.emit_replace(inner_a, inner_b);
        let op = generator.live_ops().next().unwrap();
        assert_eq!(
            op.action,
            Action::Replace {
                node_a: find(&a, "if_statement"),
                node_b: find(&b, "if_statement"),
            }
        );

        let config = DiffConfig {
            enable_block_promotion: false,
            ..Default::default()
        };
        let mut generator = Generator::new(&a, &b, &matching, &config);
        generator.emit_replace(inner_a, inner_b);
        let op = generator.live_ops().next().unwrap();
        assert_eq!(
            op.action,
            Action::Replace {
                node_a: inner_a,
                node_b: inner_b,
            }
        );
    }

    #[test]
    fn test_method_body_is_not_promoted() {
        let a = tree(IF_BLOCK);
        let b = tree(IF_BLOCK);
        let matching = matching_except(&a, &b, &[2, 3, 4, 5, 6, 7]);
        let body_a = nth(&a, "block", 0);
        let body_b = nth(&b, "block", 0);

        let config = DiffConfig::default();
        let mut generator = Generator::new(&a, &b, &matching, &config);
        generator.emit_replace(body_a, body_b);
        let op = generator.live_ops().next().unwrap();
        assert_eq!(
            op.action,
            Action::Replace {
                node_a: body_a,
                node_b: body_b,
            }
        );
    }

    #[test]
    fn test_statement_location_uses_matched_left_neighbor() {
        let a = tree(CALLS);
        let b = tree(CALLS_REPLACED);
        // a and c matched, b and zed not
        let matching = matching_except(&a, &b, &[5, 6, 7]);
        let config = DiffConfig::default();
        let generator = Generator::new(&a, &b, &matching, &config);

        let b_call = nth(&a, "method_invocation", 1);
        let zed_call = nth(&b, "method_invocation", 1);
        assert!(generator.same_location(b_call, zed_call, true));
        // first statement on one side, second on the other
        let c_call = nth(&b, "method_invocation", 2);
        assert!(!generator.same_location(b_call, c_call, false));
    }
}
