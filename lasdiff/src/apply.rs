//! Replaying an edit script on a label-only copy of the before tree.
//!
//! Deletes detach, Inserts and Replaces create nodes, Moves detach and
//! re-place, Updates relabel. A Replace brings in a copy of the whole after
//! subtree, so operations aimed inside a copied region only detach their
//! before node. Placements are resolved per parent at the end: children
//! that stayed keep their relative order and placed children land on their
//! after-tree index.

use crate::debug;
use crate::matching::Matching;
use crate::script::{Action, EditScript};
use crate::tree::Tree;
use facet::Facet;
use indexmap::IndexMap;
use indextree::{Arena, NodeEdge, NodeId};

/// Why a script could not be replayed.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum ApplyError {
    /// before node {node} has no counterpart in the replayed tree
    UnresolvedBefore { node: usize },

    /// after node {node} has no counterpart in the replayed tree
    UnresolvedAfter { node: usize },

    /// placing node {node} would make it its own ancestor
    Cycle { node: usize },
}

/// The result of [`replay`]: labels only.
pub struct ShadowTree {
    arena: Arena<String>,
    root: NodeId,
}

impl ShadowTree {
    /// Same shape and labels as `tree`.
    pub fn same_as(&self, tree: &Tree) -> bool {
        let mut ours = self.root.traverse(&self.arena);
        let mut theirs = tree.root().traverse(tree.arena());
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return true,
                (Some(NodeEdge::Start(x)), Some(NodeEdge::Start(y))) => {
                    if self.arena[x].get() != tree.label(y) {
                        return false;
                    }
                }
                (Some(NodeEdge::End(_)), Some(NodeEdge::End(_))) => {}
                _ => return false,
            }
        }
    }

    /// Node count, virtual root included.
    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count()
    }

    /// Always false: the virtual root is kept.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Indented dump, one label per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.root.descendants(&self.arena) {
            let depth = id.ancestors(&self.arena).count() - 1;
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(self.arena[id].get());
            out.push('\n');
        }
        out
    }
}

/// Apply `script` to a copy of `before`. `matching` must be the matching
/// the script was generated from.
pub fn replay(script: &EditScript, before: &Tree, after: &Tree, matching: &Matching) -> Result<ShadowTree, ApplyError> {
    let mut replay = Replay::new(before, after, matching);
    let actions: Vec<Action> = script.all_ops().map(|op| op.action).collect();

    for action in &actions {
        if let Action::Delete { node_a, .. } = *action {
            let node = replay.shadow_of_before(node_a)?;
            node.detach(&mut replay.arena);
        }
    }

    for action in &actions {
        if let Action::Replace { node_a, node_b } = *action {
            let old = replay.shadow_of_before(node_a)?;
            old.detach(&mut replay.arena);
            if replay.is_created(node_b) {
                continue;
            }
            let copy = replay.copy_after(node_b);
            let parent = after.parent(node_b).unwrap_or(after.root());
            let parent = replay.shadow_of_after(parent)?;
            replay.place(parent, after.position(node_b), copy);
        }
    }

    // parents before children
    let mut rank = vec![0usize; after.arena().count() + 1];
    for (i, n) in after.pre_order().enumerate() {
        rank[usize::from(n)] = i;
    }
    let mut inserts: Vec<(NodeId, NodeId, usize)> = actions
        .iter()
        .filter_map(|action| match *action {
            Action::Insert {
                node_b,
                parent_b,
                position,
            } => Some((node_b, parent_b, position)),
            _ => None,
        })
        .collect();
    inserts.sort_by_key(|&(node_b, _, _)| rank[usize::from(node_b)]);
    for (node_b, parent_b, position) in inserts {
        if replay.is_created(node_b) {
            continue;
        }
        let node = replay.arena.new_node(after.label(node_b).to_string());
        replay.from_after[usize::from(node_b)] = Some(node);
        let parent = replay.shadow_of_after(parent_b)?;
        replay.place(parent, position, node);
    }

    for action in &actions {
        if let Action::Move {
            node_a,
            node_b,
            parent_b,
            position,
        } = *action
        {
            let node = replay.shadow_of_before(node_a)?;
            node.detach(&mut replay.arena);
            if replay.is_created(node_b) {
                continue;
            }
            let parent = replay.shadow_of_after(parent_b)?;
            replay.place(parent, position, node);
        }
    }

    for action in &actions {
        if let Action::Update { node_a, node_b } = *action {
            if replay.is_created(node_b) {
                continue;
            }
            let node = replay.shadow_of_before(node_a)?;
            *replay.arena[node].get_mut() = after.label(node_b).to_string();
        }
    }

    replay.resolve_placements()?;
    debug!(ops = actions.len(), "script replayed");
    Ok(ShadowTree {
        arena: replay.arena,
        root: replay.root,
    })
}

struct Replay<'a> {
    after: &'a Tree,
    matching: &'a Matching,
    arena: Arena<String>,
    root: NodeId,
    from_before: Vec<Option<NodeId>>,
    /// After nodes created by Inserts/Replaces; matched ones resolve
    /// through their partner otherwise.
    from_after: Vec<Option<NodeId>>,
    placements: IndexMap<NodeId, Vec<(usize, NodeId)>>,
}

impl<'a> Replay<'a> {
    fn new(before: &Tree, after: &'a Tree, matching: &'a Matching) -> Self {
        let mut arena = Arena::with_capacity(before.arena().count() + after.arena().count());
        let mut from_before = vec![None; before.arena().count() + 1];
        let root = arena.new_node(before.label(before.root()).to_string());
        from_before[usize::from(before.root())] = Some(root);

        for n in before.pre_order() {
            let node = arena.new_node(before.label(n).to_string());
            from_before[usize::from(n)] = Some(node);
            if let Some(parent) = before.parent(n).and_then(|p| from_before[usize::from(p)]) {
                parent.append(node, &mut arena);
            }
        }

        Self {
            after,
            matching,
            arena,
            root,
            from_before,
            from_after: vec![None; after.arena().count() + 1],
            placements: IndexMap::new(),
        }
    }

    fn shadow_of_before(&self, node: NodeId) -> Result<NodeId, ApplyError> {
        self.from_before
            .get(usize::from(node))
            .copied()
            .flatten()
            .ok_or(ApplyError::UnresolvedBefore {
                node: usize::from(node),
            })
    }

    fn shadow_of_after(&self, node: NodeId) -> Result<NodeId, ApplyError> {
        let created = self.from_after.get(usize::from(node)).copied().flatten();
        let partner = || {
            self.matching
                .get_a(node)
                .and_then(|a| self.from_before.get(usize::from(a)).copied().flatten())
        };
        created.or_else(partner).ok_or(ApplyError::UnresolvedAfter {
            node: usize::from(node),
        })
    }

    /// Whether an Insert or a Replace copy already produced `node`.
    fn is_created(&self, node: NodeId) -> bool {
        self.from_after.get(usize::from(node)).is_some_and(Option::is_some)
    }

    /// Fresh copy of the after subtree at `root`, registered as the
    /// counterpart of every copied node.
    fn copy_after(&mut self, root: NodeId) -> NodeId {
        let after = self.after;
        let mut copy = None;
        for n in root.descendants(after.arena()) {
            let node = self.arena.new_node(after.label(n).to_string());
            self.from_after[usize::from(n)] = Some(node);
            if n == root {
                copy = Some(node);
            } else if let Some(parent) = after.parent(n).and_then(|p| self.from_after[usize::from(p)]) {
                parent.append(node, &mut self.arena);
            }
        }
        copy.unwrap_or(self.root)
    }

    fn place(&mut self, parent: NodeId, position: usize, node: NodeId) {
        self.placements.entry(parent).or_default().push((position, node));
    }

    fn resolve_placements(&mut self) -> Result<(), ApplyError> {
        for (parent, mut placed) in core::mem::take(&mut self.placements) {
            placed.sort_by_key(|&(position, _)| position);
            let kept: Vec<NodeId> = parent.children(&self.arena).collect();
            for &child in &kept {
                child.detach(&mut self.arena);
            }

            let mut kept = kept.into_iter();
            let mut placed = placed.into_iter().peekable();
            let mut index = 0;
            loop {
                let next = if placed.peek().is_some_and(|&(position, _)| position <= index) {
                    placed.next().map(|(_, n)| n)
                } else {
                    kept.next().or_else(|| placed.next().map(|(_, n)| n))
                };
                let Some(child) = next else {
                    break;
                };
                parent
                    .checked_append(child, &mut self.arena)
                    .map_err(|_| ApplyError::Cycle {
                        node: usize::from(child),
                    })?;
                index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffConfig;
    use crate::chawathe::generate_edit_script;
    use crate::matching::{MatchStats, compute_matching};
    use crate::script::{EditOp, OpKind};
    use crate::testing::{find, tree};
    use facet_testhelpers::test;

    fn round_trip(before: &str, after: &str, config: &DiffConfig) -> EditScript {
        let a = tree(before);
        let b = tree(after);
        let (matching, stats) = compute_matching(&a, &b, config).unwrap();
        let script = generate_edit_script(&a, &b, &matching, stats, config);
        let replayed = replay(&script, &a, &b, &matching).unwrap();
        assert!(
            replayed.same_as(&b),
            "script:\n{}replayed:\n{}expected:\n{}",
            script.display_nested(&a, &b),
            replayed.dump(),
            b.dump()
        );
        script
    }

    fn no_replace() -> DiffConfig {
        DiffConfig {
            enable_replace: false,
            ..Default::default()
        }
    }

    const BASE: &str = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
      decimal_integer_literal=1 :arguments[]
    method_invocation :stmt
      identifier=b :name
    while_statement :stmt
      identifier=cond :condition
      block block :body
        method_invocation :stmt
          identifier=c :name
          decimal_integer_literal=2 :arguments[]
          decimal_integer_literal=3 :arguments[]
";

    #[test]
    fn test_identity() {
        round_trip(BASE, BASE, &DiffConfig::default());
    }

    #[test]
    fn test_update_and_swap() {
        let after = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=b :name
    method_invocation :stmt
      identifier=a :name
      decimal_integer_literal=9 :arguments[]
    while_statement :stmt
      identifier=cond :condition
      block block :body
        method_invocation :stmt
          identifier=c :name
          decimal_integer_literal=2 :arguments[]
          decimal_integer_literal=3 :arguments[]
";
        round_trip(BASE, after, &no_replace());
        round_trip(BASE, after, &DiffConfig::default());
    }

    #[test]
    fn test_unwrap_loop_body() {
        let after = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
      decimal_integer_literal=1 :arguments[]
    method_invocation :stmt
      identifier=b :name
    method_invocation :stmt
      identifier=c :name
      decimal_integer_literal=2 :arguments[]
      decimal_integer_literal=3 :arguments[]
";
        round_trip(BASE, after, &no_replace());
        round_trip(BASE, after, &DiffConfig::default());
        round_trip(
            BASE,
            after,
            &DiffConfig {
                enable_move_split: true,
                ..no_replace()
            },
        );
    }

    #[test]
    fn test_replace_of_grown_moved_statement() {
        // the loop goes away and its body call takes its place with one
        // more argument: a Replace whose after subtree also has an Insert
        let after = "
method_declaration decl
  identifier=m :name
  block block :body
    method_invocation :stmt
      identifier=a :name
      decimal_integer_literal=1 :arguments[]
    method_invocation :stmt
      identifier=b :name
    method_invocation :stmt
      identifier=c :name
      decimal_integer_literal=2 :arguments[]
      decimal_integer_literal=3 :arguments[]
      decimal_integer_literal=4 :arguments[]
";
        let script = round_trip(BASE, after, &DiffConfig::default());
        assert_eq!(script.count(OpKind::Replace), 1, "{:?}", script.ops());
        assert_eq!(script.count(OpKind::Insert), 1, "{:?}", script.ops());

        round_trip(
            BASE,
            after,
            &DiffConfig {
                enable_move_split: true,
                ..Default::default()
            },
        );
        round_trip(BASE, after, &no_replace());
    }

    #[test]
    fn test_insert_and_delete() {
        let after = "
method_declaration decl
  identifier=m :name
  block block :body
    local_variable_declaration :stmt
      identifier=x :declarator
      decimal_integer_literal=0 :value
    method_invocation :stmt
      identifier=a :name
      decimal_integer_literal=1 :arguments[]
    while_statement :stmt
      identifier=cond :condition
      block block :body
        method_invocation :stmt
          identifier=c :name
          decimal_integer_literal=2 :arguments[]
          decimal_integer_literal=3 :arguments[]
";
        round_trip(BASE, after, &no_replace());
    }

    #[test]
    fn test_unresolved_insert_parent() {
        let a = tree(BASE);
        let b = tree(BASE);
        let matching = Matching::new();
        let call = find(&b, "identifier|#|b");
        let script = EditScript::new(
            vec![EditOp::new(Action::Insert {
                node_b: call,
                parent_b: b.parent(call).unwrap(),
                position: 0,
            })],
            MatchStats::default(),
        );
        let err = replay(&script, &a, &b, &matching).err().unwrap();
        assert!(matches!(err, ApplyError::UnresolvedAfter { .. }), "{err:?}");
    }

    #[test]
    fn test_move_under_own_descendant_is_a_cycle() {
        let a = tree(BASE);
        let b = tree(BASE);
        let mut matching = Matching::new();
        matching.add(a.root(), b.root()).unwrap();
        for (x, y) in a.pre_order().zip(b.pre_order()) {
            matching.add(x, y).unwrap();
        }
        let outer = find(&a, "while_statement");
        let inner = find(&b, "identifier|#|c");
        let script = EditScript::new(
            vec![EditOp::new(Action::Move {
                node_a: outer,
                node_b: find(&b, "while_statement"),
                parent_b: inner,
                position: 0,
            })],
            MatchStats::default(),
        );
        let err = replay(&script, &a, &b, &matching).err().unwrap();
        assert!(matches!(err, ApplyError::Cycle { .. }), "{err:?}");
    }
}
