//! Edit operations, nested edit scripts and their textual form.

use crate::matching::MatchStats;
use crate::tree::Tree;
use core::fmt;
use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

/// The five operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Remove a before node.
    Delete,
    /// Add an after node.
    Insert,
    /// Relocate a matched node.
    Move,
    /// Change the label of a matched node.
    Update,
    /// Swap a before subtree for an after subtree.
    Replace,
}

impl OpKind {
    /// Lowercase name used in rendered scripts.
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Delete => "delete",
            OpKind::Insert => "insert",
            OpKind::Move => "move",
            OpKind::Update => "update",
            OpKind::Replace => "replace",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an [`EditOp`] does. `_a` nodes live in the before tree, `_b` nodes
/// in the after tree.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Remove `node_a`, found at `position` under `parent_a`.
    Delete {
        /// The removed node.
        node_a: NodeId,
        /// Its parent in the before tree.
        parent_a: NodeId,
        /// Its index under `parent_a`.
        position: usize,
    },

    /// Add `node_b` at `position` under `parent_b`.
    Insert {
        /// The new node.
        node_b: NodeId,
        /// Its parent in the after tree.
        parent_b: NodeId,
        /// Its index under `parent_b`.
        position: usize,
    },

    /// Relocate `node_a` (matched to `node_b`) to `position` under `parent_b`.
    Move {
        /// The relocated node.
        node_a: NodeId,
        /// Its partner.
        node_b: NodeId,
        /// The new parent, in the after tree.
        parent_b: NodeId,
        /// Index under `parent_b`.
        position: usize,
    },

    /// Relabel `node_a` with the label of its partner `node_b`.
    Update {
        /// The relabeled node.
        node_a: NodeId,
        /// Its partner, holding the new label.
        node_b: NodeId,
    },

    /// Swap the subtree at `node_a` for the subtree at `node_b`.
    Replace {
        /// Root of the replaced subtree.
        node_a: NodeId,
        /// Root of the replacement.
        node_b: NodeId,
    },
}

impl Action {
    /// The operation type.
    pub fn kind(&self) -> OpKind {
        match self {
            Action::Delete { .. } => OpKind::Delete,
            Action::Insert { .. } => OpKind::Insert,
            Action::Move { .. } => OpKind::Move,
            Action::Update { .. } => OpKind::Update,
            Action::Replace { .. } => OpKind::Replace,
        }
    }

    /// The primary node: the after node for an Insert, the before node
    /// for everything else.
    pub fn node(&self) -> NodeId {
        match *self {
            Action::Insert { node_b, .. } => node_b,
            Action::Delete { node_a, .. }
            | Action::Move { node_a, .. }
            | Action::Update { node_a, .. }
            | Action::Replace { node_a, .. } => node_a,
        }
    }

    /// True when [`Action::node`] belongs to the after tree.
    pub fn in_after_tree(&self) -> bool {
        matches!(self, Action::Insert { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Delete {
                node_a,
                parent_a,
                position,
            } => write!(
                f,
                "Delete(a:{} @{} under a:{})",
                usize::from(node_a),
                position,
                usize::from(parent_a)
            ),
            Action::Insert {
                node_b,
                parent_b,
                position,
            } => write!(
                f,
                "Insert(b:{} @{} under b:{})",
                usize::from(node_b),
                position,
                usize::from(parent_b)
            ),
            Action::Move {
                node_a,
                node_b,
                parent_b,
                position,
            } => write!(
                f,
                "Move(a:{} → b:{} @{} under b:{})",
                usize::from(node_a),
                usize::from(node_b),
                position,
                usize::from(parent_b)
            ),
            Action::Update { node_a, node_b } => write!(
                f,
                "Update(a:{} → b:{})",
                usize::from(node_a),
                usize::from(node_b)
            ),
            Action::Replace { node_a, node_b } => write!(
                f,
                "Replace(a:{} with b:{})",
                usize::from(node_a),
                usize::from(node_b)
            ),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An operation plus the operations on descendants it subsumes.
#[derive(Clone, PartialEq, Eq)]
pub struct EditOp {
    /// What this operation does.
    pub action: Action,
    /// Nested operations on descendants of [`EditOp::node`].
    pub children: Vec<EditOp>,
}

impl EditOp {
    /// An operation with nothing nested.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            children: Vec::new(),
        }
    }

    /// The operation type.
    pub fn kind(&self) -> OpKind {
        self.action.kind()
    }

    /// The primary node (see [`Action::node`]).
    pub fn node(&self) -> NodeId {
        self.action.node()
    }

    /// Number of operations in this subtree, this one included.
    pub fn size(&self) -> usize {
        self.subtree().count()
    }

    /// This operation and every nested one, in pre-order.
    pub fn subtree(&self) -> impl Iterator<Item = &EditOp> + '_ {
        self.walk().map(|(_, op)| op)
    }

    /// Like [`EditOp::subtree`], with each operation's nesting depth.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Nest `op` under the operation of this subtree whose node is the
    /// parent of `op`'s node, keeping siblings ordered by node id. An
    /// operation on a node that is already present is dropped.
    ///
    /// `tree` is the tree both operations' nodes belong to. Gives `op` back
    /// when no operation here holds its parent.
    pub fn attach(&mut self, op: EditOp, tree: &Tree) -> Result<(), EditOp> {
        let Some(parent) = tree.parent(op.node()) else {
            return Err(op);
        };
        let Some(path) = self.path_to(parent) else {
            return Err(op);
        };
        let mut target = self;
        for index in path {
            target = &mut target.children[index];
        }

        let id = usize::from(op.node());
        match target
            .children
            .iter()
            .position(|c| usize::from(c.node()) >= id)
        {
            Some(i) if target.children[i].node() == op.node() => {}
            Some(i) => target.children.insert(i, op),
            None => target.children.push(op),
        }
        Ok(())
    }

    /// Child indices leading to the first operation (pre-order) on `node`.
    fn path_to(&self, node: NodeId) -> Option<Vec<usize>> {
        let mut stack: Vec<(&EditOp, Vec<usize>)> = vec![(self, Vec::new())];
        while let Some((op, path)) = stack.pop() {
            if op.node() == node {
                return Some(path);
            }
            for (i, child) in op.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child, child_path));
            }
        }
        None
    }

    /// Build an operation for every node of the subtree at `root`, nested
    /// the way the nodes are.
    pub(crate) fn for_subtree(tree: &Tree, root: NodeId, action: impl Fn(NodeId) -> Action) -> Self {
        let nodes: Vec<NodeId> = root.descendants(tree.arena()).collect();
        let index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let mut built: Vec<Option<EditOp>> = nodes.iter().map(|&n| Some(EditOp::new(action(n)))).collect();

        // children come after their parent in pre-order: fold from the back
        for i in (1..nodes.len()).rev() {
            let Some(mut op) = built[i].take() else {
                continue;
            };
            op.children.reverse();
            if let Some(parent) = tree.parent(nodes[i])
                && let Some(&p) = index.get(&parent)
                && let Some(parent_op) = built[p].as_mut()
            {
                parent_op.children.push(op);
            }
        }
        let mut top = built[0].take().unwrap_or_else(|| EditOp::new(action(root)));
        top.children.reverse();
        top
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.action, f)?;
        if !self.children.is_empty() {
            write!(f, " +{}", self.size() - 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Pre-order walk over nested operations, see [`EditOp::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, &'a EditOp)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a EditOp);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, op) = self.stack.pop()?;
        self.stack
            .extend(op.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, op))
    }
}

/// The result of a diff: top-level operations in emission order plus the
/// matcher's counters.
#[derive(Debug, Clone, Default)]
pub struct EditScript {
    ops: Vec<EditOp>,
    stats: MatchStats,
}

impl EditScript {
    pub(crate) fn new(ops: Vec<EditOp>, stats: MatchStats) -> Self {
        Self { ops, stats }
    }

    /// Top-level operations.
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Matching counters.
    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Number of top-level operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when the trees are equivalent.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Every operation, nested ones included, top-level order then pre-order.
    pub fn all_ops(&self) -> impl Iterator<Item = &EditOp> + '_ {
        self.ops.iter().flat_map(EditOp::subtree)
    }

    /// Number of top-level operations of `kind`.
    pub fn count(&self, kind: OpKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    /// One line per top-level operation.
    pub fn display<'a>(&'a self, before: &'a Tree, after: &'a Tree) -> ScriptDisplay<'a> {
        ScriptDisplay {
            script: self,
            before,
            after,
            nested: false,
        }
    }

    /// Every operation, nested ones indented by one tab per level.
    pub fn display_nested<'a>(&'a self, before: &'a Tree, after: &'a Tree) -> ScriptDisplay<'a> {
        ScriptDisplay {
            script: self,
            before,
            after,
            nested: true,
        }
    }
}

/// Renders one operation as `type\tdetails`.
pub struct OpDisplay<'a> {
    op: &'a EditOp,
    before: &'a Tree,
    after: &'a Tree,
}

impl<'a> OpDisplay<'a> {
    /// Render `op`, resolving its nodes in `before` and `after`.
    pub fn new(op: &'a EditOp, before: &'a Tree, after: &'a Tree) -> Self {
        Self { op, before, after }
    }
}

impl fmt::Display for OpDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (before, after) = (self.before, self.after);
        write!(f, "{}\t", self.op.kind())?;
        match self.op.action {
            Action::Delete {
                node_a,
                parent_a,
                position,
            } => write!(
                f,
                "{},{},{}",
                before.describe(node_a),
                before.describe(parent_a),
                position
            ),
            Action::Insert {
                node_b,
                parent_b,
                position,
            } => write!(
                f,
                "{},{},{}",
                after.describe(node_b),
                after.describe(parent_b),
                position
            ),
            Action::Move {
                node_a,
                parent_b,
                position,
                ..
            } => {
                let from = before.parent(node_a).unwrap_or(before.root());
                write!(
                    f,
                    "{} from {},{} to {},{}",
                    before.describe(node_a),
                    before.describe(from),
                    before.position(node_a),
                    after.describe(parent_b),
                    position
                )
            }
            Action::Update { node_a, node_b } => {
                write!(f, "{} to {}", before.describe(node_a), after.label(node_b))
            }
            Action::Replace { node_a, node_b } => write!(
                f,
                "{} with {}",
                before.describe(node_a),
                after.describe(node_b)
            ),
        }
    }
}

/// Renders a whole script, see [`EditScript::display`].
pub struct ScriptDisplay<'a> {
    script: &'a EditScript,
    before: &'a Tree,
    after: &'a Tree,
    nested: bool,
}

impl fmt::Display for ScriptDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for top in &self.script.ops {
            if !self.nested {
                writeln!(f, "{}", OpDisplay::new(top, self.before, self.after))?;
                continue;
            }
            for (depth, op) in top.walk() {
                for _ in 0..depth {
                    f.write_str("\t")?;
                }
                writeln!(f, "{}", OpDisplay::new(op, self.before, self.after))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeData, TreeBuilder};
    use facet_testhelpers::test;

    /// root -> call(line 1) -> [name, args -> [lit 1, lit 2]]
    fn sample() -> (Tree, Vec<NodeId>) {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let call = b.add_child(root, NodeData::new("method_invocation").at_line(1));
        let name = b.add_child(call, NodeData::with_value("identifier", "foo").at_line(1));
        let args = b.add_child(call, NodeData::new("argument_list").at_line(1));
        let one = b.add_child(args, NodeData::with_value("decimal_integer_literal", "1").at_line(1));
        let two = b.add_child(args, NodeData::with_value("decimal_integer_literal", "2").at_line(2));
        (b.finish(), vec![call, name, args, one, two])
    }

    fn delete(tree: &Tree, n: NodeId) -> Action {
        Action::Delete {
            node_a: n,
            parent_a: tree.parent(n).unwrap(),
            position: tree.position(n),
        }
    }

    #[test]
    fn test_for_subtree_nests_like_the_tree() {
        let (tree, ids) = sample();
        let op = EditOp::for_subtree(&tree, ids[0], |n| delete(&tree, n));

        assert_eq!(op.size(), 5);
        let order: Vec<NodeId> = op.subtree().map(EditOp::node).collect();
        assert_eq!(order, ids);
        let depths: Vec<usize> = op.walk().map(|(d, _)| d).collect();
        assert_eq!(depths, vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_attach_orders_by_id_and_drops_duplicates() {
        let (tree, ids) = sample();
        let mut op = EditOp::new(delete(&tree, ids[0]));
        op.attach(EditOp::new(delete(&tree, ids[2])), &tree).unwrap();
        op.attach(EditOp::new(delete(&tree, ids[1])), &tree).unwrap();
        op.attach(EditOp::new(delete(&tree, ids[4])), &tree).unwrap();
        op.attach(EditOp::new(delete(&tree, ids[3])), &tree).unwrap();
        op.attach(EditOp::new(delete(&tree, ids[3])), &tree).unwrap();

        let order: Vec<NodeId> = op.subtree().map(EditOp::node).collect();
        assert_eq!(order, ids);

        // the root's parent is not part of this op
        let stray = EditOp::new(Action::Update {
            node_a: ids[0],
            node_b: ids[0],
        });
        assert!(op.attach(stray, &tree).is_err());
    }

    #[test]
    fn test_rendering() {
        let (tree, ids) = sample();
        let del = EditOp::for_subtree(&tree, ids[2], |n| delete(&tree, n));
        let update = EditOp::new(Action::Update {
            node_a: ids[3],
            node_b: ids[4],
        });
        let mv = EditOp::new(Action::Move {
            node_a: ids[4],
            node_b: ids[4],
            parent_b: ids[2],
            position: 0,
        });
        let replace = EditOp::new(Action::Replace {
            node_a: ids[1],
            node_b: ids[3],
        });
        let script = EditScript::new(vec![del, update, mv, replace], MatchStats::default());

        let flat = script.display(&tree, &tree).to_string();
        assert_eq!(
            flat,
            "delete\targument_list(1),method_invocation(1),1\n\
             update\tdecimal_integer_literal|#|1(1) to decimal_integer_literal|#|2\n\
             move\tdecimal_integer_literal|#|2(2) from argument_list(1),1 to argument_list(1),0\n\
             replace\tidentifier|#|foo(1) with decimal_integer_literal|#|1(1)\n"
        );

        let nested = script.display_nested(&tree, &tree).to_string();
        assert!(nested.starts_with(
            "delete\targument_list(1),method_invocation(1),1\n\
             \tdelete\tdecimal_integer_literal|#|1(1),argument_list(1),0\n\
             \tdelete\tdecimal_integer_literal|#|2(2),argument_list(1),1\n"
        ));
        assert_eq!(script.all_ops().count(), 6);
        assert_eq!(script.count(OpKind::Delete), 1);
    }

    #[test]
    fn test_debug_uses_ids() {
        let (tree, ids) = sample();
        let op = EditOp::for_subtree(&tree, ids[2], |n| delete(&tree, n));
        assert_eq!(format!("{op:?}"), "Delete(a:4 @1 under a:2) +2");
    }
}
