//! Ordered, labeled syntax trees stored in an arena.
//!
//! Trees are assembled with a [`TreeBuilder`] and frozen by
//! [`TreeBuilder::finish`], which computes every derived attribute in one
//! pass each: sibling positions, depths, the depth index, the leaf list,
//! structural hashes and label vectors. A [`Tree`] has no mutators; matching
//! state lives outside of it.

use core::fmt;
use core::hash::{Hash, Hasher};
use indextree::{Arena, NodeEdge, NodeId};
use rapidhash::{RapidHashMap as HashMap, RapidHasher};

/// Separator between a node's kind and the value that discriminates it.
pub const LABEL_DELIM: &str = "|#|";

/// Kind (and label) of the virtual root.
pub const ROOT_KIND: &str = "root";

/// How many children a structural property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly one child, e.g. the condition of an `if`.
    Single,
    /// An ordered list of children, e.g. call arguments.
    List,
    /// The generic statement list of a code block.
    Statements,
}

/// The named property of its parent that a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Property name, e.g. `condition` or `arguments`.
    pub property: &'static str,
    /// Whether the property holds one child or a list.
    pub arity: Arity,
}

impl Slot {
    /// Property name of the statement list.
    pub const STATEMENTS: &'static str = "statements";

    /// A single-child property.
    pub const fn single(property: &'static str) -> Self {
        Self {
            property,
            arity: Arity::Single,
        }
    }

    /// A list property.
    pub const fn list(property: &'static str) -> Self {
        Self {
            property,
            arity: Arity::List,
        }
    }

    /// The statement list of a block.
    pub const fn statements() -> Self {
        Self {
            property: Self::STATEMENTS,
            arity: Arity::Statements,
        }
    }

    /// True for list properties, including the statement list.
    pub fn is_list(&self) -> bool {
        !matches!(self.arity, Arity::Single)
    }

    /// True for the statement list.
    pub fn is_statements(&self) -> bool {
        matches!(self.arity, Arity::Statements)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list() {
            write!(f, "{}[]", self.property)
        } else {
            f.write_str(self.property)
        }
    }
}

/// Syntactic roles the matcher and generator treat specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Anything else.
    #[default]
    Plain,
    /// A code block.
    Block,
    /// A body declaration (type, method, field, ...). Never replaced.
    Declaration,
}

/// Structural hash of a subtree (Merkle-style over labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeHash(pub u64);

/// Multiset of the labels found in a subtree, the node itself included.
///
/// Labels are keyed by their 64-bit hash so vectors from two different
/// trees can be compared directly.
#[derive(Debug, Clone, Default)]
pub struct LabelVector {
    counts: HashMap<u64, u32>,
    total: u32,
}

impl LabelVector {
    fn singleton(key: u64) -> Self {
        let mut counts = HashMap::default();
        counts.insert(key, 1);
        Self { counts, total: 1 }
    }

    fn absorb(&mut self, other: &LabelVector) {
        for (&key, &count) in &other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
        self.total += other.total;
    }

    /// Total number of label occurrences.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Dice coefficient: `2 × Σ min(a, b) / (|A| + |B|)`.
    pub fn dice(&self, other: &LabelVector) -> f64 {
        let denom = self.total + other.total;
        if denom == 0 {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let common: u32 = small
            .counts
            .iter()
            .map(|(key, &count)| count.min(large.counts.get(key).copied().unwrap_or(0)))
            .sum();
        2.0 * f64::from(common) / f64::from(denom)
    }
}

pub(crate) fn label_key(label: &str) -> u64 {
    let mut hasher = RapidHasher::default();
    label.hash(&mut hasher);
    hasher.finish()
}

/// Data attached to each node of a [`Tree`].
///
/// `kind`, `label`, `role`, `slot` and `line` come from the parser; the
/// remaining fields are filled in by [`TreeBuilder::finish`].
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Syntactic category, e.g. `method_invocation`.
    pub kind: &'static str,
    /// Category plus, where it matters, a discriminating value.
    pub label: String,
    /// Block/declaration role.
    pub role: Role,
    /// Property of the parent this node occupies (`None` for top-level nodes).
    pub slot: Option<Slot>,
    /// 1-based source line, 0 when unknown.
    pub line: u32,
    /// Distance from the virtual root.
    pub depth: u32,
    /// Index among the parent's children.
    pub position: u32,
    /// Structural hash of the subtree.
    pub hash: NodeHash,
    /// Label multiset of the subtree.
    pub vector: LabelVector,
}

impl NodeData {
    /// A node whose label is just its kind.
    pub fn new(kind: &'static str) -> Self {
        Self::labeled(kind, kind.to_string())
    }

    /// A node labeled `kind|#|value`.
    pub fn with_value(kind: &'static str, value: &str) -> Self {
        Self::labeled(kind, format!("{kind}{LABEL_DELIM}{value}"))
    }

    fn labeled(kind: &'static str, label: String) -> Self {
        Self {
            kind,
            label,
            role: Role::Plain,
            slot: None,
            line: 0,
            depth: 0,
            position: 0,
            hash: NodeHash::default(),
            vector: LabelVector::default(),
        }
    }

    /// Set the source line.
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Set the structural slot.
    pub fn in_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Mark as a code block.
    pub fn block(self) -> Self {
        self.with_role(Role::Block)
    }

    /// Mark as a body declaration.
    pub fn declaration(self) -> Self {
        self.with_role(Role::Declaration)
    }

    /// True for code blocks.
    pub fn is_block(&self) -> bool {
        self.role == Role::Block
    }

    /// True for body declarations.
    pub fn is_declaration(&self) -> bool {
        self.role == Role::Declaration
    }
}

/// Incrementally assembles a [`Tree`].
///
/// Nodes get their identity in creation order, so a parser that adds nodes
/// while walking its syntax tree in pre-order produces pre-order ids.
#[derive(Debug)]
pub struct TreeBuilder {
    arena: Arena<NodeData>,
    root: NodeId,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// A builder holding only the virtual root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::new(ROOT_KIND));
        Self { arena, root }
    }

    /// The virtual root; real top-level nodes are its children.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append `data` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.arena.new_node(data);
        parent.append(id, &mut self.arena);
        id
    }

    /// Compute every derived attribute and freeze the tree.
    pub fn finish(self) -> Tree {
        let Self { mut arena, root } = self;

        let pre_order: Vec<NodeId> = root.descendants(&arena).collect();

        // positions and depths, parents before children
        for &id in &pre_order {
            let depth = arena[id].get().depth;
            let children: Vec<NodeId> = id.children(&arena).collect();
            for (position, child) in children.into_iter().enumerate() {
                let data = arena[child].get_mut();
                data.depth = depth + 1;
                data.position = position as u32;
            }
        }

        // hashes and label vectors, children before parents
        for &id in pre_order.iter().rev() {
            let data = arena[id].get();
            let key = label_key(&data.label);
            let mut hasher = RapidHasher::default();
            data.label.hash(&mut hasher);
            let mut vector = LabelVector::singleton(key);
            for child in id.children(&arena) {
                let child = arena[child].get();
                child.hash.0.hash(&mut hasher);
                vector.absorb(&child.vector);
            }
            let data = arena[id].get_mut();
            data.hash = NodeHash(hasher.finish());
            data.vector = vector;
        }

        let mut by_depth: Vec<Vec<NodeId>> = Vec::new();
        let mut bfs = Vec::with_capacity(pre_order.len().saturating_sub(1));
        let mut leaves = Vec::new();
        let mut frontier = vec![root];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for id in frontier {
                next.extend(id.children(&arena));
            }
            for &id in &next {
                if arena[id].first_child().is_none() {
                    leaves.push(id);
                }
            }
            bfs.extend_from_slice(&next);
            if !next.is_empty() {
                by_depth.push(next.clone());
            }
            frontier = next;
        }

        Tree {
            arena,
            root,
            by_depth,
            bfs,
            leaves,
        }
    }
}

/// A frozen syntax tree.
#[derive(Debug)]
pub struct Tree {
    arena: Arena<NodeData>,
    root: NodeId,
    /// Nodes at depth `d + 1`, left to right.
    by_depth: Vec<Vec<NodeId>>,
    bfs: Vec<NodeId>,
    leaves: Vec<NodeId>,
}

impl Tree {
    /// The backing arena.
    pub fn arena(&self) -> &Arena<NodeData> {
        &self.arena
    }

    /// The virtual root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// True for the virtual root.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Number of real nodes (the virtual root is not counted).
    pub fn len(&self) -> usize {
        self.bfs.len()
    }

    /// True when the tree holds nothing but the virtual root.
    pub fn is_empty(&self) -> bool {
        self.bfs.is_empty()
    }

    /// Data of a node.
    #[inline]
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Syntactic category of a node.
    #[inline]
    pub fn kind(&self, id: NodeId) -> &'static str {
        self.get(id).kind
    }

    /// Label of a node.
    #[inline]
    pub fn label(&self, id: NodeId) -> &str {
        &self.get(id).label
    }

    /// Structural slot of a node.
    #[inline]
    pub fn slot(&self, id: NodeId) -> Option<Slot> {
        self.get(id).slot
    }

    /// Structural hash of a node's subtree.
    #[inline]
    pub fn hash(&self, id: NodeId) -> NodeHash {
        self.get(id).hash
    }

    /// True for code blocks.
    #[inline]
    pub fn is_block(&self, id: NodeId) -> bool {
        self.get(id).is_block()
    }

    /// True for body declarations.
    #[inline]
    pub fn is_declaration(&self, id: NodeId) -> bool {
        self.get(id).is_declaration()
    }

    /// Parent of a node; `None` only for the virtual root.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Children of a node, in source order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Children of a node, collected.
    pub fn child_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// True when the node has no children.
    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena[id].first_child().is_none()
    }

    /// Index among the parent's children.
    #[inline]
    pub fn position(&self, id: NodeId) -> usize {
        self.get(id).position as usize
    }

    /// Distance from the virtual root.
    #[inline]
    pub fn depth(&self, id: NodeId) -> usize {
        self.get(id).depth as usize
    }

    /// Previous sibling.
    #[inline]
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    /// Next sibling.
    #[inline]
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    /// All real nodes in pre-order.
    pub fn pre_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.descendants(&self.arena).skip(1)
    }

    /// All real nodes in breadth-first order.
    pub fn bfs(&self) -> &[NodeId] {
        &self.bfs
    }

    /// Real nodes at `depth` (1 = top-level), left to right.
    pub fn nodes_at_depth(&self, depth: usize) -> &[NodeId] {
        depth
            .checked_sub(1)
            .and_then(|d| self.by_depth.get(d))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Depth of the deepest node.
    pub fn height(&self) -> usize {
        self.by_depth.len()
    }

    /// Leaves in breadth-first order.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// True when `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// `node` is `root` or lies below it.
    pub fn is_ancestor_or_self(&self, root: NodeId, node: NodeId) -> bool {
        root == node || self.is_ancestor(root, node)
    }

    /// Dice similarity between `a` in this tree and `b` in `other`.
    pub fn similarity(&self, a: NodeId, other: &Tree, b: NodeId) -> f64 {
        self.get(a).vector.dice(&other.get(b).vector)
    }

    /// `label(line)` of a node, for messages and edit-op rendering.
    pub fn describe(&self, id: NodeId) -> Described<'_> {
        Described { tree: self, id }
    }

    /// The textual form of the structural hash: `{label` + children + `}`.
    pub fn hash_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        for edge in id.traverse(&self.arena) {
            match edge {
                NodeEdge::Start(n) => {
                    out.push('{');
                    out.push_str(self.label(n));
                }
                NodeEdge::End(_) => out.push('}'),
            }
        }
        out
    }

    /// Indented dump of the whole tree, one `label(line)` per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.root.descendants(&self.arena) {
            for _ in 0..self.depth(id) {
                out.push_str("  ");
            }
            out.push_str(&self.describe(id).to_string());
            out.push('\n');
        }
        out
    }
}

/// Display adapter returned by [`Tree::describe`].
#[derive(Clone, Copy)]
pub struct Described<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl fmt::Display for Described<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.tree.get(self.id);
        write!(f, "{}({})", data.label, data.line)
    }
}

impl fmt::Debug for Described<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
