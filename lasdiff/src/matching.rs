//! Node matching between a before tree and an after tree.
//!
//! Four phases run in order, each only ever adding pairs:
//! 1. Exact: subtrees with equal structural hashes, found by searching a
//!    window around the node at the same position in the other tree.
//! 2. Similarity: mutual best candidates by label-vector Dice similarity.
//! 3. Follow-up: an unmatched inner node inherits the partner of its
//!    children's parent, or of a sibling's neighbor.
//! 4. Leaves: remaining leaves under matched parents, by slot and by
//!    label alignment within list slots.
//!
//! The two virtual roots are paired before any phase starts.

use crate::candidates::{Candidates, find_candidates};
use crate::lcs::LcsTable;
use crate::tree::{Slot, Tree};
use crate::{DiffConfig, DiffError, debug, trace};
use indexmap::IndexMap;
use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

/// Which of the two trees a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Before,
    After,
}

impl Side {
    pub(crate) fn other(self) -> Self {
        match self {
            Side::Before => Side::After,
            Side::After => Side::Before,
        }
    }
}

/// Why a pair was refused by [`Matching::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConflict {
    /// The before node already has this partner.
    Before {
        /// Current partner in the after tree.
        existing: NodeId,
    },
    /// The after node already has this partner.
    After {
        /// Current partner in the before tree.
        existing: NodeId,
    },
}

/// Partial one-to-one correspondence between before-tree nodes (`a`) and
/// after-tree nodes (`b`).
///
/// Both directions are tables indexed by arena id, so "is this node already
/// paired" is a single lookup. Pairs are never removed.
#[derive(Debug, Clone)]
pub struct Matching {
    a_to_b: Vec<Option<NodeId>>,
    b_to_a: Vec<Option<NodeId>>,
    /// Pairs in the order they were added.
    pairs: Vec<(NodeId, NodeId)>,
}

impl Default for Matching {
    fn default() -> Self {
        Self::new()
    }
}

impl Matching {
    /// No pairs; tables grow on demand.
    pub fn new() -> Self {
        Self {
            a_to_b: Vec::new(),
            b_to_a: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Tables sized for arenas of `max_a` and `max_b` slots.
    pub fn with_capacity(max_a: usize, max_b: usize) -> Self {
        Self {
            a_to_b: vec![None; max_a],
            b_to_a: vec![None; max_b],
            pairs: Vec::new(),
        }
    }

    /// Pair `a` with `b`.
    ///
    /// Re-adding an existing pair is a no-op; pairing a node that already
    /// has a different partner is refused and leaves the matching untouched.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<(), MatchConflict> {
        match (self.get_b(a), self.get_a(b)) {
            (Some(existing), _) if existing == b => return Ok(()),
            (Some(existing), _) => return Err(MatchConflict::Before { existing }),
            (None, Some(existing)) => return Err(MatchConflict::After { existing }),
            (None, None) => {}
        }

        let a_idx = usize::from(a);
        let b_idx = usize::from(b);
        if a_idx >= self.a_to_b.len() {
            self.a_to_b.resize(a_idx + 1, None);
        }
        if b_idx >= self.b_to_a.len() {
            self.b_to_a.resize(b_idx + 1, None);
        }

        self.a_to_b[a_idx] = Some(b);
        self.b_to_a[b_idx] = Some(a);
        self.pairs.push((a, b));
        Ok(())
    }

    /// Whether before node `a` has a partner.
    #[inline(always)]
    pub fn contains_a(&self, a: NodeId) -> bool {
        self.get_b(a).is_some()
    }

    /// Whether after node `b` has a partner.
    #[inline(always)]
    pub fn contains_b(&self, b: NodeId) -> bool {
        self.get_a(b).is_some()
    }

    /// Partner of a before node.
    #[inline(always)]
    pub fn get_b(&self, a: NodeId) -> Option<NodeId> {
        self.a_to_b.get(usize::from(a)).copied().flatten()
    }

    /// Partner of an after node.
    #[inline(always)]
    pub fn get_a(&self, b: NodeId) -> Option<NodeId> {
        self.b_to_a.get(usize::from(b)).copied().flatten()
    }

    /// All matched pairs, oldest first.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Pairs so far, the virtual roots included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True only before the virtual roots are paired.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// How many nodes each phase matched. Every pair counts two nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Nodes matched by the exact phase, subtree descendants included.
    pub exact: usize,
    /// Nodes matched by the similarity phase.
    pub similar: usize,
    /// Nodes matched by the follow-up phase.
    pub follow_up: usize,
    /// Leaves matched by the leaf phase.
    pub leaf: usize,
    /// Nodes matched as roots of an exact subtree match.
    pub exact_roots: usize,
}

impl MatchStats {
    /// Total matched nodes, the virtual roots excluded.
    pub fn total(&self) -> usize {
        self.exact + self.similar + self.follow_up + self.leaf
    }
}

/// Compute the matching between two trees.
///
/// The result pairs the two virtual roots plus whatever the four phases
/// find. An error means a phase tried to re-pair an already matched node,
/// which is a bug in the matcher rather than a property of the input.
pub fn compute_matching(
    before: &Tree,
    after: &Tree,
    config: &DiffConfig,
) -> Result<(Matching, MatchStats), DiffError> {
    debug!(
        nodes_before = before.len(),
        nodes_after = after.len(),
        "compute_matching start"
    );
    let mut matcher = Matcher::new(before, after, config)?;

    if config.enable_exact_match {
        matcher.exact_phase()?;
        debug!(matched = matcher.matching.len(), "after exact_phase");
    }
    matcher.similarity_phase()?;
    debug!(matched = matcher.matching.len(), "after similarity_phase");
    matcher.follow_up_phase()?;
    debug!(matched = matcher.matching.len(), "after follow_up_phase");
    matcher.leaf_phase()?;
    debug!(matched = matcher.matching.len(), "after leaf_phase");

    Ok((matcher.matching, matcher.stats))
}

/// Step of a similarity frame.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Start,
    ScanX(usize),
    ScanY(usize),
    Descend,
}

/// One level of the similarity descent: a list of nodes on `x_side` and a
/// list on the other side used as candidate anchors.
#[derive(Debug)]
struct Frame {
    xs: Vec<NodeId>,
    ys: Vec<NodeId>,
    x_side: Side,
    stage: Stage,
}

impl Frame {
    fn new(xs: Vec<NodeId>, ys: Vec<NodeId>, x_side: Side) -> Self {
        Self {
            xs,
            ys,
            x_side,
            stage: Stage::Start,
        }
    }
}

struct Matcher<'t> {
    before: &'t Tree,
    after: &'t Tree,
    config: &'t DiffConfig,
    matching: Matching,
    stats: MatchStats,
    before_candidates: Candidates,
    after_candidates: Candidates,
}

impl<'t> Matcher<'t> {
    fn new(before: &'t Tree, after: &'t Tree, config: &'t DiffConfig) -> Result<Self, DiffError> {
        let mut matcher = Self {
            before,
            after,
            config,
            matching: Matching::with_capacity(
                before.arena().count() + 1,
                after.arena().count() + 1,
            ),
            stats: MatchStats::default(),
            before_candidates: Candidates::for_tree(before),
            after_candidates: Candidates::for_tree(after),
        };
        matcher.link(Side::Before, before.root(), after.root())?;
        Ok(matcher)
    }

    fn tree(&self, side: Side) -> &'t Tree {
        match side {
            Side::Before => self.before,
            Side::After => self.after,
        }
    }

    fn candidates_mut(&mut self, side: Side) -> &mut Candidates {
        match side {
            Side::Before => &mut self.before_candidates,
            Side::After => &mut self.after_candidates,
        }
    }

    fn best_candidate(&self, side: Side, node: NodeId) -> Option<NodeId> {
        match side {
            Side::Before => self.before_candidates.best(node),
            Side::After => self.after_candidates.best(node),
        }
    }

    fn partner(&self, side: Side, node: NodeId) -> Option<NodeId> {
        match side {
            Side::Before => self.matching.get_b(node),
            Side::After => self.matching.get_a(node),
        }
    }

    fn is_matched(&self, side: Side, node: NodeId) -> bool {
        self.partner(side, node).is_some()
    }

    /// Pair `x` (on `side`) with `y` (on the other side).
    fn link(&mut self, side: Side, x: NodeId, y: NodeId) -> Result<(), DiffError> {
        let (a, b) = match side {
            Side::Before => (x, y),
            Side::After => (y, x),
        };
        self.matching.add(a, b).map_err(|conflict| match conflict {
            MatchConflict::Before { existing } => DiffError::MatchInvariantViolation {
                node: format!("before node {}", self.before.describe(a)),
                existing: format!("after node {}", self.after.describe(existing)),
                attempted: format!("after node {}", self.after.describe(b)),
            },
            MatchConflict::After { existing } => DiffError::MatchInvariantViolation {
                node: format!("after node {}", self.after.describe(b)),
                existing: format!("before node {}", self.before.describe(existing)),
                attempted: format!("before node {}", self.before.describe(a)),
            },
        })
    }

    /// Next level of a descent: every child of the nodes in `nodes` that
    /// are still unmatched. Matched children stay in the list so that
    /// positional anchors line up with the sibling lists.
    fn children_of_unmatched(&self, side: Side, nodes: &[NodeId]) -> Vec<NodeId> {
        let tree = self.tree(side);
        nodes
            .iter()
            .filter(|&&n| !self.is_matched(side, n))
            .flat_map(|&n| tree.children(n))
            .collect()
    }

    // ------------------------------------------------------------------
    // Phase 1: exact

    fn exact_phase(&mut self) -> Result<(), DiffError> {
        let mut xs = self.before.child_vec(self.before.root());
        let mut ys = self.after.child_vec(self.after.root());
        let mut x_side = Side::Before;

        loop {
            if xs.len() < ys.len() {
                core::mem::swap(&mut xs, &mut ys);
                x_side = x_side.other();
            }
            // the shorter list is empty: nothing left to anchor on
            let Some(&last_y) = ys.last() else {
                break;
            };

            let x_tree = self.tree(x_side);
            for (i, &x) in xs.iter().enumerate() {
                let anchor = ys.get(i).copied().unwrap_or(last_y);
                if !x_tree.is_leaf(x) && !self.is_matched(x_side, x) {
                    self.exact_match_one(x_side, x, anchor)?;
                }
            }

            let x_children = self.children_of_unmatched(x_side, &xs);
            let y_children = self.children_of_unmatched(x_side.other(), &ys);
            match (x_children.is_empty(), y_children.is_empty()) {
                (false, false) => {
                    xs = x_children;
                    ys = y_children;
                }
                (false, true) => xs = x_children,
                (true, false) => {
                    ys = core::mem::replace(&mut xs, y_children);
                    x_side = x_side.other();
                }
                (true, true) => break,
            }
        }
        Ok(())
    }

    fn exact_match_one(&mut self, x_side: Side, x: NodeId, anchor: NodeId) -> Result<(), DiffError> {
        let y_side = x_side.other();
        let x_tree = self.tree(x_side);
        let y_tree = self.tree(y_side);
        let hash = x_tree.hash(x);

        let found = find_candidates(x_tree, x, y_tree, anchor, self.config)
            .into_iter()
            .find(|&c| !self.is_matched(y_side, c) && y_tree.hash(c) == hash);
        let Some(y) = found else {
            return Ok(());
        };

        trace!(x = %x_tree.describe(x), y = %y_tree.describe(y), "exact match");
        self.link(x_side, x, y)?;
        self.stats.exact_roots += 2;
        self.stats.exact += 2;

        // equal hashes imply equal shapes: pair descendants index by index
        let mut stack = vec![(x, y)];
        while let Some((p, q)) = stack.pop() {
            for (pc, qc) in x_tree.children(p).zip(y_tree.children(q)) {
                if self.is_matched(x_side, pc) || self.is_matched(y_side, qc) {
                    continue;
                }
                self.link(x_side, pc, qc)?;
                self.stats.exact += 2;
                stack.push((pc, qc));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 2: similarity

    fn similarity_phase(&mut self) -> Result<(), DiffError> {
        let mut stack = vec![Frame::new(
            self.before.child_vec(self.before.root()),
            self.after.child_vec(self.after.root()),
            Side::Before,
        )];

        while let Some(frame) = stack.last_mut() {
            let x_side = frame.x_side;
            let y_side = x_side.other();
            let mut descend = None;
            let mut done = false;

            match frame.stage {
                Stage::Start => {
                    self.update_candidates(x_side, &frame.xs, &frame.ys);
                    self.update_candidates(y_side, &frame.ys, &frame.xs);
                    frame.stage = Stage::ScanX(0);
                }
                Stage::ScanX(i) => match frame.xs.get(i) {
                    Some(&n) => {
                        frame.stage = Stage::ScanX(i + 1);
                        descend = self.mutual_match(x_side, n)?;
                    }
                    None => frame.stage = Stage::ScanY(0),
                },
                Stage::ScanY(i) => match frame.ys.get(i) {
                    Some(&n) => {
                        frame.stage = Stage::ScanY(i + 1);
                        descend = self.mutual_match(y_side, n)?;
                    }
                    None => frame.stage = Stage::Descend,
                },
                Stage::Descend => {
                    let x_children = self.children_of_unmatched(x_side, &frame.xs);
                    let y_children = self.children_of_unmatched(y_side, &frame.ys);
                    match (x_children.is_empty(), y_children.is_empty()) {
                        (false, false) => *frame = Frame::new(x_children, y_children, x_side),
                        (false, true) => {
                            let ys = core::mem::take(&mut frame.ys);
                            *frame = Frame::new(x_children, ys, x_side);
                        }
                        (true, false) => {
                            let xs = core::mem::take(&mut frame.xs);
                            *frame = Frame::new(y_children, xs, y_side);
                        }
                        (true, true) => done = true,
                    }
                }
            }

            if done {
                stack.pop();
            }
            if let Some(next) = descend {
                stack.push(next);
            }
        }
        Ok(())
    }

    /// Record similarity candidates for every unmatched inner node of `xs`,
    /// anchored at the node of `ys` with the same index (or the last one).
    fn update_candidates(&mut self, x_side: Side, xs: &[NodeId], ys: &[NodeId]) {
        let Some(&last_y) = ys.last() else {
            return;
        };
        let y_side = x_side.other();
        let x_tree = self.tree(x_side);
        let y_tree = self.tree(y_side);
        let threshold = self.config.similarity_threshold;

        for (i, &x) in xs.iter().enumerate() {
            if x_tree.is_leaf(x) || self.is_matched(x_side, x) {
                continue;
            }
            let anchor = ys.get(i).copied().unwrap_or(last_y);
            let parent_partner = x_tree.parent(x).and_then(|p| self.partner(x_side, p));

            for c in find_candidates(x_tree, x, y_tree, anchor, self.config) {
                // a block whose parent is already paired belongs under that partner
                if x_tree.is_block(x) && parent_partner.is_some() && parent_partner == y_tree.parent(c) {
                    self.candidates_mut(x_side).add(x, c, 1.0);
                    break;
                }
                let sim = x_tree.similarity(x, y_tree, c);
                if sim >= 1.0 {
                    self.candidates_mut(x_side).add(x, c, sim);
                    break;
                }
                if sim >= threshold {
                    self.candidates_mut(x_side).add(x, c, sim);
                }
            }
        }
    }

    /// Pair `n` with its best candidate when that candidate prefers `n` too.
    /// Returns the frame for their children.
    fn mutual_match(&mut self, side: Side, n: NodeId) -> Result<Option<Frame>, DiffError> {
        let other = side.other();
        if self.is_matched(side, n) {
            return Ok(None);
        }
        let Some(m) = self.best_candidate(side, n) else {
            return Ok(None);
        };
        if self.is_matched(other, m) || self.best_candidate(other, m) != Some(n) {
            return Ok(None);
        }

        trace!(
            x = %self.tree(side).describe(n),
            y = %self.tree(other).describe(m),
            "similarity match"
        );
        self.link(side, n, m)?;
        self.stats.similar += 2;

        let n_children = self.tree(side).child_vec(n);
        let m_children = self.tree(other).child_vec(m);
        Ok(Some(Frame::new(n_children, m_children, side)))
    }

    // ------------------------------------------------------------------
    // Phase 3: follow-up

    fn follow_up_phase(&mut self) -> Result<(), DiffError> {
        for side in [Side::Before, Side::After] {
            let tree = self.tree(side);
            for &n in tree.bfs() {
                if self.is_matched(side, n) || tree.is_leaf(n) {
                    continue;
                }
                if tree.is_block(n) {
                    if tree.parent(n).is_some_and(|p| self.is_matched(side, p)) {
                        self.match_block_under_parent(side, n)?;
                    }
                    continue;
                }
                self.follow_up(side, n)?;
            }
        }
        Ok(())
    }

    /// Pair an unmatched block with the first unmatched block child of its
    /// parent's partner.
    fn match_block_under_parent(&mut self, side: Side, block: NodeId) -> Result<(), DiffError> {
        let other = side.other();
        let tree = self.tree(side);
        let other_tree = self.tree(other);
        let Some(parent_partner) = tree.parent(block).and_then(|p| self.partner(side, p)) else {
            return Ok(());
        };
        let target = other_tree
            .children(parent_partner)
            .find(|&c| !self.is_matched(other, c) && other_tree.is_block(c));
        if let Some(target) = target {
            self.link_follow_up(side, block, target)?;
        }
        Ok(())
    }

    fn follow_up(&mut self, side: Side, n: NodeId) -> Result<(), DiffError> {
        let other = side.other();
        let tree = self.tree(side);
        let other_tree = self.tree(other);
        let parent_partner = tree.parent(n).and_then(|p| self.partner(side, p));
        let mut found: Option<NodeId> = None;

        for child in tree.child_vec(n) {
            if tree.is_block(child) && !self.is_matched(side, child) {
                self.follow_up(side, child)?;
            }
            let Some(candidate) = self.partner(side, child).and_then(|cm| other_tree.parent(cm)) else {
                continue;
            };
            if self.is_matched(other, candidate) || other_tree.kind(candidate) != tree.kind(n) {
                continue;
            }
            // parents already paired with each other: settled
            if parent_partner.is_some() && parent_partner == other_tree.parent(candidate) {
                return self.link_follow_up(side, n, candidate);
            }
            match found {
                None => found = Some(candidate),
                // children disagree about where they went
                Some(f) if f != candidate => return Ok(()),
                Some(_) => {}
            }
        }

        let found = match found {
            Some(f) => Some(f),
            None => self.neighbor_match(side, n),
        };
        if let Some(m) = found
            && !self.is_matched(other, m)
        {
            self.link_follow_up(side, n, m)?;
        }
        Ok(())
    }

    /// A partner for `n` next to the partner of one of its siblings.
    fn neighbor_match(&self, side: Side, n: NodeId) -> Option<NodeId> {
        let tree = self.tree(side);
        let other_tree = self.tree(side.other());
        let parent_partner = tree.parent(n).and_then(|p| self.partner(side, p))?;

        let candidate = if let Some(left) = tree.left(n)
            && let Some(left_partner) = self.partner(side, left)
        {
            if other_tree.parent(left_partner) != Some(parent_partner) {
                return None;
            }
            other_tree.right(left_partner)?
        } else if let Some(right) = tree.right(n)
            && let Some(right_partner) = self.partner(side, right)
        {
            if other_tree.parent(right_partner) != Some(parent_partner) {
                return None;
            }
            other_tree.left(right_partner)?
        } else {
            return None;
        };

        let acceptable = !self.is_matched(side.other(), candidate)
            && other_tree.kind(candidate) == tree.kind(n)
            && leaf_child_similarity(tree, n, other_tree, candidate) >= self.config.similarity_threshold;
        acceptable.then_some(candidate)
    }

    fn link_follow_up(&mut self, side: Side, x: NodeId, y: NodeId) -> Result<(), DiffError> {
        trace!(
            x = %self.tree(side).describe(x),
            y = %self.tree(side.other()).describe(y),
            "follow-up match"
        );
        self.link(side, x, y)?;
        self.stats.follow_up += 2;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 4: leaves

    fn leaf_phase(&mut self) -> Result<(), DiffError> {
        let before = self.before;
        let after = self.after;

        for n in core::iter::once(before.root()).chain(before.bfs().iter().copied()) {
            let Some(m) = self.matching.get_b(n) else {
                continue;
            };
            if before.is_leaf(n) {
                continue;
            }

            let leaves: Vec<NodeId> = before
                .children(n)
                .filter(|&c| before.is_leaf(c) && !self.matching.contains_a(c))
                .collect();

            let mut listed = Vec::new();
            for leaf in leaves {
                let slot = before.slot(leaf);
                if slot.is_some_and(|s| s.is_list()) {
                    listed.push(leaf);
                    continue;
                }
                let target = after
                    .children(m)
                    .find(|&c| !self.matching.contains_b(c) && after.slot(c) == slot);
                if let Some(target) = target {
                    self.link_leaf(leaf, target)?;
                }
            }

            let old_groups = group_by_list_slot(before, listed);
            let new_groups = group_by_list_slot(
                after,
                after.children(m).filter(|&c| !self.matching.contains_b(c)),
            );
            for (slot, olds) in old_groups {
                if let Some(news) = new_groups.get(&slot) {
                    self.align_leaves(&olds, news)?;
                }
            }
        }
        Ok(())
    }

    /// Pair leaves of one list slot: equal labels at equal indices first,
    /// then an LCS over the labels of what is left, then equal kinds at
    /// equal indices.
    fn align_leaves(&mut self, olds: &[NodeId], news: &[NodeId]) -> Result<(), DiffError> {
        let before = self.before;
        let after = self.after;
        let mut old_rest = Vec::new();
        let mut new_rest = Vec::new();

        for i in 0..olds.len().max(news.len()) {
            match (olds.get(i), news.get(i)) {
                (Some(&o), Some(&n)) if before.label(o) == after.label(n) => self.link_leaf(o, n)?,
                (o, n) => {
                    old_rest.extend(o);
                    new_rest.extend(n);
                }
            }
        }

        let agree = |i: usize, j: usize| before.label(old_rest[i]) == after.label(new_rest[j]);
        let table = LcsTable::new(old_rest.len(), new_rest.len(), agree);
        for (i, j) in table.align(old_rest.len(), new_rest.len(), agree) {
            self.link_leaf(old_rest[i], new_rest[j])?;
        }

        for (&o, &n) in olds.iter().zip(news) {
            if !self.matching.contains_a(o)
                && !self.matching.contains_b(n)
                && before.kind(o) == after.kind(n)
            {
                self.link_leaf(o, n)?;
            }
        }
        Ok(())
    }

    fn link_leaf(&mut self, a: NodeId, b: NodeId) -> Result<(), DiffError> {
        trace!(a = %self.before.describe(a), b = %self.after.describe(b), "leaf match");
        self.link(Side::Before, a, b)?;
        self.stats.leaf += 2;
        Ok(())
    }
}

/// Nodes with a list slot, grouped by slot in order of first appearance.
fn group_by_list_slot(tree: &Tree, nodes: impl IntoIterator<Item = NodeId>) -> IndexMap<Slot, Vec<NodeId>> {
    let mut groups: IndexMap<Slot, Vec<NodeId>> = IndexMap::new();
    for n in nodes {
        if let Some(slot) = tree.slot(n)
            && slot.is_list()
        {
            groups.entry(slot).or_default().push(n);
        }
    }
    groups
}

/// Dice similarity over the labels of the immediate leaf children.
fn leaf_child_similarity(x_tree: &Tree, x: NodeId, y_tree: &Tree, y: NodeId) -> f64 {
    let mut counts: HashMap<&str, u32> = HashMap::default();
    let mut total = 0u32;
    for c in x_tree.children(x).filter(|&c| x_tree.is_leaf(c)) {
        *counts.entry(x_tree.label(c)).or_insert(0) += 1;
        total += 1;
    }
    let mut common = 0u32;
    for c in y_tree.children(y).filter(|&c| y_tree.is_leaf(c)) {
        total += 1;
        if let Some(count) = counts.get_mut(y_tree.label(c))
            && *count > 0
        {
            *count -= 1;
            common += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    2.0 * f64::from(common) / f64::from(total)
}
