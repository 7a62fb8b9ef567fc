//! Indentation-based tree literals for unit tests.
//!
//! One node per line, two spaces per level:
//!
//! ```text
//! method_declaration decl
//!   identifier=m :name
//!   block block :body
//!     method_invocation :stmt
//!       identifier=foo :name
//!       decimal_integer_literal=1 :arguments[]
//! ```
//!
//! `kind=value` labels the node `kind|#|value`. `:name` puts it in a
//! single slot, `:name[]` in a list slot, `:stmt` in the statement list.
//! `block` and `decl` set the role, `#N` the line (default: line index).

use crate::tree::{NodeData, Slot, Tree, TreeBuilder};
use indextree::NodeId;

fn leak(s: &str) -> &'static str {
    s.to_string().leak()
}

pub(crate) fn tree(text: &str) -> Tree {
    let mut b = TreeBuilder::new();
    let mut stack: Vec<(usize, NodeId)> = Vec::new();
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let base = lines
        .iter()
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    for (index, line) in lines.iter().enumerate() {
        let depth = (line.len() - line.trim_start().len() - base) / 2;
        let mut tokens = line.split_whitespace();
        let head = tokens.next().unwrap();
        let mut data = match head.split_once('=') {
            Some((kind, value)) => NodeData::with_value(leak(kind), value),
            None => NodeData::new(leak(head)),
        }
        .at_line(index as u32 + 1);

        for token in tokens {
            data = match token {
                "block" => data.block(),
                "decl" => data.declaration(),
                ":stmt" => data.in_slot(Slot::statements()),
                t if t.starts_with('#') => data.at_line(t[1..].parse().unwrap()),
                t if t.starts_with(':') && t.ends_with("[]") => {
                    data.in_slot(Slot::list(leak(&t[1..t.len() - 2])))
                }
                t if t.starts_with(':') => data.in_slot(Slot::single(leak(&t[1..]))),
                t => panic!("unknown token {t:?}"),
            };
        }

        while stack.last().is_some_and(|&(d, _)| d >= depth) {
            stack.pop();
        }
        let parent = stack.last().map(|&(_, id)| id).unwrap_or(b.root());
        let id = b.add_child(parent, data);
        stack.push((depth, id));
    }
    b.finish()
}

/// First node (pre-order) with this label.
pub(crate) fn find(tree: &Tree, label: &str) -> NodeId {
    tree.pre_order()
        .find(|&n| tree.label(n) == label)
        .unwrap_or_else(|| panic!("no node labeled {label:?}"))
}

/// The `nth` node (pre-order, 0-based) of this kind.
pub(crate) fn nth(tree: &Tree, kind: &str, nth: usize) -> NodeId {
    tree.pre_order()
        .filter(|&n| tree.kind(n) == kind)
        .nth(nth)
        .unwrap_or_else(|| panic!("no {kind} #{nth}"))
}
