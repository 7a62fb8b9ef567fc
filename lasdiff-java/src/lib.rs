//! Java front-end for [`lasdiff`]: parses with tree-sitter-java and lowers
//! the concrete syntax tree into a [`lasdiff::Tree`].
//!
//! Lowering keeps named nodes only and drops comments. Identifiers, types
//! and literals are labeled with their text (`identifier|#|foo`), operator
//! expressions with their operator (`binary_expression|#|+`).
//! `expression_statement`, `argument_list` and `formal_parameters` are
//! flattened so that calls and declarations hold their arguments and
//! parameters directly.
//!
//! ```
//! use lasdiff::{DiffConfig, SourceParser, diff_trees};
//! use lasdiff_java::{JavaOptions, JavaParser};
//!
//! let mut parser = JavaParser::new(JavaOptions::default()).unwrap();
//! let before = parser.parse("class A { void m() { foo(1); } }").unwrap();
//! let after = parser.parse("class A { void m() { foo(2); } }").unwrap();
//! let script = diff_trees(&before, &after, &DiffConfig::default()).unwrap();
//! assert_eq!(
//!     script.display(&before, &after).to_string(),
//!     "update\tdecimal_integer_literal|#|1(1) to decimal_integer_literal|#|2\n"
//! );
//! ```

#![warn(missing_docs)]

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

mod error;
mod kinds;

pub use error::ParseError;

use lasdiff::indextree::NodeId;
use lasdiff::{NodeData, Slot, SourceParser, Tree, TreeBuilder};
use tree_sitter::{Node, Parser};

/// Lowering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JavaOptions {
    /// Keep `expression_statement` wrappers instead of lifting the
    /// expression into the statement's place.
    pub keep_expression_statements: bool,

    /// Descend into type nodes instead of keeping them as labeled leaves.
    pub expand_types: bool,
}

/// Java source → [`Tree`].
pub struct JavaParser {
    parser: Parser,
    options: JavaOptions,
    strict: bool,
}

impl JavaParser {
    /// A strict parser: sources with syntax errors are rejected.
    pub fn new(options: JavaOptions) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::Language { message: e.to_string() })?;
        Ok(Self {
            parser,
            options,
            strict: true,
        })
    }

    /// Accept sources with syntax errors; error nodes become ordinary
    /// `ERROR` nodes in the tree.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// The lowering switches in use.
    pub fn options(&self) -> JavaOptions {
        self.options
    }
}

impl SourceParser for JavaParser {
    type Error = ParseError;

    fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        let syntax = self.parser.parse(source, None).ok_or(ParseError::Cancelled)?;
        let root = syntax.root_node();
        if self.strict
            && root.has_error()
            && let Some(bad) = first_error(root)
        {
            let at = bad.start_position();
            return Err(ParseError::Syntax {
                line: at.row as u32 + 1,
                column: at.column as u32 + 1,
            });
        }

        let tree = Lowering {
            source,
            options: self.options,
        }
        .lower(root);
        debug!(nodes = tree.len(), height = tree.height(), "java source lowered");
        Ok(tree)
    }
}

/// Work item of the lowering walk.
enum Pending<'s> {
    Syntax {
        node: Node<'s>,
        parent: NodeId,
        slot: Option<Slot>,
    },
    /// An anonymous keyword token under `modifiers`.
    Keyword { node: Node<'s>, parent: NodeId },
}

struct Lowering<'s> {
    source: &'s str,
    options: JavaOptions,
}

impl<'s> Lowering<'s> {
    fn lower(&self, root: Node<'s>) -> Tree {
        let mut builder = TreeBuilder::new();
        // popped in pre-order, so node ids follow source order
        let mut stack = vec![Pending::Syntax {
            node: root,
            parent: builder.root(),
            slot: None,
        }];

        while let Some(item) = stack.pop() {
            let (node, parent, slot) = match item {
                Pending::Keyword { node, parent } => {
                    let data = NodeData::with_value(kinds::MODIFIER, node.kind())
                        .in_slot(Slot::list(kinds::MODIFIERS))
                        .at_line(line_of(node));
                    builder.add_child(parent, data);
                    continue;
                }
                Pending::Syntax { node, parent, slot } => (node, parent, slot),
            };
            let kind = node.kind();

            if kind == kinds::EXPRESSION_STATEMENT && !self.options.keep_expression_statements {
                trace!(kind, line = line_of(node), "flattened");
                self.push_children(&mut stack, node, parent, |_| slot);
                continue;
            }
            if kinds::is_list_wrapper(kind) {
                trace!(kind, line = line_of(node), "flattened");
                let lifted = Slot::list(slot.map(|s| s.property).unwrap_or(kind));
                self.push_children(&mut stack, node, parent, |_| Some(lifted));
                continue;
            }

            let mut data = match self.value_of(node) {
                Some(value) => NodeData::with_value(kind, &value),
                None => NodeData::new(kind),
            }
            .with_role(kinds::role(kind))
            .at_line(line_of(node));
            if let Some(slot) = slot {
                data = data.in_slot(slot);
            }
            let id = builder.add_child(parent, data);

            if kinds::is_atomic(kind, self.options.expand_types) {
                continue;
            }
            if kind == kinds::MODIFIERS {
                let mut cursor = node.walk();
                let children: Vec<Node<'s>> = node.children(&mut cursor).collect();
                for child in children.into_iter().rev() {
                    if child.is_extra() {
                        continue;
                    }
                    stack.push(if child.is_named() {
                        Pending::Syntax {
                            node: child,
                            parent: id,
                            slot: Some(Slot::list(kinds::MODIFIERS)),
                        }
                    } else {
                        Pending::Keyword { node: child, parent: id }
                    });
                }
                continue;
            }
            self.push_children(&mut stack, node, id, |field| Some(kinds::slot_for(kind, field)));
        }

        builder.finish()
    }

    /// Queue the named, non-comment children of `node` under `parent`.
    fn push_children(
        &self,
        stack: &mut Vec<Pending<'s>>,
        node: Node<'s>,
        parent: NodeId,
        slot: impl Fn(Option<&'static str>) -> Option<Slot>,
    ) {
        let mut cursor = node.walk();
        let children: Vec<(Node<'s>, Option<&'static str>)> = node
            .children(&mut cursor)
            .enumerate()
            .map(|(i, child)| (child, node.field_name_for_child(i as u32)))
            .collect();
        for (child, field) in children.into_iter().rev() {
            if !child.is_named() || child.is_extra() {
                continue;
            }
            stack.push(Pending::Syntax {
                node: child,
                parent,
                slot: slot(field),
            });
        }
    }

    /// The label suffix: source text or operator token.
    fn value_of(&self, node: Node<'s>) -> Option<String> {
        let kind = node.kind();
        if kinds::carries_text(kind) {
            let text = self.source.get(node.byte_range()).unwrap_or_default();
            return Some(single_line(text));
        }
        if kinds::carries_operator(kind) {
            if let Some(op) = node.child_by_field_name("operator") {
                return Some(op.kind().to_string());
            }
            // update_expression has no operator field
            let mut cursor = node.walk();
            return node
                .children(&mut cursor)
                .find(|c| !c.is_named())
                .map(|c| c.kind().to_string());
        }
        None
    }
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// Text blocks and multi-line strings would break the one-op-per-line
/// output.
fn single_line(text: &str) -> String {
    if text.contains('\n') {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.to_string()
    }
}

/// First error or missing node in pre-order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
