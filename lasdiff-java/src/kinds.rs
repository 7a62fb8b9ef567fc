//! How tree-sitter-java node kinds map onto labels, roles and slots.

use lasdiff::{Role, Slot};

const BLOCKS: &[&str] = &["block", "constructor_body"];

const DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "field_declaration",
    "enum_constant",
    "static_initializer",
    "annotation_type_element_declaration",
];

const TYPES: &[&str] = &[
    "type_identifier",
    "scoped_type_identifier",
    "integral_type",
    "floating_point_type",
    "boolean_type",
    "void_type",
];

const LITERALS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "true",
    "false",
    "character_literal",
    "string_literal",
    "text_block",
    "null_literal",
];

/// Kinds labeled with their operator token.
const OPERATORS: &[&str] = &[
    "binary_expression",
    "assignment_expression",
    "unary_expression",
    "update_expression",
];

/// Kinds whose unnamed children form the generic statement list.
const STATEMENT_LISTS: &[&str] = &["block", "constructor_body", "switch_block_statement_group"];

/// Fields that may occur more than once under one parent.
const REPEATED_FIELDS: &[&str] = &["declarator", "init", "update", "dimensions"];

/// Wrappers whose children are lifted into the wrapper's parent.
const LIST_WRAPPERS: &[&str] = &["argument_list", "formal_parameters"];

pub(crate) const EXPRESSION_STATEMENT: &str = "expression_statement";
pub(crate) const MODIFIERS: &str = "modifiers";
pub(crate) const MODIFIER: &str = "modifier";

pub(crate) fn role(kind: &str) -> Role {
    if BLOCKS.contains(&kind) {
        Role::Block
    } else if DECLARATIONS.contains(&kind) {
        Role::Declaration
    } else {
        Role::Plain
    }
}

/// Kinds that become leaves even when the grammar gives them children.
pub(crate) fn is_atomic(kind: &str, expand_types: bool) -> bool {
    kind == "scoped_identifier" || LITERALS.contains(&kind) || (!expand_types && TYPES.contains(&kind))
}

/// Kinds whose source text is part of the label.
pub(crate) fn carries_text(kind: &str) -> bool {
    kind == "identifier" || kind == "scoped_identifier" || TYPES.contains(&kind) || LITERALS.contains(&kind)
}

pub(crate) fn carries_operator(kind: &str) -> bool {
    OPERATORS.contains(&kind)
}

pub(crate) fn is_list_wrapper(kind: &str) -> bool {
    LIST_WRAPPERS.contains(&kind)
}

/// Slot of a child of `parent_kind`, reached through `field` if any.
pub(crate) fn slot_for(parent_kind: &'static str, field: Option<&'static str>) -> Slot {
    match field {
        Some(field) if REPEATED_FIELDS.contains(&field) => Slot::list(field),
        Some(field) => Slot::single(field),
        None if STATEMENT_LISTS.contains(&parent_kind) => Slot::statements(),
        None => Slot::list(parent_kind),
    }
}
