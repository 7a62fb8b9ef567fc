//! # lasdiff
//!
//! Location-aware AST differencing: match the nodes of two syntax trees,
//! then describe the change as a short, nested edit script.
//!
//! ## Algorithm Overview
//!
//! Matching runs in four phases, each only adding pairs:
//!
//! 1. **Exact**: identical subtrees by structural hash
//! 2. **Similarity**: label-vector Dice similarity over a window of
//!    candidates around each node's position
//! 3. **Follow-up**: parents of matched children, and neighbors of matched
//!    siblings
//! 4. **Leaves**: leaf children of matched pairs, by slot and label
//!
//! The edit script then holds Delete/Insert/Move/Update operations with
//! subsumed operations nested, plus Replace operations inferred from
//! Delete/Insert/Move combinations at the same location.
//!
//! ## Usage
//!
//! ```
//! use lasdiff::{DiffConfig, NodeData, Slot, TreeBuilder, diff_trees};
//!
//! fn call(value: &str) -> lasdiff::Tree {
//!     let mut b = TreeBuilder::new();
//!     let root = b.root();
//!     let call = b.add_child(root, NodeData::new("method_invocation").at_line(1));
//!     b.add_child(call, NodeData::with_value("identifier", "foo").in_slot(Slot::single("name")).at_line(1));
//!     b.add_child(
//!         call,
//!         NodeData::with_value("decimal_integer_literal", value)
//!             .in_slot(Slot::list("arguments"))
//!             .at_line(1),
//!     );
//!     b.finish()
//! }
//!
//! let before = call("1");
//! let after = call("2");
//! let script = diff_trees(&before, &after, &DiffConfig::default()).unwrap();
//! assert_eq!(
//!     script.display(&before, &after).to_string(),
//!     "update\tdecimal_integer_literal|#|1(1) to decimal_integer_literal|#|2\n"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

mod chawathe;
mod config;
mod error;
mod lcs;
mod parse;
mod replace;
mod split;

/// Replaying a script on a copy of the before tree
pub mod apply;
/// Candidate search around an anchor node
pub mod candidates;
/// Four-phase node matching
pub mod matching;
/// Edit operations and scripts
pub mod script;
/// Syntax tree representation
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use chawathe::generate_edit_script;
pub use config::DiffConfig;
pub use error::DiffError;
pub use matching::{MatchConflict, MatchStats, Matching, compute_matching};
pub use parse::SourceParser;
pub use script::{Action, EditOp, EditScript, OpDisplay, OpKind};
pub use tree::{Arity, NodeData, Role, Slot, Tree, TreeBuilder};

/// Compute the edit script turning `before` into `after`.
///
/// Validates `config`, matches the two trees, then generates the script.
pub fn diff_trees(before: &Tree, after: &Tree, config: &DiffConfig) -> Result<EditScript, DiffError> {
    let (script, _matching) = diff_trees_with_matching(before, after, config)?;
    Ok(script)
}

/// Like [`diff_trees`], but also returns the node matching.
///
/// The matching is what [`apply::replay`] needs to resolve after-tree
/// nodes that already existed in the before tree.
pub fn diff_trees_with_matching(
    before: &Tree,
    after: &Tree,
    config: &DiffConfig,
) -> Result<(EditScript, Matching), DiffError> {
    config.validate()?;
    let (matching, stats) = compute_matching(before, after, config)?;
    let script = generate_edit_script(before, after, &matching, stats, config);
    Ok((script, matching))
}
