use crate::tree::Tree;

/// A front-end that turns source text into a [`Tree`].
///
/// Implementations decide labels, slots and roles; the differ only relies
/// on the tree invariants (pre-order ids, 1-based lines).
pub trait SourceParser {
    /// Why a source could not be turned into a tree.
    type Error: core::error::Error + 'static;

    /// Parse one complete source file.
    fn parse(&mut self, source: &str) -> Result<Tree, Self::Error>;
}
