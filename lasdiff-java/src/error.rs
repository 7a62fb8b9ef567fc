use facet::Facet;

/// Why a Java source could not be turned into a tree.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum ParseError {
    /// could not load the Java grammar: {message}
    Language { message: String },

    /// the parser gave up without producing a syntax tree
    Cancelled,

    /// syntax error at line {line}, column {column}
    Syntax { line: u32, column: u32 },
}
