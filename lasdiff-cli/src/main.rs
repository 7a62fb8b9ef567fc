//! `lasdiff`: print the edit script turning one Java source into another.
//!
//! One operation per line on stdout, in generation order. Logs, tree dumps
//! and matching counters go to stderr.

mod logging;

use std::error::Error;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use lasdiff::{DiffConfig, EditScript, SourceParser, Tree, diff_trees};
use lasdiff_java::{JavaOptions, JavaParser};

/// Location-aware AST differencing for Java sources
#[derive(Parser, Debug)]
#[command(name = "lasdiff", version, about, long_about = None)]
struct Cli {
    /// Source before the change
    before: PathBuf,

    /// Source after the change
    after: PathBuf,

    /// Fraction of a sibling list scanned around an anchor (0.0 to 1.0)
    #[arg(long, default_value_t = 0.5)]
    distance_threshold: f64,

    /// Levels of ancestor and descendant expansion
    #[arg(long, default_value_t = 3)]
    depth_threshold: u32,

    /// Minimum similarity accepted as a candidate match (0.0 to 1.0)
    #[arg(long, default_value_t = 0.65)]
    similarity_threshold: f64,

    /// Skip the exact (hash) matching phase
    #[arg(long)]
    no_exact_match: bool,

    /// Do not infer replace operations
    #[arg(long)]
    no_replace: bool,

    /// Report every move as a delete plus an insert
    #[arg(long)]
    split_moves: bool,

    /// Leave block-level replaces on the blocks
    #[arg(long)]
    no_block_promotion: bool,

    /// Also print subsumed operations, indented one tab per level
    #[arg(long)]
    nested: bool,

    /// Print matching counters to stderr
    #[arg(long)]
    stats: bool,

    /// Print both trees to stderr before diffing
    #[arg(long)]
    dump_trees: bool,

    /// Keep expression statements as nodes of their own
    #[arg(long)]
    keep_expression_statements: bool,

    /// Descend into type nodes
    #[arg(long)]
    expand_types: bool,

    /// Accept sources with syntax errors
    #[arg(long)]
    lenient: bool,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn diff_config(&self) -> DiffConfig {
        DiffConfig {
            distance_threshold: self.distance_threshold,
            depth_threshold: self.depth_threshold,
            similarity_threshold: self.similarity_threshold,
            enable_exact_match: !self.no_exact_match,
            enable_replace: !self.no_replace,
            enable_move_split: self.split_moves,
            enable_block_promotion: !self.no_block_promotion,
        }
    }

    fn java_options(&self) -> JavaOptions {
        JavaOptions {
            keep_expression_statements: self.keep_expression_statements,
            expand_types: self.expand_types,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Everything but the final print, so nothing reaches stdout on failure.
fn run(cli: &Cli) -> Result<String, Box<dyn Error>> {
    let config = cli.diff_config().validated()?;

    let mut parser = JavaParser::new(cli.java_options())?;
    if cli.lenient {
        parser = parser.lenient();
    }
    let before = parse_file(&mut parser, &cli.before)?;
    let after = parse_file(&mut parser, &cli.after)?;
    tracing::debug!(before = before.len(), after = after.len(), "parsed both sources");

    if cli.dump_trees {
        eprint!("--- {}\n{}", cli.before.display(), before.dump());
        eprint!("+++ {}\n{}", cli.after.display(), after.dump());
    }

    let script = diff_trees(&before, &after, &config)?;
    tracing::info!(ops = script.len(), matched = script.stats().total(), "diff done");

    if cli.stats {
        eprint!("{}", render_stats(&script));
    }
    Ok(render(&script, &before, &after, cli.nested))
}

fn parse_file(parser: &mut JavaParser, path: &Path) -> Result<Tree, Box<dyn Error>> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let tree = parser
        .parse(&source)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(tree)
}

fn render(script: &EditScript, before: &Tree, after: &Tree, nested: bool) -> String {
    if nested {
        script.display_nested(before, after).to_string()
    } else {
        script.display(before, after).to_string()
    }
}

fn render_stats(script: &EditScript) -> String {
    let stats = script.stats();
    let mut out = String::new();
    for (name, value) in [
        ("exact", stats.exact),
        ("exact roots", stats.exact_roots),
        ("similar", stats.similar),
        ("follow-up", stats.follow_up),
        ("leaf", stats.leaf),
        ("total", stats.total()),
    ] {
        let _ = writeln!(out, "{name:>12}: {value}");
    }
    let _ = writeln!(out, "{:>12}: {}", "operations", script.all_ops().count());
    out
}
