//! Penman-style textual notation for annotation graphs.
//!
//! This crate is the bidirectional textual-format engine over
//! [`annograph_core::Graph`]:
//!
//! - [`format`] renders a graph to the bracketed notation with deterministic
//!   ordering, reentrancy folding, and an optional metadata/alignment header
//! - [`parse`] reads one or more bracketed documents back into graphs,
//!   resolving reentrant references and alignment annotations
//!
//! Formatting then parsing reproduces the graph's relation triples up to a
//! consistent renaming of the generated IDs; a graph serialized with its
//! metadata header also gets its token anchoring back.

pub mod format;
pub mod parse;

pub use format::{first_token_ids, format_graph, format_trees, FormatOptions};
pub use parse::{parse_documents, PenmanParseError};
