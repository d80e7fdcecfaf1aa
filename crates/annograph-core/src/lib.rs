//! Annograph core: the annotation-graph data model.
//!
//! This crate owns everything the textual-format engine and the editor build
//! on:
//!
//! - [`graph::Graph`] — the per-sentence annotation graph store (concepts,
//!   relations, token coverage, stable ID generation)
//! - [`token::TokenIndex`] — character-offset to token-index translation
//!   with outward snapping
//! - [`session::Session`] — the editing context: a list of graphs plus a
//!   cursor, with plain-text and JSON ingestion
//! - [`resources::Lexicon`] — injected description dictionaries
//!
//! The store is single-owner and synchronous: every operation completes
//! before returning, rejected mutations are `Option` returns, and graphs are
//! independent values that clone into fully detached copies.

pub mod error;
pub mod graph;
pub mod resources;
pub mod session;
pub mod token;

pub use error::CoreError;
pub use graph::{numeric_suffix, Concept, Graph, Id, Relation};
pub use resources::Lexicon;
pub use session::{GraphBatch, Session};
pub use token::TokenIndex;
