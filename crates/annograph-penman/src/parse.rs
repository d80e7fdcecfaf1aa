//! Parsing the bracketed Penman notation back into annotation graphs.
//!
//! The reader is line-oriented: `#`-comment lines accumulate `::key value`
//! metadata for the next document, a blank line separates documents, and
//! content lines are tokenized against a bracket stack. Node names written
//! in the text are *local* names; every parsed node gets a freshly generated
//! ID and a symbol table maps one to the other, which is how reentrant
//! references (bare local names) resolve to already-defined nodes.
//!
//! Any structural fault aborts the whole read: a failed parse yields no
//! graphs at all, so callers never see partial documents.

use std::collections::HashMap;

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char as pchar, digit1},
    combinator::{all_consuming, map_res, recognize},
    multi::separated_list1,
    sequence::tuple,
    IResult,
};
use thiserror::Error;

use annograph_core::{Graph, Id};

#[derive(Debug, Error)]
pub enum PenmanParseError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },
}

impl PenmanParseError {
    fn at(line: usize, message: impl Into<String>) -> Self {
        Self::Line {
            line,
            message: message.into(),
        }
    }
}

/// Metadata keys recognized in comment headers.
const KEY_SENTENCE: &str = "snt";
const KEY_ID: &str = "id";
const KEY_ANNOTATOR: &str = "annotator";
const KEY_SAVE_DATE: &str = "save-date";
const KEY_ALIGNMENT: &str = "alignment";

/// Parses a multi-document Penman stream. Documents are blank-line
/// separated, each optionally preceded by `#`-comment metadata lines.
pub fn parse_documents(text: &str) -> Result<Vec<Graph>, PenmanParseError> {
    let mut graphs = Vec::new();
    let mut meta: Vec<MetaEntry> = Vec::new();
    let mut doc: Option<DocState> = None;
    let mut last_line = 0usize;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        last_line = line_no;
        let line = raw.trim();

        if line.is_empty() {
            match doc.take() {
                Some(state) => graphs.push(state.finish(line_no)?),
                // a blank line outside a document ends comment accumulation
                None => meta.clear(),
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if doc.as_ref().is_some_and(|s| !s.stack.is_empty()) {
                return Err(PenmanParseError::at(
                    line_no,
                    "comment line inside an unclosed graph",
                ));
            }
            // comments directly after a balanced document start the next
            // one, as if separated by a blank line
            if let Some(state) = doc.take() {
                graphs.push(state.finish(line_no)?);
            }
            collect_meta(line_no, rest, &mut meta);
            continue;
        }

        let state = doc.get_or_insert_with(|| DocState::open(std::mem::take(&mut meta)));
        state.feed_line(line_no, line)?;
    }

    if let Some(state) = doc.take() {
        graphs.push(state.finish(last_line)?);
    }
    tracing::debug!(graphs = graphs.len(), "penman stream parsed");
    Ok(graphs)
}

// ----------------------------------------------------------------------
// Metadata
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MetaEntry {
    line: usize,
    key: String,
    value: String,
}

/// Accumulates `::key value` pairs from one comment line. A line may carry
/// several pairs; tokens before the first `::` marker are ignored.
fn collect_meta(line_no: usize, rest: &str, meta: &mut Vec<MetaEntry>) {
    let mut key: Option<String> = None;
    let mut value: Vec<&str> = Vec::new();
    for token in rest.split_whitespace() {
        if let Some(k) = token.strip_prefix("::") {
            if let Some(key) = key.take() {
                meta.push(MetaEntry {
                    line: line_no,
                    key,
                    value: value.join(" "),
                });
            }
            value.clear();
            key = Some(k.to_string());
        } else if key.is_some() {
            value.push(token);
        }
    }
    if let Some(key) = key {
        meta.push(MetaEntry {
            line: line_no,
            key,
            value: value.join(" "),
        });
    }
}

fn meta_value<'a>(meta: &'a [MetaEntry], key: &str) -> Option<&'a str> {
    meta.iter()
        .find(|e| e.key == key)
        .map(|e| e.value.as_str())
}

// ----------------------------------------------------------------------
// Token-level parsers
// ----------------------------------------------------------------------

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A local node name as written in the text (`x0`, `c12`, ...).
fn parse_local_name(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(is_name_start),
        take_while(is_name_continue),
    )))(input)
}

/// One alignment entry: `local/3,4,5`.
fn parse_alignment_entry(input: &str) -> IResult<&str, (&str, Vec<usize>)> {
    let (input, name) = parse_local_name(input)?;
    let (input, _) = pchar('/')(input)?;
    let (input, ids) = separated_list1(pchar(','), map_res(digit1, str::parse::<usize>))(input)?;
    Ok((input, (name, ids)))
}

fn valid_local_name(token: &str) -> bool {
    all_consuming(parse_local_name)(token).is_ok()
}

/// Locals printed for attribute nodes carry the `a<n>` prefix; everything
/// else is an ordinary variable.
fn is_attribute_local(local: &str) -> bool {
    local.len() >= 2
        && local.starts_with('a')
        && local[1..].chars().all(|c| c.is_ascii_digit())
}

/// Splits trailing close-parens off a token: `boy))` → (`boy`, 2).
fn strip_closers(token: &str) -> (&str, usize) {
    let bare = token.trim_end_matches(')');
    (bare, token.len() - bare.len())
}

/// Re-attaches stray spaces around parentheses so that every token is
/// well-glued: `"( x0"` → `"(x0"`, `"girl )"` → `"girl)"`.
fn normalize_spacing(line: &str) -> String {
    let mut s = line.to_string();
    loop {
        let next = s.replace("( ", "(").replace(" )", ")");
        if next == s {
            return s;
        }
        s = next;
    }
}

// ----------------------------------------------------------------------
// Per-document state machine
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Any of: node opening, relation label, constant/reference.
    Token,
    /// The `/` between a node's local name and its concept name.
    Slash,
    /// The concept name (possibly carrying trailing `)`s).
    Name,
}

struct DocState {
    graph: Graph,
    /// Generated IDs of the currently open nodes, innermost last.
    stack: Vec<Id>,
    /// Local name (as written) → generated ID.
    names: HashMap<String, Id>,
    pending_label: Option<String>,
    /// Local name of a node opening awaiting its `/ name`.
    open_local: Option<String>,
    expect: Expect,
    meta: Vec<MetaEntry>,
}

impl DocState {
    fn open(meta: Vec<MetaEntry>) -> Self {
        let text = meta_value(&meta, KEY_SENTENCE).unwrap_or("");
        let sid = meta_value(&meta, KEY_ID).unwrap_or("");
        let annotator = meta_value(&meta, KEY_ANNOTATOR).unwrap_or("");
        let mut graph = Graph::new(text, sid, annotator);
        if let Some(date) = meta_value(&meta, KEY_SAVE_DATE) {
            graph.last_saved = date.to_string();
        }
        Self {
            graph,
            stack: Vec::new(),
            names: HashMap::new(),
            pending_label: None,
            open_local: None,
            expect: Expect::Token,
            meta,
        }
    }

    fn feed_line(&mut self, line_no: usize, line: &str) -> Result<(), PenmanParseError> {
        let normalized = normalize_spacing(line);
        for token in normalized.split_whitespace() {
            self.feed_token(line_no, token)?;
        }
        Ok(())
    }

    fn feed_token(&mut self, line_no: usize, token: &str) -> Result<(), PenmanParseError> {
        match self.expect {
            Expect::Slash => {
                if token != "/" {
                    return Err(PenmanParseError::at(
                        line_no,
                        format!("expected `/` after node opening, found `{token}`"),
                    ));
                }
                self.expect = Expect::Name;
                Ok(())
            }
            Expect::Name => self.close_node_opening(line_no, token),
            Expect::Token => {
                if let Some(local) = token.strip_prefix('(') {
                    self.begin_node_opening(line_no, local)
                } else if let Some(label) = token.strip_prefix(':') {
                    self.set_pending_label(line_no, label)
                } else {
                    self.constant_or_reference(line_no, token)
                }
            }
        }
    }

    fn begin_node_opening(&mut self, line_no: usize, local: &str) -> Result<(), PenmanParseError> {
        if !valid_local_name(local) {
            return Err(PenmanParseError::at(
                line_no,
                format!("invalid node name `{local}`"),
            ));
        }
        if self.names.contains_key(local) {
            return Err(PenmanParseError::at(
                line_no,
                format!("duplicate node name `{local}`"),
            ));
        }
        if !self.stack.is_empty() && self.pending_label.is_none() {
            return Err(PenmanParseError::at(
                line_no,
                format!("node `{local}` has no incoming relation label"),
            ));
        }
        self.open_local = Some(local.to_string());
        self.expect = Expect::Slash;
        Ok(())
    }

    fn close_node_opening(&mut self, line_no: usize, token: &str) -> Result<(), PenmanParseError> {
        let (name, closers) = strip_closers(token);
        if name.is_empty() {
            return Err(PenmanParseError::at(line_no, "concept name missing"));
        }
        let Some(local) = self.open_local.take() else {
            return Err(PenmanParseError::at(line_no, "stray concept name"));
        };
        let attribute = is_attribute_local(&local);
        let Some(cid) = self.graph.add_concept(name, &[], attribute) else {
            return Err(PenmanParseError::at(
                line_no,
                format!("could not create concept `{name}`"),
            ));
        };
        if let Some(parent) = self.stack.last().cloned() {
            let Some(label) = self.pending_label.take() else {
                return Err(PenmanParseError::at(
                    line_no,
                    format!("node `{local}` has no incoming relation label"),
                ));
            };
            self.graph.add_relation(&parent, &cid, &label, false);
        }
        self.names.insert(local, cid.clone());
        self.stack.push(cid);
        self.expect = Expect::Token;
        self.pop_closers(line_no, closers)
    }

    fn set_pending_label(&mut self, line_no: usize, label: &str) -> Result<(), PenmanParseError> {
        if label.is_empty() {
            return Err(PenmanParseError::at(line_no, "empty relation label"));
        }
        if label.contains('(') || label.contains(')') {
            return Err(PenmanParseError::at(
                line_no,
                format!("malformed relation label `:{label}`"),
            ));
        }
        if self.stack.is_empty() {
            return Err(PenmanParseError::at(
                line_no,
                format!("relation label `:{label}` outside any node"),
            ));
        }
        if let Some(old) = &self.pending_label {
            return Err(PenmanParseError::at(
                line_no,
                format!("relation label `:{old}` has no target"),
            ));
        }
        self.pending_label = Some(label.to_string());
        Ok(())
    }

    fn constant_or_reference(&mut self, line_no: usize, token: &str) -> Result<(), PenmanParseError> {
        let (bare, closers) = strip_closers(token);
        if bare.is_empty() {
            // a run of closers with nothing attached still closes nodes
            return self.pop_closers(line_no, closers);
        }
        let Some(parent) = self.stack.last().cloned() else {
            return Err(PenmanParseError::at(
                line_no,
                format!("constant `{bare}` outside any node"),
            ));
        };
        let Some(label) = self.pending_label.take() else {
            return Err(PenmanParseError::at(
                line_no,
                format!("missing relation label before `{bare}`"),
            ));
        };
        if let Some(target) = self.names.get(bare) {
            // reentrant reference to an already-defined node
            self.graph.add_relation(&parent, target, &label, true);
        } else {
            let Some(aid) = self.graph.add_concept(bare, &[], true) else {
                return Err(PenmanParseError::at(
                    line_no,
                    format!("could not create attribute `{bare}`"),
                ));
            };
            self.graph.add_relation(&parent, &aid, &label, false);
        }
        self.pop_closers(line_no, closers)
    }

    fn pop_closers(&mut self, line_no: usize, closers: usize) -> Result<(), PenmanParseError> {
        for _ in 0..closers {
            if self.stack.pop().is_none() {
                return Err(PenmanParseError::at(line_no, "unbalanced `)`"));
            }
        }
        Ok(())
    }

    /// Validates completion, folds forward references, and applies
    /// alignment metadata.
    fn finish(mut self, line_no: usize) -> Result<Graph, PenmanParseError> {
        if !self.stack.is_empty() || self.expect != Expect::Token || self.open_local.is_some() {
            return Err(PenmanParseError::at(line_no, "unclosed graph"));
        }
        if let Some(label) = &self.pending_label {
            return Err(PenmanParseError::at(
                line_no,
                format!("relation label `:{label}` has no target"),
            ));
        }
        self.fold_forward_references();
        self.apply_alignment()?;
        Ok(self.graph)
    }

    /// An attribute whose literal value names a local node was a forward
    /// reference: repoint its incoming edges at the real node (as referent)
    /// and drop the synthetic attribute.
    fn fold_forward_references(&mut self) {
        let folds: Vec<(Id, Id)> = self
            .graph
            .concepts()
            .iter()
            .filter(|(_, c)| c.attribute)
            .filter_map(|(id, c)| {
                self.names
                    .get(&c.name)
                    .filter(|target| *target != id)
                    .map(|target| (id.clone(), target.clone()))
            })
            .collect();

        for (attr_id, target_id) in folds {
            let incoming: Vec<Id> = self
                .graph
                .parent_relations(&attr_id, false)
                .into_iter()
                .map(|(rid, _)| rid.clone())
                .collect();
            for rid in incoming {
                self.graph.retarget_relation(&rid, &target_id, true);
            }
            tracing::debug!(%attr_id, %target_id, "folded forward reference");
            self.graph.remove_concept(&attr_id, false);
        }
    }

    fn apply_alignment(&mut self) -> Result<(), PenmanParseError> {
        let entries: Vec<MetaEntry> = self
            .meta
            .iter()
            .filter(|e| e.key == KEY_ALIGNMENT)
            .cloned()
            .collect();
        for entry in entries {
            for item in entry.value.split_whitespace() {
                let (local, token_ids) = match all_consuming(parse_alignment_entry)(item) {
                    Ok((_, parsed)) => parsed,
                    Err(_) => {
                        return Err(PenmanParseError::at(
                            entry.line,
                            format!("malformed alignment entry `{item}`"),
                        ));
                    }
                };
                let Some(cid) = self.names.get(local) else {
                    return Err(PenmanParseError::at(
                        entry.line,
                        format!("alignment names unknown node `{local}`"),
                    ));
                };
                if self.graph.set_concept_tokens(cid, &token_ids).is_none() {
                    return Err(PenmanParseError::at(
                        entry.line,
                        format!("alignment for `{local}` is out of range or overlaps"),
                    ));
                }
            }
        }
        Ok(())
    }
}
