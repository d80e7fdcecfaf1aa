//! Rendering a graph to the bracketed Penman notation.
//!
//! Output is deterministic: roots and children are ordered by the first
//! anchored token reachable through non-referential edges (ties broken by
//! label, then numeric ID suffix), so the printed tree follows the sentence
//! left to right regardless of insertion order.

use std::collections::{BTreeMap, BTreeSet};

use annograph_core::{numeric_suffix, Concept, Graph, Id};

/// Sentinel for "no anchored token reachable".
const NO_TOKEN: usize = usize::MAX;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Emit the `#`-comment metadata header (sentence ID, save date,
    /// annotator, token text, alignment line).
    pub metadata: bool,
    /// Print an attribute concept that is never referenced elsewhere as its
    /// bare literal value instead of `(a0 / value)`.
    pub amr_compatible: bool,
}

/// First anchored token index per concept, propagated upward.
///
/// An anchored concept keeps its own minimum token index. An unanchored one
/// inherits the minimum over its non-referential children, computed by
/// fixed-point iteration bounded by the concept count; a node permanently
/// disconnected from any anchored token keeps the sentinel.
pub fn first_token_ids(graph: &Graph) -> BTreeMap<Id, usize> {
    let mut first: BTreeMap<Id, usize> = BTreeMap::new();
    let mut anchored: BTreeSet<&str> = BTreeSet::new();
    for (id, c) in graph.concepts() {
        match c.first_token_id() {
            Some(t) => {
                first.insert(id.clone(), t);
                anchored.insert(id);
            }
            None => {
                first.insert(id.clone(), NO_TOKEN);
            }
        }
    }

    let bound = graph.concepts().len() + 1;
    for pass in 0.. {
        let mut changed = false;
        for r in graph.relations().values() {
            if r.referent || anchored.contains(r.parent_id.as_str()) {
                continue;
            }
            let child = first.get(&r.child_id).copied().unwrap_or(NO_TOKEN);
            if let Some(parent) = first.get_mut(&r.parent_id) {
                if child < *parent {
                    *parent = child;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
        if pass >= bound {
            // no further progress is possible on well-formed input; leave
            // the remaining sentinels in place
            tracing::trace!(pass, "first-token propagation stopped at the pass bound");
            break;
        }
    }
    first
}

/// Renders one tree per root, ordered for reading: leftmost-referring root
/// first. Reentrant edges into earlier trees print as bare IDs.
pub fn format_trees(graph: &Graph, opts: &FormatOptions) -> Vec<String> {
    let first = first_token_ids(graph);
    render_trees(graph, &first, opts)
}

/// Renders a complete document: optional metadata header followed by every
/// root tree, newline-separated. A graph with no concepts renders only the
/// header (or an empty string).
pub fn format_graph(graph: &Graph, opts: &FormatOptions) -> String {
    let first = first_token_ids(graph);
    let mut out = String::new();
    if opts.metadata {
        out.push_str(&header(graph, opts));
    }
    out.push_str(&render_trees(graph, &first, opts).join("\n"));
    out
}

fn render_trees(graph: &Graph, first: &BTreeMap<Id, usize>, opts: &FormatOptions) -> Vec<String> {
    let mut roots: Vec<&str> = graph.root_ids();
    roots.sort_by_key(|id| {
        (
            first.get(*id).copied().unwrap_or(NO_TOKEN),
            numeric_suffix(id),
        )
    });

    let mut printed: BTreeSet<Id> = BTreeSet::new();
    roots
        .into_iter()
        .map(|root| {
            let mut out = String::new();
            write_node(graph, root, false, "", first, opts, &mut printed, &mut out);
            out
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn write_node(
    graph: &Graph,
    cid: &str,
    referent: bool,
    indent: &str,
    first: &BTreeMap<Id, usize>,
    opts: &FormatOptions,
    printed: &mut BTreeSet<Id>,
    out: &mut String,
) {
    // reentrant reference, or a cycle back into an already-printed node:
    // print the bare ID, never re-expand
    if referent || printed.contains(cid) {
        out.push_str(cid);
        return;
    }
    let Some(c) = graph.get_concept(cid) else {
        out.push_str(cid);
        return;
    };
    if opts.amr_compatible && c.attribute && !is_referenced(graph, cid) {
        out.push_str(&c.name);
        return;
    }

    printed.insert(cid.to_string());
    out.push('(');
    out.push_str(cid);
    out.push_str(" / ");
    out.push_str(&c.name);

    let child_indent = format!("{indent}{}", " ".repeat(cid.chars().count() + 2));
    let mut children = graph.child_relations(cid, false);
    children.sort_by(|(aid, a), (bid, b)| {
        let fa = first.get(&a.child_id).copied().unwrap_or(NO_TOKEN);
        let fb = first.get(&b.child_id).copied().unwrap_or(NO_TOKEN);
        fa.cmp(&fb)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| numeric_suffix(aid).cmp(&numeric_suffix(bid)))
    });
    for (_, r) in children {
        out.push('\n');
        out.push_str(&child_indent);
        out.push(':');
        out.push_str(&r.label);
        out.push(' ');
        let grand_indent = format!("{child_indent}{}", " ".repeat(r.label.chars().count() + 2));
        write_node(
            graph,
            &r.child_id,
            r.referent,
            &grand_indent,
            first,
            opts,
            printed,
            out,
        );
    }
    out.push(')');
}

fn is_referenced(graph: &Graph, cid: &str) -> bool {
    graph
        .relations()
        .values()
        .any(|r| r.referent && r.child_id == cid)
}

fn header(graph: &Graph, opts: &FormatOptions) -> String {
    let mut out = String::new();
    if !graph.sid.is_empty() {
        out.push_str("# ::id ");
        out.push_str(&graph.sid);
        out.push('\n');
    }
    if !graph.last_saved.is_empty() {
        out.push_str("# ::save-date ");
        out.push_str(&graph.last_saved);
        out.push('\n');
    }
    if !graph.annotator.is_empty() {
        out.push_str("# ::annotator ");
        out.push_str(&graph.annotator);
        out.push('\n');
    }
    if !graph.tokens().is_empty() {
        out.push_str("# ::snt ");
        out.push_str(&graph.text());
        out.push('\n');
    }

    // a bare-printed attribute's ID never appears in the text, so it cannot
    // carry an alignment entry
    let mut aligned: Vec<(&Id, &Concept)> = graph
        .concepts()
        .iter()
        .filter(|(_, c)| !c.token_ids.is_empty())
        .filter(|(id, c)| !(opts.amr_compatible && c.attribute && !is_referenced(graph, id)))
        .collect();
    aligned.sort_by_key(|(id, c)| (c.first_token_id().unwrap_or(NO_TOKEN), numeric_suffix(id)));
    if !aligned.is_empty() {
        let entries: Vec<String> = aligned
            .iter()
            .map(|(id, c)| {
                let ids: Vec<String> = c.token_ids.iter().map(ToString::to_string).collect();
                format!("{}/{}", id, ids.join(","))
            })
            .collect();
        out.push_str("# ::alignment ");
        out.push_str(&entries.join(" "));
        out.push('\n');
    }
    out
}
