//! The annotation graph store.
//!
//! A [`Graph`] holds the semantic annotation of one tokenized sentence:
//! concepts anchored to token spans, labeled relations between them, and the
//! bookkeeping needed to keep annotations consistent (token coverage, stable
//! ID generation, cascading deletes).
//!
//! Mutations that violate an invariant (overlapping spans, out-of-range token
//! indices, unknown IDs) are *rejected*: the operation returns `None` and the
//! store is left untouched. Nothing in this module panics on bad input.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::token::TokenIndex;

/// Node/edge identifier (`c<n>` for concepts, `a<n>` for attributes,
/// `r<n>` for relations).
pub type Id = String;

/// A node in the annotation graph: an introduced variable (predicate or
/// entity) or a constant attribute value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Concept {
    /// Concept label (e.g. `want-01`, `boy`, or a literal like `-`).
    pub name: String,
    /// Sorted indices into the sentence's token sequence; empty when the
    /// concept has no textual anchor.
    pub token_ids: Vec<usize>,
    /// `true` for constant/attribute values, which bypass span coverage.
    pub attribute: bool,
}

impl Concept {
    /// Smallest anchored token index, if any.
    pub fn first_token_id(&self) -> Option<usize> {
        self.token_ids.first().copied()
    }
}

/// A labeled directed edge between two concepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    pub parent_id: Id,
    pub child_id: Id,
    /// Role label, free text (may carry an `-of` inverse suffix).
    pub label: String,
    /// `true` when the child is a reentrant reference to a node defined
    /// elsewhere in the traversal, not a fresh subtree.
    pub referent: bool,
}

/// The annotation graph for one sentence.
///
/// Field order matters for the interchange format: serialization is
/// deterministic (`BTreeMap` entries, fixed field order), so serializing,
/// deserializing, and re-serializing a graph yields byte-identical output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Graph {
    /// Sentence ID.
    pub sid: String,
    /// Annotator ID.
    pub annotator: String,
    /// Last-saved timestamp (RFC 3339 UTC); empty until the first save.
    pub last_saved: String,
    /// The sentence split on whitespace, immutable for the graph's lifetime.
    tokens: Vec<String>,
    concepts: BTreeMap<Id, Concept>,
    relations: BTreeMap<Id, Relation>,
    /// Union of `token_ids` over all non-attribute concepts.
    covered_token_ids: BTreeSet<usize>,
    /// Next numeric suffix for `c`/`a` IDs; never decremented or reused.
    concept_seq: usize,
    /// Next numeric suffix for `r` IDs.
    relation_seq: usize,
}

impl Graph {
    /// Creates an empty graph over `text`, tokenized on whitespace.
    pub fn new(text: &str, sid: &str, annotator: &str) -> Self {
        Self {
            sid: sid.to_string(),
            annotator: annotator.to_string(),
            last_saved: String::new(),
            tokens: text.split_whitespace().map(str::to_string).collect(),
            concepts: BTreeMap::new(),
            relations: BTreeMap::new(),
            covered_token_ids: BTreeSet::new(),
            concept_seq: 0,
            relation_seq: 0,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The sentence as single-space-joined token text.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn concepts(&self) -> &BTreeMap<Id, Concept> {
        &self.concepts
    }

    pub fn relations(&self) -> &BTreeMap<Id, Relation> {
        &self.relations
    }

    pub fn covered_token_ids(&self) -> &BTreeSet<usize> {
        &self.covered_token_ids
    }

    // ------------------------------------------------------------------
    // Concepts
    // ------------------------------------------------------------------

    /// Adds a concept anchored to `token_ids`.
    ///
    /// Returns the generated ID (`c<n>`, or `a<n>` when `attribute`), or
    /// `None` when any index is out of range or, for non-attribute concepts,
    /// already covered by another concept. A rejected insertion does not
    /// consume an ID.
    pub fn add_concept(&mut self, name: &str, token_ids: &[usize], attribute: bool) -> Option<Id> {
        let ids = self.checked_token_ids(token_ids, attribute, None)?;
        let id = format!("{}{}", if attribute { 'a' } else { 'c' }, self.concept_seq);
        self.concept_seq += 1;
        if !attribute {
            self.covered_token_ids.extend(ids.iter().copied());
        }
        tracing::debug!(%id, name, ?ids, attribute, "add concept");
        self.concepts.insert(
            id.clone(),
            Concept {
                name: name.to_string(),
                token_ids: ids,
                attribute,
            },
        );
        Some(id)
    }

    pub fn get_concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Renames a concept. Returns `None` for unknown IDs.
    pub fn update_concept(&mut self, id: &str, name: &str) -> Option<&Concept> {
        let c = self.concepts.get_mut(id)?;
        c.name = name.to_string();
        Some(c)
    }

    /// Re-anchors a concept to `token_ids`, with the same rejection rules as
    /// [`Graph::add_concept`]. The concept's previous coverage is retracted
    /// before the overlap check, so shrinking or shifting a span is allowed.
    pub fn set_concept_tokens(&mut self, id: &str, token_ids: &[usize]) -> Option<&Concept> {
        let (attribute, old) = {
            let c = self.concepts.get(id)?;
            (c.attribute, c.token_ids.clone())
        };
        let ids = self.checked_token_ids(token_ids, attribute, Some(&old))?;
        if !attribute {
            for t in &old {
                self.covered_token_ids.remove(t);
            }
            self.covered_token_ids.extend(ids.iter().copied());
        }
        let c = self.concepts.get_mut(id)?;
        c.token_ids = ids;
        Some(c)
    }

    /// Removes a concept, retracting its token coverage. With `cascade`,
    /// every relation touching it (as parent or child) is deleted too.
    pub fn remove_concept(&mut self, id: &str, cascade: bool) -> Option<Concept> {
        let c = self.concepts.remove(id)?;
        if cascade {
            self.relations
                .retain(|_, r| r.parent_id != id && r.child_id != id);
        }
        if !c.attribute {
            for t in &c.token_ids {
                self.covered_token_ids.remove(t);
            }
        }
        tracing::debug!(id, cascade, "remove concept");
        Some(c)
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Adds a relation and returns its generated ID.
    ///
    /// Endpoint existence is not verified here: callers are expected to have
    /// validated the IDs, and the Penman parser intentionally creates edges
    /// whose endpoints are repaired before the document is finalized.
    pub fn add_relation(&mut self, parent_id: &str, child_id: &str, label: &str, referent: bool) -> Id {
        let id = format!("r{}", self.relation_seq);
        self.relation_seq += 1;
        tracing::debug!(%id, parent_id, child_id, label, referent, "add relation");
        self.relations.insert(
            id.clone(),
            Relation {
                parent_id: parent_id.to_string(),
                child_id: child_id.to_string(),
                label: label.to_string(),
                referent,
            },
        );
        id
    }

    pub fn get_relation(&self, id: &str) -> Option<&Relation> {
        self.relations.get(id)
    }

    /// Relabels a relation. Returns `None` for unknown IDs.
    pub fn update_relation(&mut self, id: &str, label: &str) -> Option<&Relation> {
        let r = self.relations.get_mut(id)?;
        r.label = label.to_string();
        Some(r)
    }

    /// Repoints a relation's child, used when a parsed literal turns out to
    /// be a reference to a node defined later in the document.
    pub fn retarget_relation(&mut self, id: &str, child_id: &str, referent: bool) -> Option<&Relation> {
        let r = self.relations.get_mut(id)?;
        r.child_id = child_id.to_string();
        r.referent = referent;
        Some(r)
    }

    pub fn remove_relation(&mut self, id: &str) -> Option<Relation> {
        self.relations.remove(id)
    }

    // ------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------

    /// Relations whose parent is `parent_id`, in ID order. With
    /// `ignore_referent`, reentrancy back-edges are excluded.
    pub fn child_relations(&self, parent_id: &str, ignore_referent: bool) -> Vec<(&Id, &Relation)> {
        self.relations
            .iter()
            .filter(|(_, r)| r.parent_id == parent_id && !(ignore_referent && r.referent))
            .collect()
    }

    /// Relations whose child is `child_id`, in ID order.
    pub fn parent_relations(&self, child_id: &str, ignore_referent: bool) -> Vec<(&Id, &Relation)> {
        self.relations
            .iter()
            .filter(|(_, r)| r.child_id == child_id && !(ignore_referent && r.referent))
            .collect()
    }

    pub fn parent_ids(&self, child_id: &str, ignore_referent: bool) -> BTreeSet<&str> {
        self.parent_relations(child_id, ignore_referent)
            .into_iter()
            .map(|(_, r)| r.parent_id.as_str())
            .collect()
    }

    pub fn child_ids(&self, parent_id: &str, ignore_referent: bool) -> BTreeSet<&str> {
        self.child_relations(parent_id, ignore_referent)
            .into_iter()
            .map(|(_, r)| r.child_id.as_str())
            .collect()
    }

    /// Whether `ancestor_id` is reachable from `descendant_id` by walking
    /// parent edges upward. Cycle-safe: each node is visited at most once.
    pub fn is_ancestor(&self, ancestor_id: &str, descendant_id: &str, ignore_referent: bool) -> bool {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut frontier: Vec<&str> = vec![descendant_id];
        while let Some(id) = frontier.pop() {
            if !visited.insert(id) {
                continue;
            }
            for parent in self.parent_ids(id, ignore_referent) {
                if parent == ancestor_id {
                    return true;
                }
                frontier.push(parent);
            }
        }
        false
    }

    /// Concepts with no incoming non-referential relation, sorted by numeric
    /// ID suffix ascending. The serializer re-orders these by first anchored
    /// token for printing.
    pub fn root_ids(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = self
            .concepts
            .keys()
            .map(String::as_str)
            .filter(|id| self.parent_relations(id, true).is_empty())
            .collect();
        roots.sort_by_key(|id| numeric_suffix(id));
        roots
    }

    /// Token strings for `token_ids`, sorted by index regardless of the
    /// input iteration order. Out-of-range indices are skipped.
    pub fn get_tokens<I>(&self, token_ids: I) -> Vec<&str>
    where
        I: IntoIterator<Item = usize>,
    {
        let ids: BTreeSet<usize> = token_ids
            .into_iter()
            .filter(|&t| t < self.tokens.len())
            .collect();
        ids.into_iter().map(|t| self.tokens[t].as_str()).collect()
    }

    /// Token indices covered by the character span `[begin, end)` over
    /// [`Graph::text`], snapped outward to whole tokens.
    pub fn token_ids_in_span(&self, begin: usize, end: usize) -> BTreeSet<usize> {
        TokenIndex::new(&self.tokens).token_ids(begin, end)
    }

    // ------------------------------------------------------------------

    /// Normalizes and validates a span: sorted, deduplicated, in range, and
    /// (for non-attribute concepts) disjoint from existing coverage. `keep`
    /// is the concept's own current span, exempt from the overlap check.
    fn checked_token_ids(
        &self,
        token_ids: &[usize],
        attribute: bool,
        keep: Option<&[usize]>,
    ) -> Option<Vec<usize>> {
        let mut ids = token_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.iter().any(|&t| t >= self.tokens.len()) {
            return None;
        }
        if !attribute {
            let own = keep.unwrap_or(&[]);
            if ids
                .iter()
                .any(|t| self.covered_token_ids.contains(t) && !own.contains(t))
            {
                return None;
            }
        }
        Some(ids)
    }
}

/// Numeric suffix of an ID like `c12` or `r3`; IDs without one sort last.
pub fn numeric_suffix(id: &str) -> usize {
    id.get(1..)
        .and_then(|s| s.parse().ok())
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boy_graph() -> Graph {
        // token indices:  0   1    2    3   4
        let mut g = Graph::new("The boy want the girl", "t0.0", "tester");
        g.add_concept("want-01", &[2], false).expect("want");
        g.add_concept("girl", &[4], false).expect("girl");
        g.add_concept("boy", &[1], false).expect("boy");
        g
    }

    #[test]
    fn concept_ids_are_monotonic_and_never_reused() {
        let mut g = boy_graph();
        assert_eq!(g.remove_concept("c1", true).map(|c| c.name), Some("girl".into()));
        let re_added = g.add_concept("girl", &[4], false).expect("re-add");
        assert_eq!(re_added, "c3");
        assert!(g.get_concept("c1").is_none());
    }

    #[test]
    fn attribute_ids_share_the_concept_counter() {
        let mut g = boy_graph();
        let aid = g.add_concept("-", &[], true).expect("attribute");
        assert_eq!(aid, "a3");
        let cid = g.add_concept("believe-01", &[], false).expect("concept");
        assert_eq!(cid, "c4");
    }

    #[test]
    fn overlapping_span_is_rejected_without_mutation() {
        let mut g = boy_graph();
        let covered = g.covered_token_ids().clone();
        let seq_probe = g.add_concept("probe", &[1], false);
        assert_eq!(seq_probe, None);
        assert_eq!(g.covered_token_ids(), &covered);
        // the rejected insertion must not have consumed an ID
        assert_eq!(g.add_concept("ok", &[], false).as_deref(), Some("c3"));
    }

    #[test]
    fn out_of_range_token_is_rejected() {
        let mut g = boy_graph();
        assert_eq!(g.add_concept("bad", &[99], false), None);
        assert_eq!(g.add_concept("bad", &[99], true), None);
    }

    #[test]
    fn attributes_bypass_coverage() {
        let mut g = boy_graph();
        let aid = g.add_concept("2", &[1], true).expect("overlapping attribute");
        assert_eq!(g.get_concept(&aid).map(|c| c.attribute), Some(true));
        // attribute anchors do not enter the covered set
        assert!(!g.covered_token_ids().is_empty());
        assert_eq!(g.covered_token_ids().len(), 3);
    }

    #[test]
    fn cascade_delete_removes_touching_relations_and_coverage() {
        let mut g = boy_graph();
        g.add_relation("c0", "c2", "ARG0", false);
        g.add_relation("c0", "c1", "ARG1", false);
        g.add_relation("c1", "c2", "poss", true);

        g.remove_concept("c2", true).expect("remove boy");
        assert!(g.relations().values().all(|r| r.parent_id != "c2" && r.child_id != "c2"));
        assert_eq!(g.relations().len(), 1);
        assert!(!g.covered_token_ids().contains(&1));
    }

    #[test]
    fn remove_without_cascade_keeps_relations() {
        let mut g = boy_graph();
        g.add_relation("c0", "c2", "ARG0", false);
        g.remove_concept("c2", false);
        assert_eq!(g.relations().len(), 1);
    }

    #[test]
    fn root_ordering_scenario() {
        // concepts: c0 want (token 2), c1 girl (token 4), c2 boy (token 1),
        // c3 believe (token 7 of a longer sentence)
        let mut g = Graph::new("The boy want the girl not to believe him", "t0.0", "tester");
        let c0 = g.add_concept("want-01", &[2], false).expect("want");
        let c1 = g.add_concept("girl", &[4], false).expect("girl");
        let c2 = g.add_concept("boy", &[1], false).expect("boy");
        let c3 = g.add_concept("believe-01", &[7], false).expect("believe");
        g.add_relation(&c0, &c2, "ARG0", false);
        g.add_relation(&c0, &c3, "ARG1", false);
        g.add_relation(&c3, &c1, "ARG0", false);

        assert_eq!(g.root_ids(), vec!["c0"]);

        // a referent-only incoming edge does not stop a node being a root
        g.add_relation(&c3, &c0, "ARG2", true);
        assert_eq!(g.root_ids(), vec!["c0"]);
    }

    #[test]
    fn ancestor_walk_ignores_referent_edges_when_asked() {
        let mut g = boy_graph();
        g.add_relation("c0", "c1", "ARG1", false);
        g.add_relation("c1", "c0", "ARG0-of", true);

        assert!(g.is_ancestor("c0", "c1", true));
        assert!(!g.is_ancestor("c1", "c0", true));
        // following the back-edge makes the cycle visible but must terminate
        assert!(g.is_ancestor("c1", "c0", false));
    }

    #[test]
    fn get_tokens_sorts_by_index() {
        let g = boy_graph();
        assert_eq!(g.get_tokens(vec![4, 1, 2]), vec!["boy", "want", "girl"]);
        assert_eq!(g.get_tokens(vec![99]), Vec::<&str>::new());
    }

    #[test]
    fn set_concept_tokens_allows_shifting_own_span() {
        let mut g = Graph::new("a b c d", "t", "x");
        let id = g.add_concept("ab", &[0, 1], false).expect("add");
        assert!(g.set_concept_tokens(&id, &[1, 2]).is_some());
        assert_eq!(g.covered_token_ids().iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        let other = g.add_concept("d", &[3], false).expect("add d");
        assert!(g.set_concept_tokens(&id, &[3]).is_none(), "overlap with {other}");
        assert_eq!(g.get_concept(&id).map(|c| c.token_ids.clone()), Some(vec![1, 2]));
    }

    #[test]
    fn update_concept_and_relation() {
        let mut g = Graph::new("John came", "t", "x");
        let c0 = g.add_concept("John", &[0], false).expect("c0");
        let c1 = g.add_concept("came", &[1], false).expect("c1");
        let r0 = g.add_relation(&c1, &c0, "ARG0", false);

        assert_eq!(g.update_concept(&c1, "come-01").map(|c| c.name.clone()), Some("come-01".into()));
        assert_eq!(g.update_relation(&r0, "ARG1").map(|r| r.label.clone()), Some("ARG1".into()));
        assert!(g.update_concept("c9", "nope").is_none());
        assert!(g.update_relation("r9", "nope").is_none());
    }

    #[test]
    fn clone_is_independent() {
        let g = boy_graph();
        let mut h = g.clone();
        h.remove_concept("c0", true);
        assert!(g.get_concept("c0").is_some());
        assert!(h.get_concept("c0").is_none());
    }
}
