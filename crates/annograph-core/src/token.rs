//! Character-offset to token-index translation.
//!
//! A [`TokenIndex`] maps character offsets over the single-space-joined token
//! text back to token indices, snapping partial-word selections outward to
//! whole-token boundaries. It is the bridge between a text widget's
//! selection (character offsets) and the graph store's token IDs.
//!
//! All offsets are *character* offsets, not byte offsets, so selections over
//! non-ASCII text behave the way the hosting editor counts them.

use std::collections::{BTreeSet, HashMap};

/// Precomputed offset tables for one token sequence.
#[derive(Debug, Clone)]
pub struct TokenIndex {
    chars: Vec<char>,
    begin_to_id: HashMap<usize, usize>,
    end_to_id: HashMap<usize, usize>,
    /// Per-token `(begin, end)` character offsets, in token order.
    offsets: Vec<(usize, usize)>,
}

impl TokenIndex {
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut chars = Vec::new();
        let mut begin_to_id = HashMap::new();
        let mut end_to_id = HashMap::new();
        let mut offsets = Vec::with_capacity(tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                chars.push(' ');
            }
            let begin = chars.len();
            chars.extend(token.as_ref().chars());
            let end = chars.len();
            begin_to_id.insert(begin, i);
            end_to_id.insert(end, i);
            offsets.push((begin, end));
        }

        Self {
            chars,
            begin_to_id,
            end_to_id,
            offsets,
        }
    }

    /// Length of the joined text in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Snaps a selection start outward to the nearest token begin at or
    /// before it. An offset already on a token begin is unchanged; an offset
    /// on a separating space advances past it.
    pub fn adjust_begin(&self, offset: usize) -> usize {
        let offset = offset.min(self.chars.len());
        if offset == 0 || self.chars.get(offset - 1) == Some(&' ') {
            return offset;
        }
        if self.chars.get(offset) == Some(&' ') {
            return offset + 1;
        }
        (0..offset)
            .rev()
            .find(|&i| self.chars[i] == ' ')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Snaps a selection end outward to the nearest token end at or after
    /// it; the mirror of [`TokenIndex::adjust_begin`].
    pub fn adjust_end(&self, offset: usize) -> usize {
        let offset = offset.min(self.chars.len());
        if offset == self.chars.len() || self.chars.get(offset) == Some(&' ') {
            return offset;
        }
        if offset > 0 && self.chars.get(offset - 1) == Some(&' ') {
            return offset - 1;
        }
        (offset + 1..self.chars.len())
            .find(|&i| self.chars[i] == ' ')
            .unwrap_or(self.chars.len())
    }

    /// Token indices covered by the character span `[begin, end)`, snapped
    /// outward to whole tokens. Any invalid or zero-width selection yields
    /// the empty set; this never fails.
    pub fn token_ids(&self, begin: usize, end: usize) -> BTreeSet<usize> {
        let mut ids = BTreeSet::new();
        if begin >= self.chars.len() || end == 0 || end > self.chars.len() {
            return ids;
        }
        let b = self.adjust_begin(begin);
        let e = self.adjust_end(end);
        if b < e {
            if let (Some(&first), Some(&last)) = (self.begin_to_id.get(&b), self.end_to_id.get(&e)) {
                ids.extend(first..=last);
            }
        }
        ids
    }

    /// `(begin, end)` character offsets of a token; `None` when out of range.
    pub fn offset(&self, token_id: usize) -> Option<(usize, usize)> {
        self.offsets.get(token_id).copied()
    }
}
