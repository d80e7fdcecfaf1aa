//! The editing session: an explicit context object owning the graphs under
//! annotation plus a cursor over them.
//!
//! The hosting editor holds exactly one `Session` and threads it through
//! every operation; there is no ambient/global state. Graphs are fully
//! independent values, so batch tooling may process many sessions in
//! parallel, but a single `Session` is single-owner and single-threaded.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;
use crate::graph::Graph;

/// The on-disk interchange shape: `{ "graphs": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphBatch {
    pub graphs: Vec<Graph>,
}

impl GraphBatch {
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Deterministic pretty rendering; re-serializing a deserialized batch
    /// is byte-identical.
    pub fn to_json_string(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One annotator's working state over a document of sentences.
#[derive(Debug, Clone)]
pub struct Session {
    graphs: Vec<Graph>,
    cursor: usize,
}

impl Session {
    pub fn new(graphs: Vec<Graph>) -> Self {
        Self { graphs, cursor: 0 }
    }

    /// Builds a session from plain text, one sentence per non-blank line.
    /// Each sentence gets a fresh, empty graph with `sid` = `<base_sid>.<n>`.
    pub fn from_plain_text(text: &str, base_sid: &str, annotator: &str) -> Self {
        let graphs = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| Graph::new(line, &format!("{base_sid}.{i}"), annotator))
            .collect();
        Self::new(graphs)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        let batch = GraphBatch::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), graphs = batch.graphs.len(), "session loaded");
        Ok(Self::new(batch.graphs))
    }

    /// Stamps every graph with the current UTC time and writes the batch.
    pub fn save(&mut self, path: &Path) -> Result<(), CoreError> {
        self.mark_saved(&chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
        let batch = GraphBatch {
            graphs: self.graphs.clone(),
        };
        std::fs::write(path, batch.to_json_string()?)?;
        tracing::debug!(path = %path.display(), graphs = self.graphs.len(), "session saved");
        Ok(())
    }

    /// Sets `last_saved` on every graph. Split out from [`Session::save`] so
    /// tests and converters can stamp deterministically.
    pub fn mark_saved(&mut self, timestamp: &str) {
        for g in &mut self.graphs {
            g.last_saved = timestamp.to_string();
        }
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Graph> {
        self.graphs.get(self.cursor)
    }

    pub fn current_mut(&mut self) -> Option<&mut Graph> {
        self.graphs.get_mut(self.cursor)
    }

    /// Moves to the given sentence; out-of-range indices leave the cursor
    /// where it was and return `None`.
    pub fn goto(&mut self, index: usize) -> Option<&Graph> {
        if index < self.graphs.len() {
            self.cursor = index;
        } else {
            return None;
        }
        self.current()
    }

    pub fn next(&mut self) -> Option<&Graph> {
        self.goto(self.cursor.checked_add(1)?)
    }

    pub fn previous(&mut self) -> Option<&Graph> {
        self.goto(self.cursor.checked_sub(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_gives_one_empty_graph_per_nonblank_line() {
        let session = Session::from_plain_text("The boy want the girl\n\nJohn came\n", "doc", "kim");
        assert_eq!(session.len(), 2);
        assert_eq!(session.graphs()[0].sid, "doc.0");
        assert_eq!(session.graphs()[1].sid, "doc.1");
        assert_eq!(session.graphs()[1].tokens(), ["John", "came"]);
        assert!(session.graphs()[0].concepts().is_empty());
    }

    #[test]
    fn navigation_clamps_to_valid_range() {
        let mut session = Session::from_plain_text("a\nb\nc\n", "doc", "kim");
        assert_eq!(session.cursor(), 0);
        assert!(session.previous().is_none());
        assert_eq!(session.cursor(), 0);

        assert!(session.next().is_some());
        assert!(session.next().is_some());
        assert!(session.next().is_none());
        assert_eq!(session.cursor(), 2);

        assert!(session.goto(99).is_none());
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.goto(0).map(|g| g.sid.clone()), Some("doc.0".into()));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let mut session = Session::from_plain_text("The boy want the girl\n", "doc", "kim");
        let g = session.current_mut().expect("current");
        let want = g.add_concept("want-01", &[2], false).expect("want");
        let boy = g.add_concept("boy", &[1], false).expect("boy");
        g.add_relation(&want, &boy, "ARG0", false);

        session.save(&path).expect("save");
        let loaded = Session::load(&path).expect("load");
        assert_eq!(loaded.graphs(), session.graphs());
        assert!(!loaded.graphs()[0].last_saved.is_empty());
    }

    #[test]
    fn batch_json_reserialization_is_byte_identical() {
        let mut g = Graph::new("John came", "t0", "kim");
        let c0 = g.add_concept("John", &[0], false).expect("c0");
        let c1 = g.add_concept("come-01", &[1], false).expect("c1");
        g.add_relation(&c1, &c0, "ARG0", false);

        let batch = GraphBatch { graphs: vec![g] };
        let first = batch.to_json_string().expect("serialize");
        let reparsed = GraphBatch::from_json_str(&first).expect("deserialize");
        let second = reparsed.to_json_string().expect("re-serialize");
        assert_eq!(first, second);
        assert_eq!(reparsed, batch);
    }
}
