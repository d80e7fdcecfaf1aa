//! Canonical re-rendering of Penman files.
//!
//! Parsing and re-printing normalizes node IDs to print order, child order
//! to sentence order, and indentation to the column-aligned layout, so
//! hand-edited files come back in the same shape the serializer emits.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use annograph_penman::{format_graph, parse_documents, FormatOptions};

pub fn cmd_fmt(input: &Path, out: Option<&Path>, write: bool) -> Result<()> {
    if write && out.is_some() {
        return Err(anyhow!("cannot use --write and --out together"));
    }
    let text =
        std::fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let graphs =
        parse_documents(&text).with_context(|| format!("parse {}", input.display()))?;

    let opts = FormatOptions {
        metadata: true,
        ..Default::default()
    };
    let docs: Vec<String> = graphs.iter().map(|g| format_graph(g, &opts)).collect();
    let rendered = format!("{}\n", docs.join("\n\n"));

    if write {
        std::fs::write(input, rendered)
            .with_context(|| format!("write {}", input.display()))?;
        println!("formatted {}", input.display());
        return Ok(());
    }
    if let Some(out) = out {
        std::fs::write(out, rendered).with_context(|| format!("write {}", out.display()))?;
        println!("wrote {}", out.display());
        return Ok(());
    }
    print!("{rendered}");
    Ok(())
}
