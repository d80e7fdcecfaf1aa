//! JSON ↔ Penman conversion commands.
//!
//! Both directions operate on a single file or on every matching file
//! directly under a directory, writing the converted file next to its input
//! unless an output directory is given.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;

use annograph_core::GraphBatch;
use annograph_penman::{format_graph, parse_documents, FormatOptions};

pub fn cmd_to_penman(input: &Path, out_dir: Option<&Path>, amr: bool) -> Result<()> {
    let opts = FormatOptions {
        metadata: true,
        amr_compatible: amr,
    };
    for file in inputs_with_extension(input, "json")? {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("read {}", file.display()))?;
        let batch = GraphBatch::from_json_str(&text)
            .with_context(|| format!("parse {}", file.display()))?;
        let docs: Vec<String> = batch
            .graphs
            .iter()
            .filter(|g| !g.concepts().is_empty())
            .map(|g| format_graph(g, &opts))
            .collect();
        let out = output_path(&file, out_dir, "penman");
        std::fs::write(&out, format!("{}\n", docs.join("\n\n")))
            .with_context(|| format!("write {}", out.display()))?;
        println!("wrote {}", out.display());
    }
    Ok(())
}

pub fn cmd_to_json(input: &Path, out_dir: Option<&Path>) -> Result<()> {
    for file in inputs_with_extension(input, "penman")? {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("read {}", file.display()))?;
        let graphs =
            parse_documents(&text).with_context(|| format!("parse {}", file.display()))?;
        let batch = GraphBatch { graphs };
        let out = output_path(&file, out_dir, "json");
        std::fs::write(&out, format!("{}\n", batch.to_json_string()?))
            .with_context(|| format!("write {}", out.display()))?;
        println!("wrote {}", out.display());
    }
    Ok(())
}

/// A single file as-is, or every `*.{ext}` file directly under a directory.
pub fn inputs_with_extension(input: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(anyhow!("no *.{ext} files under {}", input.display()));
    }
    Ok(files)
}

fn output_path(input: &Path, out_dir: Option<&Path>, ext: &str) -> PathBuf {
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    dir.join(format!("{stem}.{ext}"))
}
