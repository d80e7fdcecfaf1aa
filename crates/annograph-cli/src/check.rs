//! Parse-and-report command.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use walkdir::WalkDir;

use annograph_core::GraphBatch;
use annograph_penman::parse_documents;

pub fn cmd_check(input: &Path) -> Result<()> {
    let files = checkable_files(input)?;
    let mut failures = 0usize;
    for file in &files {
        match check_file(file) {
            Ok(count) => {
                println!("{} {} ({count} graphs)", "ok".green(), file.display());
            }
            Err(e) => {
                failures += 1;
                println!("{} {}: {e:#}", "error".red(), file.display());
            }
        }
    }
    if failures > 0 {
        return Err(anyhow!("{failures} of {} file(s) failed", files.len()));
    }
    Ok(())
}

fn checkable_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("penman")
            )
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(anyhow!(
            "no *.json or *.penman files under {}",
            input.display()
        ));
    }
    Ok(files)
}

fn check_file(path: &Path) -> Result<usize> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let count = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => GraphBatch::from_json_str(&text)?.graphs.len(),
        _ => parse_documents(&text)?.len(),
    };
    Ok(count)
}
