//! List Command
//!
//! Enumerates the spec files a run would consider, with the suite each
//! file declares.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use walkdir::WalkDir;

use headspec_core::{selector, RunOptions, Target};

#[derive(Args)]
pub struct ListArgs {
    /// Directory containing the spec files
    #[arg(long)]
    pub spec_dir: Option<PathBuf>,
}

pub fn execute(args: ListArgs) -> anyhow::Result<()> {
    let spec_dir = args
        .spec_dir
        .unwrap_or_else(|| RunOptions::default().spec_dir);
    let specs = spec_files(&spec_dir)?;

    if specs.is_empty() {
        println!("No spec files under {}", spec_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Spec", "Suite"]);

    for path in &specs {
        let target = Target {
            path: path.clone(),
            line: None,
        };
        let suite = selector::for_target(&target).unwrap_or_default();
        table.add_row(vec![path.display().to_string(), suite]);
    }

    println!("{table}");
    println!("{} spec files", specs.len());
    Ok(())
}

fn spec_files(spec_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !spec_dir.is_dir() {
        anyhow::bail!("Spec directory {} does not exist", spec_dir.display());
    }

    let mut specs = Vec::new();
    for entry in WalkDir::new(spec_dir).sort_by_file_name() {
        let entry = entry.context("Failed to walk the spec directory")?;
        if entry.file_type().is_file() && is_spec_file(entry.path()) {
            specs.push(entry.into_path());
        }
    }
    Ok(specs)
}

fn is_spec_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with("_spec.js") || name.ends_with("_spec.coffee"))
        .unwrap_or(false)
}
