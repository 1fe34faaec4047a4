// Flat TSV export of the ranked entries.
//
// One row per (category, token). A token ranked in two categories appears
// twice. Missing numbers are written as NA.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::format_value;
use crate::ranking::RankedEntry;

pub const HEADER: [&str; 7] = [
    "token",
    "category",
    "rank",
    "n_users",
    "cohen-d",
    "cohen-d_lo",
    "cohen-d_hi",
];

/// Write the header and one line per entry.
pub fn write_entries<W: Write>(entries: &[RankedEntry], mut out: W) -> std::io::Result<()> {
    writeln!(out, "{}", HEADER.join("\t"))?;
    for entry in entries {
        let (lo, hi) = match entry.ci {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            entry.token,
            entry.category,
            entry.rank,
            entry.n_users,
            format_value(entry.cohen_d),
            format_value(lo),
            format_value(hi),
        )?;
    }
    out.flush()
}

/// Write the export file in one go, creating parent directories as needed.
pub fn export(entries: &[RankedEntry], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create export {}", path.display()))?;
    write_entries(entries, BufWriter::new(file))
        .with_context(|| format!("failed to write export {}", path.display()))?;
    info!(rows = entries.len(), path = %path.display(), "Exported ranked tokens");
    Ok(())
}
