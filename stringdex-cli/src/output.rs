//! Human-readable rendering of query results.

use std::io::{self, Write};

use stringdex::{
    AddSummary, ExportRow, Exporter, SearchHit,
    types::{Bundle, BundleInfo, DeletedBundle, LanguageCount, TableCount},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const DEFAULT_COLUMNS: usize = 100;
const ELLIPSIS: &str = "...";

/// Column budget for one output line, or `None` when output is not a terminal.
pub fn terminal_columns(full: bool) -> Option<usize> {
    if full || !atty::is(atty::Stream::Stdout) {
        return None;
    }
    let columns = std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .filter(|c| *c > 0)
        .unwrap_or(DEFAULT_COLUMNS);
    Some(columns)
}

/// Cuts `s` to at most `width` display columns, marking the cut with `...`.
pub fn truncate_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let budget = width.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// `  42 | Weiter  ---  ('OK')`
pub fn format_hit(hit: &SearchHit, columns: Option<usize>) -> String {
    let value = hit.value.replace('\n', "\\n");
    let line = format!("{:>5} | {}  ---  ('{}')", hit.file_id, value, hit.key);
    match columns {
        Some(columns) => truncate_to_width(&line, columns),
        None => line,
    }
}

pub fn write_hits<W: Write>(mut out: W, hits: &[SearchHit], columns: Option<usize>) -> io::Result<()> {
    for hit in hits {
        writeln!(out, "{}", format_hit(hit, columns))?;
    }
    writeln!(out)?;
    writeln!(out, "{} results.", hits.len())
}

pub fn write_export<W: Write>(mut out: W, rows: &[ExportRow]) -> io::Result<()> {
    for line in Exporter::render(rows) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

pub fn write_bundles<W: Write>(mut out: W, bundles: &[Bundle]) -> io::Result<()> {
    if bundles.is_empty() {
        return writeln!(out, "  Nothing found.");
    }
    for bundle in bundles {
        writeln!(out, "{:>5} | {}  ({})", bundle.file_id, bundle.name, bundle.path)?;
    }
    Ok(())
}

pub fn write_languages<W: Write>(mut out: W, languages: &[LanguageCount]) -> io::Result<()> {
    if languages.is_empty() {
        return writeln!(out, "  Nothing found.");
    }
    for lang in languages {
        writeln!(out, "{:>7} | {}", lang.entries, lang.lang)?;
    }
    Ok(())
}

pub fn write_tables<W: Write>(mut out: W, tables: &[TableCount]) -> io::Result<()> {
    if tables.is_empty() {
        return writeln!(out, "  Nothing found.");
    }
    for table in tables {
        writeln!(out, "{:>7} | {}", table.entries, table.table)?;
    }
    Ok(())
}

pub fn write_keys<W: Write>(mut out: W, keys: &[String]) -> io::Result<()> {
    if keys.is_empty() {
        return writeln!(out, "  Nothing found.");
    }
    for key in keys {
        writeln!(out, "{}", key)?;
    }
    Ok(())
}

pub fn write_info<W: Write>(mut out: W, info: &BundleInfo) -> io::Result<()> {
    writeln!(out, "Info for bundle:")?;
    writeln!(out, "  id: {}", info.bundle.file_id)?;
    writeln!(out, "  name: '{}'", info.bundle.name)?;
    writeln!(out, "  path: '{}'", info.bundle.path)?;
    writeln!(out, "localizable strings:")?;
    writeln!(out, "   languages: {}", info.languages)?;
    writeln!(out, "   translations: {}", info.max_translations)?;
    writeln!(out, "   total: {}", info.total)
}

pub fn write_deleted<W: Write>(mut out: W, deleted: &[DeletedBundle]) -> io::Result<()> {
    writeln!(out, "Deleting:")?;
    for entry in deleted {
        writeln!(
            out,
            "  - {} ({} strings, {})",
            entry.bundle.name, entry.strings, entry.bundle.path
        )?;
    }
    Ok(())
}

pub fn write_add_summary<W: Write>(mut out: W, root: &str, summary: &AddSummary) -> io::Result<()> {
    writeln!(
        out,
        "Added {}: {} bundle(s) ({} new), {} string(s)",
        root, summary.bundles, summary.bundles_created, summary.entries
    )?;
    let report = &summary.report;
    writeln!(
        out,
        "  files: {} parsed, {} skipped; entries skipped: {}",
        report.files_parsed, report.files_skipped, report.entries_skipped
    )
}
