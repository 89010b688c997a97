//! BibTeX invited talks to the publication JSON schema.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use biblatex::{Bibliography, Chunk, Entry};
use once_cell::sync::Lazy;
use regex::Regex;

use super::Category;
use crate::{
    config::SitePaths,
    identifier::doi::DX_DOI_PREFIX,
    record::{Publication, load_publications, write_json},
    report,
};

static LATEX_CMD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:textbf|emph|textit|textsc|textrm|text)\{([^{}]*)\}").unwrap()
});
static BARE_CMD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:textbf|emph|textit|textsc|textrm)").unwrap());
static ESCAPED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([&$%#_])").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static AND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+and\s+").unwrap());

/// Plain text from a LaTeX-formatted field: formatting commands, braces, ties and escapes go,
/// their content stays.
pub fn strip_latex_formatting(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut text = text.replace(['~', '\u{a0}'], " ");
    loop {
        let next = LATEX_CMD_RE.replace_all(&text, "$1");
        if next == text {
            break;
        }
        text = next.into_owned();
    }
    let text = text.replace(['{', '}'], "");
    let text = BARE_CMD_RE.replace_all(&text, "");
    let text = ESCAPED_RE.replace_all(&text, "$1");
    let text = text.replace('\\', "");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Split a BibTeX `author` field on `and` and clean each name.
pub fn parse_author_field(authors: &str) -> Vec<String> {
    if authors.trim().is_empty() {
        return Vec::new();
    }
    AND_RE
        .split(authors)
        .map(|a| strip_latex_formatting(a.trim()))
        .filter(|a| !a.is_empty())
        .collect()
}

/// `YYYY-MM-DD`, using `00` for a missing or unrecognised month or day.
/// The month may be a number or an English month name.
pub fn format_date_field(year: &str, month: &str, day: &str) -> String {
    let month = month.trim();
    let month_num = if month.is_empty() {
        "00".to_string()
    } else if month.chars().all(|c| c.is_ascii_digit()) {
        format!("{month:0>2}")
    } else {
        month
            .parse::<chrono::Month>()
            .map(|m| format!("{:02}", m.number_from_month()))
            .unwrap_or_else(|_| "00".to_string())
    };
    let day = day.trim();
    let day_num = if !day.is_empty() && day.chars().all(|c| c.is_ascii_digit()) {
        format!("{day:0>2}")
    } else {
        "00".to_string()
    };
    format!("{}-{month_num}-{day_num}", year.trim())
}

/// The raw text of a field, with math kept in `$…$`.
pub fn field_text(entry: &Entry, name: &str) -> Option<String> {
    let chunks = entry.fields.get(name)?;
    Some(
        chunks
            .iter()
            .map(|c| match &c.v {
                Chunk::Math(s) => format!("${s}$"),
                c => c.get().to_owned(),
            })
            .collect(),
    )
}

/// One invited-talk record from a BibTeX entry.
pub fn convert_entry(entry: &Entry) -> Publication {
    let raw = |name: &str| field_text(entry, name);
    let month = raw("month").unwrap_or_default();
    let day = raw("day");
    let booktitle = raw("booktitle").map(|b| strip_latex_formatting(&b));

    Publication {
        bibcode: raw("bibcode"),
        title: strip_latex_formatting(&raw("title").unwrap_or_default()),
        authors: parse_author_field(&raw("author").unwrap_or_default()),
        year: format_date_field(
            &raw("year").unwrap_or_default(),
            &month,
            day.as_deref().unwrap_or_default(),
        ),
        month,
        day,
        journal: booktitle.clone().unwrap_or_default(),
        booktitle,
        publication_type: "inproceedings".to_string(),
        citations: 0,
        url: raw("doi")
            .map(|doi| format!("{DX_DOI_PREFIX}{}", doi.trim()))
            .unwrap_or_default(),
        invited: true,
        location: raw("location").map(|l| strip_latex_formatting(&l)),
        keywords: raw("keywords"),
        invited_url: raw("url"),
        ..Default::default()
    }
}

pub fn parse_bibtex_file(path: &Path) -> anyhow::Result<Vec<Entry>> {
    let src =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let bib = Bibliography::parse(&src)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(bib.into_iter().collect())
}

/// Sorted `*.bib` files directly inside `dir`.
pub fn bib_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "bib") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Convert every `.bib` file of one category directory. `None` when there is nothing to convert.
pub fn process_category(dir: &Path) -> anyhow::Result<Option<Vec<Publication>>> {
    let files = bib_files(dir)?;
    if files.is_empty() {
        report::warning(format!("No .bib files found in {}", dir.display()));
        return Ok(None);
    }

    let mut converted = Vec::new();
    for file in files {
        let name = file.file_name().unwrap_or_default().to_string_lossy().into_owned();
        if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
            report::note(format!("Skipping empty file {name}"));
            continue;
        }
        let entries = match parse_bibtex_file(&file) {
            Ok(entries) => entries,
            Err(err) => {
                report::warning(format!("Skipping {name}: {err:#}"));
                continue;
            }
        };
        let usable: Vec<Publication> = entries
            .iter()
            .map(convert_entry)
            .filter(|p| !p.title.is_empty())
            .collect();
        if usable.is_empty() {
            report::warning(format!(
                "{name} is not empty but yielded 0 usable entries; check for malformed BibTeX"
            ));
            continue;
        }
        report::detail(format!("{name}: {} entries", usable.len()));
        converted.extend(usable);
    }
    Ok(Some(converted))
}

fn dedup_key(p: &Publication) -> (String, String) {
    (
        p.title.trim().to_string(),
        p.year.get(..4).unwrap_or(&p.year).to_string(),
    )
}

/// Existing records first, untouched, then the converted ones not already present by
/// title and year. Returns the merged list and how many were appended.
pub fn merge_with_existing(
    existing: Vec<Publication>,
    converted: Vec<Publication>,
) -> (Vec<Publication>, usize) {
    let mut seen: HashSet<(String, String)> = existing.iter().map(dedup_key).collect();
    let mut merged = existing;
    let before = merged.len();
    for p in converted {
        if seen.insert(dedup_key(&p)) {
            merged.push(p);
        }
    }
    let added = merged.len() - before;
    (merged, added)
}

/// `pubkit convert-invited`.
pub fn run_convert_invited(paths: &SitePaths, dry_run: bool) -> anyhow::Result<()> {
    report::heading("Invited talks: BibTeX → JSON");
    let out_dir = paths.public_data_dir();

    for category in Category::ALL {
        let dir = paths.bibtex_dir().join(category.dir_name());
        if !dir.is_dir() {
            report::warning(format!(
                "Category directory not found: {}",
                paths.relative(&dir).display()
            ));
            continue;
        }
        report::note(format!("Processing {category}"));
        let Some(converted) = process_category(&dir)? else {
            continue;
        };

        let target = out_dir.join(category.output_file());
        let existing = if target.exists() {
            load_publications(&target)?
        } else {
            Vec::new()
        };
        let kept = existing.len();
        let (merged, added) = merge_with_existing(existing, converted);

        if dry_run {
            report::note(format!(
                "{}: would keep {kept} and add {added}",
                category.output_file()
            ));
            continue;
        }
        write_json(&target, &merged)?;
        report::success(format!(
            "Saved {} entries to {} ({added} new)",
            merged.len(),
            category.output_file()
        ));
    }
    Ok(())
}
