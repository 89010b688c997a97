//! New invited-talk entries appended to the yearly BibTeX files.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use biblatex::Bibliography;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Category, convert::field_text};
use crate::{config::SitePaths, report};

static KEY_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]*\b|\b[A-Z]{2,}\b").unwrap());

pub const DEFAULT_KEYWORDS: &str = "invited";

/// A four-digit year between 1900 and 2100.
pub fn parse_year(s: &str) -> Result<String, String> {
    let s = s.trim();
    match s.parse::<u16>() {
        Ok(y) if s.len() == 4 && (1900..=2100).contains(&y) => Ok(s.to_string()),
        _ => Err(format!("{s:?} is not a four-digit year between 1900 and 2100")),
    }
}

/// `1`-`12` or an English month name.
pub fn parse_month(s: &str) -> Result<String, String> {
    let s = s.trim();
    let valid = match s.parse::<u8>() {
        Ok(m) => (1..=12).contains(&m),
        Err(_) => s.parse::<chrono::Month>().is_ok(),
    };
    if valid {
        Ok(s.to_string())
    } else {
        Err(format!("{s:?} is not a month: use 1-12 or a name such as January"))
    }
}

pub fn parse_day(s: &str) -> Result<String, String> {
    let s = s.trim();
    match s.parse::<u8>() {
        Ok(d) if (1..=31).contains(&d) => Ok(s.to_string()),
        _ => Err(format!("{s:?} is not a day between 1 and 31")),
    }
}

/// The first capitalised word or acronym of the venue, followed by the year.
///
/// `NASA Goddard Space Flight Center` in 2023 gives `NASA2023`.
pub fn suggest_citation_key(booktitle: &str, year: &str) -> String {
    let venue = KEY_WORD_RE
        .find(booktitle)
        .map(|m| m.as_str())
        .unwrap_or("Talk");
    format!("{venue}{year}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTalk {
    pub category: Category,
    pub key: String,
    pub author: String,
    pub title: String,
    pub year: String,
    pub month: Option<String>,
    pub day: Option<String>,
    pub booktitle: String,
    pub location: Option<String>,
    pub bibcode: Option<String>,
    pub keywords: String,
    pub url: Option<String>,
}

impl NewTalk {
    /// `@inproceedings` with fields in a fixed order; empty optional fields are left out.
    pub fn to_bibtex(&self) -> String {
        let mut lines = vec![format!("@inproceedings{{{},", self.key)];
        let fields = [
            ("author", Some(self.author.as_str())),
            ("title", Some(self.title.as_str())),
            ("year", Some(self.year.as_str())),
            ("month", self.month.as_deref()),
            ("day", self.day.as_deref()),
            ("booktitle", Some(self.booktitle.as_str())),
            ("location", self.location.as_deref()),
            ("bibcode", self.bibcode.as_deref()),
            ("keywords", Some(self.keywords.as_str())),
            ("url", self.url.as_deref()),
        ];
        for (name, value) in fields {
            let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            if name == "title" {
                lines.push(format!(" title = {{{{{value}}}}},"));
            } else {
                lines.push(format!(" {name} = {{{value}}},"));
            }
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    pub fn target_file(&self, bibtex_dir: &Path) -> PathBuf {
        bibtex_dir
            .join(self.category.dir_name())
            .join(format!("{}.bib", self.year))
    }
}

/// Parse `entry` back and check that it holds exactly one entry with the expected key and
/// a title.
pub fn check_bibtex(entry: &str, key: &str) -> anyhow::Result<()> {
    let bib = Bibliography::parse(entry)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("generated entry is not valid BibTeX")?;
    let entries: Vec<_> = bib.into_iter().collect();
    let [parsed] = entries.as_slice() else {
        bail!("generated BibTeX holds {} entries, expected 1", entries.len());
    };
    if parsed.key != key {
        bail!("generated BibTeX has key {:?}, expected {key:?}", parsed.key);
    }
    if field_text(parsed, "title").is_none_or(|t| t.trim().is_empty()) {
        bail!("generated BibTeX entry {key} has no title");
    }
    Ok(())
}

/// Append `entry` to `path` with one blank line before it, creating the file (and its
/// directory) if needed. Returns whether the file was created.
pub fn append_entry(path: &Path, entry: &str) -> anyhow::Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let separator = match existing.as_deref() {
        None | Some("") => "",
        Some(text) if text.ends_with("\n\n") => "",
        Some(text) if text.ends_with('\n') => "\n",
        Some(_) => "\n\n",
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{separator}{entry}")
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(existing.is_none())
}

/// `pubkit add-talk`.
pub fn run_add_talk(paths: &SitePaths, talk: &NewTalk, dry_run: bool) -> anyhow::Result<()> {
    let entry = talk.to_bibtex();
    check_bibtex(&entry, &talk.key)?;
    let target = talk.target_file(&paths.bibtex_dir());

    if dry_run {
        println!("{entry}");
        report::note(format!(
            "Dry run: would write to {}",
            paths.relative(&target).display()
        ));
        return Ok(());
    }

    let created = append_entry(&target, &entry)?;
    let verb = if created { "Created" } else { "Appended to" };
    report::success(format!("{verb} {}", paths.relative(&target).display()));
    report::note("Next: run `pubkit convert-invited`");
    if talk.category == Category::Conferences {
        report::note("then `pubkit merge-invited`");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talk() -> NewTalk {
        NewTalk {
            category: Category::Presentations,
            key: "GSFC2023".into(),
            author: r"\textbf{Alterman, B.~L.}".into(),
            title: r"From Kinetics to the Solar Cycle: Probing \emph{In Situ} Observations".into(),
            year: "2023".into(),
            month: Some("April".into()),
            day: Some("7".into()),
            booktitle: "NASA Goddard Space Flight Center".into(),
            location: Some("Greenbelt, MD".into()),
            bibcode: None,
            keywords: DEFAULT_KEYWORDS.into(),
            url: Some(String::new()),
        }
    }

    #[test]
    fn suggests_keys() {
        assert_eq!(suggest_citation_key("NASA Goddard Space Flight Center", "2023"), "NASA2023");
        assert_eq!(suggest_citation_key("University of New Hampshire", "2025"), "University2025");
        assert_eq!(suggest_citation_key("the SHINE meeting", "2019"), "SHINE2019");
        assert_eq!(suggest_citation_key("virtual", "2020"), "Talk2020");
    }

    #[test]
    fn validates_inputs() {
        assert_eq!(parse_year("2023"), Ok("2023".into()));
        assert!(parse_year("1899").is_err());
        assert!(parse_year("23").is_err());
        assert!(parse_year("02023").is_err());
        assert!(parse_month("12").is_ok());
        assert!(parse_month("march").is_ok());
        assert!(parse_month("13").is_err());
        assert!(parse_month("Smarch").is_err());
        assert!(parse_day("31").is_ok());
        assert!(parse_day("0").is_err());
        assert!(parse_day("32").is_err());
    }

    #[test]
    fn formats_valid_bibtex() {
        let entry = talk().to_bibtex();
        assert_eq!(
            entry,
            r"@inproceedings{GSFC2023,
 author = {\textbf{Alterman, B.~L.}},
 title = {{From Kinetics to the Solar Cycle: Probing \emph{In Situ} Observations}},
 year = {2023},
 month = {April},
 day = {7},
 booktitle = {NASA Goddard Space Flight Center},
 location = {Greenbelt, MD},
 keywords = {invited},
}"
        );
        check_bibtex(&entry, "GSFC2023").unwrap();
    }

    #[test]
    fn rejects_prematurely_closed_entry() {
        let broken = "@inproceedings{Key,}\n author = {A},\n title = {{T}},\n year = {2025},\n";
        assert!(check_bibtex(broken, "Key").is_err());
    }

    #[test]
    fn appends_with_one_blank_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("presentations/2023.bib");
        assert!(append_entry(&path, "@misc{a,\n title = {A},\n}").unwrap());
        assert!(!append_entry(&path, "@misc{b,\n title = {B},\n}").unwrap());
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "@misc{a,\n title = {A},\n}\n\n@misc{b,\n title = {B},\n}\n");
        let bib = Bibliography::parse(&text).unwrap();
        assert_eq!(bib.len(), 2);
    }

    #[test]
    fn target_is_category_and_year() {
        let t = talk();
        assert_eq!(
            t.target_file(Path::new("/site/data/bibtex")),
            Path::new("/site/data/bibtex/presentations/2023.bib")
        );
    }
}
