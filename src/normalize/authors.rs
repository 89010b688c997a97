//! Author display names.
//!
//! ADS returns the same person under many spellings ("Alterman, Benjamin L.", "B. L. Alterman",
//! "Alterman BL"). A rule file lists the people whose names the site cares about together with
//! the one spelling to show, and every raw name is checked against a fixed set of patterns per
//! rule: reversed, forward, then abbreviated.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, ensure};
use regex::Regex;
use serde::Deserialize;

use crate::record::{Publication, load_json};

/// Suffixes dropped when building initials.
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameRule {
    pub last_name: String,
    pub first_initial: String,
    #[serde(default)]
    pub middle_initial: Option<String>,
    /// Spelled-out given names accepted in place of the first initial.
    #[serde(default)]
    pub first_names: Vec<String>,
    pub canonical: String,
}

#[derive(Debug)]
struct CompiledRule {
    rule: NameRule,
    patterns: Vec<Regex>,
}

impl CompiledRule {
    fn new(rule: NameRule) -> anyhow::Result<Self> {
        ensure!(
            !rule.last_name.trim().is_empty(),
            "author rule for {:?} has an empty last_name",
            rule.canonical
        );
        ensure!(
            !rule.canonical.trim().is_empty(),
            "author rule for {:?} has an empty canonical name",
            rule.last_name
        );
        let first = initial_of(&rule.first_initial).with_context(|| {
            format!("author rule for {:?} needs a first_initial", rule.last_name)
        })?;
        let middle = rule.middle_initial.as_deref().and_then(initial_of);

        let last = regex::escape(rule.last_name.trim());
        let f = regex::escape(&first.to_string());
        let mut given: Vec<String> = rule
            .first_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(regex::escape)
            .collect();
        // Longest first so "Benjamin" is not shadowed by "Ben".
        given.sort_by_key(|n| std::cmp::Reverse(n.len()));
        given.push(format!(r"{f}\."));
        given.push(f.clone());
        let first_alt = format!("(?:{})", given.join("|"));

        let (middle_opt, middle_abbr) = match middle {
            Some(m) => {
                let m = regex::escape(&m.to_string());
                (format!(r"(?:\s*(?:{m}\.|{m}[a-z]+\.?|{m}))?"), format!("{m}?"))
            }
            None => (String::new(), String::new()),
        };

        let sources = [
            // Last, First Middle | Last, F. M. | Last, F.M.
            format!(r"(?i)^\s*{last}\s*,\s*{first_alt}{middle_opt}\s*$"),
            // First Middle Last | F. M. Last
            format!(r"(?i)^\s*{first_alt}{middle_opt}\s+{last}\s*$"),
            // Last FM
            format!(r"(?i)^\s*{last}\s+{f}{middle_abbr}\s*$"),
        ];
        let patterns = sources
            .iter()
            .map(|src| Regex::new(src))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid author rule for {:?}", rule.last_name))?;
        Ok(CompiledRule { rule, patterns })
    }
}

fn initial_of(s: &str) -> Option<char> {
    s.trim().trim_end_matches('.').chars().next().filter(|c| c.is_alphabetic())
}

/// Maps raw author strings onto canonical display names.
#[derive(Debug, Default)]
pub struct AuthorStandardizer {
    rules: Vec<CompiledRule>,
}

impl AuthorStandardizer {
    pub fn new(rules: Vec<NameRule>) -> anyhow::Result<Self> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::new)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(AuthorStandardizer { rules })
    }

    /// Rules from the JSON array at `path`. A missing file gives an empty standardizer.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "no author rule file; names are kept as given");
            return Ok(AuthorStandardizer::default());
        }
        let rules: Vec<NameRule> = load_json(path)?;
        tracing::info!(count = rules.len(), "loaded author rules");
        Self::new(rules)
    }

    pub fn rules(&self) -> impl Iterator<Item = &NameRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The canonical name of the first rule whose pattern matches, else `raw` unchanged.
    pub fn standardize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|r| r.patterns.iter().any(|p| p.is_match(raw)))
            .map(|r| r.rule.canonical.as_str())
            .unwrap_or(raw)
    }

    /// Standardize every author of every publication; returns how many names changed.
    pub fn apply(&self, publications: &mut [Publication]) -> usize {
        let mut changed = 0;
        for author in publications.iter_mut().flat_map(|p| p.authors.iter_mut()) {
            let canonical = self.standardize(author);
            if canonical != author.as_str() {
                *author = canonical.to_string();
                changed += 1;
            }
        }
        changed
    }
}

/// Every spelling of `rule`'s surname found among the authors, most frequent first.
pub fn surname_variants(rule: &NameRule, publications: &[Publication]) -> Vec<(String, usize)> {
    let needle = rule.last_name.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for author in publications.iter().flat_map(|p| &p.authors) {
        if author.to_lowercase().contains(&needle) {
            *counts.entry(author.as_str()).or_default() += 1;
        }
    }
    let mut variants: Vec<(String, usize)> =
        counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    variants.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    variants
}

/// Format an ADS author as `Last, F. M.`. Accepts `Last, Given Names` and `Given Names Last`.
pub fn format_author_name(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let (last, given) = match raw.split_once(',') {
        Some((last, given)) => (last.trim(), initials(given)),
        None => {
            let mut parts: Vec<&str> = raw.split_whitespace().collect();
            let last = parts.pop().unwrap_or_default();
            (last, initials(parts.join(" ")))
        }
    };
    if given.is_empty() {
        last.to_string()
    } else {
        format!("{last}, {given}")
    }
}

fn initials(given: impl AsRef<str>) -> String {
    given
        .as_ref()
        .split(|c: char| c.is_whitespace() || c == '.' || c == ',')
        .filter(|t| !t.is_empty())
        .filter(|t| !NAME_SUFFIXES.contains(&t.to_lowercase().as_str()))
        .map(|token| {
            token
                .split('-')
                .filter_map(|part| part.chars().next())
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
