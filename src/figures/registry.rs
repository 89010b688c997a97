//! `figure-registry.json`: one entry per figure file the website serves, keyed `<paper>/<figure>`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    corpus::{Corpus, FigureSummary, PaperMapping, load_corpus, website_id, build_mapping},
    topics::{FigureUsage, figure_usage, load_topics},
};
use crate::{
    config::SitePaths,
    record::{OrderedMap, load_json, to_pretty_json, write_json},
    report,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureEntry {
    pub paper_id: String,
    pub figure_id: String,
    pub src: String,
    #[serde(default)]
    pub short_title: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub summary: Option<FigureSummary>,
    #[serde(default)]
    pub summary_short: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub technical_caption: String,
    #[serde(default)]
    pub used_as_primary_in: Vec<String>,
    #[serde(default)]
    pub used_as_related_in: Vec<String>,
}

pub type Registry = OrderedMap<FigureEntry>;

pub fn load_registry(path: &Path) -> anyhow::Result<Registry> {
    load_json(path)
}

/// Text up to the first `". "`, ending in exactly one period.
pub fn first_sentence(text: &str) -> String {
    let head = text.split(". ").next().unwrap_or(text);
    let head = head.trim_end_matches('.');
    format!("{head}.")
}

/// Build the registry. Papers come in sorted order and figures in file order; figures mapped to
/// no website file are left out.
pub fn generate_registry(
    corpus: &Corpus,
    mapping: &std::collections::BTreeMap<String, PaperMapping>,
    usage: &OrderedMap<FigureUsage>,
    public_dir: &Path,
) -> Registry {
    let mut registry = Registry::new();
    for (paper_id, paper) in corpus {
        for fig in &paper.figures {
            let Some(website) = website_id(mapping, paper_id, &fig.figure_id) else {
                continue;
            };
            let key = format!("{paper_id}/{website}");

            if let Some(existing) = registry.get_mut(&key) {
                for kw in &fig.metadata.keywords {
                    if !existing.keywords.contains(kw) {
                        existing.keywords.push(kw.clone());
                    }
                }
                continue;
            }

            let summary = fig.summary.clone();
            let alt = match &summary {
                Some(s) if !s.what_we_see.is_empty() => first_sentence(&s.what_we_see),
                _ => fig.short_title.clone(),
            };
            let summary_short = summary
                .as_ref()
                .filter(|s| !s.the_finding.is_empty())
                .map(|s| first_sentence(&s.the_finding));
            let usage = usage.get(&key).cloned().unwrap_or_default();

            registry.insert(
                key,
                FigureEntry {
                    paper_id: paper_id.clone(),
                    figure_id: website.to_string(),
                    src: figure_src(public_dir, paper_id, website),
                    short_title: fig.short_title.clone(),
                    alt,
                    summary,
                    summary_short,
                    keywords: fig.metadata.keywords.clone(),
                    technical_caption: fig.technical_caption.clone(),
                    used_as_primary_in: usage.primary_in,
                    used_as_related_in: usage.related_in,
                },
            );
        }
    }
    registry
}

/// Site path of the figure file: the PNG when one exists under `public_dir`, else the SVG.
fn figure_src(public_dir: &Path, paper: &str, figure: &str) -> String {
    let base = format!("papers/{paper}/figures/{figure}");
    let ext = if public_dir.join(format!("{base}.png")).is_file() {
        "png"
    } else {
        "svg"
    };
    format!("/{base}.{ext}")
}

/// Topic refs with no registry entry.
pub fn unresolved_refs<'a>(registry: &Registry, usage: &'a OrderedMap<FigureUsage>) -> Vec<&'a str> {
    usage
        .keys()
        .filter(|r| !registry.contains_key(r.as_str()))
        .map(String::as_str)
        .collect()
}

/// `pubkit figures registry`.
pub fn run_figure_registry(
    paths: &SitePaths,
    old_corpus: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let corpus_dir = paths.corpus_dir();
    let corpus = load_corpus(&corpus_dir)?;
    report::note(format!("Found {} corpus papers", corpus.len()));

    let old = match old_corpus {
        Some(dir) => {
            let old = load_corpus(dir)?;
            report::note(format!("Found {} papers in the old corpus snapshot", old.len()));
            old
        }
        None => Corpus::new(),
    };

    let mapping = build_mapping(&corpus, &old);
    for (paper_id, map) in &mapping {
        let mut remaps: Vec<_> = map
            .iter()
            .filter_map(|(from, to)| {
                to.as_deref()
                    .filter(|to| *to != from.as_str())
                    .map(|to| (from, to))
            })
            .collect();
        let mut skipped: Vec<_> = map
            .iter()
            .filter(|(_, to)| to.is_none())
            .map(|(from, _)| from)
            .collect();
        if remaps.is_empty() && skipped.is_empty() {
            continue;
        }
        remaps.sort();
        skipped.sort();
        report::note(paper_id);
        for (from, to) in remaps {
            report::detail(format!("{from} → {to}"));
        }
        for from in skipped {
            report::detail(format!("{from} → (no website file, skipped)"));
        }
    }

    let topics = load_topics(&paths.topics_dir())?;
    let usage = figure_usage(&topics);
    report::note(format!("Found {} unique figure refs across topics", usage.len()));

    let registry = generate_registry(&corpus, &mapping, &usage, &paths.public_dir());

    let unresolved = unresolved_refs(&registry, &usage);
    if !unresolved.is_empty() {
        for r in &unresolved {
            report::failure(format!("Topic ref '{r}' not found in registry"));
        }
        anyhow::bail!(
            "{} topic refs do not resolve; registry not written",
            unresolved.len()
        );
    }
    report::success("All topic refs resolve");

    let primary = registry.iter().filter(|(_, e)| !e.used_as_primary_in.is_empty()).count();
    let related = registry.iter().filter(|(_, e)| !e.used_as_related_in.is_empty()).count();
    let papers: std::collections::BTreeSet<_> =
        registry.iter().map(|(_, e)| e.paper_id.as_str()).collect();
    report::heading("Registry summary");
    report::detail(format!("Total entries   : {}", registry.len()));
    report::detail(format!("Used as primary : {primary}"));
    report::detail(format!("Used as related : {related}"));
    report::detail(format!("Papers covered  : {}", papers.len()));

    let target = paths.registry_file();
    if dry_run {
        report::note(format!("Dry run; would write {}", paths.relative(&target).display()));
        if let Some((key, entry)) = registry.iter().next() {
            report::note(format!("Sample entry ({key}):"));
            println!("{}", to_pretty_json(entry)?);
        }
        return Ok(());
    }
    write_json(&target, &registry)?;
    report::success(format!("Wrote registry to {}", paths.relative(&target).display()));
    Ok(())
}
