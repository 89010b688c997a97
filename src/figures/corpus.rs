//! The research corpus: one `paper_metadata.json` per paper, and the mapping from corpus figure
//! IDs to the figure files the website already serves.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::load_json;

/// Captions are compared on this many leading characters.
const CAPTION_KEY_LEN: usize = 150;

#[derive(Debug, Clone, Deserialize)]
pub struct PaperMetadata {
    pub paper: PaperInfo,
    #[serde(default)]
    pub figures: Vec<CorpusFigure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaperInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorpusFigure {
    pub figure_id: String,
    #[serde(default)]
    pub panel_id: Option<String>,
    #[serde(default)]
    pub technical_caption: String,
    #[serde(default)]
    pub short_title: String,
    #[serde(default)]
    pub summary: Option<FigureSummary>,
    #[serde(default)]
    pub metadata: FigureMetadata,
    #[serde(default)]
    pub filename: Option<Filename>,
}

impl CorpusFigure {
    fn caption_key(&self) -> &str {
        match self.technical_caption.char_indices().nth(CAPTION_KEY_LEN) {
            Some((i, _)) => &self.technical_caption[..i],
            None => &self.technical_caption,
        }
    }

    fn panel(&self) -> Option<&str> {
        self.panel_id.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FigureSummary {
    #[serde(default)]
    pub what_we_see: String,
    #[serde(default)]
    pub the_finding: String,
    #[serde(default)]
    pub why_it_matters: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FigureMetadata {
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A figure is stored as one file or, when it was split on disk, as several.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Filename {
    Single(String),
    Multiple(Vec<String>),
}

/// Papers keyed by ID, in sorted order.
pub type Corpus = BTreeMap<String, PaperMetadata>;

/// Read `<dir>/papers/*/paper_metadata.json`. A missing `papers` directory is an empty corpus.
pub fn load_corpus(dir: &Path) -> anyhow::Result<Corpus> {
    let papers_dir = dir.join("papers");
    let mut corpus = Corpus::new();
    if !papers_dir.is_dir() {
        tracing::debug!(dir = %papers_dir.display(), "no corpus papers directory");
        return Ok(corpus);
    }

    let mut files: Vec<_> = fs::read_dir(&papers_dir)
        .with_context(|| format!("failed to read {}", papers_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path().join("paper_metadata.json"))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    for file in files {
        let paper: PaperMetadata = load_json(&file)?;
        corpus.insert(paper.paper.id.clone(), paper);
    }
    Ok(corpus)
}

/// Corpus figure ID to website figure ID for one paper. `None` means the figure has no file of
/// its own on the website.
pub type PaperMapping = HashMap<String, Option<String>>;

/// Build the mapping for every paper of `current`, using `old` (a snapshot of the corpus from
/// when the website files were generated) to follow renamed and split figures.
pub fn build_mapping(current: &Corpus, old: &Corpus) -> BTreeMap<String, PaperMapping> {
    current
        .iter()
        .map(|(id, paper)| {
            let map = match old.get(id) {
                Some(old_paper) => map_paper(paper, old_paper),
                None => paper
                    .figures
                    .iter()
                    .map(|f| (f.figure_id.clone(), Some(f.figure_id.clone())))
                    .collect(),
            };
            (id.clone(), map)
        })
        .collect()
}

fn map_paper(paper: &PaperMetadata, old: &PaperMetadata) -> PaperMapping {
    let mut by_caption: HashMap<&str, &CorpusFigure> = HashMap::new();
    let mut old_ids = HashSet::new();
    let mut multi_file: HashMap<&str, &[String]> = HashMap::new();
    for fig in &old.figures {
        by_caption.insert(fig.caption_key(), fig);
        old_ids.insert(fig.figure_id.as_str());
        if let Some(Filename::Multiple(names)) = &fig.filename {
            multi_file.insert(fig.figure_id.as_str(), names);
        }
    }

    let mut claims: HashMap<&str, usize> = HashMap::new();
    let mut map = PaperMapping::new();
    for fig in &paper.figures {
        let key = fig.caption_key();
        let target = match by_caption.get(key) {
            Some(old_fig) => {
                let old_id = old_fig.figure_id.as_str();
                let claimed = claims.entry(key).or_default();
                *claimed += 1;
                match fig.panel() {
                    None => Some(old_id.to_string()),
                    Some(panel) => match multi_file.get(old_id) {
                        Some(names) => panel_index(panel)
                            .and_then(|i| names.get(i))
                            .map(|name| file_stem(name).to_string()),
                        None if *claimed == 1 => Some(old_id.to_string()),
                        None => None,
                    },
                }
            }
            None => match fig.panel() {
                None if old_ids.contains(fig.figure_id.as_str()) => Some(fig.figure_id.clone()),
                None => None,
                Some(panel) => base_figure(&fig.figure_id)
                    .filter(|base| old_ids.contains(base.as_str()) && panel == "a"),
            },
        };
        map.insert(fig.figure_id.clone(), target);
    }
    map
}

/// `a` is 0; anything that is not a single lowercase letter has no index.
fn panel_index(panel: &str) -> Option<usize> {
    let mut chars = panel.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='z'), None) => Some(c as usize - 'a' as usize),
        _ => None,
    }
}

/// `fig_15c` gives `fig_15`.
fn base_figure(figure_id: &str) -> Option<String> {
    static FIG_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^fig_(\d+)").unwrap());
    FIG_NUMBER_RE
        .captures(figure_id)
        .map(|c| format!("fig_{}", &c[1]))
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Website ID of `figure_id` in `paper`; figures the mapping never saw keep their ID.
pub fn website_id<'a>(
    mapping: &'a BTreeMap<String, PaperMapping>,
    paper: &str,
    figure_id: &'a str,
) -> Option<&'a str> {
    match mapping.get(paper).and_then(|m| m.get(figure_id)) {
        Some(target) => target.as_deref(),
        None => Some(figure_id),
    }
}
