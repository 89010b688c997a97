//! Derived statistics for the publications page.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::SitePaths,
    record::{OrderedMap, Publication, load_json, load_publications, write_json},
    report,
};

const CITATION_HISTOGRAMS: [&str; 4] = [
    "refereed to refereed",
    "refereed to nonrefereed",
    "nonrefereed to refereed",
    "nonrefereed to nonrefereed",
];

#[derive(Debug, PartialEq, Serialize)]
pub struct InvitedMetrics {
    pub total_invited_talks: usize,
    pub invited_by_year: BTreeMap<String, usize>,
    pub invited_conferences: OrderedMap<usize>,
}

/// Counts per key, most frequent first; equal counts keep the order keys were first seen.
fn ranked<'a>(keys: impl Iterator<Item = &'a str>) -> OrderedMap<usize> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().collect()
}

fn venue_or_unknown(p: &Publication) -> &str {
    p.venue().unwrap_or("Unknown")
}

pub fn compute_invited_metrics(publications: &[Publication]) -> InvitedMetrics {
    let invited: Vec<&Publication> = publications.iter().filter(|p| p.invited).collect();
    let mut invited_by_year = BTreeMap::new();
    for p in &invited {
        match p.year.split('-').next().filter(|y| !y.is_empty()) {
            Some(year) => *invited_by_year.entry(year.to_string()).or_default() += 1,
            None => tracing::debug!(title = %p.title, "invited talk has no year; not counted by year"),
        }
    }
    InvitedMetrics {
        total_invited_talks: invited.len(),
        invited_by_year,
        invited_conferences: ranked(invited.iter().map(|p| venue_or_unknown(p))),
    }
}

/// `pubkit invited-metrics`.
pub fn run_invited_metrics(paths: &SitePaths, dry_run: bool) -> anyhow::Result<()> {
    let publications = load_publications(&paths.publications_file())?;
    let metrics = compute_invited_metrics(&publications);

    report::heading("Invited talk metrics");
    report::detail(format!("Total invited talks: {}", metrics.total_invited_talks));
    for (year, n) in &metrics.invited_by_year {
        report::detail(format!("{year}: {n}"));
    }
    for (venue, n) in metrics.invited_conferences.iter().take(5) {
        report::detail(format!("{venue}: {n}"));
    }
    if metrics.invited_conferences.len() > 5 {
        report::detail(format!(
            "... and {} more venues",
            metrics.invited_conferences.len() - 5
        ));
    }

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    let target = paths.public_data_dir().join("invited_metrics.json");
    write_json(&target, &metrics)?;
    report::success(format!("Metrics saved to {}", paths.relative(&target).display()));
    Ok(())
}

/// `metrics` at `path`, or an error naming the dotted key path.
fn lookup<'a>(metrics: &'a Value, path: &[&str]) -> anyhow::Result<&'a Value> {
    let mut cur = metrics;
    for (i, key) in path.iter().enumerate() {
        cur = cur.get(key).with_context(|| {
            format!("ads_metrics.json is missing `{}`", path[..=i].join("."))
        })?;
    }
    Ok(cur)
}

fn count(v: &Value) -> u64 {
    v.as_u64()
        .or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64))
        .unwrap_or(0)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvitedYear {
    pub presentations: usize,
    pub conferences: usize,
    pub total: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub refereed: usize,
    pub conferences: usize,
    pub datasets: usize,
    pub software: usize,
    #[serde(rename = "invited-talks")]
    pub invited_talks: usize,
    #[serde(rename = "phd-thesis")]
    pub phd_thesis: usize,
    #[serde(rename = "white-papers")]
    pub white_papers: usize,
    pub preprints: usize,
}

pub fn category_counts(ads: &[Publication], presentations: &[Publication]) -> CategoryCounts {
    let of = |kinds: &[&str]| {
        ads.iter()
            .filter(|p| kinds.contains(&p.publication_type.as_str()))
            .count()
    };
    CategoryCounts {
        refereed: of(&["article"]),
        conferences: of(&["inproceedings", "abstract"]),
        datasets: of(&["dataset"]),
        software: of(&["software"]),
        invited_talks: presentations.len(),
        phd_thesis: of(&["phdthesis"]),
        white_papers: of(&["techreport"]),
        preprints: of(&["eprint"]),
    }
}

/// Invited talks per year, split by source list.
pub fn invited_by_year(
    presentations: &[Publication],
    conferences: &[Publication],
) -> BTreeMap<String, InvitedYear> {
    let mut by_year: BTreeMap<String, InvitedYear> = BTreeMap::new();
    for (list, is_conference) in [(presentations, false), (conferences, true)] {
        for p in list {
            let year = p.year.get(..4).unwrap_or(&p.year).to_string();
            let slot = by_year.entry(year).or_default();
            if is_conference {
                slot.conferences += 1;
            } else {
                slot.presentations += 1;
            }
            slot.total += 1;
        }
    }
    by_year
}

/// Sum of the four citation histograms per year.
pub fn total_citations_by_year(citations: &Value) -> anyhow::Result<BTreeMap<String, u64>> {
    let mut total = BTreeMap::new();
    for name in CITATION_HISTOGRAMS {
        let hist = lookup(citations, &[name])?
            .as_object()
            .with_context(|| format!("citation histogram `{name}` is not an object"))?;
        for (year, n) in hist {
            *total.entry(year.clone()).or_default() += count(n);
        }
    }
    Ok(total)
}

/// ADS publications per year plus the invited talks of that year.
pub fn all_including_invited(
    ads_by_year: &Value,
    invited: &BTreeMap<String, InvitedYear>,
) -> BTreeMap<String, u64> {
    let mut merged: BTreeMap<String, u64> = ads_by_year
        .as_object()
        .map(|o| o.iter().map(|(y, n)| (y.clone(), count(n))).collect())
        .unwrap_or_default();
    for (year, counts) in invited {
        *merged.entry(year.clone()).or_default() += counts.total as u64;
    }
    merged
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub h_index: Value,
    pub g_index: Value,
    pub i10: Value,
    pub i100: Value,
    pub m_index: Value,
    pub total_citations: Value,
    pub refereed_citations: Value,
    pub ads_papers: u64,
    pub refereed_papers: Value,
    pub invited_conferences: usize,
    pub invited_presentations: usize,
    pub invited_total: usize,
    pub total_papers: u64,
    pub total_reads: Value,
    pub total_downloads: Value,
}

#[derive(Debug, Serialize)]
pub struct PublicationsByYear {
    pub all: Value,
    pub refereed: Value,
    pub normalized_all: Value,
    pub normalized_refereed: Value,
    pub all_including_invited: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ReadsByYear {
    pub all_reads: Value,
    pub refereed_reads: Value,
    pub normalized_all: Value,
    pub normalized_refereed: Value,
}

#[derive(Debug, Serialize)]
pub struct DownloadsByYear {
    pub all_downloads: Value,
    pub refereed_downloads: Value,
    pub normalized_all: Value,
    pub normalized_refereed: Value,
}

/// `publication_statistics.json`.
#[derive(Debug, Serialize)]
pub struct PublicationStatistics {
    pub summary: Summary,
    pub time_series: Value,
    pub publications_by_year: PublicationsByYear,
    pub invited_by_year: BTreeMap<String, InvitedYear>,
    pub invited_by_venue: OrderedMap<usize>,
    pub citations_by_year: serde_json::Map<String, Value>,
    pub reads_by_year: ReadsByYear,
    pub downloads_by_year: DownloadsByYear,
    pub category_counts: CategoryCounts,
}

pub fn publication_statistics(
    metrics: &Value,
    ads: &[Publication],
    presentations: &[Publication],
    conferences: &[Publication],
) -> anyhow::Result<PublicationStatistics> {
    let m = |path: &[&str]| lookup(metrics, path).cloned();
    let hist = |group: &str, key: &str| m(&["histograms", group, key]);

    let ads_papers = count(&m(&["basic stats", "number of papers"])?);
    let summary = Summary {
        h_index: m(&["indicators", "h"])?,
        g_index: m(&["indicators", "g"])?,
        i10: m(&["indicators", "i10"])?,
        i100: m(&["indicators", "i100"])?,
        m_index: m(&["indicators", "m"])?,
        total_citations: m(&["citation stats", "total number of citations"])?,
        refereed_citations: m(&["citation stats", "total number of refereed citations"])?,
        ads_papers,
        refereed_papers: m(&["basic stats refereed", "number of papers"])?,
        invited_conferences: conferences.len(),
        invited_presentations: presentations.len(),
        invited_total: conferences.len() + presentations.len(),
        total_papers: ads_papers + presentations.len() as u64,
        total_reads: m(&["basic stats", "total number of reads"])?,
        total_downloads: m(&["basic stats", "total number of downloads"])?,
    };

    let invited_by_year = invited_by_year(presentations, conferences);
    let all = hist("publications", "all publications")?;
    let publications_by_year = PublicationsByYear {
        all_including_invited: all_including_invited(&all, &invited_by_year),
        all,
        refereed: hist("publications", "refereed publications")?,
        normalized_all: hist("publications", "all publications normalized")?,
        normalized_refereed: hist("publications", "refereed publications normalized")?,
    };

    let citations = lookup(metrics, &["histograms", "citations"])?;
    let total_by_year = total_citations_by_year(citations)?;
    let mut citations_by_year = citations
        .as_object()
        .cloned()
        .context("`histograms.citations` in ads_metrics.json is not an object")?;
    citations_by_year.insert("total_by_year".into(), serde_json::to_value(total_by_year)?);

    Ok(PublicationStatistics {
        summary,
        time_series: m(&["time series"])?,
        publications_by_year,
        invited_by_year,
        invited_by_venue: ranked(
            presentations
                .iter()
                .chain(conferences)
                .map(venue_or_unknown),
        ),
        citations_by_year,
        reads_by_year: ReadsByYear {
            all_reads: hist("reads", "all reads")?,
            refereed_reads: hist("reads", "refereed reads")?,
            normalized_all: hist("reads", "all reads normalized")?,
            normalized_refereed: hist("reads", "refereed reads normalized")?,
        },
        downloads_by_year: DownloadsByYear {
            all_downloads: hist("downloads", "all downloads")?,
            refereed_downloads: hist("downloads", "refereed downloads")?,
            normalized_all: hist("downloads", "all downloads normalized")?,
            normalized_refereed: hist("downloads", "refereed downloads normalized")?,
        },
        category_counts: category_counts(ads, presentations),
    })
}

/// `pubkit publication-stats`.
pub fn run_publication_stats(paths: &SitePaths, dry_run: bool) -> anyhow::Result<()> {
    let dir = paths.public_data_dir();
    let metrics: Value = load_json(&dir.join("ads_metrics.json"))?;
    let ads = load_publications(&dir.join("ads_publications.json"))?;
    let presentations = load_publications(&dir.join("invited_presentations.json"))?;
    let conferences = load_publications(&dir.join("invited_conferences.json"))?;
    report::note(format!(
        "Loaded {} ADS publications, {} invited presentations, {} invited conferences",
        ads.len(),
        presentations.len(),
        conferences.len()
    ));

    let stats = publication_statistics(&metrics, &ads, &presentations, &conferences)?;
    let summary = &stats.summary;
    report::detail(format!("Total papers    : {}", summary.total_papers));
    report::detail(format!("h-index         : {}", summary.h_index));
    report::detail(format!("Total citations : {}", summary.total_citations));
    report::detail(format!(
        "Invited talks   : {} ({} conferences + {} presentations)",
        summary.invited_total, summary.invited_conferences, summary.invited_presentations
    ));

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    let target = dir.join("publication_statistics.json");
    write_json(&target, &stats)?;
    report::success(format!("Generated {}", paths.relative(&target).display()));
    Ok(())
}
