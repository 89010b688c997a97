//! Citations per year, split by whether the citing paper is refereed.

use std::{
    collections::BTreeMap,
    path::Path,
    time::{Duration, SystemTime},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AdsClient, AdsError};
use crate::{config::SitePaths, record::write_json, report};

pub const OUTPUT_FILE: &str = "citations_by_year.json";

/// Cached output younger than this is reused.
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Histograms counted as citations from refereed papers.
const REFEREED_KEYS: [&str; 2] = ["refereed to refereed", "nonrefereed to refereed"];
const NONREFEREED_KEYS: [&str; 2] = ["refereed to nonrefereed", "nonrefereed to nonrefereed"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationsByYear {
    pub years: Vec<String>,
    pub refereed: Vec<u64>,
    pub nonrefereed: Vec<u64>,
}

impl CitationsByYear {
    pub fn total_refereed(&self) -> u64 {
        self.refereed.iter().sum()
    }

    pub fn total_nonrefereed(&self) -> u64 {
        self.nonrefereed.iter().sum()
    }
}

/// Running per-year totals over any number of metrics responses.
#[derive(Debug, Default)]
pub struct CitationTally {
    by_year: BTreeMap<String, (u64, u64)>,
}

impl CitationTally {
    /// Add the `histograms.citations` of one `metrics/<bibcode>` response.
    pub fn add_metrics(&mut self, metrics: &Value) {
        let Some(hist) = metrics.pointer("/histograms/citations") else {
            return;
        };
        for (keys, refereed) in [(REFEREED_KEYS, true), (NONREFEREED_KEYS, false)] {
            for key in keys {
                let Some(years) = hist.get(key).and_then(Value::as_object) else {
                    continue;
                };
                for (year, count) in years {
                    let n = count
                        .as_u64()
                        .or_else(|| count.as_f64().map(|f| f.max(0.0) as u64))
                        .unwrap_or(0);
                    let slot = self.by_year.entry(year.clone()).or_default();
                    if refereed {
                        slot.0 += n;
                    } else {
                        slot.1 += n;
                    }
                }
            }
        }
    }

    /// Years where both totals are zero are dropped; the rest come out in year order.
    pub fn finish(self) -> CitationsByYear {
        let mut out = CitationsByYear::default();
        for (year, (r, n)) in self.by_year {
            if r == 0 && n == 0 {
                continue;
            }
            out.years.push(year);
            out.refereed.push(r);
            out.nonrefereed.push(n);
        }
        out
    }
}

/// Whether `path` was modified less than `max_age` before `now`.
pub fn cache_is_fresh(path: &Path, max_age: Duration, now: SystemTime) -> bool {
    let Ok(modified) = path.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    match now.duration_since(modified) {
        Ok(age) => age < max_age,
        // Modified in the future counts as fresh.
        Err(_) => true,
    }
}

/// `pubkit fetch citations`. `connect` resolves the client and ORCID only once the cache is
/// known to be stale, so a fresh cache needs no credentials.
pub fn run_fetch_citations(
    paths: &SitePaths,
    connect: impl FnOnce() -> anyhow::Result<(AdsClient, String)>,
    force: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let cached = paths.public_data_dir().join(OUTPUT_FILE);
    if !force && cache_is_fresh(&cached, CACHE_MAX_AGE, SystemTime::now()) {
        report::note(format!(
            "{} is less than 7 days old; skipping download (use --force to refresh)",
            paths.relative(&cached).display()
        ));
        return Ok(());
    }

    let (client, orcid) = connect()?;
    let bibcodes = client.bibcodes(&orcid)?;
    report::note(format!("Found {} papers", bibcodes.len()));

    let bar = ProgressBar::new(bibcodes.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    bar.set_message("Downloading metrics");

    let mut tally = CitationTally::default();
    let mut skipped = 0usize;
    for bibcode in &bibcodes {
        match client.metrics(bibcode) {
            Ok(metrics) => tally.add_metrics(&metrics),
            Err(err) if matches!(err.downcast_ref::<AdsError>(), Some(AdsError::Status { .. })) => {
                skipped += 1;
                bar.suspend(|| report::warning(format!("Skipping {bibcode}: {err}")));
            }
            Err(err) => {
                bar.abandon();
                return Err(err.context(format!("failed to get metrics for {bibcode}")));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let result = tally.finish();
    let (r, n) = (result.total_refereed(), result.total_nonrefereed());
    report::heading("Total citations");
    report::detail(format!("Refereed    : {r}"));
    report::detail(format!("Nonrefereed : {n}"));
    report::detail(format!("Total       : {}", r + n));
    if skipped > 0 {
        report::warning(format!("{skipped} bibcodes skipped"));
    }

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    for dir in paths.output_dirs() {
        let target = dir.join(OUTPUT_FILE);
        write_json(&target, &result)?;
        report::success(format!("Citation data saved to {}", paths.relative(&target).display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tallies_refereed_and_nonrefereed() {
        let mut tally = CitationTally::default();
        tally.add_metrics(&json!({"histograms": {"citations": {
            "refereed to refereed": {"2019": 2, "2020": 5},
            "nonrefereed to refereed": {"2020": 1},
            "refereed to nonrefereed": {"2019": 1},
            "nonrefereed to nonrefereed": {"2021": 0},
            "refereed to refereed normalized": {"2019": 0.5}
        }}}));
        tally.add_metrics(&json!({"histograms": {"citations": {
            "refereed to refereed": {"2018": 3}
        }}}));
        tally.add_metrics(&json!({"basic stats": {}}));

        let out = tally.finish();
        assert_eq!(out.years, ["2018", "2019", "2020"]);
        assert_eq!(out.refereed, [3, 2, 6]);
        assert_eq!(out.nonrefereed, [0, 1, 0]);
        assert_eq!(out.total_refereed(), 11);
        assert_eq!(out.total_nonrefereed(), 1);
    }

    #[test]
    fn serializes_years_as_strings() {
        let out = CitationsByYear {
            years: vec!["2020".into()],
            refereed: vec![4],
            nonrefereed: vec![1],
        };
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"years": ["2020"], "refereed": [4], "nonrefereed": [1]})
        );
    }

    #[test]
    fn cache_freshness_follows_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(OUTPUT_FILE);
        assert!(!cache_is_fresh(&path, CACHE_MAX_AGE, SystemTime::now()));

        std::fs::write(&path, "{}").unwrap();
        let now = SystemTime::now();
        assert!(cache_is_fresh(&path, CACHE_MAX_AGE, now));
        let later = now + CACHE_MAX_AGE + Duration::from_secs(60);
        assert!(!cache_is_fresh(&path, CACHE_MAX_AGE, later));
    }
}
