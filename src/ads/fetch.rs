use anyhow::bail;

use super::{AdsClient, PUBLICATION_FIELDS};
use crate::{
    config::SitePaths,
    normalize::{AuthorStandardizer, VenueAliases},
    record::{Publication, write_json},
    report,
};

pub const PUBLICATIONS_FILE: &str = "ads_publications.json";
pub const METRICS_FILE: &str = "ads_metrics.json";

/// `pubkit fetch publications`: the ORCID's ADS records, cleaned, into both data trees.
pub fn run_fetch_publications(
    paths: &SitePaths,
    client: &AdsClient,
    orcid: &str,
    authors: &AuthorStandardizer,
    venues: &VenueAliases,
    dry_run: bool,
) -> anyhow::Result<()> {
    let docs = client.search_by_orcid(orcid, PUBLICATION_FIELDS)?;
    let publications: Vec<Publication> = docs
        .iter()
        .map(|doc| doc.to_publication(authors, venues))
        .collect();
    report::note(format!("Fetched {} publications", publications.len()));

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    for dir in paths.output_dirs() {
        let target = dir.join(PUBLICATIONS_FILE);
        write_json(&target, &publications)?;
        report::success(format!(
            "Saved {} publications to {}",
            publications.len(),
            paths.relative(&target).display()
        ));
    }
    Ok(())
}

/// `pubkit fetch metrics`: the bulk metrics document for every bibcode of the ORCID.
pub fn run_fetch_metrics(
    paths: &SitePaths,
    client: &AdsClient,
    orcid: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let bibcodes = client.bibcodes(orcid)?;
    if bibcodes.is_empty() {
        bail!("no bibcodes found for ORCID {orcid}");
    }
    report::note(format!("Found {} bibcodes; requesting metrics", bibcodes.len()));
    let metrics = client.bulk_metrics(&bibcodes)?;

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    for dir in paths.output_dirs() {
        let target = dir.join(METRICS_FILE);
        write_json(&target, &metrics)?;
        report::success(format!("Metrics written to {}", paths.relative(&target).display()));
    }
    Ok(())
}
