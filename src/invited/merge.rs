//! Fold `invited_conferences.json` into `ads_publications.json` by bibcode.

use std::borrow::Cow;

use crate::{
    config::SitePaths,
    identifier::bibcode::Bibcode,
    record::{Publication, load_publications, write_json},
    report,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: usize,
    pub added: usize,
    pub missing_bibcode: usize,
    pub warnings: Vec<String>,
}

/// Bibcode of a manual record: the `bibcode` field, else an ADS link in `url`, else one in
/// `invited_url`.
pub fn extract_bibcode(p: &Publication) -> Option<Cow<'_, str>> {
    if let Some(code) = p.bibcode.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        return Some(Cow::Borrowed(code));
    }
    [Some(p.url.as_str()), p.invited_url.as_deref()]
        .into_iter()
        .flatten()
        .find_map(Bibcode::from_ads_link)
        .map(|b| Cow::Owned(b.as_str().to_string()))
}

/// Copy the invited-talk details onto an ADS record and mark it invited.
fn enrich(target: &mut Publication, invited: &Publication) {
    target.invited = true;
    let fields = [
        (&mut target.location, &invited.location),
        (&mut target.day, &invited.day),
        (&mut target.booktitle, &invited.booktitle),
        (&mut target.invited_url, &invited.invited_url),
        (&mut target.keywords, &invited.keywords),
    ];
    for (dst, src) in fields {
        if let Some(v) = src {
            *dst = Some(v.clone());
        }
    }
}

pub fn merge_invited(publications: &mut Vec<Publication>, invited: &[Publication]) -> MergeStats {
    let mut stats = MergeStats::default();
    for talk in invited {
        let Some(code) = extract_bibcode(talk) else {
            let warning = format!("No bibcode for: {} ({})", talk.title, talk.year);
            report::warning(&warning);
            report::detail("adding as new entry (potential duplicate)");
            stats.warnings.push(warning);
            stats.missing_bibcode += 1;
            stats.added += 1;
            publications.push(talk.clone());
            continue;
        };

        match publications
            .iter_mut()
            .find(|p| p.bibcode.as_deref() == Some(code.as_ref()))
        {
            Some(found) => {
                enrich(found, talk);
                stats.matched += 1;
                report::success(format!("Matched: {}", talk.title));
                report::detail(format!("bibcode {code}"));
            }
            None => {
                stats.added += 1;
                report::added(format!("New entry: {}", talk.title));
                report::detail(format!("bibcode {code} not in ADS data"));
                publications.push(talk.clone());
            }
        }
    }
    stats
}

/// `pubkit merge-invited`.
pub fn run_merge_invited(paths: &SitePaths, dry_run: bool) -> anyhow::Result<()> {
    report::heading("Invited conferences + ADS publications");
    let ads_file = paths.publications_file();
    let invited_file = paths.public_data_dir().join("invited_conferences.json");

    let mut publications = load_publications(&ads_file)?;
    let before = publications.len();
    let invited = load_publications(&invited_file)?;
    report::note(format!(
        "Loaded {before} ADS publications and {} invited conferences",
        invited.len()
    ));

    let stats = merge_invited(&mut publications, &invited);
    let invited_count = publications.iter().filter(|p| p.invited).count();

    report::heading("Merge complete");
    report::detail(format!("Publications before merge : {before}"));
    report::detail(format!("Publications after merge  : {}", publications.len()));
    report::detail(format!("Matched via bibcode       : {}", stats.matched));
    report::detail(format!("Added as new entries      : {}", stats.added));
    report::detail(format!("Missing bibcode           : {}", stats.missing_bibcode));
    report::detail(format!("invited = true            : {invited_count}"));
    report::detail(format!(
        "invited = false           : {}",
        publications.len() - invited_count
    ));
    if !stats.warnings.is_empty() {
        report::warning(format!(
            "{} entries had no bibcode and may duplicate ADS records",
            stats.warnings.len()
        ));
    }

    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    write_json(&ads_file, &publications)?;
    report::success(format!(
        "Saved {} publications to {}",
        publications.len(),
        paths.relative(&ads_file).display()
    ));
    Ok(())
}
