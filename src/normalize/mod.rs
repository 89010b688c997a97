//! Cleaning of publication records: author names, venue labels and title markup.

pub mod authors;
pub mod unicode;
pub mod venues;

use anyhow::bail;

pub use authors::{AuthorStandardizer, format_author_name};
pub use unicode::html_to_unicode;
pub use venues::VenueAliases;

use crate::{
    config::SitePaths,
    record::{Publication, load_publications, write_json},
    report,
};

/// What a normalization pass changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub authors_rewritten: usize,
    pub titles_rewritten: usize,
    pub venue_hits: Vec<(String, String, usize)>,
}

impl NormalizeSummary {
    pub fn is_unchanged(&self) -> bool {
        self.authors_rewritten == 0 && self.titles_rewritten == 0 && self.venue_hits.is_empty()
    }
}

pub fn normalize_publications(
    publications: &mut [Publication],
    authors: &AuthorStandardizer,
    venues: &VenueAliases,
) -> NormalizeSummary {
    let authors_rewritten = authors.apply(publications);
    let venue_hits = venues.apply(publications);
    let mut titles_rewritten = 0;
    for publication in publications.iter_mut() {
        let title = html_to_unicode(&publication.title);
        if title != publication.title {
            publication.title = title;
            titles_rewritten += 1;
        }
    }
    NormalizeSummary {
        authors_rewritten,
        titles_rewritten,
        venue_hits,
    }
}

/// `pubkit normalize`: rewrite `ads_publications.json` in every data tree that has one.
pub fn run_normalize(
    paths: &SitePaths,
    authors: &AuthorStandardizer,
    venues: &VenueAliases,
    dry_run: bool,
) -> anyhow::Result<()> {
    let source = paths.publications_file();
    let mut publications = load_publications(&source)?;
    report::note(format!(
        "Loaded {} publications from {}",
        publications.len(),
        paths.relative(&source).display()
    ));

    let summary = normalize_publications(&mut publications, authors, venues);
    for (original, canonical, n) in &summary.venue_hits {
        report::added(format!("{original} → {canonical} ({n})"));
    }
    report::note(format!("{} author names standardized", summary.authors_rewritten));
    report::note(format!("{} titles converted to Unicode", summary.titles_rewritten));

    if summary.is_unchanged() {
        report::warning("Nothing to normalize");
        return Ok(());
    }
    if dry_run {
        report::note("Dry run; no files written");
        return Ok(());
    }
    for dir in paths.output_dirs() {
        let target = dir.join("ads_publications.json");
        if target == source || target.exists() {
            write_json(&target, &publications)?;
            report::success(format!("Updated {}", paths.relative(&target).display()));
        }
    }
    Ok(())
}

/// How one surname spelling relates to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Canonical,
    /// The rule matches but the record still carries the raw spelling.
    Unstandardized,
    /// Same surname, not covered by the rule.
    Unrelated,
}

pub fn classify_variant(
    authors: &AuthorStandardizer,
    canonical: &str,
    variant: &str,
) -> VariantStatus {
    if variant == canonical {
        VariantStatus::Canonical
    } else if authors.standardize(variant) == canonical {
        VariantStatus::Unstandardized
    } else {
        VariantStatus::Unrelated
    }
}

/// `pubkit validate-authors`: fails while any name covered by a rule is left unstandardized.
pub fn run_validate_authors(paths: &SitePaths, authors: &AuthorStandardizer) -> anyhow::Result<()> {
    if authors.is_empty() {
        bail!("no author rules to validate against");
    }
    let publications = load_publications(&paths.publications_file())?;
    let mut remaining = 0usize;

    for rule in authors.rules() {
        report::heading(&rule.canonical);
        let variants = authors::surname_variants(rule, &publications);
        let (mut covered, mut done) = (0usize, 0usize);
        for (variant, n) in &variants {
            match classify_variant(authors, &rule.canonical, variant) {
                VariantStatus::Canonical => {
                    covered += n;
                    done += n;
                    report::success(format!("{variant} ({n})"));
                }
                VariantStatus::Unstandardized => {
                    covered += n;
                    remaining += 1;
                    report::failure(format!("{variant} ({n})"));
                }
                VariantStatus::Unrelated => report::warning(format!("{variant} ({n}) not covered")),
            }
        }
        if covered > 0 {
            let pct = done as f64 * 100.0 / covered as f64;
            report::note(format!("{pct:.1}% standardized ({done}/{covered})"));
        } else {
            report::note("no occurrences");
        }
    }

    if remaining > 0 {
        bail!("{remaining} author variants are not standardized; run `pubkit normalize`");
    }
    report::success("All author names are standardized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use authors::NameRule;

    fn standardizer() -> AuthorStandardizer {
        AuthorStandardizer::new(vec![NameRule {
            last_name: "Alterman".into(),
            first_initial: "B".into(),
            middle_initial: Some("L".into()),
            first_names: vec!["Benjamin".into()],
            canonical: "Alterman, B. L.".into(),
        }])
        .unwrap()
    }

    #[test]
    fn normalizes_all_three_fields() {
        let mut pubs = vec![Publication {
            title: "He<sup>2+</sup> in the wind".into(),
            authors: vec!["Benjamin L. Alterman".into()],
            journal: "Bulletin of the American Astronomical Society".into(),
            ..Default::default()
        }];
        let summary = normalize_publications(&mut pubs, &standardizer(), &VenueAliases::default());
        assert_eq!(pubs[0].title, "He²⁺ in the wind");
        assert_eq!(pubs[0].authors, ["Alterman, B. L."]);
        assert_eq!(pubs[0].journal, "Bulletin of AAS");
        assert_eq!(summary.authors_rewritten, 1);
        assert_eq!(summary.titles_rewritten, 1);
        assert_eq!(summary.venue_hits.len(), 1);

        let again = normalize_publications(&mut pubs, &standardizer(), &VenueAliases::default());
        assert!(again.is_unchanged());
    }

    #[test]
    fn variants_are_classified() {
        let s = standardizer();
        let c = "Alterman, B. L.";
        assert_eq!(classify_variant(&s, c, c), VariantStatus::Canonical);
        assert_eq!(classify_variant(&s, c, "Alterman, Benjamin"), VariantStatus::Unstandardized);
        assert_eq!(classify_variant(&s, c, "Alterman, J."), VariantStatus::Unrelated);
    }
}
