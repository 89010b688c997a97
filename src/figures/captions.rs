//! Full figure captions for the research page: the paper's caption, a citation of the paper and
//! the licence Crossref reports for its DOI.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ureq::Agent;
use url::Url;

use crate::{
    config::SitePaths,
    identifier::doi::{Doi, from_dx_link},
    record::{OrderedMap, Publication, load_json, load_publications, write_json},
    report,
};

pub const DEFAULT_CROSSREF_URL: &str = "https://api.crossref.org/";

pub const OUTPUT_FILE: &str = "research-figures-with-captions.json";

const KNOWN_LICENSES: &[(&str, &str)] = &[
    ("http://creativecommons.org/licenses/by/4.0/", "CC-BY-4.0"),
    ("https://creativecommons.org/licenses/by/4.0", "CC-BY-4.0"),
    ("https://creativecommons.org/licenses/by-nc/4.0/", "CC-BY-NC-4.0"),
    ("https://creativecommons.org/licenses/by-nc-nd/4.0/", "CC-BY-NC-ND-4.0"),
    ("http://creativecommons.org/licenses/by/3.0/", "CC-BY-3.0"),
    (
        "https://www.springernature.com/gp/open-research/shared-standards#license",
        "SN-SharedIt-3.0",
    ),
];

pub const NO_LICENSE: &str = "N/A";
pub const UNKNOWN_LICENSE: &str = "Unknown";

/// Short name of a licence URL.
pub fn license_short_name(url: &str) -> &'static str {
    KNOWN_LICENSES
        .iter()
        .find(|(known, _)| *known == url)
        .map(|(_, short)| *short)
        .unwrap_or(UNKNOWN_LICENSE)
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    message: WorksMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    license: Vec<WorksLicense>,
}

#[derive(Debug, Deserialize)]
struct WorksLicense {
    #[serde(rename = "URL", default)]
    url: String,
}

pub struct CrossrefClient {
    agent: Agent,
    base: Url,
}

impl CrossrefClient {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid Crossref API URL {base}"))?;
        let cfg = Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(10)))
            .timeout_global(Some(Duration::from_secs(30)))
            .http_status_as_error(false)
            .build();
        Ok(CrossrefClient {
            agent: Agent::new_with_config(cfg),
            base,
        })
    }

    /// Short licence name for `doi`: [`NO_LICENSE`] when Crossref has no record or no licence.
    pub fn license(&self, doi: &Doi<'_>) -> anyhow::Result<String> {
        let url = doi.crossref_works_url(&self.base);
        tracing::debug!(%url, "GET");
        let res = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("failed request for URL {url}"))?;
        if res.status().as_u16() != 200 {
            tracing::info!(status = res.status().as_u16(), doi = doi.as_str(), "no Crossref record");
            return Ok(NO_LICENSE.to_string());
        }
        let body = res
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed to read response from {url}"))?;
        let works: WorksResponse =
            serde_json::from_str(&body).with_context(|| format!("unexpected JSON from {url}"))?;
        Ok(match works.message.license.first() {
            Some(lic) => license_short_name(&lic.url).to_string(),
            None => NO_LICENSE.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ResearchProject {
    pub slug: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionInfo {
    #[serde(rename = "Caption", default)]
    pub caption: String,
    #[serde(default)]
    pub bibcode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptionedFigure {
    pub slug: String,
    pub title: String,
    pub figure: OrderedMap<Value>,
}

/// `Last`, `Last & Other` or `Last et al.` from "Last, F." author strings.
pub fn citation_authors(authors: &[String]) -> String {
    let surname = |a: &String| a.split(',').next().unwrap_or_default().to_string();
    match authors {
        [] => String::new(),
        [one] => surname(one),
        [a, b] => format!("{} & {}", surname(a), surname(b)),
        [first, ..] => format!("{} et al.", surname(first)),
    }
}

/// The figure caption followed by a citation of `publication`, linked when it has a URL.
pub fn full_caption(caption: &str, publication: Option<&Publication>) -> String {
    let (authors, year, journal, url) = match publication {
        Some(p) => (
            citation_authors(&p.authors),
            p.year.split('-').next().unwrap_or_default(),
            p.journal.as_str(),
            p.url.as_str(),
        ),
        None => (String::new(), "", "", ""),
    };
    let citation = format!("From {authors} ({year}), {journal}");
    let citation = if url.is_empty() {
        citation
    } else {
        format!(
            r#"<a href="{url}" target="_blank" rel="noopener noreferrer" class="text-primary hover:underline">{citation}</a>"#
        )
    };
    format!("{caption} {citation}.").trim().to_string()
}

/// File name part of a figure `src` such as `/paper-figures/helium.svg`.
fn src_file_name(figure: &OrderedMap<Value>) -> &str {
    let src = figure.get("src").and_then(Value::as_str).unwrap_or_default();
    src.rsplit('/').next().unwrap_or(src)
}

/// Join projects, figures, captions and publications. Projects without a figure are left out;
/// figures without caption info are passed through unchanged.
pub fn caption_figures(
    projects: &[ResearchProject],
    figures: &OrderedMap<OrderedMap<Value>>,
    captions: &HashMap<String, CaptionInfo>,
    publications: &[Publication],
    licenses: &BTreeMap<String, String>,
) -> Vec<CaptionedFigure> {
    let by_bibcode: HashMap<&str, &Publication> = publications
        .iter()
        .filter_map(|p| p.bibcode.as_deref().map(|b| (b, p)))
        .collect();

    let mut out = Vec::new();
    for project in projects {
        let Some(figure) = figures.get(&project.slug) else {
            tracing::debug!(slug = %project.slug, "project has no figure");
            continue;
        };
        let mut figure = figure.clone();
        if let Some(info) = captions.get(src_file_name(&figure)) {
            let publication = info
                .bibcode
                .as_deref()
                .and_then(|b| by_bibcode.get(b).copied());
            figure.insert(
                "caption".to_string(),
                Value::String(full_caption(&info.caption, publication)),
            );
            let license = publication
                .and_then(|p| from_dx_link(&p.url))
                .and_then(|doi| licenses.get(doi.as_str()));
            if let Some(license) = license {
                figure.insert("license".to_string(), Value::String(license.clone()));
            }
        }
        out.push(CaptionedFigure {
            slug: project.slug.clone(),
            title: project.title.clone(),
            figure,
        });
    }
    out
}

/// DOIs of the publications that captions cite, keyed by DOI name.
pub fn required_dois<'a>(
    captions: &HashMap<String, CaptionInfo>,
    publications: &'a [Publication],
) -> BTreeMap<&'a str, Doi<'a>> {
    let bibcodes: BTreeSet<&str> = captions
        .values()
        .filter_map(|c| c.bibcode.as_deref())
        .collect();
    publications
        .iter()
        .filter(|p| p.bibcode.as_deref().is_some_and(|b| bibcodes.contains(b)))
        .filter_map(|p| from_dx_link(&p.url))
        .map(|doi| (doi.as_str(), doi))
        .collect()
}

/// `pubkit figures captions`.
pub fn run_figure_captions(
    paths: &SitePaths,
    crossref: &CrossrefClient,
    dry_run: bool,
) -> anyhow::Result<()> {
    let data = paths.public_data_dir();
    let projects: Vec<ResearchProject> = load_json(&data.join("research-projects.json"))?;
    let figures: OrderedMap<OrderedMap<Value>> = load_json(&data.join("research-figures.json"))?;
    let captions: HashMap<String, CaptionInfo> =
        load_json(&paths.public_dir().join("paper-figures").join("captions-bibcodes.json"))?;
    let publications = load_publications(&paths.publications_file())?;

    let dois = required_dois(&captions, &publications);
    report::note(format!("Fetching licenses for {} DOIs", dois.len()));
    let mut licenses = BTreeMap::new();
    for (name, doi) in &dois {
        let license = crossref
            .license(doi)
            .with_context(|| format!("failed to get the license for {name}"))?;
        report::detail(format!("{name}: {license}"));
        licenses.insert(name.to_string(), license);
    }

    let out = caption_figures(&projects, &figures, &captions, &publications, &licenses);
    let target = data.join(OUTPUT_FILE);
    if dry_run {
        report::note(format!(
            "Dry run; would write {} figures to {}",
            out.len(),
            paths.relative(&target).display()
        ));
        return Ok(());
    }
    write_json(&target, &out)?;
    report::success(format!(
        "Wrote {} figures to {}",
        out.len(),
        paths.relative(&target).display()
    ));
    Ok(())
}
