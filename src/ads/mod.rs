//! NASA ADS API access: search by ORCID, per-bibcode metrics and bulk metrics.

pub mod citations;
pub mod fetch;

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use ureq::{Agent, Body, http::Response};
use url::Url;

use crate::{
    identifier::{
        Identifier,
        bibcode::Bibcode,
        doi::{DX_DOI_PREFIX, Doi},
    },
    normalize::{AuthorStandardizer, VenueAliases, format_author_name, html_to_unicode},
    record::Publication,
};

pub const DEFAULT_API_URL: &str = "https://api.adsabs.harvard.edu/v1/";

/// The most documents ADS returns for one query.
const MAX_ROWS: &str = "2000";

pub const PUBLICATION_FIELDS: &[&str] = &[
    "bibcode",
    "title",
    "author",
    "pubdate",
    "pub",
    "doctype",
    "citation_count",
    "doi",
];

#[derive(Debug, Error)]
pub enum AdsError {
    #[error("ADS rate limit exceeded (HTTP 429){}", rate_limit_hint(.reset, .retry_after))]
    RateLimited {
        /// Unix time at which the quota resets.
        reset: Option<i64>,
        /// Seconds to wait.
        retry_after: Option<i64>,
    },
    #[error("ADS returned HTTP {code} for {url}")]
    Status { code: u16, url: String },
    #[error(
        "missing ADS credentials: ADS_ORCID is {}, ADS_DEV_KEY is {}",
        presence(.orcid),
        presence(.token)
    )]
    MissingCredentials { orcid: bool, token: bool },
}

fn presence(set: &bool) -> &'static str {
    if *set { "set" } else { "not set" }
}

fn rate_limit_hint(reset: &Option<i64>, retry_after: &Option<i64>) -> String {
    let mut hint = String::new();
    let reset_at = reset.and_then(|r| DateTime::from_timestamp(r, 0));
    if let Some(at) = reset_at {
        hint.push_str(&format!(
            "; quota resets at {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z")
        ));
    }
    if let Some(secs) = *retry_after {
        hint.push_str(&format!("; retry after {}", format_wait(secs)));
        if let Some(at) = reset_at {
            let exceeded = at - TimeDelta::seconds(secs);
            hint.push_str(&format!(
                "; limit hit at {}",
                exceeded.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z")
            ));
        }
    }
    hint
}

fn format_wait(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    format!("{h}:{m:02}:{s:02}")
}

/// One document of an ADS search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdsDocument {
    pub bibcode: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub author: Vec<String>,
    #[serde(default)]
    pub pubdate: Option<String>,
    #[serde(default, rename = "pub")]
    pub venue: Option<String>,
    #[serde(default)]
    pub doctype: Option<String>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub doi: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<AdsDocument>,
}

impl AdsDocument {
    /// The site record for this document, with titles, authors and venue cleaned up.
    pub fn to_publication(
        &self,
        authors: &AuthorStandardizer,
        venues: &VenueAliases,
    ) -> Publication {
        let title = self
            .title
            .first()
            .map(|t| html_to_unicode(t))
            .unwrap_or_else(|| "(No title)".to_string());
        let pubdate = self.pubdate.clone().unwrap_or_default();
        let url = match self.doi.first() {
            Some(doi) => Doi::parse(doi)
                .map(|d| d.dx_link())
                .unwrap_or_else(|| format!("{DX_DOI_PREFIX}{doi}")),
            None => match Bibcode::parse(&self.bibcode) {
                Some(code) => code.to_url().to_string(),
                None => format!("https://ui.adsabs.harvard.edu/abs/{}", self.bibcode),
            },
        };

        Publication {
            bibcode: Some(self.bibcode.clone()),
            title,
            authors: self
                .author
                .iter()
                .map(|a| authors.standardize(&format_author_name(a)).to_string())
                .collect(),
            month: month_name(&pubdate).unwrap_or_default().to_string(),
            year: pubdate,
            journal: venues
                .canonical(self.venue.as_deref().unwrap_or_default())
                .to_string(),
            publication_type: self.doctype.clone().unwrap_or_default(),
            citations: self.citation_count.unwrap_or(0),
            url,
            ..Default::default()
        }
    }
}

/// Full month name of an ADS `YYYY-MM[-DD]` date; `None` when the month is unknown (`00`).
pub fn month_name(pubdate: &str) -> Option<&'static str> {
    let month: u8 = pubdate.get(5..7)?.parse().ok()?;
    chrono::Month::try_from(month).ok().map(|m| m.name())
}

/// Blocking ADS client.
#[derive(Clone)]
pub struct AdsClient {
    agent: Agent,
    base: Url,
    token: String,
}

impl AdsClient {
    pub fn new(base: &str, token: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("invalid ADS API URL {base}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let cfg = Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(10)))
            .timeout_global(Some(Duration::from_secs(60)))
            .http_status_as_error(false)
            .build();
        Ok(AdsClient {
            agent: Agent::new_with_config(cfg),
            base,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid ADS endpoint {path}"))
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn read_json<T: DeserializeOwned>(res: Response<Body>, url: &Url) -> anyhow::Result<T> {
        check_status(&res, url)?;
        let body = res
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed to read response from {url}"))?;
        serde_json::from_str(&body).with_context(|| format!("unexpected JSON from {url}"))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        tracing::debug!(%url, "GET");
        let res = self
            .agent
            .get(url.as_str())
            .header("Authorization", &self.auth())
            .call()
            .with_context(|| format!("failed request for URL {url}"))?;
        Self::read_json(res, &url)
    }

    /// Documents whose authors include `orcid`, with the requested fields.
    pub fn search_by_orcid(
        &self,
        orcid: &str,
        fields: &[&str],
    ) -> anyhow::Result<Vec<AdsDocument>> {
        let mut url = self.endpoint("search/query")?;
        url.query_pairs_mut()
            .append_pair("q", &format!("orcid:{orcid}"))
            .append_pair("fl", &fields.join(","))
            .append_pair("rows", MAX_ROWS);
        let res: SearchResponse = self.get_json(url)?;
        tracing::info!(count = res.response.docs.len(), "ADS search finished");
        Ok(res.response.docs)
    }

    pub fn bibcodes(&self, orcid: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .search_by_orcid(orcid, &["bibcode"])?
            .into_iter()
            .map(|d| d.bibcode)
            .collect())
    }

    /// `GET metrics/<bibcode>`.
    pub fn metrics(&self, bibcode: &str) -> anyhow::Result<serde_json::Value> {
        let url = self.endpoint(&format!("metrics/{bibcode}"))?;
        self.get_json(url)
    }

    /// `POST metrics` for the whole list at once.
    pub fn bulk_metrics(&self, bibcodes: &[String]) -> anyhow::Result<serde_json::Value> {
        let url = self.endpoint("metrics")?;
        let payload = serde_json::to_string(&serde_json::json!({ "bibcodes": bibcodes }))?;
        tracing::debug!(%url, count = bibcodes.len(), "POST");
        let res = self
            .agent
            .post(url.as_str())
            .header("Authorization", &self.auth())
            .header("Content-Type", "application/json")
            .send(payload)
            .with_context(|| format!("failed request for URL {url}"))?;
        Self::read_json(res, &url)
    }
}

fn check_status(res: &Response<Body>, url: &Url) -> Result<(), AdsError> {
    let code = res.status().as_u16();
    match code {
        200 => Ok(()),
        429 => {
            let header = |name: &str| {
                res.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<i64>().ok())
            };
            Err(AdsError::RateLimited {
                reset: header("X-RateLimit-Reset"),
                retry_after: header("Retry-After"),
            })
        }
        code => Err(AdsError::Status {
            code,
            url: url.to_string(),
        }),
    }
}
