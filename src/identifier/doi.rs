use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use url::Url;

use crate::identifier::Identifier;

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

static DOI_ORG: Lazy<Url> = Lazy::new(|| Url::parse("https://doi.org/").unwrap());

/// Link prefix the site uses for DOI-backed publication URLs.
pub const DX_DOI_PREFIX: &str = "https://dx.doi.org/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doi<'a> {
    name: &'a str,
    prefix: &'a str,
    suffix: &'a str,
}

impl<'a> Identifier<'a> for Doi<'a> {
    fn parse(identifier: &'a str) -> Option<Self> {
        let mut s = identifier.trim();

        // Normalise common textual prefixes.
        if let Some(rest) = s
            .strip_prefix("doi:")
            .or_else(|| s.strip_prefix("DOI:"))
            .or_else(|| s.strip_prefix("urn:doi:"))
            .or_else(|| s.strip_prefix("URN:DOI:"))
        {
            s = rest.trim_start();
        }

        // Drop query string or fragment early if present.
        if let Some(idx) = s.find(['?', '#']) {
            s = &s[..idx];
        }

        // Trim trailing punctuation commonly found in prose.
        s = s.trim_end_matches(|c: char| {
            matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '}' | '\"' | '\'')
        });

        // Case-insensitive, based on Crossref guidance.
        static DOI_ANYWHERE_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?i)\b(10\.\d{4,9})/([-._;()/:A-Z0-9]+)\b").unwrap());

        let caps = DOI_ANYWHERE_RE.captures(s)?;

        Some(Doi {
            name: caps.get(0)?.as_str(),
            prefix: caps.get(1)?.as_str(),
            suffix: caps.get(2)?.as_str(),
        })
    }

    fn to_url(&self) -> Url {
        let mut url = DOI_ORG.clone();
        url.set_path(&self.encoded_path());
        url
    }
}

impl<'a> Doi<'a> {
    pub fn as_str(&self) -> &'a str {
        self.name
    }

    /// The `https://dx.doi.org/<doi>` form stored in publication records.
    pub fn dx_link(&self) -> String {
        format!("{DX_DOI_PREFIX}{}", self.name)
    }

    /// Crossref `works/<doi>` endpoint under `api_base`.
    pub fn crossref_works_url(&self, api_base: &Url) -> Url {
        let mut url = api_base.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/works/{}", self.encoded_path()));
        url
    }

    fn encoded_path(&self) -> String {
        let enc_suffix = utf8_percent_encode(self.suffix, PATH_SEGMENT_ENCODE_SET).to_string();
        format!("{}/{}", self.prefix, enc_suffix)
    }
}

/// DOI carried by a publication URL of the `https://dx.doi.org/…` form.
pub fn from_dx_link(url: &str) -> Option<Doi<'_>> {
    url.strip_prefix(DX_DOI_PREFIX).and_then(Doi::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::Strategy;

    // Allowed characters in DOI suffix per our regex: [-._;()/:A-Z0-9]+ (case-insensitive)
    fn doi_suffix_char() -> impl Strategy<Value = char> {
        let uppers = proptest::sample::select(('A'..='Z').collect::<Vec<_>>());
        let lowers = proptest::sample::select(('a'..='z').collect::<Vec<_>>());
        let digits = proptest::sample::select(('0'..='9').collect::<Vec<_>>());
        let punct = proptest::sample::select(vec!['-', '.', '_', ';', '(', ')', '/', ':']);
        proptest::prop_oneof![uppers, lowers, digits, punct]
    }

    // Ends with an alphanumeric so the trailing \b holds.
    fn doi_core() -> impl Strategy<Value = (String, String, String)> {
        let last = proptest::prop_oneof![
            proptest::sample::select(('A'..='Z').collect::<Vec<_>>()),
            proptest::sample::select(('0'..='9').collect::<Vec<_>>()),
        ];
        (
            proptest::collection::vec(
                proptest::sample::select(('0'..='9').collect::<Vec<_>>()),
                4..=9,
            )
            .prop_map(|v| v.into_iter().collect::<String>()),
            proptest::collection::vec(doi_suffix_char(), 0..32),
            last,
        )
            .prop_map(|(digits, mut body, last)| {
                body.push(last);
                let prefix = format!("10.{digits}");
                let suffix = body.into_iter().collect::<String>();
                (format!("{prefix}/{suffix}"), prefix, suffix)
            })
    }

    #[test]
    fn parse_finds_generated_doi() {
        proptest::proptest!(|(t in doi_core())| {
            let (full, prefix, suffix) = t;
            let d = Doi::parse(&full).expect("should parse");
            proptest::prop_assert_eq!(d.prefix, prefix);
            proptest::prop_assert_eq!(d.suffix, suffix);
        })
    }

    #[test]
    fn parse_rejects_non_doi() {
        proptest::proptest!(|(s in "[A-Za-z0-9 _-]{1,64}")| {
            proptest::prop_assume!(!s.contains("10."));
            proptest::prop_assert!(Doi::parse(&s).is_none());
        })
    }

    #[test]
    fn dx_link_round_trips() {
        let link = "https://dx.doi.org/10.3847/1538-4357/ab1234";
        let doi = from_dx_link(link).expect("doi");
        assert_eq!(doi.as_str(), "10.3847/1538-4357/ab1234");
        assert_eq!(doi.dx_link(), link);
        assert!(from_dx_link("https://ui.adsabs.harvard.edu/abs/2019ApJ...879L...6A").is_none());
    }

    #[test]
    fn crossref_url_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:9000/api").unwrap();
        let doi = Doi::parse("10.1029/2020JA028123").unwrap();
        assert_eq!(
            doi.crossref_works_url(&base).as_str(),
            "http://127.0.0.1:9000/api/works/10.1029/2020JA028123"
        );
        assert_eq!(doi.to_url().as_str(), "https://doi.org/10.1029/2020JA028123");
    }
}
