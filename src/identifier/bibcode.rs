use std::borrow::Cow;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use crate::identifier::Identifier;

static ADS_ABS: Lazy<Url> = Lazy::new(|| Url::parse("https://ui.adsabs.harvard.edu/").unwrap());

/// Nineteen characters: year, journal, volume, qualifier, page, initial.
static BIBCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}[A-Za-z&][A-Za-z0-9&.]{13}[A-Za-z.]$").unwrap());

static ADS_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:ui\.)?adsabs\.harvard\.edu/(?:#)?abs/([^/?#\s]+)").unwrap()
});

/// An ADS bibcode, either bare or lifted out of an ADS abstract link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bibcode<'a> {
    code: Cow<'a, str>,
}

impl<'a> Identifier<'a> for Bibcode<'a> {
    fn parse(identifier: &'a str) -> Option<Self> {
        let s = identifier.trim();
        if BIBCODE_RE.is_match(s) {
            return Some(Bibcode { code: s.into() });
        }
        let raw = ADS_LINK_RE.captures(s)?.get(1)?.as_str();
        // `&` shows up as %26 in copied links.
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;
        BIBCODE_RE
            .is_match(&decoded)
            .then(|| Bibcode { code: decoded })
    }

    fn to_url(&self) -> Url {
        let mut url = ADS_ABS.clone();
        url.set_path(&format!("abs/{}", self.code));
        url
    }
}

impl Bibcode<'_> {
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Like [`Identifier::parse`] but only accepts ADS abstract links, not bare codes.
    pub fn from_ads_link(link: &str) -> Option<Bibcode<'_>> {
        if ADS_LINK_RE.is_match(link.trim()) {
            Bibcode::parse(link)
        } else {
            None
        }
    }
}
