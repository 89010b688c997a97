use url::Url;

pub mod bibcode;
pub mod doi;

/// An identifier that can be recognised inside free text or a URL.
pub trait Identifier<'a>: Sized + 'a {
    fn parse(identifier: &'a str) -> Option<Self>;
    /// Canonical landing page for the identifier.
    fn to_url(&self) -> Url;
}
