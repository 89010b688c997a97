use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

use crate::ads::AdsError;

/// Markers that identify the website repository root.
const ROOT_MARKERS: &[&str] = &["public", "package.json"];

/// Resolved locations of everything pubkit reads and writes.
#[derive(Debug, Clone)]
pub struct SitePaths {
    root: PathBuf,
}

impl SitePaths {
    /// Use `explicit` when given, otherwise walk up from `start` to the first directory that
    /// carries every root marker.
    pub fn discover(explicit: Option<&Path>, start: &Path) -> anyhow::Result<Self> {
        if let Some(root) = explicit {
            let root = root
                .canonicalize()
                .with_context(|| format!("site root {} does not exist", root.display()))?;
            return Ok(SitePaths { root });
        }

        let start = start
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", start.display()))?;
        for dir in start.ancestors() {
            if ROOT_MARKERS.iter().all(|m| dir.join(m).exists()) {
                tracing::debug!(root = %dir.display(), "discovered site root");
                return Ok(SitePaths {
                    root: dir.to_path_buf(),
                });
            }
        }
        bail!(
            "could not find the site root above {}: expected a directory containing {}",
            start.display(),
            ROOT_MARKERS.join(", ")
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `public/data`, scraped by search engines and served as-is.
    pub fn public_data_dir(&self) -> PathBuf {
        self.root.join("public").join("data")
    }

    /// `data`, read by the static build.
    pub fn build_data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Fetched datasets are mirrored into both data trees.
    pub fn output_dirs(&self) -> [PathBuf; 2] {
        [self.public_data_dir(), self.build_data_dir()]
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    pub fn bibtex_dir(&self) -> PathBuf {
        self.root.join("data").join("bibtex")
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.root.join("research-corpus")
    }

    pub fn topics_dir(&self) -> PathBuf {
        self.public_data_dir().join("research-topics")
    }

    pub fn review_dir(&self) -> PathBuf {
        self.root.join("review-docs")
    }

    pub fn publications_file(&self) -> PathBuf {
        self.public_data_dir().join("ads_publications.json")
    }

    pub fn registry_file(&self) -> PathBuf {
        self.public_data_dir().join("figure-registry.json")
    }

    /// Path relative to the root for display; paths outside the root are returned unchanged.
    pub fn relative<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, Path> {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.into(),
            Err(_) => path.into(),
        }
    }
}

/// Credentials for the ADS API.
#[derive(Clone)]
pub struct AdsCredentials {
    pub orcid: String,
    pub token: String,
}

impl std::fmt::Debug for AdsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsCredentials")
            .field("orcid", &self.orcid)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AdsCredentials {
    pub fn from_parts(orcid: Option<String>, token: Option<String>) -> Result<Self, AdsError> {
        let orcid = orcid.filter(|s| !s.trim().is_empty());
        let token = token.filter(|s| !s.trim().is_empty());
        match (orcid, token) {
            (Some(orcid), Some(token)) => Ok(AdsCredentials { orcid, token }),
            (orcid, token) => Err(AdsError::MissingCredentials {
                orcid: orcid.is_some(),
                token: token.is_some(),
            }),
        }
    }
}
