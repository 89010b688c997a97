//! Hand-curated invited talks: BibTeX sources, their JSON form, and the merge into the ADS list.

pub mod convert;
pub mod merge;
pub mod talk;

use std::{fmt, str::FromStr};

/// The three BibTeX directories under `data/bibtex/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Conferences,
    Presentations,
    Public,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Conferences,
        Category::Presentations,
        Category::Public,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Conferences => "conferences",
            Category::Presentations => "presentations",
            Category::Public => "public",
        }
    }

    /// `invited_<category>.json` in the public data tree.
    pub fn output_file(self) -> String {
        format!("invited_{}.json", self.dir_name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the directory name or its menu number (`1`, `2`, `3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "conferences" => Ok(Category::Conferences),
            "2" | "presentations" => Ok(Category::Presentations),
            "3" | "public" => Ok(Category::Public),
            other => Err(format!(
                "unknown category {other:?}: expected conferences (1), presentations (2) or public (3)"
            )),
        }
    }
}
