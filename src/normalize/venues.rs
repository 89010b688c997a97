use std::{collections::HashMap, path::Path};

use crate::record::{Publication, load_json};

/// Noisy venue strings seen in ADS data and the label the site shows for each.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Solar Heliospheric and INterplanetary Environment (SHINE 2015)", "SHINE"),
    ("Solar Heliospheric and INterplanetary Environment (SHINE 2016)", "SHINE"),
    ("Solar Heliospheric and INterplanetary Environment (SHINE 2017)", "SHINE"),
    ("Solar Heliospheric and INterplanetary Environment (SHINE 2018)", "SHINE"),
    ("Solar Heliospheric and INterplanetary Environment (SHINE 2019)", "SHINE"),
    ("SHINE 2022 Workshop", "SHINE"),
    ("Bulletin of the American Astronomical Society", "Bulletin of AAS"),
    ("43rd COSPAR Scientific Assembly. Held 28 January - 4 February", "COSPAR"),
    ("44th COSPAR Scientific Assembly. Held 16-24 July", "COSPAR"),
    ("Third Triennial Earth-Sun Summit (TESS)", "Triennial Earth-Sun Summit"),
    (
        "APS Division of Plasma Physics Meeting Abstracts",
        "APS Division of Plasma Physics",
    ),
];

#[derive(Debug, Clone)]
pub struct VenueAliases {
    map: HashMap<String, String>,
}

impl Default for VenueAliases {
    fn default() -> Self {
        VenueAliases {
            map: BUILTIN_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl VenueAliases {
    /// Built-in aliases, extended (and overridden) by the JSON object at `path` if it exists.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut aliases = VenueAliases::default();
        if path.exists() {
            let extra: HashMap<String, String> = load_json(path)?;
            tracing::info!(count = extra.len(), path = %path.display(), "loaded venue aliases");
            aliases.map.extend(extra);
        }
        Ok(aliases)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn canonical<'a>(&'a self, venue: &'a str) -> &'a str {
        self.map.get(venue).map(String::as_str).unwrap_or(venue)
    }

    /// Rewrite each `journal` in place. Returns `(original, canonical, count)` for every alias
    /// that fired, sorted by original venue.
    pub fn apply(&self, publications: &mut [Publication]) -> Vec<(String, String, usize)> {
        let mut hits: HashMap<String, usize> = HashMap::new();
        for publication in publications.iter_mut() {
            if let Some(canonical) = self.map.get(&publication.journal) {
                let original = std::mem::replace(&mut publication.journal, canonical.clone());
                *hits.entry(original).or_default() += 1;
            }
        }
        let mut stats: Vec<_> = hits
            .into_iter()
            .map(|(original, n)| {
                let canonical = self.map[&original].clone();
                (original, canonical, n)
            })
            .collect();
        stats.sort();
        stats
    }
}
