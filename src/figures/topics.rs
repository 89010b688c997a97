//! Research topic pages (`public/data/research-topics/*.json`) and the figures they reference.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{OrderedMap, load_json};

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    pub primary_figure: PrimaryFigure,
    #[serde(default)]
    pub related_figures: Vec<RelatedFigure>,
    #[serde(default)]
    pub related_topics: Vec<RelatedTopic>,
    #[serde(default)]
    pub paper: SourcePaper,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryFigure {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub topic_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedFigure {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub relevance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedTopic {
    pub slug: String,
    #[serde(default)]
    pub connection: String,
}

/// The paper a topic is drawn from. Values are shown as written, so a numeric year stays numeric.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePaper {
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub doi: Value,
    #[serde(default)]
    pub bibcode: Value,
    #[serde(default)]
    pub year: Value,
}

/// Which topics use a figure, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureUsage {
    pub primary_in: Vec<String>,
    pub related_in: Vec<String>,
}

/// Topic files in file-name order.
pub fn topic_files(dir: &Path) -> anyhow::Result<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

pub fn load_topics(dir: &Path) -> anyhow::Result<Vec<Topic>> {
    topic_files(dir)?.iter().map(|f| load_json(f)).collect()
}

/// Figure refs (`<paper>/<figure>`) in the order topics first use them.
pub fn figure_usage(topics: &[Topic]) -> OrderedMap<FigureUsage> {
    let mut usage: OrderedMap<FigureUsage> = OrderedMap::new();
    let mut record = |reference: &str, slug: &str, primary: bool| {
        let entry = usage.entry(reference.to_string()).or_default();
        let list = if primary {
            &mut entry.primary_in
        } else {
            &mut entry.related_in
        };
        list.push(slug.to_string());
    };
    for topic in topics {
        record(&topic.primary_figure.reference, &topic.slug, true);
        for related in &topic.related_figures {
            record(&related.reference, &topic.slug, false);
        }
    }
    usage
}

/// Strings print bare, `null` prints empty, anything else prints as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(json: &str) -> Topic {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn usage_collects_primary_and_related() {
        let topics = [
            topic(
                r#"{"slug":"helium","primary_figure":{"ref":"879_L6/fig_1"},
                    "related_figures":[{"ref":"982_L40/fig_2"},{"ref":"879_L6/fig_3"}]}"#,
            ),
            topic(
                r#"{"slug":"beams","primary_figure":{"ref":"982_L40/fig_2"},
                    "related_figures":[{"ref":"879_L6/fig_1","relevance":"context"}]}"#,
            ),
        ];
        let usage = figure_usage(&topics);
        assert_eq!(
            usage.keys().collect::<Vec<_>>(),
            ["879_L6/fig_1", "982_L40/fig_2", "879_L6/fig_3"]
        );
        let fig1 = usage.get("879_L6/fig_1").unwrap();
        assert_eq!(fig1.primary_in, ["helium"]);
        assert_eq!(fig1.related_in, ["beams"]);
        assert_eq!(usage.get("982_L40/fig_2").unwrap().primary_in, ["beams"]);
    }

    #[test]
    fn source_paper_year_may_be_numeric() {
        let t = topic(
            r#"{"slug":"s","primary_figure":{"ref":"p/fig_1"},
                "paper":{"title":"T","doi":"10.1/x","bibcode":null,"year":2019}}"#,
        );
        assert_eq!(display_value(&t.paper.year), "2019");
        assert_eq!(display_value(&t.paper.title), "T");
        assert_eq!(display_value(&t.paper.bibcode), "");
    }

    #[test]
    fn topic_files_are_sorted_json_only() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = topic_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
        assert!(topic_files(&dir.path().join("none")).unwrap().is_empty());
    }
}
