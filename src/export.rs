//! Markdown review documents built from the figure registry and the topic pages.

use std::{fs, path::Path};

use anyhow::Context;

use crate::{
    config::SitePaths,
    figures::{
        Registry, Topic,
        corpus::FigureSummary,
        load_registry, load_topics,
        topics::display_value,
    },
    report,
};

/// Lines joined with `\n`.
#[derive(Debug, Default)]
struct Markdown {
    lines: Vec<String>,
}

impl Markdown {
    fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    /// `text` followed by a blank line.
    fn para(&mut self, text: impl Into<String>) -> &mut Self {
        self.line(text).line("")
    }

    fn rule(&mut self) -> &mut Self {
        self.para("---")
    }

    fn section(&mut self, heading: &str, body: &str) -> &mut Self {
        self.para(heading).para(body)
    }

    fn summary(&mut self, summary: &FigureSummary) -> &mut Self {
        self.section("### What We See", &summary.what_we_see)
            .section("### The Finding", &summary.the_finding)
            .section("### Why It Matters", &summary.why_it_matters)
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Order-preserving union of two keyword lists.
fn merge_keywords<'a>(first: &'a [String], second: &'a [String]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for kw in first.iter().chain(second) {
        if !out.contains(&kw.as_str()) {
            out.push(kw);
        }
    }
    out
}

/// The whole registry as one document. Images point at `<root>/public/<src>`.
pub fn registry_markdown(registry: &Registry, root: &Path) -> String {
    let mut md = Markdown::default();
    md.para("# Figure Registry")
        .para(format!("**Total figures:** {}", registry.len()))
        .rule();

    for (key, fig) in registry.iter() {
        let image = root.join("public").join(fig.src.trim_start_matches('/'));
        md.para(format!("## {key}"))
            .para(format!("**Short Title:** {}", fig.short_title))
            .para(format!("![{}]({})", fig.alt, image.display()))
            .para(format!("**File:** `{}`", fig.src));

        if !fig.used_as_primary_in.is_empty() {
            md.line(format!("**Primary in:** {}", fig.used_as_primary_in.join(", ")));
        }
        if !fig.used_as_related_in.is_empty() {
            md.line(format!("**Related in:** {}", fig.used_as_related_in.join(", ")));
        }
        md.line("");

        md.section("### Alt Text", &fig.alt);
        if let Some(summary) = &fig.summary {
            md.summary(summary);
        }
        if let Some(short) = fig.summary_short.as_deref().filter(|s| !s.is_empty()) {
            md.section("### Summary (Short)", short);
        }
        if !fig.keywords.is_empty() {
            md.section("### Keywords", &fig.keywords.join(", "));
        }
        md.rule();
    }
    md.finish()
}

/// One topic with its figures resolved against the registry.
pub fn topic_markdown(topic: &Topic, registry: &Registry) -> String {
    let mut md = Markdown::default();
    md.para(format!("# {}", topic.title))
        .para(format!("**Slug:** `{}`", topic.slug))
        .section("## Subtitle", &topic.subtitle)
        .section("## Description", &topic.description);

    let primary_ref = &topic.primary_figure.reference;
    let primary = registry.get(primary_ref);
    md.rule()
        .para("## Primary Figure")
        .para(format!("**Figure:** `{primary_ref}`"));
    if let Some(fig) = primary {
        if !fig.short_title.is_empty() {
            md.section("### Short Title", &fig.short_title);
        }
        if !fig.alt.is_empty() {
            md.section("### Alt Text", &fig.alt);
        }
        if let Some(summary) = &fig.summary {
            md.summary(summary);
        }
    }
    let registry_keywords = primary.map(|f| f.keywords.as_slice()).unwrap_or_default();
    let keywords = merge_keywords(registry_keywords, &topic.primary_figure.topic_keywords);
    if !keywords.is_empty() {
        md.section("### Keywords", &keywords.join(", "));
    }

    if !topic.related_figures.is_empty() {
        md.rule().para("## Related Figures");
        for (i, related) in topic.related_figures.iter().enumerate() {
            md.para(format!("### Related Figure {}: `{}`", i + 1, related.reference));
            let fig = registry.get(&related.reference);
            if let Some(fig) = fig.filter(|f| !f.short_title.is_empty()) {
                md.para(format!("**Short Title:** {}", fig.short_title));
            }
            if let Some(fig) = fig.filter(|f| !f.alt.is_empty()) {
                md.para(format!("**Alt Text:** {}", fig.alt));
            }
            md.para(format!(
                "**Relevance:** {}",
                related.relevance.as_deref().unwrap_or("N/A")
            ));
            if let Some(short) = fig
                .and_then(|f| f.summary_short.as_deref())
                .filter(|s| !s.is_empty())
            {
                md.para(format!("**Summary:** {short}"));
            }
        }
    }

    if !topic.related_topics.is_empty() {
        md.rule().para("## Related Topics");
        for rt in &topic.related_topics {
            md.line(format!("- **{}**: {}", rt.slug, rt.connection));
        }
        md.line("");
    }

    let paper = &topic.paper;
    md.rule()
        .para("## Source Paper (reference only)")
        .line(format!("- **Title:** {}", display_value(&paper.title)))
        .line(format!("- **DOI:** {}", display_value(&paper.doi)))
        .line(format!("- **Bibcode:** {}", display_value(&paper.bibcode)))
        .line(format!("- **Year:** {}", display_value(&paper.year)))
        .line("");
    md.finish()
}

fn write_doc(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

/// `pubkit export registry`.
pub fn run_export_registry(paths: &SitePaths) -> anyhow::Result<()> {
    let registry = load_registry(&paths.registry_file())?;
    let target = paths.review_dir().join("figure-registry.md");
    write_doc(&target, &registry_markdown(&registry, paths.root()))?;
    report::success(format!(
        "Exported {} figures to {}",
        registry.len(),
        paths.relative(&target).display()
    ));
    Ok(())
}

/// `pubkit export topics`.
pub fn run_export_topics(paths: &SitePaths) -> anyhow::Result<()> {
    let registry = load_registry(&paths.registry_file())?;
    report::note(format!("Loaded figure registry: {} figures", registry.len()));
    let topics = load_topics(&paths.topics_dir())?;
    let out_dir = paths.review_dir();
    for topic in &topics {
        let target = out_dir.join(format!("{}.md", topic.slug));
        write_doc(&target, &topic_markdown(topic, &registry))?;
        report::detail(format!("{} -> {}", topic.slug, paths.relative(&target).display()));
    }
    report::success(format!(
        "Exported {} topics to {}",
        topics.len(),
        paths.relative(&out_dir).display()
    ));
    Ok(())
}
