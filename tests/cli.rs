use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn site() -> TempDir {
    let dir = TempDir::new().expect("tmp dir");
    fs::create_dir_all(dir.path().join("public/data")).unwrap();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();
    dir
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn read_json(root: &Path, rel: &str) -> Value {
    serde_json::from_str(&fs::read_to_string(root.join(rel)).unwrap()).unwrap()
}

fn pubkit(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pubkit").expect("binary");
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("PUBKIT_ROOT")
        .arg("--root")
        .arg(root);
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8(strip_ansi_escapes::strip(&output.stderr)).unwrap()
}

#[test]
fn convert_invited_keeps_existing_and_skips_duplicates() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(
        root,
        "data/bibtex/conferences/2023.bib",
        "@inproceedings{SHINE2023,\n author = {Alterman, B.~L.},\n title = {{Helium in the Solar Wind}},\n year = {2023},\n month = {March},\n day = {5},\n booktitle = {SHINE Workshop},\n location = {Boulder, CO},\n}\n\n\
         @inproceedings{AGU2023,\n author = {Alterman, B.~L. and Kasper, J.~C.},\n title = {{Proton Beams}},\n year = {2023},\n month = {12},\n booktitle = {AGU Fall Meeting},\n}\n",
    );
    write(
        root,
        "public/data/invited_conferences.json",
        r#"[{"title":"Helium in the Solar Wind","authors":["Alterman, B. L."],"year":"2023-03-00",
            "month":"March","journal":"SHINE","publication_type":"inproceedings","citations":0,
            "url":"","invited":true,"note":"hand edited"}]"#,
    );

    let output = pubkit(root).arg("convert-invited").output()?;
    assert!(output.status.success(), "stderr=\n{}", stderr_of(&output));

    let json = read_json(root, "public/data/invited_conferences.json");
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["note"], "hand edited");
    assert_eq!(entries[0]["journal"], "SHINE");
    assert_eq!(entries[1]["title"], "Proton Beams");
    assert_eq!(entries[1]["year"], "2023-12-00");
    assert_eq!(entries[1]["authors"][1], "Kasper, J. C.");
    assert_eq!(entries[1]["invited"], true);

    let stderr = stderr_of(&output);
    assert!(stderr.contains("(1 new)"), "stderr=\n{stderr}");
    assert!(stderr.contains("Category directory not found"), "stderr=\n{stderr}");

    // A second run adds nothing.
    let output = pubkit(root).arg("convert-invited").output()?;
    assert!(output.status.success());
    assert!(stderr_of(&output).contains("(0 new)"));
    Ok(())
}

#[test]
fn convert_invited_warns_about_prematurely_closed_entry() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(
        root,
        "data/bibtex/presentations/malformed.bib",
        "@inproceedings{Key,}\n author = {Alterman, B.~L.},\n title = {{Some Talk}},\n year = {2025},\n",
    );

    let output = pubkit(root).arg("convert-invited").output()?;
    let stderr = stderr_of(&output);
    assert!(output.status.success(), "stderr=\n{stderr}");
    assert!(
        stderr.contains("⚠ malformed.bib is not empty but yielded 0 usable entries"),
        "stderr=\n{stderr}"
    );
    Ok(())
}

#[test]
fn merge_invited_flags_matching_bibcodes() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(
        root,
        "public/data/ads_publications.json",
        r#"[{"bibcode":"2023shin.confE..12A","title":"Helium","authors":[],"year":"2023-03-00",
             "month":"March","journal":"SHINE","publication_type":"abstract","citations":1,
             "url":"","invited":false}]"#,
    );
    write(
        root,
        "public/data/invited_conferences.json",
        r#"[{"bibcode":"2023shin.confE..12A","title":"Helium","authors":[],"year":"2023-03-05",
             "month":"March","day":"5","journal":"SHINE Workshop","booktitle":"SHINE Workshop",
             "location":"Boulder, CO","publication_type":"inproceedings","citations":0,"url":"",
             "invited":true},
            {"title":"Beams","authors":[],"year":"2023-12-00","month":"12","journal":"AGU",
             "publication_type":"inproceedings","citations":0,"url":"","invited":true}]"#,
    );

    let output = pubkit(root).arg("merge-invited").output()?;
    assert!(output.status.success(), "stderr=\n{}", stderr_of(&output));

    let json = read_json(root, "public/data/ads_publications.json");
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["invited"], true);
    assert_eq!(entries[0]["location"], "Boulder, CO");
    assert_eq!(entries[0]["citations"], 1);
    assert_eq!(entries[1]["title"], "Beams");
    Ok(())
}

#[test]
fn add_talk_dry_run_prints_entry_only() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    pubkit(root)
        .args([
            "add-talk",
            "--category",
            "presentations",
            "--year",
            "2024",
            "--month",
            "5",
            "--booktitle",
            "NASA Goddard Space Flight Center",
            "--title",
            "Helium and the Solar Cycle",
            "--author",
            "Alterman, B. L.",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("@inproceedings{NASA2024,\n"))
        .stdout(predicate::str::contains("title = {{Helium and the Solar Cycle}},"));
    assert!(!root.join("data/bibtex/presentations/2024.bib").exists());
    Ok(())
}

#[test]
fn add_talk_appends_with_one_blank_line() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    for (key, title) in [("First2024", "First Talk"), ("Second2024", "Second Talk")] {
        pubkit(root)
            .args([
                "add-talk",
                "--category",
                "3",
                "--year",
                "2024",
                "--booktitle",
                "Public Library",
                "--title",
                title,
                "--author",
                "Alterman, B. L.",
                "--key",
                key,
            ])
            .assert()
            .success();
    }
    let text = fs::read_to_string(root.join("data/bibtex/public/2024.bib"))?;
    assert!(text.starts_with("@inproceedings{First2024,"));
    assert!(text.contains("}\n\n@inproceedings{Second2024,"));
    assert!(!text.contains("\n\n\n"));
    Ok(())
}

#[test]
fn add_talk_rejects_bad_year() {
    let site = site();
    pubkit(site.path())
        .args([
            "add-talk",
            "--category",
            "1",
            "--year",
            "1850",
            "--booktitle",
            "AGU",
            "--title",
            "T",
            "--author",
            "A, B.",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1900 and 2100"));
}

#[test]
fn fetch_without_credentials_names_variables() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let output = pubkit(site.path())
        .env_remove("ADS_ORCID")
        .env_remove("ADS_DEV_KEY")
        .args(["fetch", "publications"])
        .output()?;
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("✗ missing ADS credentials: ADS_ORCID is not set, ADS_DEV_KEY is not set"),
        "stderr=\n{stderr}"
    );
    Ok(())
}

#[test]
fn fresh_citation_cache_needs_no_credentials() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(root, "public/data/citations_by_year.json", "{}");
    let output = pubkit(root)
        .env_remove("ADS_ORCID")
        .env_remove("ADS_DEV_KEY")
        .args(["fetch", "citations"])
        .output()?;
    let stderr = stderr_of(&output);
    assert!(output.status.success(), "stderr=\n{stderr}");
    assert!(stderr.contains("less than 7 days old"), "stderr=\n{stderr}");
    assert_eq!(fs::read_to_string(root.join("public/data/citations_by_year.json"))?, "{}");

    let forced = pubkit(root)
        .env_remove("ADS_ORCID")
        .env_remove("ADS_DEV_KEY")
        .args(["fetch", "citations", "--force"])
        .output()?;
    assert!(!forced.status.success());
    assert!(stderr_of(&forced).contains("missing ADS credentials"));
    Ok(())
}

#[test]
fn normalize_dry_run_leaves_file_alone() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    let original = r#"[{"bibcode":"2019ApJ...879L...6A","title":"He<SUP>2+</SUP>","authors":["Alterman, Benjamin L."],"year":"2019-07-00","month":"July","journal":"Bulletin of the American Astronomical Society","publication_type":"article","citations":0,"url":"","invited":false}]"#;
    write(root, "public/data/ads_publications.json", original);
    write(
        root,
        "data/author_names.json",
        r#"[{"last_name":"Alterman","first_initial":"B","middle_initial":"L",
             "first_names":["Benjamin"],"canonical":"Alterman, B. L."}]"#,
    );

    let output = pubkit(root).args(["normalize", "--dry-run"]).output()?;
    assert!(output.status.success(), "stderr=\n{}", stderr_of(&output));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("1 author names standardized"), "stderr=\n{stderr}");
    assert!(stderr.contains("Dry run"));
    assert_eq!(
        fs::read_to_string(root.join("public/data/ads_publications.json"))?,
        original
    );

    let output = pubkit(root).arg("normalize").output()?;
    assert!(output.status.success());
    let json = read_json(root, "public/data/ads_publications.json");
    assert_eq!(json[0]["authors"][0], "Alterman, B. L.");
    assert_eq!(json[0]["title"], "He²⁺");
    assert_eq!(json[0]["journal"], "Bulletin of AAS");

    pubkit(root).arg("validate-authors").assert().success();
    Ok(())
}

#[test]
fn invited_metrics_counts_years_and_venues() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(
        root,
        "public/data/ads_publications.json",
        r#"[{"title":"A","year":"2021-02-22","journal":"SHINE","invited":true},
            {"title":"B","year":"2022-06-00","journal":"AGU","invited":true},
            {"title":"C","year":"2022-07-00","journal":"AGU","booktitle":"","invited":true},
            {"title":"D","year":"2022-07-00","journal":"ApJ","invited":false}]"#,
    );
    pubkit(root).arg("invited-metrics").assert().success();
    let json = read_json(root, "public/data/invited_metrics.json");
    assert_eq!(json["total_invited_talks"], 3);
    assert_eq!(json["invited_by_year"]["2022"], 2);
    let text = fs::read_to_string(root.join("public/data/invited_metrics.json"))?;
    let agu = text.find("\"AGU\"").unwrap();
    let shine = text.find("\"SHINE\"").unwrap();
    assert!(agu < shine, "venues should be ranked by count:\n{text}");
    Ok(())
}

fn figure_site(topic_ref: &str) -> TempDir {
    let site = site();
    let root = site.path();
    write(
        root,
        "research-corpus/papers/879_L6/paper_metadata.json",
        r#"{"paper":{"id":"879_L6"},"figures":[
            {"figure_id":"fig_1","technical_caption":"Helium abundance vs speed.",
             "short_title":"Helium abundance","metadata":{"keywords":["helium"]},
             "summary":{"what_we_see":"A histogram. Colored by speed.",
                        "the_finding":"Abundance rises with speed.","why_it_matters":"Sources."}}]}"#,
    );
    write(
        root,
        "public/data/research-topics/helium.json",
        &format!(
            r#"{{"slug":"helium","title":"Helium","subtitle":"Sub","description":"Desc",
                "primary_figure":{{"ref":"{topic_ref}","topic_keywords":["abundance"]}},
                "paper":{{"title":"Paper","doi":"10.3847/x","bibcode":"2019ApJ...879L...6A","year":2019}}}}"#
        ),
    );
    site
}

#[test]
fn figure_registry_refuses_unresolved_refs() -> Result<(), Box<dyn std::error::Error>> {
    let site = figure_site("879_L6/fig_2");
    let root = site.path();
    let output = pubkit(root).args(["figures", "registry"]).output()?;
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("✗ Topic ref '879_L6/fig_2' not found in registry"), "stderr=\n{stderr}");
    assert!(!root.join("public/data/figure-registry.json").exists());
    Ok(())
}

#[test]
fn figure_registry_then_exports() -> Result<(), Box<dyn std::error::Error>> {
    let site = figure_site("879_L6/fig_1");
    let root = site.path();

    pubkit(root).args(["figures", "registry"]).assert().success();
    let registry = read_json(root, "public/data/figure-registry.json");
    let entry = &registry["879_L6/fig_1"];
    assert_eq!(entry["src"], "/papers/879_L6/figures/fig_1.svg");
    assert_eq!(entry["alt"], "A histogram.");
    assert_eq!(entry["summary_short"], "Abundance rises with speed.");
    assert_eq!(entry["used_as_primary_in"][0], "helium");

    pubkit(root).args(["export", "registry"]).assert().success();
    let md = fs::read_to_string(root.join("review-docs/figure-registry.md"))?;
    assert!(md.contains("**Total figures:** 1"));
    assert!(md.contains("**Primary in:** helium"));

    pubkit(root).args(["export", "topics"]).assert().success();
    let md = fs::read_to_string(root.join("review-docs/helium.md"))?;
    assert!(md.contains("### Keywords\n\nhelium, abundance\n"));
    assert!(md.contains("- **Year:** 2019"));
    Ok(())
}

#[test]
fn publication_stats_names_missing_metrics_key() -> Result<(), Box<dyn std::error::Error>> {
    let site = site();
    let root = site.path();
    write(root, "public/data/ads_metrics.json", r#"{"basic stats": {}}"#);
    for name in ["ads_publications", "invited_presentations", "invited_conferences"] {
        write(root, &format!("public/data/{name}.json"), "[]");
    }
    pubkit(root)
        .arg("publication-stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ads_metrics.json is missing"));
    Ok(())
}
