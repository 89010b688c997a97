use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    ads::DEFAULT_API_URL,
    figures::DEFAULT_CROSSREF_URL,
    invited::{
        Category,
        talk::{DEFAULT_KEYWORDS, parse_day, parse_month, parse_year},
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Website repository root; found by walking up from the current directory when omitted
    #[arg(long, global = true, env = "PUBKIT_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Author-name rules [default: <root>/data/author_names.json]
    #[arg(long, global = true, value_name = "FILE")]
    pub author_rules: Option<PathBuf>,

    /// Extra venue aliases [default: <root>/data/venue_aliases.json]
    #[arg(long, global = true, value_name = "FILE")]
    pub venue_aliases: Option<PathBuf>,

    /// More output; repeat for debug logs
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download publication data from NASA ADS
    Fetch {
        #[command(flatten)]
        ads: AdsArgs,
        #[command(subcommand)]
        what: FetchTarget,
    },
    /// Standardize author names, venues and titles in ads_publications.json
    Normalize {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Check every author variant against the name rules
    ValidateAuthors,
    /// Convert the invited-talk BibTeX files to JSON
    ConvertInvited {
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark ADS publications that are invited conference talks
    MergeInvited {
        #[arg(long)]
        dry_run: bool,
    },
    /// Append an invited talk to data/bibtex/<category>/<year>.bib
    AddTalk(Box<AddTalkArgs>),
    /// Count invited talks per year and venue
    InvitedMetrics {
        #[arg(long)]
        dry_run: bool,
    },
    /// Build publication_statistics.json from the ADS metrics and invited talks
    PublicationStats {
        #[arg(long)]
        dry_run: bool,
    },
    /// Figure registry and captions for the research pages
    Figures {
        #[command(subcommand)]
        what: FiguresTarget,
    },
    /// Write markdown review documents
    Export {
        #[command(subcommand)]
        what: ExportTarget,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AdsArgs {
    /// ORCID whose publications are fetched
    #[arg(long, env = "ADS_ORCID", hide_env_values = true)]
    pub orcid: Option<String>,

    /// ADS API token
    #[arg(long, env = "ADS_DEV_KEY", hide_env_values = true)]
    pub token: Option<String>,

    /// ADS API base URL
    #[arg(long, env = "ADS_API_URL", default_value = DEFAULT_API_URL)]
    pub ads_url: String,

    /// Report what was fetched without writing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    /// Publication list for the ORCID
    Publications,
    /// Citations per year, refereed and nonrefereed
    Citations {
        /// Download even when the cached file is less than a week old
        #[arg(long)]
        force: bool,
    },
    /// Bulk ADS metrics for every publication
    Metrics,
}

#[derive(Subcommand, Debug)]
pub enum FiguresTarget {
    /// Build figure-registry.json from the research corpus
    Registry {
        #[arg(long)]
        dry_run: bool,
        /// Corpus snapshot the website figure files were generated from
        #[arg(long, value_name = "DIR")]
        old_corpus: Option<PathBuf>,
    },
    /// Build research-figures-with-captions.json
    Captions {
        #[arg(long)]
        dry_run: bool,
        /// Crossref API base URL
        #[arg(long, env = "CROSSREF_API_URL", default_value = DEFAULT_CROSSREF_URL)]
        crossref_url: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    /// review-docs/figure-registry.md
    Registry,
    /// review-docs/<slug>.md for every research topic
    Topics,
}

#[derive(Args, Debug, Clone)]
pub struct AddTalkArgs {
    /// conferences, presentations or public (or 1, 2, 3)
    #[arg(long)]
    pub category: Category,

    #[arg(long, value_parser = parse_year)]
    pub year: String,

    /// Conference or venue name
    #[arg(long)]
    pub booktitle: String,

    #[arg(long)]
    pub title: String,

    /// Author in BibTeX form, e.g. "Alterman, B. L."
    #[arg(long)]
    pub author: String,

    /// Citation key [default: from the booktitle and year]
    #[arg(long)]
    pub key: Option<String>,

    /// 1-12 or a month name
    #[arg(long, value_parser = parse_month)]
    pub month: Option<String>,

    #[arg(long, value_parser = parse_day)]
    pub day: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// ADS bibcode, if the talk has an ADS record
    #[arg(long)]
    pub bibcode: Option<String>,

    #[arg(long, default_value = DEFAULT_KEYWORDS)]
    pub keywords: String,

    /// Link to slides or a recording
    #[arg(long)]
    pub url: Option<String>,

    /// Print the entry instead of appending it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("pubkit").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_takes_credentials_from_flags() {
        let cli = parse(&[
            "fetch",
            "--orcid",
            "0000-0001-0001-0001",
            "--token",
            "secret",
            "citations",
            "--force",
        ])
        .expect("parse");
        match cli.command {
            Command::Fetch { ads, what } => {
                assert_eq!(ads.orcid.as_deref(), Some("0000-0001-0001-0001"));
                assert_eq!(ads.token.as_deref(), Some("secret"));
                assert_eq!(what, FetchTarget::Citations { force: true });
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn add_talk_validates_dates() {
        let base = [
            "add-talk",
            "--category",
            "2",
            "--booktitle",
            "SHINE Workshop",
            "--title",
            "Helium",
            "--author",
            "Alterman, B. L.",
        ];
        let with = |extra: &[&str]| {
            let mut args = base.to_vec();
            args.extend_from_slice(extra);
            parse(&args)
        };

        let cli = with(&["--year", "2024", "--month", "March", "--day", "5"]).expect("parse");
        let Command::AddTalk(talk) = cli.command else {
            panic!("expected add-talk");
        };
        assert_eq!(talk.category, Category::Presentations);
        assert_eq!(talk.month.as_deref(), Some("March"));
        assert_eq!(talk.keywords, "invited");

        assert!(with(&["--year", "24"]).is_err());
        assert!(with(&["--year", "2024", "--month", "13"]).is_err());
        assert!(with(&["--year", "2024", "--day", "32"]).is_err());
    }

    #[test]
    fn category_accepts_names_and_numbers() {
        proptest::proptest!(|(name in "(conferences|presentations|public|1|2|3)")| {
            let cli = parse(&[
                "add-talk", "--category", name.as_str(), "--year", "2020", "--booktitle", "AGU",
                "--title", "T", "--author", "A, B.",
            ]);
            proptest::prop_assert!(cli.is_ok());
        })
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["figures", "registry", "--dry-run", "--root", "/tmp/site", "-vv"])
            .expect("parse");
        assert_eq!(cli.root.as_deref(), Some(std::path::Path::new("/tmp/site")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Figures {
                what: FiguresTarget::Registry { dry_run: true, old_corpus: None }
            }
        ));
    }
}
