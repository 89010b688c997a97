use std::process::ExitCode;

use clap::Parser;

use crate::{
    ads::{AdsClient, citations::run_fetch_citations, fetch},
    cli::{AddTalkArgs, Cli, Command, ExportTarget, FetchTarget, FiguresTarget},
    config::{AdsCredentials, SitePaths},
    invited::talk::{NewTalk, suggest_citation_key},
    normalize::{AuthorStandardizer, VenueAliases},
};

mod ads;
mod cli;
mod config;
mod export;
mod figures;
mod identifier;
mod invited;
mod normalize;
mod record;
mod report;
mod stats;

fn main() -> ExitCode {
    let args = Cli::parse();
    report::init_tracing(args.verbose);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report::failure(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let paths = SitePaths::discover(args.root.as_deref(), &cwd)?;
    tracing::debug!(root = %paths.root().display(), "using site root");

    let author_rules = || {
        let path = args
            .author_rules
            .clone()
            .unwrap_or_else(|| paths.build_data_dir().join("author_names.json"));
        AuthorStandardizer::load(&path)
    };
    let venue_aliases = || {
        let path = args
            .venue_aliases
            .clone()
            .unwrap_or_else(|| paths.build_data_dir().join("venue_aliases.json"));
        VenueAliases::load(&path)
    };

    match args.command {
        Command::Fetch { ref ads, what } => {
            let connect = || -> anyhow::Result<(AdsClient, String)> {
                let creds = AdsCredentials::from_parts(ads.orcid.clone(), ads.token.clone())?;
                Ok((AdsClient::new(&ads.ads_url, &creds.token)?, creds.orcid))
            };
            match what {
                FetchTarget::Publications => {
                    let (client, orcid) = connect()?;
                    fetch::run_fetch_publications(
                        &paths,
                        &client,
                        &orcid,
                        &author_rules()?,
                        &venue_aliases()?,
                        ads.dry_run,
                    )
                }
                FetchTarget::Citations { force } => {
                    run_fetch_citations(&paths, connect, force, ads.dry_run)
                }
                FetchTarget::Metrics => {
                    let (client, orcid) = connect()?;
                    fetch::run_fetch_metrics(&paths, &client, &orcid, ads.dry_run)
                }
            }
        }
        Command::Normalize { dry_run } => {
            normalize::run_normalize(&paths, &author_rules()?, &venue_aliases()?, dry_run)
        }
        Command::ValidateAuthors => normalize::run_validate_authors(&paths, &author_rules()?),
        Command::ConvertInvited { dry_run } => invited::convert::run_convert_invited(&paths, dry_run),
        Command::MergeInvited { dry_run } => invited::merge::run_merge_invited(&paths, dry_run),
        Command::AddTalk(ref talk) => {
            invited::talk::run_add_talk(&paths, &new_talk(talk), talk.dry_run)
        }
        Command::InvitedMetrics { dry_run } => stats::run_invited_metrics(&paths, dry_run),
        Command::PublicationStats { dry_run } => stats::run_publication_stats(&paths, dry_run),
        Command::Figures { ref what } => match what {
            FiguresTarget::Registry {
                dry_run,
                old_corpus,
            } => figures::run_figure_registry(&paths, old_corpus.as_deref(), *dry_run),
            FiguresTarget::Captions {
                dry_run,
                crossref_url,
            } => {
                let crossref = figures::CrossrefClient::new(crossref_url)?;
                figures::run_figure_captions(&paths, &crossref, *dry_run)
            }
        },
        Command::Export { what } => match what {
            ExportTarget::Registry => export::run_export_registry(&paths),
            ExportTarget::Topics => export::run_export_topics(&paths),
        },
    }
}

fn new_talk(args: &AddTalkArgs) -> NewTalk {
    NewTalk {
        category: args.category,
        key: args
            .key
            .clone()
            .unwrap_or_else(|| suggest_citation_key(&args.booktitle, &args.year)),
        author: args.author.clone(),
        title: args.title.clone(),
        year: args.year.clone(),
        month: args.month.clone(),
        day: args.day.clone(),
        booktitle: args.booktitle.clone(),
        location: args.location.clone(),
        bibcode: args.bibcode.clone(),
        keywords: args.keywords.clone(),
        url: args.url.clone(),
    }
}
