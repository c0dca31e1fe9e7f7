use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use log::info;
use my_activity_scraping::activity::filter::{Filter, Limit, SearchType};
use my_activity_scraping::activity::parser::MalformedPolicy;
use my_activity_scraping::activity::{list_searches, ListOptions};
use my_activity_scraping::archive::{extract_archive, ArchiveError};
use my_activity_scraping::drive::{self, fetch_from_cloud, GoogleDrive};

/// A utility for Google Drive and Google activity
#[derive(Parser)]
#[command(version)]
struct Opts {
    #[command(subcommand)]
    sub: Option<Sub>,
}

#[derive(Subcommand)]
enum Sub {
    /// Copy and extract a zip file from Google Drive to the local machine
    UnzipFromDrive(UnzipFromDrive),
    /// Extract a local zip file, such as a Takeout archive
    Unzip(Unzip),
    /// List user activities from `My Activity/Search/MyActivity.html`
    ListSearches(ListSearches),
}

#[derive(Args)]
struct UnzipFromDrive {
    /// Name of the file in Google Drive
    source: String,
    /// Target directory on the local machine
    target: PathBuf,
    #[arg(long, default_value = GoogleDrive::DEFAULT_CREDENTIALS_PATH)]
    credentials_path: PathBuf,
}

#[derive(Args)]
struct Unzip {
    archive: PathBuf,
    target: PathBuf,
}

#[derive(Args)]
struct ListSearches {
    /// Path to `MyActivity.html`
    path: PathBuf,
    /// Output format: json or csv
    #[arg(long, default_value = "json")]
    format: String,
    #[command(flatten)]
    search_type: SearchTypeArgs,
    #[command(flatten)]
    limit: LimitArgs,
    /// Skip sections that cannot be parsed instead of failing
    #[arg(long)]
    skip_malformed: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SearchTypeArgs {
    /// Output all activities
    #[arg(long)]
    all: bool,
    /// Output searches only
    #[arg(long = "searches_only")]
    searches_only: bool,
    /// Output visited pages only
    #[arg(long = "visited_only")]
    visited_only: bool,
}
impl From<SearchTypeArgs> for SearchType {
    fn from(args: SearchTypeArgs) -> Self {
        if args.searches_only {
            SearchType::SearchesOnly
        } else if args.visited_only {
            SearchType::VisitedOnly
        } else {
            SearchType::All
        }
    }
}

#[derive(Args)]
#[group(multiple = false)]
struct LimitArgs {
    /// Output the latest N entries
    #[arg(long, value_name = "N")]
    head: Option<NonZeroUsize>,
    /// Output the oldest N entries
    #[arg(long, value_name = "N")]
    tail: Option<NonZeroUsize>,
    /// Output every N-th entry
    #[arg(long, value_name = "N")]
    every: Option<NonZeroUsize>,
}
impl From<LimitArgs> for Option<Limit> {
    fn from(args: LimitArgs) -> Self {
        args.head
            .map(Limit::Head)
            .or(args.tail.map(Limit::Tail))
            .or(args.every.map(Limit::Every))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match opts.sub {
        Some(Sub::UnzipFromDrive(sub)) => {
            let storage = drive::connect(&sub.credentials_path);
            match fetch_from_cloud(storage.as_ref(), &sub.source, &sub.target).await {
                Ok(count) => println!("Extracted {count} entries into {:?}", sub.target),
                Err(e) if e.is_reportable() => println!("{e}"),
                Err(e) => return Err(e.into()),
            }
        }
        Some(Sub::Unzip(sub)) => match extract_archive(&sub.archive, &sub.target) {
            Ok(count) => println!("Extracted {count} entries into {:?}", sub.target),
            Err(e @ ArchiveError::InvalidArchive { .. }) => println!("{e}"),
            Err(e) => return Err(e.into()),
        },
        Some(Sub::ListSearches(sub)) => {
            let html = fs_err::read_to_string(&sub.path)?;
            info!("Loaded {} bytes from {:?}", html.len(), sub.path);
            let options = ListOptions {
                format: sub.format,
                filter: Filter {
                    search_type: sub.search_type.into(),
                    limit: sub.limit.into(),
                },
                malformed_policy: if sub.skip_malformed {
                    MalformedPolicy::Skip
                } else {
                    MalformedPolicy::Abort
                },
            };
            let mut out = BufWriter::new(io::stdout().lock());
            list_searches(&html, &options, &mut out)
                .with_context(|| format!("While listing activities in {:?}", sub.path))?;
            out.flush()?;
        }
        None => {
            println!("Invalid command: no subcommand was given");
            Opts::command().print_help()?;
        }
    }

    Ok(())
}
