use std::io::Write;

use anyhow::Context;
use derive_more::{AsRef, Display, From};
use getset::Getters;
use log::{info, warn};
use scraper::Html;
use serde::Serialize;

pub mod filter;
pub mod output;
pub mod parser;

use filter::Filter;
use output::OutputFormat;
use parser::MalformedPolicy;

const SEARCH_ACTION_PREFIX: &str = "Searched for";

/// One entry of the "My Activity" export.
///
/// `search_query` and `site_title` are never both set: which one receives the
/// anchor text is decided by [`Action::is_search`] in [`ActivityRecord::with_link`].
#[derive(Clone, PartialEq, Eq, Debug, Getters, Serialize)]
#[getset(get = "pub")]
pub struct ActivityRecord {
    heading: String,
    action: Action,
    timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_title: Option<String>,
}

/// The leading text of a content cell, e.g. `Searched for` or `Visited`.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct Action(String);
impl Action {
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn is_search(&self) -> bool {
        self.0.starts_with(SEARCH_ACTION_PREFIX)
    }
}

/// Timestamp as printed in the export, e.g. `Jan 5, 2023, 10:15:32AM EST`.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct Timestamp(String);
impl Timestamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The main anchor of a content cell.
#[derive(Clone, Debug)]
pub struct Link {
    pub url: Option<String>,
    pub text: String,
    pub location: Option<String>,
}

impl ActivityRecord {
    pub const FIELD_NAMES: [&'static str; 7] = [
        "heading",
        "action",
        "timestamp",
        "url",
        "location",
        "search_query",
        "site_title",
    ];

    pub fn new(heading: String, action: Action, timestamp: Timestamp) -> Self {
        Self {
            heading,
            action,
            timestamp,
            url: None,
            location: None,
            search_query: None,
            site_title: None,
        }
    }

    pub fn with_link(self, link: Link) -> Self {
        let (search_query, site_title) = if self.action.is_search() {
            (Some(link.text), None)
        } else {
            (None, Some(link.text))
        };
        Self {
            url: link.url,
            location: link.location,
            search_query,
            site_title,
            ..self
        }
    }

    /// Populated fields in [`Self::FIELD_NAMES`] order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let values = [
            Some(self.heading.as_str()),
            Some(self.action.as_str()),
            Some(self.timestamp.as_str()),
            self.url.as_deref(),
            self.location.as_deref(),
            self.search_query.as_deref(),
            self.site_title.as_deref(),
        ];
        Self::FIELD_NAMES
            .into_iter()
            .zip(values)
            .filter_map(|(name, value)| Some((name, value?)))
    }
}

/// Options of the `list-searches` pipeline, validated by the command line layer.
#[derive(Clone, Debug)]
pub struct ListOptions {
    pub format: String,
    pub filter: Filter,
    pub malformed_policy: MalformedPolicy,
}

/// Parses `html`, filters the records and writes them to `out`.
///
/// Status messages (`No data found`, `Found N entries`, `Invalid output format`)
/// go to `out` as well, ahead of the data.
pub fn list_searches<W: Write>(html: &str, options: &ListOptions, out: &mut W) -> anyhow::Result<()> {
    let html = Html::parse_document(html);
    let document = parser::parse_document(&html, options.malformed_policy)
        .context("Failed to parse the activity html")?;
    for bad_entry in document.bad_entries() {
        warn!("Bad entry at section #{}: {}", bad_entry.index(), bad_entry.reason());
    }

    let records = document.into_records();
    if records.is_empty() {
        writeln!(out, "No data found")?;
        return Ok(());
    }
    writeln!(out, "Found {} entries", records.len())?;

    let records = options.filter.apply(records);
    info!("{} entries left after filtering", records.len());

    match options.format.parse::<OutputFormat>() {
        Ok(format) => format.write(&records, out)?,
        Err(_) => writeln!(out, "Invalid output format")?,
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::num::NonZeroUsize;

    use itertools::Itertools;

    use super::{
        filter::{Filter, Limit, SearchType},
        list_searches,
        parser::MalformedPolicy,
        ListOptions,
    };

    pub fn section(heading: &str, content: &str, caption: &str) -> String {
        format!(
            r#"<div class="outer-cell mdl-cell mdl-cell--12-col mdl-shadow--2dp">
  <div class="mdl-grid">
    <div class="header-cell mdl-cell mdl-cell--12-col"><p class="mdl-typography--title">{heading}<br></p></div>
    <div class="content-cell mdl-cell mdl-cell--6-col mdl-typography--body-1">{content}</div>
    <div class="content-cell mdl-cell mdl-cell--6-col mdl-typography--body-1 mdl-typography--text-right"></div>
    <div class="content-cell mdl-cell mdl-cell--12-col mdl-typography--caption">{caption}</div>
  </div>
</div>"#
        )
    }

    pub fn search_section(query: &str, time: &str) -> String {
        section(
            "Search",
            &format!(
                "Searched for\u{a0}<a href=\"https://www.google.com/search?q={query}\">{query}</a><br>{time}"
            ),
            "<b>Products:</b><br>&emsp;Search<br>",
        )
    }

    pub fn visit_section(site: &str, time: &str) -> String {
        section(
            "Search",
            &format!("Visited\u{a0}<a href=\"https://{site}/\">{site}</a><br>{time}"),
            "<b>Products:</b><br>&emsp;Search<br>",
        )
    }

    pub fn document(sections: &[String]) -> String {
        format!(
            "<html><head><title>My Activity</title></head><body><div class=\"mdl-grid\">{}</div></body></html>",
            sections.join("\n")
        )
    }

    fn options(format: &str, search_type: SearchType, limit: Option<Limit>) -> ListOptions {
        ListOptions {
            format: format.to_owned(),
            filter: Filter { search_type, limit },
            malformed_policy: MalformedPolicy::Abort,
        }
    }

    fn run(html: &str, options: &ListOptions) -> Vec<String> {
        let mut out = vec![];
        list_searches(html, options, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn search_and_visit_as_json() {
        let html = document(&[
            search_section("cats", "Jan 5, 2023, 10:15:32\u{202f}AM EST"),
            visit_section("example.com", "Jan 4, 2023, 9:01:00\u{202f}PM EST"),
        ]);
        let lines = run(&html, &options("json", SearchType::All, None));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Found 2 entries");

        let first: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(first["search_query"], "cats");
        assert_eq!(first["action"], "Searched for");
        assert_eq!(first["timestamp"], "Jan 5, 2023, 10:15:32AM EST");
        assert!(first.get("site_title").is_none());

        let second: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(second["site_title"], "example.com");
        assert_eq!(second["url"], "https://example.com/");
        assert!(second.get("search_query").is_none());
    }

    #[test]
    fn searches_only_head_one() {
        let time = "Mar 1, 2024, 1:02:03\u{202f}PM PST";
        let html = document(&[
            search_section("first", time),
            search_section("second", time),
            search_section("third", time),
            visit_section("a.example", time),
            visit_section("b.example", time),
        ]);
        let lines = run(
            &html,
            &options(
                "json",
                SearchType::SearchesOnly,
                Some(Limit::Head(NonZeroUsize::new(1).unwrap())),
            ),
        );
        assert_eq!(lines[0], "Found 5 entries");
        let records = lines[1..]
            .iter()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .collect_vec();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["search_query"], "first");
    }

    #[test]
    fn empty_document() {
        let html = document(&[]);
        let lines = run(&html, &options("csv", SearchType::All, None));
        assert_eq!(lines, ["No data found"]);
    }

    #[test]
    fn unsupported_format() {
        let time = "Mar 1, 2024, 1:02:03\u{202f}PM PST";
        let html = document(&[search_section("q", time), visit_section("v.example", time)]);
        for search_type in [SearchType::All, SearchType::SearchesOnly, SearchType::VisitedOnly] {
            let lines = run(&html, &options("xml", search_type, None));
            assert_eq!(lines, ["Found 2 entries", "Invalid output format"]);
        }
    }

    #[test]
    fn found_count_is_taken_before_filtering() {
        let time = "Mar 1, 2024, 1:02:03\u{202f}PM PST";
        let html = document(&[
            search_section("q", time),
            visit_section("v1.example", time),
            visit_section("v2.example", time),
        ]);
        let lines = run(&html, &options("csv", SearchType::SearchesOnly, None));
        assert_eq!(lines[0], "Found 3 entries");
        assert_eq!(lines[1], "heading,action,timestamp,url,search_query");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn malformed_section_aborts() {
        let html = document(&[
            search_section("q", "Mar 1, 2024, 1:02:03\u{202f}PM PST"),
            search_section("no time", "yesterday"),
        ]);
        let mut out = vec![];
        assert!(list_searches(&html, &options("json", SearchType::All, None), &mut out).is_err());
        assert!(out.is_empty());
    }
}
