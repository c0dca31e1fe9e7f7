use derive_more::Display;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::{debug, info};
use scraper::{ElementRef, Html};

use super::{Action, ActivityRecord, Link, Timestamp};

/// What to do with a section whose heading, content or timestamp is missing.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum MalformedPolicy {
    /// Give up on the whole document.
    #[default]
    Abort,
    /// Drop the section and keep it as a bad entry.
    Skip,
}

#[derive(PartialEq, Eq, Debug, thiserror::Error)]
pub enum SectionError {
    #[error("Malformed section: {missing} not found")]
    MalformedSection { missing: &'static str },
    #[error("Timestamp not found in the content cell")]
    TimestampNotFound,
}

#[derive(PartialEq, Eq, Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Could not parse section #{index}")]
    Section {
        index: usize,
        #[source]
        source: SectionError,
    },
}

#[derive(PartialEq, Eq, Debug, Display)]
pub enum BadEntryReason {
    #[display("no anchor in the content cell")]
    MissingAnchor,
    #[display("{_0}")]
    Malformed(SectionError),
}

/// A section kept aside for diagnostics.  Never part of the output.
#[derive(Debug, Getters, CopyGetters)]
pub struct BadEntry {
    #[getset(get_copy = "pub")]
    index: usize,
    #[getset(get = "pub")]
    reason: BadEntryReason,
    #[getset(get = "pub")]
    markup: String,
}

#[derive(Debug, Getters)]
pub struct ParsedDocument {
    #[getset(get = "pub")]
    records: Vec<ActivityRecord>,
    #[getset(get = "pub")]
    bad_entries: Vec<BadEntry>,
}
impl ParsedDocument {
    pub fn into_records(self) -> Vec<ActivityRecord> {
        self.records
    }
}

/// Result of [`parse_section`]; `anchor_found` is false when the content cell had no `<a>`.
#[derive(Debug)]
pub struct ParsedSection {
    pub record: ActivityRecord,
    pub anchor_found: bool,
}

pub fn extract_sections(html: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    html.select(selector!(
        ".outer-cell.mdl-cell.mdl-cell--12-col.mdl-shadow--2dp"
    ))
}

pub fn parse_document(html: &Html, policy: MalformedPolicy) -> Result<ParsedDocument, ParseError> {
    let mut records = vec![];
    let mut bad_entries = vec![];
    for (index, section) in extract_sections(html).enumerate() {
        match parse_section(section) {
            Ok(ParsedSection {
                record,
                anchor_found,
            }) => {
                if !anchor_found {
                    bad_entries.push(BadEntry {
                        index,
                        reason: BadEntryReason::MissingAnchor,
                        markup: section.html(),
                    });
                }
                records.push(record);
            }
            Err(source) => match policy {
                MalformedPolicy::Abort => return Err(ParseError::Section { index, source }),
                MalformedPolicy::Skip => {
                    debug!("Skipping section #{index}: {source}");
                    bad_entries.push(BadEntry {
                        index,
                        reason: BadEntryReason::Malformed(source),
                        markup: section.html(),
                    });
                }
            },
        }
    }
    info!(
        "Parsed {} sections ({} bad entries)",
        records.len(),
        bad_entries.len()
    );
    Ok(ParsedDocument {
        records,
        bad_entries,
    })
}

pub fn parse_section(section: ElementRef) -> Result<ParsedSection, SectionError> {
    let heading = section
        .select(selector!(".mdl-typography--title"))
        .next()
        .ok_or(SectionError::MalformedSection { missing: "title" })?
        .text()
        .collect::<String>();

    let content = section
        .select(selector!(
            ".content-cell.mdl-cell.mdl-cell--6-col.mdl-typography--body-1"
        ))
        .next()
        .ok_or(SectionError::MalformedSection {
            missing: "content cell",
        })?;
    let action = parse_action(&content.text().collect::<String>());
    let timestamp = parse_timestamp(&content.html())?;
    let record = ActivityRecord::new(heading, action, timestamp);

    let Some(anchor) = content.select(selector!("a")).next() else {
        return Ok(ParsedSection {
            record,
            anchor_found: false,
        });
    };
    let link = Link {
        url: anchor.value().attr("href").map(str::to_owned),
        text: anchor.text().collect(),
        location: find_location(section),
    };
    Ok(ParsedSection {
        record: record.with_link(link),
        anchor_found: true,
    })
}

/// Text before the first no-break space, which separates the verb from the anchor.
fn parse_action(content_text: &str) -> Action {
    content_text
        .split_once('\u{a0}')
        .map_or(content_text, |(action, _)| action)
        .to_owned()
        .into()
}

/// Searches the serialized markup rather than the text.
/// The narrow no-break space before AM/PM appears either as `&#8239;` or as U+202F
/// depending on the serializer, and is removed from the result.
fn parse_timestamp(markup: &str) -> Result<Timestamp, SectionError> {
    let pattern = regex!(
        r"\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\b \d{1,2}, \d{4}, \d{1,2}:\d{2}:\d{2}(?:&#8239;|\x{202F})?(?:AM|PM) (?:EDT|EST|CDT|CST|MDT|MST|PDT|PST)"
    );
    let found = pattern
        .find(markup)
        .ok_or(SectionError::TimestampNotFound)?;
    Ok(found
        .as_str()
        .replace("&#8239;", "")
        .replace('\u{202f}', "")
        .into())
}

// Only assigned when there are at least two caption anchors.
fn find_location(section: ElementRef) -> Option<String> {
    let captions = section
        .select(selector!(
            "div.content-cell.mdl-cell.mdl-cell--12-col.mdl-typography--caption > a"
        ))
        .collect_vec();
    if captions.len() > 1 {
        captions[0].value().attr("href").map(str::to_owned)
    } else {
        None
    }
}
