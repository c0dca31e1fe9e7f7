use std::{collections::HashMap, io::Write};

use indexmap::IndexSet;
use strum::{Display, EnumString};

use super::ActivityRecord;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// Header row followed by one row per record.
    Csv,
}

impl OutputFormat {
    pub fn write<W: Write>(self, records: &[ActivityRecord], out: &mut W) -> anyhow::Result<()> {
        match self {
            Self::Json => write_json_lines(records, out),
            Self::Csv => write_csv(records, out),
        }
    }
}

fn write_json_lines<W: Write>(records: &[ActivityRecord], out: &mut W) -> anyhow::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Columns are the fields that occur in at least one record, in order of first appearance.
fn write_csv<W: Write>(records: &[ActivityRecord], out: &mut W) -> anyhow::Result<()> {
    let columns = records
        .iter()
        .flat_map(|record| record.fields().map(|(name, _)| name))
        .collect::<IndexSet<_>>();
    if columns.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&columns)?;
    for record in records {
        let fields = record.fields().collect::<HashMap<_, _>>();
        writer.write_record(
            columns
                .iter()
                .map(|column| fields.get(column).copied().unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}
