//! Output formatting for departure records and decoded feeds.
//!
//! Supports the one-line-per-departure board, JSON, and CSV.

use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use tracing::debug;

use crate::gtfs_rt::FeedMessage;
use crate::query::DepartureRecord;

/// Printed instead of a board when nothing matched.
pub const NO_DEPARTURES: &str = "No departures matched your filters";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// One board line for a departure.
pub fn format_line(record: &DepartureRecord) -> String {
    format!(
        "trip: {} line: {} departs from {} at {}",
        record.trip_id,
        record.route_id,
        record.stop_label,
        record.departure_local.format("%Y-%m-%d %H:%M:%S %Z"),
    )
}

/// Writes `records` to `writer` in `format`.
pub fn write_departures<W: Write>(
    mut writer: W,
    records: &[DepartureRecord],
    format: OutputFormat,
) -> Result<()> {
    debug!(records = records.len(), ?format, "Writing departures");
    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                writeln!(writer, "{NO_DEPARTURES}")?;
            }
            for record in records {
                writeln!(writer, "{}", format_line(record))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let mut csv = WriterBuilder::new().has_headers(true).from_writer(writer);
            for record in records {
                csv.serialize(record)?;
            }
            csv.flush()?;
        }
    }
    Ok(())
}

/// Writes a whole decoded feed as pretty-printed JSON.
pub fn write_feed_json<W: Write>(mut writer: W, feed: &FeedMessage) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, feed)?;
    writeln!(writer)?;
    Ok(())
}
