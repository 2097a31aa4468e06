//! CSV file boundary: string-keyed records in, BOM-prefixed CSV out.

use crate::error::Result;
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use std::collections::HashMap;
use std::io::{Read, Write};

/// One data row keyed by (trimmed) header name.
pub type Record = HashMap<String, String>;

const BOM: &str = "\u{feff}";

/// Reads every data row of a CSV document.
///
/// Headers and cells are trimmed, a UTF-8 byte-order mark is ignored, and
/// short rows simply lack the missing columns.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches(BOM).trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Returns the first non-empty value among `columns`.
///
/// Exported files have used more than one header for the same field, so
/// lookups take a list of accepted names.
pub fn cell<'a>(record: &'a Record, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .filter_map(|c| record.get(*c))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Writes a header row and data rows as CSV.
///
/// The output starts with a byte-order mark and uses CRLF line endings.
/// Fields are quoted only when they contain a comma, quote or line break,
/// with embedded quotes doubled.
pub fn serialize_records<W, I>(mut writer: W, headers: &[&str], rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Vec<String>>,
{
    writer.write_all(BOM.as_bytes())?;

    let mut csv_writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Necessary)
        .flexible(false)
        .from_writer(writer);

    csv_writer.write_record(headers)?;
    for row in rows {
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
