//! Delimited-text encoding of the survey table.
//!
//! Every field is quoted, embedded quotes are doubled, fields are joined
//! with `,` and every row ends with `\n`.

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use thiserror::Error;

use crate::survey::SurveyRecord;

/// Column headers, in row order.
pub const COLUMNS: [&str; 7] = [
    "Имя",
    "Должность",
    "Компания",
    "Репутация (до 400 млн)",
    "Репутация (свыше 400 млн)",
    "Маркетинг (до 400 млн)",
    "Маркетинг (свыше 400 млн)",
];

/// Joins list entries inside one field.
pub const LIST_SEPARATOR: &str = "; ";

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoded row is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Flattened form of a [`SurveyRecord`]: seven strings in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRow(pub [String; 7]);

impl From<&SurveyRecord> for RemoteRow {
    fn from(record: &SurveyRecord) -> Self {
        RemoteRow([
            record.name.clone(),
            record.position.clone(),
            record.company.clone(),
            record.reputation_under_threshold.join(LIST_SEPARATOR),
            record.reputation_over_threshold.join(LIST_SEPARATOR),
            record.marketing_under_threshold.join(LIST_SEPARATOR),
            record.marketing_over_threshold.join(LIST_SEPARATOR),
        ])
    }
}

impl RemoteRow {
    pub fn fields(&self) -> &[String; 7] {
        &self.0
    }
}

fn encode_fields<I, T>(fields: I) -> Result<String, TableError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(fields)?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Encoded header line, including its terminator.
pub fn header_row() -> Result<String, TableError> {
    encode_fields(COLUMNS)
}

/// Encoded data line, including its terminator.
pub fn encode_row(row: &RemoteRow) -> Result<String, TableError> {
    encode_fields(row.fields())
}

/// Content of a fresh table holding a single encoded row.
pub fn new_table(encoded_row: &str) -> Result<String, TableError> {
    let mut table = header_row()?;
    table.push_str(encoded_row);
    Ok(table)
}

/// `existing` table content with `encoded_row` appended. An empty (or
/// whitespace-only) table gets a header first, after its BOM if it had one.
pub fn append_row(existing: &str, encoded_row: &str) -> Result<String, TableError> {
    if existing.trim_start_matches(BOM).trim().is_empty() {
        let table = new_table(encoded_row)?;
        if existing.starts_with(BOM) {
            return Ok(format!("{BOM}{table}"));
        }
        return Ok(table);
    }
    let mut table = String::with_capacity(existing.len() + encoded_row.len() + 1);
    table.push_str(existing);
    if !existing.ends_with('\n') {
        table.push('\n');
    }
    table.push_str(encoded_row);
    Ok(table)
}

/// Split table content back into rows of fields, honouring quoting.
/// The header, if present, is returned as the first row.
pub fn decode_rows(content: &str) -> Result<Vec<Vec<String>>, TableError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}
