//! Ticket source files
//!
//! The primary format is a CSV export with a header row: `ds` holds the
//! creation timestamp, `original_message` the ticket text and `extra` a JSON
//! object of metadata. Other columns are ignored. Rows are numbered from zero
//! and get the id `ticket_{row}`.
//!
//! A `.json` file is read as an array of ticket records instead. Records may
//! omit `id` (assigned `ticket_{index}`), `content` (empty) and `metadata`
//! (empty object).
//!
//! In both formats `created_at` is kept verbatim even when it does not parse
//! as a date.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::models::TicketRecord;

const DS_COLUMN: &str = "ds";
const MESSAGE_COLUMN: &str = "original_message";
const EXTRA_COLUMN: &str = "extra";

#[derive(Debug, Deserialize)]
struct RawTicket {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl RawTicket {
    fn into_record(self, index: usize) -> TicketRecord {
        let id = match self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("ticket_{}", index),
        };
        let created_at = match self.created_at {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let metadata = match self.metadata {
            Some(Value::Object(map)) => Value::Object(map),
            _ => Value::Object(Default::default()),
        };

        TicketRecord {
            id,
            content: self.content.unwrap_or_default(),
            created_at,
            metadata,
        }
    }
}

/// Parse ticket rows from CSV with a header row
pub fn parse_tickets_csv<R: Read>(reader: R) -> Result<Vec<TicketRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::parsing(format!("cannot read ticket CSV header: {}", e)))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let ds = column(DS_COLUMN).ok_or_else(|| {
        PipelineError::parsing(format!("ticket CSV has no {:?} column", DS_COLUMN))
    })?;
    let message = column(MESSAGE_COLUMN);
    let extra = column(EXTRA_COLUMN);
    if message.is_none() {
        log::warn!("Ticket CSV has no {:?} column; contents will be empty", MESSAGE_COLUMN);
    }

    let mut tickets = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            PipelineError::parsing(format!("ticket CSV row {}: {}", row, e))
        })?;
        let field = |index: Option<usize>| index.and_then(|i| record.get(i)).unwrap_or("");

        let id = format!("ticket_{}", row);
        let metadata = parse_extra(&id, field(extra));
        tickets.push(TicketRecord {
            content: field(message).to_string(),
            created_at: field(Some(ds)).to_string(),
            metadata,
            id,
        });
    }

    Ok(tickets)
}

/// The `extra` cell as a metadata object; blank or malformed cells are empty
fn parse_extra(id: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => {
            log::warn!("Ignoring non-object extra metadata for {}: {}", id, other);
            Value::Object(Default::default())
        }
        Err(e) => {
            log::warn!("Ignoring malformed extra metadata for {}: {}", id, e);
            Value::Object(Default::default())
        }
    }
}

/// Parse ticket records from a JSON array
pub fn parse_tickets_json(text: &str) -> Result<Vec<TicketRecord>> {
    let raw: Vec<RawTicket> = serde_json::from_str(text)
        .map_err(|e| PipelineError::parsing(format!("ticket file is not a JSON array of tickets: {}", e)))?;

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, ticket)| ticket.into_record(index))
        .collect())
}

/// Load every ticket in the file at `path`, as JSON for a `.json` extension
/// and as CSV otherwise
pub fn load_tickets(path: &Path) -> Result<Vec<TicketRecord>> {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let tickets = if is_json {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::not_found(format!("cannot read tickets from {}: {}", path.display(), e))
        })?;
        parse_tickets_json(&text)?
    } else {
        let file = File::open(path).map_err(|e| {
            PipelineError::not_found(format!("cannot read tickets from {}: {}", path.display(), e))
        })?;
        parse_tickets_csv(file)?
    };

    log::info!("Loaded {} tickets from {}", tickets.len(), path.display());
    Ok(tickets)
}

/// The latest ticket date and the day before it
pub fn default_window(tickets: &[TicketRecord]) -> Result<(NaiveDate, NaiveDate)> {
    let latest = tickets
        .iter()
        .filter_map(TicketRecord::created_date)
        .max()
        .ok_or_else(|| PipelineError::validation("no ticket has a parseable created_at date"))?;

    let previous = latest.pred_opt().unwrap_or(latest);
    Ok((previous, latest))
}

/// Tickets dated within `start..=end`; tickets without a parseable date are kept
pub fn filter_window(tickets: Vec<TicketRecord>, start: NaiveDate, end: NaiveDate) -> Vec<TicketRecord> {
    tickets
        .into_iter()
        .filter(|ticket| match ticket.created_date() {
            Some(date) => date >= start && date <= end,
            None => true,
        })
        .collect()
}
