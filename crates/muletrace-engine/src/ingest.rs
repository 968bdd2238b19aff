//! Multi-format transaction ingestion.
//!
//! Accepts raw file bytes plus the original filename, dispatches on the
//! lowercased suffix (CSV, TSV, XLS, XLSX), normalizes header names through a
//! fixed alias table, coerces types, and drops invalid rows. Row-level
//! problems are soft: the row is discarded and tallied, never fatal. Only
//! input-shape problems (unknown format, missing columns, zero surviving
//! rows) fail the request.

use calamine::{Data, DataType as _, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use muletrace_core::error::{AnalysisError, Result};
use muletrace_core::types::{Transaction, TransactionTable};
use std::collections::HashSet;
use std::io::Cursor;

/// Canonical fields every batch must provide.
const CANONICAL_FIELDS: [&str; 5] = ["transaction_id", "sender", "receiver", "amount", "timestamp"];

/// Alias table mapping incoming header names to canonical fields.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    (
        "transaction_id",
        &["transaction_id", "txn_id", "tx_id", "id", "transaction_number"],
    ),
    (
        "sender",
        &["sender", "sender_id", "from_account", "source_id", "from_id", "payer_id"],
    ),
    (
        "receiver",
        &["receiver", "receiver_id", "to_account", "destination_id", "to_id", "payee_id"],
    ),
    ("amount", &["amount", "value", "transaction_amount", "sum"]),
    (
        "timestamp",
        &["timestamp", "date", "datetime", "transaction_date", "time", "created_at"],
    ),
];

/// Datetime patterns, tried in order.
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only patterns, tried after the datetime patterns. Midnight assumed.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"];

/// A raw cell before type coercion. CSV yields text; spreadsheets may carry
/// typed numbers and instants.
#[derive(Debug, Clone)]
enum RawCell {
    Text(String),
    Number(f64),
    Instant(NaiveDateTime),
    Empty,
}

/// Per-reason tally of dropped rows for the debug log.
#[derive(Debug, Clone, Copy, Default)]
struct DropTally {
    bad_amount: usize,
    bad_timestamp: usize,
    empty_endpoint: usize,
    self_loop: usize,
    duplicate_id: usize,
}

impl DropTally {
    fn total(&self) -> usize {
        self.bad_amount + self.bad_timestamp + self.empty_endpoint + self.self_loop + self.duplicate_id
    }
}

/// Parse an uploaded file into the canonical transaction table.
pub fn parse_table(bytes: &[u8], filename: &str) -> Result<TransactionTable> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AnalysisError::NoValidTransactions);
    }

    let lower = filename.to_lowercase();
    let (headers, rows) = if lower.ends_with(".csv") {
        read_delimited(bytes, b',')?
    } else if lower.ends_with(".tsv") {
        read_delimited(bytes, b'\t')?
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        read_spreadsheet(bytes, &lower)?
    } else {
        return Err(AnalysisError::UnsupportedFileType(filename.to_string()));
    };

    build_table(&headers, rows)
}

/// Read a comma- or tab-delimited file into text cells.
fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<(Vec<String>, Vec<Vec<RawCell>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .byte_headers()
        .map_err(|e| AnalysisError::parse(format!("cannot read header row: {e}")))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| AnalysisError::parse(format!("malformed record: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|cell| RawCell::Text(String::from_utf8_lossy(cell).into_owned()))
                .collect(),
        );
    }
    Ok((headers, rows))
}

/// Read the first sheet of an Excel workbook into typed cells.
fn read_spreadsheet(bytes: &[u8], lower: &str) -> Result<(Vec<String>, Vec<Vec<RawCell>>)> {
    let cursor = Cursor::new(bytes.to_vec());
    let range = if lower.ends_with(".xlsx") {
        let mut workbook = Xlsx::new(cursor)
            .map_err(|e| AnalysisError::parse(format!("cannot open xlsx workbook: {e}")))?;
        workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AnalysisError::parse("workbook has no sheets"))?
            .map_err(|e| AnalysisError::parse(format!("cannot read first sheet: {e}")))?
    } else {
        let mut workbook = Xls::new(cursor)
            .map_err(|e| AnalysisError::parse(format!("cannot open xls workbook: {e}")))?;
        workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AnalysisError::parse("workbook has no sheets"))?
            .map_err(|e| AnalysisError::parse(format!("cannot read first sheet: {e}")))?
    };

    let mut iter = range.rows();
    let headers = iter
        .next()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let rows = iter
        .map(|row| row.iter().map(to_raw_cell).collect())
        .collect();
    Ok((headers, rows))
}

fn to_raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => RawCell::Instant(dt),
            None => RawCell::Empty,
        },
        other => RawCell::Text(other.to_string()),
    }
}

/// Map headers to canonical fields and coerce rows into transactions.
fn build_table(headers: &[String], rows: Vec<Vec<RawCell>>) -> Result<TransactionTable> {
    let columns = map_columns(headers)?;
    let mut tally = DropTally::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut out: Vec<Transaction> = Vec::with_capacity(rows.len());
    let empty = RawCell::Empty;

    for row in &rows {
        let cell = |idx: usize| row.get(idx).unwrap_or(&empty);

        let sender = cell_to_text(cell(columns.sender));
        let receiver = cell_to_text(cell(columns.receiver));
        if sender.is_empty() || receiver.is_empty() {
            tally.empty_endpoint += 1;
            continue;
        }
        if sender == receiver {
            tally.self_loop += 1;
            continue;
        }

        let Some(amount) = cell_to_amount(cell(columns.amount)) else {
            tally.bad_amount += 1;
            continue;
        };
        let Some(timestamp) = cell_to_timestamp(cell(columns.timestamp)) else {
            tally.bad_timestamp += 1;
            continue;
        };

        let transaction_id = cell_to_text(cell(columns.transaction_id));
        if transaction_id.is_empty() || !seen_ids.insert(transaction_id.clone()) {
            tally.duplicate_id += 1;
            continue;
        }

        out.push(Transaction {
            transaction_id,
            sender,
            receiver,
            amount,
            timestamp,
        });
    }

    if tally.total() > 0 {
        tracing::debug!(
            dropped = tally.total(),
            bad_amount = tally.bad_amount,
            bad_timestamp = tally.bad_timestamp,
            empty_endpoint = tally.empty_endpoint,
            self_loop = tally.self_loop,
            duplicate_id = tally.duplicate_id,
            "dropped invalid rows during ingestion"
        );
    }

    if out.is_empty() {
        return Err(AnalysisError::NoValidTransactions);
    }
    Ok(TransactionTable::new(out))
}

/// Resolved column indices for the canonical fields.
struct ColumnMap {
    transaction_id: usize,
    sender: usize,
    receiver: usize,
    amount: usize,
    timestamp: usize,
}

/// Resolve headers against the alias table. Columns are scanned left to
/// right; the first column matching a canonical field claims it.
fn map_columns(headers: &[String]) -> Result<ColumnMap> {
    let mut resolved: [Option<usize>; 5] = [None; 5];

    for (idx, header) in headers.iter().enumerate() {
        let name = header.trim().to_lowercase();
        for (slot, (canonical, aliases)) in COLUMN_ALIASES.iter().enumerate() {
            let matches = name == *canonical || aliases.contains(&name.as_str());
            if matches && resolved[slot].is_none() {
                resolved[slot] = Some(idx);
                break;
            }
        }
    }

    let missing: Vec<String> = CANONICAL_FIELDS
        .iter()
        .zip(resolved.iter())
        .filter(|(_, r)| r.is_none())
        .map(|(name, _)| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns(missing));
    }

    Ok(ColumnMap {
        transaction_id: resolved[0].unwrap_or(0),
        sender: resolved[1].unwrap_or(0),
        receiver: resolved[2].unwrap_or(0),
        amount: resolved[3].unwrap_or(0),
        timestamp: resolved[4].unwrap_or(0),
    })
}

fn cell_to_text(cell: &RawCell) -> String {
    match cell {
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        RawCell::Number(n) => n.to_string(),
        RawCell::Instant(dt) => dt.to_string(),
        RawCell::Empty => String::new(),
    }
}

fn cell_to_amount(cell: &RawCell) -> Option<f64> {
    let value = match cell {
        RawCell::Number(n) => Some(*n),
        RawCell::Text(s) => s.trim().parse::<f64>().ok(),
        RawCell::Instant(_) | RawCell::Empty => None,
    }?;
    (value.is_finite() && value > 0.0).then_some(value)
}

fn cell_to_timestamp(cell: &RawCell) -> Option<NaiveDateTime> {
    match cell {
        RawCell::Instant(dt) => Some(*dt),
        RawCell::Text(s) => parse_timestamp(s),
        RawCell::Number(_) | RawCell::Empty => None,
    }
}

/// Try the supported timestamp patterns in order.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
