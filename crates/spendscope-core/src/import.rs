//! Transaction file loading
//!
//! Converts JSON or CSV expense exports into a validated
//! [`TransactionHistory`]. Every malformed record is rejected here with an
//! error naming it, so the analysis components only ever see clean data.
//!
//! JSON accepts `{"transactions": [...]}` or a bare array. CSV expects a
//! header row with `title,amount,date,merchant,category` and an optional
//! `id` column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionHistory};

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    /// `.csv` is CSV, anything else is treated as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }
}

/// Load a history from a file, choosing the format by extension
pub fn load_history(path: &Path) -> Result<TransactionHistory> {
    let file = File::open(path)
        .map_err(|e| Error::Import(format!("Failed to open {}: {}", path.display(), e)))?;

    let history = match InputFormat::from_path(path) {
        InputFormat::Csv => parse_csv(file)?,
        InputFormat::Json => parse_json(file)?,
    };

    debug!(
        path = %path.display(),
        transactions = history.len(),
        "Loaded transaction history"
    );
    Ok(history)
}

/// Parse a JSON transaction list
pub fn parse_json<R: Read>(reader: R) -> Result<TransactionHistory> {
    let value: Value = serde_json::from_reader(reader)?;

    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("transactions") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::Import(
                    "Expected a \"transactions\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::Import(
                "Expected a JSON array or an object with \"transactions\"".to_string(),
            ))
        }
    };

    let transactions = records
        .iter()
        .enumerate()
        .map(|(i, record)| match record {
            Value::Object(obj) => json_record(i + 1, obj),
            _ => Err(Error::Import(format!("Record {} is not an object", i + 1))),
        })
        .collect::<Result<Vec<_>>>()?;

    TransactionHistory::new(transactions)
}

fn json_record(row: usize, obj: &Map<String, Value>) -> Result<Transaction> {
    let id = match obj.get("id") {
        None | Some(Value::Null) => format!("row-{}", row),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(Error::Import(format!("Record {}: invalid id {}", row, other)))
        }
    };

    let merchant = json_str(obj, "merchant")
        .ok_or_else(|| Error::Import(format!("Record {}: missing merchant", id)))?;

    let date_str = json_str(obj, "date")
        .ok_or_else(|| Error::Import(format!("Record {}: missing date", id)))?;
    let date = parse_date(&date_str).map_err(|e| record_error(&id, e))?;

    let amount = match obj.get("amount") {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            Error::Import(format!("Record {}: amount out of range", id))
        })?,
        Some(Value::String(s)) => parse_amount(s).map_err(|e| record_error(&id, e))?,
        _ => return Err(Error::Import(format!("Record {}: missing amount", id))),
    };

    let category = json_str(obj, "category").or_else(|| json_str(obj, "categoryId"));

    Ok(Transaction {
        id,
        amount,
        date,
        merchant,
        title: json_str(obj, "title"),
        category,
    })
}

/// Non-empty string field; numbers are accepted and stringified
fn json_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn record_error(id: &str, err: Error) -> Error {
    match err {
        Error::Import(msg) => Error::Import(format!("Record {}: {}", id, msg)),
        other => other,
    }
}

/// Column positions resolved from a CSV header row
struct CsvColumns {
    id: Option<usize>,
    title: Option<usize>,
    amount: usize,
    date: usize,
    merchant: usize,
    category: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |name: &str| {
            find(&[name]).ok_or_else(|| Error::Import(format!("Missing CSV column: {}", name)))
        };

        Ok(Self {
            id: find(&["id"]),
            title: find(&["title"]),
            amount: require("amount")?,
            date: require("date")?,
            merchant: require("merchant")?,
            category: find(&["category", "categoryId"]),
        })
    }
}

/// Parse a CSV expense export
pub fn parse_csv<R: Read>(reader: R) -> Result<TransactionHistory> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = CsvColumns::from_headers(&headers)?;
    let mut transactions = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;

        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
        };

        let id = field(columns.id).unwrap_or_else(|| format!("row-{}", row));

        let merchant = field(Some(columns.merchant))
            .ok_or_else(|| Error::Import(format!("Record {}: missing merchant", id)))?;

        let date_str = field(Some(columns.date))
            .ok_or_else(|| Error::Import(format!("Record {}: missing date", id)))?;
        let date = parse_date(&date_str).map_err(|e| record_error(&id, e))?;

        let amount_str = field(Some(columns.amount))
            .ok_or_else(|| Error::Import(format!("Record {}: missing amount", id)))?;
        let amount = parse_amount(&amount_str).map_err(|e| record_error(&id, e))?;

        transactions.push(Transaction {
            id,
            amount,
            date,
            merchant,
            title: field(columns.title),
            category: field(columns.category),
        });
    }

    debug!("Parsed {} CSV transactions", transactions.len());
    TransactionHistory::new(transactions)
}

/// Parse a date string in one of the common export formats
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    // Try common date formats
    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%y", // 01/15/24
        "%m/%d/%Y", // 01/15/2024
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European, only when the day is > 12)
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    // Timestamps keep their calendar day
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))?;

    if !amount.is_finite() {
        return Err(Error::Import(format!("Amount is not finite: {}", s)));
    }
    Ok(amount)
}
