/// Transaction log loading
/// Reads a delimited file and normalises each row to a calendar-date `Transaction`

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Deserialize;
use tracing::info;

use crate::models::Transaction;

/// Header names of the required columns
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnNames {
    pub created_at: String,
    pub full_value: String,
    pub discount_percent: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            created_at: "created_at".to_string(),
            full_value: "full_value".to_string(),
            discount_percent: "discount_percent".to_string(),
        }
    }
}

struct ColumnIndex {
    created_at: usize,
    full_value: usize,
    discount_percent: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, names: &ColumnNames) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("missing required column `{}`", name))
        };
        Ok(ColumnIndex {
            created_at: find(&names.created_at)?,
            full_value: find(&names.full_value)?,
            discount_percent: find(&names.discount_percent)?,
        })
    }
}

pub fn load_transactions(path: &Path, names: &ColumnNames) -> Result<Vec<Transaction>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open transaction log: {}", path.display()))?;
    let transactions = read_transactions(file, names)
        .with_context(|| format!("failed to parse transaction log: {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = transactions.len(),
        "loaded transactions"
    );
    Ok(transactions)
}

pub fn read_transactions<R: Read>(reader: R, names: &ColumnNames) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read header row")?.clone();
    let columns = ColumnIndex::resolve(&headers, names)?;

    let mut transactions = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = result.with_context(|| format!("malformed row at line {}", line))?;
        let transaction = parse_row(&record, &columns)
            .with_context(|| format!("invalid row at line {}", line))?;
        transactions.push(transaction);
    }

    Ok(transactions)
}

fn parse_row(record: &StringRecord, columns: &ColumnIndex) -> Result<Transaction> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let date = parse_date(field(columns.created_at))?;
    let full_value = parse_number("full_value", field(columns.full_value))?;
    let discount_percent = parse_number("discount_percent", field(columns.discount_percent))?;

    Ok(Transaction::new(date, full_value, discount_percent))
}

fn parse_number(column: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("`{}` is not a number: {:?}", column, raw))?;
    if !value.is_finite() {
        bail!("`{}` must be finite, got {:?}", column, raw);
    }
    Ok(value)
}

/// Accepts RFC 3339 timestamps, naive date-times and plain dates
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("unrecognised timestamp: {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reads_required_columns_in_any_order() {
        let data = "\
order_id,discount_percent,created_at,full_value
1,90,2025-01-01 10:15:00,100.0
2, 0 ,2025-01-02,250.5
3,45.5,2025-01-03T23:59:59Z,80
";
        let transactions = read_transactions(data.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(
            transactions,
            vec![
                Transaction::new(day(2025, 1, 1), 100.0, 90.0),
                Transaction::new(day(2025, 1, 2), 250.5, 0.0),
                Transaction::new(day(2025, 1, 3), 80.0, 45.5),
            ]
        );
    }

    #[test]
    fn test_custom_column_names() {
        let data = "data_tx,valor,desconto\n2025-02-01,10,5\n";
        let names = ColumnNames {
            created_at: "data_tx".to_string(),
            full_value: "valor".to_string(),
            discount_percent: "desconto".to_string(),
        };
        let transactions = read_transactions(data.as_bytes(), &names).unwrap();
        assert_eq!(transactions, vec![Transaction::new(day(2025, 2, 1), 10.0, 5.0)]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let data = "created_at,full_value\n2025-01-01,10\n";
        let err = read_transactions(data.as_bytes(), &ColumnNames::default()).unwrap_err();
        assert!(err.to_string().contains("discount_percent"));
    }

    #[test]
    fn test_bad_row_names_line() {
        let data = "created_at,full_value,discount_percent\n2025-01-01,10,0\n2025-01-02,ten,0\n";
        let err = read_transactions(data.as_bytes(), &ColumnNames::default()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-06-12").unwrap(), day(2025, 6, 12));
        assert_eq!(parse_date("2025-06-12 08:00:00.250").unwrap(), day(2025, 6, 12));
        assert_eq!(parse_date("2025-06-12T23:30:00-03:00").unwrap(), day(2025, 6, 12));
        assert!(parse_date("12/06/2025").is_err());
    }

    #[test]
    fn test_load_transactions_from_file() {
        let path = std::env::temp_dir().join(format!("promo-sim-ingest-{}.csv", std::process::id()));
        std::fs::write(&path, "created_at,full_value,discount_percent\n2025-01-01,1,2\n").unwrap();
        let transactions = load_transactions(&path, &ColumnNames::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(transactions.len(), 1);
    }
}
