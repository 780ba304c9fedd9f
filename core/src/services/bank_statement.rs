//! Normalized bank statement parsing
//!
//! The core consumes bank transactions in one normalized shape; bank- and
//! provider-specific column mappings live outside. This module parses the
//! normalized CSV layout those mappings produce, tolerating the encodings
//! and number formats Dutch bank exports actually use.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::interfaces::NormalizedBankTransaction;

const REQUIRED_COLUMNS: [&str; 3] = ["booking_date", "amount", "description"];

fn decode_to_string(content: &[u8]) -> String {
    // Bank exports are UTF-8 at best, Windows-1252 otherwise.
    let text = match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(content);
            cow.into_owned()
        }
    };
    text.trim_start_matches('\u{feff}').replace('\r', "")
}

/// Parse an amount in either European ("1.234,56") or US ("1,234.56")
/// format, including plain decimals.
pub fn parse_amount(value: &str) -> Result<Decimal> {
    let value = value.trim().replace('\u{a0}', "").replace(' ', "");
    if value.is_empty() {
        return Err(anyhow!("empty amount"));
    }

    let normalized = match (value.rfind(','), value.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European: dot thousands, comma decimal
                value.replace('.', "").replace(',', ".")
            } else {
                // US: comma thousands, dot decimal
                value.replace(',', "")
            }
        }
        (Some(_), None) => value.replace(',', "."),
        _ => value,
    };

    Decimal::from_str(&normalized).map_err(|e| anyhow!("invalid amount '{}': {}", normalized, e))
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    Err(anyhow!("unparseable date '{}'", value))
}

/// Parse a normalized statement CSV into transactions. `booking_date`,
/// `amount` and `description` are required columns; `date` is accepted as
/// an alias for `booking_date`.
pub fn parse_normalized_csv(content: &[u8]) -> Result<Vec<NormalizedBankTransaction>> {
    let text = decode_to_string(content);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);

    let (Some(date_idx), Some(amount_idx), Some(description_idx)) = (
        column("booking_date").or_else(|| column("date")),
        column("amount"),
        column("description"),
    ) else {
        let missing: Vec<&str> = [
            (column("booking_date").or_else(|| column("date")), REQUIRED_COLUMNS[0]),
            (column("amount"), REQUIRED_COLUMNS[1]),
            (column("description"), REQUIRED_COLUMNS[2]),
        ]
        .into_iter()
        .filter_map(|(idx, name)| idx.is_none().then_some(name))
        .collect();
        return Err(anyhow!("missing required columns: {}", missing.join(", ")));
    };

    let currency_idx = column("currency");
    let name_idx = column("counterparty_name");
    let iban_idx = column("counterparty_iban");
    let reference_idx = column("reference");

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| record.get(i))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut transactions = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(raw_date) = record.get(date_idx).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        let booking_date = parse_date(raw_date)?;
        let amount = parse_amount(record.get(amount_idx).unwrap_or_default())?;
        let description = record
            .get(description_idx)
            .unwrap_or_default()
            .trim()
            .to_string();

        transactions.push(NormalizedBankTransaction {
            booking_date,
            amount,
            currency: field(&record, currency_idx).unwrap_or_else(|| "EUR".to_string()),
            counterparty_name: field(&record, name_idx),
            counterparty_iban: field(&record, iban_idx),
            description,
            reference: field(&record, reference_idx),
        });
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_european_amount_format() {
        assert_eq!(parse_amount("1.234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("-45,00").unwrap(), dec!(-45.00));
        assert_eq!(parse_amount("0,01").unwrap(), dec!(0.01));
    }

    #[test]
    fn parses_us_amount_format() {
        assert_eq!(parse_amount("1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("-45.00").unwrap(), dec!(-45.00));
        assert_eq!(parse_amount("850.50").unwrap(), dec!(850.50));
    }

    #[test]
    fn parses_common_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(parse_date("2024-02-01").unwrap(), expected);
        assert_eq!(parse_date("01-02-2024").unwrap(), expected);
        assert_eq!(parse_date("01/02/2024").unwrap(), expected);
        assert!(parse_date("02.01.2024").is_err());
    }

    #[test]
    fn parses_normalized_csv() {
        let csv = "booking_date,amount,currency,counterparty_name,counterparty_iban,description,reference\n\
                   2024-02-01,-45.00,EUR,Microsoft,NL91ABNA0417164300,Microsoft 365,MS-02\n\
                   2024-02-03,850.50,EUR,Client Corp,,Project XYZ invoice payment,REF-2024-045\n";

        let txs = parse_normalized_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, dec!(-45.00));
        assert_eq!(txs[0].reference.as_deref(), Some("MS-02"));
        assert_eq!(txs[1].amount, dec!(850.50));
        assert_eq!(txs[1].counterparty_iban, None);
    }

    #[test]
    fn accepts_date_column_alias() {
        let csv = "date,amount,description\n2024-03-05,12.50,Coffee\n";
        let txs = parse_normalized_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            txs[0].booking_date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(txs[0].currency, "EUR");
    }

    #[test]
    fn rejects_missing_required_columns() {
        let csv = "booking_date,description\n2024-03-05,Coffee\n";
        let err = parse_normalized_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn skips_blank_lines() {
        let csv = "booking_date,amount,description\n2024-03-05,12.50,Coffee\n,,\n";
        let txs = parse_normalized_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
    }
}
