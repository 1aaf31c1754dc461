use crate::error::{Result, SalesError};
use crate::schema::{RawRow, SaleRecord, REQUIRED_HEADERS, TARGET_CURRENCY};
use std::collections::BTreeSet;

/// Structural check of an uploaded file: every required column must be a key
/// of the first row. Values are not inspected and extra columns are allowed.
pub fn validate_csv_structure(rows: &[RawRow]) -> bool {
    match rows.first() {
        Some(first) => REQUIRED_HEADERS
            .iter()
            .all(|header| first.contains_key(*header)),
        None => false,
    }
}

/// Required columns absent from the first row, in declaration order.
pub fn missing_headers(rows: &[RawRow]) -> Vec<&'static str> {
    match rows.first() {
        Some(first) => REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|header| !first.contains_key(*header))
            .collect(),
        None => REQUIRED_HEADERS.to_vec(),
    }
}

/// True when any record carries a currency other than the target one.
/// Blank currency fields are ignored; comparison is case-insensitive.
pub fn has_mixed_currencies(records: &[SaleRecord]) -> bool {
    let currencies = distinct_currencies(records);
    currencies.iter().any(|code| code != TARGET_CURRENCY)
}

pub fn distinct_currencies(records: &[SaleRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(SaleRecord::currency_code)
        .collect()
}

/// First required column that is absent or null in `row`.
fn first_missing_value(row: &RawRow) -> Option<&'static str> {
    REQUIRED_HEADERS
        .iter()
        .copied()
        .find(|header| row.get(*header).map_or(true, |value| value.is_null()))
}

/// Converts structurally valid rows into typed records. The first row with a
/// missing or null required field fails the whole batch with `MissingValue`;
/// a value of the wrong shape (an object, say) fails it with `InvalidRecord`.
/// Amounts are not parsed here.
pub fn parse_sale_records(rows: Vec<RawRow>) -> Result<Vec<SaleRecord>> {
    if !validate_csv_structure(&rows) {
        return Err(SalesError::InvalidStructure(missing_headers(&rows).join(", ")));
    }

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            if let Some(column) = first_missing_value(&row) {
                return Err(SalesError::MissingValue {
                    row: idx + 1,
                    column,
                });
            }
            serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| {
                SalesError::InvalidRecord {
                    row: idx + 1,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SaleId;
    use serde_json::json;

    fn row(value: serde_json::Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    fn full_row(currency: &str) -> RawRow {
        row(json!({
            "ID_Venta": 1,
            "Fecha": "2024-01-01",
            "País": "US",
            "Monto": 10.0,
            "Moneda": currency
        }))
    }

    fn record(currency: &str) -> SaleRecord {
        SaleRecord::new(SaleId::Number(1), "2024-01-01", "US", 10.0, currency)
    }

    #[test]
    fn test_empty_input_fails_closed() {
        assert!(!validate_csv_structure(&[]));
        assert_eq!(missing_headers(&[]).len(), 5);
    }

    #[test]
    fn test_each_missing_header_is_rejected() {
        for header in REQUIRED_HEADERS {
            let mut first = full_row("USD");
            first.remove(header);
            assert!(
                !validate_csv_structure(&[first.clone()]),
                "missing {} should fail",
                header
            );
            assert_eq!(missing_headers(&[first]), vec![header]);
        }
    }

    #[test]
    fn test_extra_columns_are_tolerated() {
        let mut first = full_row("USD");
        first.insert("Vendedor".to_string(), json!("Luis"));
        first.insert("Notas".to_string(), json!(null));
        assert!(validate_csv_structure(&[first]));
    }

    #[test]
    fn test_only_first_row_is_inspected() {
        let rows = vec![full_row("USD"), row(json!({ "Otra": 1 }))];
        assert!(validate_csv_structure(&rows));
    }

    #[test]
    fn test_uniform_usd_is_not_mixed() {
        let records = vec![record("USD"), record("usd"), record("Usd"), record("")];
        assert!(!has_mixed_currencies(&records));
    }

    #[test]
    fn test_single_eur_record_triggers_gate() {
        let mut records = vec![record("USD"), record("USD")];
        assert!(!has_mixed_currencies(&records));

        records.push(record("eur"));
        assert!(has_mixed_currencies(&records));
        assert_eq!(
            distinct_currencies(&records).into_iter().collect::<Vec<_>>(),
            vec!["EUR".to_string(), "USD".to_string()]
        );
    }

    #[test]
    fn test_uniform_non_usd_still_triggers_gate() {
        assert!(has_mixed_currencies(&[record("EUR"), record("eur")]));
    }

    #[test]
    fn test_no_currencies_is_not_mixed() {
        assert!(!has_mixed_currencies(&[]));
        assert!(!has_mixed_currencies(&[record("  ")]));
    }

    #[test]
    fn test_parse_rejects_null_field_with_row_number() {
        let mut second = full_row("USD");
        second.insert("Monto".to_string(), json!(null));

        let err = parse_sale_records(vec![full_row("USD"), second]).unwrap_err();
        match err {
            SalesError::MissingValue { row, column } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Monto");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_reports_absent_key_on_later_row() {
        let mut second = full_row("USD");
        second.remove("Fecha");

        let err = parse_sale_records(vec![full_row("USD"), second]).unwrap_err();
        assert!(matches!(
            err,
            SalesError::MissingValue { row: 2, column: "Fecha" }
        ));
    }

    #[test]
    fn test_unparseable_amount_is_passed_through() {
        let mut first = full_row("EUR");
        first.insert("Monto".to_string(), json!("1.200,50"));

        let records = parse_sale_records(vec![first]).unwrap();
        assert_eq!(records[0].amount.to_string(), "1.200,50");
        assert_eq!(records[0].amount.as_f64(), None);
    }

    #[test]
    fn test_wrongly_shaped_value_is_an_invalid_record() {
        let mut first = full_row("USD");
        first.insert("Moneda".to_string(), json!({ "code": "USD" }));

        let err = parse_sale_records(vec![first]).unwrap_err();
        assert!(matches!(err, SalesError::InvalidRecord { row: 1, .. }));
    }

    #[test]
    fn test_parse_reports_missing_columns() {
        let mut first = full_row("USD");
        first.remove("Moneda");

        let err = parse_sale_records(vec![first]).unwrap_err();
        assert!(matches!(err, SalesError::InvalidStructure(ref cols) if cols == "Moneda"));
    }
}
