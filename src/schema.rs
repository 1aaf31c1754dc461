use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const SALE_ID_HEADER: &str = "ID_Venta";
pub const DATE_HEADER: &str = "Fecha";
pub const COUNTRY_HEADER: &str = "País";
pub const AMOUNT_HEADER: &str = "Monto";
pub const CURRENCY_HEADER: &str = "Moneda";
pub const NORMALIZED_AMOUNT_HEADER: &str = "Monto_Normalizado";

/// Columns every uploaded file must carry on its first row.
pub const REQUIRED_HEADERS: [&str; 5] = [
    SALE_ID_HEADER,
    DATE_HEADER,
    COUNTRY_HEADER,
    AMOUNT_HEADER,
    CURRENCY_HEADER,
];

/// Currency every amount is normalized into.
pub const TARGET_CURRENCY: &str = "USD";

/// An untyped row as returned by the file ingestion service.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Extra columns that are carried along but never interpreted.
pub type ExtraColumns = serde_json::Map<String, serde_json::Value>;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SaleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleId::Number(n) => write!(f, "{}", n),
            SaleId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(rename = "ID_Venta")]
    pub sale_id: SaleId,

    /// Kept as the uploaded text; see [`SaleRecord::parsed_date`].
    #[serde(rename = "Fecha", deserialize_with = "deserialize_cell_text")]
    pub date: String,

    #[serde(rename = "País", deserialize_with = "deserialize_cell_text")]
    pub country: String,

    #[serde(rename = "Monto")]
    pub amount: Amount,

    #[serde(rename = "Moneda", deserialize_with = "deserialize_cell_text")]
    pub currency: String,

    #[serde(flatten)]
    pub extra: ExtraColumns,
}

impl SaleRecord {
    pub fn new(
        sale_id: SaleId,
        date: impl Into<String>,
        country: impl Into<String>,
        amount: impl Into<Amount>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            sale_id,
            date: date.into(),
            country: country.into(),
            amount: amount.into(),
            currency: currency.into(),
            extra: ExtraColumns::new(),
        }
    }

    /// Uppercased currency code, or `None` when the field is blank.
    pub fn currency_code(&self) -> Option<String> {
        let code = self.currency.trim();
        if code.is_empty() {
            None
        } else {
            Some(code.to_uppercase())
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let text = self.date.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    }
}

/// An uploaded amount, kept exactly as the ingestion service returned it.
/// Parsing is left to whoever needs a number; a value such as "1.200,50" is
/// passed through to the normalization service untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl Amount {
    /// Numeric value for plain numbers and dot-decimal strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => n.as_f64(),
            Amount::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Amount::Number)
            .unwrap_or_else(|| Amount::Text(value.to_string()))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Number(value.into())
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{}", n),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

/// A sale after remote normalization. The original `currency` is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSaleRecord {
    #[serde(flatten)]
    pub sale: SaleRecord,

    #[serde(rename = "Monto_Normalizado", deserialize_with = "deserialize_amount")]
    pub normalized_amount: f64,
}

impl NormalizedSaleRecord {
    pub fn new(sale: SaleRecord, normalized_amount: f64) -> Self {
        Self {
            sale,
            normalized_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    #[serde(rename = "Pais")]
    pub country: String,

    #[serde(rename = "Total_Ventas_USD", deserialize_with = "deserialize_amount")]
    pub total_normalized_amount: f64,
}

/// Envelope shared by every remote service: `{ "message": "Success", "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub message: String,
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub const SUCCESS: &'static str = "Success";

    pub fn success(data: T) -> Self {
        Self {
            message: Self::SUCCESS.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.message == Self::SUCCESS
    }
}

/// Accepts amounts as JSON numbers or numeric strings ("1200.50").
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount '{}': {}", s, e))),
    }
}

/// Text columns also accept numbers and booleans, stringified. Only a null
/// or absent value is refused.
fn deserialize_cell_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Text(s)) => Ok(s),
        Some(Cell::Number(n)) => Ok(n.to_string()),
        Some(Cell::Bool(b)) => Ok(b.to_string()),
        None => Err(serde::de::Error::custom("value is null")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sale_record_keeps_extra_columns() {
        let value = json!({
            "ID_Venta": 7,
            "Fecha": "2024-03-01",
            "País": "CO",
            "Monto": "150.25",
            "Moneda": "cop",
            "Vendedor": "Ana"
        });

        let record: SaleRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.sale_id, SaleId::Number(7));
        assert_eq!(record.amount, Amount::Text("150.25".to_string()));
        assert_eq!(record.amount.as_f64(), Some(150.25));
        assert_eq!(record.currency_code().as_deref(), Some("COP"));
        assert_eq!(record.extra.get("Vendedor"), Some(&json!("Ana")));
    }

    #[test]
    fn test_null_required_field_is_rejected() {
        let value = json!({
            "ID_Venta": "A-1",
            "Fecha": "2024-03-01",
            "País": null,
            "Monto": 10,
            "Moneda": "USD"
        });

        assert!(serde_json::from_value::<SaleRecord>(value).is_err());
    }

    #[test]
    fn test_malformed_amount_is_kept_verbatim() {
        let value = json!({
            "ID_Venta": 3,
            "Fecha": 45292,
            "País": "ES",
            "Monto": "1.200,50",
            "Moneda": "EUR"
        });

        let record: SaleRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.amount.as_f64(), None);
        assert_eq!(record.date, "45292");

        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["Monto"], json!("1.200,50"));
    }

    #[test]
    fn test_integer_amount_round_trips_unchanged() {
        let value = json!({
            "ID_Venta": 4,
            "Fecha": "2024-01-01",
            "País": "US",
            "Monto": 100,
            "Moneda": "USD"
        });

        let record: SaleRecord = serde_json::from_value(value).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap()["Monto"], json!(100));
        assert_eq!(record.amount.to_string(), "100");
    }

    #[test]
    fn test_normalized_record_field_order() {
        let record = NormalizedSaleRecord::new(
            SaleRecord::new(SaleId::Text("A-1".into()), "2024-03-01", "MX", 100.0, "MXN"),
            5.9,
        );

        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["ID_Venta", "Fecha", "País", "Monto", "Moneda", "Monto_Normalizado"]
        );
    }

    #[test]
    fn test_normalized_record_does_not_leak_into_extras() {
        let value = json!({
            "ID_Venta": 1,
            "Fecha": "2024-01-05",
            "País": "US",
            "Monto": 20,
            "Moneda": "USD",
            "Monto_Normalizado": 20
        });

        let record: NormalizedSaleRecord = serde_json::from_value(value).unwrap();
        assert!(record.sale.extra.is_empty());
        assert!((record.normalized_amount - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parsed_date_formats() {
        let mut record = SaleRecord::new(SaleId::Number(1), "2024-02-29", "US", 1.0, "USD");
        assert_eq!(record.parsed_date(), NaiveDate::from_ymd_opt(2024, 2, 29));

        record.date = "05/01/2024".to_string();
        assert_eq!(record.parsed_date(), NaiveDate::from_ymd_opt(2024, 1, 5));

        record.date = "yesterday".to_string();
        assert_eq!(record.parsed_date(), None);
    }

    #[test]
    fn test_service_response_without_data() {
        let response: ServiceResponse<Vec<CountrySummary>> =
            serde_json::from_value(json!({ "message": "Error" })).unwrap();
        assert!(!response.is_success());
        assert!(response.data.is_none());
    }
}
