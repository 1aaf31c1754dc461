//! Contracts of the remote collaborators the workflow drives.
//!
//! Every call resolves to the shared `{ message, data }` envelope. A transport
//! failure is an `Err`; a reply whose message is not `"Success"` is an `Ok`
//! carrying that message, and the caller decides what it means.

use async_trait::async_trait;

use crate::error::{Result, SalesError};
use crate::schema::{CountrySummary, NormalizedSaleRecord, RawRow, SaleRecord, ServiceResponse};

/// A file picked by the user, ready to be sent to the ingestion service.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SalesError::Config(format!("Invalid file name: {:?}", path)))?
            .to_string();
        let bytes = std::fs::read(path)?;
        Ok(Self { file_name, bytes })
    }
}

#[async_trait]
pub trait FileIngestion: Send + Sync {
    /// Uploads a CSV and returns its rows as parsed by the service.
    async fn upload(&self, file: &UploadFile) -> Result<ServiceResponse<Vec<RawRow>>>;
}

#[async_trait]
pub trait NormalizationService: Send + Sync {
    async fn normalize(
        &self,
        records: &[SaleRecord],
        target_currency: &str,
    ) -> Result<ServiceResponse<Vec<NormalizedSaleRecord>>>;
}

#[async_trait]
pub trait PersistenceService: Send + Sync {
    /// The reply payload, if any, is not interpreted.
    async fn save(
        &self,
        records: &[NormalizedSaleRecord],
    ) -> Result<ServiceResponse<serde_json::Value>>;

    /// Per-country totals over everything persisted so far.
    async fn summary(&self) -> Result<ServiceResponse<Vec<CountrySummary>>>;

    /// Every normalized sale persisted so far.
    async fn normalized_sales(&self) -> Result<ServiceResponse<Vec<NormalizedSaleRecord>>>;
}

/// Unwraps a successful envelope, turning a non-success message or a missing
/// payload into an error tagged with the service name.
pub(crate) fn expect_data<T>(service: &'static str, response: ServiceResponse<T>) -> Result<T> {
    if !response.is_success() {
        return Err(SalesError::ServiceRejected {
            service,
            message: response.message,
        });
    }
    response.data.ok_or(SalesError::MissingData(service))
}

pub(crate) fn expect_success<T>(service: &'static str, response: ServiceResponse<T>) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(SalesError::ServiceRejected {
            service,
            message: response.message,
        })
    }
}
