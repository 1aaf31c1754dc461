use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::ServiceConfig;
use crate::error::{Result, SalesError};
use crate::schema::{CountrySummary, NormalizedSaleRecord, RawRow, SaleRecord, ServiceResponse};
use crate::services::{FileIngestion, NormalizationService, PersistenceService, UploadFile};

const UPLOAD_PATH: &str = "fileProcess/upload";
const NORMALIZE_PATH: &str = "fileProcess/normalize-sales";
const SAVE_PATH: &str = "crudInfo/save-sales";
const HISTORY_PATH: &str = "crudInfo/normalized-sales";
const SUMMARY_PATH: &str = "crudInfo/summary-by-country";

/// reqwest-backed implementation of every remote collaborator.
#[derive(Clone)]
pub struct HttpSalesClient {
    client: Client,
    config: ServiceConfig,
}

impl HttpSalesClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        operation: &str,
        res: Response,
    ) -> Result<ServiceResponse<T>> {
        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await?;
            return Err(SalesError::Transport(format!(
                "{} failed (status {}): {}",
                operation, status, error_text
            )));
        }

        let body: ServiceResponse<T> = res.json().await?;
        debug!("{} replied with message '{}'", operation, body.message);
        Ok(body)
    }
}

#[async_trait]
impl FileIngestion for HttpSalesClient {
    async fn upload(&self, file: &UploadFile) -> Result<ServiceResponse<Vec<RawRow>>> {
        let mime_type = mime_guess::from_path(&file.file_name)
            .first_or_octet_stream()
            .to_string();
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&mime_type)?;
        let form = Form::new().part("file", part);

        let res = self
            .client
            .post(self.config.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        self.read_envelope("Upload", res).await
    }
}

#[async_trait]
impl NormalizationService for HttpSalesClient {
    async fn normalize(
        &self,
        records: &[SaleRecord],
        target_currency: &str,
    ) -> Result<ServiceResponse<Vec<NormalizedSaleRecord>>> {
        let res = self
            .client
            .post(self.config.endpoint(NORMALIZE_PATH))
            .query(&[("target", target_currency)])
            .json(records)
            .send()
            .await?;
        self.read_envelope("Normalize", res).await
    }
}

#[async_trait]
impl PersistenceService for HttpSalesClient {
    async fn save(
        &self,
        records: &[NormalizedSaleRecord],
    ) -> Result<ServiceResponse<serde_json::Value>> {
        let res = self
            .client
            .post(self.config.endpoint(SAVE_PATH))
            .json(records)
            .send()
            .await?;
        self.read_envelope("Save", res).await
    }

    async fn summary(&self) -> Result<ServiceResponse<Vec<CountrySummary>>> {
        let res = self
            .client
            .get(self.config.endpoint(SUMMARY_PATH))
            .send()
            .await?;
        self.read_envelope("Summary", res).await
    }

    async fn normalized_sales(&self) -> Result<ServiceResponse<Vec<NormalizedSaleRecord>>> {
        let res = self
            .client
            .get(self.config.endpoint(HISTORY_PATH))
            .send()
            .await?;
        self.read_envelope("History", res).await
    }
}
