//! # Sales Normalizer
//!
//! Drives an uploaded CSV of sales through validation, remote currency
//! normalization, persistence and summary retrieval, and prepares the result
//! for charting and CSV re-export.
//!
//! ## Core Concepts
//!
//! - **Working buffer**: the records a session currently owns, raw until the
//!   normalization service succeeds, normalized afterwards
//! - **Confirmation gate**: uploads carrying any non-USD currency pause in
//!   `AwaitingCurrencyConfirmation` until the user confirms
//! - **Best-effort completion**: once normalization succeeds, persist and
//!   summarize are both attempted and the session is marked normalized even
//!   if either of them fails
//! - **Explicit state**: every step mutates a caller-owned [`WorkflowState`],
//!   so steps can be tested without any UI around them. A step that refuses
//!   to run returns `Err` and leaves the state untouched
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_normalizer::*;
//!
//! let config = ServiceConfig::from_env()?;
//! let client = HttpSalesClient::new(config)?;
//!
//! let uploader = UploadCoordinator::new(client.clone());
//! let orchestrator = NormalizationOrchestrator::new(client.clone(), client);
//!
//! let file = UploadFile::from_path("ventas.csv".as_ref())?;
//! let mut state = WorkflowState::new();
//! uploader.upload(&mut state, &file).await?;
//! if state.pending_confirmation {
//!     uploader.resolve_confirmation(&mut state, true)?;
//! }
//! orchestrator.run(&mut state).await?;
//!
//! let charts = state.charts(&ChartTheme::default());
//! let path = export_to_dir(&mut state, "out".as_ref())?;
//! ```

pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod notification;
pub mod orchestrator;
pub mod schema;
pub mod services;
pub mod state;
pub mod upload;
pub mod validation;

#[cfg(feature = "http")]
pub mod client;

pub use chart::{
    bar_chart, line_chart, prepare_charts, sorted_by_date, ChartDescriptor, ChartTheme,
    SummaryCharts,
};
pub use config::ServiceConfig;
pub use error::{Result, SalesError};
pub use export::{export_to_dir, to_csv, EXPORT_FILE_NAME};
pub use notification::{Notification, Severity};
pub use orchestrator::NormalizationOrchestrator;
pub use schema::*;
pub use services::{FileIngestion, NormalizationService, PersistenceService, UploadFile};
pub use state::{SalesBuffer, WorkflowEvent, WorkflowPhase, WorkflowState};
pub use upload::UploadCoordinator;
pub use validation::{
    distinct_currencies, has_mixed_currencies, missing_headers, parse_sale_records,
    validate_csv_structure,
};

#[cfg(feature = "http")]
pub use client::HttpSalesClient;
