use log::{error, info, warn};
use tokio::sync::mpsc::Sender;

use crate::error::{Result, SalesError};
use crate::notification::Notification;
use crate::schema::REQUIRED_HEADERS;
use crate::services::{expect_data, FileIngestion, UploadFile};
use crate::state::{send_event, SalesBuffer, WorkflowEvent, WorkflowPhase, WorkflowState};
use crate::validation::{distinct_currencies, has_mixed_currencies, parse_sale_records};

/// Drives a file from selection to either rejection or a validated buffer,
/// pausing at the currency gate when the upload mixes currencies.
pub struct UploadCoordinator<F> {
    ingestion: F,
    progress: Option<Sender<WorkflowEvent>>,
}

impl<F: FileIngestion> UploadCoordinator<F> {
    pub fn new(ingestion: F) -> Self {
        Self {
            ingestion,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Sender<WorkflowEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Uploads `file` and validates the returned rows.
    ///
    /// Remote and validation failures are resolved into `state`: a failed
    /// upload goes back to `Idle` with no buffer, a structurally invalid file
    /// ends in `Rejected` with an error notification. `Err` is only returned
    /// when another step is still in flight, and then `state` is untouched.
    pub async fn upload(&self, state: &mut WorkflowState, file: &UploadFile) -> Result<()> {
        if state.phase.is_in_flight() {
            return Err(SalesError::InvalidPhase {
                expected: "no remote call in flight",
                actual: state.phase,
            });
        }

        info!("Uploading sales file {}", file.file_name);
        state.buffer = SalesBuffer::Empty;
        state.pending_confirmation = false;
        state.normalized = false;
        state.loading = true;
        state.transition(WorkflowPhase::Uploading);
        send_event(
            &self.progress,
            WorkflowEvent::UploadStarted {
                file_name: file.file_name.clone(),
            },
        )
        .await;

        let uploaded = self
            .ingestion
            .upload(file)
            .await
            .and_then(|response| expect_data("File ingestion", response));

        let rows = match uploaded {
            Ok(rows) => rows,
            Err(e) => {
                error!("Upload of {} failed: {}", file.file_name, e);
                state.loading = false;
                state.transition(WorkflowPhase::Idle);
                send_event(
                    &self.progress,
                    WorkflowEvent::UploadFailed {
                        reason: e.to_string(),
                    },
                )
                .await;
                return Ok(());
            }
        };

        state.transition(WorkflowPhase::Validating);
        send_event(&self.progress, WorkflowEvent::Validating { rows: rows.len() }).await;

        let records = match parse_sale_records(rows) {
            Ok(records) => records,
            Err(e) => {
                warn!("Rejected {}: {}", file.file_name, e);
                state.notify(Notification::error(rejection_detail(&e)));
                state.loading = false;
                state.transition(WorkflowPhase::Rejected);
                send_event(
                    &self.progress,
                    WorkflowEvent::Rejected {
                        reason: e.to_string(),
                    },
                )
                .await;
                return Ok(());
            }
        };

        state.transition(WorkflowPhase::Validated);
        info!("Validated {} sales from {}", records.len(), file.file_name);

        let mixed = has_mixed_currencies(&records);
        let currencies: Vec<String> = distinct_currencies(&records).into_iter().collect();
        state.buffer = SalesBuffer::Raw(records);
        state.loading = false;

        if mixed {
            info!("Upload mixes currencies {:?}, waiting for confirmation", currencies);
            state.pending_confirmation = true;
            state.transition(WorkflowPhase::AwaitingCurrencyConfirmation);
            send_event(
                &self.progress,
                WorkflowEvent::AwaitingConfirmation { currencies },
            )
            .await;
        } else {
            state.transition(WorkflowPhase::ReadyToNormalize);
            send_event(&self.progress, WorkflowEvent::ReadyToNormalize).await;
        }

        Ok(())
    }

    /// Answers the currency gate. Declining leaves the workflow paused with
    /// its buffer intact so the user can still confirm later.
    pub fn resolve_confirmation(&self, state: &mut WorkflowState, accepted: bool) -> Result<()> {
        if state.phase != WorkflowPhase::AwaitingCurrencyConfirmation {
            return Err(SalesError::InvalidPhase {
                expected: "AwaitingCurrencyConfirmation",
                actual: state.phase,
            });
        }

        if accepted {
            state.pending_confirmation = false;
            state.transition(WorkflowPhase::ReadyToNormalize);
        }
        Ok(())
    }
}

fn rejection_detail(err: &SalesError) -> String {
    match err {
        SalesError::MissingValue { row, column } => {
            format!("Row {} is missing a value for the column {}.", row, column)
        }
        SalesError::InvalidRecord { row, reason } => {
            format!("Row {} contains a malformed value: {}", row, reason)
        }
        _ => format!(
            "The file structure is not valid. Make sure it contains the columns: {}.",
            REQUIRED_HEADERS.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawRow, ServiceResponse};
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticIngestion(Option<ServiceResponse<Vec<RawRow>>>);

    #[async_trait]
    impl FileIngestion for StaticIngestion {
        async fn upload(&self, _file: &UploadFile) -> Result<ServiceResponse<Vec<RawRow>>> {
            self.0
                .clone()
                .ok_or_else(|| SalesError::Transport("connection refused".to_string()))
        }
    }

    fn rows(currencies: &[&str]) -> Vec<RawRow> {
        currencies
            .iter()
            .enumerate()
            .map(|(i, currency)| {
                json!({
                    "ID_Venta": i + 1,
                    "Fecha": "2024-05-01",
                    "País": "CO",
                    "Monto": "100",
                    "Moneda": currency
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect()
    }

    fn file() -> UploadFile {
        UploadFile::new("ventas.csv", b"ID_Venta,Fecha,Pais,Monto,Moneda\n".to_vec())
    }

    #[tokio::test]
    async fn test_transport_failure_returns_to_idle() {
        let coordinator = UploadCoordinator::new(StaticIngestion(None));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();

        assert_eq!(state.phase, WorkflowPhase::Idle);
        assert!(state.buffer.is_empty());
        assert!(!state.loading);
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_message_is_an_upload_failure() {
        let coordinator =
            UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::failure("Bad file"))));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();

        assert_eq!(state.phase, WorkflowPhase::Idle);
        assert!(state.buffer.is_empty());
    }

    #[tokio::test]
    async fn test_decline_keeps_gate_paused() {
        let coordinator = UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::success(
            rows(&["USD", "EUR"]),
        ))));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();
        assert_eq!(state.phase, WorkflowPhase::AwaitingCurrencyConfirmation);

        coordinator.resolve_confirmation(&mut state, false).unwrap();
        assert_eq!(state.phase, WorkflowPhase::AwaitingCurrencyConfirmation);
        assert!(state.pending_confirmation);
        assert_eq!(state.raw_records().len(), 2);

        coordinator.resolve_confirmation(&mut state, true).unwrap();
        assert_eq!(state.phase, WorkflowPhase::ReadyToNormalize);
        assert!(!state.pending_confirmation);
    }

    #[tokio::test]
    async fn test_confirmation_outside_gate_is_rejected() {
        let coordinator = UploadCoordinator::new(StaticIngestion(None));
        let mut state = WorkflowState::new();
        let err = coordinator.resolve_confirmation(&mut state, true).unwrap_err();
        assert!(matches!(err, SalesError::InvalidPhase { .. }));
        assert_eq!(state.phase, WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn test_upload_while_in_flight_is_refused() {
        let coordinator = UploadCoordinator::new(StaticIngestion(None));
        let mut state = WorkflowState::new();
        state.phase = WorkflowPhase::Normalizing;
        state.buffer = SalesBuffer::Raw(Vec::new());
        state.loading = true;

        assert!(coordinator.upload(&mut state, &file()).await.is_err());
        assert_eq!(state.phase, WorkflowPhase::Normalizing);
        assert!(matches!(state.buffer, SalesBuffer::Raw(_)));
        assert!(state.loading);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_values_are_reported_differently() {
        let mut missing = rows(&["USD"]);
        missing[0].insert("País".to_string(), json!(null));
        let coordinator =
            UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::success(missing))));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();

        assert_eq!(state.phase, WorkflowPhase::Rejected);
        assert_eq!(
            state.notifications[0].detail,
            "Row 1 is missing a value for the column País."
        );

        let mut malformed = rows(&["USD"]);
        malformed[0].insert("Fecha".to_string(), json!(["2024", "05"]));
        let coordinator =
            UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::success(malformed))));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();

        assert_eq!(state.phase, WorkflowPhase::Rejected);
        assert!(state.notifications[0]
            .detail
            .starts_with("Row 1 contains a malformed value"));
    }

    #[tokio::test]
    async fn test_locale_formatted_amount_reaches_the_gate() {
        let mut uploaded = rows(&["EUR"]);
        uploaded[0].insert("Monto".to_string(), json!("1.200,50"));
        let coordinator =
            UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::success(uploaded))));
        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();

        assert_eq!(state.phase, WorkflowPhase::AwaitingCurrencyConfirmation);
        assert!(state.notifications.is_empty());
        assert_eq!(state.raw_records()[0].amount.to_string(), "1.200,50");
    }

    #[tokio::test]
    async fn test_progress_events_for_mixed_upload() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let coordinator = UploadCoordinator::new(StaticIngestion(Some(ServiceResponse::success(
            rows(&["usd", "cop"]),
        ))))
        .with_progress(tx);

        let mut state = WorkflowState::new();
        coordinator.upload(&mut state, &file()).await.unwrap();
        drop(coordinator);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                WorkflowEvent::UploadStarted {
                    file_name: "ventas.csv".to_string()
                },
                WorkflowEvent::Validating { rows: 2 },
                WorkflowEvent::AwaitingConfirmation {
                    currencies: vec!["COP".to_string(), "USD".to_string()]
                },
            ]
        );
    }
}
