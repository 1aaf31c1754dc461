use log::{error, info, warn};
use tokio::sync::mpsc::Sender;

use crate::error::{Result, SalesError};
use crate::notification::Notification;
use crate::schema::{CountrySummary, NormalizedSaleRecord, TARGET_CURRENCY};
use crate::services::{expect_data, expect_success, NormalizationService, PersistenceService};
use crate::state::{send_event, SalesBuffer, WorkflowEvent, WorkflowPhase, WorkflowState};

/// Sequences normalize -> persist -> summarize over a validated buffer.
///
/// Failure policy per step:
/// - normalize: abort, keep the raw buffer and stay `ReadyToNormalize`.
/// - persist: report and carry on; the summary covers all persisted history.
/// - summarize: report and keep the previous summary.
pub struct NormalizationOrchestrator<N, P> {
    normalizer: N,
    persistence: P,
    progress: Option<Sender<WorkflowEvent>>,
}

impl<N: NormalizationService, P: PersistenceService> NormalizationOrchestrator<N, P> {
    pub fn new(normalizer: N, persistence: P) -> Self {
        Self {
            normalizer,
            persistence,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Sender<WorkflowEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Runs the three remote steps. Outside `ReadyToNormalize`, or without a
    /// raw buffer, `InvalidPhase` is returned and `state` is left as it was.
    pub async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        if state.phase != WorkflowPhase::ReadyToNormalize {
            return Err(SalesError::InvalidPhase {
                expected: "ReadyToNormalize",
                actual: state.phase,
            });
        }
        let records = match std::mem::take(&mut state.buffer) {
            SalesBuffer::Raw(records) => records,
            other => {
                state.buffer = other;
                return Err(SalesError::InvalidPhase {
                    expected: "a validated raw buffer",
                    actual: state.phase,
                });
            }
        };

        state.loading = true;
        state.transition(WorkflowPhase::Normalizing);
        send_event(
            &self.progress,
            WorkflowEvent::Normalizing {
                records: records.len(),
            },
        )
        .await;
        info!(
            "Normalizing {} sales into {}",
            records.len(),
            TARGET_CURRENCY
        );

        let normalized = self
            .normalizer
            .normalize(&records, TARGET_CURRENCY)
            .await
            .and_then(|response| expect_data("Normalization", response));

        let normalized = match normalized {
            Ok(normalized) => normalized,
            Err(e) => {
                error!("Normalization failed: {}", e);
                state.buffer = SalesBuffer::Raw(records);
                state.notify(Notification::error(
                    "The sales could not be normalized. Please try again.",
                ));
                state.loading = false;
                state.transition(WorkflowPhase::ReadyToNormalize);
                return Ok(());
            }
        };

        state.buffer = SalesBuffer::Normalized(normalized);

        state.transition(WorkflowPhase::Persisting);
        send_event(&self.progress, WorkflowEvent::Persisting).await;
        let saved = self.persist(state.normalized_records()).await;
        match saved {
            Ok(()) => {
                state.notify(Notification::success(
                    "The normalized sales were saved successfully.",
                ));
            }
            Err(e) => {
                // A failed save must not block the summary refresh.
                warn!("Saving normalized sales failed, continuing: {}", e);
                state.notify(Notification::error(
                    "There was a problem saving the normalized sales.",
                ));
            }
        }

        state.transition(WorkflowPhase::Summarizing);
        send_event(&self.progress, WorkflowEvent::Summarizing).await;
        match self.fetch_summary().await {
            Ok(summary) => {
                info!("Loaded sales summary for {} countries", summary.len());
                state.summary = summary;
            }
            Err(e) => {
                error!("Fetching the sales summary failed: {}", e);
                state.notify(Notification::error("The sales summary could not be loaded."));
            }
        }

        state.normalized = true;
        state.loading = false;
        state.transition(WorkflowPhase::Completed);
        send_event(&self.progress, WorkflowEvent::Finished).await;

        Ok(())
    }

    /// Rebuilds a session from previously persisted data, without uploading.
    /// Each fetch is independent; a failed one keeps its current value.
    /// Refused while a remote call is in flight and while an upload waits at
    /// the currency gate, so a pending buffer is never replaced.
    pub async fn load_history(&self, state: &mut WorkflowState) -> Result<()> {
        if state.phase.is_in_flight() {
            return Err(SalesError::InvalidPhase {
                expected: "no remote call in flight",
                actual: state.phase,
            });
        }
        if state.phase == WorkflowPhase::AwaitingCurrencyConfirmation {
            return Err(SalesError::InvalidPhase {
                expected: "no upload awaiting currency confirmation",
                actual: state.phase,
            });
        }

        state.loading = true;

        let history = self
            .persistence
            .normalized_sales()
            .await
            .and_then(|response| expect_data("Persistence", response));
        match history {
            Ok(records) => {
                info!("Loaded {} persisted sales", records.len());
                state.buffer = SalesBuffer::Normalized(records);
                state.pending_confirmation = false;
                state.normalized = true;
                state.transition(WorkflowPhase::Completed);
            }
            Err(e) => {
                error!("Fetching persisted sales failed: {}", e);
                state.notify(Notification::error(
                    "The persisted sales could not be loaded.",
                ));
            }
        }

        match self.fetch_summary().await {
            Ok(summary) => state.summary = summary,
            Err(e) => {
                error!("Fetching the sales summary failed: {}", e);
                state.notify(Notification::error("The sales summary could not be loaded."));
            }
        }

        state.loading = false;
        Ok(())
    }

    async fn persist(&self, records: &[NormalizedSaleRecord]) -> Result<()> {
        let response = self.persistence.save(records).await?;
        expect_success("Persistence", response)
    }

    async fn fetch_summary(&self) -> Result<Vec<CountrySummary>> {
        let response = self.persistence.summary().await?;
        expect_data("Summary", response)
    }
}
