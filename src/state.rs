use crate::notification::Notification;
use crate::schema::{CountrySummary, NormalizedSaleRecord, SaleRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    Idle,
    Uploading,
    Validating,
    /// The last upload failed the structural check. Equivalent to `Idle`
    /// for the purpose of starting a new upload.
    Rejected,
    Validated,
    AwaitingCurrencyConfirmation,
    ReadyToNormalize,
    Normalizing,
    Persisting,
    Summarizing,
    Completed,
}

impl WorkflowPhase {
    /// Phases in which a remote call is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            WorkflowPhase::Uploading
                | WorkflowPhase::Validating
                | WorkflowPhase::Normalizing
                | WorkflowPhase::Persisting
                | WorkflowPhase::Summarizing
        )
    }
}

/// Progress signal emitted while the workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    UploadStarted { file_name: String },
    UploadFailed { reason: String },
    Validating { rows: usize },
    Rejected { reason: String },
    AwaitingConfirmation { currencies: Vec<String> },
    ReadyToNormalize,
    Normalizing { records: usize },
    Persisting,
    Summarizing,
    Finished,
}

/// The working buffer: raw records until normalization succeeds, normalized after.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SalesBuffer {
    #[default]
    Empty,
    Raw(Vec<SaleRecord>),
    Normalized(Vec<NormalizedSaleRecord>),
}

impl SalesBuffer {
    pub fn len(&self) -> usize {
        match self {
            SalesBuffer::Empty => 0,
            SalesBuffer::Raw(records) => records.len(),
            SalesBuffer::Normalized(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session state for one upload-to-visualization run. Workflow steps mutate
/// it in place and leave it untouched when they refuse to run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: WorkflowPhase,
    pub buffer: SalesBuffer,
    pub summary: Vec<CountrySummary>,
    pub pending_confirmation: bool,
    pub loading: bool,
    /// Set once normalize, persist and summarize have all been attempted.
    pub normalized: bool,
    pub notifications: Vec<Notification>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            buffer: SalesBuffer::Empty,
            summary: Vec::new(),
            pending_confirmation: false,
            loading: false,
            normalized: false,
            notifications: Vec::new(),
        }
    }

    pub fn raw_records(&self) -> &[SaleRecord] {
        match &self.buffer {
            SalesBuffer::Raw(records) => records,
            _ => &[],
        }
    }

    pub fn normalized_records(&self) -> &[NormalizedSaleRecord] {
        match &self.buffer {
            SalesBuffer::Normalized(records) => records,
            _ => &[],
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        debug!(
            "Notification ({:?}): {}",
            notification.severity, notification.detail
        );
        self.notifications.push(notification);
    }

    /// Drains notifications so the presentation layer shows each one once.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn transition(&mut self, phase: WorkflowPhase) {
        debug!("Workflow phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

pub(crate) async fn send_event(progress: &Option<Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}
