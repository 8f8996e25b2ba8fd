use chrono::Utc;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::{AppError, SubmitError};
use crate::models::classify_types::{
    ClassificationRequest, ClassificationResult, InvertFlag, LogRecord,
};
use crate::models::workflow_types::{SelectionInfo, WorkflowSnapshot, WorkflowStatus};
use crate::services::classifier::client::{ClassifierTransport, ClassifyPayload};
use crate::services::history_log::HistoryLog;
use crate::services::image_probe;
use crate::services::preview_service::{PreviewHandle, PreviewRegistry};

const MSG_NO_FILE: &str = "Select an image first.";
const MSG_BUSY: &str = "A submission is already in progress.";
const MSG_SUBMITTING: &str = "Submitting...";
const MSG_DONE: &str = "Done";

struct ImageSelection {
    filename: String,
    bytes: Arc<Vec<u8>>,
    dimensions: Option<(u32, u32)>,
    preview: PreviewHandle,
}

struct WorkflowState {
    status: WorkflowStatus,
    message: Option<String>,
    invert: InvertFlag,
    selection: Option<ImageSelection>,
    result: Option<ClassificationResult>,
    // Bumped when a pick starts, when it lands, and on teardown; stale
    // picks and completions check it.
    generation: u64,
}

/// Clears the busy flag however `submit` ends, including when its future is
/// dropped mid-request.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
    state: Arc<Mutex<WorkflowState>>,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        if let Ok(mut state) = self.state.try_lock() {
            if state.generation == self.generation && state.status == WorkflowStatus::Submitting {
                state.status = WorkflowStatus::Idle;
                state.message = None;
            }
        }
    }
}

/// Drives one upload at a time: pick a file, set the flag, submit, record.
#[derive(Clone)]
pub struct SubmissionWorkflow {
    state: Arc<Mutex<WorkflowState>>,
    transport: Arc<dyn ClassifierTransport>,
    history: Arc<dyn HistoryLog>,
    previews: PreviewRegistry,
    config: Arc<AppConfig>,
    in_flight: Arc<AtomicBool>,
}

impl SubmissionWorkflow {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn ClassifierTransport>,
        history: Arc<dyn HistoryLog>,
        previews: PreviewRegistry,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorkflowState {
                status: WorkflowStatus::Idle,
                message: None,
                invert: InvertFlag::default(),
                selection: None,
                result: None,
                generation: 0,
            })),
            transport,
            history,
            previews,
            config: Arc::new(config.clone()),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub async fn select_path(&self, path: &Path) -> Result<WorkflowSnapshot, AppError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| AppError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        self.select_file(filename, bytes).await
    }

    /// Replaces the current selection. Undecodable images are accepted with
    /// unknown dimensions; a pick superseded by a newer one is discarded.
    pub async fn select_file(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<WorkflowSnapshot, AppError> {
        let ticket = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.generation
        };

        let bytes = Arc::new(bytes);
        let dimensions = image_probe::probe_dimensions(bytes.clone()).await;
        match dimensions {
            Some((w, h)) => debug!("Selected {} ({}x{})", filename, w, h),
            None => debug!("Selected {} (dimensions unknown)", filename),
        }
        let preview = self.previews.acquire(bytes.clone())?;

        let mut state = self.state.lock().await;
        if state.generation != ticket {
            debug!("Dropping superseded selection {}", filename);
            return Ok(self.snapshot_of(&state));
        }

        // A submit that started during the probe captured the pre-install
        // generation; moving past it keeps that completion off this pick.
        state.generation += 1;
        // The old selection's preview is released when it is dropped here.
        state.selection = Some(ImageSelection {
            filename,
            bytes,
            dimensions,
            preview,
        });
        state.status = WorkflowStatus::Idle;
        state.message = None;
        state.result = None;

        Ok(self.snapshot_of(&state))
    }

    pub async fn set_invert(&self, invert: bool) -> WorkflowSnapshot {
        let mut state = self.state.lock().await;
        state.invert = InvertFlag::from(invert);
        self.snapshot_of(&state)
    }

    /// Sends the current selection to the classifier and records the outcome.
    ///
    /// Validation failures touch neither the network nor the history. Every
    /// request that is actually sent produces exactly one history record.
    pub async fn submit(&self) -> Result<ClassificationResult, SubmitError> {
        let (payload, request, generation, _in_flight) = {
            let mut state = self.state.lock().await;
            if self.in_flight.load(Ordering::Acquire) {
                return Err(SubmitError::Validation(MSG_BUSY.to_string()));
            }

            state.status = WorkflowStatus::Validating;
            let checked = self.validate(&state);
            let (payload, request) = match checked {
                Ok(p) => p,
                Err(msg) => {
                    state.status = WorkflowStatus::Idle;
                    state.message = Some(msg.clone());
                    state.result = None;
                    return Err(SubmitError::Validation(msg));
                }
            };

            state.status = WorkflowStatus::Submitting;
            state.message = Some(MSG_SUBMITTING.to_string());
            state.result = None;
            self.in_flight.store(true, Ordering::Release);
            let guard = InFlightGuard {
                flag: self.in_flight.clone(),
                state: self.state.clone(),
                generation: state.generation,
            };
            (payload, request, state.generation, guard)
        };

        let started_at = Utc::now();
        info!(
            "Submitting {} (invert={})",
            request.filename, request.invert
        );
        let outcome = self.transport.classify(&payload).await;

        let record = match &outcome {
            Ok(result) => {
                info!(
                    "{} classified as {} (accuracy {}, {})",
                    request.filename, result.prediction, result.accuracy, result.process_time
                );
                LogRecord::succeeded(request, started_at, result.clone())
            }
            Err(e) => {
                warn!("Submission of {} failed: {}", request.filename, e);
                LogRecord::failed(request, started_at, e.user_message())
            }
        };
        self.record(record).await;

        let mut state = self.state.lock().await;
        if state.generation == generation {
            match &outcome {
                Ok(result) => {
                    state.status = WorkflowStatus::Succeeded;
                    state.message = Some(MSG_DONE.to_string());
                    state.result = Some(result.clone());
                }
                Err(e) => {
                    state.status = WorkflowStatus::Failed;
                    state.message = Some(e.user_message());
                    state.result = None;
                }
            }
        }

        outcome
    }

    /// Drops the selection and its preview and returns to `Idle`.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.selection = None;
        state.status = WorkflowStatus::Idle;
        state.message = None;
        state.result = None;
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    async fn record(&self, record: LogRecord) {
        let history = self.history.clone();
        let appended = tokio::task::spawn_blocking(move || history.append(record))
            .await
            .map_err(|e| AppError {
                message: format!("History task join failed: {}", e),
            })
            .and_then(|r| r);
        if let Err(e) = appended {
            error!("Failed to append to history: {}", e);
        }
    }

    fn validate(&self, state: &WorkflowState) -> Result<(ClassifyPayload, ClassificationRequest), String> {
        let selection = state.selection.as_ref().ok_or_else(|| MSG_NO_FILE.to_string())?;

        if !self.meets_required_size(selection.dimensions) {
            let (w, h) = (self.config.required_width, self.config.required_height);
            let detected = match selection.dimensions {
                Some((dw, dh)) => format!("got {}x{}", dw, dh),
                None => "size could not be read".to_string(),
            };
            return Err(format!(
                "The image must be exactly {}x{} pixels ({}). Resize it and try again.",
                w, h, detected
            ));
        }

        let payload = ClassifyPayload {
            invert: state.invert,
            filename: selection.filename.clone(),
            bytes: selection.bytes.clone(),
        };
        let request = ClassificationRequest {
            invert: state.invert,
            filename: selection.filename.clone(),
        };
        Ok((payload, request))
    }

    fn meets_required_size(&self, dimensions: Option<(u32, u32)>) -> bool {
        dimensions
            .map(|(w, h)| self.config.size_matches(w, h))
            .unwrap_or(false)
    }

    fn snapshot_of(&self, state: &WorkflowState) -> WorkflowSnapshot {
        let selection = state.selection.as_ref().map(|s| SelectionInfo {
            filename: s.filename.clone(),
            width: s.dimensions.map(|(w, _)| w),
            height: s.dimensions.map(|(_, h)| h),
            preview: s.preview.token().to_string(),
            meets_required_size: self.meets_required_size(s.dimensions),
        });
        let can_submit = !self.in_flight.load(Ordering::Acquire)
            && selection.as_ref().map(|s| s.meets_required_size).unwrap_or(false);

        WorkflowSnapshot {
            status: state.status,
            message: state.message.clone(),
            invert: state.invert,
            selection,
            result: state.result.clone(),
            can_submit,
        }
    }
}
