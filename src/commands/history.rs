use crate::error::AppError;
use crate::models::workflow_types::HistoryEntry;
use crate::services::history_log::{HistoryLog, HistoryStore};
use tauri::State;

#[tauri::command]
pub async fn load_history(history: State<'_, HistoryStore>) -> Result<Vec<HistoryEntry>, AppError> {
    let history = history.inner().clone();
    tokio::task::spawn_blocking(move || {
        history
            .load()
            .into_iter()
            .map(HistoryEntry::from_record)
            .collect()
    })
    .await
    .map_err(|e| AppError {
        message: format!("Task join failed: {}", e),
    })
}

#[tauri::command]
pub async fn clear_history(history: State<'_, HistoryStore>) -> Result<Vec<HistoryEntry>, AppError> {
    let history = history.inner().clone();
    tokio::task::spawn_blocking(move || history.clear())
        .await
        .map_err(|e| AppError {
            message: format!("Task join failed: {}", e),
        })??;
    Ok(Vec::new())
}
