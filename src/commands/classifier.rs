use crate::error::AppError;
use crate::models::workflow_types::WorkflowSnapshot;
use crate::services::workflow::SubmissionWorkflow;
use std::path::Path;
use tauri::State;

#[tauri::command]
pub async fn get_workflow_state(workflow: State<'_, SubmissionWorkflow>) -> Result<WorkflowSnapshot, AppError> {
    Ok(workflow.snapshot().await)
}

#[tauri::command]
pub async fn select_image(
    workflow: State<'_, SubmissionWorkflow>,
    name: String,
    bytes: Vec<u8>,
) -> Result<WorkflowSnapshot, AppError> {
    workflow.select_file(name, bytes).await
}

#[tauri::command]
pub async fn select_image_path(
    workflow: State<'_, SubmissionWorkflow>,
    path: String,
) -> Result<WorkflowSnapshot, AppError> {
    workflow.select_path(Path::new(&path)).await
}

#[tauri::command]
pub async fn set_invert(workflow: State<'_, SubmissionWorkflow>, invert: bool) -> Result<WorkflowSnapshot, AppError> {
    Ok(workflow.set_invert(invert).await)
}

/// Validation problems come back as an error; request outcomes, good or
/// bad, come back in the snapshot.
#[tauri::command]
pub async fn submit(workflow: State<'_, SubmissionWorkflow>) -> Result<WorkflowSnapshot, AppError> {
    match workflow.submit().await {
        Err(e) if e.is_validation() => Err(e.into()),
        _ => Ok(workflow.snapshot().await),
    }
}

#[tauri::command]
pub async fn release_selection(workflow: State<'_, SubmissionWorkflow>) -> Result<(), AppError> {
    workflow.teardown().await;
    Ok(())
}

#[tauri::command]
pub fn get_preview(workflow: State<'_, SubmissionWorkflow>, token: String) -> Result<String, AppError> {
    workflow.previews().data_url(&token)
}
