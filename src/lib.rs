#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use config::AppConfig;
use error::AppError;
use services::classifier::client::HttpClassifier;
use services::history_log::HistoryStore;
use services::kv_store::KvStore;
use services::preview_service::PreviewRegistry;
use services::workflow::SubmissionWorkflow;
use std::path::Path;
use std::sync::Arc;

/// Everything the shell manages, wired from the app data directory.
pub struct AppServices {
    pub config: AppConfig,
    pub history: HistoryStore,
    pub workflow: SubmissionWorkflow,
}

pub fn bootstrap(app_data_dir: &Path) -> Result<AppServices, AppError> {
    std::fs::create_dir_all(app_data_dir).map_err(|e| AppError {
        message: format!("Failed to create app data directory: {}", e),
    })?;

    let config = AppConfig::load(app_data_dir)?;
    log::info!("Classification endpoint: {}", config.endpoint);

    let kv = KvStore::new(app_data_dir.join(&config.database_file))?;
    let history = HistoryStore::new(kv, config.history_key.clone());

    let workflow = SubmissionWorkflow::new(
        &config,
        Arc::new(HttpClassifier::new(config.endpoint.clone())),
        Arc::new(history.clone()),
        PreviewRegistry::new(),
    );

    Ok(AppServices {
        config,
        history,
        workflow,
    })
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Digit Lens starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .setup(|app| {
            let app_data_dir = app
                .path()
                .app_data_dir()
                .map_err(|e| AppError { message: e.to_string() })?;

            let services = bootstrap(&app_data_dir)?;
            app.manage(services.history);
            app.manage(services.workflow);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::classifier::get_workflow_state,
            commands::classifier::select_image,
            commands::classifier::select_image_path,
            commands::classifier::set_invert,
            commands::classifier::submit,
            commands::classifier::release_selection,
            commands::classifier::get_preview,
            commands::history::load_history,
            commands::history::clear_history,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
