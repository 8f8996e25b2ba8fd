pub mod classifier;
pub mod history_log;
pub mod image_probe;
pub mod kv_store;
pub mod preview_service;
pub mod workflow;
