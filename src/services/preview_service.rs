use base64::Engine;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::AppError;

/// Bytes behind the thumbnails currently on screen, addressed by token.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` and returns the handle that owns the entry.
    pub fn acquire(&self, bytes: Arc<Vec<u8>>) -> Result<PreviewHandle, AppError> {
        let token = format!("preview-{}", Uuid::new_v4());
        self.entries
            .lock()
            .map_err(|_| AppError::from("Preview registry lock poisoned"))?
            .insert(token.clone(), bytes);

        Ok(PreviewHandle {
            token,
            registry: self.clone(),
        })
    }

    /// Resolves a live token to a `data:` URL the webview can display.
    pub fn data_url(&self, token: &str) -> Result<String, AppError> {
        let bytes = self
            .entries
            .lock()
            .map_err(|_| AppError::from("Preview registry lock poisoned"))?
            .get(token)
            .cloned()
            .ok_or_else(|| AppError {
                message: format!("Unknown or released preview: {}", token),
            })?;

        let mime = image::guess_format(&bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes.as_slice());
        Ok(format!("data:{};base64,{}", mime, b64))
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn release(&self, token: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(token).is_some() {
                debug!("Released {}", token);
            }
        }
    }
}

/// Keeps one preview registered for as long as it lives.
pub struct PreviewHandle {
    token: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(&self.token);
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.token).finish()
    }
}
