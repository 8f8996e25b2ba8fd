use image::ImageReader;
use std::io::Cursor;
use std::sync::Arc;

/// Reads width and height from the image header without decoding pixels.
/// Anything unrecognisable yields `None`.
pub fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub async fn probe_dimensions(bytes: Arc<Vec<u8>>) -> Option<(u32, u32)> {
    tokio::task::spawn_blocking(move || read_dimensions(&bytes))
        .await
        .ok()
        .flatten()
}
