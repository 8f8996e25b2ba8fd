use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

use crate::error::SubmitError;
use crate::models::classify_types::{ClassificationResult, InvertFlag};

/// What one submission sends to the service.
#[derive(Debug, Clone)]
pub struct ClassifyPayload {
    pub invert: InvertFlag,
    pub filename: String,
    pub bytes: Arc<Vec<u8>>,
}

#[async_trait]
pub trait ClassifierTransport: Send + Sync {
    /// Issues exactly one request. No retries.
    async fn classify(&self, payload: &ClassifyPayload) -> Result<ClassificationResult, SubmitError>;
}

#[derive(Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn form(payload: &ClassifyPayload) -> Result<Form, SubmitError> {
        let mut image = Part::bytes(payload.bytes.as_ref().clone()).file_name(payload.filename.clone());
        if let Ok(format) = image::guess_format(&payload.bytes) {
            image = image
                .mime_str(format.to_mime_type())
                .map_err(|e| SubmitError::Transport(e.to_string()))?;
        }

        Ok(Form::new()
            .text("invert", payload.invert.as_str())
            .part("image", image))
    }
}

#[async_trait]
impl ClassifierTransport for HttpClassifier {
    async fn classify(&self, payload: &ClassifyPayload) -> Result<ClassificationResult, SubmitError> {
        let form = Self::form(payload)?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Service {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| SubmitError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat};
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn payload(invert: InvertFlag) -> ClassifyPayload {
        let mut out = Cursor::new(Vec::new());
        GrayImage::new(28, 28).write_to(&mut out, ImageFormat::Png).unwrap();
        ClassifyPayload {
            invert,
            filename: "digit.png".into(),
            bytes: Arc::new(out.into_inner()),
        }
    }

    fn classifier(url: String) -> HttpClassifier {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpClassifier::with_client(client, url)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    /// Accepts one connection, captures the raw request and answers with
    /// `status` and `body`.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/predict", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(head_end) = find(&request, b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok());
                    let body_len = request.len() - (head_end + 4);
                    let chunked = head.contains("transfer-encoding: chunked");
                    match length {
                        Some(len) if body_len >= len => break,
                        None if chunked && request.ends_with(b"0\r\n\r\n") => break,
                        None if !chunked && request.ends_with(b"--\r\n") => break,
                        _ => {}
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (url, handle)
    }

    #[tokio::test]
    async fn posts_multipart_with_invert_and_image() {
        let (url, server) = one_shot_server(
            "200 OK",
            r#"{"prediction":7,"accuracy":0.98,"process_time":"12ms"}"#,
        )
        .await;
        let payload = payload(InvertFlag::True);

        let result = classifier(url).classify(&payload).await.unwrap();
        assert_eq!(result.prediction, 7);
        assert_eq!(result.accuracy, 0.98);
        assert_eq!(result.process_time, "12ms");

        let raw = server.await.unwrap();
        assert!(raw.starts_with(b"POST /predict "));
        let text = String::from_utf8_lossy(&raw);
        assert!(text.to_ascii_lowercase().contains("content-type: multipart/form-data; boundary="));
        assert!(text.contains("name=\"invert\"\r\n\r\ntrue\r\n"));
        assert!(text.contains("name=\"image\"; filename=\"digit.png\""));
        assert!(text.contains("Content-Type: image/png"));
        assert!(find(&raw, payload.bytes.as_slice()).is_some());
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let (url, server) = one_shot_server("500 Internal Server Error", "{}").await;
        let err = classifier(url)
            .classify(&payload(InvertFlag::False))
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Service { status: 500 });
        let raw = server.await.unwrap();
        assert!(String::from_utf8_lossy(&raw).contains("name=\"invert\"\r\n\r\nfalse\r\n"));
    }

    #[tokio::test]
    async fn unexpected_body_is_malformed() {
        let (url, _server) = one_shot_server("200 OK", r#"{"label":"seven"}"#).await;
        let err = classifier(url)
            .classify(&payload(InvertFlag::False))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/predict", listener.local_addr().unwrap());
        drop(listener);

        let err = classifier(url)
            .classify(&payload(InvertFlag::False))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
        assert!(err.user_message().starts_with("Error: request failed: "));
    }
}
