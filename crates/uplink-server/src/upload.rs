//! Artifact intake endpoint.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use tracing::{error, info, instrument, warn};
use uplink_core::ids::SessionId;

use crate::server::AppState;

/// `POST /upload`, a multipart form with `client_uuid` and `upload_file`
/// parts.
///
/// The identifier correlates the upload to a session; when that session
/// has a live notification channel, progress lines are pushed to it, but
/// storage succeeds all the same without one. The response body is
/// informational on success and a diagnostic on failure, and the request
/// is never retried server-side.
#[instrument(skip_all)]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut client_uuid: Option<String> = None;
    let mut artifact: Option<(String, axum::body::Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "unreadable multipart body");
                return (StatusCode::BAD_REQUEST, format!("malformed multipart body: {e}"));
            }
        };
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("client_uuid") => match field.text().await {
                Ok(text) => client_uuid = Some(text),
                Err(e) => {
                    return (StatusCode::BAD_REQUEST, format!("unreadable client_uuid: {e}"));
                }
            },
            Some("upload_file") => {
                let filename = field.file_name().map(ToOwned::to_owned).unwrap_or_default();
                match field.bytes().await {
                    Ok(bytes) => artifact = Some((filename, bytes)),
                    Err(e) => {
                        return (StatusCode::BAD_REQUEST, format!("unreadable upload_file: {e}"));
                    }
                }
            }
            // Unknown parts are skipped.
            _ => {}
        }
    }

    let Some(raw_id) = client_uuid.filter(|s| !s.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing client_uuid field".to_string());
    };
    let id = match SessionId::parse(raw_id.trim()) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "upload carried an invalid identifier");
            return (
                StatusCode::BAD_REQUEST,
                format!("client_uuid is not a session identifier: {e}"),
            );
        }
    };
    let Some((raw_name, bytes)) = artifact else {
        return (StatusCode::BAD_REQUEST, "missing upload_file field".to_string());
    };
    let Some(filename) = sanitize_filename(&raw_name) else {
        return (
            StatusCode::BAD_REQUEST,
            "upload_file has no usable filename".to_string(),
        );
    };

    let size = bytes.len();
    let _ = state
        .registry
        .push(&id, format!("Received upload '{filename}' ({size} bytes)"));

    let path = state.config.upload_dir.join(&filename);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        let diagnostic = format!("artifact already exists on server: {filename}");
        let _ = state.registry.push(&id, format!("Upload failed: {diagnostic}"));
        return (StatusCode::INTERNAL_SERVER_ERROR, diagnostic);
    }
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        error!(error = %e, path = %path.display(), "artifact write failed");
        let diagnostic = format!("failed to store artifact: {e}");
        let _ = state.registry.push(&id, format!("Upload failed: {diagnostic}"));
        return (StatusCode::INTERNAL_SERVER_ERROR, diagnostic);
    }

    info!(session_id = %id, filename = %filename, size, "artifact stored");
    let _ = state.registry.push(&id, format!("Stored artifact '{filename}'"));
    (StatusCode::OK, format!("Stored artifact '{filename}' ({size} bytes)"))
}

/// Reduce a client-supplied filename to its final path component.
fn sanitize_filename(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::server::UplinkServer;

    const BOUNDARY: &str = "uplink-test-boundary";

    fn server_with_dir(dir: &Path) -> UplinkServer {
        let config = ServerConfig {
            upload_dir: dir.to_path_buf(),
            port: 0,
            ..ServerConfig::default()
        };
        UplinkServer::new(config)
    }

    /// Assemble a `multipart/form-data` body from `(name, filename, content)`
    /// parts.
    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match filename {
                Some(f) => format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\r\n"
                ),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stores_artifact_and_answers_with_info() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();

        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some("data.bin"), b"artifact!"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("Stored artifact 'data.bin'"), "body: {text}");
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), b"artifact!");
    }

    #[tokio::test]
    async fn missing_client_uuid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());

        let body = multipart_body(&[("upload_file", Some("data.bin"), b"artifact!")]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("client_uuid"));
        assert!(!dir.path().join("data.bin").exists());
    }

    #[tokio::test]
    async fn blank_client_uuid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());

        let body = multipart_body(&[
            ("client_uuid", None, b"   "),
            ("upload_file", Some("data.bin"), b"artifact!"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_client_uuid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());

        let body = multipart_body(&[
            ("client_uuid", None, b"not-a-uuid"),
            ("upload_file", Some("data.bin"), b"artifact!"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("session identifier"));
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();

        let body = multipart_body(&[("client_uuid", None, id.as_str().as_bytes())]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("upload_file"));
    }

    #[tokio::test]
    async fn duplicate_filename_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"original").unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();

        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some("data.bin"), b"usurper"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(text.contains("artifact already exists on server: data.bin"));
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn traversal_filename_is_flattened_to_basename() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();

        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some("../../escape.bin"), b"contained"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(dir.path().join("escape.bin").exists());
    }

    #[tokio::test]
    async fn bare_dotdot_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();

        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some(".."), b"nameless"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn progress_is_pushed_to_the_registered_channel() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_dir(dir.path());
        let id = SessionId::generate();
        let (_handle, mut rx, _) = server.registry().register(id.clone());

        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some("data.bin"), b"artifact!"),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            rx.recv().await,
            Some("Received upload 'data.bin' (9 bytes)".to_string())
        );
        assert_eq!(rx.recv().await, Some("Stored artifact 'data.bin'".to_string()));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            upload_dir: dir.path().to_path_buf(),
            max_upload_bytes: 1024,
            port: 0,
            ..ServerConfig::default()
        };
        let server = UplinkServer::new(config);
        let id = SessionId::generate();

        let big = vec![0u8; 8 * 1024];
        let body = multipart_body(&[
            ("client_uuid", None, id.as_str().as_bytes()),
            ("upload_file", Some("big.bin"), &big),
        ]);
        let response = server.router().oneshot(upload_request(body)).await.unwrap();

        assert!(!response.status().is_success());
        assert!(!dir.path().join("big.bin").exists());
    }

    #[test]
    fn sanitize_keeps_plain_names_and_strips_directories() {
        assert_eq!(sanitize_filename("report.bin"), Some("report.bin".into()));
        assert_eq!(sanitize_filename("a/b/report.bin"), Some("report.bin".into()));
        assert_eq!(sanitize_filename("../secret"), Some("secret".into()));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("dir/"), Some("dir".into()));
    }
}
