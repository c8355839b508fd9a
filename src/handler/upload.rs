//! Render upload endpoint
//!
//! `POST /return/image` and `POST /return/depth` carry a base64 data URL of
//! a JPEG or PNG render. The request is validated in the order the client
//! contract defines:
//!
//! 1. `Content-Length` present and numeric, body read in full (400)
//! 2. `Content-Type` is `image/jpeg` or `image/png` (400)
//! 3. Payload decoded and written to the output directory
//!
//! Once step 2 passes the request is accepted. Unless strict payload
//! validation is enabled, a payload that fails step 3 is logged and
//! discarded while the client still gets 200.

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::upload::{decode_data_url, ImageFormat, OutputStore, RenderKind, UploadError};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};
use std::path::PathBuf;

/// A request that passed header and content-type validation
#[derive(Debug)]
pub struct AcceptedUpload {
    pub format: ImageFormat,
    pub body: Bytes,
}

/// Handle one upload for `kind`
pub async fn handle_upload<B>(
    req: Request<B>,
    kind: RenderKind,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let accepted = match read_upload(req, state.config.http.max_body_size).await {
        Ok(accepted) => accepted,
        Err(e) => {
            logger::log_upload_rejected(kind, &e);
            return error_response(&e);
        }
    };

    match persist(kind, &accepted, &state.store).await {
        Ok((path, bytes)) => {
            logger::log_upload_saved(&path, bytes);
            http::build_empty_response(StatusCode::OK)
        }
        Err(e) => {
            logger::log_payload_discarded(kind, &e);
            if state.config.upload.strict_payload || !e.is_payload_error() {
                error_response(&e)
            } else {
                http::build_empty_response(StatusCode::OK)
            }
        }
    }
}

/// Validate headers, read the body and resolve the image format
pub async fn read_upload<B>(req: Request<B>, max_body_size: u64) -> Result<AcceptedUpload, UploadError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_length = parse_content_length(req.headers())?;
    if content_length > max_body_size {
        return Err(UploadError::PayloadTooLarge {
            size: content_length,
            max: max_body_size,
        });
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let body = read_exact_body(req.into_body(), content_length).await?;

    let format = content_type
        .as_deref()
        .and_then(ImageFormat::from_content_type)
        .ok_or_else(|| {
            UploadError::UnsupportedContentType(
                content_type.unwrap_or_else(|| "<missing>".to_string()),
            )
        })?;

    Ok(AcceptedUpload { format, body })
}

/// Parse `Content-Length`, distinguishing a missing header from a bad value
pub fn parse_content_length(headers: &HeaderMap) -> Result<u64, UploadError> {
    let value = headers
        .get(CONTENT_LENGTH)
        .ok_or(UploadError::MissingContentLength)?;

    let text = value
        .to_str()
        .map_err(|_| UploadError::InvalidContentLength("<non-ascii>".to_string()))?;

    text.trim()
        .parse::<u64>()
        .map_err(|_| UploadError::InvalidContentLength(text.to_string()))
}

/// Read exactly `expected` bytes; a longer or shorter body is an error
async fn read_exact_body<B>(body: B, expected: u64) -> Result<Bytes, UploadError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(expected).unwrap_or(usize::MAX);
    let collected = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| UploadError::BodyRead(e.to_string()))?
        .to_bytes();

    let actual = collected.len() as u64;
    if actual != expected {
        return Err(UploadError::BodyLengthMismatch { expected, actual });
    }
    Ok(collected)
}

/// Decode and write an accepted upload, returning the path and decoded size
async fn persist(
    kind: RenderKind,
    upload: &AcceptedUpload,
    store: &OutputStore,
) -> Result<(PathBuf, usize), UploadError> {
    let data = decode_data_url(&upload.body, upload.format)?;
    let path = store.save(kind, upload.format, &data).await?;
    Ok((path, data.len()))
}

fn error_response(err: &UploadError) -> Response<Full<Bytes>> {
    let status = err.status();
    http::build_text_response(
        status,
        format!(
            "{} {}: {err}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use base64::{engine::general_purpose, Engine as _};
    use std::path::Path;

    fn state_for(output_dir: &Path, strict: bool) -> AppState {
        let mut cfg = Config::default();
        cfg.upload.output_dir = output_dir.to_string_lossy().into_owned();
        cfg.upload.strict_payload = strict;
        AppState::new(&cfg)
    }

    fn upload_request(content_type: Option<&str>, body: &[u8]) -> Request<Full<Bytes>> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/return/image")
            .header(CONTENT_LENGTH, body.len());
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Full::new(Bytes::copy_from_slice(body))).unwrap()
    }

    fn saved_files(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_parse_content_length() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            parse_content_length(&headers),
            Err(UploadError::MissingContentLength)
        ));

        headers.insert(CONTENT_LENGTH, "twelve".parse().unwrap());
        assert!(matches!(
            parse_content_length(&headers),
            Err(UploadError::InvalidContentLength(v)) if v == "twelve"
        ));

        headers.insert(CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(parse_content_length(&headers).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_jpeg_upload_written() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("outputs");
        let state = state_for(&out, false);

        let original = b"\xFF\xD8\xFF\xE0 not really a jpeg";
        let body = format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(original)
        );

        let resp = handle_upload(
            upload_request(Some("image/jpeg"), body.as_bytes()),
            RenderKind::Image,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let files = saved_files(&out);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("render-image-") && name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&files[0]).unwrap(), original);
    }

    #[tokio::test]
    async fn test_missing_content_length_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_for(tmp.path(), false);

        let req = Request::builder()
            .method("POST")
            .uri("/return/depth")
            .header(CONTENT_TYPE, "image/png")
            .body(Full::new(Bytes::from_static(b"data:image/png;base64,AA==")))
            .unwrap();

        let resp = handle_upload(req, RenderKind::Depth, &state).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(saved_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_body_shorter_than_declared_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_for(tmp.path(), false);

        let req = Request::builder()
            .method("POST")
            .uri("/return/image")
            .header(CONTENT_LENGTH, 100)
            .header(CONTENT_TYPE, "image/png")
            .body(Full::new(Bytes::from_static(b"data:image/png;base64,AA==")))
            .unwrap();

        let resp = handle_upload(req, RenderKind::Image, &state).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(saved_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_content_type_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_for(tmp.path(), false);

        for ct in [Some("image/gif"), Some("text/plain"), None] {
            let resp = handle_upload(
                upload_request(ct, b"data:image/gif;base64,AA=="),
                RenderKind::Image,
                &state,
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "content type {ct:?}");
        }
        assert!(saved_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_oversized_declared_length_is_413() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.upload.output_dir = tmp.path().to_string_lossy().into_owned();
        cfg.http.max_body_size = 8;
        let state = AppState::new(&cfg);

        let resp = handle_upload(
            upload_request(Some("image/png"), b"data:image/png;base64,AA=="),
            RenderKind::Depth,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_prefix_still_200_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("outputs");
        let state = state_for(&out, false);

        let resp = handle_upload(
            upload_request(Some("image/png"), b"iVBORw0KGgo="),
            RenderKind::Depth,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(saved_files(&out).is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_bad_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_for(tmp.path(), true);

        let resp = handle_upload(
            upload_request(Some("image/png"), b"iVBORw0KGgo="),
            RenderKind::Depth,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = handle_upload(
            upload_request(Some("image/png"), b"data:image/png;base64,@@@@"),
            RenderKind::Depth,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(saved_files(tmp.path()).is_empty());
    }
}
