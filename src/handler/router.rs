//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method dispatch, upload route
//! matching and headers common to every response.

use crate::config::{AppState, HttpConfig};
use crate::handler::{static_files, upload};
use crate::http;
use crate::logger;
use crate::upload::RenderKind;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Main entry point for HTTP request handling
///
/// Generic over the body so tests can drive it with in-memory bodies.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut response = route_request(req, &state).await;
    apply_common_headers(&mut response, &state.config.http);
    Ok(response)
}

/// Dispatch on method, then on path
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    match method {
        Method::POST => {
            let path = req.uri().path().to_string();
            logger::log_upload_received(&path);

            match RenderKind::from_path(&path) {
                Some(kind) => upload::handle_upload(req, kind, state).await,
                None => {
                    logger::log_unaccepted_post(&path);
                    http::build_404_response()
                }
            }
        }
        Method::GET | Method::HEAD => {
            if state.config.static_files.enabled {
                static_files::serve(&req, &state.config.static_files).await
            } else {
                http::build_404_response()
            }
        }
        Method::OPTIONS => http::build_options_response(state.config.http.enable_cors),
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            http::build_501_response()
        }
    }
}

/// Add `Server` and, when enabled, the CORS origin header
fn apply_common_headers(response: &mut Response<Full<Bytes>>, http_config: &HttpConfig) {
    let headers = response.headers_mut();

    match HeaderValue::from_str(&http_config.server_name) {
        Ok(value) => {
            headers.insert(SERVER, value);
        }
        Err(_) => logger::log_debug(&format!(
            "Skipping invalid server name header: {:?}",
            http_config.server_name
        )),
    }

    if http_config.enable_cors && !headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use hyper::StatusCode;

    fn test_state(output_dir: &std::path::Path) -> Arc<AppState> {
        let mut cfg = Config::default();
        cfg.upload.output_dir = output_dir.to_string_lossy().into_owned();
        cfg.static_files.enabled = false;
        Arc::new(AppState::new(&cfg))
    }

    fn request(method: Method, path: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_post_path_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp.path().join("outputs"));

        for path in ["/", "/return", "/return/images", "/upload/image"] {
            let resp = handle_request(request(Method::POST, path), Arc::clone(&state))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "path {path}");
        }
        assert!(!tmp.path().join("outputs").exists());
    }

    #[tokio::test]
    async fn test_method_dispatch() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());

        let resp = handle_request(request(Method::PUT, "/return/image"), Arc::clone(&state))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

        let resp = handle_request(request(Method::OPTIONS, "/return/image"), Arc::clone(&state))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // Static serving disabled
        let resp = handle_request(request(Method::GET, "/index.html"), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_common_headers() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.upload.output_dir = tmp.path().to_string_lossy().into_owned();
        cfg.http.enable_cors = true;
        let state = Arc::new(AppState::new(&cfg));

        let resp = handle_request(request(Method::POST, "/nope"), state)
            .await
            .unwrap();
        assert_eq!(resp.headers()[SERVER], "render-sink");
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
