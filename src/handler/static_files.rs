//! Static file serving module
//!
//! GET/HEAD requests are answered from the configured root so the browser
//! render client (page, scripts, models, textures) can be loaded from the
//! same origin it posts renders back to.

use crate::config::StaticFilesConfig;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use percent_encoding::percent_decode_str;
use hyper::body::Bytes;
use hyper::header::IF_NONE_MATCH;
use hyper::{Method, Request, Response};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve the file addressed by the request path
pub async fn serve<B>(req: &Request<B>, cfg: &StaticFilesConfig) -> Response<Full<Bytes>> {
    let is_head = req.method() == Method::HEAD;
    let if_none_match = req
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());

    let Some((content, content_type)) =
        load_from_directory(&cfg.root, req.uri().path(), &cfg.index_files).await
    else {
        return http::build_404_response();
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_file_response(Bytes::from(content), content_type, &etag, is_head)
}

/// Load a file under `root` with index file support
///
/// Returns `None` for missing files and for paths resolving outside `root`.
pub async fn load_from_directory(
    root: &str,
    path: &str,
    index_files: &[String],
) -> Option<(Vec<u8>, &'static str)> {
    // Decode first so an encoded `%2e%2e` cannot slip past the traversal guard
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let cleaned = decoded.replace("..", "");
    let relative_path = cleaned.trim_start_matches('/');

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static root not found or inaccessible '{root}': {e}"
            ));
            return None;
        }
    };

    let mut file_path = Path::new(root).join(relative_path);
    if is_dir(&file_path).await {
        file_path = find_index_file(&file_path, index_files).await?;
    }

    // File not found is common (404), no need to log at warning level
    let file_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            file_canonical.display()
        ));
        return None;
    }

    let content = match fs::read(&file_canonical).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_debug(&format!(
                "Failed to read file '{}': {e}",
                file_canonical.display()
            ));
            return None;
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    Some((content, content_type))
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn find_index_file(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for index_file in index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}
