//! MIME type detection for static files

/// Content-Type for a file extension
///
/// Covers the assets a browser render client pulls: pages, scripts,
/// glTF models and their textures, HDR environment maps.
///
/// # Examples
/// ```
/// use render_sink::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("js")), "text/javascript; charset=utf-8");
/// assert_eq!(get_content_type(Some("gltf")), "model/gltf+json");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "hdr" => "image/vnd.radiance",
        "ktx2" => "image/ktx2",

        "gltf" => "model/gltf+json",
        "glb" => "model/gltf-binary",

        _ => "application/octet-stream",
    }
}
