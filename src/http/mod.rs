//! HTTP protocol layer module
//!
//! Response builders, MIME detection and `ETag` handling shared by the
//! upload and static file handlers.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_404_response, build_501_response, build_empty_response,
    build_file_response, build_options_response, build_text_response, ALLOWED_METHODS,
};
