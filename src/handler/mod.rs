//! Request handler module
//!
//! Method and path dispatch, the render upload endpoints and static file
//! serving for the render client's assets.

pub mod router;
pub mod static_files;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
