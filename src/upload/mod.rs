//! Upload module
//!
//! Everything between a validated request and a file on disk:
//! - Kind and image format detection
//! - Data-URL payload decoding
//! - Output file naming and writing

mod error;
mod kind;
mod payload;
mod storage;

pub use error::UploadError;
pub use kind::{ImageFormat, RenderKind};
pub use payload::decode_data_url;
pub use storage::{render_file_name, OutputStore};
