//! Render upload server
//!
//! Accepts base64 data-URL renders on `POST /return/image` and
//! `POST /return/depth`, writes them to the output directory, and serves
//! the render client's static files.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod upload;
