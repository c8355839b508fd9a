//! Logger module
//!
//! Provides logging utilities for the upload server including:
//! - Server lifecycle logging
//! - Upload outcome logging
//! - Access logging in several formats
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::upload::{RenderKind, UploadError};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Debug lines are dropped unless `logging.level` asks for them
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    DEBUG_ENABLED.store(config.debug_enabled(), Ordering::Relaxed);
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Render upload server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info("  - POST /return/image  (image/jpeg, image/png)");
    write_info("  - POST /return/depth  (image/jpeg, image/png)");
    write_info(&format!("Output directory: {}", config.upload.output_dir));
    if config.upload.strict_payload {
        write_info("Strict payload validation: on");
    }
    if config.static_files.enabled {
        write_info(&format!("Serving static files from: {}", config.static_files.root));
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_server_stopped(addr: &SocketAddr) {
    write_info(&format!("[INFO] Server on {addr} stopped"));
}

pub fn log_shutdown_requested(active: usize) {
    write_info(&format!(
        "[INFO] Shutdown requested, waiting for {active} active connection(s)"
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_debug(message: &str) {
    if DEBUG_ENABLED.load(Ordering::Relaxed) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_upload_received(path: &str) {
    write_info(&format!("[UPLOAD] POST {path}"));
}

pub fn log_unaccepted_post(path: &str) {
    log_warning(&format!("Unaccepted post request: {path}"));
}

pub fn log_upload_rejected(kind: RenderKind, err: &UploadError) {
    log_warning(&format!("Rejected {kind} upload ({}): {err}", err.status().as_u16()));
}

pub fn log_payload_discarded(kind: RenderKind, err: &UploadError) {
    log_error(&format!("Invalid {kind} payload, no file saved: {err}"));
}

pub fn log_upload_saved(path: &Path, bytes: usize) {
    write_info(&format!("[UPLOAD] Wrote file {} ({bytes} bytes)", path.display()));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
