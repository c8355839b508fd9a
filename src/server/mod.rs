// Server module entry point
// Socket setup, connection serving and the bind/run/shutdown lifecycle

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), use server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used items
pub use listener::create_reusable_listener;
pub use server_loop::Server;
pub use signal::shutdown_signal;
