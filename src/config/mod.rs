// Configuration module entry point
// Loads layered configuration and builds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StaticFilesConfig,
    UploadConfig,
};

/// Environment variable prefix, e.g. `RENDER_SINK_SERVER__PORT=9000`
const ENV_PREFIX: &str = "RENDER_SINK";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.reuse_port", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_grace", 5)?
            .set_default("http.server_name", "render-sink")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 67_108_864)? // 64MB
            .set_default("upload.output_dir", "outputs")?
            .set_default("upload.strict_payload", false)?
            .set_default("static_files.enabled", true)?
            .set_default("static_files.root", ".")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Whether debug-level lines should be emitted
    pub fn debug_enabled(&self) -> bool {
        self.logging.level.eq_ignore_ascii_case("debug")
            || self.logging.level.eq_ignore_ascii_case("trace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("this-config-file-does-not-exist").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.upload.output_dir, "outputs");
        assert!(!cfg.upload.strict_payload);
        assert!(cfg.static_files.enabled);
        assert_eq!(cfg.static_files.index_files, vec!["index.html", "index.htm"]);
        assert_eq!(cfg.http.max_body_size, 67_108_864);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\n\n[upload]\noutput_dir = \"renders\"\nstrict_payload = true"
        )
        .unwrap();

        let base = dir.path().join("custom");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.upload.output_dir, "renders");
        assert!(cfg.upload.strict_payload);
        // Untouched sections keep their defaults
        assert_eq!(cfg.performance.read_timeout, 30);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 8123;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8123);

        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_debug_enabled() {
        let mut cfg = Config::default();
        assert!(!cfg.debug_enabled());
        cfg.logging.level = "DEBUG".to_string();
        assert!(cfg.debug_enabled());
    }
}
