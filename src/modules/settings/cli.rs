// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{collections::HashSet, env, path::PathBuf, sync::LazyLock};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailboard",
    about = "An inbound email-to-forum posting gateway: authenticates emails with
    single-use posting keys and turns them into forum replies, topics, and private messages.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailboard log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailboard"
    )]
    pub mailboard_log_level: String,

    /// mailboard HTTP port (default: 15720)
    #[clap(
        long,
        default_value = "15720",
        env,
        help = "Set the admin HTTP port for mailboard"
    )]
    pub mailboard_http_port: i32,

    /// The IP address that the admin API binds to, in IPv4 format.
    #[clap(
        long,
        env,
        default_value = "0.0.0.0",
        help = "The IP address that the admin API binds to, in IPv4 format (e.g., 192.168.1.1).",
        value_parser = ValueParser::new(|s: &str| {
            if s.parse::<std::net::Ipv4Addr>().is_err() {
                return Err("The bind IP address must be a valid IPv4 address.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub mailboard_bind_ip: Option<String>,

    /// CORS allowed origins (default: "*")
    #[clap(
        long,
        default_value = "*",
        env,
        help = "Set the allowed CORS origins (comma-separated list, e.g., \"https://example.com, https://another.com\")",
        value_parser = ValueParser::new(|s: &str| -> Result<HashSet<String>, String> {
            let set: HashSet<String> = s.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            Ok(set)
        })
    )]
    pub mailboard_cors_origins: HashSet<String>,

    /// CORS max age in seconds (default: 86400)
    #[clap(
        long,
        default_value = "86400",
        env,
        help = "Set the CORS max age in seconds"
    )]
    pub mailboard_cors_max_age: i32,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailboard_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailboard_log_to_file: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub mailboard_max_server_log_files: usize,

    #[clap(
        long,
        env,
        help = "Set the root data directory for mailboard",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(s.to_string())
        })
    )]
    pub mailboard_root_dir: String,

    #[clap(
        long,
        env,
        default_value = "134217728",
        help = "Set the cache size for the mailboard metadata database in bytes"
    )]
    pub mailboard_metadata_cache_size: Option<usize>,

    /// Enables or disables the access token mechanism for HTTP endpoints.
    ///
    /// When set to `true`, HTTP requests will be subject to root token validation.
    /// If the `Authorization` header is missing or the token is invalid, the service
    /// will return a 401 Unauthorized response.
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enables or disables the access token mechanism for HTTP endpoints."
    )]
    pub mailboard_enable_access_token: bool,

    #[clap(
        long,
        default_value = "true",
        env,
        help = "Enable compression for the admin API server"
    )]
    pub mailboard_http_compression_enabled: bool,

    /// Interval between scans of the incoming mail spool directory.
    #[clap(
        long,
        default_value = "30",
        env,
        help = "Interval in seconds between spool directory scans (minimum: 5)",
        value_parser = clap::value_parser!(u64).range(5..)
    )]
    pub mailboard_spool_poll_interval_secs: u64,

    /// Retention window for failure records written by the gateway.
    #[clap(
        long,
        default_value = "720",
        env,
        help = "Hours to retain gateway failure records before cleanup (minimum: 1)",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub mailboard_failure_retention_hours: u64,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep metadata in memory instead of on disk (tests and ephemeral deployments)"
    )]
    pub mailboard_metadata_memory_mode_enabled: bool,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            mailboard_log_level: "info".to_string(),
            mailboard_http_port: 15720,
            mailboard_bind_ip: Default::default(),
            mailboard_cors_origins: Default::default(),
            mailboard_cors_max_age: 86400,
            mailboard_ansi_logs: false,
            mailboard_log_to_file: false,
            mailboard_max_server_log_files: 5,
            mailboard_root_dir: if cfg!(windows) {
                "D:\\mailboard_data".into()
            } else {
                "/tmp/mailboard_data".into()
            },
            mailboard_metadata_cache_size: None,
            mailboard_enable_access_token: false,
            mailboard_http_compression_enabled: true,
            mailboard_spool_poll_interval_secs: 30,
            mailboard_failure_retention_hours: 720,
            mailboard_metadata_memory_mode_enabled: true,
        }
    }
}
