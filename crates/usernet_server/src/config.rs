//! Server configuration from command-line flags and environment.

use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// usernet server - HTTP API for the user network
#[derive(Parser, Debug, Clone)]
#[command(name = "usernet-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// SQLite database file; `:memory:` keeps everything in memory
    #[arg(long, default_value = "usernet.sqlite3", env = "USERNET_DB_PATH")]
    pub db_path: String,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "USERNET_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 4000, env = "USERNET_PORT")]
    pub port: u16,

    /// Log level (trace|debug|info|warn|error); defaults by build mode
    #[arg(long, env = "USERNET_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset
    #[arg(long, env = "USERNET_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Comma-separated allowed CORS origins; permissive when unset
    #[arg(long, env = "USERNET_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builds the CORS layer from a comma-separated origin list.
pub fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some(origins) => {
            let origin_list: Vec<_> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            log::info!(
                "event=cors_config module=server status=ok mode=restricted origins={}",
                origin_list.len()
            );
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origin_list))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => {
            log::warn!(
                "event=cors_config module=server status=ok mode=permissive hint=set_USERNET_CORS_ORIGIN"
            );
            CorsLayer::permissive()
        }
    }
}
