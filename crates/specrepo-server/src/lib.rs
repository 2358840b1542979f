//! HTTP server for specrepo.
//!
//! Serves every spec root of a tree under its mount path. The top-level root
//! is mounted at `/` and each nested child root below its parent, so
//! `spec/v2/beta` answers at `/v2/beta/openapi.json`. Roots created by a sync
//! are mounted as soon as the sync finishes.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use specrepo_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         basedir: PathBuf::from("spec"),
//!         plugins_dir: Some(PathBuf::from("spec/plugins")),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```

mod app;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use specrepo_core::{BundleOptions, MountRegistry, SpecError};
use specrepo_plugins::PluginPipeline;
use specrepo_storage::{DEFAULT_BASEDIR, DEFAULT_MAIN_FILE, SpecRoot};
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Top-level spec root directory.
    pub basedir: PathBuf,
    /// Main document filename inside every root.
    pub main_file: String,
    /// Plugin directory (`None` runs no plugin files).
    pub plugins_dir: Option<PathBuf>,
    /// Steps applied when serving bundled documents.
    pub bundle_options: BundleOptions,
    /// Application version (for cache invalidation).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            basedir: PathBuf::from(DEFAULT_BASEDIR),
            main_file: DEFAULT_MAIN_FILE.to_owned(),
            plugins_dir: None,
            bundle_options: BundleOptions::default(),
            version: String::new(),
        }
    }
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the spec tree can't be mounted or the server fails to
/// start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(build_state(&config)?);
    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, basedir = %config.basedir.display(), "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Mount the spec tree and assemble handler state.
fn build_state(config: &ServerConfig) -> Result<AppState, SpecError> {
    let root = SpecRoot::new(&config.basedir).with_main_file(&config.main_file);
    let registry = MountRegistry::new();
    registry.mount_tree(&root)?;

    Ok(AppState {
        registry,
        pipeline: PluginPipeline::new(config.plugins_dir.clone()),
        bundle_options: config.bundle_options,
        version: config.version.clone(),
        sync_lock: Mutex::new(()),
    })
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from specrepo config.
#[must_use]
pub fn server_config_from_config(
    config: &specrepo_config::Config,
    version: String,
) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        basedir: config.spec_resolved.basedir.clone(),
        main_file: config.spec_resolved.main_file.clone(),
        plugins_dir: Some(config.plugins_dir.clone()),
        bundle_options: BundleOptions {
            skip_code_samples: config.bundle.skip_code_samples,
            skip_headers_inlining: config.bundle.skip_headers_inlining,
            skip_plugins: config.bundle.skip_plugins,
            skip_children: false,
        },
        version,
    }
}
