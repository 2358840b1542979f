//! `specrepo serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use specrepo_config::{CliSettings, Config};
use specrepo_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover specrepo.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spec root directory (overrides config).
    #[arg(short, long)]
    basedir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Plugin directory (overrides config and `SPECREPO_PLUGINS_DIR`).
    #[arg(long)]
    plugins_dir: Option<PathBuf>,

    /// Don't run plugins.
    #[arg(long)]
    skip_plugins: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            basedir: self.basedir,
            plugins_dir: self.plugins_dir,
            skip_plugins: self.skip_plugins.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Spec directory: {}",
            config.spec_resolved.basedir.display()
        ));
        if config.bundle.skip_plugins {
            output.info("Plugins: disabled");
        } else {
            output.info(&format!("Plugins: {}", config.plugins_dir.display()));
        }

        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
