//! `specrepo sync` command implementation.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use specrepo_config::{CliSettings, Config};
use specrepo_core::{SyncContext, SyncInput, sync};
use specrepo_plugins::PluginPipeline;
use specrepo_storage::SpecRoot;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Document to write into the spec root (YAML or JSON).
    file: PathBuf,

    /// Spec root directory (overrides config).
    #[arg(short, long)]
    basedir: Option<PathBuf>,

    /// Don't run plugins or merge existing child roots.
    #[arg(long)]
    skip_plugins: bool,

    /// Path to configuration file (default: auto-discover specrepo.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl SyncArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            basedir: self.basedir,
            skip_plugins: self.skip_plugins.then_some(true),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let text = fs::read_to_string(&self.file)?;
        tracing::debug!(file = %self.file.display(), bytes = text.len(), "Read document");
        let root = SpecRoot::new(&config.spec_resolved.basedir)
            .with_main_file(&config.spec_resolved.main_file);
        let pipeline = PluginPipeline::new(Some(config.plugins_dir.clone()));
        let context = SyncContext::new(&pipeline).skip_plugins(config.bundle.skip_plugins);

        sync(SyncInput::Text(text), &root, &context)?;

        Output::new().success(&format!(
            "Synced {} into {}",
            self.file.display(),
            root.basedir().display()
        ));
        Ok(())
    }
}
