//! `specrepo bundle` command implementation.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use specrepo_config::{CliSettings, Config};
use specrepo_core::{BundleOptions, bundle};
use specrepo_plugins::PluginPipeline;
use specrepo_storage::{Format, SpecRoot, stringify};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the bundle command.
#[derive(Args)]
pub(crate) struct BundleArgs {
    /// Write YAML instead of JSON.
    #[arg(long)]
    yaml: bool,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leave out code samples and header inlining, so the result can be synced back unchanged.
    #[arg(long)]
    editable: bool,

    /// Don't attach child roots under `children`.
    #[arg(long)]
    no_children: bool,

    /// Spec root directory (overrides config).
    #[arg(short, long)]
    basedir: Option<PathBuf>,

    /// Don't run plugins.
    #[arg(long)]
    skip_plugins: bool,

    /// Path to configuration file (default: auto-discover specrepo.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BundleArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            basedir: self.basedir.clone(),
            skip_plugins: self.skip_plugins.then_some(true),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let root = SpecRoot::new(&config.spec_resolved.basedir)
            .with_main_file(&config.spec_resolved.main_file);
        let pipeline = PluginPipeline::new(Some(config.plugins_dir.clone()));
        let options = self.options(&config);
        let format = if self.yaml { Format::Yaml } else { Format::Json };

        let text = stringify(&bundle(&root, &options, &pipeline)?, format)?;

        match &self.output {
            Some(path) => {
                fs::write(path, &text)?;
                Output::new().success(&format!("Bundled spec written to {}", path.display()));
            }
            None => std::io::stdout().lock().write_all(text.as_bytes())?,
        }
        Ok(())
    }

    fn options(&self, config: &Config) -> BundleOptions {
        BundleOptions {
            skip_code_samples: self.editable || config.bundle.skip_code_samples,
            skip_headers_inlining: self.editable || config.bundle.skip_headers_inlining,
            skip_plugins: config.bundle.skip_plugins,
            skip_children: self.no_children,
        }
    }
}
