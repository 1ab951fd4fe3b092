//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    backends::{CommandEngineFactory, ImageEngineFactory},
    config::PipelineConfig,
    engine::EngineFactory,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to pipeline configuration and engine choice
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `PipelineConfig` from CLI arguments
    ///
    /// A `--config` file provides the base; explicit flags override it.
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        let mut config = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(prefix) = &cli.prefix {
            config.output_prefix.clone_from(prefix);
        }
        if let Some(prefix) = &cli.archive_prefix {
            config.archive_prefix.clone_from(prefix);
        }
        if cli.no_timeout {
            config.engine_timeout_ms = None;
        } else if let Some(timeout_ms) = cli.timeout_ms {
            config.engine_timeout_ms = Some(timeout_ms);
        }
        if let Some(size) = cli.preview_size {
            config.preview_max_dimension = size;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Pick the engine factory requested on the command line
    pub(crate) fn engine_factory(cli: &Cli) -> Result<Box<dyn EngineFactory>> {
        if let Some(command_line) = &cli.engine_cmd {
            let factory = CommandEngineFactory::from_command_line(command_line)
                .context("Invalid engine command")?;
            return Ok(Box::new(factory));
        }

        let factory = match &cli.assets {
            Some(dir) => ImageEngineFactory::identity().with_assets(dir, cli.asset.clone()),
            None => ImageEngineFactory::identity(),
        };
        Ok(Box::new(factory))
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if !cli.asset.is_empty() && cli.assets.is_none() {
            anyhow::bail!("--asset requires --assets <DIR>");
        }
        if cli.engine_cmd.is_some() && cli.assets.is_some() {
            anyhow::bail!("--assets only applies to the built-in image engine");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusyPolicy;
    use std::io::Write;

    fn create_test_cli() -> Cli {
        Cli {
            input: vec!["test.jpg".to_string()],
            output: None,
            recursive: false,
            config: None,
            prefix: None,
            archive_prefix: None,
            timeout_ms: None,
            no_timeout: false,
            preview_size: None,
            engine_cmd: None,
            assets: None,
            asset: Vec::new(),
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_cli_config_defaults() {
        let config = CliConfigBuilder::from_cli(&create_test_cli()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let mut cli = create_test_cli();
        cli.prefix = Some("nowm_".to_string());
        cli.archive_prefix = Some("batch".to_string());
        cli.timeout_ms = Some(5_000);
        cli.preview_size = Some(256);

        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.output_prefix, "nowm_");
        assert_eq!(config.archive_prefix, "batch");
        assert_eq!(config.engine_timeout_ms, Some(5_000));
        assert_eq!(config.preview_max_dimension, 256);

        cli.no_timeout = true;
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.engine_timeout_ms, None);
    }

    #[test]
    fn test_cli_invalid_values_are_rejected() {
        let mut cli = create_test_cli();
        cli.prefix = Some("out/".to_string());
        assert!(CliConfigBuilder::from_cli(&cli).is_err());

        let mut cli = create_test_cli();
        cli.timeout_ms = Some(0);
        assert!(CliConfigBuilder::from_cli(&cli).is_err());
    }

    #[test]
    fn test_config_file_is_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_prefix": "fromfile_", "busy_policy": "wait"}}"#).unwrap();

        let mut cli = create_test_cli();
        cli.config = Some(file.path().to_path_buf());
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.output_prefix, "fromfile_");
        assert_eq!(config.busy_policy, BusyPolicy::Wait);

        cli.prefix = Some("flag_".to_string());
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.output_prefix, "flag_");
    }

    #[test]
    fn test_cli_validation() {
        let mut cli = create_test_cli();
        assert!(CliConfigBuilder::validate_cli(&cli).is_ok());

        cli.asset = vec!["alpha_48.png".to_string()];
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());

        cli.assets = Some("assets".into());
        assert!(CliConfigBuilder::validate_cli(&cli).is_ok());

        cli.engine_cmd = Some("cat".to_string());
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());
    }

    #[test]
    fn test_engine_factory_rejects_empty_command() {
        let mut cli = create_test_cli();
        cli.engine_cmd = Some("  ".to_string());
        assert!(CliConfigBuilder::engine_factory(&cli).is_err());

        cli.engine_cmd = None;
        assert!(CliConfigBuilder::engine_factory(&cli).is_ok());
    }
}
