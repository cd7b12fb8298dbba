// Configuration management: TOML settings file plus the interactive editor

pub mod interactive;
pub mod settings;

pub use interactive::{render_config, run_interactive_config, show_config};
pub use settings::{Config, ConfigError, OllamaConfig};

/// Resolve the data directory, honouring an explicit override
#[inline]
pub fn resolve_data_dir(
    override_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    override_dir.map_or_else(Config::default_dir, Ok)
}
