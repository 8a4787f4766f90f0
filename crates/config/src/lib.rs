//! Configuration loading, discovery, and env substitution.
//!
//! Config files: `herald.toml`, `herald.yaml`, or `herald.json`
//! Searched in `./` then `~/.config/herald/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, clear_data_dir, config_dir, data_dir, discover_and_load,
        find_or_default_config_path, load_config, save_config, set_config_dir, set_data_dir,
    },
    schema::{BrowserConfig, HeraldConfig, SelectorChains, ServerConfig, WhatsAppConfig},
};
