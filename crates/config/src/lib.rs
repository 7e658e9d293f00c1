//! Configuration for palaver: schema with defaults, deep-merge of overrides,
//! eager validation, and discovery of `palaver.{toml,yaml,yml,json}` files.

pub mod env_subst;
pub mod loader;
pub mod merge;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_or_default_config_path, load_config,
        set_config_dir, write_default_config,
    },
    schema::{CompressionConfig, PalaverConfig, SessionConfig, StoreConfig},
};
