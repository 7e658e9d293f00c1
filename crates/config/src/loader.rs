use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::PalaverConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "palaver.toml",
    "palaver.yaml",
    "palaver.yml",
    "palaver.json",
];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory (project-local and user-global paths are skipped).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Load and validate config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PalaverConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./palaver.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/palaver/palaver.{toml,yaml,yml,json}` (user-global)
///
/// A missing file yields the defaults. A file that exists but fails to
/// parse or validate is an error, since silently falling back could point
/// the store at the wrong table.
pub fn discover_and_load() -> anyhow::Result<PalaverConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(PalaverConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        // Override is set, don't fall through to other locations.
        return first_existing(&dir);
    }

    if let Some(path) = first_existing(Path::new(".")) {
        return Some(path);
    }

    config_dir().and_then(|dir| first_existing(&dir))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the config directory: override, or `~/.config/palaver/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("palaver"))
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("palaver.toml")
}

/// Write `config` as TOML to the default config path unless a config file
/// already exists. Returns the path and whether it was written.
pub fn write_default_config(config: &PalaverConfig) -> anyhow::Result<(PathBuf, bool)> {
    let path = find_or_default_config_path();
    if path.exists() {
        warn!(path = %path.display(), "config file already exists, not overwriting");
        return Ok((path, false));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = config.to_toml().context("serialize config")?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok((path, true))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PalaverConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The directory override is process-wide, so everything touching it
    // lives in one test.
    #[test]
    fn discovery_respects_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());

        // Nothing there yet: defaults.
        assert_eq!(discover_and_load().unwrap(), PalaverConfig::default());

        // Init writes once and refuses to overwrite.
        let (path, written) = write_default_config(&PalaverConfig::default()).unwrap();
        assert!(written);
        assert_eq!(path, dir.path().join("palaver.toml"));
        let (_, written_again) = write_default_config(&PalaverConfig::default()).unwrap();
        assert!(!written_again);

        std::fs::write(&path, "[compression]\nenabled = true\nlevel = 6\n").unwrap();
        let cfg = discover_and_load().unwrap();
        assert!(cfg.compression.enabled);
        assert_eq!(cfg.compression.level, 6);

        std::fs::write(&path, "[compression]\nlevel = 42\n").unwrap();
        assert!(discover_and_load().is_err());

        clear_config_dir();
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("palaver.yaml");
        std::fs::write(&yaml, "session:\n  property: chat_state\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().session.property, "chat_state");

        let json = dir.path().join("palaver.json");
        std::fs::write(&json, r#"{"store":{"table_name":"tg"}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.store.table_name, "tg");
        assert_eq!(cfg.session.property, "session");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    #[allow(unsafe_code)]
    fn substitutes_env_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.toml");
        unsafe { std::env::set_var("PALAVER_LOADER_TEST_DB", "sqlite::memory:") };
        std::fs::write(&path, "[store]\ndatabase_url = \"${PALAVER_LOADER_TEST_DB}\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        unsafe { std::env::remove_var("PALAVER_LOADER_TEST_DB") };
        assert_eq!(cfg.store.database_url, "sqlite::memory:");
    }
}
