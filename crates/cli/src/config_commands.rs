use {
    anyhow::{Context, Result},
    clap::Subcommand,
    palaver_config::{PalaverConfig, discover_and_load, find_or_default_config_path},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Load and validate the configuration file.
    Check,
    /// Write a default palaver.toml if none exists.
    Init,
}

pub fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(),
        ConfigAction::Check => check(),
        ConfigAction::Init => init(),
    }
}

fn show() -> Result<()> {
    let config = discover_and_load()?;
    print!("{}", render(&config)?);
    Ok(())
}

fn check() -> Result<()> {
    let path = find_or_default_config_path();
    let config = discover_and_load()?;
    println!(
        "{} ok (table {:?}, compression {})",
        path.display(),
        config.store.table_name,
        if config.compression.enabled {
            format!("on, level {}", config.compression.level)
        } else {
            "off".to_string()
        }
    );
    Ok(())
}

fn init() -> Result<()> {
    let (path, written) = palaver_config::write_default_config(&PalaverConfig::default())?;
    if written {
        println!("Wrote {}", path.display());
    } else {
        println!("{} already exists, left unchanged", path.display());
    }
    Ok(())
}

fn render(config: &PalaverConfig) -> Result<String> {
    config.to_toml().context("serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_sections() {
        let out = render(&PalaverConfig::default()).unwrap();
        assert!(out.contains("[session]"));
        assert!(out.contains("[store]"));
        assert!(out.contains("[compression]"));
        assert!(out.contains("level = 9"));
    }

    // The config dir override is process-wide, so the whole round trip
    // stays in one test.
    #[test]
    fn init_then_check_in_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        palaver_config::set_config_dir(dir.path().to_path_buf());

        handle_config(ConfigAction::Init).unwrap();
        let written = std::fs::read_to_string(dir.path().join("palaver.toml")).unwrap();
        assert_eq!(written, render(&PalaverConfig::default()).unwrap());

        // A second init leaves the edited file alone.
        std::fs::write(
            dir.path().join("palaver.toml"),
            "[compression]\nenabled = true\nlevel = 3\n",
        )
        .unwrap();
        handle_config(ConfigAction::Init).unwrap();
        assert!(handle_config(ConfigAction::Check).is_ok());
        assert!(discover_and_load().unwrap().compression.enabled);

        std::fs::write(dir.path().join("palaver.toml"), "[compression]\nlevel = 99\n").unwrap();
        assert!(handle_config(ConfigAction::Check).is_err());

        palaver_config::clear_config_dir();
    }
}
