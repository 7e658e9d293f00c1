//! Config schema types (session binding, store, compression).

use {
    anyhow::{Context, bail},
    serde::{Deserialize, Serialize},
};

use crate::merge::merge_json;

/// Highest preset accepted by the xz encoder.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalaverConfig {
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub compression: CompressionConfig,
}

/// How the session is exposed to request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name the session handle is bound under on the request context.
    pub property: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            property: "session".into(),
        }
    }
}

/// Key-value backend parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Table holding one row per session key.
    pub table_name: String,
    /// sqlx connection URL.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: "bot-sessions".into(),
            database_url: "sqlite://palaver.db?mode=rwc".into(),
        }
    }
}

/// Optional compression of the stored payload.
///
/// The stored value carries no marker of how it was encoded, so this must
/// not change for the lifetime of the records it wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// xz preset, 0 (fastest) to 9 (smallest).
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: MAX_COMPRESSION_LEVEL,
        }
    }
}

impl PalaverConfig {
    /// Deep-merge `overrides` over the defaults and validate the result.
    ///
    /// Objects merge key by key; any other value replaces the default.
    pub fn from_overrides(overrides: serde_json::Value) -> anyhow::Result<Self> {
        let mut base = serde_json::to_value(Self::default())?;
        merge_json(&mut base, overrides);
        let config: Self = serde_json::from_value(base).context("invalid config overrides")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the session manager cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.property.trim().is_empty() {
            bail!("session.property must not be empty");
        }
        if !is_valid_table_name(&self.store.table_name) {
            bail!(
                "store.table_name {:?} is invalid: use letters, digits, '_' or '-'",
                self.store.table_name
            );
        }
        if self.store.database_url.trim().is_empty() {
            bail!("store.database_url must not be empty");
        }
        if self.compression.level > MAX_COMPRESSION_LEVEL {
            bail!(
                "compression.level must be between 0 and {MAX_COMPRESSION_LEVEL}, got {}",
                self.compression.level
            );
        }
        Ok(())
    }
}

/// Table names are interpolated into SQL, so keep them to a safe alphabet.
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
