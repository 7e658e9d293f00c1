use std::sync::Arc;

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    palaver_config::discover_and_load,
    palaver_sessions::{
        PayloadCodec, Session, SessionKey, SessionManager, SessionStore, SqliteSessionStore,
    },
    serde_json::Value,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List stored session keys.
    List,
    /// Print the session stored under a key.
    Show {
        key: String,
        /// Print the stored wire value instead of the decoded session.
        #[arg(long)]
        raw: bool,
    },
    /// Replace the session stored under a key with a JSON object.
    Set { key: String, json: String },
    /// Delete the session stored under a key.
    Clear { key: String },
}

pub async fn handle_sessions(action: SessionAction) -> Result<()> {
    let config = discover_and_load()?;
    let store = SqliteSessionStore::connect(&config.store)
        .await
        .with_context(|| format!("failed to open {}", config.store.database_url))?;
    let codec = PayloadCodec::from_config(&config.compression);

    match action {
        SessionAction::List => list(&store).await,
        SessionAction::Show { key, raw } => show(&store, &codec, &parse_key(&key)?, raw).await,
        SessionAction::Set { key, json } => {
            let manager = SessionManager::new(Arc::new(store), codec);
            set(&manager, &parse_key(&key)?, &json).await
        },
        SessionAction::Clear { key } => {
            let manager = SessionManager::new(Arc::new(store), codec);
            let key = parse_key(&key)?;
            manager.try_clear_session(&key).await?;
            println!("Cleared {key}");
            Ok(())
        },
    }
}

fn parse_key(key: &str) -> Result<SessionKey> {
    SessionKey::new(key).context("session key must not be empty")
}

async fn list(store: &SqliteSessionStore) -> Result<()> {
    let keys = store.list_keys().await?;
    if keys.is_empty() {
        println!("No sessions in table {:?}.", store.table());
        return Ok(());
    }
    for key in keys {
        println!("{key}");
    }
    Ok(())
}

async fn show(
    store: &SqliteSessionStore,
    codec: &PayloadCodec,
    key: &SessionKey,
    raw: bool,
) -> Result<()> {
    let Some(record) = store.read(key).await? else {
        bail!("no session stored for {key}");
    };
    let value = if raw {
        record.value
    } else {
        Value::Object(
            codec
                .unpack(record.value)
                .await
                .with_context(|| format!("failed to decode session {key}"))?,
        )
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn set(manager: &SessionManager, key: &SessionKey, json: &str) -> Result<()> {
    let session = parse_session(json)?;
    manager.try_save_session(key, Some(&session)).await?;
    if session.is_empty() {
        println!("Empty session given, cleared {key}");
    } else {
        println!("Saved {key}");
    }
    Ok(())
}

fn parse_session(json: &str) -> Result<Session> {
    match serde_json::from_str(json).context("session must be valid JSON")? {
        Value::Object(session) => Ok(session),
        other => bail!("session must be a JSON object, got {other}"),
    }
}
