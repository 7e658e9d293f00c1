//! Session lifecycle: load (creating on miss), save, clear.
//!
//! Each operation comes in two forms. `try_*` returns the error. The plain
//! form is what request handling calls: it logs the failure, passes it to the
//! error hook, and carries on as if nothing was stored. A storage outage
//! therefore never fails a request, but it also means a failed save is only
//! visible in logs, metrics or the hook.

use std::sync::Arc;

use {
    anyhow::Context,
    tracing::{debug, info, warn},
};

use {
    palaver_common::{Session, SessionError},
    palaver_config::PalaverConfig,
};

#[cfg(feature = "metrics")]
use palaver_metrics::{counter, histogram, session as session_metrics};

use crate::{
    codec::PayloadCodec, key::SessionKey, store::SessionStore, store_sqlite::SqliteSessionStore,
};

/// Lifecycle operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Create,
    Get,
    Save,
    Clear,
}

impl SessionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Save => "save",
            Self::Clear => "clear",
        }
    }
}

/// Called for every swallowed failure.
pub type ErrorHook = Arc<dyn Fn(SessionOp, &SessionKey, &SessionError) + Send + Sync>;

/// Loads and persists sessions through a codec and a store.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: PayloadCodec,
    error_hook: Option<ErrorHook>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: PayloadCodec) -> Self {
        Self {
            store,
            codec,
            error_hook: None,
        }
    }

    /// Validate `config`, open the SQLite store it names and build the codec.
    pub async fn connect(config: &PalaverConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let store = SqliteSessionStore::connect(&config.store)
            .await
            .with_context(|| {
                format!(
                    "failed to open session store at {}",
                    config.store.database_url
                )
            })?;
        info!(
            table = store.table(),
            compression = config.compression.enabled,
            level = config.compression.level,
            "session store ready"
        );
        Ok(Self::new(
            Arc::new(store),
            PayloadCodec::from_config(&config.compression),
        ))
    }

    /// Observe failures that the plain operations swallow.
    pub fn with_error_hook(
        mut self,
        hook: impl Fn(SessionOp, &SessionKey, &SessionError) + Send + Sync + 'static,
    ) -> Self {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    // ── Fallible operations ─────────────────────────────────────────────

    /// Write an empty session for `key`.
    pub async fn try_create_session(&self, key: &SessionKey) -> Result<(), SessionError> {
        let payload = self.codec.pack(&Session::new()).await?;
        self.store.create(key, &payload).await?;
        Ok(())
    }

    /// Load the session for `key`, creating an empty one if none is stored.
    ///
    /// A failure to create on miss is reported but does not fail the read:
    /// the caller still gets an empty session.
    pub async fn try_get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let stored = match self.store.read(key).await? {
            Some(record) if !record.value.is_null() => record.value,
            _ => {
                debug!(key = %key, "no stored session, creating");
                self.create_session(key).await;
                #[cfg(feature = "metrics")]
                counter!(session_metrics::CREATED_ON_MISS_TOTAL).increment(1);
                self.codec.pack(&Session::new()).await?.to_wire()
            },
        };
        Ok(self.codec.unpack(stored).await?)
    }

    /// Persist `session`. A missing or empty session deletes the record.
    pub async fn try_save_session(
        &self,
        key: &SessionKey,
        session: Option<&Session>,
    ) -> Result<(), SessionError> {
        let Some(session) = session.filter(|s| !s.is_empty()) else {
            debug!(key = %key, "session empty, clearing");
            return self.try_clear_session(key).await;
        };
        let payload = self.codec.pack(session).await?;
        #[cfg(feature = "metrics")]
        histogram!(session_metrics::PAYLOAD_BYTES).record(payload.stored_len() as f64);
        self.store.update(key, &payload).await?;
        Ok(())
    }

    pub async fn try_clear_session(&self, key: &SessionKey) -> Result<(), SessionError> {
        self.store.delete(key).await?;
        Ok(())
    }

    // ── Request-path operations (errors reported, never returned) ──────

    pub async fn create_session(&self, key: &SessionKey) {
        self.guarded(SessionOp::Create, key, self.try_create_session(key))
            .await;
    }

    /// `None` when the session could not be loaded or decoded.
    pub async fn get_session(&self, key: &SessionKey) -> Option<Session> {
        self.guarded(SessionOp::Get, key, self.try_get_session(key))
            .await
    }

    pub async fn save_session(&self, key: &SessionKey, session: Option<&Session>) {
        self.guarded(SessionOp::Save, key, self.try_save_session(key, session))
            .await;
    }

    pub async fn clear_session(&self, key: &SessionKey) {
        self.guarded(SessionOp::Clear, key, self.try_clear_session(key))
            .await;
    }

    async fn guarded<T>(
        &self,
        op: SessionOp,
        key: &SessionKey,
        fut: impl Future<Output = Result<T, SessionError>>,
    ) -> Option<T> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let result = fut.await;

        #[cfg(feature = "metrics")]
        {
            counter!(session_metrics::OPERATIONS_TOTAL, session_metrics::LABEL_OP => op.as_str())
                .increment(1);
            histogram!(session_metrics::DURATION_SECONDS, session_metrics::LABEL_OP => op.as_str())
                .record(start.elapsed().as_secs_f64());
        }

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.report(op, key, &err);
                None
            },
        }
    }

    fn report(&self, op: SessionOp, key: &SessionKey, err: &SessionError) {
        warn!(
            key = %key,
            op = op.as_str(),
            kind = err.kind(),
            error = %err,
            "session operation failed"
        );
        #[cfg(feature = "metrics")]
        counter!(
            session_metrics::ERRORS_TOTAL,
            session_metrics::LABEL_OP => op.as_str(),
            session_metrics::LABEL_KIND => err.kind()
        )
        .increment(1);
        if let Some(hook) = &self.error_hook {
            hook(op, key, err);
        }
    }
}
