//! Request interceptor binding a session to each inbound update.

use std::sync::Arc;

use tracing::{debug, warn};

use palaver_config::SessionConfig;

use crate::{
    context::SessionContext, handle::SessionHandle, key::SessionKey, manager::SessionManager,
};

/// Derives the session key from a request context. `None` skips sessions.
pub type KeyFn<C> = Arc<dyn Fn(&C) -> Option<SessionKey> + Send + Sync>;

/// `<sender>:<chat>` when the update carries both ids.
pub fn default_session_key<C: SessionContext>(ctx: &C) -> Option<SessionKey> {
    let sender = ctx.sender_id()?;
    let chat = ctx.chat_id()?;
    Some(SessionKey::for_conversation(&sender, &chat))
}

/// Loads the session before the handler runs and persists it afterwards.
pub struct SessionMiddleware<C> {
    manager: Arc<SessionManager>,
    property: String,
    key_fn: KeyFn<C>,
}

impl<C> Clone for SessionMiddleware<C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            property: self.property.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<C: SessionContext + 'static> SessionMiddleware<C> {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self::from_config(manager, &SessionConfig::default())
    }

    pub fn from_config(manager: Arc<SessionManager>, config: &SessionConfig) -> Self {
        Self {
            manager,
            property: config.property.clone(),
            key_fn: Arc::new(default_session_key::<C>),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn with_key_fn(
        mut self,
        key_fn: impl Fn(&C) -> Option<SessionKey> + Send + Sync + 'static,
    ) -> Self {
        self.key_fn = Arc::new(key_fn);
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Run `next` with a session bound on `ctx`, then persist it.
    ///
    /// Without a key, `next` runs untouched and its result is returned as-is.
    /// With a key, session storage problems and handler errors are logged and
    /// this always returns `Ok(())`. A failed handler's session is not saved.
    pub async fn handle<F, Fut>(&self, mut ctx: C, next: F) -> anyhow::Result<()>
    where
        F: FnOnce(C) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let Some(key) = (self.key_fn)(&ctx).filter(|k| !k.as_str().is_empty()) else {
            return next(ctx).await;
        };

        let handle = SessionHandle::new(self.manager.get_session(&key).await);
        ctx.bind_session(&self.property, handle.clone());

        match next(ctx).await {
            Ok(()) => {
                let session = handle.get();
                debug!(key = %key, present = session.is_some(), "persisting session");
                self.manager.save_session(&key, session.as_ref()).await;
            },
            Err(e) => {
                warn!(key = %key, error = %e, "handler failed, session not saved");
            },
        }
        Ok(())
    }
}
