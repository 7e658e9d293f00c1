use std::sync::Arc;

use {
    anyhow::{Result, anyhow},
    clap::Args,
    palaver_config::discover_and_load,
    palaver_sessions::{
        Chat, Sender, Session, SessionHandle, SessionManager, SessionMiddleware, UpdateContext,
    },
    serde_json::Value,
    tracing::info,
};

#[derive(Args)]
pub struct SimulateArgs {
    /// Sender id of the update.
    #[arg(long)]
    from: Option<i64>,

    /// Chat id of the update.
    #[arg(long)]
    chat: Option<i64>,

    /// Message text carried by the update.
    #[arg(long)]
    text: Option<String>,

    /// Start from an empty session before applying edits.
    #[arg(long)]
    reset: bool,

    /// Set a session field; the value is parsed as JSON, else kept as a string.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,

    /// Remove a session field.
    #[arg(long = "unset", value_name = "KEY")]
    unset: Vec<String>,

    /// Make the handler fail so the session is not persisted.
    #[arg(long)]
    fail: bool,

    /// Print the session metrics recorded during the run.
    #[arg(long)]
    print_metrics: bool,
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    #[cfg(feature = "metrics")]
    let recorder = if args.print_metrics {
        Some(palaver_metrics::install_prometheus_recorder()?)
    } else {
        None
    };
    #[cfg(not(feature = "metrics"))]
    if args.print_metrics {
        anyhow::bail!("palaver was built without the metrics feature");
    }

    let config = discover_and_load()?;
    let manager = SessionManager::connect(&config).await?.with_error_hook(|op, key, err| {
        eprintln!("session {} failed for {key}: {err}", op.as_str());
    });
    let middleware = SessionMiddleware::from_config(Arc::new(manager), &config.session);

    let mut ctx = UpdateContext::new(
        args.from.map(|id| Sender { id, username: None }),
        args.chat.map(|id| Chat { id }),
    );
    if let Some(text) = &args.text {
        ctx = ctx.with_text(text.clone());
    }

    let property = middleware.property().to_string();
    let outcome = SessionHandle::default();
    let seen = outcome.clone();
    let edits = Edits {
        reset: args.reset,
        set: args.set,
        unset: args.unset,
    };
    let fail = args.fail;

    middleware
        .handle(ctx, |ctx| async move {
            let Some(handle) = ctx.session(&property) else {
                info!("update has no session key, handler ran without a session");
                return Ok(());
            };
            edits.apply(handle);
            match handle.get() {
                Some(session) => seen.set(session),
                None => seen.clear(),
            }
            if fail {
                return Err(anyhow!("handler failed on request"));
            }
            Ok(())
        })
        .await?;

    match outcome.get() {
        Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
        None => println!("(no session)"),
    }

    #[cfg(feature = "metrics")]
    if let Some(recorder) = recorder {
        print!("{}", recorder.render());
    }
    Ok(())
}

struct Edits {
    reset: bool,
    set: Vec<(String, Value)>,
    unset: Vec<String>,
}

impl Edits {
    fn apply(self, handle: &SessionHandle) {
        if self.reset {
            handle.set(Session::new());
        }
        if self.set.is_empty() && self.unset.is_empty() {
            return;
        }
        let mut session = handle.get().unwrap_or_default();
        session.extend(self.set);
        for key in &self.unset {
            session.remove(key);
        }
        handle.set(session);
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err("field name must not be empty".into());
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
