//! Event dispatch for the authorization engine.
//!
//! The engine consumes the classified event stream, serializes every
//! store/window mutation behind a binary semaphore, and emits one account
//! snapshot per processed event, in input order.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::config::Config;
use crate::model::{AccountState, ExternalEvent};
use crate::window::{now_ms, TransactionWindow};

mod accounts;
mod transactions;

mod store;
pub use store::AccountStore;

/// The event dispatcher.
///
/// Owns the account store; shares the transaction window with the eviction
/// task. The gate excludes concurrent event processing but never eviction,
/// so the evictor makes progress while an authorization is waiting.
pub struct Engine {
    config: Config,
    store: AccountStore,
    window: Arc<TransactionWindow>,
    /// Binary gate: at most one in-flight mutation of the store and the
    /// window's logical state.
    gate: Semaphore,
}

impl Engine {
    pub fn new(config: Config, window: Arc<TransactionWindow>) -> Self {
        Self {
            config,
            store: AccountStore::new(),
            window,
            gate: Semaphore::new(1),
        }
    }

    /// Drain the event stream, writing one JSON snapshot line per processed
    /// event. Returns when the stream ends; a write failure aborts the run.
    pub async fn run(
        &self,
        mut stream: impl Stream<Item = ExternalEvent> + Unpin,
        mut out: impl Write,
    ) -> io::Result<()> {
        while let Some(event) = stream.next().await {
            if let Some(snapshot) = self.handle(event).await {
                let line = serde_json::to_string(&snapshot).map_err(io::Error::other)?;
                writeln!(out, "{line}")?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Dispatch a single event. `Start` yields no snapshot.
    pub async fn handle(&self, event: ExternalEvent) -> Option<AccountState> {
        match event {
            ExternalEvent::Start => {
                debug!("start sentinel");
                None
            }
            ExternalEvent::Account(account) => {
                // The gate is never closed, so acquire cannot fail.
                let _permit = self.gate.acquire().await.expect("event gate closed");
                Some(accounts::apply(&self.store, account).await)
            }
            ExternalEvent::Transaction(tx) => {
                let _permit = self.gate.acquire().await.expect("event gate closed");
                Some(
                    transactions::apply(&self.store, &self.window, &self.config, &tx, now_ms())
                        .await,
                )
            }
        }
    }
}
