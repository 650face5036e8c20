pub mod config;

pub use config::EngineConfig;

use crate::core::{CmdError, ObjectId, Result};
use crate::dispatch::{DispatchResult, Dispatcher, SystemCmd};

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// One actor's connection to the engine.
///
/// `process` takes `&mut self`, so a session's inputs run strictly in
/// submission order with no interleaving of that actor's own commands.
/// Fairness between different sessions is left to the runtime scheduler.
pub struct Session {
    actor: ObjectId,
    dispatcher: Arc<Dispatcher>,
    connected: Arc<Mutex<HashSet<ObjectId>>>,
    connected_at: DateTime<Utc>,
    commands: u64,
}

impl Session {
    pub fn actor(&self) -> ObjectId {
        self.actor
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn commands_dispatched(&self) -> u64 {
        self.commands
    }

    /// Dispatch one line of input for this session's actor.
    pub async fn process(&mut self, line: &str) -> Result<DispatchResult> {
        self.commands += 1;
        self.dispatcher.dispatch(self.actor, line).await
    }

    /// Disconnect cleanly, releasing the actor for a new session.
    pub async fn close(mut self) {
        if let Some(actor) = self.take_actor() {
            self.connected.lock().await.remove(&actor);
            tracing::info!(%actor, "session closed");
        }
    }

    fn take_actor(&mut self) -> Option<ObjectId> {
        // Drop runs after close(); the nil marker keeps it from double-removing
        if self.actor.is_nil() {
            None
        } else {
            Some(std::mem::replace(&mut self.actor, ObjectId::nil()))
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(actor) = self.take_actor() {
            // best effort: close() allows async cleanup, Drop cannot wait
            if let Ok(mut connected) = self.connected.try_lock() {
                connected.remove(&actor);
            } else {
                tracing::warn!(
                    %actor,
                    "session dropped while registry was busy; use session.close().await"
                );
            }
        }
    }
}

/// Tracks which actors are connected and opens new sessions.
///
/// Connecting fires the `LoginStart` hook exactly once per connection,
/// before any input is processed.
pub struct SessionManager {
    dispatcher: Arc<Dispatcher>,
    connected: Arc<Mutex<HashSet<ObjectId>>>,
    total_connections: Arc<AtomicUsize>,
}

impl SessionManager {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            connected: Arc::new(Mutex::new(HashSet::new())),
            total_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a session for `actor`.
    ///
    /// Returns the session together with any output the `LoginStart` hook
    /// produced (the built-in behavior when unbound is silence).
    pub async fn connect(&self, actor: ObjectId) -> Result<(Session, Vec<String>)> {
        {
            let mut connected = self.connected.lock().await;
            if !connected.insert(actor) {
                return Err(CmdError::SessionError(format!(
                    "actor {actor} is already connected"
                )));
            }
        }

        let greeting = match self
            .dispatcher
            .dispatch_hook(actor, SystemCmd::LoginStart, "")
            .await
        {
            Ok(result) => result.output,
            Err(err) => {
                self.connected.lock().await.remove(&actor);
                return Err(err);
            }
        };

        self.total_connections.fetch_add(1, Ordering::SeqCst);
        tracing::info!(%actor, "session opened");

        Ok((
            Session {
                actor,
                dispatcher: self.dispatcher.clone(),
                connected: self.connected.clone(),
                connected_at: Utc::now(),
                commands: 0,
            },
            greeting,
        ))
    }

    pub async fn is_connected(&self, actor: ObjectId) -> bool {
        self.connected.lock().await.contains(&actor)
    }

    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            connected: self.connected.lock().await.len(),
            total_connections: self.total_connections.load(Ordering::SeqCst),
        }
    }
}

/// Session registry statistics.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub connected: usize,
    pub total_connections: usize,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sessions: {} connected, {} total",
            self.connected, self.total_connections
        )
    }
}
