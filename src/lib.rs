// ============================================================================
// rustmudcmd Library
// ============================================================================

pub mod channel;
pub mod cmdset;
pub mod command;
pub mod core;
pub mod dispatch;
pub mod help;
pub mod locks;
pub mod persist;
pub mod session;
pub mod world;

// Re-export main types for convenience
pub use crate::core::{AccountId, CmdError, ObjectId, Result};
pub use channel::{ChannelDirectory, ChannelPost, InMemoryChannels, RelayHandler};
pub use cmdset::{CmdSet, CmdSetStack, MergeType, merge, merge_stack};
pub use command::{
    CommandHandler, CommandInstance, CommandKind, CommandSpec, ExecutionContext, FnHandler,
    StoredCommand,
};
pub use dispatch::{AggregatedSet, DispatchOutcome, DispatchResult, Dispatcher, SystemCmd};
pub use help::{HelpEntry, HelpIndex};
pub use locks::{AllowAll, DenyAll, LockEvaluator, Permission, PermissionLocks};
pub use persist::{CmdSetFactory, FileSnapshotStore, SnapshotStore, StackSnapshot};
pub use session::{EngineConfig, Session, SessionManager, SessionStats};
pub use world::{Account, ExitTraverse, GameObject, ObjectKind, WorldState};

use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// High-level Engine API
// ============================================================================

/// The assembled command engine: world, dispatcher and session registry.
///
/// This is the recommended way to use the crate. Game code builds the
/// world and its cmdsets, then opens sessions and feeds them input lines.
///
/// # Examples
///
/// ```
/// use rustmudcmd::{CmdSet, CommandSpec, Engine};
///
/// # tokio_test::block_on(async {
/// let engine = Engine::new();
///
/// let actor = {
///     let mut world = engine.world().write().await;
///     let hall = world.create_room("Hall");
///     let actor = world.create_character("Wanderer", hall);
///
///     let mut base = CmdSet::new("base");
///     base.add(CommandSpec::from_fn("say", |cmd| {
///         let line = format!("You say, \"{}\"", cmd.args);
///         cmd.msg(line.clone());
///         Ok(Some(line))
///     }));
///     world
///         .object_mut(actor)
///         .unwrap()
///         .cmdsets_mut()
///         .add_default(base, false);
///     actor
/// };
///
/// let (mut session, _greeting) = engine.connect(actor).await.unwrap();
/// let result = session.process("say hello").await.unwrap();
/// assert_eq!(result.output, vec!["You say, \"hello\"".to_string()]);
/// # });
/// ```
pub struct Engine {
    world: Arc<RwLock<WorldState>>,
    channels: Arc<dyn ChannelDirectory>,
    dispatcher: Arc<Dispatcher>,
    sessions: SessionManager,
}

impl Engine {
    /// Build an engine with default configuration, open locks and an
    /// in-memory channel directory.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Shared handle to the world state.
    pub fn world(&self) -> &Arc<RwLock<WorldState>> {
        &self.world
    }

    /// The channel directory the dispatcher aggregates subscriptions from.
    pub fn channels(&self) -> Arc<dyn ChannelDirectory> {
        self.channels.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Open a session for an actor, firing the `LoginStart` hook.
    ///
    /// Returns the session and whatever output the hook produced.
    pub async fn connect(&self, actor: ObjectId) -> Result<(Session, Vec<String>)> {
        self.sessions.connect(actor).await
    }

    /// One-shot programmatic dispatch, bypassing session bookkeeping.
    pub async fn dispatch(&self, actor: ObjectId, input: &str) -> Result<DispatchResult> {
        self.dispatcher.dispatch(actor, input).await
    }

    pub async fn stats(&self) -> SessionStats {
        self.sessions.stats().await
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Engine`], for swapping in custom locks, channels or
/// configuration.
///
/// # Examples
///
/// ```
/// use rustmudcmd::{Engine, EngineConfig, PermissionLocks};
/// use std::sync::Arc;
///
/// let engine = Engine::builder()
///     .config(EngineConfig::new().nomatch_message("Huh?"))
///     .locks(Arc::new(PermissionLocks::new()))
///     .build();
/// # let _ = engine;
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    locks: Arc<dyn LockEvaluator>,
    channels: Option<Arc<dyn ChannelDirectory>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            locks: Arc::new(AllowAll),
            channels: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn locks(mut self, locks: Arc<dyn LockEvaluator>) -> Self {
        self.locks = locks;
        self
    }

    pub fn channels(mut self, channels: Arc<dyn ChannelDirectory>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn build(self) -> Engine {
        let channels = self
            .channels
            .unwrap_or_else(|| Arc::new(InMemoryChannels::new(self.config.channel_history)));
        let world = Arc::new(RwLock::new(WorldState::new()));
        let dispatcher = Arc::new(Dispatcher::new(
            world.clone(),
            self.locks,
            channels.clone(),
            self.config,
        ));
        Engine {
            world,
            channels,
            sessions: SessionManager::new(dispatcher.clone()),
            dispatcher,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
