use crate::command::{CommandHandler, CommandInstance, ExecutionContext};
use crate::core::{CmdError, ObjectId, Result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

/// Channel subsystem seam.
///
/// Supplies the dispatcher with the channels an actor subscribes to (one
/// relay command is synthesized per subscription during aggregation) and
/// accepts relayed text. Delivery to connected sessions belongs to the
/// transport layer, not this crate.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Channel names the actor currently listens to.
    async fn subscriptions(&self, actor: ObjectId) -> Vec<String>;

    /// Relay a line of text from `actor` to the named channel.
    async fn relay(&self, channel: &str, actor: ObjectId, message: &str) -> Result<()>;
}

/// One relayed message.
#[derive(Debug, Clone)]
pub struct ChannelPost {
    pub author: ObjectId,
    pub body: String,
    pub at: DateTime<Utc>,
}

struct ChannelState {
    subscribers: HashSet<ObjectId>,
    history: VecDeque<ChannelPost>,
}

/// In-memory channel directory with a bounded history tail per channel.
pub struct InMemoryChannels {
    channels: RwLock<HashMap<String, ChannelState>>,
    history_limit: usize,
}

impl InMemoryChannels {
    pub fn new(history_limit: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            history_limit,
        }
    }

    /// Create a channel. Creating an existing channel is a no-op.
    pub async fn create(&self, name: impl Into<String>) {
        let name = name.into().trim().to_lowercase();
        self.channels
            .write()
            .await
            .entry(name)
            .or_insert_with(|| ChannelState {
                subscribers: HashSet::new(),
                history: VecDeque::new(),
            });
    }

    pub async fn subscribe(&self, name: &str, actor: ObjectId) -> Result<()> {
        let mut channels = self.channels.write().await;
        let state = channels
            .get_mut(name)
            .ok_or_else(|| CmdError::ChannelNotFound(name.to_string()))?;
        state.subscribers.insert(actor);
        Ok(())
    }

    pub async fn unsubscribe(&self, name: &str, actor: ObjectId) -> Result<()> {
        let mut channels = self.channels.write().await;
        let state = channels
            .get_mut(name)
            .ok_or_else(|| CmdError::ChannelNotFound(name.to_string()))?;
        state.subscribers.remove(&actor);
        Ok(())
    }

    /// All channel names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// The most recent `count` posts on a channel, oldest first.
    pub async fn history(&self, name: &str, count: usize) -> Result<Vec<ChannelPost>> {
        let channels = self.channels.read().await;
        let state = channels
            .get(name)
            .ok_or_else(|| CmdError::ChannelNotFound(name.to_string()))?;
        Ok(state
            .history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChannelDirectory for InMemoryChannels {
    async fn subscriptions(&self, actor: ObjectId) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut names: Vec<String> = channels
            .iter()
            .filter(|(_, state)| state.subscribers.contains(&actor))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    async fn relay(&self, channel: &str, actor: ObjectId, message: &str) -> Result<()> {
        let mut channels = self.channels.write().await;
        let state = channels
            .get_mut(channel)
            .ok_or_else(|| CmdError::ChannelNotFound(channel.to_string()))?;
        state.history.push_back(ChannelPost {
            author: actor,
            body: message.to_string(),
            at: Utc::now(),
        });
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        tracing::debug!(channel, %actor, "relayed channel message");
        Ok(())
    }
}

/// Handler behind every synthesized channel command: relays the argument
/// text to its channel through the directory.
pub struct RelayHandler {
    pub channel: String,
}

#[async_trait]
impl CommandHandler for RelayHandler {
    fn name(&self) -> &str {
        "channel_relay"
    }

    async fn execute(
        &self,
        cmd: &mut CommandInstance,
        ctx: &ExecutionContext,
    ) -> Result<Option<String>> {
        let text = cmd.args.trim();
        if text.is_empty() {
            cmd.msg(format!("Say what on {}?", self.channel));
            return Ok(None);
        }
        ctx.channels.relay(&self.channel, cmd.actor, text).await?;
        cmd.msg(format!("[{}] you: {}", self.channel, text));
        Ok(None)
    }
}
