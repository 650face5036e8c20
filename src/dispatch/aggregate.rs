//! Aggregation of every cmdset visible to an actor for one dispatch cycle.
//!
//! Sources, in rising precedence: the actor's location, objects contained
//! in that location (exits contribute synthesized traversal sets), channel
//! relay commands for the actor's subscriptions, the controlling account's
//! out-of-character stack, and finally the actor's own stack. The fold
//! applies each higher-precedence source on top of the accumulated rest,
//! so explicit set priorities still decide every pairwise merge.

use crate::channel::{ChannelDirectory, RelayHandler};
use crate::cmdset::{CmdSet, merge};
use crate::command::{CommandSpec, CommandKind};
use crate::core::{CmdError, ObjectId, Result};
use crate::world::{WorldState, exit_cmdset};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The final merged set of commands visible to one actor, with provenance
/// for commands contributed by surrounding objects.
pub struct AggregatedSet {
    pub set: CmdSet,
    sources: HashMap<usize, ObjectId>,
}

impl AggregatedSet {
    pub fn empty() -> Self {
        Self {
            set: CmdSet::empty(),
            sources: HashMap::new(),
        }
    }

    /// The object a command was found on, if it came from the surroundings.
    pub fn source_of(&self, spec: &Arc<CommandSpec>) -> Option<ObjectId> {
        self.sources.get(&(Arc::as_ptr(spec) as usize)).copied()
    }
}

/// Gather and fold every cmdset source for `actor`.
///
/// An actor whose own stack has no default set is treated as having no
/// commands at all: aggregation yields the empty set no matter what the
/// surroundings offer.
pub async fn aggregate(
    world: &Arc<RwLock<WorldState>>,
    channels: &Arc<dyn ChannelDirectory>,
    actor: ObjectId,
) -> Result<AggregatedSet> {
    let world = world.read().await;
    let actor_obj = world
        .object(actor)
        .ok_or_else(|| CmdError::ObjectNotFound(actor.to_string()))?;

    if !actor_obj.cmdsets().has_default() {
        return Ok(AggregatedSet::empty());
    }

    let mut sources: Vec<(CmdSet, Option<ObjectId>)> = Vec::new();

    if let Some(location) = actor_obj.location() {
        if let Some(room) = world.object(location) {
            sources.push((room.cmdsets().merged().clone(), Some(location)));
        }
        for oid in world.contents(location) {
            if oid == actor {
                continue;
            }
            let obj = match world.object(oid) {
                Some(obj) => obj,
                None => continue,
            };
            if let Some(set) = exit_cmdset(obj) {
                sources.push((set, Some(oid)));
            } else {
                sources.push((obj.cmdsets().merged().clone(), Some(oid)));
            }
        }
    }

    let subscriptions = channels.subscriptions(actor).await;
    if !subscriptions.is_empty() {
        let mut set = CmdSet::new("channels");
        for channel in subscriptions {
            let handler = Arc::new(RelayHandler {
                channel: channel.clone(),
            });
            set.add(CommandSpec::relay(channel, handler));
        }
        sources.push((set, None));
    }

    if let Some(account) = actor_obj.account() {
        if let Some(account) = world.account(account) {
            sources.push((account.cmdsets().merged().clone(), None));
        }
    }

    sources.push((actor_obj.cmdsets().merged().clone(), Some(actor)));

    let mut provenance = HashMap::new();
    for (set, source) in &sources {
        let Some(oid) = source else { continue };
        for cmd in set.iter() {
            provenance.insert(Arc::as_ptr(cmd) as usize, *oid);
        }
    }

    let mut folded: Option<CmdSet> = None;
    for (set, _) in sources {
        if set.is_empty() && set.key() == "_empty" {
            continue;
        }
        folded = Some(match folded {
            None => set,
            Some(acc) => merge(&set, &acc),
        });
    }

    Ok(AggregatedSet {
        set: folded.unwrap_or_else(CmdSet::empty),
        sources: provenance,
    })
}

/// Look up a bound system command in an aggregated set.
pub(crate) fn system_hook<'a>(
    agg: &'a AggregatedSet,
    key: &str,
) -> Option<&'a Arc<CommandSpec>> {
    agg.set
        .get(key)
        .filter(|spec| spec.kind() == CommandKind::System)
}
