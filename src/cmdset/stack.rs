use super::{CmdSet, merge::merge};
use crate::core::{CmdError, ObjectId, Result};
use crate::persist::StackSnapshot;

use chrono::Utc;

struct StackEntry {
    set: CmdSet,
    persistent: bool,
}

/// Per-owner stack of active cmdsets.
///
/// The bottom entry is the protected default set; everything above it is
/// pushed and removed by game code. The fully merged result is cached and
/// recomputed on every mutation, so `merged()` is never stale.
pub struct CmdSetStack {
    default: Option<StackEntry>,
    entries: Vec<StackEntry>,
    merged: CmdSet,
}

impl CmdSetStack {
    pub fn new() -> Self {
        Self {
            default: None,
            entries: Vec::new(),
            merged: CmdSet::empty(),
        }
    }

    /// Install or replace the default (bottom) set.
    pub fn add_default(&mut self, set: CmdSet, persistent: bool) {
        self.default = Some(StackEntry { set, persistent });
        self.recompute();
    }

    /// Push a non-default set onto the stack.
    ///
    /// `persistent` marks the set for inclusion in stack snapshots; it has
    /// no effect on in-memory behavior.
    pub fn add(&mut self, set: CmdSet, persistent: bool) {
        self.entries.push(StackEntry { set, persistent });
        self.recompute();
    }

    /// Remove the named set, or the most recently added non-default set
    /// when no key is given. Refuses to touch the default set.
    pub fn remove(&mut self, key: Option<&str>) -> Result<CmdSet> {
        let removed = match key {
            Some(k) => {
                if self.default.as_ref().is_some_and(|d| d.set.key() == k) {
                    return Err(CmdError::DefaultSetProtected(k.to_string()));
                }
                let idx = self
                    .entries
                    .iter()
                    .rposition(|e| e.set.key() == k)
                    .ok_or_else(|| CmdError::CmdSetNotFound(k.to_string()))?;
                self.entries.remove(idx)
            }
            None => self
                .entries
                .pop()
                .ok_or_else(|| CmdError::CmdSetNotFound("(top of stack)".to_string()))?,
        };
        self.recompute();
        Ok(removed.set)
    }

    /// Explicitly drop the default set.
    ///
    /// Afterward the owner resolves to no commands at all until a new
    /// default is installed.
    pub fn remove_default(&mut self) -> Option<CmdSet> {
        let removed = self.default.take().map(|e| e.set);
        self.recompute();
        removed
    }

    /// The cached merged result of folding the whole stack.
    pub fn merged(&self) -> &CmdSet {
        &self.merged
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_key(&self) -> Option<&str> {
        self.default.as_ref().map(|e| e.set.key())
    }

    /// Keys of all active sets, bottom (default) first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.default
            .iter()
            .chain(self.entries.iter())
            .map(|e| e.set.key())
    }

    /// Number of active sets including the default.
    pub fn depth(&self) -> usize {
        self.entries.len() + usize::from(self.default.is_some())
    }

    /// Membership snapshot of the persistent sets, for the snapshot store.
    pub fn snapshot(&self, owner: ObjectId) -> StackSnapshot {
        StackSnapshot {
            owner,
            default_key: self
                .default
                .as_ref()
                .filter(|e| e.persistent)
                .map(|e| e.set.key().to_string()),
            set_keys: self
                .entries
                .iter()
                .filter(|e| e.persistent)
                .map(|e| e.set.key().to_string())
                .collect(),
            saved_at: Utc::now(),
        }
    }

    fn recompute(&mut self) {
        self.merged = match &self.default {
            None => CmdSet::empty(),
            Some(d) => {
                let mut acc = d.set.clone();
                for entry in &self.entries {
                    acc = merge(&entry.set, &acc);
                }
                acc
            }
        };
    }
}

impl Default for CmdSetStack {
    fn default() -> Self {
        Self::new()
    }
}
