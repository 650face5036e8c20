//! Persistence of cmdset-stack membership.
//!
//! Command handlers are live code and cannot be serialized; what survives
//! a restart is *membership*: which named sets an owner had active, and
//! which was the default. On reload the [`CmdSetFactory`] rebuilds each
//! live set from its registered construction hook.

use crate::cmdset::{CmdSet, CmdSetStack};
use crate::core::{CmdError, ObjectId, Result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Membership snapshot of one owner's persistent cmdsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSnapshot {
    pub owner: ObjectId,
    pub default_key: Option<String>,
    pub set_keys: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

/// Storage seam for stack snapshots, keyed by owner identity.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &StackSnapshot) -> Result<()>;
    async fn load(&self, owner: ObjectId) -> Result<Option<StackSnapshot>>;
}

/// File-backed snapshot store: one MessagePack file per owner, replaced
/// atomically on save.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, owner: ObjectId) -> PathBuf {
        self.dir.join(format!("{owner}.cmdsets"))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, snapshot: &StackSnapshot) -> Result<()> {
        let bytes =
            rmp_serde::to_vec(snapshot).map_err(|e| CmdError::PersistError(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(self.path(snapshot.owner))
            .map_err(|e| CmdError::PersistError(e.to_string()))?;

        tracing::debug!(owner = %snapshot.owner, sets = snapshot.set_keys.len(), "saved stack snapshot");
        Ok(())
    }

    async fn load(&self, owner: ObjectId) -> Result<Option<StackSnapshot>> {
        let bytes = match std::fs::read(self.path(owner)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot =
            rmp_serde::from_slice(&bytes).map_err(|e| CmdError::PersistError(e.to_string()))?;
        Ok(Some(snapshot))
    }
}

type SetBuilder = dyn Fn() -> CmdSet + Send + Sync;

/// Registry of cmdset construction hooks, keyed by set name.
///
/// Game code registers a builder per named set once at startup; restoring
/// a snapshot re-runs the hooks to produce live sets. A process-wide
/// instance is available via [`CmdSetFactory::global`] so reload paths
/// need no plumbing.
pub struct CmdSetFactory {
    builders: RwLock<HashMap<String, Arc<SetBuilder>>>,
}

lazy_static! {
    static ref GLOBAL_FACTORY: CmdSetFactory = CmdSetFactory::new();
}

impl CmdSetFactory {
    pub fn new() -> Self {
        Self {
            builders: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide factory shared by all reload paths.
    pub fn global() -> &'static CmdSetFactory {
        &GLOBAL_FACTORY
    }

    pub fn register(
        &self,
        key: impl Into<String>,
        builder: impl Fn() -> CmdSet + Send + Sync + 'static,
    ) -> Result<()> {
        self.builders.write()?.insert(key.into(), Arc::new(builder));
        Ok(())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.builders.read()?.contains_key(key))
    }

    /// Build a fresh live set from its registered hook.
    pub fn build(&self, key: &str) -> Result<CmdSet> {
        let builder = self
            .builders
            .read()?
            .get(key)
            .cloned()
            .ok_or_else(|| CmdError::CmdSetNotFound(key.to_string()))?;
        Ok(builder())
    }

    /// Rebuild a whole stack from a membership snapshot.
    pub fn restore(&self, snapshot: &StackSnapshot) -> Result<CmdSetStack> {
        let mut stack = CmdSetStack::new();
        if let Some(default_key) = &snapshot.default_key {
            stack.add_default(self.build(default_key)?, true);
        }
        for key in &snapshot.set_keys {
            stack.add(self.build(key)?, true);
        }
        Ok(stack)
    }
}

impl Default for CmdSetFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use uuid::Uuid;

    fn sample_set(key: &str) -> CmdSet {
        let mut set = CmdSet::new(key);
        set.add(CommandSpec::from_fn("look", |_| Ok(None)));
        set
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();
        let owner = Uuid::new_v4();

        let snapshot = StackSnapshot {
            owner,
            default_key: Some("base".to_string()),
            set_keys: vec!["combat".to_string()],
            saved_at: Utc::now(),
        };
        store.save(&snapshot).await.unwrap();

        let loaded = store.load(owner).await.unwrap().unwrap();
        assert_eq!(loaded.default_key.as_deref(), Some("base"));
        assert_eq!(loaded.set_keys, vec!["combat".to_string()]);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn test_factory_restore() {
        let factory = CmdSetFactory::new();
        factory.register("base", || sample_set("base")).unwrap();
        factory.register("combat", || sample_set("combat")).unwrap();

        let snapshot = StackSnapshot {
            owner: Uuid::new_v4(),
            default_key: Some("base".to_string()),
            set_keys: vec!["combat".to_string()],
            saved_at: Utc::now(),
        };

        let stack = factory.restore(&snapshot).unwrap();
        assert_eq!(stack.default_key(), Some("base"));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_factory_unknown_set() {
        let factory = CmdSetFactory::new();
        assert!(matches!(
            factory.build("missing"),
            Err(CmdError::CmdSetNotFound(_))
        ));
    }
}
