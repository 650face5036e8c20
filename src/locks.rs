use crate::command::CommandSpec;
use crate::core::{CMD_ACCESS, ObjectId};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Access-control seam consulted by the dispatcher before a matched
/// command may run.
///
/// Full lock-string grammars live outside this crate; implementations are
/// free to interpret [`CommandSpec::lock_string`] however they like. The
/// dispatcher always checks with access type [`CMD_ACCESS`].
#[async_trait]
pub trait LockEvaluator: Send + Sync {
    async fn check(&self, actor: ObjectId, command: &CommandSpec, access_type: &str) -> bool;
}

/// Evaluator that grants everything. The default for freshly built engines.
pub struct AllowAll;

#[async_trait]
impl LockEvaluator for AllowAll {
    async fn check(&self, _actor: ObjectId, _command: &CommandSpec, _access_type: &str) -> bool {
        true
    }
}

/// Evaluator that denies everything.
pub struct DenyAll;

#[async_trait]
impl LockEvaluator for DenyAll {
    async fn check(&self, _actor: ObjectId, _command: &CommandSpec, _access_type: &str) -> bool {
        false
    }
}

/// Actor permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Player,
    Builder,
    Admin,
}

impl Permission {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "player" => Some(Self::Player),
            "builder" => Some(Self::Builder),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// What a lock segment demands for one access type.
enum LockSpec {
    All,
    Perm(Permission),
    Never,
}

impl LockSpec {
    /// Parse the segment for `access_type` out of a lock string such as
    /// `"cmd:perm(Builder);admin:perm(Admin)"`.
    ///
    /// An empty lock string is open. Unknown lock functions deny.
    fn parse(lock: &str, access_type: &str) -> Self {
        if lock.trim().is_empty() {
            return Self::All;
        }
        for segment in lock.split(';') {
            let Some((atype, func)) = segment.split_once(':') else {
                continue;
            };
            if atype.trim() != access_type {
                continue;
            }
            let func = func.trim();
            if func.eq_ignore_ascii_case("all()") {
                return Self::All;
            }
            if func.eq_ignore_ascii_case("false()") {
                return Self::Never;
            }
            if let Some(arg) = func
                .strip_prefix("perm(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                return match Permission::parse(arg) {
                    Some(p) => Self::Perm(p),
                    None => Self::Never,
                };
            }
            return Self::Never;
        }
        // no segment for this access type: open by default
        Self::All
    }
}

/// Permission-ladder lock evaluator.
///
/// Grants each actor a [`Permission`] level and honors the small lock
/// conventions `cmd:all()`, `cmd:perm(<level>)` and `cmd:false()`.
pub struct PermissionLocks {
    grants: RwLock<HashMap<ObjectId, Permission>>,
    default_level: Permission,
}

impl PermissionLocks {
    /// Actors without an explicit grant get `Player`.
    pub fn new() -> Self {
        Self::with_default(Permission::Player)
    }

    pub fn with_default(default_level: Permission) -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            default_level,
        }
    }

    pub async fn grant(&self, actor: ObjectId, level: Permission) {
        self.grants.write().await.insert(actor, level);
    }

    pub async fn revoke(&self, actor: ObjectId) {
        self.grants.write().await.remove(&actor);
    }

    pub async fn level(&self, actor: ObjectId) -> Permission {
        self.grants
            .read()
            .await
            .get(&actor)
            .copied()
            .unwrap_or(self.default_level)
    }
}

impl Default for PermissionLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockEvaluator for PermissionLocks {
    async fn check(&self, actor: ObjectId, command: &CommandSpec, access_type: &str) -> bool {
        match LockSpec::parse(command.lock_string(), access_type) {
            LockSpec::All => true,
            LockSpec::Never => false,
            LockSpec::Perm(required) => self.level(actor).await >= required,
        }
    }
}

/// Convenience check with the standard `"cmd"` access type.
pub async fn cmd_access(
    evaluator: &dyn LockEvaluator,
    actor: ObjectId,
    command: &CommandSpec,
) -> bool {
    evaluator.check(actor, command, CMD_ACCESS).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use uuid::Uuid;

    fn cmd(lock: &str) -> CommandSpec {
        CommandSpec::from_fn("test", |_| Ok(None)).lock(lock)
    }

    #[tokio::test]
    async fn test_empty_lock_is_open() {
        let locks = PermissionLocks::new();
        assert!(locks.check(Uuid::new_v4(), &cmd(""), CMD_ACCESS).await);
    }

    #[tokio::test]
    async fn test_perm_ladder() {
        let locks = PermissionLocks::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        locks.grant(alice, Permission::Builder).await;

        let dig = cmd("cmd:perm(Builder)");
        assert!(locks.check(alice, &dig, CMD_ACCESS).await);
        assert!(!locks.check(bob, &dig, CMD_ACCESS).await);

        // admins pass every perm() gate
        locks.grant(bob, Permission::Admin).await;
        assert!(locks.check(bob, &cmd("cmd:perm(Admin)"), CMD_ACCESS).await);
    }

    #[tokio::test]
    async fn test_unknown_lock_function_denies() {
        let locks = PermissionLocks::new();
        assert!(
            !locks
                .check(Uuid::new_v4(), &cmd("cmd:holds(sword)"), CMD_ACCESS)
                .await
        );
    }

    #[tokio::test]
    async fn test_other_access_types_ignored() {
        let locks = PermissionLocks::new();
        let spec = cmd("edit:perm(Admin)");
        // no "cmd" segment: open for dispatch
        assert!(locks.check(Uuid::new_v4(), &spec, CMD_ACCESS).await);
    }

    #[tokio::test]
    async fn test_false_lock() {
        let locks = PermissionLocks::new();
        let actor = Uuid::new_v4();
        locks.grant(actor, Permission::Admin).await;
        assert!(!locks.check(actor, &cmd("cmd:false()"), CMD_ACCESS).await);
    }
}
