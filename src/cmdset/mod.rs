pub mod merge;
pub mod stack;

pub use merge::{MergeType, merge, merge_stack};
pub use stack::CmdSetStack;

use crate::command::CommandSpec;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, priority- and merge-type-tagged collection of commands.
///
/// Cmdsets are immutable values at merge time: the merge engine produces
/// new sets rather than mutating operands, and the backing `im::Vector`
/// makes those copies cheap. Key uniqueness is enforced when commands are
/// added; merged results may carry duplicate keys when a set opts into
/// `allow_duplicates`.
#[derive(Debug, Clone)]
pub struct CmdSet {
    pub(crate) key: String,
    pub(crate) priority: i32,
    pub(crate) merge_type: MergeType,
    pub(crate) allow_duplicates: bool,
    pub(crate) key_mergetypes: HashMap<String, MergeType>,
    pub(crate) commands: im::Vector<Arc<CommandSpec>>,
}

impl CmdSet {
    /// Create an empty cmdset with priority 0 and Union merging.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            priority: 0,
            merge_type: MergeType::Union,
            allow_duplicates: false,
            key_mergetypes: HashMap::new(),
            commands: im::Vector::new(),
        }
    }

    /// The empty set an owner without a default cmdset resolves to.
    pub fn empty() -> Self {
        Self::new("_empty")
    }

    /// Set the merge priority. Higher wins ties; 9–10 are conventionally
    /// reserved for system-override sets.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_merge_type(mut self, merge_type: MergeType) -> Self {
        self.merge_type = merge_type;
        self
    }

    /// Let same-key commands from an equal-priority merge partner coexist,
    /// surfacing a multimatch instead of silently winning.
    pub fn with_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }

    /// Override the merge type used against one specifically-named set.
    pub fn with_key_mergetype(mut self, other_key: impl Into<String>, mt: MergeType) -> Self {
        self.key_mergetypes.insert(other_key.into(), mt);
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with_command(mut self, spec: CommandSpec) -> Self {
        self.add(spec);
        self
    }

    /// Insert a command, replacing any existing command that shares one of
    /// its invocation names. Last added wins.
    pub fn add(&mut self, spec: CommandSpec) {
        let names: Vec<String> = spec.names().map(str::to_string).collect();
        self.commands
            .retain(|c| !c.names().any(|n| names.iter().any(|m| m == n)));
        self.commands.push_back(Arc::new(spec));
    }

    /// Union-merge another set's commands into this one verbatim, as if
    /// added one by one. This is a build-time convenience, distinct from
    /// the runtime merge engine.
    pub fn add_set(&mut self, other: &CmdSet) {
        for cmd in &other.commands {
            let names: Vec<String> = cmd.names().map(str::to_string).collect();
            self.commands
                .retain(|c| !c.names().any(|n| names.iter().any(|m| m == n)));
            self.commands.push_back(cmd.clone());
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn merge_type(&self) -> MergeType {
        self.merge_type
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// First command whose key matches, if any.
    pub fn get(&self, key: &str) -> Option<&Arc<CommandSpec>> {
        self.commands.iter().find(|c| c.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.commands.iter().any(|c| c.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandSpec>> {
        self.commands.iter()
    }

    /// Command keys in set order (duplicates included).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.key())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Metadata-only copy used by the merge engine for result sets.
    pub(crate) fn meta_clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            priority: self.priority,
            merge_type: self.merge_type,
            allow_duplicates: self.allow_duplicates,
            key_mergetypes: self.key_mergetypes.clone(),
            commands: im::Vector::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;

    fn noop(key: &str) -> CommandSpec {
        CommandSpec::from_fn(key, |_| Ok(None))
    }

    #[test]
    fn test_add_replaces_on_key_collision() {
        let mut set = CmdSet::new("base");
        set.add(noop("look"));
        set.add(noop("get"));
        set.add(noop("look"));

        assert_eq!(set.len(), 2);
        // the replacement moved to the back
        assert_eq!(set.keys().last(), Some("look"));
    }

    #[test]
    fn test_add_replaces_on_alias_collision() {
        let mut set = CmdSet::new("base");
        set.add(noop("look").alias("l"));
        set.add(noop("l"));

        assert_eq!(set.len(), 1);
        assert_eq!(set.keys().next(), Some("l"));
    }

    #[test]
    fn test_add_set_is_verbatim_union() {
        let mut a = CmdSet::new("a");
        a.add(noop("look"));

        let mut b = CmdSet::new("b").with_priority(5);
        b.add(noop("look"));
        b.add(noop("get"));

        a.add_set(&b);
        assert_eq!(a.len(), 2);
        assert!(a.contains_key("look"));
        assert!(a.contains_key("get"));
        // build-time union ignores priority entirely
        assert_eq!(a.priority(), 0);
    }
}
