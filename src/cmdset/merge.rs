//! The cmdset merge engine.
//!
//! Pure set algebra over [`CmdSet`] values: `merge(a, b)` applies the
//! incoming set `a` on top of the existing set `b` and returns a new set,
//! leaving both operands untouched. A whole stack folds bottom-to-top with
//! each newer set as the `a` operand.

use super::CmdSet;

/// How an incoming cmdset combines with the set below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeType {
    /// Keep commands from both sets; the higher-priority set wins shared
    /// keys (ties go to the incoming set unless it allows duplicates).
    Union,
    /// Keep only commands whose key exists in both sets.
    Intersect,
    /// The incoming set replaces the other entirely.
    Replace,
    /// The incoming set acts purely as an exclusion mask: its keys are
    /// removed from the other set and it contributes nothing itself.
    Remove,
}

/// Merge `a` onto `b`, producing a new set.
///
/// The merge type comes from `a`, unless `a` names an override for `b`'s
/// key in its `key_mergetypes` table. Priorities on both sets are honored
/// for tie-breaking regardless of merge type. The result carries the
/// winning operand's metadata (B's for `Remove`, which is B filtered).
pub fn merge(a: &CmdSet, b: &CmdSet) -> CmdSet {
    let mt = a
        .key_mergetypes
        .get(b.key.as_str())
        .copied()
        .unwrap_or(a.merge_type);

    match mt {
        MergeType::Replace => a.clone(),
        MergeType::Remove => {
            let mut out = b.meta_clone();
            for cmd in &b.commands {
                if !a.contains_key(cmd.key()) {
                    out.commands.push_back(cmd.clone());
                }
            }
            out
        }
        MergeType::Union => union(a, b),
        MergeType::Intersect => intersect(a, b),
    }
}

fn union(a: &CmdSet, b: &CmdSet) -> CmdSet {
    let a_wins = a.priority >= b.priority;
    let keep_both = a.allow_duplicates && a.priority == b.priority;
    let (winner, loser) = if a_wins { (a, b) } else { (b, a) };

    let mut out = winner.meta_clone();
    for cmd in &winner.commands {
        out.commands.push_back(cmd.clone());
    }
    for cmd in &loser.commands {
        if keep_both || !winner.contains_key(cmd.key()) {
            out.commands.push_back(cmd.clone());
        }
    }
    out
}

fn intersect(a: &CmdSet, b: &CmdSet) -> CmdSet {
    let a_wins = a.priority >= b.priority;
    let keep_both = a.allow_duplicates && a.priority == b.priority;
    let (winner, loser) = if a_wins { (a, b) } else { (b, a) };

    let mut out = winner.meta_clone();
    for cmd in &winner.commands {
        if loser.contains_key(cmd.key()) {
            out.commands.push_back(cmd.clone());
        }
    }
    if keep_both {
        for cmd in &loser.commands {
            if winner.contains_key(cmd.key()) {
                out.commands.push_back(cmd.clone());
            }
        }
    }
    out
}

/// Fold a stack of cmdsets, bottom first, into one merged set.
///
/// `R0 = S0`, then `R(i) = merge(S(i), R(i-1))`: each newer set is applied
/// on top of the accumulated older result. An empty iterator folds to the
/// empty set.
pub fn merge_stack<'a, I>(sets: I) -> CmdSet
where
    I: IntoIterator<Item = &'a CmdSet>,
{
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return CmdSet::empty();
    };
    let mut acc = first.clone();
    for set in iter {
        acc = merge(set, &acc);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn noop(key: &str) -> CommandSpec {
        CommandSpec::from_fn(key, |_| Ok(None))
    }

    fn set(key: &str, cmds: &[&str]) -> CmdSet {
        let mut s = CmdSet::new(key);
        for c in cmds {
            s.add(noop(c));
        }
        s
    }

    fn key_set(s: &CmdSet) -> BTreeSet<String> {
        s.keys().map(str::to_string).collect()
    }

    #[test]
    fn test_union_keeps_all_keys() {
        let a = set("a", &["look", "get"]);
        let b = set("b", &["get", "drop"]);

        let r = merge(&a, &b);
        assert_eq!(
            key_set(&r),
            ["look", "get", "drop"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
        // shared key resolved once, in a's favor
        assert_eq!(r.keys().filter(|k| *k == "get").count(), 1);
        assert!(Arc::ptr_eq(r.get("get").unwrap(), a.get("get").unwrap()));
    }

    #[test]
    fn test_union_higher_priority_b_wins_shared_keys() {
        let a = set("a", &["get"]);
        let b = set("b", &["get", "drop"]).with_priority(5);

        let r = merge(&a, &b);
        assert!(Arc::ptr_eq(r.get("get").unwrap(), b.get("get").unwrap()));
        assert!(r.contains_key("drop"));
    }

    #[test]
    fn test_union_tie_is_deterministic() {
        let a = set("a", &["ball"]);
        let b = set("b", &["ball"]);

        for _ in 0..10 {
            let r = merge(&a, &b);
            assert_eq!(r.len(), 1);
            assert!(Arc::ptr_eq(r.get("ball").unwrap(), a.get("ball").unwrap()));
        }
    }

    #[test]
    fn test_union_allow_duplicates_keeps_both() {
        let a = set("a", &["ball"]).with_duplicates();
        let b = set("b", &["ball"]);

        let r = merge(&a, &b);
        assert_eq!(r.keys().filter(|k| *k == "ball").count(), 2);
    }

    #[test]
    fn test_duplicates_require_equal_priority() {
        let a = set("a", &["ball"]).with_duplicates().with_priority(1);
        let b = set("b", &["ball"]);

        let r = merge(&a, &b);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_replace_ignores_b_entirely() {
        let a = set("a", &["look"]).with_merge_type(MergeType::Replace);
        let b = set("b", &["get", "drop", "look"]);

        let r = merge(&a, &b);
        assert_eq!(key_set(&r), key_set(&a));
        assert_eq!(r.len(), a.len());
    }

    #[test]
    fn test_remove_is_a_pure_filter() {
        let a = set("mask", &["get", "look"]).with_merge_type(MergeType::Remove);
        let b = set("b", &["look", "drop", "say"]);

        let r = merge(&a, &b);
        assert_eq!(
            key_set(&r),
            ["drop", "say"].iter().map(|s| s.to_string()).collect()
        );
        for cmd in r.iter() {
            assert!(Arc::ptr_eq(cmd, b.get(cmd.key()).unwrap()));
        }
    }

    #[test]
    fn test_intersect_takes_from_higher_priority() {
        let a = set("a", &["look", "get"])
            .with_merge_type(MergeType::Intersect)
            .with_priority(2);
        let b = set("b", &["get", "drop"]);

        let r = merge(&a, &b);
        assert_eq!(key_set(&r), ["get"].iter().map(|s| s.to_string()).collect());
        assert!(Arc::ptr_eq(r.get("get").unwrap(), a.get("get").unwrap()));
    }

    #[test]
    fn test_key_mergetype_override_applies_to_named_set_only() {
        let a = set("a", &["look"]).with_key_mergetype("armor", MergeType::Replace);
        let armor = set("armor", &["wear", "remove"]);
        let other = set("other", &["wear"]);

        // against the named set: Replace
        let r = merge(&a, &armor);
        assert_eq!(key_set(&r), key_set(&a));

        // against anything else: the general merge type (Union)
        let r = merge(&a, &other);
        assert!(r.contains_key("wear"));
        assert!(r.contains_key("look"));
    }

    #[test]
    fn test_merge_stack_folds_bottom_to_top() {
        let base = set("base", &["look", "get"]);
        let combat = set("combat", &["kick", "look"]).with_priority(1);
        let mask = set("mask", &["get"]).with_merge_type(MergeType::Remove);

        let r = merge_stack([&base, &combat, &mask]);
        assert_eq!(
            key_set(&r),
            ["look", "kick"].iter().map(|s| s.to_string()).collect()
        );
        // "look" came from the higher-priority combat set
        assert!(Arc::ptr_eq(r.get("look").unwrap(), combat.get("look").unwrap()));
    }

    #[test]
    fn test_merge_stack_empty() {
        let r = merge_stack(std::iter::empty());
        assert!(r.is_empty());
    }
}
