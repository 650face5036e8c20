//! Input-to-command matching.
//!
//! The leading word sequence of the input is matched against every key and
//! alias in the aggregated cmdset, longest first. By default the remainder
//! may be glued straight to the name (`"lookme"` matches `look` with
//! argument `"me"`); a command's `arg_pattern` can demand a boundary.

use crate::cmdset::CmdSet;
use crate::command::{CommandKind, CommandSpec};

use std::sync::Arc;

/// One full match of the input against a command name.
#[derive(Clone)]
pub struct Match {
    pub spec: Arc<CommandSpec>,
    /// The key or alias that matched (normalized form).
    pub matched: String,
    /// Raw input remainder after the matched name.
    pub args: String,
    /// Length of the matched name in characters.
    pub match_len: usize,
    /// Fraction of the input consumed by the match.
    pub consumed: f64,
}

/// Case-insensitive prefix strip, returning the remainder on success.
fn strip_prefix_ci<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = input;
    for n in name.chars() {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if c.to_lowercase().eq(n.to_lowercase()) => rest = chars.as_str(),
            _ => return None,
        }
    }
    Some(rest)
}

/// All surviving candidates for `input` against `set`.
///
/// Candidates are ranked by matched-name length, then by the fraction of
/// the input consumed; strictly dominated candidates are discarded. More
/// than one survivor means the input is ambiguous. System commands never
/// match textually.
pub fn find_matches(input: &str, set: &CmdSet, max_key_words: usize) -> Vec<Match> {
    let input = input.trim();
    let total_chars = input.chars().count().max(1);

    let mut raw: Vec<Match> = Vec::new();
    for spec in set.iter() {
        if spec.kind() == CommandKind::System {
            continue;
        }
        // keep only the longest matching name per command
        let mut best: Option<Match> = None;
        for name in spec.names() {
            if name.is_empty() || name.split_whitespace().count() > max_key_words {
                continue;
            }
            let Some(rest) = strip_prefix_ci(input, name) else {
                continue;
            };
            if !spec.accepts_args(rest) {
                continue;
            }
            let match_len = name.chars().count();
            if best.as_ref().is_some_and(|b| b.match_len >= match_len) {
                continue;
            }
            best = Some(Match {
                spec: spec.clone(),
                matched: name.to_string(),
                args: rest.to_string(),
                match_len,
                consumed: match_len as f64 / total_chars as f64,
            });
        }
        if let Some(m) = best {
            raw.push(m);
        }
    }

    // discard strictly dominated candidates
    let top = raw
        .iter()
        .map(|m| (m.match_len, m.consumed))
        .fold((0usize, 0.0f64), |acc, s| {
            if s.0 > acc.0 || (s.0 == acc.0 && s.1 > acc.1) {
                s
            } else {
                acc
            }
        });
    raw.retain(|m| m.match_len == top.0 && m.consumed == top.1);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;

    fn noop(key: &str) -> CommandSpec {
        CommandSpec::from_fn(key, |_| Ok(None))
    }

    fn set(cmds: Vec<CommandSpec>) -> CmdSet {
        let mut s = CmdSet::new("test");
        for c in cmds {
            s.add(c);
        }
        s
    }

    #[test]
    fn test_longest_key_wins() {
        let s = set(vec![noop("look"), noop("look at")]);
        let m = find_matches("look at book", &s, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].matched, "look at");
        assert_eq!(m[0].args, " book");
    }

    #[test]
    fn test_glued_remainder_matches_by_default() {
        let s = set(vec![noop("look")]);
        let m = find_matches("lookme", &s, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].matched, "look");
        assert_eq!(m[0].args, "me");
    }

    #[test]
    fn test_arg_pattern_requires_boundary() {
        let s = set(vec![noop("look").arg_pattern(r"(\s.*)?").unwrap()]);
        assert!(find_matches("lookme", &s, 3).is_empty());
        assert_eq!(find_matches("look me", &s, 3).len(), 1);
        assert_eq!(find_matches("look", &s, 3).len(), 1);
    }

    #[test]
    fn test_case_insensitive() {
        let s = set(vec![noop("look")]);
        let m = find_matches("LOOK here", &s, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].args, " here");
    }

    #[test]
    fn test_alias_matches_like_key() {
        let s = set(vec![noop("look").alias("l")]);
        let m = find_matches("l east", &s, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].matched, "l");
    }

    #[test]
    fn test_key_and_alias_of_same_command_collapse() {
        // "nor" is a prefix of nothing; both "north" and "n" belong to one
        // command, so a full input matches once, via the longest name
        let s = set(vec![noop("north").alias("n")]);
        let m = find_matches("north", &s, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].matched, "north");
    }

    #[test]
    fn test_duplicate_keys_tie() {
        let mut s = CmdSet::new("a").with_duplicates();
        s.add(noop("ball"));
        let b = set(vec![noop("ball")]);
        let merged = crate::cmdset::merge(&s, &b);

        let m = find_matches("ball", &merged, 3);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_system_commands_never_match() {
        use crate::dispatch::SystemCmd;
        use std::sync::Arc;

        let spec = CommandSpec::system(
            SystemCmd::NoMatch,
            Arc::new(crate::command::FnHandler::new("nomatch", |_| Ok(None))),
        );
        let s = set(vec![spec]);
        assert!(find_matches("__nomatch__", &s, 3).is_empty());
    }

    #[test]
    fn test_max_key_words_limit() {
        let s = set(vec![noop("look very closely at")]);
        assert!(find_matches("look very closely at it", &s, 3).is_empty());
        assert_eq!(find_matches("look very closely at it", &s, 4).len(), 1);
    }

    #[test]
    fn test_no_match() {
        let s = set(vec![noop("look")]);
        assert!(find_matches("dance", &s, 3).is_empty());
    }
}
