/// Reserved dispatch targets.
///
/// These are not ordinary invocation keys: the dispatcher selects them by
/// identifier when normal matching doesn't produce exactly one usable
/// command, or on special events such as a fresh connection. Bound into a
/// cmdset with [`CommandSpec::system`](crate::command::CommandSpec::system),
/// they behave like any other command; left unbound, the dispatcher falls
/// back to a fixed built-in behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCmd {
    /// The input line was empty.
    NoInput,
    /// No command key matched the input.
    NoMatch,
    /// More than one candidate tied for the match.
    MultiMatch,
    /// The matched command's lock check failed.
    NoPerm,
    /// A channel relay command matched.
    Channel,
    /// A new connection was established, before anything else runs.
    LoginStart,
}

impl SystemCmd {
    pub const ALL: [SystemCmd; 6] = [
        SystemCmd::NoInput,
        SystemCmd::NoMatch,
        SystemCmd::MultiMatch,
        SystemCmd::NoPerm,
        SystemCmd::Channel,
        SystemCmd::LoginStart,
    ];

    /// The reserved key this hook is stored under inside a cmdset. The
    /// leading underscores keep it out of reach of textual matching.
    pub fn key(self) -> &'static str {
        match self {
            SystemCmd::NoInput => "__noinput__",
            SystemCmd::NoMatch => "__nomatch__",
            SystemCmd::MultiMatch => "__multimatch__",
            SystemCmd::NoPerm => "__noperm__",
            SystemCmd::Channel => "__channel__",
            SystemCmd::LoginStart => "__loginstart__",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip() {
        for hook in SystemCmd::ALL {
            assert_eq!(SystemCmd::from_key(hook.key()), Some(hook));
        }
        assert_eq!(SystemCmd::from_key("look"), None);
    }
}
