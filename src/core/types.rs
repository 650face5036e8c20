use uuid::Uuid;

/// Identity of an in-world object (character, thing, room or exit).
pub type ObjectId = Uuid;

/// Identity of a controlling account (the out-of-character side of an actor).
pub type AccountId = Uuid;

/// Access type checked before a command may be invoked.
pub const CMD_ACCESS: &str = "cmd";

/// Help category assigned to commands that don't set one.
pub const DEFAULT_HELP_CATEGORY: &str = "general";
