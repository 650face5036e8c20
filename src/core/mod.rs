pub mod error;
pub mod types;

pub use error::{CmdError, Result};
pub use types::{AccountId, CMD_ACCESS, DEFAULT_HELP_CATEGORY, ObjectId};
