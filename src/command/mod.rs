use crate::channel::ChannelDirectory;
use crate::cmdset::CmdSet;
use crate::core::{DEFAULT_HELP_CATEGORY, ObjectId, Result};
use crate::dispatch::SystemCmd;
use crate::world::WorldState;

use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Closed set of command kinds the dispatcher distinguishes.
///
/// `Normal` commands are matched textually against player input. `System`
/// commands are reserved dispatch targets selected by identifier (see
/// [`SystemCmd`]), never by text. `ChannelRelay` commands forward their
/// argument text to a named channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Normal,
    System,
    ChannelRelay,
}

/// Shared services handed to a command while it executes.
pub struct ExecutionContext {
    pub world: Arc<RwLock<WorldState>>,
    pub channels: Arc<dyn ChannelDirectory>,
}

impl ExecutionContext {
    pub fn new(world: Arc<RwLock<WorldState>>, channels: Arc<dyn ChannelDirectory>) -> Self {
        Self { world, channels }
    }
}

/// Trait implemented by everything a command can do.
///
/// Handlers are stateless templates shared between invocations; all
/// per-invocation state lives on the [`CommandInstance`]. `parse` must not
/// perform side effects, it only pre-processes the raw remainder into
/// instance fields. `execute` may assume `parse` has already run.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Pre-process the raw argument remainder into instance fields.
    ///
    /// The default splits on whitespace. Override to validate arguments;
    /// a returned error is shown to the actor verbatim.
    fn parse(&self, cmd: &mut CommandInstance) -> Result<()> {
        cmd.parsed_args = cmd.args.split_whitespace().map(str::to_string).collect();
        Ok(())
    }

    /// Perform the command's action.
    ///
    /// The returned value is handed back to the programmatic caller of the
    /// dispatcher, so commands can be driven by other code as well as by
    /// player input.
    async fn execute(
        &self,
        cmd: &mut CommandInstance,
        ctx: &ExecutionContext,
    ) -> Result<Option<String>>;

    /// Called right before `parse`.
    fn at_pre_cmd(&self, cmd: &mut CommandInstance) {
        let _ = cmd;
    }

    /// Called after `execute`, even when it failed.
    fn at_post_cmd(&self, cmd: &mut CommandInstance) {
        let _ = cmd;
    }
}

type CommandFn = dyn Fn(&mut CommandInstance) -> Result<Option<String>> + Send + Sync;

/// Adapter turning a plain closure into a [`CommandHandler`].
///
/// Handy for small commands and tests that need no world access.
pub struct FnHandler {
    name: String,
    func: Box<CommandFn>,
}

impl FnHandler {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut CommandInstance) -> Result<Option<String>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl CommandHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        cmd: &mut CommandInstance,
        _ctx: &ExecutionContext,
    ) -> Result<Option<String>> {
        (self.func)(cmd)
    }
}

/// State carried over from a command flagged `persist_across_calls`.
///
/// The dispatcher stores this on the actor after the command ran and hands
/// it to the next command the same actor invokes, then clears it.
#[derive(Debug, Clone)]
pub struct StoredCommand {
    pub key: String,
    pub matched: String,
    pub args: String,
    pub parsed_args: Vec<String>,
}

/// One invocation of a command, created fresh by the dispatcher.
///
/// Holds the run-time context the handler works against: the invoking
/// actor, what was matched, the raw remainder, the object the command was
/// found on and the aggregated cmdset it was matched from. Output for the
/// actor is buffered here and drained into the dispatch result.
pub struct CommandInstance {
    spec: Arc<CommandSpec>,
    pub actor: ObjectId,
    /// The key or alias text that actually matched.
    pub matched: String,
    /// Raw input remainder after the matched name.
    pub args: String,
    /// Object the command was found on, if it came from the surroundings.
    pub source: Option<ObjectId>,
    /// The aggregated cmdset this command was matched from.
    pub cmdset: CmdSet,
    /// Whitespace-split arguments, filled by the default `parse`.
    pub parsed_args: Vec<String>,
    /// Candidate names, populated for the multimatch hook only.
    pub candidates: Vec<String>,
    /// Retained state from the actor's previous persisting command.
    pub previous: Option<Box<StoredCommand>>,
    output: Vec<String>,
}

impl CommandInstance {
    pub(crate) fn new(
        spec: Arc<CommandSpec>,
        actor: ObjectId,
        matched: impl Into<String>,
        args: impl Into<String>,
        source: Option<ObjectId>,
        cmdset: CmdSet,
    ) -> Self {
        Self {
            spec,
            actor,
            matched: matched.into(),
            args: args.into(),
            source,
            cmdset,
            parsed_args: Vec::new(),
            candidates: Vec::new(),
            previous: None,
            output: Vec::new(),
        }
    }

    /// The command definition this instance was created from.
    pub fn spec(&self) -> &Arc<CommandSpec> {
        &self.spec
    }

    /// Queue a line of output for the invoking actor.
    pub fn msg(&mut self, text: impl Into<String>) {
        self.output.push(text.into());
    }

    pub(crate) fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn stored(&self) -> StoredCommand {
        StoredCommand {
            key: self.spec.key().to_string(),
            matched: self.matched.clone(),
            args: self.args.clone(),
            parsed_args: self.parsed_args.clone(),
        }
    }
}

/// A command definition: one named, lockable, executable action.
///
/// Specs are stateless templates built once at cmdset-construction time;
/// the dispatcher creates a fresh [`CommandInstance`] per invocation.
#[derive(Clone)]
pub struct CommandSpec {
    key: String,
    aliases: Vec<String>,
    lock: String,
    help_category: String,
    help_text: String,
    arg_pattern: Option<Regex>,
    auto_help: bool,
    persist_across_calls: bool,
    kind: CommandKind,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    /// Create a normal, textually-matched command.
    pub fn new(key: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            key: key.into().trim().to_lowercase(),
            aliases: Vec::new(),
            lock: String::new(),
            help_category: DEFAULT_HELP_CATEGORY.to_string(),
            help_text: String::new(),
            arg_pattern: None,
            auto_help: true,
            persist_across_calls: false,
            kind: CommandKind::Normal,
            handler,
        }
    }

    /// Create a command from a plain closure.
    pub fn from_fn(
        key: impl Into<String>,
        func: impl Fn(&mut CommandInstance) -> Result<Option<String>> + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        let handler = Arc::new(FnHandler::new(key.clone(), func));
        Self::new(key, handler)
    }

    /// Create a reserved system command bound to a dispatch hook.
    pub fn system(hook: SystemCmd, handler: Arc<dyn CommandHandler>) -> Self {
        let mut spec = Self::new(hook.key(), handler);
        spec.kind = CommandKind::System;
        spec.auto_help = false;
        spec
    }

    /// Create a channel relay command named after its channel.
    pub fn relay(channel: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        let mut spec = Self::new(channel, handler);
        spec.kind = CommandKind::ChannelRelay;
        spec.auto_help = false;
        spec.help_category = "channels".to_string();
        spec
    }

    /// Add an invocation alias (matched exactly like the key).
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().trim().to_lowercase());
        self
    }

    /// Set the access-control lock string, e.g. `"cmd:perm(Builder)"`.
    pub fn lock(mut self, lock: impl Into<String>) -> Self {
        self.lock = lock.into();
        self
    }

    /// Set the help category used by the help index.
    pub fn help_category(mut self, category: impl Into<String>) -> Self {
        self.help_category = category.into();
        self
    }

    /// Set the documentation string shown by the help index.
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Constrain what may immediately follow the matched key.
    ///
    /// The pattern is matched against the entire remainder. By default any
    /// remainder is accepted, even one glued to the key without a
    /// separator; a pattern like `(\s.*)?` restores the word-boundary
    /// requirement.
    pub fn arg_pattern(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| crate::core::CmdError::ParseError(e.to_string()))?;
        self.arg_pattern = Some(re);
        Ok(self)
    }

    /// Exclude this command from auto-generated help.
    pub fn no_auto_help(mut self) -> Self {
        self.auto_help = false;
        self
    }

    /// Keep the executed instance around for the actor's next command.
    pub fn persist_across_calls(mut self) -> Self {
        self.persist_across_calls = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// All invocation names: key first, then aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn lock_string(&self) -> &str {
        &self.lock
    }

    pub fn category(&self) -> &str {
        &self.help_category
    }

    pub fn doc(&self) -> &str {
        &self.help_text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn auto_help(&self) -> bool {
        self.auto_help
    }

    pub fn persists(&self) -> bool {
        self.persist_across_calls
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Whether `rest` is an acceptable remainder after the matched name.
    pub(crate) fn accepts_args(&self, rest: &str) -> bool {
        match &self.arg_pattern {
            Some(re) => re.is_match(rest),
            None => true,
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("key", &self.key)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("lock", &self.lock)
            .finish()
    }
}
