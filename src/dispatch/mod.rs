pub mod aggregate;
pub mod matcher;
pub mod system;

pub use aggregate::{AggregatedSet, aggregate};
pub use matcher::{Match, find_matches};
pub use system::SystemCmd;

use crate::channel::ChannelDirectory;
use crate::command::{CommandInstance, CommandKind, CommandSpec, ExecutionContext};
use crate::core::{CMD_ACCESS, ObjectId, Result};
use crate::locks::LockEvaluator;
use crate::session::EngineConfig;
use crate::world::WorldState;

use aggregate::system_hook;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a dispatch cycle ended.
///
/// `PermissionDenied` is distinguishable here, for trusted programmatic
/// callers; the *rendered output* for a denied command is identical to a
/// true no-match unless a custom `NoPerm` hook is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed,
    NoInput,
    NoMatch,
    MultiMatch,
    PermissionDenied,
    ChannelRelayed,
    Failed,
}

/// Result of one dispatch cycle.
#[derive(Debug)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    /// Lines of output for the invoking actor.
    pub output: Vec<String>,
    /// Whatever the executed command's `execute()` returned.
    pub value: Option<String>,
}

impl DispatchResult {
    fn terminal(outcome: DispatchOutcome, output: Vec<String>) -> Self {
        Self {
            outcome,
            output,
            value: None,
        }
    }
}

/// The command dispatcher.
///
/// Given an actor and a raw input line, aggregates every cmdset visible to
/// the actor, matches the input, enforces locks and runs the winning
/// command, or falls back to the appropriate system hook.
pub struct Dispatcher {
    world: Arc<RwLock<WorldState>>,
    locks: Arc<dyn LockEvaluator>,
    channels: Arc<dyn ChannelDirectory>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(
        world: Arc<RwLock<WorldState>>,
        locks: Arc<dyn LockEvaluator>,
        channels: Arc<dyn ChannelDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            world,
            locks,
            channels,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<RwLock<WorldState>> {
        &self.world
    }

    /// Run one dispatch cycle for `actor`.
    pub async fn dispatch(&self, actor: ObjectId, input: &str) -> Result<DispatchResult> {
        let trimmed = input.trim();
        let agg = aggregate(&self.world, &self.channels, actor).await?;
        tracing::debug!(%actor, input = trimmed, commands = agg.set.len(), "dispatching");

        if trimmed.is_empty() {
            return self
                .hook_or(&agg, actor, SystemCmd::NoInput, "", Vec::new(), Vec::new(), DispatchOutcome::NoInput)
                .await;
        }

        let mut matches = find_matches(trimmed, &agg.set, self.config.max_key_words);
        match matches.len() {
            0 => {
                self.hook_or(
                    &agg,
                    actor,
                    SystemCmd::NoMatch,
                    trimmed,
                    Vec::new(),
                    vec![self.config.nomatch_message.clone()],
                    DispatchOutcome::NoMatch,
                )
                .await
            }
            1 => {
                let m = matches.pop().expect("one candidate");
                self.dispatch_single(&agg, actor, m, trimmed).await
            }
            _ => {
                let candidates: Vec<String> =
                    matches.iter().map(|m| m.matched.clone()).collect();
                let fallback = self.multimatch_listing(&candidates);
                self.hook_or(
                    &agg,
                    actor,
                    SystemCmd::MultiMatch,
                    trimmed,
                    candidates,
                    fallback,
                    DispatchOutcome::MultiMatch,
                )
                .await
            }
        }
    }

    /// Fire a system hook directly (used for connection start).
    pub async fn dispatch_hook(
        &self,
        actor: ObjectId,
        hook: SystemCmd,
        args: &str,
    ) -> Result<DispatchResult> {
        let agg = aggregate(&self.world, &self.channels, actor).await?;
        self.hook_or(&agg, actor, hook, args, Vec::new(), Vec::new(), DispatchOutcome::Executed)
            .await
    }

    async fn dispatch_single(
        &self,
        agg: &AggregatedSet,
        actor: ObjectId,
        m: Match,
        raw_input: &str,
    ) -> Result<DispatchResult> {
        if !self.locks.check(actor, &m.spec, CMD_ACCESS).await {
            // rendered exactly like a true no-match so privileged commands
            // stay invisible, unless game content binds its own hook
            return self
                .hook_or(
                    agg,
                    actor,
                    SystemCmd::NoPerm,
                    raw_input,
                    Vec::new(),
                    vec![self.config.nomatch_message.clone()],
                    DispatchOutcome::PermissionDenied,
                )
                .await;
        }

        if m.spec.kind() == CommandKind::ChannelRelay {
            if let Some(hook) = system_hook(agg, SystemCmd::Channel.key()) {
                let hook = hook.clone();
                return self
                    .run_spec(
                        hook,
                        agg,
                        actor,
                        &m.matched,
                        &m.args,
                        None,
                        Vec::new(),
                        DispatchOutcome::ChannelRelayed,
                    )
                    .await;
            }
            let source = agg.source_of(&m.spec);
            return self
                .run_spec(
                    m.spec.clone(),
                    agg,
                    actor,
                    &m.matched,
                    &m.args,
                    source,
                    Vec::new(),
                    DispatchOutcome::ChannelRelayed,
                )
                .await;
        }

        let source = agg.source_of(&m.spec);
        self.run_spec(
            m.spec.clone(),
            agg,
            actor,
            &m.matched,
            &m.args,
            source,
            Vec::new(),
            DispatchOutcome::Executed,
        )
        .await
    }

    /// Run a bound system hook, or fall back to fixed built-in output.
    #[allow(clippy::too_many_arguments)]
    async fn hook_or(
        &self,
        agg: &AggregatedSet,
        actor: ObjectId,
        hook: SystemCmd,
        args: &str,
        candidates: Vec<String>,
        fallback: Vec<String>,
        outcome: DispatchOutcome,
    ) -> Result<DispatchResult> {
        match system_hook(agg, hook.key()) {
            Some(spec) => {
                let spec = spec.clone();
                self.run_spec(spec, agg, actor, hook.key(), args, None, candidates, outcome)
                    .await
            }
            None => Ok(DispatchResult::terminal(outcome, fallback)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_spec(
        &self,
        spec: Arc<CommandSpec>,
        agg: &AggregatedSet,
        actor: ObjectId,
        matched: &str,
        args: &str,
        source: Option<ObjectId>,
        candidates: Vec<String>,
        outcome: DispatchOutcome,
    ) -> Result<DispatchResult> {
        let mut inst = CommandInstance::new(
            spec.clone(),
            actor,
            matched,
            args.trim_start(),
            source,
            agg.set.clone(),
        );
        inst.candidates = candidates;

        {
            let mut world = self.world.write().await;
            if let Some(obj) = world.object_mut(actor) {
                inst.previous = obj.take_last_command().map(Box::new);
            }
        }

        let ctx = ExecutionContext::new(self.world.clone(), self.channels.clone());
        let handler = spec.handler().clone();

        handler.at_pre_cmd(&mut inst);
        if let Err(err) = handler.parse(&mut inst) {
            tracing::debug!(command = spec.key(), %err, "argument parse failed");
            inst.msg(err.to_string());
            handler.at_post_cmd(&mut inst);
            return Ok(DispatchResult::terminal(
                DispatchOutcome::Failed,
                inst.take_output(),
            ));
        }

        let (value, outcome) = match handler.execute(&mut inst, &ctx).await {
            Ok(value) => (value, outcome),
            Err(err) => {
                tracing::warn!(command = spec.key(), %err, "command execution failed");
                inst.msg(self.config.failure_message.clone());
                (None, DispatchOutcome::Failed)
            }
        };
        handler.at_post_cmd(&mut inst);

        {
            let mut world = self.world.write().await;
            if let Some(obj) = world.object_mut(actor) {
                obj.set_last_command(spec.persists().then(|| inst.stored()));
            }
        }

        Ok(DispatchResult {
            outcome,
            output: inst.take_output(),
            value,
        })
    }

    fn multimatch_listing(&self, candidates: &[String]) -> Vec<String> {
        let mut lines = vec!["More than one command matched:".to_string()];
        for (i, name) in candidates.iter().take(self.config.multimatch_limit).enumerate() {
            lines.push(format!("  {}: {}", i + 1, name));
        }
        if candidates.len() > self.config.multimatch_limit {
            lines.push(format!(
                "  ... and {} more",
                candidates.len() - self.config.multimatch_limit
            ));
        }
        lines
    }
}
