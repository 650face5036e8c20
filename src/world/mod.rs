use crate::cmdset::{CmdSet, CmdSetStack};
use crate::command::{CommandHandler, CommandInstance, CommandSpec, ExecutionContext, StoredCommand};
use crate::core::{AccountId, CmdError, ObjectId, Result};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// What an in-world object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Character,
    Thing,
    Room,
    Exit { destination: ObjectId },
}

/// An in-world entity: character, thing, room or exit.
///
/// Every object owns a cmdset stack; what an actor can do is aggregated
/// from its own stack plus the stacks of everything around it.
pub struct GameObject {
    id: ObjectId,
    name: String,
    aliases: Vec<String>,
    kind: ObjectKind,
    location: Option<ObjectId>,
    cmdsets: CmdSetStack,
    account: Option<AccountId>,
    last_command: Option<StoredCommand>,
}

impl GameObject {
    fn new(name: impl Into<String>, kind: ObjectKind, location: Option<ObjectId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            aliases: Vec::new(),
            kind,
            location,
            cmdsets: CmdSetStack::new(),
            account: None,
            last_command: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn location(&self) -> Option<ObjectId> {
        self.location
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    pub fn cmdsets(&self) -> &CmdSetStack {
        &self.cmdsets
    }

    pub fn cmdsets_mut(&mut self) -> &mut CmdSetStack {
        &mut self.cmdsets
    }

    pub(crate) fn take_last_command(&mut self) -> Option<StoredCommand> {
        self.last_command.take()
    }

    pub(crate) fn set_last_command(&mut self, stored: Option<StoredCommand>) {
        self.last_command = stored;
    }
}

/// The out-of-character identity controlling one or more characters.
///
/// Carries its own cmdset stack, aggregated alongside the character's.
pub struct Account {
    id: AccountId,
    name: String,
    cmdsets: CmdSetStack,
}

impl Account {
    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmdsets(&self) -> &CmdSetStack {
        &self.cmdsets
    }

    pub fn cmdsets_mut(&mut self) -> &mut CmdSetStack {
        &mut self.cmdsets
    }
}

/// All objects and accounts in the game world.
pub struct WorldState {
    objects: HashMap<ObjectId, GameObject>,
    accounts: HashMap<AccountId, Account>,
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            accounts: HashMap::new(),
        }
    }

    pub fn create_room(&mut self, name: impl Into<String>) -> ObjectId {
        self.insert(GameObject::new(name, ObjectKind::Room, None))
    }

    pub fn create_character(&mut self, name: impl Into<String>, location: ObjectId) -> ObjectId {
        self.insert(GameObject::new(name, ObjectKind::Character, Some(location)))
    }

    pub fn create_thing(&mut self, name: impl Into<String>, location: ObjectId) -> ObjectId {
        self.insert(GameObject::new(name, ObjectKind::Thing, Some(location)))
    }

    /// Create an exit leading from one room to another. The exit's name
    /// and aliases become its invocation names during aggregation.
    pub fn create_exit(
        &mut self,
        name: impl Into<String>,
        aliases: &[&str],
        from: ObjectId,
        to: ObjectId,
    ) -> ObjectId {
        let mut exit = GameObject::new(name, ObjectKind::Exit { destination: to }, Some(from));
        exit.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self.insert(exit)
    }

    pub fn create_account(&mut self, name: impl Into<String>) -> AccountId {
        let account = Account {
            id: Uuid::new_v4(),
            name: name.into(),
            cmdsets: CmdSetStack::new(),
        };
        let id = account.id;
        self.accounts.insert(id, account);
        id
    }

    /// Attach a controlling account to a character.
    pub fn bind_account(&mut self, character: ObjectId, account: AccountId) -> Result<()> {
        if !self.accounts.contains_key(&account) {
            return Err(CmdError::ObjectNotFound(account.to_string()));
        }
        let obj = self
            .objects
            .get_mut(&character)
            .ok_or_else(|| CmdError::ObjectNotFound(character.to_string()))?;
        obj.account = Some(account);
        Ok(())
    }

    fn insert(&mut self, object: GameObject) -> ObjectId {
        let id = object.id;
        self.objects.insert(id, object);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    pub fn name_of(&self, id: ObjectId) -> Option<&str> {
        self.objects.get(&id).map(|o| o.name())
    }

    /// Objects located in `location`, in deterministic (name, id) order.
    pub fn contents(&self, location: ObjectId) -> Vec<ObjectId> {
        let mut found: Vec<&GameObject> = self
            .objects
            .values()
            .filter(|o| o.location == Some(location))
            .collect();
        found.sort_by(|x, y| x.name.cmp(&y.name).then(x.id.cmp(&y.id)));
        found.into_iter().map(|o| o.id).collect()
    }

    /// Move an object to a new location.
    pub fn move_object(&mut self, id: ObjectId, destination: ObjectId) -> Result<()> {
        if !self.objects.contains_key(&destination) {
            return Err(CmdError::ObjectNotFound(destination.to_string()));
        }
        let obj = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| CmdError::ObjectNotFound(id.to_string()))?;
        obj.location = Some(destination);
        Ok(())
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler behind every synthesized exit command: moves the invoking
/// actor through the exit.
pub struct ExitTraverse {
    pub exit: ObjectId,
    pub destination: ObjectId,
}

#[async_trait]
impl CommandHandler for ExitTraverse {
    fn name(&self) -> &str {
        "exit_traverse"
    }

    async fn execute(
        &self,
        cmd: &mut CommandInstance,
        ctx: &ExecutionContext,
    ) -> Result<Option<String>> {
        let mut world = ctx.world.write().await;
        let dest_name = world
            .name_of(self.destination)
            .ok_or_else(|| CmdError::ObjectNotFound(self.destination.to_string()))?
            .to_string();
        world.move_object(cmd.actor, self.destination)?;
        cmd.msg(format!("You head {} to {}.", cmd.matched, dest_name));
        Ok(Some(dest_name))
    }
}

/// The single-command cmdset an exit contributes during aggregation.
pub(crate) fn exit_cmdset(exit: &GameObject) -> Option<CmdSet> {
    let ObjectKind::Exit { destination } = exit.kind() else {
        return None;
    };
    let handler = Arc::new(ExitTraverse {
        exit: exit.id(),
        destination,
    });
    let mut spec = CommandSpec::new(exit.name(), handler).help_category("exits");
    for alias in exit.aliases() {
        spec = spec.alias(alias);
    }
    let mut set = CmdSet::new(format!("exit_{}", exit.name().to_lowercase()));
    set.add(spec);
    Some(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_are_sorted_and_scoped() {
        let mut world = WorldState::new();
        let hall = world.create_room("Hall");
        let cellar = world.create_room("Cellar");
        let bob = world.create_character("bob", hall);
        let anvil = world.create_thing("anvil", hall);
        world.create_thing("crate", cellar);

        assert_eq!(world.contents(hall), vec![anvil, bob]);
    }

    #[test]
    fn test_move_object() {
        let mut world = WorldState::new();
        let hall = world.create_room("Hall");
        let cellar = world.create_room("Cellar");
        let bob = world.create_character("bob", hall);

        world.move_object(bob, cellar).unwrap();
        assert_eq!(world.object(bob).unwrap().location(), Some(cellar));

        let nowhere = Uuid::new_v4();
        assert!(world.move_object(bob, nowhere).is_err());
    }

    #[test]
    fn test_exit_cmdset_synthesis() {
        let mut world = WorldState::new();
        let hall = world.create_room("Hall");
        let cellar = world.create_room("Cellar");
        let exit = world.create_exit("North", &["n"], hall, cellar);

        let set = exit_cmdset(world.object(exit).unwrap()).unwrap();
        assert_eq!(set.key(), "exit_north");
        assert_eq!(set.len(), 1);
        let cmd = set.get("north").unwrap();
        assert_eq!(cmd.aliases(), &["n".to_string()]);

        // non-exits synthesize nothing
        let rock = world.create_thing("rock", hall);
        assert!(exit_cmdset(world.object(rock).unwrap()).is_none());
    }

    #[test]
    fn test_bind_account() {
        let mut world = WorldState::new();
        let hall = world.create_room("Hall");
        let bob = world.create_character("bob", hall);
        let acct = world.create_account("bob@example");

        world.bind_account(bob, acct).unwrap();
        assert_eq!(world.object(bob).unwrap().account(), Some(acct));

        assert!(world.bind_account(bob, Uuid::new_v4()).is_err());
    }
}
