/// Integration tests for cmdset stacks layered on live actors, and for
/// snapshot-based persistence of stack membership.
use rustmudcmd::{
    CmdSet, CmdSetFactory, CommandSpec, DispatchOutcome, Engine, FileSnapshotStore, MergeType,
    ObjectId, SnapshotStore,
};

fn echo_set(key: &str, cmds: &[&str]) -> CmdSet {
    let mut set = CmdSet::new(key);
    for name in cmds {
        let reply = format!("{key}:{name}");
        set.add(CommandSpec::from_fn(*name, move |cmd| {
            cmd.msg(reply.clone());
            Ok(None)
        }));
    }
    set
}

async fn spawn_actor(engine: &Engine, set: CmdSet) -> ObjectId {
    let mut world = engine.world().write().await;
    let hall = world.create_room("Hall");
    let actor = world.create_character("tester", hall);
    world
        .object_mut(actor)
        .unwrap()
        .cmdsets_mut()
        .add_default(set, false);
    actor
}

#[tokio::test]
async fn test_pushed_set_overrides_and_pop_restores() {
    let engine = Engine::new();
    let actor = spawn_actor(&engine, echo_set("base", &["look", "get"])).await;

    let before = engine.dispatch(actor, "look").await.unwrap();
    assert_eq!(before.output, vec!["base:look".to_string()]);

    {
        let world = engine.world();
        let mut world = world.write().await;
        world
            .object_mut(actor)
            .unwrap()
            .cmdsets_mut()
            .add(echo_set("combat", &["look", "kick"]).with_priority(1), false);
    }

    let during = engine.dispatch(actor, "look").await.unwrap();
    assert_eq!(during.output, vec!["combat:look".to_string()]);
    let kick = engine.dispatch(actor, "kick").await.unwrap();
    assert_eq!(kick.outcome, DispatchOutcome::Executed);

    {
        let world = engine.world();
        let mut world = world.write().await;
        world
            .object_mut(actor)
            .unwrap()
            .cmdsets_mut()
            .remove(None)
            .unwrap();
    }

    let after = engine.dispatch(actor, "look").await.unwrap();
    assert_eq!(after.output, before.output);
    let kick = engine.dispatch(actor, "kick").await.unwrap();
    assert_eq!(kick.outcome, DispatchOutcome::NoMatch);
}

#[tokio::test]
async fn test_remove_mask_disables_commands() {
    let engine = Engine::new();
    let actor = spawn_actor(&engine, echo_set("base", &["look", "get", "drop"])).await;

    {
        let world = engine.world();
        let mut world = world.write().await;
        world.object_mut(actor).unwrap().cmdsets_mut().add(
            echo_set("bound_hands", &["get", "drop"]).with_merge_type(MergeType::Remove),
            false,
        );
    }

    assert_eq!(
        engine.dispatch(actor, "get").await.unwrap().outcome,
        DispatchOutcome::NoMatch
    );
    assert_eq!(
        engine.dispatch(actor, "look").await.unwrap().outcome,
        DispatchOutcome::Executed
    );

    {
        let world = engine.world();
        let mut world = world.write().await;
        world
            .object_mut(actor)
            .unwrap()
            .cmdsets_mut()
            .remove(Some("bound_hands"))
            .unwrap();
    }
    assert_eq!(
        engine.dispatch(actor, "get").await.unwrap().outcome,
        DispatchOutcome::Executed
    );
}

#[tokio::test]
async fn test_replace_set_hides_everything_below() {
    let engine = Engine::new();
    let actor = spawn_actor(&engine, echo_set("base", &["look", "get"])).await;

    {
        let world = engine.world();
        let mut world = world.write().await;
        world.object_mut(actor).unwrap().cmdsets_mut().add(
            echo_set("trance", &["wake"])
                .with_merge_type(MergeType::Replace)
                .with_priority(9),
            false,
        );
    }

    assert_eq!(
        engine.dispatch(actor, "look").await.unwrap().outcome,
        DispatchOutcome::NoMatch
    );
    assert_eq!(
        engine.dispatch(actor, "wake").await.unwrap().output,
        vec!["trance:wake".to_string()]
    );
}

#[tokio::test]
async fn test_remove_default_leaves_actor_commandless() {
    let engine = Engine::new();
    let actor = spawn_actor(&engine, echo_set("base", &["look"])).await;

    {
        let world = engine.world();
        let mut world = world.write().await;
        let stacks = world.object_mut(actor).unwrap().cmdsets_mut();
        stacks.add(echo_set("extra", &["wave"]), false);
        stacks.remove_default();
    }

    // even the non-default extra set resolves to nothing now
    assert_eq!(
        engine.dispatch(actor, "wave").await.unwrap().outcome,
        DispatchOutcome::NoMatch
    );

    {
        let world = engine.world();
        let mut world = world.write().await;
        world
            .object_mut(actor)
            .unwrap()
            .cmdsets_mut()
            .add_default(echo_set("base", &["look"]), false);
    }
    assert_eq!(
        engine.dispatch(actor, "look").await.unwrap().outcome,
        DispatchOutcome::Executed
    );
}

#[tokio::test]
async fn test_snapshot_save_restore_round_trip() {
    let factory = CmdSetFactory::new();
    factory
        .register("base", || echo_set("base", &["look", "get"]))
        .unwrap();
    factory
        .register("combat", || {
            echo_set("combat", &["kick"]).with_priority(1)
        })
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path()).unwrap();

    let engine = Engine::new();
    let actor = {
        let world = engine.world();
        let mut world = world.write().await;
        let hall = world.create_room("Hall");
        let actor = world.create_character("tester", hall);
        let stacks = world.object_mut(actor).unwrap().cmdsets_mut();
        stacks.add_default(factory.build("base").unwrap(), true);
        stacks.add(factory.build("combat").unwrap(), true);
        stacks.add(echo_set("scratch", &["poke"]), false);
        actor
    };

    // save membership, then rebuild the stack as a restart would
    let snapshot = {
        let world = engine.world();
        let world = world.read().await;
        world.object(actor).unwrap().cmdsets().snapshot(actor)
    };
    store.save(&snapshot).await.unwrap();

    let loaded = store.load(actor).await.unwrap().unwrap();
    let restored = factory.restore(&loaded).unwrap();

    {
        let world = engine.world();
        let mut world = world.write().await;
        let obj = world.object_mut(actor).unwrap();
        *obj.cmdsets_mut() = restored;
    }

    // persistent sets survived, the scratch set did not
    assert_eq!(
        engine.dispatch(actor, "kick").await.unwrap().output,
        vec!["combat:kick".to_string()]
    );
    assert_eq!(
        engine.dispatch(actor, "look").await.unwrap().outcome,
        DispatchOutcome::Executed
    );
    assert_eq!(
        engine.dispatch(actor, "poke").await.unwrap().outcome,
        DispatchOutcome::NoMatch
    );
}

#[tokio::test]
async fn test_global_factory_is_shared() {
    CmdSetFactory::global()
        .register("shared_stack_test", || echo_set("shared_stack_test", &["nod"]))
        .unwrap();

    assert!(CmdSetFactory::global().contains("shared_stack_test").unwrap());
    let set = CmdSetFactory::global().build("shared_stack_test").unwrap();
    assert!(set.contains_key("nod"));
}
