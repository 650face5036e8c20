use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;

use rustmudcmd::{
    CmdSet, CommandHandler, CommandInstance, CommandSpec, Engine, EngineConfig, ExecutionContext,
    FnHandler, HelpIndex, InMemoryChannels, ObjectId, ObjectKind, SystemCmd,
};

#[derive(Parser)]
#[command(name = "rustmudcmd", about = "Demo shell for the command engine")]
struct Args {
    /// Name of the demo character
    #[arg(long, default_value = "Wanderer")]
    name: String,

    /// Optional JSON engine configuration file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// Describe the actor's current location, its exits and contents.
struct LookHandler;

#[async_trait]
impl CommandHandler for LookHandler {
    fn name(&self) -> &str {
        "look"
    }

    async fn execute(
        &self,
        cmd: &mut CommandInstance,
        ctx: &ExecutionContext,
    ) -> rustmudcmd::Result<Option<String>> {
        let world = ctx.world.read().await;
        let Some(actor) = world.object(cmd.actor) else {
            return Ok(None);
        };
        let Some(location) = actor.location() else {
            cmd.msg("You are floating in the void.");
            return Ok(None);
        };
        let room_name = world.name_of(location).unwrap_or("somewhere").to_string();
        cmd.msg(format!("-- {room_name} --"));

        let mut exits = Vec::new();
        let mut things = Vec::new();
        for oid in world.contents(location) {
            if oid == cmd.actor {
                continue;
            }
            if let Some(obj) = world.object(oid) {
                match obj.kind() {
                    ObjectKind::Exit { .. } => exits.push(obj.name().to_string()),
                    _ => things.push(obj.name().to_string()),
                }
            }
        }
        if !exits.is_empty() {
            cmd.msg(format!("Exits: {}", exits.join(", ")));
        }
        if !things.is_empty() {
            cmd.msg(format!("You see: {}", things.join(", ")));
        }
        Ok(Some(room_name))
    }
}

fn base_cmdset() -> CmdSet {
    let mut set = CmdSet::new("base");
    set.add(
        CommandSpec::new("look", Arc::new(LookHandler))
            .alias("l")
            .help_text("Describe your surroundings."),
    );
    set.add(
        CommandSpec::from_fn("say", |cmd| {
            let text = cmd.args.trim().to_string();
            if text.is_empty() {
                cmd.msg("Say what?");
                return Ok(None);
            }
            cmd.msg(format!("You say, \"{text}\""));
            Ok(Some(text))
        })
        .help_category("comms")
        .help_text("Speak to the room."),
    );
    set.add(
        CommandSpec::from_fn("help", |cmd| {
            let index = HelpIndex::build(&cmd.cmdset);
            for category in index.categories().map(str::to_string).collect::<Vec<_>>() {
                let keys: Vec<&str> = index
                    .entries(&category)
                    .iter()
                    .map(|e| e.key.as_str())
                    .collect();
                cmd.msg(format!("{category}: {}", keys.join(", ")));
            }
            Ok(None)
        })
        .help_text("List every command available to you."),
    );
    set.add(CommandSpec::system(
        SystemCmd::LoginStart,
        Arc::new(FnHandler::new("greet", |cmd| {
            cmd.msg("Welcome to the demo world. Try 'look'.");
            Ok(None)
        })),
    ));
    set
}

async fn build_world(engine: &Engine, channels: &InMemoryChannels, name: &str) -> Result<ObjectId> {
    let actor = {
        let mut world = engine.world().write().await;
        let hall = world.create_room("Stone Hall");
        let cellar = world.create_room("Dusty Cellar");
        world.create_exit("down", &["d"], hall, cellar);
        world.create_exit("up", &["u"], cellar, hall);
        world.create_thing("rusty lantern", hall);

        let actor = world.create_character(name, hall);
        world
            .object_mut(actor)
            .expect("actor just created")
            .cmdsets_mut()
            .add_default(base_cmdset(), false);
        actor
    };

    channels.create("public").await;
    channels.subscribe("public", actor).await?;
    Ok(actor)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::new().nomatch_message("Huh? Try 'look'."),
    };
    let channels = Arc::new(InMemoryChannels::new(config.channel_history));
    let engine = Engine::builder()
        .config(config)
        .channels(channels.clone())
        .build();

    let actor = build_world(&engine, &channels, &args.name).await?;
    let (mut session, greeting) = engine.connect(actor).await?;
    for line in greeting {
        println!("{line}");
    }
    println!("(speak on the public channel with 'public <text>'; 'quit' leaves)");

    let stdin = std::io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim_end();
        if line.eq_ignore_ascii_case("quit") {
            break;
        }
        let result = session.process(line).await?;
        for line in result.output {
            println!("{line}");
        }
    }

    session.close().await;
    Ok(())
}
