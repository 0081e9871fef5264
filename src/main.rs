//! modframe-rs - Main Entry Point
//!
//! Lists the registered commands, or runs one of them:
//!
//! ```text
//! modframe-rs [--list]
//! modframe-rs <command> [name=value ...]
//! ```

use anyhow::Context as _;
use indexmap::IndexMap;
use modframe_rs::{
    command::{CommandKind, CommandService},
    commands::{register_builtins, ExecutionOptions},
    config::{options_path, FrameworkConfig},
    context::{Context, ContextBuilder},
    display::{Display, DisplayService, MemoryDisplayService},
    logging::init_logging,
    module::{ModuleInfo, ModuleService, Value},
    options::{OptionsService, OptionsStore},
};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let mut config = FrameworkConfig::load_or_default();
    let _log_guard = init_logging(&config.logging)?;

    tracing::info!("Starting modframe-rs");

    let store = options_path()
        .map(OptionsStore::load_or_default)
        .unwrap_or_default();
    ExecutionOptions::apply_stored(&store, &mut config.execution);

    let displays = Arc::new(MemoryDisplayService::new());
    let ctx = ContextBuilder::with_defaults(&config)
        .with(Arc::new(OptionsService::new(store)))
        .with::<dyn DisplayService>(displays.clone())
        .build();
    let commands = ctx.require::<CommandService>()?;
    register_builtins(&commands);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        None => list_commands(&ctx),
        Some((flag, _)) if flag == "--list" => list_commands(&ctx),
        Some((name, rest)) => {
            let inputs = parse_inputs(rest)?;
            run(&ctx, &displays, name, inputs)
        }
    }
}

fn parse_inputs(args: &[String]) -> anyhow::Result<IndexMap<String, Value>> {
    args.iter()
        .map(|arg| {
            let (name, value) = arg
                .split_once('=')
                .with_context(|| format!("Expected name=value, got '{}'", arg))?;
            Ok((name.to_string(), Value::from(value)))
        })
        .collect()
}

fn list_commands(ctx: &Context) -> anyhow::Result<()> {
    let commands = ctx.require::<CommandService>()?;
    for info in commands.commands() {
        let marker = match info.kind() {
            CommandKind::Options => " [options]",
            CommandKind::Command => "",
        };
        println!("{:<20} {}{}", info.title(), info.class_name(), marker);
        for item in info.inputs() {
            println!("    {:<16} {}", item.name(), item.value_type());
        }
    }
    Ok(())
}

fn run(
    ctx: &Arc<Context>,
    displays: &MemoryDisplayService,
    name: &str,
    inputs: IndexMap<String, Value>,
) -> anyhow::Result<()> {
    let commands = ctx.require::<CommandService>()?;
    let info = commands
        .command(name)
        .with_context(|| format!("No such command: {}", name))?;

    if info.kind() == CommandKind::Options {
        let options = ctx.require::<OptionsService>()?;
        for (option, value) in inputs {
            options.set_option(ctx, info.class_name(), &option, value)?;
        }
        for (option, value) in options.options_map(ctx, info.class_name())? {
            println!("{} = {}", option, value);
        }
        return Ok(());
    }

    let execution = ctx
        .require::<ModuleService>()?
        .run_command(ctx, name, inputs)?;
    if let Some(reason) = &execution.cancel_reason {
        println!("Canceled: {}", reason);
        return Ok(());
    }
    for (output, value) in execution.module.outputs() {
        println!("{} = {}", output, value);
    }
    for display in displays.displays() {
        let name = display.name().unwrap_or_else(|| display.id().to_string());
        println!("[display {}] {} value(s)", name, display.values().len());
    }
    Ok(())
}
