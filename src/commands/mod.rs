//! Built-in commands registered by the binary.

mod about;
mod arithmetic;
mod execution_options;
mod list;

pub use about::About;
pub use arithmetic::AddNumbers;
pub use execution_options::ExecutionOptions;
pub use list::ListCommands;

use crate::command::{CommandService, PluginMetadata};

/// Register every built-in command with `commands`.
pub fn register_builtins(commands: &CommandService) {
    commands.register::<About>(
        PluginMetadata::titled("About")
            .with_description("Show the framework version")
            .with_menu_path(["Help", "About"])
            .with_headless(true),
    );
    commands.register::<AddNumbers>(
        PluginMetadata::titled("Add Numbers")
            .with_description("Add two numbers")
            .with_menu_path(["Process", "Math", "Add Numbers"])
            .with_headless(true),
    );
    commands.register::<ListCommands>(
        PluginMetadata::titled("List Commands")
            .with_menu_path(["Help", "Commands"])
            .with_headless(true),
    );
    commands.register::<ExecutionOptions>(
        PluginMetadata::options("Execution Options")
            .with_menu_path(["Edit", "Options", "Execution"])
            .with_headless(true),
    );
}
