//! Routes module outputs to display surfaces.

use crate::config::OutputPolicy;
use crate::context::Context;
use crate::display::{Display, DisplayHandle, DisplayService};
use crate::error::Result;
use crate::logging::LogService;
use crate::module::item::ModuleItem;
use crate::module::process::{ModulePostprocessor, Priority};
use crate::module::instance::Module;
use crate::module::value::Value;

/// Label, else name, else `"Unnamed"`.
pub fn default_name(item: &ModuleItem) -> String {
    match (item.label(), item.name()) {
        (Some(label), _) if !label.is_empty() => label.to_string(),
        (_, name) if !name.is_empty() => name.to_string(),
        _ => "Unnamed".to_string(),
    }
}

/// Shows every output of a finished module.
///
/// Does nothing when the context has no `dyn DisplayService`.
#[derive(Debug, Clone, Default)]
pub struct DisplayPostprocessor {
    policy: OutputPolicy,
}

impl DisplayPostprocessor {
    pub fn new(policy: OutputPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OutputPolicy {
        &self.policy
    }

    /// Route one output value. Returns the number of surfaces touched.
    pub fn handle_output(
        &self,
        displays: &dyn DisplayService,
        log: &dyn LogService,
        name: &str,
        output: &Value,
    ) -> usize {
        if let Value::Display(display) = output {
            display.update();
            return 1;
        }

        let mut targets: Vec<DisplayHandle> = displays.displays_of(output);
        if targets.is_empty() {
            let active = displays
                .active_display()
                .filter(|_| self.policy.adds_to_existing())
                .filter(|d| d.can_display(output));
            match active {
                Some(active) => {
                    active.display(output);
                    targets.push(active);
                }
                None => {
                    if let Some(created) = displays.create_display(output) {
                        if created.name().is_none() {
                            created.set_name(name);
                        }
                        targets.push(created);
                    }
                }
            }
        }

        if !targets.is_empty() {
            for display in &targets {
                display.update();
            }
            return targets.len();
        }

        match output {
            Value::Map(entries) => entries
                .iter()
                .map(|(key, value)| self.handle_output(displays, log, key, value))
                .sum(),
            Value::List(elements) => elements
                .iter()
                .map(|value| self.handle_output(displays, log, name, value))
                .sum(),
            _ => {
                log.warn(&format!(
                    "Ignoring unsupported output: {} [{}]",
                    name,
                    output.type_name()
                ));
                0
            }
        }
    }
}

impl ModulePostprocessor for DisplayPostprocessor {
    fn name(&self) -> &str {
        "display"
    }

    fn priority(&self) -> i32 {
        Priority::VERY_LOW
    }

    fn process(&self, module: &mut dyn Module, ctx: &Context) -> Result<()> {
        let Some(displays) = ctx.service::<dyn DisplayService>() else {
            return Ok(());
        };
        let log = ctx.log();
        let info = module.info();
        for item in info.outputs() {
            let value = module.value(item.name())?;
            let name = default_name(item);
            let touched = self.handle_output(displays.as_ref(), log.as_ref(), &name, &value);
            tracing::trace!("Output {} shown on {} displays", name, touched);
        }
        Ok(())
    }
}
