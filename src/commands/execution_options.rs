use crate::command::{Command, CommandType, Field, Schema};
use crate::config::{AddToExisting, ExecutionSettings};
use crate::context::Context;
use crate::module::item::ModuleItem;
use crate::module::value::{Value, ValueType};
use crate::options::OptionsStore;
use std::any::Any;

const NEVER: &str = "never";
const WHEN_COMPATIBLE: &str = "when_compatible";

/// Options command mirroring [`ExecutionSettings`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    settings: ExecutionSettings,
}

impl ExecutionOptions {
    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Overlay values stored for this command onto `settings`.
    pub fn apply_stored(store: &OptionsStore, settings: &mut ExecutionSettings) {
        let Some(stored) = store.values_for(Self::class_name()) else {
            return;
        };
        let mut options = Self {
            settings: settings.clone(),
        };
        for field in Self::schema().fields() {
            if let Some(json) = stored.get(field.item().name()) {
                let applied = field
                    .item()
                    .coerce(Value::from_json(json))
                    .ok()
                    .and_then(|value| field.set(&mut options, value));
                if applied.is_none() {
                    tracing::warn!("Ignoring stored execution option {}", field.item().name());
                }
            }
        }
        *settings = options.settings;
    }
}

impl Command for ExecutionOptions {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        tracing::info!(
            "Execution options: validate_inputs={}, display_outputs={}, add_to_existing={}",
            self.settings.validate_inputs,
            self.settings.display_outputs,
            self.settings.output.add_to_existing
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl CommandType for ExecutionOptions {
    fn class_name() -> &'static str {
        "modframe.commands.ExecutionOptions"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::input("validate_inputs", ValueType::Bool)
                    .with_label("Check input ranges and choices"),
                |o: &ExecutionOptions| Value::Bool(o.settings.validate_inputs),
                |o: &mut ExecutionOptions, v| {
                    o.settings.validate_inputs = v.as_bool()?;
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::input("display_outputs", ValueType::Bool)
                    .with_label("Show outputs after each run"),
                |o: &ExecutionOptions| Value::Bool(o.settings.display_outputs),
                |o: &mut ExecutionOptions, v| {
                    o.settings.display_outputs = v.as_bool()?;
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::input("add_to_existing", ValueType::Text)
                    .with_label("Add outputs to the active display")
                    .with_choices([NEVER, WHEN_COMPATIBLE]),
                |o: &ExecutionOptions| Value::from(o.settings.output.add_to_existing.to_string()),
                |o: &mut ExecutionOptions, v| {
                    o.settings.output.add_to_existing = match v.as_str()? {
                        NEVER => AddToExisting::Never,
                        WHEN_COMPATIBLE => AddToExisting::WhenCompatible,
                        _ => return None,
                    };
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self {
            settings: ExecutionSettings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_stored_overlays_settings() {
        let mut store = OptionsStore::in_memory();
        store.set(ExecutionOptions::class_name(), "display_outputs", serde_json::json!(false));
        store.set(
            ExecutionOptions::class_name(),
            "add_to_existing",
            serde_json::json!("when_compatible"),
        );

        let mut settings = ExecutionSettings::default();
        ExecutionOptions::apply_stored(&store, &mut settings);

        assert!(!settings.display_outputs);
        assert!(settings.validate_inputs);
        assert_eq!(settings.output.add_to_existing, AddToExisting::WhenCompatible);
    }

    #[test]
    fn test_bad_stored_value_is_ignored() {
        let mut store = OptionsStore::in_memory();
        store.set(ExecutionOptions::class_name(), "add_to_existing", serde_json::json!("always"));
        let mut settings = ExecutionSettings::default();
        ExecutionOptions::apply_stored(&store, &mut settings);
        assert_eq!(settings, ExecutionSettings::default());
    }
}
