//! Persistent options commands.
//!
//! An options command is a command registered with [`CommandKind::Options`].
//! Its inputs are the option values. [`OptionsService`] instantiates such
//! commands with only the validity and init preprocessors, applies the stored
//! values on top, and records every value assigned through
//! [`OptionsService::set_option`] in an [`OptionsStore`].

use crate::command::{CommandInfo, CommandKind, CommandService};
use crate::context::Context;
use crate::error::{FrameworkError, Result, ResultExt};
use crate::event::FrameworkEvent;
use crate::module::info::ModuleInfo;
use crate::module::instance::Module;
use crate::module::process::{Preprocess, ProcessorChain};
use crate::module::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STORE_VERSION: u32 = 1;

fn default_store_version() -> u32 {
    STORE_VERSION
}

/// Option values keyed by command class name, then item name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsStore {
    #[serde(default = "default_store_version")]
    version: u32,

    #[serde(default)]
    values: IndexMap<String, IndexMap<String, serde_json::Value>>,

    /// Backing file; `None` keeps the store in memory
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl OptionsStore {
    pub fn in_memory() -> Self {
        Self {
            version: STORE_VERSION,
            values: IndexMap::new(),
            path: None,
        }
    }

    /// Load the store backed by `path`; a missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut store = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<Self>(&content)
                .with_context(|| format!("Failed to parse options file {}", path.display()))?
        } else {
            Self::in_memory()
        };
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Load, falling back to an empty store bound to `path` on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load options, using defaults: {}", e);
            Self {
                path: Some(path.to_path_buf()),
                ..Self::in_memory()
            }
        })
    }

    /// Write to the backing file. In-memory stores are left untouched.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize options")?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, class_name: &str, name: &str) -> Option<&serde_json::Value> {
        self.values.get(class_name)?.get(name)
    }

    pub fn set(&mut self, class_name: &str, name: &str, value: serde_json::Value) {
        self.values
            .entry(class_name.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn values_for(&self, class_name: &str) -> Option<&IndexMap<String, serde_json::Value>> {
        self.values.get(class_name)
    }

    pub fn clear(&mut self, class_name: &str) -> bool {
        self.values.shift_remove(class_name).is_some()
    }
}

impl Default for OptionsStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Reads and writes options through their commands.
pub struct OptionsService {
    store: Mutex<OptionsStore>,
    chain: ProcessorChain,
}

impl OptionsService {
    pub fn new(store: OptionsStore) -> Self {
        Self {
            store: Mutex::new(store),
            chain: ProcessorChain::options(),
        }
    }

    /// Snapshot of the stored values.
    pub fn store(&self) -> OptionsStore {
        self.store.lock().clone()
    }

    /// One prepared instance of every registered options command.
    pub fn options(&self, ctx: &Arc<Context>) -> Result<Vec<Box<dyn Module>>> {
        let commands = ctx.require::<CommandService>()?;
        commands
            .commands_of_kind(CommandKind::Options)
            .iter()
            .map(|info| self.create_instance(info, ctx))
            .collect()
    }

    /// A prepared instance of the options command `class_name`.
    pub fn options_instance(&self, ctx: &Arc<Context>, class_name: &str) -> Result<Box<dyn Module>> {
        let info = self.options_info(ctx, class_name)?;
        self.create_instance(&info, ctx)
    }

    pub fn option(&self, ctx: &Arc<Context>, class_name: &str, name: &str) -> Result<Value> {
        self.options_instance(ctx, class_name)?.value(name)
    }

    pub fn options_map(&self, ctx: &Arc<Context>, class_name: &str) -> Result<IndexMap<String, Value>> {
        Ok(self.options_instance(ctx, class_name)?.inputs())
    }

    /// Assign one option, run the options command and record the value.
    pub fn set_option(
        &self,
        ctx: &Arc<Context>,
        class_name: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let info = self.options_info(ctx, class_name)?;
        let mut module = self.create_instance(&info, ctx)?;

        module.set_value(name, value.into())?;
        let typed = module.value(name)?;
        module.run(ctx).map_err(|source| FrameworkError::Execution {
            title: info.title().to_string(),
            source,
        })?;

        let persist = info.item(name).map(|item| item.is_persisted()).unwrap_or(false);
        match typed.to_json().filter(|_| persist) {
            Some(json) => {
                let mut store = self.store.lock();
                store.set(info.class_name(), name, json);
                store.save()?;
            }
            None => tracing::debug!("Option {}.{} not persisted", info.class_name(), name),
        }

        ctx.publish(FrameworkEvent::OptionsChanged {
            class_name: info.class_name().to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn options_info(&self, ctx: &Context, class_name: &str) -> Result<Arc<CommandInfo>> {
        let commands = ctx.require::<CommandService>()?;
        let Some(info) = commands.command(class_name) else {
            ctx.log().error(&format!("No such options class: {}", class_name));
            return Err(FrameworkError::NoSuchCommand(class_name.to_string()));
        };
        if info.kind() != CommandKind::Options {
            ctx.log().error(&format!("Not an options command: {}", class_name));
            return Err(FrameworkError::NotOptions(class_name.to_string()));
        }
        Ok(info)
    }

    fn create_instance(&self, info: &Arc<CommandInfo>, ctx: &Arc<Context>) -> Result<Box<dyn Module>> {
        let mut module = info.factory().create_module_in(info, ctx)?;

        for pre in self.chain.preprocessors() {
            if let Preprocess::Cancel(reason) = pre.process(module.as_mut(), ctx)? {
                tracing::warn!("{} preprocessor canceled {}: {}", pre.name(), info.title(), reason);
            }
        }

        let stored = self.store.lock().values_for(info.class_name()).cloned();
        for (name, json) in stored.into_iter().flatten() {
            if let Err(e) = module.set_value(&name, Value::from_json(&json)) {
                tracing::warn!("Ignoring stored option {}.{}: {}", info.class_name(), name, e);
            }
        }
        Ok(module)
    }
}
