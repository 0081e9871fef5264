//! Executable module instances.

use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::module::info::{DefaultModuleInfo, ModuleInfo};
use crate::module::value::Value;
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

/// A descriptor bound to a live object whose parameters are accessible by name.
pub trait Module: Send {
    fn info(&self) -> &dyn ModuleInfo;

    /// Current value of a parameter. Unknown names fail with
    /// [`FrameworkError::UnknownItem`].
    fn value(&self, name: &str) -> Result<Value>;

    /// Assign a parameter, returning its previous value.
    fn set_value(&mut self, name: &str, value: Value) -> Result<Value>;

    fn run(&mut self, ctx: &Context) -> anyhow::Result<()>;

    fn initialize(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the parameter was supplied or injected and needs no further input.
    fn is_resolved(&self, name: &str) -> bool;

    fn set_resolved(&mut self, name: &str, resolved: bool);

    fn inputs(&self) -> IndexMap<String, Value> {
        snapshot(self, self.info().inputs().iter().map(|i| i.name()))
    }

    fn outputs(&self) -> IndexMap<String, Value> {
        snapshot(self, self.info().outputs().iter().map(|i| i.name()))
    }

    /// The object the module delegates to, if there is one.
    fn delegate(&self) -> Option<&dyn Any> {
        None
    }

    fn delegate_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

fn snapshot<'a, M: Module + ?Sized>(
    module: &M,
    names: impl Iterator<Item = &'a str>,
) -> IndexMap<String, Value> {
    names
        .map(|name| (name.to_string(), module.value(name).unwrap_or_default()))
        .collect()
}

pub(crate) fn unknown_item(info: &dyn ModuleInfo, name: &str) -> FrameworkError {
    FrameworkError::UnknownItem {
        module: info.title(),
        name: name.to_string(),
    }
}

/// Run body of a [`DefaultModule`].
pub type ModuleBody =
    Box<dyn FnMut(&mut IndexMap<String, Value>, &Context) -> anyhow::Result<()> + Send>;

/// Map-backed module over a [`DefaultModuleInfo`].
pub struct DefaultModule {
    info: Arc<DefaultModuleInfo>,
    values: IndexMap<String, Value>,
    resolved: HashSet<String>,
    body: Option<ModuleBody>,
}

impl DefaultModule {
    pub fn new(info: Arc<DefaultModuleInfo>) -> Self {
        Self {
            info,
            values: IndexMap::new(),
            resolved: HashSet::new(),
            body: None,
        }
    }

    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: FnMut(&mut IndexMap<String, Value>, &Context) -> anyhow::Result<()> + Send + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }
}

impl Module for DefaultModule {
    fn info(&self) -> &dyn ModuleInfo {
        self.info.as_ref()
    }

    fn value(&self, name: &str) -> Result<Value> {
        let item = self
            .info
            .item(name)
            .ok_or_else(|| unknown_item(self.info.as_ref(), name))?;
        Ok(match self.values.get(name) {
            Some(value) => value.clone(),
            None if item.is_final() => item.default_value().cloned().unwrap_or_default(),
            None => Value::Null,
        })
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<Value> {
        let item = self
            .info
            .item(name)
            .ok_or_else(|| unknown_item(self.info.as_ref(), name))?;
        if item.is_final() {
            return Err(FrameworkError::ReadOnlyItem {
                name: name.to_string(),
            });
        }
        let value = item.coerce(value)?;
        Ok(self
            .values
            .insert(name.to_string(), value)
            .unwrap_or_default())
    }

    fn run(&mut self, ctx: &Context) -> anyhow::Result<()> {
        match self.body.as_mut() {
            Some(body) => body(&mut self.values, ctx),
            None => Ok(()),
        }
    }

    fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    fn set_resolved(&mut self, name: &str, resolved: bool) {
        if resolved {
            self.resolved.insert(name.to_string());
        } else {
            self.resolved.remove(name);
        }
    }
}
