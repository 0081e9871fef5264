//! Module descriptors.

use crate::event::{EventService, FrameworkEvent};
use crate::module::item::ModuleItem;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A non-fatal defect found while building a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityProblem {
    pub message: String,
    pub cause: Option<String>,
}

impl ValidityProblem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ValidityProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Metadata describing a module's parameters.
///
/// `items`, `inputs` and `outputs` share one order. `item` also resolves
/// entries that are hidden from the three views (presets).
pub trait ModuleInfo: Send + Sync {
    fn items(&self) -> &[Arc<ModuleItem>];
    fn inputs(&self) -> &[Arc<ModuleItem>];
    fn outputs(&self) -> &[Arc<ModuleItem>];
    fn item(&self, name: &str) -> Option<&Arc<ModuleItem>>;

    fn input(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.item(name).filter(|i| i.is_input())
    }

    fn output(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.item(name).filter(|i| i.is_output())
    }

    /// Fully qualified name of the type that implements the module.
    fn delegate_class_name(&self) -> &str;

    /// Explicit title, else the last path segment of the delegate class name.
    fn title(&self) -> String {
        short_name(self.delegate_class_name()).to_string()
    }

    fn can_preview(&self) -> bool {
        false
    }

    fn can_cancel(&self) -> bool {
        false
    }

    fn can_run_headless(&self) -> bool {
        false
    }

    /// Name of the initializer hook, if the module declares one.
    fn initializer(&self) -> Option<&str> {
        None
    }

    fn problems(&self) -> &[ValidityProblem];

    fn is_valid(&self) -> bool {
        self.problems().is_empty()
    }

    /// Announce that this descriptor changed.
    fn update(&self, events: &EventService) {
        events.publish(FrameworkEvent::ModulesUpdated {
            titles: vec![self.title()],
        });
    }
}

/// Last segment of a `::` or `.` separated path.
pub fn short_name(class_name: &str) -> &str {
    let tail = class_name.rsplit("::").next().unwrap_or(class_name);
    tail.rsplit('.').next().unwrap_or(tail)
}

/// Ordered item storage backing the descriptor views.
#[derive(Debug, Clone, Default)]
pub struct ItemTable {
    by_name: IndexMap<String, Arc<ModuleItem>>,
    items: Vec<Arc<ModuleItem>>,
    inputs: Vec<Arc<ModuleItem>>,
    outputs: Vec<Arc<ModuleItem>>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a visible item. An item with the same name is replaced in place.
    pub fn add(&mut self, item: Arc<ModuleItem>) {
        match self.items.iter().position(|i| i.name() == item.name()) {
            Some(index) => self.items[index] = item.clone(),
            None => self.items.push(item.clone()),
        }
        self.by_name.insert(item.name().to_string(), item);
        self.rebuild_views();
    }

    /// Add an item resolvable by name but absent from the views.
    pub fn add_hidden(&mut self, item: Arc<ModuleItem>) {
        if self.items.iter().any(|i| i.name() == item.name()) {
            self.items.retain(|i| i.name() != item.name());
            self.rebuild_views();
        }
        self.by_name.insert(item.name().to_string(), item);
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<ModuleItem>> {
        let removed = self.by_name.shift_remove(name)?;
        self.items.retain(|i| i.name() != name);
        self.rebuild_views();
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.contains(name) && !self.items.iter().any(|i| i.name() == name)
    }

    pub fn items(&self) -> &[Arc<ModuleItem>] {
        &self.items
    }

    pub fn inputs(&self) -> &[Arc<ModuleItem>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<ModuleItem>] {
        &self.outputs
    }

    fn rebuild_views(&mut self) {
        self.inputs = self.items.iter().filter(|i| i.is_input()).cloned().collect();
        self.outputs = self.items.iter().filter(|i| i.is_output()).cloned().collect();
    }
}

/// Hand-assembled module descriptor.
#[derive(Debug, Clone, Default)]
pub struct DefaultModuleInfo {
    class_name: String,
    title: Option<String>,
    table: ItemTable,
    problems: Vec<ValidityProblem>,
    can_preview: bool,
    can_cancel: bool,
    headless: bool,
    initializer: Option<String>,
}

impl DefaultModuleInfo {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_item(mut self, item: ModuleItem) -> Self {
        self.add_item(item);
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.can_cancel = cancelable;
        self
    }

    pub fn with_preview(mut self, can_preview: bool) -> Self {
        self.can_preview = can_preview;
        self
    }

    pub fn with_initializer(mut self, initializer: impl Into<String>) -> Self {
        self.initializer = Some(initializer.into());
        self
    }

    pub fn add_item(&mut self, item: ModuleItem) {
        self.table.add(Arc::new(item));
    }

    pub fn remove_item(&mut self, name: &str) -> Option<Arc<ModuleItem>> {
        self.table.remove(name)
    }

    pub fn add_problem(&mut self, problem: ValidityProblem) {
        self.problems.push(problem);
    }
}

impl ModuleInfo for DefaultModuleInfo {
    fn items(&self) -> &[Arc<ModuleItem>] {
        self.table.items()
    }

    fn inputs(&self) -> &[Arc<ModuleItem>] {
        self.table.inputs()
    }

    fn outputs(&self) -> &[Arc<ModuleItem>] {
        self.table.outputs()
    }

    fn item(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.table.get(name)
    }

    fn delegate_class_name(&self) -> &str {
        &self.class_name
    }

    fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| short_name(&self.class_name).to_string())
    }

    fn can_preview(&self) -> bool {
        self.can_preview
    }

    fn can_cancel(&self) -> bool {
        self.can_cancel
    }

    fn can_run_headless(&self) -> bool {
        self.headless
    }

    fn initializer(&self) -> Option<&str> {
        self.initializer.as_deref()
    }

    fn problems(&self) -> &[ValidityProblem] {
        &self.problems
    }
}
