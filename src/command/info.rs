//! Command descriptors with lazy, memoized introspection.
//!
//! A [`CommandInfo`] is created when a command is registered but does not
//! touch the command class until its items, problems or validity are first
//! needed. Introspection then runs exactly once, even under concurrent first
//! access, and its result is fixed for the descriptor's lifetime:
//!
//! 1. Load the class through the [`ClassLoader`]. Failure records
//!    "Could not initialize command class" and leaves the descriptor empty.
//! 2. Walk the schema fields in order. Immutable non-message fields and
//!    repeated names are rejected with one problem each.
//! 3. Accepted fields named in `presets` are resolvable by name but hidden
//!    from `items`/`inputs`/`outputs`.

use crate::command::class::{ClassLoader, CommandClass};
use crate::command::factory::{CommandModuleFactory, DefaultCommandModuleFactory};
use crate::command::schema::ErasedField;
use crate::module::info::{short_name, ItemTable, ModuleInfo, ValidityProblem};
use crate::module::item::ModuleItem;
use crate::module::value::Value;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a command is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    #[default]
    Command,
    /// Holds persistent settings; see [`crate::options::OptionsService`].
    Options,
}

/// Registration metadata of a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadata {
    pub title: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub menu_path: Vec<String>,
    pub priority: i32,
    pub headless: bool,
    pub cancelable: bool,
    pub initializer: Option<String>,
    pub kind: CommandKind,
}

impl PluginMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn options(title: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Options,
            ..Self::titled(title)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_menu_path<S: Into<String>>(mut self, path: impl IntoIterator<Item = S>) -> Self {
        self.menu_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Default)]
struct ParsedClass {
    class: Option<CommandClass>,
    table: ItemTable,
    fields: IndexMap<String, ErasedField>,
    problems: Vec<ValidityProblem>,
}

/// Descriptor of a registered command type.
pub struct CommandInfo {
    class_name: String,
    loader: Arc<dyn ClassLoader>,
    metadata: PluginMetadata,
    presets: IndexMap<String, Value>,
    factory: Arc<dyn CommandModuleFactory>,
    parsed: OnceCell<ParsedClass>,
}

impl CommandInfo {
    pub fn new(
        class_name: impl Into<String>,
        loader: Arc<dyn ClassLoader>,
        metadata: PluginMetadata,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            loader,
            metadata,
            presets: IndexMap::new(),
            factory: Arc::new(DefaultCommandModuleFactory),
            parsed: OnceCell::new(),
        }
    }

    pub fn with_preset(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.presets.insert(name.into(), value.into());
        self
    }

    pub fn with_presets(mut self, presets: IndexMap<String, Value>) -> Self {
        self.presets.extend(presets);
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn CommandModuleFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn kind(&self) -> CommandKind {
        self.metadata.kind
    }

    pub fn presets(&self) -> &IndexMap<String, Value> {
        &self.presets
    }

    pub fn factory(&self) -> &Arc<dyn CommandModuleFactory> {
        &self.factory
    }

    pub fn label(&self) -> String {
        self.metadata.label.clone().unwrap_or_else(|| self.title())
    }

    /// Whether introspection has already run.
    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    /// The loaded class, or `None` if loading failed.
    pub fn command_class(&self) -> Option<&CommandClass> {
        self.parsed().class.as_ref()
    }

    /// Accessors of an accepted field, presets included.
    pub fn field(&self, name: &str) -> Option<&ErasedField> {
        self.parsed().fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &ErasedField> {
        self.parsed().fields.values()
    }

    pub fn is_preset(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    fn parsed(&self) -> &ParsedClass {
        self.parsed.get_or_init(|| self.parse())
    }

    fn parse(&self) -> ParsedClass {
        tracing::debug!("Parsing command class {}", self.class_name);
        let mut parsed = ParsedClass::default();

        let class = match self.loader.load(&self.class_name) {
            Ok(class) => class,
            Err(e) => {
                tracing::warn!("Could not load {}: {}", self.class_name, e);
                parsed.problems.push(
                    ValidityProblem::new(format!(
                        "Could not initialize command class: {}",
                        self.class_name
                    ))
                    .with_cause(e),
                );
                return parsed;
            }
        };

        let (fields, problems) = accept_fields(class.fields());
        for (name, field) in &fields {
            let item = Arc::new(field.item().clone());
            if self.presets.contains_key(name) {
                parsed.table.add_hidden(item);
            } else {
                parsed.table.add(item);
            }
        }
        parsed.fields = fields;
        parsed.problems = problems;

        for problem in &parsed.problems {
            tracing::warn!("{}: {}", self.class_name, problem);
        }
        parsed.class = Some(class);
        parsed
    }
}

/// Split declared fields into accepted ones, keyed by name in discovery
/// order, and one problem per rejected field. Immutable non-message fields
/// are rejected before duplicates are considered.
pub(crate) fn accept_fields(
    declared: Vec<ErasedField>,
) -> (IndexMap<String, ErasedField>, Vec<ValidityProblem>) {
    let mut fields = IndexMap::new();
    let mut problems = Vec::new();
    for field in declared {
        let name = field.name().to_string();
        if field.is_final() && !field.item().is_message() {
            problems.push(ValidityProblem::new(format!("Invalid final parameter: {}", name)));
            continue;
        }
        if fields.contains_key(&name) {
            problems.push(ValidityProblem::new(format!("Invalid duplicate parameter: {}", name)));
            continue;
        }
        fields.insert(name, field);
    }
    (fields, problems)
}

impl ModuleInfo for CommandInfo {
    fn items(&self) -> &[Arc<ModuleItem>] {
        self.parsed().table.items()
    }

    fn inputs(&self) -> &[Arc<ModuleItem>] {
        self.parsed().table.inputs()
    }

    fn outputs(&self) -> &[Arc<ModuleItem>] {
        self.parsed().table.outputs()
    }

    fn item(&self, name: &str) -> Option<&Arc<ModuleItem>> {
        self.parsed().table.get(name)
    }

    fn delegate_class_name(&self) -> &str {
        &self.class_name
    }

    fn title(&self) -> String {
        self.metadata
            .title
            .clone()
            .unwrap_or_else(|| short_name(&self.class_name).to_string())
    }

    fn can_preview(&self) -> bool {
        self.command_class().is_some_and(CommandClass::is_previewable)
    }

    fn can_cancel(&self) -> bool {
        self.metadata.cancelable
    }

    fn can_run_headless(&self) -> bool {
        self.metadata.headless
    }

    fn initializer(&self) -> Option<&str> {
        self.metadata.initializer.as_deref()
    }

    fn problems(&self) -> &[ValidityProblem] {
        &self.parsed().problems
    }
}

impl fmt::Display for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class_name)?;
        if !self.presets.is_empty() {
            write!(f, " [")?;
            for (i, (name, value)) in self.presets.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} = '{}'", name, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInfo")
            .field("class_name", &self.class_name)
            .field("title", &self.metadata.title)
            .field("parsed", &self.is_parsed())
            .finish()
    }
}
