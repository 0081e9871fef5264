//! Module item descriptors.
//!
//! A [`ModuleItem`] describes one named, typed input or output slot. Items are
//! built once with the builder methods and are immutable afterwards; the
//! owning descriptor shares them as `Arc<ModuleItem>`.

use crate::context::ServiceKey;
use crate::error::{FrameworkError, Result};
use crate::module::value::{Value, ValueType};

/// Whether an item is an input, an output, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemIO {
    Input,
    Output,
    Both,
}

impl ItemIO {
    pub fn is_input(self) -> bool {
        matches!(self, ItemIO::Input | ItemIO::Both)
    }

    pub fn is_output(self) -> bool {
        matches!(self, ItemIO::Output | ItemIO::Both)
    }
}

/// How an item is presented to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemVisibility {
    #[default]
    Normal,
    /// Shown but not persisted or recorded.
    Transient,
    /// Never shown to the user.
    Invisible,
    /// Read-only text shown as a message.
    Message,
}

/// Descriptor of one module parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleItem {
    name: String,
    value_type: ValueType,
    io: ItemIO,
    visibility: ItemVisibility,
    is_final: bool,
    label: Option<String>,
    description: Option<String>,
    default_value: Option<Value>,
    required: bool,
    persist: bool,
    min: Option<Value>,
    max: Option<Value>,
    choices: Vec<Value>,
}

impl ModuleItem {
    pub fn new(name: impl Into<String>, value_type: ValueType, io: ItemIO) -> Self {
        Self {
            name: name.into(),
            value_type,
            io,
            visibility: ItemVisibility::Normal,
            is_final: false,
            label: None,
            description: None,
            default_value: None,
            required: true,
            persist: true,
            min: None,
            max: None,
            choices: Vec::new(),
        }
    }

    pub fn input(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, ItemIO::Input)
    }

    pub fn output(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, ItemIO::Output)
    }

    pub fn both(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, ItemIO::Both)
    }

    /// Read-only text input displayed as a message.
    pub fn message(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            visibility: ItemVisibility::Message,
            is_final: true,
            required: false,
            persist: false,
            default_value: Some(Value::Text(text.into())),
            ..Self::input(name, ValueType::Text)
        }
    }

    /// Input injected from the context's service of type `T`.
    pub fn service<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            visibility: ItemVisibility::Invisible,
            persist: false,
            ..Self::input(name, ValueType::Service(ServiceKey::of::<T>()))
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

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_visibility(mut self, visibility: ItemVisibility) -> Self {
        self.visibility = visibility;
        if visibility == ItemVisibility::Transient {
            self.persist = false;
        }
        self
    }

    /// Mark the item as immutable.
    pub fn immutable(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_range(mut self, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    pub fn with_choices<V: Into<Value>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn io(&self) -> ItemIO {
        self.io
    }

    pub fn is_input(&self) -> bool {
        self.io.is_input()
    }

    pub fn is_output(&self) -> bool {
        self.io.is_output()
    }

    pub fn visibility(&self) -> ItemVisibility {
        self.visibility
    }

    pub fn is_message(&self) -> bool {
        self.visibility == ItemVisibility::Message
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_persisted(&self) -> bool {
        self.persist
    }

    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    /// Label if set, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Bring `value` to this item's type: as-is when it conforms, else via
    /// [`Value::convert`].
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.conforms_to(&self.value_type) {
            return Ok(value);
        }
        value
            .convert(&self.value_type)
            .ok_or_else(|| FrameworkError::InvalidValue {
                name: self.name.clone(),
                expected: self.value_type.to_string(),
                actual: value.type_name(),
            })
    }

    /// Describe why `value` violates the item's range or choices, if it does.
    pub fn check(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        if !self.choices.is_empty() && !self.choices.contains(value) {
            return Some(format!("'{}' is not a valid choice for {}", value, self.name));
        }
        if let (Some(v), Some(min)) = (value.as_float(), self.min.as_ref().and_then(Value::as_float)) {
            if v < min {
                return Some(format!("{} is below the minimum {} of {}", v, min, self.name));
            }
        }
        if let (Some(v), Some(max)) = (value.as_float(), self.max.as_ref().and_then(Value::as_float)) {
            if v > max {
                return Some(format!("{} is above the maximum {} of {}", v, max, self.name));
            }
        }
        None
    }
}
