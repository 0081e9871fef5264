//! Explicit parameter schemas.
//!
//! A [`Schema`] lists a command type's parameters in discovery order. Each
//! [`Field`] pairs a [`ModuleItem`] with typed accessors; a field without a
//! setter is immutable. [`Schema::inherit`] lifts a base type's fields into a
//! type that embeds it.

use crate::module::item::ModuleItem;
use crate::module::value::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Getter<C> = Arc<dyn Fn(&C) -> Value + Send + Sync>;
type Setter<C> = Arc<dyn Fn(&mut C, Value) -> Option<()> + Send + Sync>;

/// One parameter of a command type `C`.
pub struct Field<C> {
    item: ModuleItem,
    get: Getter<C>,
    set: Option<Setter<C>>,
}

impl<C: 'static> Field<C> {
    /// Mutable field. The setter receives a value already coerced to the
    /// item's type and returns `None` if it cannot store it.
    pub fn new<G, S>(item: ModuleItem, get: G, set: S) -> Self
    where
        G: Fn(&C) -> Value + Send + Sync + 'static,
        S: Fn(&mut C, Value) -> Option<()> + Send + Sync + 'static,
    {
        Self {
            item,
            get: Arc::new(get),
            set: Some(Arc::new(set)),
        }
    }

    /// Field without a setter.
    pub fn read_only<G>(item: ModuleItem, get: G) -> Self
    where
        G: Fn(&C) -> Value + Send + Sync + 'static,
    {
        Self {
            item: item.immutable(),
            get: Arc::new(get),
            set: None,
        }
    }

    /// Constant message text shown with the command's inputs.
    pub fn message(name: &str, text: &str) -> Self {
        let value = Value::from(text);
        Self::read_only(ModuleItem::message(name, text), move |_| value.clone())
    }

    pub fn item(&self) -> &ModuleItem {
        &self.item
    }

    pub fn is_final(&self) -> bool {
        self.set.is_none() || self.item.is_final()
    }

    pub fn get(&self, target: &C) -> Value {
        (self.get)(target)
    }

    pub fn set(&self, target: &mut C, value: Value) -> Option<()> {
        self.set.as_ref().and_then(|set| set(target, value))
    }

    /// View this field through an embedding type `P`.
    pub fn lift<P: 'static>(self, view: fn(&P) -> &C, view_mut: fn(&mut P) -> &mut C) -> Field<P> {
        let get = self.get;
        Field {
            item: self.item,
            get: Arc::new(move |p: &P| get(view(p))),
            set: self.set.map(|set| -> Setter<P> {
                Arc::new(move |p: &mut P, v: Value| set(view_mut(p), v))
            }),
        }
    }

    /// Type-erased form for storage in a [`super::CommandClass`].
    pub fn erase(self) -> ErasedField {
        let get = self.get;
        let set = self.set;
        ErasedField {
            is_final: set.is_none() || self.item.is_final(),
            item: self.item,
            get: Arc::new(move |target: &dyn Any| target.downcast_ref::<C>().map(|c| get(c))),
            set: set.map(|set| -> ErasedSetter {
                Arc::new(move |target: &mut dyn Any, v: Value| {
                    target.downcast_mut::<C>().and_then(|c| set(c, v))
                })
            }),
        }
    }
}

/// Ordered fields of a command type.
pub struct Schema<C> {
    fields: Vec<Field<C>>,
}

impl<C: 'static> Schema<C> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: Field<C>) -> Self {
        self.fields.push(field);
        self
    }

    /// Append every field of `base`, accessed through `view`/`view_mut`.
    pub fn inherit<B: 'static>(
        mut self,
        base: Schema<B>,
        view: fn(&C) -> &B,
        view_mut: fn(&mut C) -> &mut B,
    ) -> Self {
        self.fields
            .extend(base.fields.into_iter().map(|f| f.lift(view, view_mut)));
        self
    }

    pub fn fields(&self) -> &[Field<C>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn erase(self) -> Vec<ErasedField> {
        self.fields.into_iter().map(Field::erase).collect()
    }
}

impl<C: 'static> Default for Schema<C> {
    fn default() -> Self {
        Self::new()
    }
}

type ErasedGetter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type ErasedSetter = Arc<dyn Fn(&mut dyn Any, Value) -> Option<()> + Send + Sync>;

/// A field detached from its command type; accessors downcast the target.
#[derive(Clone)]
pub struct ErasedField {
    item: ModuleItem,
    is_final: bool,
    get: ErasedGetter,
    set: Option<ErasedSetter>,
}

impl ErasedField {
    pub fn item(&self) -> &ModuleItem {
        &self.item
    }

    pub fn name(&self) -> &str {
        self.item.name()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// `None` if `target` is not of the field's command type.
    pub fn get(&self, target: &dyn Any) -> Option<Value> {
        (self.get)(target)
    }

    /// `None` if the field is read-only, the target has the wrong type, or
    /// the setter rejected the value.
    pub fn set(&self, target: &mut dyn Any, value: Value) -> Option<()> {
        self.set.as_ref().and_then(|set| set(target, value))
    }
}

impl fmt::Debug for ErasedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedField")
            .field("name", &self.item.name())
            .field("is_final", &self.is_final)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::value::ValueType;

    #[derive(Default)]
    struct Base {
        size: i64,
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        name: String,
    }

    fn base_of(d: &Derived) -> &Base {
        &d.base
    }

    fn base_of_mut(d: &mut Derived) -> &mut Base {
        &mut d.base
    }

    fn base_schema() -> Schema<Base> {
        Schema::new().field(Field::new(
            ModuleItem::input("size", ValueType::Int),
            |b: &Base| Value::Int(b.size),
            |b: &mut Base, v| {
                b.size = v.as_int()?;
                Some(())
            },
        ))
    }

    fn derived_schema() -> Schema<Derived> {
        Schema::new()
            .inherit(base_schema(), base_of, base_of_mut)
            .field(Field::new(
                ModuleItem::input("name", ValueType::Text),
                |d: &Derived| Value::from(d.name.as_str()),
                |d: &mut Derived, v| {
                    d.name = v.into_text()?;
                    Some(())
                },
            ))
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let schema = derived_schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.item().name()).collect();
        assert_eq!(names, vec!["size", "name"]);
    }

    #[test]
    fn test_lifted_accessors_reach_base() {
        let schema = derived_schema();
        let mut d = Derived::default();
        schema.fields()[0].set(&mut d, Value::Int(9)).unwrap();
        assert_eq!(d.base.size, 9);
        assert_eq!(schema.fields()[0].get(&d), Value::Int(9));
    }

    #[test]
    fn test_erased_field_checks_target_type() {
        let fields = derived_schema().erase();
        let mut d = Derived::default();
        assert!(fields[1].set(&mut d, Value::from("x")).is_some());
        assert_eq!(fields[1].get(&d), Some(Value::from("x")));

        let mut wrong = 5u32;
        assert!(fields[1].get(&wrong).is_none());
        assert!(fields[1].set(&mut wrong, Value::from("x")).is_none());
    }

    #[test]
    fn test_setter_rejects_mismatched_value() {
        let fields = base_schema().erase();
        let mut b = Base::default();
        assert!(fields[0].set(&mut b, Value::from("big")).is_none());
    }

    #[test]
    fn test_read_only_and_message_fields() {
        let ro: Field<Base> =
            Field::read_only(ModuleItem::output("size", ValueType::Int), |b: &Base| {
                Value::Int(b.size)
            });
        assert!(ro.is_final());
        assert!(ro.item().is_final());

        let msg: Field<Base> = Field::message("hint", "Pick a size");
        assert!(msg.is_final());
        assert!(msg.item().is_message());
        assert_eq!(msg.get(&Base::default()), Value::from("Pick a size"));
    }
}
