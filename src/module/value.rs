//! Dynamically typed parameter values.
//!
//! Every input and output crosses the module boundary as a [`Value`]. The
//! declared type of a parameter is a [`ValueType`]; setting a parameter checks
//! the value against it and falls back to [`Value::convert`] for the lenient
//! conversions a script or a `key=value` command line needs.

use crate::context::{ServiceKey, ServiceRef};
use crate::display::DisplayHandle;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Semantic type of a module item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    Path,
    List,
    Map,
    /// A display surface handle.
    Display,
    /// A service resolved from the execution context.
    Service(ServiceKey),
    /// An opaque payload of the named Rust type.
    Object(&'static str),
    /// Accepts any value.
    Any,
}

impl ValueType {
    /// Whether this is a service type.
    pub fn is_service(&self) -> bool {
        matches!(self, ValueType::Service(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Text => write!(f, "text"),
            ValueType::Path => write!(f, "path"),
            ValueType::List => write!(f, "list"),
            ValueType::Map => write!(f, "map"),
            ValueType::Display => write!(f, "display"),
            ValueType::Service(key) => write!(f, "service<{}>", key.name()),
            ValueType::Object(name) => write!(f, "object<{}>", name),
            ValueType::Any => write!(f, "any"),
        }
    }
}

/// Shared, opaque payload carried through the pipeline (datasets, tables, ...).
#[derive(Clone)]
pub struct ObjectRef {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Identity comparison: two refs are equal when they share the payload.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A parameter value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Path(PathBuf),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Display(DisplayHandle),
    Service(ServiceRef),
    Object(ObjectRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Value::Path(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_display(&self) -> Option<&DisplayHandle> {
        match self {
            Value::Display(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceRef> {
        match self {
            Value::Service(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Value::Path(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<IndexMap<String, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Wrap a service handle.
    pub fn service<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Self {
        Value::Service(ServiceRef::new(service))
    }

    /// Wrap an opaque payload.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(ObjectRef::new(value))
    }

    /// Runtime type name, used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Text(_) => "text".to_string(),
            Value::Path(_) => "path".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Display(_) => "display".to_string(),
            Value::Service(s) => format!("service<{}>", s.key().name()),
            Value::Object(o) => format!("object<{}>", o.type_name()),
        }
    }

    /// Whether the value can be stored in an item of type `ty` without conversion.
    ///
    /// `Null` conforms to every type: it clears the item.
    pub fn conforms_to(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (Value::Null, _) | (_, ValueType::Any) => true,
            (Value::Bool(_), ValueType::Bool) => true,
            (Value::Int(_), ValueType::Int) => true,
            (Value::Float(_), ValueType::Float) => true,
            (Value::Text(_), ValueType::Text) => true,
            (Value::Path(_), ValueType::Path) => true,
            (Value::List(_), ValueType::List) => true,
            (Value::Map(_), ValueType::Map) => true,
            (Value::Display(_), ValueType::Display) => true,
            (Value::Service(s), ValueType::Service(key)) => s.key() == key,
            (Value::Object(o), ValueType::Object(name)) => o.type_name() == *name,
            _ => false,
        }
    }

    /// Convert to `ty` if a lossless-enough conversion exists.
    pub fn convert(&self, ty: &ValueType) -> Option<Value> {
        if self.conforms_to(ty) {
            return Some(self.clone());
        }
        match (self, ty) {
            (Value::Int(v), ValueType::Float) => Some(Value::Float(*v as f64)),
            (Value::Float(v), ValueType::Int) if v.fract() == 0.0 => Some(Value::Int(*v as i64)),
            (Value::Bool(v), ValueType::Text) => Some(Value::Text(v.to_string())),
            (Value::Int(v), ValueType::Text) => Some(Value::Text(v.to_string())),
            (Value::Float(v), ValueType::Text) => Some(Value::Text(v.to_string())),
            (Value::Path(v), ValueType::Text) => Some(Value::Text(v.display().to_string())),
            (Value::Text(s), ValueType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Value::Text(s), ValueType::Int) => s.trim().parse().ok().map(Value::Int),
            (Value::Text(s), ValueType::Float) => s.trim().parse().ok().map(Value::Float),
            (Value::Text(s), ValueType::Path) => Some(Value::Path(PathBuf::from(s))),
            (Value::Text(s), ValueType::List) => Some(Value::List(
                s.split(',')
                    .map(|part| Value::Text(part.trim().to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// JSON form for persistence. Handles (displays, services, objects) have none.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Path(v) => serde_json::Value::String(v.display().to_string()),
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(out)
            }
            Value::Display(_) | Value::Service(_) | Value::Object(_) => return None,
        })
    }

    /// Untyped value from JSON. Use [`Value::convert`] to reach the item's type.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Display(a), Value::Display(b)) => a.id() == b.id(),
            (Value::Service(a), Value::Service(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Text(v) => write!(f, "Text({:?})", v),
            Value::Path(v) => write!(f, "Path({:?})", v),
            Value::List(v) => f.debug_list().entries(v).finish(),
            Value::Map(v) => f.debug_map().entries(v).finish(),
            Value::Display(d) => write!(f, "Display({})", d.id()),
            Value::Service(s) => write!(f, "Service({})", s.key().name()),
            Value::Object(o) => write!(f, "Object({})", o.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Path(v) => write!(f, "{}", v.display()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Display(d) => write!(f, "<display {}>", d.id()),
            Value::Service(s) => write!(f, "<service {}>", s.key().name()),
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Text("x".into()).as_int(), None);
    }

    #[test]
    fn test_conforms_to() {
        assert!(Value::Int(1).conforms_to(&ValueType::Int));
        assert!(!Value::Int(1).conforms_to(&ValueType::Float));
        assert!(Value::Null.conforms_to(&ValueType::Map));
        assert!(Value::Text("a".into()).conforms_to(&ValueType::Any));
    }

    #[test]
    fn test_text_conversions() {
        let text = Value::from(" 12 ");
        assert_eq!(text.convert(&ValueType::Int), Some(Value::Int(12)));
        assert_eq!(text.convert(&ValueType::Float), Some(Value::Float(12.0)));
        assert_eq!(Value::from("yes").convert(&ValueType::Bool), Some(Value::Bool(true)));
        assert_eq!(Value::from("maybe").convert(&ValueType::Bool), None);
        assert_eq!(Value::from("abc").convert(&ValueType::Int), None);
        assert_eq!(
            Value::from("a, b").convert(&ValueType::List),
            Some(Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(Value::Int(3).convert(&ValueType::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::Float(3.0).convert(&ValueType::Int), Some(Value::Int(3)));
        assert_eq!(Value::Float(3.5).convert(&ValueType::Int), None);
    }

    #[test]
    fn test_json_excludes_handles() {
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::Int(1));
        map.insert("b".to_string(), Value::from("two"));
        let json = Value::Map(map.clone()).to_json().unwrap();
        assert_eq!(Value::from_json(&json), Value::Map(map));

        let list = Value::List(vec![Value::Int(1), Value::object(5u8)]);
        assert!(list.to_json().is_none());
    }

    #[test]
    fn test_object_identity() {
        let obj = ObjectRef::new(vec![1u16, 2, 3]);
        let same = Value::Object(obj.clone());
        let other = Value::object(vec![1u16, 2, 3]);
        assert_eq!(Value::Object(obj.clone()), same);
        assert_ne!(Value::Object(obj.clone()), other);
        assert_eq!(obj.downcast_ref::<Vec<u16>>().map(|v| v.len()), Some(3));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Map(IndexMap::new()).type_name(), "map");
        assert!(Value::object(1u8).type_name().contains("u8"));
    }
}
