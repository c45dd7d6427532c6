//! Subject capability interface
//!
//! The host's object model is opaque to this crate. A host integration
//! implements [`Subject`] for whatever its objects are, exposing named values
//! as [`Value`]s; the resolver never sees the host types themselves.
//!
//! [`MapSubject`] is an in-memory implementation used by the headless runner
//! and by tests.

use crate::types::Vec2;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A raw value read from a subject, before coercion
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Vec2(Vec2),
    /// A nested subject (reachable by dotted paths)
    Object(Arc<dyn Subject>),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the representation, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Vec2(_) => "vec2",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Subject>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::U32(v) => write!(f, "U32({v})"),
            Value::U64(v) => write!(f, "U64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Vec2(v) => write!(f, "Vec2({}, {})", v.x, v.y),
            Value::Object(_) => write!(f, "Object(..)"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vec2(v)
    }
}

impl From<MapSubject> for Value {
    fn from(v: MapSubject) -> Self {
        Value::Object(Arc::new(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Named-value access on an opaque host object
///
/// Implementations must not panic; a missing or unreadable member is `None`.
/// The resolver probes [`Subject::property`] before [`Subject::field`] for
/// every candidate name.
pub trait Subject {
    /// Read a property-like accessor
    fn property(&self, name: &str) -> Option<Value>;

    /// Read field-like storage
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Property first, then field
    fn try_get(&self, name: &str) -> Option<Value> {
        self.property(name).or_else(|| self.field(name))
    }
}

/// In-memory subject backed by two name maps
#[derive(Clone, Default)]
pub struct MapSubject {
    properties: HashMap<String, Value>,
    fields: HashMap<String, Value>,
}

impl MapSubject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style property insert
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style field insert
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a name from both maps
    pub fn remove(&mut self, name: &str) {
        self.properties.remove(name);
        self.fields.remove(name);
    }

    /// Number of exposed names
    pub fn len(&self) -> usize {
        self.properties.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.fields.is_empty()
    }
}

impl fmt::Debug for MapSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut props: Vec<_> = self.properties.keys().collect();
        props.sort();
        let mut fields: Vec<_> = self.fields.keys().collect();
        fields.sort();
        f.debug_struct("MapSubject")
            .field("properties", &props)
            .field("fields", &fields)
            .finish()
    }
}

impl Subject for MapSubject {
    fn property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}
