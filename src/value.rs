//! Bound output: values, the object arena, and typed extraction.
//!
//! Objects are stored in an [`ObjectGraph`] arena and referenced by [`ObjectId`]. Two
//! members holding the same `ObjectId` hold the same instance, which is how aliased nodes
//! are shared and how cycles are represented without reference counting.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use num_traits::NumCast;

use crate::error::Error;

/// Identity of an object within its [`ObjectGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Char(char),
    Bytes(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
    Enum { type_name: String, variant: String },
    Sequence(Vec<Value>),
    /// String-keyed entries in document order.
    Dictionary(Vec<(String, Value)>),
    Object(ObjectId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Entries of a dictionary, in document order.
    pub fn as_dictionary(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Short description used in extraction errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Char(_) => "char",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Enum { .. } => "enum",
            Value::Sequence(_) => "sequence",
            Value::Dictionary(_) => "dictionary",
            Value::Object(_) => "object",
        }
    }
}

/// One constructed instance of a concrete object type.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub type_name: Arc<str>,
    /// Member values, one per declared member, in declaration order.
    pub fields: Vec<(Arc<str>, Value)>,
}

impl Object {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(member, _)| &**member == name)
            .map(|(_, v)| v)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0)
    }

    pub fn object(&self, id: ObjectId) -> Option<ObjectRef<'_>> {
        self.get(id).map(|_| ObjectRef { graph: self, id })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    /// Allocate an instance before its members are bound, so that references to it can be
    /// handed out while it is still under construction.
    pub(crate) fn allocate(
        &mut self,
        type_name: Arc<str>,
        fields: Vec<(Arc<str>, Value)>,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(Object { type_name, fields });
        id
    }

    pub(crate) fn set_fields(&mut self, id: ObjectId, fields: Vec<(Arc<str>, Value)>) {
        if let Some(object) = self.objects.get_mut(id.0) {
            object.fields = fields;
        }
    }
}

/// Borrowed view of one object, with typed member access.
#[derive(Clone, Copy, Debug)]
pub struct ObjectRef<'g> {
    graph: &'g ObjectGraph,
    id: ObjectId,
}

impl<'g> ObjectRef<'g> {
    /// View `value` as an object of `graph`.
    pub fn from_value(value: &Value, graph: &'g ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Object(id) => graph
                .object(*id)
                .ok_or_else(|| Error::custom(format!("dangling object id {}", id.0))),
            other => Err(Error::custom(format!(
                "expected object, found {}",
                other.kind_name()
            ))),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn graph(&self) -> &'g ObjectGraph {
        self.graph
    }

    fn inner(&self) -> &'g Object {
        // ObjectRef is only created for ids present in the graph.
        &self.graph.objects[self.id.0]
    }

    pub fn type_name(&self) -> &'g str {
        &self.inner().type_name
    }

    pub fn field(&self, member: &str) -> Option<&'g Value> {
        self.inner().field(member)
    }

    /// Nested object held by `member`, or `None` if the member is null or not an object.
    pub fn object(&self, member: &str) -> Option<ObjectRef<'g>> {
        self.field(member)
            .and_then(Value::as_object)
            .and_then(|id| self.graph.object(id))
    }

    /// Convert the value of `member` into `T`.
    pub fn get<T: FromValue>(&self, member: &str) -> Result<T, Error> {
        let value = self.field(member).ok_or_else(|| {
            Error::custom(format!(
                "type `{}` has no member `{member}`",
                self.type_name()
            ))
        })?;
        T::from_value(value, self.graph)
            .map_err(|err| Error::custom(format!("member `{member}`: {err}")))
    }

    /// True if both views point at the same instance.
    pub fn same_instance(&self, other: &ObjectRef<'_>) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

/// The result of one deserialize call: the arena and the root value.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    pub graph: ObjectGraph,
    pub root: Value,
}

impl Bound {
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Root object, if the root is an object.
    pub fn root_object(&self) -> Option<ObjectRef<'_>> {
        self.root.as_object().and_then(|id| self.graph.object(id))
    }

    pub fn extract<T: FromValue>(&self) -> Result<T, Error> {
        T::from_value(&self.root, &self.graph)
    }
}

/// Conversion from a bound value into a Rust type.
///
/// Implement this for application structs on top of [`ObjectRef::get`]:
///
/// ```rust
/// use saphyr_bind::{Error, FromValue, ObjectGraph, ObjectRef, Value};
///
/// struct Car {
///     name: String,
///     year: i32,
/// }
///
/// impl FromValue for Car {
///     fn from_value(value: &Value, graph: &ObjectGraph) -> Result<Self, Error> {
///         let car = ObjectRef::from_value(value, graph)?;
///         Ok(Car {
///             name: car.get("Name")?,
///             year: car.get("Year")?,
///         })
///     }
/// }
/// ```
pub trait FromValue: Sized {
    fn from_value(value: &Value, graph: &ObjectGraph) -> Result<Self, Error>;
}

fn mismatch(expected: &str, found: &Value) -> Error {
    Error::custom(format!("expected {expected}, found {}", found.kind_name()))
}

impl FromValue for Value {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        Ok(value.clone())
    }
}

impl FromValue for ObjectId {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        value.as_object().ok_or_else(|| mismatch("object", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Enum { variant, .. } => Ok(variant.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Char(c) => Ok(*c),
            other => Err(mismatch("char", other)),
        }
    }
}

macro_rules! impl_from_value_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
                    let converted: Option<$ty> = match value {
                        Value::Int(i) => NumCast::from(*i),
                        Value::UInt(u) => NumCast::from(*u),
                        Value::Float(f) => NumCast::from(*f),
                        _ => None,
                    };
                    converted.ok_or_else(|| mismatch(stringify!($ty), value))
                }
            }
        )*
    };
}

impl_from_value_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value, _graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date_naive()),
            other => Err(mismatch("date", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, graph).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Sequence(items) => items.iter().map(|v| T::from_value(v, graph)).collect(),
            Value::Bytes(bytes) => bytes
                .iter()
                .map(|b| T::from_value(&Value::UInt((*b).into()), graph))
                .collect(),
            other => Err(mismatch("sequence", other)),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value, graph: &ObjectGraph) -> Result<Self, Error> {
        match value {
            Value::Dictionary(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v, graph)?)))
                .collect(),
            other => Err(mismatch("dictionary", other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Char(c) => write!(f, "{c}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Enum { variant, .. } => f.write_str(variant),
            Value::Sequence(items) => write!(f, "<sequence of {}>", items.len()),
            Value::Dictionary(entries) => write!(f, "<dictionary of {}>", entries.len()),
            Value::Object(id) => write!(f, "<object #{}>", id.0),
        }
    }
}
