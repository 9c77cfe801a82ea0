//! Type descriptors: what the binder knows about the target types.
//!
//! Rust has no runtime reflection, so target types are described up front. An
//! [`ObjectDescriptor`] lists the settable members of a concrete type (name and declared
//! [`TypeDescriptor`]); a [`TypeDescriptor::Capability`] names an abstract type that must be
//! mapped to a concrete one before anything can be built for it.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::value::Value;

/// Leaf kinds a scalar can be converted into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    /// `!!binary` base64 payload.
    Bytes,
    /// RFC 3339 / YAML timestamp with offset.
    Timestamp,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Application-defined leaf handled by a user converter.
    Custom(Arc<str>),
}

impl ScalarKind {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Zero value of this kind, used for absent members and null scalars.
    pub fn default_value(&self) -> Value {
        match self {
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => Value::Int(0),
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => {
                Value::UInt(0)
            }
            ScalarKind::F32 | ScalarKind::F64 => Value::Float(0.0),
            ScalarKind::Char => Value::Char('\0'),
            ScalarKind::Bytes => Value::Bytes(Vec::new()),
            ScalarKind::Timestamp | ScalarKind::Date | ScalarKind::Custom(_) => Value::Null,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::Bytes => "binary",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Date => "date",
            ScalarKind::Custom(name) => name,
        };
        f.write_str(name)
    }
}

/// Declared type of a member, a sequence element, or the document root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    /// Registered enumeration, bound from a scalar naming one of its variants.
    Enum(Arc<str>),
    /// Ordered container of the element type.
    Sequence(Box<TypeDescriptor>),
    /// String-keyed map of the value type, in document order.
    Dictionary(Box<TypeDescriptor>),
    /// Either null or the inner type.
    Optional(Box<TypeDescriptor>),
    /// Concrete, constructible object type.
    Object(Arc<str>),
    /// Abstract type, resolved through the type mappings.
    Capability(Arc<str>),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Scalar(ScalarKind::String)
    }

    pub fn bool() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Bool)
    }

    pub fn i32() -> Self {
        TypeDescriptor::Scalar(ScalarKind::I32)
    }

    pub fn i64() -> Self {
        TypeDescriptor::Scalar(ScalarKind::I64)
    }

    pub fn u64() -> Self {
        TypeDescriptor::Scalar(ScalarKind::U64)
    }

    pub fn f64() -> Self {
        TypeDescriptor::Scalar(ScalarKind::F64)
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        TypeDescriptor::Scalar(kind)
    }

    pub fn custom(name: &str) -> Self {
        TypeDescriptor::Scalar(ScalarKind::Custom(name.into()))
    }

    pub fn enumeration(name: &str) -> Self {
        TypeDescriptor::Enum(name.into())
    }

    pub fn sequence(element: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Box::new(element))
    }

    pub fn dictionary(value: TypeDescriptor) -> Self {
        TypeDescriptor::Dictionary(Box::new(value))
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn object(name: &str) -> Self {
        TypeDescriptor::Object(name.into())
    }

    pub fn capability(name: &str) -> Self {
        TypeDescriptor::Capability(name.into())
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDescriptor::Capability(_))
    }

    /// Value a member of this type holds when its key is absent from the mapping.
    pub fn default_value(&self, types: &TypeRegistry) -> Value {
        match self {
            TypeDescriptor::Scalar(kind) => kind.default_value(),
            TypeDescriptor::Enum(name) => types
                .enumeration(name)
                .and_then(|e| e.variants.first())
                .map(|variant| Value::Enum {
                    type_name: name.to_string(),
                    variant: variant.to_string(),
                })
                .unwrap_or(Value::Null),
            TypeDescriptor::Sequence(_) => Value::Sequence(Vec::new()),
            TypeDescriptor::Dictionary(_) => Value::Dictionary(Vec::new()),
            TypeDescriptor::Optional(_)
            | TypeDescriptor::Object(_)
            | TypeDescriptor::Capability(_) => Value::Null,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => write!(f, "{kind}"),
            TypeDescriptor::Enum(name)
            | TypeDescriptor::Object(name)
            | TypeDescriptor::Capability(name) => f.write_str(name),
            TypeDescriptor::Sequence(inner) => write!(f, "[{inner}]"),
            TypeDescriptor::Dictionary(inner) => write!(f, "{{string: {inner}}}"),
            TypeDescriptor::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}

/// One settable member of an object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberDescriptor {
    /// Declared identifier; the YAML key is derived from it by the naming convention.
    pub name: Arc<str>,
    pub ty: TypeDescriptor,
}

/// Members of a concrete object type, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub name: Arc<str>,
    pub members: Vec<MemberDescriptor>,
    /// Reference types can be handed out while their members are still being bound, which is
    /// what lets anchored objects contain aliases to themselves. Value types cannot.
    pub by_reference: bool,
}

impl ObjectDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            by_reference: true,
        }
    }

    /// Append a member.
    pub fn member(mut self, name: &str, ty: TypeDescriptor) -> Self {
        self.members.push(MemberDescriptor {
            name: name.into(),
            ty,
        });
        self
    }

    /// Mark this type as a value type that cannot be referenced before it is complete.
    pub fn by_value(mut self) -> Self {
        self.by_reference = false;
        self
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| &*m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: Arc<str>,
    /// Declared variant identifiers; the first one is the default.
    pub variants: Vec<Arc<str>>,
}

impl EnumDescriptor {
    pub fn new(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.into(),
            variants: variants.iter().map(|v| Arc::from(*v)).collect(),
        }
    }
}

/// Descriptors of all concrete object and enum types known to a deserializer.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    objects: AHashMap<Arc<str>, Arc<ObjectDescriptor>>,
    enums: AHashMap<Arc<str>, Arc<EnumDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an object type.
    pub fn register_object(&mut self, descriptor: ObjectDescriptor) {
        self.objects
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Register or replace an enum type.
    pub fn register_enum(&mut self, descriptor: EnumDescriptor) {
        self.enums.insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub fn object(&self, name: &str) -> Option<&Arc<ObjectDescriptor>> {
        self.objects.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumDescriptor>> {
        self.enums.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register_object(
            ObjectDescriptor::new("Car")
                .member("Name", TypeDescriptor::string())
                .member("Year", TypeDescriptor::i32())
                .member("Spec", TypeDescriptor::capability("IModelSpec")),
        );
        types.register_enum(EnumDescriptor::new("Drive", &["FWD", "RWD", "AWD"]));
        types
    }

    #[test]
    fn members_keep_declaration_order() {
        let types = registry();
        let car = types.object("Car").unwrap();
        let names: Vec<&str> = car.members.iter().map(|m| &*m.name).collect();
        assert_eq!(names, ["Name", "Year", "Spec"]);
        assert_eq!(car.member_index("Spec"), Some(2));
        assert!(car.by_reference);
    }

    #[test]
    fn re_registration_replaces() {
        let mut types = registry();
        types.register_object(ObjectDescriptor::new("Car").by_value());
        let car = types.object("Car").unwrap();
        assert!(car.members.is_empty());
        assert!(!car.by_reference);
    }

    #[test]
    fn defaults_per_declared_type() {
        let types = registry();
        assert_eq!(
            TypeDescriptor::string().default_value(&types),
            Value::String(String::new())
        );
        assert_eq!(TypeDescriptor::i32().default_value(&types), Value::Int(0));
        assert_eq!(
            TypeDescriptor::sequence(TypeDescriptor::i32()).default_value(&types),
            Value::Sequence(Vec::new())
        );
        assert_eq!(
            TypeDescriptor::capability("IModelSpec").default_value(&types),
            Value::Null
        );
        assert_eq!(
            TypeDescriptor::enumeration("Drive").default_value(&types),
            Value::Enum {
                type_name: "Drive".into(),
                variant: "FWD".into()
            }
        );
    }

    #[test]
    fn display_is_readable() {
        let ty = TypeDescriptor::dictionary(TypeDescriptor::sequence(TypeDescriptor::optional(
            TypeDescriptor::custom("Duration"),
        )));
        assert_eq!(ty.to_string(), "{string: [Duration?]}");
    }
}
