//! Descriptor-driven YAML binder.
//!
//! YAML text is composed into a [`Document`] node tree and then bound, node by node, into an
//! [`ObjectGraph`] following a requested [`TypeDescriptor`]. Objects are described at runtime
//! with [`ObjectDescriptor`]s, and abstract capabilities are turned into concrete types through
//! the mappings registered on a [`DeserializerBuilder`].
//!
//! ```rust
//! use saphyr_bind::naming::CamelCase;
//! use saphyr_bind::{Deserializer, ObjectDescriptor, TypeDescriptor};
//!
//! let deserializer = Deserializer::builder()
//!     .with_naming_convention(CamelCase)
//!     .with_object(
//!         ObjectDescriptor::new("Person")
//!             .member("Name", TypeDescriptor::string())
//!             .member("Cars", TypeDescriptor::sequence(TypeDescriptor::capability("ICar"))),
//!     )
//!     .with_object(ObjectDescriptor::new("Car").member("Name", TypeDescriptor::string()))
//!     .with_type_mapping("ICar", "Car")
//!     .build();
//!
//! let yaml = "name: Jack\ncars:\n  - name: Mustang\n  - name: Honda\n";
//! let bound = deserializer.deserialize(yaml, &TypeDescriptor::object("Person")).unwrap();
//! let person = bound.root_object().unwrap();
//! assert_eq!(person.get::<String>("Name").unwrap(), "Jack");
//! assert_eq!(person.get::<Vec<saphyr_bind::ObjectId>>("Cars").unwrap().len(), 2);
//! ```
//!
//! Anchors and aliases bind to shared instances: an alias to an anchored mapping yields the
//! same [`ObjectId`] as the anchor, including aliases that refer back to an enclosing object.

#[macro_use]
pub mod macros;

pub mod alias;
pub mod binder;
pub mod budget;
pub mod compose;
pub mod descriptor;
pub mod deserializer;
pub mod error;
pub mod location;
pub mod mapping;
pub mod naming;
pub mod node;
pub mod options;
pub mod path;
pub mod scalar;
mod snippet;
mod tags;
pub mod value;

#[cfg(feature = "miette")]
pub mod diagnostic;

pub use alias::{AliasResolver, AnchorState};
pub use binder::{BindSettings, ObjectGraphBuilder, ResolutionContext};
pub use budget::{Budget, BudgetBreach, BudgetReport};
pub use compose::{compose_all, compose_str};
pub use descriptor::{
    EnumDescriptor, MemberDescriptor, ObjectDescriptor, ScalarKind, TypeDescriptor, TypeRegistry,
};
pub use deserializer::{Deserializer, DeserializerBuilder};
pub use error::Error;
pub use location::Location;
pub use mapping::TypeMappingRegistry;
pub use naming::NamingConvention;
pub use node::{Document, Node, NodeId, NodeKind, ScalarStyle, Shape};
pub use options::{DuplicateKeyPolicy, Options};
pub use path::{Path, PathSegment};
pub use scalar::{ConvertContext, ScalarConverter, ScalarConverterChain, ScalarInput};
pub use value::{Bound, FromValue, Object, ObjectGraph, ObjectId, ObjectRef, Value};
